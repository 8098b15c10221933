//! Plain-text reply rendering. Every string a user can see is built here.

const COMMANDS: [(&str, &str); 6] = [
    ("adventure_card", "Draw an adventure card."),
    ("foundry_roll_dice", "How to roll custom dice in FoundryVTT."),
    ("name", "Generate a random name."),
    ("quote", "Get a random quote. To add a new quote: {prefix}quote \"<new quote>\""),
    (
        "checklist",
        "Create checklists and add/remove items: {prefix}checklist [<name> [add <items...> | remove <numbers...> | del]]",
    ),
    ("help", "Show this message."),
];

pub fn help(prefix: &str) -> String {
    let mut reply = String::from("Commands:");
    for (name, description) in COMMANDS {
        reply.push_str(&format!("\n  {prefix}{name}: {}", description.replace("{prefix}", prefix)));
    }
    reply
}

pub fn foundry_roll_dice() -> String {
    [
        "/r 1d6 -> simple roll",
        "/r 2d6 -> multiple dice roll",
        "/r 1d6x -> exploding roll",
        "/r {1d6, 1d6}kh -> keep highest of two or more rolls",
        "/r 1d6+1 -> roll + constant",
        "/r {1d6x, 1d8x}kh+4 -> advanced roll",
    ]
    .join("\n")
}

pub fn new_quote(text: &str) -> String {
    format!("New Quote: {text}")
}

pub fn full_name(name: &str, surname: &str) -> String {
    format!("{name} {surname}")
}

pub fn checklist_index<'a>(names: impl Iterator<Item = &'a str>) -> String {
    let lines = names.map(|name| format!(" *{name}")).collect::<Vec<_>>();
    if lines.is_empty() {
        return "No checklists yet.".to_owned();
    }
    lines.join("\n")
}

pub fn checklist_added(items: &[String]) -> String {
    bulleted("Items successfully added to checklist:", "+", items)
}

pub fn checklist_removed(remaining: &[String]) -> String {
    bulleted("Items successfully removed from checklist:", "-", remaining)
}

pub fn checklist_deleted() -> String {
    "Checklist successfully deleted.".to_owned()
}

pub fn checklist_show(name: &str, items: &[String]) -> String {
    if items.is_empty() {
        return format!("{name}: (empty)");
    }
    bulleted(&format!("{name}:"), ">", items)
}

fn bulleted(header: &str, marker: &str, items: &[String]) -> String {
    let mut reply = header.to_owned();
    for item in items {
        reply.push_str("\n\t");
        reply.push_str(marker);
        reply.push_str(item);
    }
    reply
}
