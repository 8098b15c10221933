use async_trait::async_trait;
use tavern_core::CommandError;
use tracing::{info, warn};

use crate::replies;

/// One parsed chat command: the name after the prefix, the first argument and
/// everything after it in order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub primary: Option<String>,
    pub args: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChecklistAction {
    Show,
    Add(Vec<String>),
    Remove(Vec<String>),
    Delete,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BotCommand {
    AdventureCard,
    FoundryRollDice,
    Name,
    Quote { text: Option<String> },
    Checklist { name: Option<String>, action: ChecklistAction },
    Help,
}

impl BotCommand {
    pub fn classify(command: Command) -> Result<Self, CommandError> {
        let Command { name, primary, mut args } = command;
        Ok(match name.as_str() {
            "adventure_card" => Self::AdventureCard,
            "foundry_roll_dice" => Self::FoundryRollDice,
            "name" => Self::Name,
            "help" => Self::Help,
            "quote" => Self::Quote { text: primary.filter(|text| !text.trim().is_empty()) },
            "checklist" => {
                let action = if args.is_empty() {
                    ChecklistAction::Show
                } else {
                    let verb = args.remove(0);
                    match verb.as_str() {
                        "add" => ChecklistAction::Add(args),
                        "remove" => ChecklistAction::Remove(args),
                        "del" => ChecklistAction::Delete,
                        _ => ChecklistAction::Show,
                    }
                };
                Self::Checklist { name: primary, action }
            }
            _ => return Err(CommandError::UnknownCommand(name)),
        })
    }
}

/// Splits a prefixed chat message into a [`Command`].
///
/// Returns `Ok(None)` for text that is not addressed to the bot.
pub fn parse_message(text: &str, prefix: &str) -> Result<Option<Command>, CommandError> {
    let Some(body) = text.strip_prefix(prefix) else {
        return Ok(None);
    };
    if body.starts_with(char::is_whitespace) {
        return Ok(None);
    }

    let mut tokens = tokenize(body)?.into_iter();
    let Some(name) = tokens.next() else {
        return Ok(None);
    };
    let primary = tokens.next();
    Ok(Some(Command { name, primary, args: tokens.collect() }))
}

/// Whitespace-separated tokens; `"..."` groups words and `\"` escapes a quote
/// inside a group.
pub fn tokenize(input: &str) -> Result<Vec<String>, CommandError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    loop {
        while chars.next_if(|ch| ch.is_whitespace()).is_some() {}
        let Some(first) = chars.next() else {
            return Ok(tokens);
        };

        if first != '"' {
            let mut token = String::from(first);
            while let Some(ch) = chars.next_if(|ch| !ch.is_whitespace()) {
                token.push(ch);
            }
            tokens.push(token);
            continue;
        }

        let mut token = String::new();
        loop {
            match chars.next() {
                None => {
                    return Err(CommandError::Validation(
                        "a quoted argument is missing its closing `\"`".to_owned(),
                    ))
                }
                Some('"') => break,
                Some('\\') if chars.peek() == Some(&'"') => {
                    chars.next();
                    token.push('"');
                }
                Some(ch) => token.push(ch),
            }
        }
        if chars.peek().is_some_and(|ch| !ch.is_whitespace()) {
            return Err(CommandError::Validation(
                "expected a space after a closing `\"`".to_owned(),
            ));
        }
        tokens.push(token);
    }
}

#[async_trait]
pub trait CollectionCommandService: Send + Sync {
    async fn adventure_card(&self) -> Result<String, CommandError>;

    async fn name(&self) -> Result<String, CommandError>;

    async fn quote(&self, text: Option<String>) -> Result<String, CommandError>;

    async fn checklist(
        &self,
        name: Option<String>,
        action: ChecklistAction,
    ) -> Result<String, CommandError>;
}

pub struct CommandRouter<S> {
    service: S,
    prefix: String,
}

impl<S> CommandRouter<S>
where
    S: CollectionCommandService,
{
    pub fn new(service: S, prefix: impl Into<String>) -> Self {
        Self { service, prefix: prefix.into() }
    }

    pub async fn route(&self, command: Command) -> Result<String, CommandError> {
        match BotCommand::classify(command)? {
            BotCommand::AdventureCard => self.service.adventure_card().await,
            BotCommand::FoundryRollDice => Ok(replies::foundry_roll_dice()),
            BotCommand::Name => self.service.name().await,
            BotCommand::Quote { text } => self.service.quote(text).await,
            BotCommand::Checklist { name, action } => self.service.checklist(name, action).await,
            BotCommand::Help => Ok(replies::help(&self.prefix)),
        }
    }

    /// Parses and routes one message, turning every failure into reply text.
    /// `None` means the message was not a command.
    pub async fn reply(&self, text: &str, correlation_id: &str) -> Option<String> {
        let command = match parse_message(text, &self.prefix) {
            Ok(Some(command)) => command,
            Ok(None) => return None,
            Err(error) => return Some(self.failure_reply(&error, "unparsed", correlation_id)),
        };
        let name = command.name.clone();

        match self.route(command).await {
            Ok(reply) => {
                info!(
                    event_name = "command.dispatched",
                    correlation_id,
                    command = %name,
                    "command handled"
                );
                Some(reply)
            }
            Err(error) => Some(self.failure_reply(&error, &name, correlation_id)),
        }
    }

    fn failure_reply(&self, error: &CommandError, command: &str, correlation_id: &str) -> String {
        warn!(
            event_name = "command.failed",
            correlation_id,
            command,
            error_class = error.error_class(),
            error = %error,
            "command failed"
        );

        match error {
            CommandError::UnknownCommand(_) => {
                format!("{}\n{}", error.user_message(), replies::help(&self.prefix))
            }
            _ => error.user_message(),
        }
    }
}
