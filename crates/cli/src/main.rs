use std::process::ExitCode;

fn main() -> ExitCode {
    tavern_cli::run()
}
