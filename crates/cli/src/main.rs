use std::process::ExitCode;

fn main() -> ExitCode {
    gpfolio_cli::run()
}
