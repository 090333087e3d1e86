pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "gpfolio",
    about = "GP portfolio case review operator CLI",
    long_about = "Inspect configuration, the capability taxonomy and section extraction without starting the server.",
    after_help = "Examples:\n  gpfolio doctor --json\n  gpfolio config\n  gpfolio capabilities --source config/capabilities.txt\n  gpfolio extract --input reply.txt --capability \"Clinical management\""
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Parse a capability taxonomy and print it as JSON")]
    Capabilities {
        #[arg(long, help = "Taxonomy text file; defaults to the configured or built-in source")]
        source: Option<PathBuf>,
    },
    #[command(about = "Extract review sections from a saved model reply, offline")]
    Extract {
        #[arg(long, help = "File holding the raw model reply")]
        input: PathBuf,
        #[arg(long = "capability", required = true, help = "Capability to extract; repeatable")]
        capabilities: Vec<String>,
    },
    #[command(about = "Validate config, capability taxonomy, prompt templates and section patterns")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => commands::config::run(),
        Command::Capabilities { source } => commands::capabilities::run(source.as_deref()),
        Command::Extract { input, capabilities } => commands::extract::run(&input, &capabilities),
        Command::Doctor { json } => commands::doctor::run(json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
