pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use swapdesk_core::config::LoadOptions;

#[derive(Debug, Parser)]
#[command(
    name = "swapdesk",
    about = "Swapdesk operator CLI",
    long_about = "Inspect configuration, check RPC and database readiness, apply migrations, and price swaps.",
    after_help = "Examples:\n  swapdesk doctor --json\n  swapdesk config\n  swapdesk quote 0.5 ETH USDC --slippage 2"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Read configuration from this TOML file")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending session-store migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, RPC reachability, wallet mode, and database connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Price a swap through the same quote engine the chat agent uses")]
    Quote {
        #[arg(help = "Input amount, e.g. 0.5")]
        amount: String,
        #[arg(help = "Input token symbol, e.g. ETH")]
        base: String,
        #[arg(help = "Output token symbol, e.g. USDC")]
        quote: String,
        #[arg(long, default_value_t = 1, help = "Slippage percent used for the minimum output (1-5)")]
        slippage: u8,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = LoadOptions {
        require_file: cli.config.is_some(),
        config_path: cli.config,
        ..LoadOptions::default()
    };

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(options),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run(options) }
        }
        Command::Doctor { json } => commands::doctor::run(options, json),
        Command::Quote { amount, base, quote, slippage } => {
            commands::quote::run(options, &commands::quote::QuoteArgs { amount, base, quote, slippage })
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
