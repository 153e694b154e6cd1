use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use valutatrade::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    /// Portfolio owner the command acts on
    #[arg(short, long, global = true, default_value = "default")]
    user: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Fetch fresh rates from all providers and install them
    Refresh,
    /// Display the exchange rate between two currencies
    Rate { from: String, to: String },
    /// Buy an amount of a currency against the USD wallet
    Buy { currency: String, amount: String },
    /// Sell an amount of a currency into the USD wallet
    Sell { currency: String, amount: String },
    /// Fund a wallet from outside the system
    Deposit { currency: String, amount: String },
    /// Display wallet balances and their value in a base currency
    Portfolio {
        /// Currency to value the portfolio in
        #[arg(long, default_value = "USD")]
        base: String,
    },
}

fn to_app_command(command: Commands, user: String) -> valutatrade::AppCommand {
    match command {
        Commands::Refresh => valutatrade::AppCommand::Refresh,
        Commands::Rate { from, to } => valutatrade::AppCommand::Rate { from, to },
        Commands::Buy { currency, amount } => valutatrade::AppCommand::Buy {
            user,
            currency,
            amount,
        },
        Commands::Sell { currency, amount } => valutatrade::AppCommand::Sell {
            user,
            currency,
            amount,
        },
        Commands::Deposit { currency, amount } => valutatrade::AppCommand::Deposit {
            user,
            currency,
            amount,
        },
        Commands::Portfolio { base } => valutatrade::AppCommand::Portfolio { user, base },
        Commands::Setup => unreachable!("Setup command should be handled separately"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => valutatrade::cli::setup::run(),
        Some(command) => {
            valutatrade::run_command(
                to_app_command(command, cli.user),
                cli.config_path.as_deref(),
            )
            .await
        }
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Command failed");
    }
    result
}
