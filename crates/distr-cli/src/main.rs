// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// DISTR CLI - Reward Allocation Simulator & Store Inspector
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "distr-cli")]
#[command(about = "Distribution module - fee allocation simulator and store inspector", long_about = None)]
#[command(version)]
struct Cli {
    /// Reward store directory (reads DISTR_DB_PATH, defaults to ~/.distr/data)
    #[arg(long, env = "DISTR_DB_PATH", global = true)]
    db: Option<PathBuf>,

    /// Suppress the banner
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario of blocks through the allocator
    Simulate {
        /// Scenario TOML file
        scenario: PathBuf,

        /// Print block summaries as JSON
        #[arg(long)]
        json: bool,
    },

    /// Read the persisted reward store
    Query {
        #[command(subcommand)]
        action: QueryCommands,
    },

    /// Genesis import / export
    Genesis {
        #[command(subcommand)]
        action: GenesisCommands,
    },

    /// Distribution params
    Params {
        #[command(subcommand)]
        action: ParamsCommands,
    },
}

#[derive(Subcommand)]
enum QueryCommands {
    /// Outstanding (unwithdrawn) rewards of a validator
    Outstanding {
        /// Validator operator address
        validator: String,
    },

    /// Accumulated commission of a validator
    Commission {
        /// Validator operator address
        validator: String,
    },

    /// Current-period rewards of a validator
    Current {
        /// Validator operator address
        validator: String,
    },

    /// Community pool
    FeePool,

    /// SHA3 fingerprint of every reward table
    StateRoot,
}

#[derive(Subcommand)]
enum GenesisCommands {
    /// Export the store as a genesis JSON document
    Export {
        /// Params TOML to embed (defaults to DISTR_* env vars)
        #[arg(short, long)]
        params: Option<PathBuf>,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import a genesis JSON document into the store
    Import {
        /// Genesis file
        input: PathBuf,
    },

    /// Check a genesis file without touching the store
    Validate {
        /// Genesis file
        input: PathBuf,
    },
}

#[derive(Subcommand)]
enum ParamsCommands {
    /// Load and validate a params TOML file
    Check {
        /// Params file
        file: PathBuf,
    },

    /// Print the params resolved from DISTR_* env vars as TOML
    Show,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let json_output = matches!(cli.command, Commands::Simulate { json: true, .. })
        || matches!(cli.command, Commands::Genesis { action: GenesisCommands::Export { output: None, .. } })
        || matches!(cli.command, Commands::Params { action: ParamsCommands::Show });
    if !cli.quiet && !json_output {
        print_banner();
    }

    let result = match cli.command {
        Commands::Simulate { scenario, json } => {
            commands::simulate::handle(&scenario, cli.db.as_deref(), json)
        }
        Commands::Query { action } => {
            commands::query::handle(action, &commands::resolve_db_path(cli.db))
        }
        Commands::Genesis { action } => {
            commands::genesis::handle(action, &commands::resolve_db_path(cli.db))
        }
        Commands::Params { action } => commands::params::handle(action),
    };

    if let Err(e) = result {
        print_error(&e.to_string());
        std::process::exit(1);
    }
    Ok(())
}

fn print_banner() {
    println!(
        "{}",
        "╔═══════════════════════════════════════════════╗".cyan()
    );
    println!(
        "{}",
        "║      DISTR - Fee Distribution CLI v0.1.0      ║"
            .cyan()
            .bold()
    );
    println!(
        "{}",
        "╚═══════════════════════════════════════════════╝".cyan()
    );
    println!();
}

fn print_success(msg: &str) {
    println!("{} {}", "✓".green().bold(), msg);
}

fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red().bold(), msg);
}

fn print_info(msg: &str) {
    println!("{} {}", "ℹ".blue().bold(), msg);
}

// ─────────────────────────────────────────────────────────────────
// UNIT TESTS
// ─────────────────────────────────────────────────────────────────
