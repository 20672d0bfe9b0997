//! ldaptx CLI
//!
//! Command-line tools for directory names, filters and transactional
//! changes.
//!
//! # Commands
//!
//! - `dn` - Parse a distinguished name and show its components
//! - `filter` - Parse a search filter and print its wire form
//! - `search` - Search a server
//! - `apply` - Apply a batch of changes in one transaction
//! - `check-password` - Verify a password by binding

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// ldaptx command-line directory tools.
#[derive(Parser)]
#[command(name = "ldaptx")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a JSON settings file
    #[arg(global = true, short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a distinguished name and show its components
    Dn {
        /// The name to parse
        text: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Parse a search filter and print its wire form
    Filter {
        /// The filter to parse
        text: String,

        /// Restrict the filter to these attributes (repeatable)
        #[arg(long = "field")]
        fields: Vec<String>,
    },

    /// Search a server
    Search {
        /// Search base (defaults to base_dn from the settings file)
        #[arg(short, long)]
        base: Option<String>,

        /// Scope (base, one, sub)
        #[arg(short, long, default_value = "sub")]
        scope: String,

        /// Search filter
        #[arg(short = 'F', long, default_value = "(objectClass=*)")]
        filter: String,

        /// Attributes to return (repeatable)
        #[arg(short, long = "attr")]
        attributes: Vec<String>,

        /// Maximum number of entries
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format (text, json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Apply a batch of changes from a JSON file in one transaction
    Apply {
        /// File holding the change list
        file: PathBuf,

        /// Roll back instead of committing
        #[arg(short, long)]
        dry_run: bool,
    },

    /// Verify a password by binding; reads LDAPTX_PASSWORD
    CheckPassword {
        /// Identity to check
        #[arg(short, long)]
        dn: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Dn { text, format } => {
            commands::dn::run(&text, &format)?;
        }
        Commands::Filter { text, fields } => {
            commands::filter::run(&text, &fields)?;
        }
        Commands::Search {
            base,
            scope,
            filter,
            attributes,
            limit,
            format,
        } => {
            let config = cli.config.ok_or("Settings file required for search")?;
            let args = commands::search::SearchArgs {
                base,
                scope,
                filter,
                attributes,
                limit,
            };
            commands::search::run(&config, &args, &format)?;
        }
        Commands::Apply { file, dry_run } => {
            let config = cli.config.ok_or("Settings file required for apply")?;
            commands::apply::run(&config, &file, dry_run)?;
        }
        Commands::CheckPassword { dn } => {
            let config = cli.config.ok_or("Settings file required for check-password")?;
            let password = std::env::var("LDAPTX_PASSWORD").unwrap_or_default();
            commands::check_password::run(&config, &dn, &password)?;
        }
        Commands::Version => {
            println!("ldaptx CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
