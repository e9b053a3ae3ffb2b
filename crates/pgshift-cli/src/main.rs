//! pgshift CLI
//!
//! Command-line front end for the schema diff engine: loads two JSON
//! catalog snapshots, computes and orders the changes, and prints the
//! resulting SQL script.

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

use pgshift_core::prelude::*;

/// Schema diff and DDL planning for PostgreSQL.
#[derive(Parser)]
#[command(name = "pgshift")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum KeywordCaseArg {
    Upper,
    Lower,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the SQL script transforming main into branch.
    Diff {
        /// Path to the "main" catalog snapshot (JSON).
        #[arg(long, value_name = "FILE")]
        main: PathBuf,

        /// Path to the "branch" catalog snapshot (JSON).
        #[arg(long, value_name = "FILE")]
        branch: PathBuf,

        /// Target PostgreSQL major version.
        #[arg(long, default_value_t = 16)]
        server_version: u32,

        /// Keyword casing.
        #[arg(long, value_enum, default_value = "upper")]
        keyword_case: KeywordCaseArg,

        /// Indentation width for multi-line statements.
        #[arg(long, default_value_t = 4)]
        indent: usize,

        /// Put commas at the start of continuation lines.
        #[arg(long)]
        leading_commas: bool,

        /// Align column type names in CREATE TABLE bodies.
        #[arg(long)]
        align_types: bool,

        /// Mask credentials in subscriptions, user mappings, and
        /// server options.
        #[arg(long)]
        mask_secrets: bool,
    },

    /// Print the ordered change list as JSON instead of SQL.
    Plan {
        /// Path to the "main" catalog snapshot (JSON).
        #[arg(long, value_name = "FILE")]
        main: PathBuf,

        /// Path to the "branch" catalog snapshot (JSON).
        #[arg(long, value_name = "FILE")]
        branch: PathBuf,

        /// Target PostgreSQL major version.
        #[arg(long, default_value_t = 16)]
        server_version: u32,
    },
}

fn load_catalog(path: &PathBuf) -> anyhow::Result<Catalog> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading snapshot {}", path.display()))?;
    Catalog::from_json(&raw).with_context(|| format!("parsing snapshot {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Diff {
            main,
            branch,
            server_version,
            keyword_case,
            indent,
            leading_commas,
            align_types,
            mask_secrets,
        } => {
            let main_catalog = load_catalog(&main)?;
            let branch_catalog = load_catalog(&branch)?;
            debug!(
                main = %main.display(),
                branch = %branch.display(),
                "snapshots loaded"
            );

            let opts = RenderOptions {
                keyword_case: match keyword_case {
                    KeywordCaseArg::Upper => KeywordCase::Upper,
                    KeywordCaseArg::Lower => KeywordCase::Lower,
                },
                indent_width: indent,
                leading_commas,
                align_types,
                ..RenderOptions::default()
            };
            let mask = MaskSecrets;
            let hooks: Vec<&dyn ChangeHook> = if mask_secrets { vec![&mask] } else { vec![] };

            let statements = generate_script(
                &main_catalog,
                &branch_catalog,
                ServerVersion(server_version),
                &opts,
                &hooks,
            )?;
            if statements.is_empty() {
                eprintln!("No changes.");
                return Ok(());
            }
            for statement in &statements {
                println!("{statement};");
                println!();
            }
        }

        Commands::Plan {
            main,
            branch,
            server_version,
        } => {
            let main_catalog = load_catalog(&main)?;
            let branch_catalog = load_catalog(&branch)?;
            let changes = diff_catalogs(
                &main_catalog,
                &branch_catalog,
                ServerVersion(server_version),
            );
            let ordered = pgshift_core::plan(changes)?;
            println!("{}", serde_json::to_string_pretty(&ordered)?);
        }
    }

    Ok(())
}
