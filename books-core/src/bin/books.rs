//! Books command-line tool
//!
//! Reports and maintenance tasks over the stored snapshot.

use anyhow::{bail, Context};
use books_core::{
    backup, import,
    report::{self, Period},
    Books, Config,
};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "books", version, about = "Small-business bookkeeping")]
struct Cli {
    /// TOML configuration file
    #[arg(short = 'c', long = "config", env = "BOOKS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Profit and loss over a period
    Report {
        /// First day (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Last day (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
    },

    /// Stock on hand at average cost
    Stock,

    /// Headline numbers
    Dashboard,

    /// Write the whole snapshot to a backup file
    ExportBackup {
        /// Output file (default: dated file in the backup directory)
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },

    /// Replace all data with a backup file
    RestoreBackup {
        /// Backup file
        path: PathBuf,
        /// Confirm the overwrite
        #[arg(long)]
        yes: bool,
    },

    /// Preview (or append) parties from an Excel workbook or CSV sheet
    ImportParties {
        /// `.xlsx` workbook or CSV file
        path: PathBuf,
        /// Append the previewed parties
        #[arg(long)]
        confirm: bool,
    },

    /// Replace plaintext passwords with hashes
    UpgradeCredentials,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    match path {
        Some(path) => {
            let mut config = Config::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            config.apply_env()?;
            Ok(config)
        }
        None => Ok(Config::from_env()?),
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));

    // Logs go to stderr so report output stays machine readable
    if config.logging.format == "json" {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(io::stderr))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(io::stderr))
            .with(filter)
            .init();
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;
    init_tracing(&config);

    let backup_dir = config.storage.backup_dir.clone();
    let mut books = Books::open(config).context("Failed to open books")?;

    match cli.command {
        Command::Report { from, to } => {
            print_json(&books.summarize(Period { from, to }))?;
        }

        Command::Stock => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            writeln!(out, "{:<12} {:<30} {:>12} {:>12} {:>14}", "CODE", "NAME", "QTY", "AVG COST", "VALUE")?;
            for line in report::stock_report(books.state()) {
                writeln!(
                    out,
                    "{:<12} {:<30} {:>12} {:>12} {:>14}",
                    line.code,
                    line.name,
                    line.qty,
                    line.avg_cost.round_dp(2),
                    line.value.round_dp(2)
                )?;
            }
        }

        Command::Dashboard => {
            print_json(&books.dashboard())?;
        }

        Command::ExportBackup { output } => {
            let path = match output {
                Some(path) => path,
                None => {
                    std::fs::create_dir_all(&backup_dir)?;
                    backup_dir.join(backup::backup_file_name(Local::now().date_naive()))
                }
            };
            let file = File::create(&path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            books.export_backup(BufWriter::new(file))?;
            println!("{}", path.display());
        }

        Command::RestoreBackup { path, yes } => {
            if !yes {
                bail!("Restoring overwrites all current data; pass --yes to continue");
            }
            let file = File::open(&path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            books.restore_backup_from(BufReader::new(file), yes)?;
            tracing::info!(path = %path.display(), "Backup restored");
        }

        Command::ImportParties { path, confirm } => {
            let parties = import::preview_parties_file(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;

            if confirm {
                let committed = books.import_parties(parties)?;
                println!("Imported {} parties", committed.output);
            } else {
                print_json(&parties)?;
                eprintln!("Preview only; pass --confirm to import {} parties", parties.len());
            }
        }

        Command::UpgradeCredentials => {
            let upgraded = books.upgrade_legacy_credentials()?;
            println!("Upgraded {} users", upgraded);
        }
    }

    Ok(())
}
