//! EOD Ingest CLI
//!
//! Commands:
//! - `ingest` - load the last N business days of trade files
//! - `serve` - run the aggregate HTTP API
//! - `ledger` - list ingested days

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use eod_ingest::api::{shutdown_signal, ApiServer};
use eod_ingest::config::AppConfig;
use eod_ingest::ingest::{process_directory, FileOutcome, IngestOptions};
use eod_ingest::logging::init_tracing;
use eod_ingest::state::AppState;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "eod-ingest", about = "End-of-day equity trade ingestion")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest the trade files for the most recent business days.
    Ingest {
        /// Directory holding DD-MM-YYYY_NEGOCIOSAVISTA.txt files.
        #[arg(long, default_value = "./data/input")]
        dir: PathBuf,

        /// Business days to ingest (1-7).
        #[arg(long, default_value_t = 7)]
        days: i64,

        /// Concurrent files; 0 uses the number of cores (max 7).
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        parallel: i64,

        /// Re-ingest days already in the ledger.
        #[arg(long, default_value_t = false)]
        force: bool,

        /// Rows per insert batch. Defaults to INGEST_BATCH_SIZE.
        #[arg(long)]
        batch_size: Option<usize>,

        /// Last day of the window (YYYY-MM-DD). Defaults to today at the exchange.
        #[arg(long)]
        as_of: Option<NaiveDate>,
    },
    /// Serve the aggregate API.
    Serve {
        /// Bind host. Defaults to SERVER_HOST.
        #[arg(long)]
        host: Option<String>,

        /// Bind port. Defaults to SERVER_PORT.
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print the ingestion ledger, newest day first.
    Ledger,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::from_env()?;
    init_tracing(config.log_format);

    match cli.command {
        Commands::Ingest {
            dir,
            days,
            parallel,
            force,
            batch_size,
            as_of,
        } => {
            let options = IngestOptions {
                days,
                parallelism: parallel,
                force,
                batch_size: batch_size.unwrap_or(config.ingest_batch_size),
                as_of,
            };
            cmd_ingest(AppState::new(config)?, dir, options).await
        }
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server_host = host;
            }
            if let Some(port) = port {
                config.server_port = port;
            }
            cmd_serve(AppState::new(config)?).await
        }
        Commands::Ledger => cmd_ledger(AppState::new(config)?),
    }
}

async fn cmd_ingest(state: AppState, dir: PathBuf, options: IngestOptions) -> Result<()> {
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling ingestion");
            on_signal.cancel();
        }
    });

    let report = match process_directory(&cancel, &dir, state.trade_store(), &options).await {
        Ok(report) => report,
        Err(e) => {
            error!(code = e.code(), "ingestion failed: {}", e);
            return Err(e).context("ingestion failed");
        }
    };

    for outcome in &report.files {
        match outcome {
            FileOutcome::Ingested {
                day,
                file,
                rows,
                replaced,
            } => info!(%day, file = %file, rows, replaced, "ingested"),
            FileOutcome::Skipped { day, file } => info!(%day, file = %file, "skipped"),
        }
    }
    info!(
        files = report.files.len(),
        rows = report.rows(),
        skipped = report.skipped(),
        "ingestion finished"
    );
    Ok(())
}

async fn cmd_serve(state: AppState) -> Result<()> {
    let addr = state.config.server_addr().await?;
    let mut server = ApiServer::new(state.api_state(), state.config.rate_limit_per_minute);
    server.start(addr).await.context("failed to start API server")?;

    shutdown_signal().await;
    server.shutdown().await;
    info!("API server stopped");
    Ok(())
}

fn cmd_ledger(state: AppState) -> Result<()> {
    let entries = state.store.list_ingestion_log()?;
    if entries.is_empty() {
        println!("No days ingested yet.");
        return Ok(());
    }

    println!("{:<12} {:<32} {:>10}  {}", "DAY", "FILE", "ROWS", "INGESTED AT");
    for entry in entries {
        println!(
            "{:<12} {:<32} {:>10}  {}",
            entry.file_date.to_string(),
            entry.filename,
            entry.row_count,
            entry.ingested_at.to_rfc3339()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_defaults() {
        let cli = Cli::try_parse_from(["eod-ingest", "ingest"]).unwrap();
        match cli.command {
            Commands::Ingest {
                dir,
                days,
                parallel,
                force,
                batch_size,
                as_of,
            } => {
                assert_eq!(dir, PathBuf::from("./data/input"));
                assert_eq!(days, 7);
                assert_eq!(parallel, 0);
                assert!(!force);
                assert_eq!(batch_size, None);
                assert_eq!(as_of, None);
            }
            _ => panic!("expected ingest"),
        }
    }

    #[test]
    fn test_ingest_flags() {
        let cli = Cli::try_parse_from([
            "eod-ingest",
            "ingest",
            "--dir",
            "/in",
            "--days",
            "3",
            "--parallel",
            "-1",
            "--force",
            "--as-of",
            "2024-06-14",
        ])
        .unwrap();
        match cli.command {
            Commands::Ingest {
                days,
                parallel,
                force,
                as_of,
                ..
            } => {
                assert_eq!(days, 3);
                assert_eq!(parallel, -1);
                assert!(force);
                assert_eq!(as_of, NaiveDate::from_ymd_opt(2024, 6, 14));
            }
            _ => panic!("expected ingest"),
        }
    }
}
