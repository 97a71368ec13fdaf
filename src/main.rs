//! Main application entry point (CLI binary).
//!
//! Parses arguments, loads `.env`, sets up logging and Ctrl-C handling, then
//! hands over to [`simple_analytics_sync::run_sync`].

use anyhow::{Context, Result};
use clap::Parser;
use log::warn;
use std::process;
use tokio_util::sync::CancellationToken;

use simple_analytics_sync::config::Opt;
use simple_analytics_sync::initialization::init_logger_with;
use simple_analytics_sync::run_sync;

#[tokio::main]
async fn main() -> Result<()> {
    // Credentials may come from a .env file next to the working directory
    let _ = dotenvy::dotenv();

    let opt = Opt::parse();
    init_logger_with(opt.log_level.clone().into(), opt.log_format.clone())
        .context("Failed to initialize logger")?;

    let config = match opt.into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("simple_analytics_sync error: {e}");
            process::exit(1);
        }
    };

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling in-flight exports (cursors are not advanced)");
            on_signal.cancel();
        }
    });

    match run_sync(config, cancel).await {
        Ok(report) => {
            // stdout may carry the records, so the summary goes to stderr
            eprintln!(
                "Synced {} record{} from {} table{} in {:.1}s",
                report.total_records,
                if report.total_records == 1 { "" } else { "s" },
                report.tables.len(),
                if report.tables.len() == 1 { "" } else { "s" },
                report.elapsed_seconds
            );
            if !report.is_success() {
                for failure in &report.failures {
                    eprintln!(
                        "  failed: {} {}: {}",
                        failure.client_id, failure.table, failure.error
                    );
                }
                process::exit(1);
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("simple_analytics_sync error: {:#}", e);
            process::exit(1);
        }
    }
}
