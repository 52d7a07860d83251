//! regen-ocr
//!
//! Finds objects whose OCR text was generated before a given date and asks
//! the OCR service to rebuild it.

mod config;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use regen_ocr_core::Cutoff;
use regen_ocr_engine::{IdentifierSource, OcrGeneratorClient, Regenerator, RunSummary};
use regen_ocr_fedora::FedoraClient;
use regen_ocr_queue::QueueMonitor;
use tracing::{info, info_span, warn};

use crate::config::AppConfig;

/// Regenerate OCR text older than a cutoff date.
#[derive(Parser, Debug)]
#[command(name = "regen-ocr", version, about)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long)]
    config: PathBuf,

    /// Regenerate OCR created before this date (YYYY-MM-DD, local midnight).
    #[arg(short, long)]
    date: String,

    /// Log at debug level.
    #[arg(short, long)]
    verbose: bool,

    /// Append log output to this file.
    #[arg(long, default_value = logging::DEFAULT_LOG_FILE, conflicts_with = "no_log_file")]
    log_file: PathBuf,

    /// Only log to the terminal.
    #[arg(long)]
    no_log_file: bool,

    /// An object PID, or a file with one PID per line.
    pid_or_file: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = run(cli).await;
    match &result {
        Ok(summary) if summary.has_failures() => {
            warn!(failed = ?summary.failed, "some identifiers could not be processed");
        }
        Ok(_) => info!("done"),
        Err(e) => eprintln!("error: {e:#}"),
    }
    ExitCode::from(exit_status(&result))
}

/// 0 when every identifier was handled, 1 when some failed, 2 when the run
/// could not complete.
fn exit_status(result: &anyhow::Result<RunSummary>) -> u8 {
    match result {
        Ok(summary) if summary.has_failures() => 1,
        Ok(_) => 0,
        Err(_) => 2,
    }
}

async fn run(cli: Cli) -> anyhow::Result<RunSummary> {
    let log_file = (!cli.no_log_file).then_some(cli.log_file.as_path());
    logging::init(cli.verbose, log_file)?;

    let config = AppConfig::load(&cli.config)?;
    let cutoff = Cutoff::parse_local_date(&cli.date)
        .with_context(|| format!("invalid cutoff date '{}'", cli.date))?;

    let mut fedora = FedoraClient::builder(&config.fedora.url)
        .credentials(&config.fedora.username, &config.fedora.password);
    if let Some(timeout) = config.regenerator.timeout {
        fedora = fedora.timeout(timeout);
    }
    let fedora = fedora.build()?;
    let ocr = OcrGeneratorClient::new(&config.regenerator.url, config.regenerator.timeout)?;

    let mut builder = Regenerator::builder(Arc::new(fedora), Arc::new(ocr), cutoff)
        .pacing(config.regenerator.pacing)
        .span(info_span!("regen_ocr", %cutoff));
    if let Some(monitor) = &config.queue_monitor {
        if monitor.queue_names.is_empty() {
            warn!("queue_monitor has no queue_name entries, backpressure is disabled");
        } else {
            builder = builder.monitor(Arc::new(QueueMonitor::from_config(monitor)?));
        }
    }
    let regenerator = builder.build();

    let source = IdentifierSource::detect(&cli.pid_or_file);
    Ok(regenerator.run(&source).await?)
}
