//! Command-line interface.

mod progress;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use console::style;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use text_analysis::client::{ClientConfig, HttpAnalysisClient};
use text_analysis::config::{load_settings, LoadOptions, Settings};
use text_analysis::report::write_report;
use text_analysis::storage::{FsObjectStore, HttpObjectStore, ObjectLocation, ObjectStore};
use text_analysis::{AnalysisEvent, Orchestrator};

#[derive(Parser, Debug)]
#[command(name = "text-analysis")]
#[command(about = "Entity, key phrase and sentiment analysis of stored documents")]
#[command(version)]
pub struct Cli {
    /// Key of the document in the input bucket
    #[arg(short, long)]
    input: String,

    /// Path to write the JSON report to
    #[arg(short, long)]
    output: PathBuf,

    /// Config file path (overrides auto-discovery)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Read objects from this directory (one subdirectory per bucket)
    /// instead of the storage endpoint
    #[arg(long)]
    store_dir: Option<PathBuf>,

    /// Stop waiting on detection jobs after this many seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Exit with an error if any analysis failed
    #[arg(long)]
    strict: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config.clone(),
    };
    let (mut settings, _config) = load_settings(&options)
        .await
        .map_err(anyhow::Error::msg)
        .context("Failed to load configuration")?;
    if let Some(ref dir) = cli.store_dir {
        settings.store_dir = Some(dir.clone());
    }

    let store = build_store(&settings)?;
    let service = Arc::new(
        HttpAnalysisClient::new(ClientConfig::from_settings(&settings))
            .context("Failed to create analysis client")?,
    );

    let input = ObjectLocation::new(settings.input_bucket.clone(), cli.input.clone());
    println!("{} Downloading {}", style("→").cyan(), input);
    let document = store
        .get(&input)
        .await
        .with_context(|| format!("Failed to download {}", input))?;
    tracing::info!("Downloaded {} ({} bytes)", input, document.len());

    let cancel = cancellation(cli.timeout);

    let (event_tx, event_rx) = mpsc::channel::<AnalysisEvent>(100);
    let event_handler = tokio::spawn(progress::print_events(event_rx));

    let orchestrator = Orchestrator::new(service, store, settings)
        .with_events(event_tx)
        .with_cancellation(cancel);
    let (result, errors) = orchestrator.run(&cli.input, document).await;

    // Closes the event channel so the handler can finish
    drop(orchestrator);
    let _ = event_handler.await;

    write_report(&result, &cli.output)
        .await
        .with_context(|| format!("Failed to write report to {}", cli.output.display()))?;
    println!(
        "{} Report written to {}",
        style("✓").green(),
        cli.output.display()
    );

    if let Some(errors) = errors {
        tracing::error!("Analysis of {} finished with errors: {}", cli.input, errors);
        println!(
            "{} {} of 3 analyses failed: {}",
            style("✗").red(),
            errors.len(),
            errors
        );
        if cli.strict {
            anyhow::bail!("{} analyses failed", errors.len());
        }
    }

    Ok(())
}

fn build_store(settings: &Settings) -> anyhow::Result<Arc<dyn ObjectStore>> {
    match settings.store_dir {
        Some(ref dir) => {
            tracing::info!("Using local object store at {}", dir.display());
            Ok(Arc::new(FsObjectStore::new(dir)))
        }
        None => {
            let store = HttpObjectStore::new(
                &settings.storage_endpoint,
                Duration::from_secs(settings.request_timeout),
            )
            .context("Failed to create storage client")?;
            Ok(Arc::new(store))
        }
    }
}

/// Exit status after a second interrupt (128 + SIGINT).
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Token cancelled on Ctrl-C or once `timeout_secs` elapses.
///
/// A second Ctrl-C exits immediately.
fn cancellation(timeout_secs: Option<u64>) -> CancellationToken {
    let cancel = CancellationToken::new();

    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if interrupt_sequence(on_interrupt, tokio::signal::ctrl_c).await {
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
    });

    if let Some(secs) = timeout_secs {
        let on_deadline = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            tracing::warn!("Timed out after {}s waiting on detection jobs", secs);
            on_deadline.cancel();
        });
    }

    cancel
}

/// Cancel `cancel` on the first interrupt and return `true` on the second.
///
/// Returns `false` if interrupts can no longer be received.
async fn interrupt_sequence<F, Fut>(cancel: CancellationToken, mut next_interrupt: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = next_interrupt().await {
        tracing::warn!("Unable to listen for Ctrl-C: {}", e);
        return false;
    }
    tracing::warn!("Interrupted, no longer waiting on detection jobs (Ctrl-C again to quit)");
    cancel.cancel();

    match next_interrupt().await {
        Ok(()) => {
            tracing::warn!("Interrupted again, exiting");
            true
        }
        Err(e) => {
            tracing::warn!("Unable to listen for Ctrl-C: {}", e);
            false
        }
    }
}
