//! Terminal progress display for analysis events.

use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;

use text_analysis::AnalysisEvent;

/// Print events until the channel closes.
pub async fn print_events(mut event_rx: mpsc::Receiver<AnalysisEvent>) {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(120));

    while let Some(event) = event_rx.recv().await {
        match event {
            AnalysisEvent::BranchStarted { kind, path } => {
                spinner.set_message(format!("Running {} analysis ({})", kind, path));
            }
            AnalysisEvent::JobSubmitted { kind, job_id } => {
                spinner.println(format!(
                    "{} {} job submitted: {}",
                    style("→").cyan(),
                    kind,
                    style(job_id).dim()
                ));
            }
            AnalysisEvent::JobStatus {
                kind,
                job_id,
                status,
            } => {
                spinner.set_message(format!("{} job {}: {}", kind, job_id, status));
            }
            AnalysisEvent::BranchCompleted { kind, items } => {
                spinner.println(format!("{} {}: {} items", style("✓").green(), kind, items));
            }
            AnalysisEvent::BranchFailed { kind, error } => {
                spinner.println(format!("{} {}: {}", style("✗").red(), kind, error));
            }
        }
    }

    spinner.finish_and_clear();
}
