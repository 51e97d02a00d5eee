//! Monitor command handler.
//!
//! Periodic, read-only progress reporting: reads the checkpoint on a fixed
//! wall-clock interval, prints the summary, and writes a dated report file.
//! Runs as its own process alongside the enricher; it never mutates
//! pipeline state. Exits on its own once the checkpoint reports completion.

use clap::Args;
use nameforge_core::{config::AppConfig, AppResult};
use nameforge_pipeline::{write_report_file, CheckpointManager, CheckpointState, StatusReport};
use std::time::Duration;

/// Periodically report enrichment progress
#[derive(Args, Debug)]
pub struct MonitorCommand {
    /// Seconds between reports (defaults to the configured interval)
    #[arg(long)]
    pub interval: Option<u64>,

    /// Emit a single report and exit
    #[arg(long)]
    pub once: bool,
}

impl MonitorCommand {
    /// Execute the monitor command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let interval_secs = self
            .interval
            .unwrap_or(config.enrichment.report_interval_secs);

        tracing::info!(interval_secs, "Starting enrichment monitor");

        let manager = CheckpointManager::new(config.checkpoint_path());
        let reports_dir = config.reports_dir();
        let mut previous: Option<CheckpointState> = None;

        loop {
            let now = chrono::Utc::now();

            // A missing checkpoint reads as a fresh "ready" state; the
            // monitor keeps watching rather than failing
            let state = manager.load()?;

            let report = StatusReport::compute(
                &state,
                previous.as_ref(),
                chrono::Duration::seconds(interval_secs as i64),
                chrono::Duration::seconds(config.enrichment.stuck_threshold_secs as i64),
                now,
            );

            let rendered = report.render(now);
            println!("{}", rendered);

            let path = write_report_file(&reports_dir, &rendered, now)?;
            tracing::debug!(report = %path.display(), "Report written");

            if let Some(stuck) = report.stuck_seconds {
                tracing::warn!(
                    stuck_seconds = stuck,
                    "No checkpoint update past threshold; pipeline may be stuck"
                );
            }

            if report.is_completed() {
                tracing::info!("Enrichment completed; monitor exiting");
                return Ok(());
            }

            if self.once {
                return Ok(());
            }

            previous = Some(state);

            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(interval_secs)) => {}
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Monitor stopped");
                    return Ok(());
                }
            }
        }
    }
}
