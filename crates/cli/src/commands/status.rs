//! Status command handler.
//!
//! One-shot, read-only view of the checkpoint: the same summary the
//! monitor emits on each tick.

use clap::Args;
use nameforge_core::{config::AppConfig, AppError, AppResult};
use nameforge_pipeline::{CheckpointManager, StatusReport};

/// Show current enrichment progress
#[derive(Args, Debug)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatusCommand {
    /// Execute the status command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing status command");

        let manager = CheckpointManager::new(config.checkpoint_path());
        let state = manager.load()?;

        let now = chrono::Utc::now();
        let report = StatusReport::compute(
            &state,
            None,
            chrono::Duration::seconds(config.enrichment.report_interval_secs as i64),
            chrono::Duration::seconds(config.enrichment.stuck_threshold_secs as i64),
            now,
        );

        if self.json {
            let json = serde_json::to_string_pretty(&report)
                .map_err(|e| AppError::Serialization(e.to_string()))?;
            println!("{}", json);
        } else {
            println!("{}", report.render(now));
        }

        Ok(())
    }
}
