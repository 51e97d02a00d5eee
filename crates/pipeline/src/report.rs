//! Read-only progress summarization.
//!
//! The monitor process reads checkpoint state on a fixed interval and emits
//! a human-readable summary; it never mutates pipeline state. Concurrent
//! read-while-write is safe because the enricher replaces the checkpoint
//! file atomically.

use crate::checkpoint::{CheckpointState, RunStatus};
use chrono::{DateTime, Duration, Utc};
use nameforge_core::{AppError, AppResult};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// How many trailing error names a report includes.
const RECENT_ERRORS_SHOWN: usize = 5;

/// One computed observation of pipeline progress.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub status: RunStatus,
    pub current_chunk: u32,
    pub total_processed: u64,
    pub total_errors: u64,
    pub estimated_cost: f64,
    pub total_expected: usize,
    pub total_remaining: usize,

    /// Percent complete, when chunk totals are known
    pub percent_complete: Option<f64>,

    /// Names per minute since the previous observation
    pub rate_per_minute: Option<f64>,

    /// Naive linear ETA in minutes (`remaining / rate`)
    pub eta_minutes: Option<f64>,

    /// Seconds since the last checkpoint update, when past the stuck
    /// threshold
    pub stuck_seconds: Option<i64>,

    pub recent_errors: Vec<String>,
    pub chunks: Vec<ChunkStatus>,
    pub last_update: DateTime<Utc>,
}

/// Per-chunk progress line.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkStatus {
    pub id: u32,
    pub total: usize,
    pub processed: usize,
    pub errors: usize,
}

impl StatusReport {
    /// Compute a report from checkpoint state.
    ///
    /// `previous` is the state observed one interval ago; without it no
    /// rate or ETA can be computed (first tick, or one-shot status).
    pub fn compute(
        state: &CheckpointState,
        previous: Option<&CheckpointState>,
        interval: Duration,
        stuck_threshold: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        let total_expected = state.total_expected();
        let total_remaining = state.total_remaining();

        let percent_complete = if total_expected > 0 {
            Some(state.total_names_processed as f64 / total_expected as f64 * 100.0)
        } else {
            None
        };

        let rate_per_minute = previous.and_then(|prev| {
            let minutes = interval.num_seconds() as f64 / 60.0;
            if minutes <= 0.0 {
                return None;
            }
            let delta = state
                .total_names_processed
                .saturating_sub(prev.total_names_processed);
            Some(delta as f64 / minutes)
        });

        let eta_minutes = rate_per_minute.and_then(|rate| {
            if rate > 0.0 {
                Some(total_remaining as f64 / rate)
            } else {
                None
            }
        });

        let stalled_for = now.signed_duration_since(state.last_update);
        let stuck_seconds = if state.status == RunStatus::Running && stalled_for > stuck_threshold {
            Some(stalled_for.num_seconds())
        } else {
            None
        };

        let recent_errors = state
            .error_names
            .iter()
            .rev()
            .take(RECENT_ERRORS_SHOWN)
            .cloned()
            .collect();

        let chunks = state
            .chunks
            .iter()
            .map(|(&id, progress)| ChunkStatus {
                id,
                total: progress.total,
                processed: progress.processed,
                errors: progress.errors,
            })
            .collect();

        Self {
            status: state.status,
            current_chunk: state.current_chunk,
            total_processed: state.total_names_processed,
            total_errors: state.total_errors,
            estimated_cost: state.estimated_cost,
            total_expected,
            total_remaining,
            percent_complete,
            rate_per_minute,
            eta_minutes,
            stuck_seconds,
            recent_errors,
            chunks,
            last_update: state.last_update,
        }
    }

    /// True once the pipeline has nothing left to do.
    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }

    /// Render the human-readable summary block.
    pub fn render(&self, now: DateTime<Utc>) -> String {
        let mut out = String::new();
        let line = "=".repeat(60);

        out.push_str(&line);
        out.push('\n');
        out.push_str(&format!(
            "ENRICHMENT PROGRESS REPORT - {}\n",
            now.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        out.push_str(&line);
        out.push('\n');

        out.push_str("\nOverall Progress:\n");
        out.push_str(&format!(
            "  Total processed: {} names\n",
            self.total_processed
        ));
        out.push_str(&format!("  Total errors: {}\n", self.total_errors));
        out.push_str(&format!("  Status: {}\n", status_label(self.status)));
        out.push_str(&format!("  Current chunk: {}\n", self.current_chunk));
        out.push_str(&format!("  Total cost: ${:.3}\n", self.estimated_cost));

        if let Some(percent) = self.percent_complete {
            out.push_str(&format!(
                "  Progress: {:.1}% ({}/{}, {} remaining)\n",
                percent, self.total_processed, self.total_expected, self.total_remaining
            ));
        }

        if let Some(rate) = self.rate_per_minute {
            out.push_str("\nInterval:\n");
            out.push_str(&format!("  Processing rate: {:.1} names/minute\n", rate));
            if let Some(eta) = self.eta_minutes {
                out.push_str(&format!(
                    "  Estimated time remaining: {:.0} minutes ({:.1} hours)\n",
                    eta,
                    eta / 60.0
                ));
            }
        }

        if !self.chunks.is_empty() {
            out.push_str("\nChunk Status:\n");
            for chunk in &self.chunks {
                let percent = if chunk.total > 0 {
                    chunk.processed as f64 / chunk.total as f64 * 100.0
                } else {
                    0.0
                };
                out.push_str(&format!(
                    "  Chunk {}: {}/{} ({:.1}%) - {} errors\n",
                    chunk.id, chunk.processed, chunk.total, percent, chunk.errors
                ));
            }
        }

        if let Some(stuck) = self.stuck_seconds {
            out.push_str(&format!(
                "\nSTUCK ALERT: no checkpoint update for {}m {}s\n",
                stuck / 60,
                stuck % 60
            ));
            if self.recent_errors.is_empty() {
                out.push_str("  No recorded errors\n");
            } else {
                out.push_str("  Recent errors:\n");
                for name in &self.recent_errors {
                    out.push_str(&format!("    - {}\n", name));
                }
            }
        }

        if self.is_completed() {
            out.push_str("\nENRICHMENT COMPLETED\n");
        }

        out.push_str(&line);
        out.push('\n');
        out
    }
}

fn status_label(status: RunStatus) -> &'static str {
    match status {
        RunStatus::Ready => "ready",
        RunStatus::Running => "running",
        RunStatus::Completed => "completed",
    }
}

/// Write a rendered report to a dated file under `reports_dir`.
pub fn write_report_file(
    reports_dir: &Path,
    rendered: &str,
    now: DateTime<Utc>,
) -> AppResult<PathBuf> {
    std::fs::create_dir_all(reports_dir).map_err(|e| {
        AppError::Persistence(format!("Failed to create {:?}: {}", reports_dir, e))
    })?;

    let path = reports_dir.join(format!("report_{}.txt", now.timestamp_millis()));
    std::fs::write(&path, rendered)
        .map_err(|e| AppError::Persistence(format!("Failed to write {:?}: {}", path, e)))?;

    Ok(path)
}
