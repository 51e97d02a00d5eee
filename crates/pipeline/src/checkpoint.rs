//! Durable, resumable progress tracking.
//!
//! The checkpoint is a single JSON document mutated only by the enricher
//! and read by the monitor. It is persisted after every mutation with a
//! write-temp-then-rename so the monitor never observes a half-written
//! file.

use chrono::{DateTime, Utc};
use nameforge_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Lifecycle status of an enrichment run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Ready,
    Running,
    Completed,
}

/// Per-chunk progress counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkProgress {
    pub total: usize,
    pub processed: usize,
    pub errors: usize,
}

/// Exact resume point: chunk, in-chunk record index, and when it was set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumePoint {
    pub chunk: u32,
    pub index: usize,
    pub timestamp: DateTime<Utc>,
}

/// The checkpoint document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointState {
    pub status: RunStatus,

    /// Cursor into the chunk sequence
    pub current_chunk: u32,

    pub total_names_processed: u64,

    pub total_errors: u64,

    /// Names whose batches exhausted retries, kept for a later retry pass
    pub error_names: Vec<String>,

    /// Whether the error-retry pass has run
    pub errors_retried: bool,

    pub last_checkpoint: ResumePoint,

    /// Per-chunk counters, keyed by chunk id
    pub chunks: BTreeMap<u32, ChunkProgress>,

    /// Advisory running cost estimate in USD
    pub estimated_cost: f64,

    pub last_update: DateTime<Utc>,
}

impl CheckpointState {
    /// Fresh state for a first run.
    pub fn initial() -> Self {
        let now = Utc::now();
        Self {
            status: RunStatus::Ready,
            current_chunk: 1,
            total_names_processed: 0,
            total_errors: 0,
            error_names: Vec::new(),
            errors_retried: false,
            last_checkpoint: ResumePoint {
                chunk: 1,
                index: 0,
                timestamp: now,
            },
            chunks: BTreeMap::new(),
            estimated_cost: 0.0,
            last_update: now,
        }
    }

    /// Record (or refresh) a chunk's total record count.
    pub fn ensure_chunk(&mut self, chunk_id: u32, total: usize) {
        let entry = self.chunks.entry(chunk_id).or_default();
        entry.total = total;
    }

    /// Apply one batch outcome to every counter plus the resume cursor.
    pub fn apply_advance(
        &mut self,
        chunk_id: u32,
        processed_delta: usize,
        error_delta: usize,
        cost_delta: f64,
        new_index: usize,
    ) {
        self.apply_counters(chunk_id, processed_delta, error_delta, cost_delta);

        self.last_checkpoint = ResumePoint {
            chunk: chunk_id,
            index: new_index,
            timestamp: Utc::now(),
        };
    }

    /// Update chunk and aggregate counters without moving the resume
    /// cursor. The error-retry pass uses this: its batches revisit earlier
    /// chunks and must not rewind `lastCheckpoint`.
    pub fn apply_counters(
        &mut self,
        chunk_id: u32,
        processed_delta: usize,
        error_delta: usize,
        cost_delta: f64,
    ) {
        let entry = self.chunks.entry(chunk_id).or_default();
        entry.processed += processed_delta;
        entry.errors += error_delta;

        self.total_names_processed += processed_delta as u64;
        self.total_errors += error_delta as u64;
        self.estimated_cost += cost_delta;
    }

    /// Sum of chunk totals, when known.
    pub fn total_expected(&self) -> usize {
        self.chunks.values().map(|c| c.total).sum()
    }

    /// Records still ahead of the cursor, plus the pending error list.
    pub fn total_remaining(&self) -> usize {
        let chunk_remaining: usize = self
            .chunks
            .values()
            .map(|c| c.total.saturating_sub(c.processed))
            .sum();

        let error_remaining = if self.errors_retried {
            0
        } else {
            self.error_names.len()
        };

        chunk_remaining + error_remaining
    }
}

/// Loads and saves the checkpoint document.
#[derive(Debug, Clone)]
pub struct CheckpointManager {
    path: PathBuf,
}

impl CheckpointManager {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Read the checkpoint, or return an initial state when absent.
    pub fn load(&self) -> AppResult<CheckpointState> {
        if !self.path.exists() {
            tracing::debug!("No checkpoint at {:?}, starting fresh", self.path);
            return Ok(CheckpointState::initial());
        }

        let contents = std::fs::read_to_string(&self.path)?;
        let state: CheckpointState = serde_json::from_str(&contents).map_err(|e| {
            AppError::Serialization(format!(
                "Corrupt checkpoint at {:?}: {}",
                self.path, e
            ))
        })?;
        Ok(state)
    }

    /// Persist the checkpoint atomically (write temp, rename).
    ///
    /// Stamps `lastUpdate` so readers can detect a stalled writer.
    pub fn save(&self, state: &mut CheckpointState) -> AppResult<()> {
        state.last_update = Utc::now();

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Persistence(format!("Failed to create {:?}: {}", parent, e))
            })?;
        }

        let json = serde_json::to_string_pretty(state)
            .map_err(|e| AppError::Persistence(format!("Failed to serialize checkpoint: {}", e)))?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .map_err(|e| AppError::Persistence(format!("Failed to write {:?}: {}", tmp, e)))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            AppError::Persistence(format!("Failed to replace {:?}: {}", self.path, e))
        })?;

        Ok(())
    }

    /// Apply a batch outcome and persist in one call.
    pub fn advance(
        &self,
        state: &mut CheckpointState,
        chunk_id: u32,
        processed_delta: usize,
        error_delta: usize,
        cost_delta: f64,
        new_index: usize,
    ) -> AppResult<()> {
        state.apply_advance(chunk_id, processed_delta, error_delta, cost_delta, new_index);
        self.save(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let state = CheckpointState::initial();
        assert_eq!(state.status, RunStatus::Ready);
        assert_eq!(state.current_chunk, 1);
        assert_eq!(state.total_names_processed, 0);
        assert_eq!(state.last_checkpoint.index, 0);
        assert!(state.chunks.is_empty());
        assert!(!state.errors_retried);
    }

    #[test]
    fn test_load_missing_file_returns_initial() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path().join("state.json"));
        let state = manager.load().unwrap();
        assert_eq!(state.status, RunStatus::Ready);
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path().join("state.json"));

        let mut state = CheckpointState::initial();
        state.status = RunStatus::Running;
        state.ensure_chunk(2, 500);
        state.apply_advance(2, 10, 0, 0.0005, 510);
        state.error_names.push("Xanthe".to_string());

        manager.save(&mut state).unwrap();
        let loaded = manager.load().unwrap();

        assert_eq!(loaded.status, RunStatus::Running);
        assert_eq!(loaded.last_checkpoint.chunk, 2);
        assert_eq!(loaded.last_checkpoint.index, 510);
        assert_eq!(loaded.chunks[&2].processed, 10);
        assert_eq!(loaded.error_names, vec!["Xanthe".to_string()]);
    }

    #[test]
    fn test_serialized_field_names_match_layout() {
        let mut state = CheckpointState::initial();
        state.ensure_chunk(1, 100);

        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["status"], "ready");
        assert!(value.get("currentChunk").is_some());
        assert!(value.get("totalNamesProcessed").is_some());
        assert!(value.get("totalErrors").is_some());
        assert!(value.get("errorNames").is_some());
        assert!(value.get("errorsRetried").is_some());
        assert!(value.get("estimatedCost").is_some());
        assert!(value.get("lastUpdate").is_some());
        assert!(value["lastCheckpoint"].get("timestamp").is_some());
        // Chunk map keys are serialized as strings
        assert!(value["chunks"].get("1").is_some());
    }

    #[test]
    fn test_advance_updates_all_counters_in_one_call() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CheckpointManager::new(dir.path().join("state.json"));

        let mut state = CheckpointState::initial();
        state.ensure_chunk(1, 40);

        manager.advance(&mut state, 1, 10, 0, 0.0005, 10).unwrap();
        manager.advance(&mut state, 1, 0, 10, 0.0, 20).unwrap();

        assert_eq!(state.total_names_processed, 10);
        assert_eq!(state.total_errors, 10);
        assert_eq!(state.chunks[&1].processed, 10);
        assert_eq!(state.chunks[&1].errors, 10);
        assert!((state.estimated_cost - 0.0005).abs() < f64::EPSILON);
        assert_eq!(state.last_checkpoint.index, 20);

        // And each advance persisted
        let loaded = manager.load().unwrap();
        assert_eq!(loaded.last_checkpoint.index, 20);
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let manager = CheckpointManager::new(&path);

        let mut state = CheckpointState::initial();
        manager.save(&mut state).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_total_remaining_counts_pending_errors_once() {
        let mut state = CheckpointState::initial();
        state.ensure_chunk(1, 100);
        state.apply_advance(1, 60, 0, 0.0, 60);
        state.error_names = vec!["Ada".to_string(), "Lin".to_string()];

        assert_eq!(state.total_remaining(), 42);

        state.errors_retried = true;
        assert_eq!(state.total_remaining(), 40);
    }
}
