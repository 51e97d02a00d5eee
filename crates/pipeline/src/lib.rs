//! Enrichment pipeline for the nameforge CLI.
//!
//! This crate implements the resumable chunked-batch pipeline:
//! - `record`: the name record domain model
//! - `chunk_store`: chunk file load/save with backup-before-overwrite
//! - `checkpoint`: durable, resumable progress state
//! - `retry`: the retry-with-backoff combinator
//! - `enricher`: the batch enrichment driver
//! - `report`: read-only progress summarization

pub mod checkpoint;
pub mod chunk_store;
pub mod enricher;
pub mod record;
pub mod report;
pub mod retry;

// Re-export main types
pub use checkpoint::{CheckpointManager, CheckpointState, ChunkProgress, ResumePoint, RunStatus};
pub use chunk_store::ChunkStore;
pub use enricher::{BatchEnricher, RunOutcome};
pub use record::{Gender, NameRecord, Origin, UNRANKED};
pub use report::{write_report_file, StatusReport};
pub use retry::with_retry;
