//! Chunk file storage.
//!
//! The corpus is partitioned into ordered JSON chunk files
//! (`names-chunk<N>.json`). Two shapes occur in practice — a bare array of
//! records or a `{"names": [...]}` wrapper — and the loader auto-detects
//! both, normalizing to one in-memory representation at this boundary.
//!
//! Every destructive write is preceded by a timestamped backup copy of the
//! previous file (`<stem>_backup_<epoch-ms>.json`) and the replacement
//! itself is write-temp-then-rename, so a concurrent reader sees either the
//! old or the new complete file, never a torn one.

use crate::record::NameRecord;
use chrono::Utc;
use nameforge_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// On-disk chunk shape: bare array or `{names: [...]}` wrapper.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum ChunkPayload {
    Bare(Vec<NameRecord>),
    Wrapped { names: Vec<NameRecord> },
}

/// Loads and saves chunk files under a data directory.
#[derive(Debug, Clone)]
pub struct ChunkStore {
    data_dir: PathBuf,
}

impl ChunkStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Path of a chunk file by id.
    pub fn chunk_path(&self, id: u32) -> PathBuf {
        self.data_dir.join(format!("names-chunk{}.json", id))
    }

    /// Discover chunk ids present in the data directory, ascending.
    ///
    /// Backup files do not match the `names-chunk<N>.json` pattern and are
    /// never picked up.
    pub fn discover_chunks(&self) -> AppResult<Vec<u32>> {
        let mut ids = Vec::new();

        for entry in walkdir::WalkDir::new(&self.data_dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy();
            if let Some(id) = parse_chunk_file_name(&file_name) {
                ids.push(id);
            }
        }

        ids.sort_unstable();
        Ok(ids)
    }

    /// Load one chunk as an ordered record list.
    ///
    /// Fails with a format error if the file is not valid JSON in either
    /// tolerated shape.
    pub fn load_chunk(&self, id: u32) -> AppResult<Vec<NameRecord>> {
        let path = self.chunk_path(id);
        let contents = std::fs::read_to_string(&path)?;

        let payload: ChunkPayload = serde_json::from_str(&contents).map_err(|e| {
            AppError::Format(format!(
                "{:?} is neither a record array nor a {{names: [...]}} wrapper: {}",
                path, e
            ))
        })?;

        let mut records = match payload {
            ChunkPayload::Bare(records) => records,
            ChunkPayload::Wrapped { names } => names,
        };

        for record in &mut records {
            record.resolve_gender();
        }

        tracing::debug!(chunk = id, count = records.len(), "Loaded chunk");
        Ok(records)
    }

    /// Save one chunk, backing up the previous file first.
    ///
    /// The write path is: copy current file to a timestamped backup, write
    /// the new content to a temp file, rename over the original.
    pub fn save_chunk(&self, id: u32, records: &[NameRecord]) -> AppResult<()> {
        let path = self.chunk_path(id);

        if path.exists() {
            let backup = self.backup_path(id)?;
            std::fs::copy(&path, &backup).map_err(|e| {
                AppError::Persistence(format!("Failed to back up {:?}: {}", path, e))
            })?;
            tracing::debug!(chunk = id, backup = %backup.display(), "Backed up chunk");
        }

        let payload = ChunkPayload::Wrapped {
            names: records.to_vec(),
        };
        let json = serde_json::to_string_pretty(&payload)
            .map_err(|e| AppError::Persistence(format!("Failed to serialize chunk: {}", e)))?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .map_err(|e| AppError::Persistence(format!("Failed to write {:?}: {}", tmp, e)))?;
        std::fs::rename(&tmp, &path)
            .map_err(|e| AppError::Persistence(format!("Failed to replace {:?}: {}", path, e)))?;

        tracing::debug!(chunk = id, count = records.len(), "Saved chunk");
        Ok(())
    }

    /// Backup files for a chunk, oldest first.
    pub fn backups(&self, id: u32) -> AppResult<Vec<PathBuf>> {
        let prefix = format!("names-chunk{}_backup_", id);
        let mut paths = Vec::new();

        for entry in walkdir::WalkDir::new(&self.data_dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let file_name = entry.file_name().to_string_lossy().to_string();
            if file_name.starts_with(&prefix) && file_name.ends_with(".json") {
                paths.push(entry.path().to_path_buf());
            }
        }

        paths.sort();
        Ok(paths)
    }

    /// Next free timestamped backup path for a chunk.
    fn backup_path(&self, id: u32) -> AppResult<PathBuf> {
        let mut stamp = Utc::now().timestamp_millis();
        loop {
            let candidate = self
                .data_dir
                .join(format!("names-chunk{}_backup_{}.json", id, stamp));
            if !candidate.exists() {
                return Ok(candidate);
            }
            // Two saves can land in the same millisecond; keep names distinct
            stamp += 1;
        }
    }
}

/// Parse `names-chunk<N>.json` into a chunk id.
fn parse_chunk_file_name(file_name: &str) -> Option<u32> {
    let rest = file_name.strip_prefix("names-chunk")?;
    let digits = rest.strip_suffix(".json")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Origin;

    fn record(name: &str) -> NameRecord {
        NameRecord::new(name)
    }

    #[test]
    fn test_parse_chunk_file_name() {
        assert_eq!(parse_chunk_file_name("names-chunk1.json"), Some(1));
        assert_eq!(parse_chunk_file_name("names-chunk12.json"), Some(12));
        assert_eq!(parse_chunk_file_name("names-chunk1_backup_17000.json"), None);
        assert_eq!(parse_chunk_file_name("names-chunk.json"), None);
        assert_eq!(parse_chunk_file_name("other.json"), None);
    }

    #[test]
    fn test_load_tolerates_both_shapes() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChunkStore::new(dir.path());

        std::fs::write(
            store.chunk_path(1),
            r#"[{"name": "Ada"}, {"name": "Lin"}]"#,
        )
        .unwrap();
        std::fs::write(
            store.chunk_path(2),
            r#"{"names": [{"name": "Ada"}, {"name": "Lin"}]}"#,
        )
        .unwrap();

        let bare = store.load_chunk(1).unwrap();
        let wrapped = store.load_chunk(2).unwrap();

        let names = |records: &[NameRecord]| {
            records.iter().map(|r| r.name.clone()).collect::<Vec<_>>()
        };
        assert_eq!(names(&bare), names(&wrapped));
    }

    #[test]
    fn test_load_rejects_other_shapes() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChunkStore::new(dir.path());

        std::fs::write(store.chunk_path(1), r#"{"records": []}"#).unwrap();
        match store.load_chunk(1) {
            Err(AppError::Format(_)) => {}
            other => panic!("Expected format error, got {:?}", other),
        }

        std::fs::write(store.chunk_path(2), "not json").unwrap();
        assert!(matches!(store.load_chunk(2), Err(AppError::Format(_))));
    }

    #[test]
    fn test_save_creates_backup_of_prior_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChunkStore::new(dir.path());

        store.save_chunk(1, &[record("Ada")]).unwrap();
        assert!(store.backups(1).unwrap().is_empty());

        store.save_chunk(1, &[record("Ada"), record("Lin")]).unwrap();
        let backups = store.backups(1).unwrap();
        assert_eq!(backups.len(), 1);

        // Backup holds exactly the prior on-disk content
        let backed_up = std::fs::read_to_string(&backups[0]).unwrap();
        let payload: Vec<NameRecord> = serde_json::from_str::<serde_json::Value>(&backed_up)
            .ok()
            .and_then(|v| serde_json::from_value(v["names"].clone()).ok())
            .unwrap();
        assert_eq!(payload.len(), 1);
        assert_eq!(payload[0].name, "Ada");

        store.save_chunk(1, &[record("Ada")]).unwrap();
        assert_eq!(store.backups(1).unwrap().len(), 2);
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChunkStore::new(dir.path());

        store.save_chunk(1, &[record("Ada")]).unwrap();
        assert!(!store.chunk_path(1).with_extension("json.tmp").exists());
    }

    #[test]
    fn test_round_trip_preserves_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChunkStore::new(dir.path());

        let mut ada = record("Ada");
        ada.meaning = Some("nobility".to_string());
        ada.origin = Some(Origin::Many(vec![
            "Germanic".to_string(),
            "Hebrew".to_string(),
        ]));
        ada.enriched = true;

        store.save_chunk(3, &[ada]).unwrap();
        let loaded = store.load_chunk(3).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "Ada");
        assert!(loaded[0].enriched);
        assert_eq!(
            loaded[0].origin.as_ref().unwrap().as_list(),
            vec!["Germanic", "Hebrew"]
        );
    }

    #[test]
    fn test_discover_chunks_skips_backups() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChunkStore::new(dir.path());

        store.save_chunk(2, &[record("Ada")]).unwrap();
        store.save_chunk(1, &[record("Lin")]).unwrap();
        store.save_chunk(2, &[record("Ada"), record("Lin")]).unwrap();

        assert_eq!(store.discover_chunks().unwrap(), vec![1, 2]);
    }
}
