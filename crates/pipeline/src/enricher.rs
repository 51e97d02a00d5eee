//! Batch enrichment driver.
//!
//! Drives not-yet-processed records through the external text-generation
//! call in bounded batches, merges results back into the chunk arrays, and
//! advances checkpoint state after every batch.
//!
//! State machine per run:
//! `ready → running → (loop: fetch batch → call API → {success:
//! merge+checkpoint, failure: retry-or-error-list}) → completed` once every
//! chunk's cursor reaches its length and the error-retry pass, if
//! triggered, has completed once.

use crate::checkpoint::{CheckpointManager, CheckpointState, RunStatus};
use crate::chunk_store::ChunkStore;
use crate::record::{NameRecord, Origin};
use crate::retry::with_retry;
use chrono::Utc;
use nameforge_core::config::EnrichmentConfig;
use nameforge_core::{AppError, AppResult};
use nameforge_llm::{LlmClient, LlmRequest};
use nameforge_prompt::{build_batch_prompt, PromptDefinition};
use regex::Regex;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// One element of the model's JSON-array answer.
#[derive(Debug, Clone, Deserialize)]
struct EnrichedFields {
    name: String,
    #[serde(default)]
    meaning: Option<String>,
    #[serde(default)]
    origin: Option<Origin>,
    #[serde(rename = "culturalContext", default)]
    cultural_context: Option<String>,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every chunk's cursor reached its length
    Completed,
    /// Interrupt requested; checkpoint saved, resume will pick up here
    Interrupted,
}

/// Drives the enrichment pipeline over the chunk store.
///
/// The enricher is the only writer of chunk files and checkpoint state;
/// the monitor only reads.
pub struct BatchEnricher {
    client: Arc<dyn LlmClient>,
    store: ChunkStore,
    checkpoints: CheckpointManager,
    prompt: PromptDefinition,
    model: String,
    config: EnrichmentConfig,
    interrupted: Arc<AtomicBool>,
}

impl BatchEnricher {
    pub fn new(
        client: Arc<dyn LlmClient>,
        store: ChunkStore,
        checkpoints: CheckpointManager,
        prompt: PromptDefinition,
        model: impl Into<String>,
        config: EnrichmentConfig,
    ) -> Self {
        Self {
            client,
            store,
            checkpoints,
            prompt,
            model: model.into(),
            config,
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared flag a signal handler sets to request a graceful stop.
    ///
    /// The flag is observed between batches: the in-flight API call is
    /// allowed to finish (or time out) and the checkpoint is flushed
    /// before `run` returns `Interrupted`.
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        self.interrupted.clone()
    }

    fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    /// Start or resume the enrichment run.
    pub async fn run(&self) -> AppResult<RunOutcome> {
        let mut state = self.checkpoints.load()?;

        if state.status == RunStatus::Completed {
            tracing::info!("Enrichment already completed; nothing to do");
            return Ok(RunOutcome::Completed);
        }

        let chunk_ids = self.store.discover_chunks()?;
        if chunk_ids.is_empty() {
            return Err(AppError::Config(
                "No chunk files (names-chunk<N>.json) found in data directory".to_string(),
            ));
        }

        tracing::info!(
            chunks = chunk_ids.len(),
            resume_chunk = state.current_chunk,
            resume_index = state.last_checkpoint.index,
            "Starting enrichment"
        );

        let result = self.run_inner(&mut state, &chunk_ids).await;

        if let Err(ref e) = result {
            // Best-effort final flush: the next run must resume from the
            // last completed batch even after a fatal failure
            tracing::error!(error = %e, "Run failed; flushing checkpoint");
            if let Err(flush_err) = self.checkpoints.save(&mut state) {
                tracing::error!(error = %flush_err, "Final checkpoint flush failed");
            }
        }

        result
    }

    async fn run_inner(
        &self,
        state: &mut CheckpointState,
        chunk_ids: &[u32],
    ) -> AppResult<RunOutcome> {
        state.status = RunStatus::Running;
        self.checkpoints.save(state)?;

        // Names that exhausted retries in an earlier run get one more pass
        // before new work starts.
        if !state.errors_retried && !state.error_names.is_empty() {
            if self.retry_error_names(state, chunk_ids).await? == RunOutcome::Interrupted {
                return self.pause(state);
            }
        }

        for &chunk_id in chunk_ids {
            if chunk_id < state.current_chunk {
                continue;
            }

            // Resume mid-chunk only where the cursor points; later chunks
            // start from the top.
            let start_index = if chunk_id == state.last_checkpoint.chunk {
                state.last_checkpoint.index
            } else {
                0
            };

            state.current_chunk = chunk_id;
            self.checkpoints.save(state)?;

            let mut records = match self.store.load_chunk(chunk_id) {
                Ok(records) => records,
                Err(AppError::Format(msg)) => {
                    tracing::warn!(chunk = chunk_id, "Skipping malformed chunk: {}", msg);
                    continue;
                }
                Err(e) => return Err(e),
            };

            let outcome = self
                .process_chunk(state, chunk_id, &mut records, start_index)
                .await?;
            if outcome == RunOutcome::Interrupted {
                return self.pause(state);
            }

            tracing::info!(chunk = chunk_id, "Completed chunk");
        }

        // Errors accumulated during this run also get their single retry
        // pass before the run is marked complete.
        if !state.errors_retried && !state.error_names.is_empty() {
            if self.retry_error_names(state, chunk_ids).await? == RunOutcome::Interrupted {
                return self.pause(state);
            }
        }

        state.status = RunStatus::Completed;
        self.checkpoints.save(state)?;
        tracing::info!(
            processed = state.total_names_processed,
            errors = state.total_errors,
            estimated_cost = state.estimated_cost,
            "Enrichment complete"
        );
        Ok(RunOutcome::Completed)
    }

    /// Flush the checkpoint and report an interrupted run.
    fn pause(&self, state: &mut CheckpointState) -> AppResult<RunOutcome> {
        self.checkpoints.save(state)?;
        tracing::info!(
            chunk = state.last_checkpoint.chunk,
            index = state.last_checkpoint.index,
            "Interrupted; resume point saved"
        );
        Ok(RunOutcome::Interrupted)
    }

    /// Process one chunk from `start_index` to its end.
    async fn process_chunk(
        &self,
        state: &mut CheckpointState,
        chunk_id: u32,
        records: &mut Vec<NameRecord>,
        start_index: usize,
    ) -> AppResult<RunOutcome> {
        state.ensure_chunk(chunk_id, records.len());
        self.checkpoints.save(state)?;

        if start_index >= records.len() {
            return Ok(RunOutcome::Completed);
        }

        tracing::info!(
            chunk = chunk_id,
            from = start_index,
            total = records.len(),
            "Processing chunk"
        );

        let mut index = start_index;
        let mut first_batch = true;

        while index < records.len() {
            if self.is_interrupted() {
                return Ok(RunOutcome::Interrupted);
            }

            let end = (index + self.config.batch_size).min(records.len());

            let pending: Vec<usize> = (index..end)
                .filter(|&i| records[i].needs_enrichment())
                .collect();

            if pending.is_empty() {
                // Window already enriched; just move the cursor
                self.checkpoints.advance(state, chunk_id, 0, 0, 0.0, end)?;
                index = end;
                continue;
            }

            // Fixed delay between successive batch calls, success or not
            if !first_batch {
                tokio::time::sleep(Duration::from_millis(self.config.batch_delay_ms)).await;
            }
            first_batch = false;

            let batch: Vec<(String, Option<String>)> = pending
                .iter()
                .map(|&i| (records[i].name.clone(), records[i].primary_country.clone()))
                .collect();

            match self.call_batch(&batch).await {
                Ok(results) => {
                    let merged = merge_batch(records, &pending, &results);
                    self.store.save_chunk(chunk_id, records)?;
                    let cost = merged as f64 * self.config.cost_per_name;
                    self.checkpoints
                        .advance(state, chunk_id, merged, 0, cost, end)?;
                    tracing::info!(chunk = chunk_id, batch = batch.len(), merged, "Batch enriched");
                }
                Err(e) => {
                    tracing::warn!(chunk = chunk_id, error = %e, "Batch failed after retries");
                    for (name, _) in &batch {
                        state.error_names.push(name.clone());
                    }
                    self.checkpoints
                        .advance(state, chunk_id, 0, batch.len(), 0.0, end)?;
                }
            }

            index = end;
        }

        Ok(RunOutcome::Completed)
    }

    /// Re-drive previously failed names through the batch path, once.
    ///
    /// The snapshot is taken off `errorNames` up front; batches that fail
    /// again append their names back, so a name appears once per failed
    /// attempt-cycle. The resume cursor is untouched — these batches
    /// revisit chunks the cursor has already passed.
    async fn retry_error_names(
        &self,
        state: &mut CheckpointState,
        chunk_ids: &[u32],
    ) -> AppResult<RunOutcome> {
        // Dedup, preserving first-seen order and original casing
        let mut seen = HashSet::new();
        let targets: Vec<String> = state
            .error_names
            .drain(..)
            .filter(|name| seen.insert(name.to_lowercase()))
            .collect();
        self.checkpoints.save(state)?;

        tracing::info!(count = targets.len(), "Retrying previously failed names");

        let mut remaining: HashMap<String, String> = targets
            .iter()
            .map(|name| (name.to_lowercase(), name.clone()))
            .collect();

        let mut first_batch = true;

        for &chunk_id in chunk_ids {
            if remaining.is_empty() {
                break;
            }

            let mut records = match self.store.load_chunk(chunk_id) {
                Ok(records) => records,
                Err(AppError::Format(msg)) => {
                    tracing::warn!(chunk = chunk_id, "Skipping malformed chunk: {}", msg);
                    continue;
                }
                Err(e) => return Err(e),
            };

            // Names that turn out to be complete already are simply done
            for record in &records {
                if !record.needs_enrichment() {
                    remaining.remove(&record.name.to_lowercase());
                }
            }

            let hits: Vec<usize> = records
                .iter()
                .enumerate()
                .filter(|(_, r)| {
                    r.needs_enrichment() && remaining.contains_key(&r.name.to_lowercase())
                })
                .map(|(i, _)| i)
                .collect();

            for window in hits.chunks(self.config.batch_size.max(1)) {
                if self.is_interrupted() {
                    // No silent drops: whatever was not reached goes back
                    // on the list, and the pass stays un-done.
                    state.error_names.extend(remaining.values().cloned());
                    return Ok(RunOutcome::Interrupted);
                }

                if !first_batch {
                    tokio::time::sleep(Duration::from_millis(self.config.batch_delay_ms)).await;
                }
                first_batch = false;

                let batch: Vec<(String, Option<String>)> = window
                    .iter()
                    .map(|&i| (records[i].name.clone(), records[i].primary_country.clone()))
                    .collect();

                match self.call_batch(&batch).await {
                    Ok(results) => {
                        let merged = merge_batch(&mut records, window, &results);
                        self.store.save_chunk(chunk_id, &records)?;
                        let cost = merged as f64 * self.config.cost_per_name;
                        state.apply_counters(chunk_id, merged, 0, cost);
                        self.checkpoints.save(state)?;
                        tracing::info!(chunk = chunk_id, merged, "Retry batch enriched");
                    }
                    Err(e) => {
                        tracing::warn!(chunk = chunk_id, error = %e, "Retry batch failed again");
                        for (name, _) in &batch {
                            state.error_names.push(name.clone());
                        }
                        state.apply_counters(chunk_id, 0, batch.len(), 0.0);
                        self.checkpoints.save(state)?;
                    }
                }

                for &i in window {
                    remaining.remove(&records[i].name.to_lowercase());
                }
            }
        }

        // Names not present in any chunk stay recorded rather than
        // vanishing
        if !remaining.is_empty() {
            tracing::warn!(
                count = remaining.len(),
                "Error names not found in any chunk"
            );
            state.error_names.extend(remaining.into_values());
        }

        state.errors_retried = true;
        self.checkpoints.save(state)?;
        Ok(RunOutcome::Completed)
    }

    /// One batch request with retry/backoff; returns the validated array.
    async fn call_batch(
        &self,
        batch: &[(String, Option<String>)],
    ) -> AppResult<Vec<EnrichedFields>> {
        let built = build_batch_prompt(&self.prompt, batch)?;

        let mut request = LlmRequest::new(built.user, &self.model)
            .with_temperature(0.3)
            .with_max_tokens(2000);
        if let Some(system) = built.system {
            request = request.with_system(system);
        }

        let expected = batch.len();
        let base_delay = Duration::from_millis(self.config.retry_base_delay_ms);
        let client = self.client.clone();

        with_retry(self.config.max_retries, base_delay, move |attempt| {
            let client = client.clone();
            let request = request.clone();
            async move {
                if attempt > 1 {
                    tracing::debug!(attempt, "Retrying batch");
                }
                let response = client.complete(&request).await?;
                parse_batch_response(&response.content, expected)
            }
        })
        .await
    }
}

/// Merge a validated response array into the chunk records.
///
/// Each response element targets a record in the batch window, matched by
/// lowercase name (positional when names agree, by search otherwise).
/// Returns the number of records updated.
fn merge_batch(
    records: &mut [NameRecord],
    window: &[usize],
    results: &[EnrichedFields],
) -> usize {
    let now = Utc::now();
    let mut used = vec![false; window.len()];
    let mut merged = 0;

    for (ri, result) in results.iter().enumerate() {
        let wanted = result.name.to_lowercase();

        let mut slot = None;
        if ri < window.len() && !used[ri] && records[window[ri]].name.to_lowercase() == wanted {
            slot = Some(ri);
        } else {
            for (wi, &i) in window.iter().enumerate() {
                if !used[wi] && records[i].name.to_lowercase() == wanted {
                    slot = Some(wi);
                    break;
                }
            }
        }

        match slot {
            Some(wi) => {
                used[wi] = true;
                records[window[wi]].apply_enrichment(
                    result.meaning.clone(),
                    result.origin.clone(),
                    result.cultural_context.clone(),
                    now,
                );
                merged += 1;
            }
            None => {
                tracing::warn!(name = %result.name, "Response name not in batch; ignoring");
            }
        }
    }

    merged
}

/// Extract and validate the JSON array from a model completion.
///
/// Tolerates markdown code-fence wrapping around the payload; falls back to
/// a greedy bracket match before parsing. The array length must equal the
/// batch length — anything else fails the whole batch, no partial credit.
fn parse_batch_response(content: &str, expected: usize) -> AppResult<Vec<EnrichedFields>> {
    let fence = Regex::new(r"(?s)```(?:json)?\s*(\[.*?\])\s*```")
        .map_err(|e| AppError::Llm(format!("Invalid fence pattern: {}", e)))?;
    let array = Regex::new(r"(?s)\[.*\]")
        .map_err(|e| AppError::Llm(format!("Invalid array pattern: {}", e)))?;

    let json = if let Some(captures) = fence.captures(content) {
        captures
            .get(1)
            .map(|m| m.as_str())
            .unwrap_or_default()
    } else if let Some(found) = array.find(content) {
        found.as_str()
    } else {
        return Err(AppError::Llm("No JSON array found in response".to_string()));
    };

    let results: Vec<EnrichedFields> = serde_json::from_str(json)
        .map_err(|e| AppError::Llm(format!("Invalid JSON in response: {}", e)))?;

    if results.len() != expected {
        return Err(AppError::Llm(format!(
            "Response cardinality mismatch: expected {}, got {}",
            expected,
            results.len()
        )));
    }

    Ok(results)
}
