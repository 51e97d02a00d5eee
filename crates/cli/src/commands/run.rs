//! Run command handler.
//!
//! Starts or resumes the enrichment pipeline. No flags are required: the
//! checkpoint decides where to resume.

use clap::Args;
use nameforge_core::{config::AppConfig, AppError, AppResult};
use nameforge_llm::create_client;
use nameforge_pipeline::{BatchEnricher, CheckpointManager, ChunkStore, RunOutcome, StatusReport};
use nameforge_prompt::{load_prompt, BATCH_ENRICH_PROMPT_ID};
use std::sync::atomic::Ordering;

/// Start or resume the enrichment pipeline
#[derive(Args, Debug)]
pub struct RunCommand {
    /// Output the final summary as JSON
    #[arg(long)]
    pub json: bool,
}

impl RunCommand {
    /// Execute the run command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing run command");

        // 1. Fail fast on startup problems (missing credential, bad config)
        config.validate()?;
        config.ensure_state_dirs()?;

        // 2. Resolve provider settings
        let settings = config.provider_settings(&config.provider);
        let endpoint = settings.as_ref().and_then(|s| s.endpoint.clone());
        let timeout_secs = settings
            .as_ref()
            .and_then(|s| s.timeout_secs)
            .unwrap_or(config.enrichment.request_timeout_secs);
        let api_key = config.resolve_api_key(&config.provider);

        // 3. Create the LLM client via the factory
        let client = create_client(
            &config.provider,
            endpoint.as_deref(),
            api_key.as_deref(),
            timeout_secs,
        )
        .map_err(AppError::Config)?;

        // 4. Load the enrichment prompt (workspace override or built-in)
        let prompt = load_prompt(&config.workspace, BATCH_ENRICH_PROMPT_ID)?;

        // 5. Wire the pipeline
        let store = ChunkStore::new(config.data_dir());
        let checkpoints = CheckpointManager::new(config.checkpoint_path());
        let enricher = BatchEnricher::new(
            client,
            store,
            checkpoints.clone(),
            prompt,
            &config.model,
            config.enrichment.clone(),
        );

        // 6. On interrupt: finish the in-flight batch, persist, exit 0
        let flag = enricher.interrupt_flag();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!(
                    "Interrupt received; finishing current batch and saving checkpoint"
                );
                flag.store(true, Ordering::SeqCst);
            }
        });

        // 7. Drive the run
        let outcome = enricher.run().await?;

        // 8. Final summary from the persisted state
        let state = checkpoints.load()?;
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

        match outcome {
            RunOutcome::Completed => tracing::info!("Run completed"),
            RunOutcome::Interrupted => {
                tracing::info!("Run interrupted; re-run `nameforge run` to resume")
            }
        }

        Ok(())
    }
}
