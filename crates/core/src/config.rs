//! Configuration management for the nameforge CLI.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Environment variables
//! - Command-line flags
//! - Config files (.nameforge/config.yaml)
//!
//! The configuration is workspace-centric: chunk files live under the data
//! directory and all mutable pipeline state lives under `.nameforge/`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::{AppError, AppResult};

/// Main application configuration.
///
/// This struct holds all global configuration options that affect
/// CLI behavior across commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .nameforge/ and the data dir)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Text-generation provider (currently "openai")
    pub provider: String,

    /// Default model identifier
    pub model: String,

    /// API key for the provider, if given directly
    pub api_key: Option<String>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Provider configurations from config.yaml
    pub llm: Option<LlmSection>,

    /// Enrichment pipeline tunables
    pub enrichment: EnrichmentConfig,
}

/// Provider configuration section from config.yaml.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSection {
    #[serde(rename = "activeProvider")]
    pub active_provider: String,

    pub providers: HashMap<String, ProviderSettings>,
}

/// Settings for a single text-generation provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Environment variable holding the API key
    #[serde(rename = "apiKeyEnv", skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// Model identifier
    pub model: String,

    /// Custom endpoint URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Per-request timeout in seconds
    #[serde(rename = "timeoutSecs", skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// Tunables for the batch enrichment pipeline.
///
/// All delays are fixed (not adaptive); rate limiting toward the external
/// API is a constant sleep between batches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    /// Directory holding the chunk files (names-chunk<N>.json)
    #[serde(rename = "dataDir")]
    pub data_dir: PathBuf,

    /// Records per API call
    #[serde(rename = "batchSize")]
    pub batch_size: usize,

    /// Fixed delay between successive batch calls, in milliseconds
    #[serde(rename = "batchDelayMs")]
    pub batch_delay_ms: u64,

    /// Maximum attempts per batch before its names go to the error list
    #[serde(rename = "maxRetries")]
    pub max_retries: u32,

    /// Base backoff delay in milliseconds (actual delay = base * attempt)
    #[serde(rename = "retryBaseDelayMs")]
    pub retry_base_delay_ms: u64,

    /// Explicit HTTP request timeout in seconds
    #[serde(rename = "requestTimeoutSecs")]
    pub request_timeout_secs: u64,

    /// Advisory cost estimate per enriched record, in USD
    #[serde(rename = "costPerName")]
    pub cost_per_name: f64,

    /// Wall-clock interval between monitor reports, in seconds
    #[serde(rename = "reportIntervalSecs")]
    pub report_interval_secs: u64,

    /// Checkpoint staleness threshold for the stuck alert, in seconds
    #[serde(rename = "stuckThresholdSecs")]
    pub stuck_threshold_secs: u64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            batch_size: 10,
            batch_delay_ms: 1500,
            max_retries: 3,
            retry_base_delay_ms: 3000,
            request_timeout_secs: 60,
            cost_per_name: 0.000_05,
            report_interval_secs: 300,
            stuck_threshold_secs: 600,
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmSection>,
    enrichment: Option<EnrichmentFileSection>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
}

/// Enrichment overrides as they appear in config.yaml (all optional).
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EnrichmentFileSection {
    #[serde(rename = "dataDir")]
    data_dir: Option<PathBuf>,
    #[serde(rename = "batchSize")]
    batch_size: Option<usize>,
    #[serde(rename = "batchDelayMs")]
    batch_delay_ms: Option<u64>,
    #[serde(rename = "maxRetries")]
    max_retries: Option<u32>,
    #[serde(rename = "retryBaseDelayMs")]
    retry_base_delay_ms: Option<u64>,
    #[serde(rename = "requestTimeoutSecs")]
    request_timeout_secs: Option<u64>,
    #[serde(rename = "costPerName")]
    cost_per_name: Option<f64>,
    #[serde(rename = "reportIntervalSecs")]
    report_interval_secs: Option<u64>,
    #[serde(rename = "stuckThresholdSecs")]
    stuck_threshold_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            log_level: None,
            verbose: false,
            no_color: false,
            llm: None,
            enrichment: EnrichmentConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and defaults.
    ///
    /// Environment variables:
    /// - `NAMEFORGE_WORKSPACE`: Override workspace path
    /// - `NAMEFORGE_CONFIG`: Path to config file
    /// - `NAMEFORGE_PROVIDER`: Text-generation provider
    /// - `NAMEFORGE_MODEL`: Model identifier
    /// - `NAMEFORGE_API_KEY`: API key
    /// - `NAMEFORGE_DATA_DIR`: Chunk file directory
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("NAMEFORGE_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Ok(config_file) = std::env::var("NAMEFORGE_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = if let Some(ref cf) = config.config_file {
            cf.clone()
        } else {
            config.workspace.join(".nameforge/config.yaml")
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("NAMEFORGE_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("NAMEFORGE_MODEL") {
            config.model = model;
        }

        if let Ok(data_dir) = std::env::var("NAMEFORGE_DATA_DIR") {
            config.enrichment.data_dir = PathBuf::from(data_dir);
        }

        config.api_key = std::env::var("NAMEFORGE_API_KEY").ok();
        config.log_level = std::env::var("RUST_LOG").ok();

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&mut self, path: &PathBuf) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(ws) = config_file.workspace {
            if let Some(path) = ws.path {
                result.workspace = PathBuf::from(path);
            }
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(llm) = config_file.llm {
            result.provider = llm.active_provider.clone();

            if let Some(settings) = llm.providers.get(&llm.active_provider) {
                result.model = settings.model.clone();
            }

            result.llm = Some(llm);
        }

        if let Some(e) = config_file.enrichment {
            let target = &mut result.enrichment;
            if let Some(v) = e.data_dir {
                target.data_dir = v;
            }
            if let Some(v) = e.batch_size {
                target.batch_size = v;
            }
            if let Some(v) = e.batch_delay_ms {
                target.batch_delay_ms = v;
            }
            if let Some(v) = e.max_retries {
                target.max_retries = v;
            }
            if let Some(v) = e.retry_base_delay_ms {
                target.retry_base_delay_ms = v;
            }
            if let Some(v) = e.request_timeout_secs {
                target.request_timeout_secs = v;
            }
            if let Some(v) = e.cost_per_name {
                target.cost_per_name = v;
            }
            if let Some(v) = e.report_interval_secs {
                target.report_interval_secs = v;
            }
            if let Some(v) = e.stuck_threshold_secs {
                target.stuck_threshold_secs = v;
            }
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// This method merges command-line flags with the loaded configuration,
    /// giving precedence to CLI flags over environment variables.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .nameforge directory.
    pub fn nameforge_dir(&self) -> PathBuf {
        self.workspace.join(".nameforge")
    }

    /// Directory holding the chunk files, resolved against the workspace.
    pub fn data_dir(&self) -> PathBuf {
        if self.enrichment.data_dir.is_absolute() {
            self.enrichment.data_dir.clone()
        } else {
            self.workspace.join(&self.enrichment.data_dir)
        }
    }

    /// Directory holding checkpoint state and reports.
    pub fn state_dir(&self) -> PathBuf {
        self.nameforge_dir().join("enrichment")
    }

    /// Path to the checkpoint state file.
    pub fn checkpoint_path(&self) -> PathBuf {
        self.state_dir().join("state.json")
    }

    /// Directory the monitor writes dated report files into.
    pub fn reports_dir(&self) -> PathBuf {
        self.state_dir().join("reports")
    }

    /// Ensure the state directories exist.
    pub fn ensure_state_dirs(&self) -> AppResult<()> {
        let reports = self.reports_dir();
        if !reports.exists() {
            std::fs::create_dir_all(&reports).map_err(|e| {
                AppError::Config(format!("Failed to create state directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Get the active provider's settings, if configured.
    pub fn provider_settings(&self, provider: &str) -> Option<ProviderSettings> {
        self.llm
            .as_ref()
            .and_then(|llm| llm.providers.get(provider).cloned())
    }

    /// Resolve the API key for a provider.
    ///
    /// Checks `NAMEFORGE_API_KEY` first, then the provider's configured
    /// `apiKeyEnv` variable, then the provider's conventional default
    /// (`OPENAI_API_KEY` for openai).
    pub fn resolve_api_key(&self, provider: &str) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        let env_var = self
            .provider_settings(provider)
            .and_then(|s| s.api_key_env)
            .unwrap_or_else(|| default_key_env(provider).to_string());

        std::env::var(&env_var).ok()
    }

    /// Validate configuration for the active provider.
    ///
    /// A missing API credential is a fatal startup error, not a per-call
    /// failure: no work happens before this passes.
    pub fn validate(&self) -> AppResult<()> {
        let provider = &self.provider;
        let known_providers = ["openai"];

        if !known_providers.contains(&provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                provider,
                known_providers.join(", ")
            )));
        }

        if self.resolve_api_key(provider).is_none() {
            let env_var = self
                .provider_settings(provider)
                .and_then(|s| s.api_key_env)
                .unwrap_or_else(|| default_key_env(provider).to_string());
            return Err(AppError::Config(format!(
                "API key not found in environment variable: {}",
                env_var
            )));
        }

        if self.enrichment.batch_size == 0 {
            return Err(AppError::Config(
                "batchSize must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// Conventional API-key environment variable per provider.
fn default_key_env(provider: &str) -> &'static str {
    match provider {
        "openai" => "OPENAI_API_KEY",
        _ => "NAMEFORGE_API_KEY",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.provider, "openai");
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.enrichment.batch_size, 10);
        assert!(!config.verbose);
        assert!(!config.no_color);
    }

    #[test]
    fn test_state_paths() {
        let config = AppConfig::default();
        assert!(config.checkpoint_path().ends_with(".nameforge/enrichment/state.json"));
        assert!(config.reports_dir().ends_with(".nameforge/enrichment/reports"));
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default();
        let overridden = config.with_overrides(
            None,
            None,
            Some("openai".to_string()),
            Some("gpt-4o".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(overridden.provider, "openai");
        assert_eq!(overridden.model, "gpt-4o");
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_validate_unknown_provider() {
        let mut config = AppConfig::default();
        config.provider = "acme".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_missing_key_is_fatal() {
        let mut config = AppConfig::default();
        config.api_key = None;
        // Point key resolution at a variable that cannot exist
        config.llm = Some(LlmSection {
            active_provider: "openai".to_string(),
            providers: HashMap::from([(
                "openai".to_string(),
                ProviderSettings {
                    api_key_env: Some("NAMEFORGE_TEST_NO_SUCH_KEY".to_string()),
                    model: "gpt-4o-mini".to_string(),
                    endpoint: None,
                    timeout_secs: None,
                },
            )]),
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_with_direct_key() {
        let mut config = AppConfig::default();
        config.api_key = Some("sk-test".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_merge_yaml_enrichment_section() {
        let yaml = r#"
llm:
  activeProvider: openai
  providers:
    openai:
      apiKeyEnv: OPENAI_API_KEY
      model: gpt-4o-mini
enrichment:
  batchSize: 5
  batchDelayMs: 250
  dataDir: corpus
"#;
        let dir = std::env::temp_dir().join("nameforge-config-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.yaml");
        std::fs::write(&path, yaml).unwrap();

        let mut config = AppConfig::default();
        let merged = config.merge_yaml(&path).unwrap();

        assert_eq!(merged.provider, "openai");
        assert_eq!(merged.enrichment.batch_size, 5);
        assert_eq!(merged.enrichment.batch_delay_ms, 250);
        assert_eq!(merged.enrichment.data_dir, PathBuf::from("corpus"));
        // Untouched fields keep their defaults
        assert_eq!(merged.enrichment.max_retries, 3);
    }
}
