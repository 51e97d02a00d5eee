//! Prompt system for the nameforge CLI.
//!
//! Prompt definitions are Handlebars templates with a YAML envelope. The
//! batch enrichment prompt is compiled in; a workspace can override it by
//! dropping a file under `.nameforge/prompts/`.

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types and functions
pub use builder::build_batch_prompt;
pub use loader::{default_batch_prompt, load_prompt, BATCH_ENRICH_PROMPT_ID};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition, STANDARD_ORIGINS};
