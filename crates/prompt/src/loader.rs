//! Prompt definition loading.
//!
//! Prompt definitions are YAML files under `.nameforge/prompts/`. The batch
//! enrichment prompt ships as a compiled-in default so a fresh workspace
//! needs no prompt files at all; a file with the same id overrides it.

use crate::types::{PromptDefinition, STANDARD_ORIGINS};
use nameforge_core::{AppError, AppResult};
use std::path::Path;

/// Identifier of the built-in batch enrichment prompt.
pub const BATCH_ENRICH_PROMPT_ID: &str = "enrich.batch.default";

const BATCH_ENRICH_SYSTEM: &str = "You are an expert in etymology and cultural naming \
traditions. Provide concise, accurate analysis of baby names in valid JSON format. \
NEVER use \"Modern\" or \"Unknown\" as an origin - always find the real cultural root.";

const BATCH_ENRICH_TEMPLATE: &str = r#"Analyze the following baby names. For EACH name, provide:
1. A concise, accurate meaning (1-4 words maximum)
2. The cultural origin(s) from this list: {{origins}}
3. Optional brief cultural context (max 10 words)

CRITICAL INSTRUCTIONS:
- If a country code is provided in parentheses (e.g., PR, CO, ES), use it as a strong hint
- Multiple origins are allowed if a name has mixed heritage (e.g., "Spanish, Latin")
- Analyze name structure, phonetics, etymology, and linguistic patterns
- Look for root words, suffixes, prefixes that reveal true origin

Return a valid JSON array with EXACTLY {{count}} objects, one for each name in the SAME ORDER.

Format as JSON array:
[
  {
    "name": "exact name from input",
    "meaning": "1-4 words describing meaning",
    "origin": "Origin",
    "culturalContext": "brief cultural note if relevant"
  }
]

Names to analyze: {{names}}

IMPORTANT:
- Return EXACTLY {{count}} objects
- Maintain the exact order of input names
- Return valid JSON only, no markdown or explanations"#;

/// Load a prompt definition by id.
///
/// Looks for `.nameforge/prompts/<id>.yaml` under the workspace first,
/// falling back to the built-in definition when the id matches
/// [`BATCH_ENRICH_PROMPT_ID`].
pub fn load_prompt(workspace: &Path, id: &str) -> AppResult<PromptDefinition> {
    let path = workspace
        .join(".nameforge/prompts")
        .join(format!("{}.yaml", id));

    if path.exists() {
        tracing::debug!("Loading prompt definition from {:?}", path);
        let contents = std::fs::read_to_string(&path)
            .map_err(|e| AppError::Prompt(format!("Failed to read prompt {:?}: {}", path, e)))?;
        let def: PromptDefinition = serde_yaml::from_str(&contents)
            .map_err(|e| AppError::Prompt(format!("Failed to parse prompt {:?}: {}", path, e)))?;
        return Ok(def);
    }

    if id == BATCH_ENRICH_PROMPT_ID {
        return Ok(default_batch_prompt());
    }

    Err(AppError::Prompt(format!("Unknown prompt id: {}", id)))
}

/// The compiled-in batch enrichment prompt definition.
pub fn default_batch_prompt() -> PromptDefinition {
    PromptDefinition {
        id: BATCH_ENRICH_PROMPT_ID.to_string(),
        title: "Batch name enrichment".to_string(),
        system: Some(BATCH_ENRICH_SYSTEM.to_string()),
        template: BATCH_ENRICH_TEMPLATE.to_string(),
    }
}

/// The standard origin vocabulary as a comma-joined prompt fragment.
pub fn origins_fragment() -> String {
    STANDARD_ORIGINS.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_prompt_loads_without_files() {
        let dir = tempfile::tempdir().unwrap();
        let def = load_prompt(dir.path(), BATCH_ENRICH_PROMPT_ID).unwrap();
        assert_eq!(def.id, BATCH_ENRICH_PROMPT_ID);
        assert!(def.template.contains("{{count}}"));
        assert!(def.template.contains("{{names}}"));
        assert!(def.system.is_some());
    }

    #[test]
    fn test_unknown_prompt_id_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_prompt(dir.path(), "no.such.prompt").is_err());
    }

    #[test]
    fn test_workspace_file_overrides_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let prompts = dir.path().join(".nameforge/prompts");
        std::fs::create_dir_all(&prompts).unwrap();
        std::fs::write(
            prompts.join(format!("{}.yaml", BATCH_ENRICH_PROMPT_ID)),
            "id: enrich.batch.default\ntitle: Override\ntemplate: \"{{names}}\"\n",
        )
        .unwrap();

        let def = load_prompt(dir.path(), BATCH_ENRICH_PROMPT_ID).unwrap();
        assert_eq!(def.title, "Override");
        assert!(def.system.is_none());
    }
}
