//! Prompt types for the nameforge CLI.
//!
//! This module defines the domain entities for the prompt system.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Standard origin vocabulary supplied to the model as guidance.
///
/// The model may also emit compound origins as comma-separated strings
/// ("Spanish, Latin"); the vocabulary constrains single origins, it does
/// not forbid compounds.
pub const STANDARD_ORIGINS: &[&str] = &[
    "Hebrew",
    "Greek",
    "Latin",
    "Arabic",
    "Germanic",
    "Celtic",
    "English",
    "French",
    "Spanish",
    "Italian",
    "Irish",
    "Scottish",
    "Welsh",
    "Norse",
    "Russian",
    "Polish",
    "Dutch",
    "Portuguese",
    "Indian",
    "Japanese",
    "Chinese",
    "Korean",
    "Filipino",
    "African",
    "Persian",
    "Turkish",
    "Hawaiian",
    "Native-American",
    "Biblical",
    "Slavic",
];

/// A prompt definition, loadable from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Unique prompt identifier
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// System message sent alongside the rendered template
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    /// Template string with Handlebars syntax
    pub template: String,
}

/// A fully built prompt ready for LLM execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPrompt {
    /// System message (optional)
    pub system: Option<String>,

    /// User message (required)
    pub user: String,

    /// Metadata about the built prompt
    pub metadata: BuiltPromptMetadata,
}

/// Metadata about a built prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPromptMetadata {
    /// Source prompt ID
    #[serde(rename = "sourcePromptId")]
    pub source_prompt_id: String,

    /// Template variables that were resolved
    #[serde(rename = "resolvedVariables")]
    pub resolved_variables: HashMap<String, String>,
}

impl BuiltPrompt {
    /// Create a new built prompt.
    pub fn new(
        system: Option<String>,
        user: String,
        source_prompt_id: String,
        resolved_variables: HashMap<String, String>,
    ) -> Self {
        Self {
            system,
            user,
            metadata: BuiltPromptMetadata {
                source_prompt_id,
                resolved_variables,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_definition_deserialization() {
        let yaml = r#"
id: test.prompt
title: Test Prompt
system: Be terse.
template: "{{names}}"
"#;

        let def: PromptDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(def.id, "test.prompt");
        assert_eq!(def.system.as_deref(), Some("Be terse."));
        assert_eq!(def.template, "{{names}}");
    }

    #[test]
    fn test_built_prompt_creation() {
        let mut vars = HashMap::new();
        vars.insert("names".to_string(), "Ada, Lin".to_string());

        let built = BuiltPrompt::new(
            Some("System message".to_string()),
            "User message".to_string(),
            "test.prompt".to_string(),
            vars,
        );

        assert_eq!(built.system, Some("System message".to_string()));
        assert_eq!(built.user, "User message");
        assert_eq!(built.metadata.source_prompt_id, "test.prompt");
    }

    #[test]
    fn test_standard_origins_exclude_modern_and_unknown() {
        assert!(!STANDARD_ORIGINS.contains(&"Modern"));
        assert!(!STANDARD_ORIGINS.contains(&"Unknown"));
    }
}
