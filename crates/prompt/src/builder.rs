//! Prompt builder for rendering batch enrichment templates.

use crate::loader::origins_fragment;
use crate::types::{BuiltPrompt, PromptDefinition};
use nameforge_core::{AppError, AppResult};
use handlebars::Handlebars;
use std::collections::HashMap;

/// Build the batch enrichment prompt for a set of names.
///
/// This function:
/// 1. Formats each name with its optional country-code hint (`Name (CC)`)
/// 2. Fills the template variables: `names`, `count`, `origins`
/// 3. Renders the template using Handlebars
/// 4. Returns a `BuiltPrompt` ready for LLM execution
///
/// # Arguments
/// * `definition` - Prompt definition (built-in or workspace override)
/// * `names` - Batch of (name, optional country hint) pairs, in order
pub fn build_batch_prompt(
    definition: &PromptDefinition,
    names: &[(String, Option<String>)],
) -> AppResult<BuiltPrompt> {
    tracing::debug!("Building prompt: {} ({} names)", definition.id, names.len());

    let formatted: Vec<String> = names
        .iter()
        .map(|(name, hint)| match hint {
            Some(cc) if !cc.is_empty() => format!("{} ({})", name, cc),
            _ => name.clone(),
        })
        .collect();

    let mut variables = HashMap::new();
    variables.insert("names".to_string(), formatted.join(", "));
    variables.insert("count".to_string(), names.len().to_string());
    variables.insert("origins".to_string(), origins_fragment());

    let rendered = render_template(&definition.template, &variables)?;

    Ok(BuiltPrompt::new(
        definition.system.clone(),
        rendered,
        definition.id.clone(),
        variables,
    ))
}

/// Render a Handlebars template with variables.
fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Disable HTML escaping for plain text
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    let rendered = handlebars
        .render("prompt", &variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))?;

    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::default_batch_prompt;

    fn batch(names: &[(&str, Option<&str>)]) -> Vec<(String, Option<String>)> {
        names
            .iter()
            .map(|(n, h)| (n.to_string(), h.map(|s| s.to_string())))
            .collect()
    }

    #[test]
    fn test_render_simple_template() {
        let mut vars = HashMap::new();
        vars.insert("names".to_string(), "Ada, Lin".to_string());

        let result = render_template("Names: {{names}}", &vars);
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), "Names: Ada, Lin");
    }

    #[test]
    fn test_build_batch_prompt_with_hints() {
        let def = default_batch_prompt();
        let names = batch(&[("Daliangelis", Some("PR")), ("Keanu", None)]);

        let built = build_batch_prompt(&def, &names).unwrap();
        assert!(built.user.contains("Daliangelis (PR), Keanu"));
        assert!(built.user.contains("EXACTLY 2 objects"));
        assert!(built.system.is_some());
        assert_eq!(built.metadata.source_prompt_id, "enrich.batch.default");
    }

    #[test]
    fn test_build_batch_prompt_includes_origin_vocabulary() {
        let def = default_batch_prompt();
        let names = batch(&[("Ada", None)]);

        let built = build_batch_prompt(&def, &names).unwrap();
        assert!(built.user.contains("Hebrew"));
        assert!(built.user.contains("Slavic"));
    }

    #[test]
    fn test_empty_country_hint_is_omitted() {
        let def = default_batch_prompt();
        let names = vec![("Ada".to_string(), Some(String::new()))];

        let built = build_batch_prompt(&def, &names).unwrap();
        assert!(built.user.contains("Names to analyze: Ada"));
        assert!(!built.user.contains("Ada ()"));
    }
}
