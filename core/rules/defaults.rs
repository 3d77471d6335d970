// core/rules/defaults.rs
use crate::error::{AppError, Result};
use crate::rules::NamedRuleSet;
use once_cell::sync::Lazy;

static DEFAULT_PRESETS_YAML: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../data/default_presets.yaml"
));

static DEFAULT_PRESETS: Lazy<Vec<NamedRuleSet>> = Lazy::new(|| {
    parse_presets(DEFAULT_PRESETS_YAML).unwrap_or_else(|e| {
        log::error!("Embedded default presets are invalid: {}", e);
        Vec::new()
    })
});

fn parse_presets(yaml: &str) -> Result<Vec<NamedRuleSet>> {
    serde_yml::from_str(yaml).map_err(|e| {
        AppError::DataLoading(format!("Failed to parse default presets: {}", e))
    })
}

/// The two presets shipped with the tool: a web project preset and a
/// managed-language (.NET) preset.
pub fn builtin_presets() -> Vec<NamedRuleSet> {
    DEFAULT_PRESETS.clone()
}
