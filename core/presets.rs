use crate::error::{AppError, Result};
use crate::rules::defaults::builtin_presets;
use crate::rules::{FilterRuleSet, NamedRuleSet, find_preset};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const APP_DIR_NAME: &str = "ctxbuild";
pub const PRESETS_FILENAME: &str = "presets.json";

/// Source and sink of named rule sets.
///
/// `load` never fails: hosts always get something usable, falling back to
/// the built-in presets.
pub trait RuleSetStore {
    fn load(&self) -> Vec<NamedRuleSet>;
    fn save(&self, presets: &[NamedRuleSet]) -> Result<()>;
}

/// Presets persisted as pretty JSON, by default in the user config dir.
#[derive(Debug, Clone)]
pub struct JsonPresetStore {
    path: PathBuf,
}

impl JsonPresetStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/ctxbuild/presets.json`.
    pub fn default_location() -> Result<Self> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            AppError::Config("Could not determine the user configuration directory".to_string())
        })?;
        Ok(Self::new(config_dir.join(APP_DIR_NAME).join(PRESETS_FILENAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_presets(&self) -> Result<Vec<NamedRuleSet>> {
        let json = fs::read_to_string(&self.path).map_err(|e| AppError::FileRead {
            path: self.path.clone(),
            source: e,
        })?;
        Ok(serde_json::from_str(&json)?)
    }
}

impl RuleSetStore for JsonPresetStore {
    fn load(&self) -> Vec<NamedRuleSet> {
        if !self.path.exists() {
            log::info!(
                "No presets file at {}, writing built-in defaults.",
                self.path.display()
            );
            let defaults = builtin_presets();
            if let Err(e) = self.save(&defaults) {
                log::warn!("Failed to save default presets: {}", e);
            }
            return defaults;
        }

        match self.read_presets() {
            Ok(presets) if !presets.is_empty() => {
                log::debug!(
                    "Loaded {} presets from {}",
                    presets.len(),
                    self.path.display()
                );
                presets
            }
            Ok(_) => {
                log::warn!(
                    "Presets file {} is empty, using built-in defaults.",
                    self.path.display()
                );
                builtin_presets()
            }
            // The file is left untouched so it can be repaired by hand.
            Err(e) => {
                log::warn!(
                    "Could not load presets from {} ({}), using built-in defaults.",
                    self.path.display(),
                    e
                );
                builtin_presets()
            }
        }
    }

    fn save(&self, presets: &[NamedRuleSet]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| AppError::DirCreation {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let json = serde_json::to_string_pretty(presets)?;
        fs::write(&self.path, json).map_err(|e| AppError::FileWrite {
            path: self.path.clone(),
            source: e,
        })?;
        log::debug!("Saved {} presets to {}", presets.len(), self.path.display());
        Ok(())
    }
}

/// Appends a new preset. Names must be non-blank and unique ignoring case.
pub fn create_preset(
    presets: &mut Vec<NamedRuleSet>,
    name: &str,
    rules: FilterRuleSet,
) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidArgument(
            "Preset name must not be empty".to_string(),
        ));
    }
    if find_preset(presets, name).is_some() {
        return Err(AppError::InvalidArgument(format!(
            "A preset named '{}' already exists",
            name
        )));
    }
    presets.push(NamedRuleSet::new(name, rules));
    log::info!("Created preset '{}'", name);
    Ok(())
}

/// Removes a preset by name. The last remaining preset cannot be deleted.
pub fn delete_preset(presets: &mut Vec<NamedRuleSet>, name: &str) -> Result<NamedRuleSet> {
    let index = presets
        .iter()
        .position(|p| p.name.trim().to_lowercase() == name.trim().to_lowercase())
        .ok_or_else(|| AppError::InvalidArgument(format!("Unknown preset '{}'", name)))?;
    if presets.len() <= 1 {
        return Err(AppError::InvalidArgument(
            "Cannot delete the last remaining preset".to_string(),
        ));
    }
    let removed = presets.remove(index);
    log::info!("Deleted preset '{}'", removed.name);
    Ok(removed)
}

/// In-memory store for embedding hosts and tests.
#[derive(Debug, Default)]
pub struct MemoryPresetStore {
    presets: Mutex<Vec<NamedRuleSet>>,
}

impl MemoryPresetStore {
    pub fn new(presets: Vec<NamedRuleSet>) -> Self {
        Self {
            presets: Mutex::new(presets),
        }
    }
}

impl RuleSetStore for MemoryPresetStore {
    fn load(&self) -> Vec<NamedRuleSet> {
        let presets = self
            .presets
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default();
        if presets.is_empty() {
            builtin_presets()
        } else {
            presets
        }
    }

    fn save(&self, presets: &[NamedRuleSet]) -> Result<()> {
        let mut guard = self
            .presets
            .lock()
            .map_err(|_| AppError::Config("Preset store lock poisoned".to_string()))?;
        *guard = presets.to_vec();
        Ok(())
    }
}
