use serde::{Deserialize, Serialize};

pub mod defaults;

/// Exclusion patterns applied during a single generation run.
///
/// The lists are kept in the order the user wrote them so that persisted
/// presets round-trip unchanged; matching never depends on that order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterRuleSet {
    /// Folder names (matched against every path segment) or root-relative
    /// folder paths such as `src/temp`.
    pub ignored_folders: Vec<String>,
    /// Exact file names or root-relative file paths.
    pub ignored_files: Vec<String>,
    /// Extensions including the leading dot, e.g. `.lock`.
    pub ignored_extensions: Vec<String>,
}

impl FilterRuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ignored_folders<I, S>(mut self, folders: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored_folders.extend(folders.into_iter().map(Into::into));
        self
    }

    pub fn with_ignored_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored_files.extend(files.into_iter().map(Into::into));
        self
    }

    pub fn with_ignored_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored_extensions
            .extend(extensions.into_iter().map(Into::into));
        self
    }

    fn patterns_mut(&mut self, kind: RuleKind) -> &mut Vec<String> {
        match kind {
            RuleKind::Folder => &mut self.ignored_folders,
            RuleKind::File => &mut self.ignored_files,
            RuleKind::Extension => &mut self.ignored_extensions,
        }
    }

    /// Adds one pattern unless it is blank or an equivalent one is already
    /// listed. Extensions are stored with a leading dot.
    /// Returns whether the list changed.
    pub fn add_pattern(&mut self, kind: RuleKind, pattern: &str) -> bool {
        let trimmed = pattern.trim();
        if trimmed.is_empty() {
            return false;
        }
        let stored = match kind {
            RuleKind::Extension if !trimmed.starts_with('.') => format!(".{}", trimmed),
            RuleKind::Extension => trimmed.to_string(),
            RuleKind::Folder | RuleKind::File => normalize_separators(trimmed),
        };
        let key = kind.key();
        let normalized = key(&stored);
        let list = self.patterns_mut(kind);
        if list.iter().any(|existing| key(existing) == normalized) {
            log::debug!("Pattern '{}' already present, skipped.", stored);
            return false;
        }
        list.push(stored);
        true
    }

    /// Removes every entry equivalent to `pattern`. Returns whether any was
    /// removed.
    pub fn remove_pattern(&mut self, kind: RuleKind, pattern: &str) -> bool {
        let key = kind.key();
        let normalized = key(pattern);
        let list = self.patterns_mut(kind);
        let before = list.len();
        list.retain(|existing| key(existing) != normalized);
        list.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.ignored_folders.is_empty()
            && self.ignored_files.is_empty()
            && self.ignored_extensions.is_empty()
    }

    /// Appends the patterns of `other` that are not already present
    /// (compared the same way the filter compares them).
    pub fn merge(&mut self, other: &FilterRuleSet) {
        append_missing(&mut self.ignored_folders, &other.ignored_folders, normalize_pattern);
        append_missing(&mut self.ignored_files, &other.ignored_files, normalize_pattern);
        append_missing(
            &mut self.ignored_extensions,
            &other.ignored_extensions,
            normalize_extension,
        );
    }
}

/// One of the three pattern lists of a rule set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Folder,
    File,
    Extension,
}

impl RuleKind {
    fn key(self) -> fn(&str) -> String {
        match self {
            RuleKind::Folder | RuleKind::File => normalize_pattern,
            RuleKind::Extension => normalize_extension,
        }
    }
}

fn append_missing(target: &mut Vec<String>, extra: &[String], key: fn(&str) -> String) {
    for pattern in extra {
        let normalized = key(pattern);
        if !target.iter().any(|existing| key(existing) == normalized) {
            log::trace!("Adding filter pattern: {}", pattern);
            target.push(pattern.clone());
        }
    }
}

/// A rule set with the name it is stored and selected under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedRuleSet {
    #[serde(default = "default_preset_name")]
    pub name: String,
    #[serde(flatten)]
    pub rules: FilterRuleSet,
}

impl NamedRuleSet {
    pub fn new(name: impl Into<String>, rules: FilterRuleSet) -> Self {
        Self {
            name: name.into(),
            rules,
        }
    }
}

fn default_preset_name() -> String {
    "Unnamed Preset".to_string()
}

/// Finds a preset by name, ignoring case.
pub fn find_preset<'a>(presets: &'a [NamedRuleSet], name: &str) -> Option<&'a NamedRuleSet> {
    presets
        .iter()
        .find(|preset| preset.name.trim().to_lowercase() == name.trim().to_lowercase())
}

pub fn find_preset_mut<'a>(
    presets: &'a mut [NamedRuleSet],
    name: &str,
) -> Option<&'a mut NamedRuleSet> {
    presets
        .iter_mut()
        .find(|preset| preset.name.trim().to_lowercase() == name.trim().to_lowercase())
}

/// Lowercases a folder/file pattern and normalizes separators to `/`.
/// Leading `./` and surrounding slashes are dropped so `"src/temp/"` and
/// `"./src/temp"` both mean the root-relative path `src/temp`.
pub fn normalize_pattern(pattern: &str) -> String {
    let unified = pattern.trim().replace('\\', "/");
    let without_dot = unified.strip_prefix("./").unwrap_or(&unified);
    without_dot.trim_matches('/').to_lowercase()
}

/// Lowercases an extension pattern and guarantees a single leading dot.
pub fn normalize_extension(pattern: &str) -> String {
    let trimmed = pattern.trim().trim_start_matches('*').trim_start_matches('.');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(".{}", trimmed.to_lowercase())
    }
}

/// Converts a relative path string to `/` separators.
pub fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}
