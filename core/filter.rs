use crate::rules::{FilterRuleSet, normalize_extension, normalize_pattern, normalize_separators};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

/// A filesystem entry as seen by the filter during traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub name: String,
    pub full_path: PathBuf,
    pub is_directory: bool,
    pub is_hidden: bool,
}

impl TreeEntry {
    pub fn from_dir_entry(entry: &walkdir::DirEntry) -> Self {
        let name = entry.file_name().to_string_lossy().into_owned();
        let is_hidden = is_hidden(entry, &name);
        Self {
            is_directory: entry.file_type().is_dir(),
            full_path: entry.path().to_path_buf(),
            name,
            is_hidden,
        }
    }
}

#[cfg(windows)]
fn is_hidden(entry: &walkdir::DirEntry, _name: &str) -> bool {
    use std::os::windows::fs::MetadataExt;
    const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;
    entry
        .metadata()
        .map(|m| m.file_attributes() & FILE_ATTRIBUTE_HIDDEN != 0)
        .unwrap_or(false)
}

#[cfg(not(windows))]
fn is_hidden(_entry: &walkdir::DirEntry, name: &str) -> bool {
    name.starts_with('.')
}

/// Returns the extension of a file name with its leading dot, or an empty
/// string when there is none. `archive.tar.gz` yields `.gz`.
pub fn extension_of(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if idx + 1 < name.len() => &name[idx..],
        _ => "",
    }
}

/// Root-relative path of `path` with `/` separators.
pub fn relative_path_string(root: &Path, path: &Path) -> String {
    let relative = pathdiff::diff_paths(path, root).unwrap_or_else(|| path.to_path_buf());
    let joined = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/");
    normalize_separators(&joined)
}

/// Decides, for each traversed entry, whether it is excluded by a rule set.
///
/// Patterns are normalized once on construction; every check afterwards is
/// a case-insensitive comparison against `/`-separated root-relative paths.
#[derive(Debug, Clone, Default)]
pub struct FilterEngine {
    folders: Vec<String>,
    files: HashSet<String>,
    extensions: HashSet<String>,
    excluded_paths: Vec<PathBuf>,
}

impl FilterEngine {
    pub fn new(rules: &FilterRuleSet) -> Self {
        let folders = rules
            .ignored_folders
            .iter()
            .map(|p| normalize_pattern(p))
            .filter(|p| !p.is_empty())
            .collect();
        let files = rules
            .ignored_files
            .iter()
            .map(|p| normalize_pattern(p))
            .filter(|p| !p.is_empty())
            .collect();
        let extensions = rules
            .ignored_extensions
            .iter()
            .map(|p| normalize_extension(p))
            .collect();
        Self {
            folders,
            files,
            extensions,
            excluded_paths: Vec::new(),
        }
    }

    /// Exact filesystem paths to leave out regardless of the rule set, such
    /// as the document being written inside the scanned tree.
    pub fn with_excluded_paths(mut self, paths: &[PathBuf]) -> Self {
        self.excluded_paths.extend_from_slice(paths);
        self
    }

    pub fn is_excluded(&self, entry: &TreeEntry, root: &Path) -> bool {
        if self.excluded_paths.iter().any(|p| *p == entry.full_path) {
            log::debug!("Excluded (output target): {}", entry.full_path.display());
            return true;
        }

        if entry.is_hidden {
            log::trace!("Excluded (hidden): {}", entry.full_path.display());
            return true;
        }

        let relative = relative_path_string(root, &entry.full_path).to_lowercase();

        for folder in &self.folders {
            if relative.split('/').any(|segment| segment == folder) {
                log::trace!("Excluded (folder name '{}'): {}", folder, relative);
                return true;
            }
            if relative == *folder
                || relative
                    .strip_prefix(folder.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
            {
                log::trace!("Excluded (folder path '{}'): {}", folder, relative);
                return true;
            }
        }

        if entry.is_directory {
            return false;
        }

        let name = entry.name.to_lowercase();
        if self.files.contains(&name) || self.files.contains(&relative) {
            log::trace!("Excluded (file): {}", relative);
            return true;
        }

        // An empty entry stands for "no extension".
        let extension = extension_of(&name);
        if self.extensions.contains(extension) {
            log::trace!("Excluded (extension '{}'): {}", extension, relative);
            return true;
        }

        false
    }
}
