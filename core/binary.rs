use crate::error::{AppError, Result};
use crate::filter::extension_of;
use crate::rules::normalize_extension;
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

pub const DEFAULT_SAMPLE_SIZE: usize = 8192;

static BINARY_EXTENSIONS_YAML: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/../data/binary_extensions.yaml"
));

static BUILTIN_BINARY_EXTENSIONS: Lazy<HashSet<String>> = Lazy::new(|| {
    parse_extension_groups(BINARY_EXTENSIONS_YAML).unwrap_or_else(|e| {
        log::error!("Embedded binary extension list is invalid: {}", e);
        HashSet::new()
    })
});

fn parse_extension_groups(yaml: &str) -> Result<HashSet<String>> {
    let groups: BTreeMap<String, Vec<String>> = serde_yml::from_str(yaml).map_err(|e| {
        AppError::DataLoading(format!("Failed to parse binary extension list: {}", e))
    })?;
    Ok(groups
        .values()
        .flatten()
        .map(|ext| normalize_extension(ext))
        .filter(|ext| !ext.is_empty())
        .collect())
}

/// The built-in denylist of known binary extensions (lowercase, dotted).
pub fn builtin_binary_extensions() -> &'static HashSet<String> {
    &BUILTIN_BINARY_EXTENSIONS
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Text,
    Binary(BinaryReason),
}

impl Classification {
    pub fn is_binary(&self) -> bool {
        matches!(self, Classification::Binary(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryReason {
    Extension,
    NullByte,
    Unreadable,
}

/// Heuristic binary classifier: extension denylist first, then a zero-byte
/// scan of the head of the file.
#[derive(Debug, Clone)]
pub struct BinaryDetector {
    extensions: HashSet<String>,
    sample_size: usize,
}

impl Default for BinaryDetector {
    fn default() -> Self {
        Self {
            extensions: builtin_binary_extensions().clone(),
            sample_size: DEFAULT_SAMPLE_SIZE,
        }
    }
}

impl BinaryDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_extra_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for ext in extensions {
            let normalized = normalize_extension(ext.as_ref());
            if !normalized.is_empty() {
                self.extensions.insert(normalized);
            }
        }
        self
    }

    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size.max(1);
        self
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    pub fn classify(&self, path: &Path) -> Classification {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        let extension = extension_of(&name);
        if !extension.is_empty() && self.extensions.contains(extension) {
            return Classification::Binary(BinaryReason::Extension);
        }

        match self.sample_has_null_byte(path) {
            Ok(true) => Classification::Binary(BinaryReason::NullByte),
            Ok(false) => Classification::Text,
            Err(e) => {
                log::debug!(
                    "Could not sample {} for binary check, treating as binary: {}",
                    path.display(),
                    e
                );
                Classification::Binary(BinaryReason::Unreadable)
            }
        }
    }

    pub fn is_binary(&self, path: &Path) -> bool {
        self.classify(path).is_binary()
    }

    fn sample_has_null_byte(&self, path: &Path) -> std::io::Result<bool> {
        let file = File::open(path)?;
        let mut sample = Vec::with_capacity(self.sample_size);
        file.take(self.sample_size as u64).read_to_end(&mut sample)?;
        Ok(sample.contains(&0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn embedded_list_covers_common_formats() {
        let exts = builtin_binary_extensions();
        for ext in [".png", ".mp3", ".zip", ".exe", ".sqlite", ".pyc", ".woff2", ".pdf"] {
            assert!(exts.contains(ext), "missing {}", ext);
        }
        assert!(!exts.contains(".rs"));
    }

    #[test]
    fn known_extension_is_binary_without_reading() {
        let detector = BinaryDetector::new();
        let missing = Path::new("/definitely/not/here/photo.JPG");
        assert_eq!(
            detector.classify(missing),
            Classification::Binary(BinaryReason::Extension)
        );
    }

    #[test]
    fn null_byte_in_sample_means_binary() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("blob.custom");
        fs::write(&path, [b'a', b'b', 0, b'c']).unwrap();
        assert_eq!(
            BinaryDetector::new().classify(&path),
            Classification::Binary(BinaryReason::NullByte)
        );
    }

    #[test]
    fn null_byte_past_sample_is_not_seen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("late.txt");
        let mut content = vec![b'x'; 32];
        content.push(0);
        fs::write(&path, &content).unwrap();
        let detector = BinaryDetector::new().with_sample_size(16);
        assert_eq!(detector.classify(&path), Classification::Text);
        assert!(BinaryDetector::new().is_binary(&path));
    }

    #[test]
    fn empty_and_plain_files_are_text() {
        let dir = TempDir::new().unwrap();
        let empty = dir.path().join("empty");
        let plain = dir.path().join("Dockerfile");
        fs::write(&empty, "").unwrap();
        fs::write(&plain, "FROM rust:latest\n").unwrap();
        let detector = BinaryDetector::new();
        assert_eq!(detector.classify(&empty), Classification::Text);
        assert_eq!(detector.classify(&plain), Classification::Text);
    }

    #[test]
    fn unreadable_file_is_treated_as_binary() {
        let detector = BinaryDetector::new();
        assert_eq!(
            detector.classify(Path::new("/definitely/not/here/notes.txt")),
            Classification::Binary(BinaryReason::Unreadable)
        );
    }

    #[test]
    fn extra_extensions_extend_the_denylist() {
        let detector = BinaryDetector::new().with_extra_extensions(["blend", ".FBX"]);
        assert!(detector.is_binary(Path::new("/nowhere/scene.blend")));
        assert!(detector.is_binary(Path::new("/nowhere/mesh.fbx")));
    }
}
