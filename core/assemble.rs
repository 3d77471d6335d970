use crate::binary::{BinaryDetector, Classification};
use crate::error::{AppError, Result};
use crate::filter::relative_path_string;
use crate::generator::CancellationToken;
use crate::tree::TraversalWarning;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const FILE_HEADER_PREFIX: &str = "# FILE: ";
pub const BINARY_NOTE: &str = "(binary file skipped)";

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum FileOutcome {
    /// Content was inlined; `chars` is its length in Unicode scalar values.
    Included { chars: usize },
    Binary,
    Failed { reason: String },
}

/// What happened to one file of the list, in traversal order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    pub relative_path: String,
    #[serde(flatten)]
    pub outcome: FileOutcome,
}

impl FileReport {
    pub fn note(&self) -> Option<String> {
        match &self.outcome {
            FileOutcome::Included { .. } => None,
            FileOutcome::Binary => Some(BINARY_NOTE.to_string()),
            FileOutcome::Failed { reason } => Some(format!("(error reading file: {})", reason)),
        }
    }

    /// The `# FILE:` line as it appears in the document, without newline.
    pub fn header(&self) -> String {
        match self.note() {
            Some(note) => format!("{}{} {}", FILE_HEADER_PREFIX, self.relative_path, note),
            None => format!("{}{}", FILE_HEADER_PREFIX, self.relative_path),
        }
    }

    pub fn is_included(&self) -> bool {
        matches!(self.outcome, FileOutcome::Included { .. })
    }
}

/// Output of one generation run. Owned entirely by the caller.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResult {
    pub full_content: String,
    pub tree_preview: String,
    pub file_count: usize,
    pub total_bytes: u64,
    pub estimated_token_count: usize,
    pub files: Vec<FileReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<TraversalWarning>,
}

impl GenerationResult {
    pub fn with_warnings(mut self, warnings: Vec<TraversalWarning>) -> Self {
        self.warnings = warnings;
        self
    }

    pub fn skipped_count(&self) -> usize {
        self.files.len() - self.file_count
    }
}

/// Rough token estimate: one token per four characters.
pub fn estimate_tokens(content: &str) -> usize {
    content.chars().count() / 4
}

/// Reads the surviving files and concatenates them under per-file headers.
#[derive(Debug, Clone, Default)]
pub struct ContentAssembler {
    detector: BinaryDetector,
}

impl ContentAssembler {
    pub fn new(detector: BinaryDetector) -> Self {
        Self { detector }
    }

    pub fn assemble(
        &self,
        root: &Path,
        tree_text: &str,
        files: &[PathBuf],
        cancel: &CancellationToken,
    ) -> Result<GenerationResult> {
        log::debug!("Assembling content for {} files...", files.len());

        let mut content = String::with_capacity(tree_text.len() + 1);
        content.push_str(tree_text);
        content.push('\n');

        let mut reports = Vec::with_capacity(files.len());
        let mut file_count = 0usize;
        let mut total_bytes = 0u64;

        for path in files {
            if cancel.is_cancelled() {
                log::info!("Content assembly cancelled after {} files.", reports.len());
                return Err(AppError::Cancelled);
            }

            let relative_path = relative_path_string(root, path);
            let (outcome, text) = match self.detector.classify(path) {
                Classification::Binary(reason) => {
                    log::trace!("Binary ({:?}): {}", reason, relative_path);
                    (FileOutcome::Binary, None)
                }
                Classification::Text => match read_text(path) {
                    Ok(text) => (
                        FileOutcome::Included {
                            chars: text.chars().count(),
                        },
                        Some(text),
                    ),
                    Err(reason) => {
                        log::warn!("Failed to read {}: {}", relative_path, reason);
                        (FileOutcome::Failed { reason }, None)
                    }
                },
            };

            let report = FileReport {
                relative_path,
                outcome,
            };
            content.push_str(&report.header());
            content.push('\n');
            if let (FileOutcome::Included { chars }, Some(text)) = (&report.outcome, text) {
                content.push_str(&text);
                content.push('\n');
                content.push('\n');
                file_count += 1;
                total_bytes += *chars as u64;
            }
            reports.push(report);
        }

        let estimated_token_count = estimate_tokens(&content);
        log::debug!(
            "Assembly complete: {} of {} files included.",
            file_count,
            reports.len()
        );
        Ok(GenerationResult {
            full_content: content,
            tree_preview: tree_text.to_string(),
            file_count,
            total_bytes,
            estimated_token_count,
            files: reports,
            warnings: Vec::new(),
        })
    }
}

fn read_text(path: &Path) -> std::result::Result<String, String> {
    let bytes = fs::read(path).map_err(|e| e.to_string())?;
    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes);
    String::from_utf8(body.to_vec()).map_err(|e| {
        format!(
            "invalid UTF-8 at byte {}",
            e.utf8_error().valid_up_to() + (bytes.len() - body.len())
        )
    })
}
