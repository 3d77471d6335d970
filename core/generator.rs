use crate::assemble::{ContentAssembler, GenerationResult};
use crate::binary::BinaryDetector;
use crate::error::{AppError, Result};
use crate::filter::FilterEngine;
use crate::rules::FilterRuleSet;
use crate::tree::{self, TreeOutput};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

/// Cooperative cancellation flag, checked between filesystem operations.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Composes filtering, tree rendering and content assembly into one run.
///
/// The generator owns its copy of the rule set, so a caller editing its own
/// rules while a run is in flight cannot affect that run.
#[derive(Debug, Clone)]
pub struct ContextGenerator {
    rules: FilterRuleSet,
    detector: BinaryDetector,
    cancel: CancellationToken,
    excluded_paths: Vec<PathBuf>,
}

impl ContextGenerator {
    pub fn new(rules: FilterRuleSet) -> Self {
        Self {
            rules,
            detector: BinaryDetector::default(),
            cancel: CancellationToken::new(),
            excluded_paths: Vec::new(),
        }
    }

    pub fn with_detector(mut self, detector: BinaryDetector) -> Self {
        self.detector = detector;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Leaves `path` out of the walk. `path` must be absolute and resolved the
    /// same way as the root, or it will never match.
    pub fn with_excluded_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.excluded_paths.push(path.into());
        self
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Walks and filters `root`, returning only the tree and file list.
    pub fn build_tree(&self, root: &Path) -> Result<TreeOutput> {
        validate_root(root)?;
        let engine = FilterEngine::new(&self.rules).with_excluded_paths(&self.excluded_paths);
        tree::build_tree(root, &engine, &self.cancel)
    }

    pub fn generate(&self, root: &Path) -> Result<GenerationResult> {
        log::info!("Starting context generation for: {}", root.display());
        let tree = self.build_tree(root)?;
        let TreeOutput {
            text,
            files,
            warnings,
        } = tree;

        let assembler = ContentAssembler::new(self.detector.clone());
        let result = assembler
            .assemble(root, &text, &files, &self.cancel)?
            .with_warnings(warnings);

        log::info!(
            "Generated context: {} files included, {} skipped, {} chars, ~{} tokens.",
            result.file_count,
            result.skipped_count(),
            result.total_bytes,
            result.estimated_token_count
        );
        Ok(result)
    }

    /// Runs `generate` on a dedicated worker thread.
    pub fn spawn(self, root: impl Into<PathBuf>) -> Result<GenerationTask> {
        let root = root.into();
        let handle = thread::Builder::new()
            .name("ctxbuild-worker".to_string())
            .spawn(move || self.generate(&root))
            .map_err(|e| AppError::Worker(format!("Failed to spawn worker thread: {}", e)))?;
        Ok(GenerationTask { handle })
    }
}

/// A generation running on a worker thread.
#[derive(Debug)]
pub struct GenerationTask {
    handle: JoinHandle<Result<GenerationResult>>,
}

impl GenerationTask {
    pub fn join(self) -> Result<GenerationResult> {
        self.handle
            .join()
            .map_err(|_| AppError::Worker("Generation worker panicked".to_string()))?
    }
}

fn validate_root(root: &Path) -> Result<()> {
    let metadata = std::fs::metadata(root).map_err(|e| AppError::InvalidRoot {
        path: root.to_path_buf(),
        reason: format!("cannot be accessed: {}", e),
    })?;
    if !metadata.is_dir() {
        return Err(AppError::InvalidRoot {
            path: root.to_path_buf(),
            reason: "is not a directory".to_string(),
        });
    }
    Ok(())
}
