pub mod assemble;
pub mod binary;
pub mod config;
pub mod error;
pub mod filter;
pub mod generator;
pub mod presets;
pub mod rules;
pub mod tree;

pub use assemble::{ContentAssembler, FileOutcome, FileReport, GenerationResult, estimate_tokens};
pub use binary::{BinaryDetector, BinaryReason, Classification, builtin_binary_extensions};
pub use config::Config;
pub use error::{AppError, Result};
pub use filter::{FilterEngine, TreeEntry};
pub use generator::{CancellationToken, ContextGenerator, GenerationTask};
pub use presets::{
    JsonPresetStore, MemoryPresetStore, RuleSetStore, create_preset, delete_preset,
};
pub use rules::defaults::builtin_presets;
pub use rules::{FilterRuleSet, NamedRuleSet, RuleKind, find_preset, find_preset_mut};
pub use tree::{TraversalWarning, TreeOutput, build_tree};
