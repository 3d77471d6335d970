use crate::error::{AppError, Result};
use crate::filter::{FilterEngine, TreeEntry, relative_path_string};
use crate::generator::CancellationToken;
use serde::Serialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const TREE_TITLE: &str = "# PROJECT STRUCTURE";
pub const SEPARATOR: &str = "=================";

const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const PIPE: &str = "│   ";
const BLANK: &str = "    ";

/// A subtree that could not be listed. The walk continues without it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraversalWarning {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct TreeOutput {
    /// Header, tree lines and footer.
    pub text: String,
    /// Surviving files in discovery order.
    pub files: Vec<PathBuf>,
    pub warnings: Vec<TraversalWarning>,
}

#[derive(Debug)]
struct WalkedNode {
    depth: usize,
    name: String,
    is_last: bool,
}

/// Walks `root` depth-first with siblings sorted by name, pruning every
/// entry the filter excludes, and renders the surviving structure.
pub fn build_tree(
    root: &Path,
    engine: &FilterEngine,
    cancel: &CancellationToken,
) -> Result<TreeOutput> {
    log::debug!("Building tree for: {}", root.display());

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0 || !engine.is_excluded(&TreeEntry::from_dir_entry(entry), root)
        });

    let mut nodes = Vec::<WalkedNode>::new();
    let mut files = Vec::<PathBuf>::new();
    let mut warnings = Vec::<TraversalWarning>::new();

    for entry_result in walker {
        if cancel.is_cancelled() {
            log::info!("Tree walk cancelled at {} entries.", nodes.len());
            return Err(AppError::Cancelled);
        }
        match entry_result {
            Ok(entry) => {
                if entry.depth() == 0 {
                    continue;
                }
                if !entry.file_type().is_dir() {
                    files.push(entry.path().to_path_buf());
                }
                nodes.push(WalkedNode {
                    depth: entry.depth(),
                    name: entry.file_name().to_string_lossy().into_owned(),
                    is_last: false,
                });
            }
            Err(e) => {
                let path = e
                    .path()
                    .map(|p| relative_path_string(root, p))
                    .unwrap_or_default();
                log::warn!("Skipping unreadable subtree '{}': {}", path, e);
                warnings.push(TraversalWarning {
                    path,
                    message: e.to_string(),
                });
            }
        }
    }

    mark_last_children(&mut nodes);

    let mut text = String::new();
    text.push_str(TREE_TITLE);
    text.push('\n');
    text.push_str(SEPARATOR);
    text.push('\n');
    text.push_str(&root_display_name(root));
    text.push_str("/\n");
    render_lines(&nodes, &mut text);
    text.push('\n');
    text.push_str(SEPARATOR);
    text.push('\n');

    log::debug!(
        "Tree built: {} entries, {} files, {} warnings.",
        nodes.len(),
        files.len(),
        warnings.len()
    );
    Ok(TreeOutput {
        text,
        files,
        warnings,
    })
}

/// Pre-order input: an entry is its parent's last child when no entry at
/// the same depth follows before the walk climbs above that depth.
fn mark_last_children(nodes: &mut [WalkedNode]) {
    let mut has_following: Vec<bool> = Vec::new();
    for node in nodes.iter_mut().rev() {
        if has_following.len() <= node.depth {
            has_following.resize(node.depth + 1, false);
        }
        node.is_last = !has_following[node.depth];
        has_following[node.depth] = true;
        has_following.truncate(node.depth + 1);
    }
}

fn render_lines(nodes: &[WalkedNode], out: &mut String) {
    // ancestors[i] is true when the ancestor at depth i + 1 was a last child.
    let mut ancestors: Vec<bool> = Vec::new();
    for node in nodes {
        ancestors.truncate(node.depth - 1);
        for &ancestor_was_last in &ancestors {
            out.push_str(if ancestor_was_last { BLANK } else { PIPE });
        }
        out.push_str(if node.is_last { LAST_BRANCH } else { BRANCH });
        out.push_str(&node.name);
        out.push('\n');
        ancestors.push(node.is_last);
    }
}

fn root_display_name(root: &Path) -> String {
    root.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| root.display().to_string())
}
