use crate::cli_args::GenerateArgs;
use crate::output;
use crate::{load_config_for_command, resolve_rules};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use ctxbuild_core::{AppError, CancellationToken, Config, ContextGenerator, GenerationResult};
use serde::Serialize;
use std::env;
use std::path::{Path, PathBuf};
use tiktoken_rs::cl100k_base;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationReport<'a> {
    generated_at: DateTime<Utc>,
    project_root: String,
    preset: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    exact_token_count: Option<usize>,
    #[serde(flatten)]
    result: &'a GenerationResult,
}

pub fn handle_generate_command(args: GenerateArgs, quiet: bool) -> Result<()> {
    let project_root = Config::determine_project_root(args.project_config.project_root.as_ref())
        .context("Failed to determine project root")?;
    log::info!("Project root determined: {}", project_root.display());

    let config = load_config_for_command(&project_root, &args.project_config)
        .context("Failed to load configuration")?;

    let format = args
        .format_output
        .format
        .clone()
        .unwrap_or_else(|| config.output.format.to_lowercase());
    if args.tree_only && format != "text" {
        anyhow::bail!(AppError::InvalidArgument(
            "--tree-only can only be used with the 'text' format".to_string()
        ));
    }

    let (preset_name, rules) = resolve_rules(&config, &args.preset_select, &args.filters)
        .context("Failed to resolve filter rules")?;

    let output_path = resolve_output_path(&args, &config, &project_root);
    let mut generator = ContextGenerator::new(rules).with_detector(config.build_detector());
    if let Some(target) = output_path.as_deref().and_then(resolve_target_path) {
        log::debug!("Excluding output target from the walk: {}", target.display());
        generator = generator.with_excluded_path(target);
    }

    if args.tree_only {
        let tree = generator
            .build_tree(&project_root)
            .context("Failed to build directory tree")?;
        for warning in &tree.warnings {
            log::warn!("Skipped '{}': {}", warning.path, warning.message);
        }
        output::write_output(&tree.text, output_path.as_deref())?;
        return Ok(());
    }

    install_interrupt_handler(generator.cancellation().clone());
    let task = generator
        .spawn(project_root.clone())
        .context("Failed to start generation")?;
    let result = task.join().context("Context generation failed")?;

    let exact_tokens = if args.exact_tokens {
        Some(count_exact_tokens(&result.full_content)?)
    } else {
        None
    };

    let content = match format.as_str() {
        "text" => result.full_content.clone(),
        structured => {
            let report = GenerationReport {
                generated_at: Utc::now(),
                project_root: project_root.to_string_lossy().to_string(),
                preset: &preset_name,
                exact_token_count: exact_tokens,
                result: &result,
            };
            output::serialize_output(&report, structured, args.format_output.compact)?
        }
    };

    output::write_output(&content, output_path.as_deref())?;

    if !quiet {
        output::print_generation_summary(
            &result,
            &preset_name,
            exact_tokens,
            output_path.as_deref(),
        );
    }
    Ok(())
}

fn resolve_output_path(args: &GenerateArgs, config: &Config, project_root: &Path) -> Option<PathBuf> {
    if args.stdout {
        log::debug!("Output target set to stdout (forced).");
        return None;
    }
    let path = args
        .output
        .clone()
        .or_else(|| config.output_path(project_root));
    match &path {
        Some(p) => log::debug!("Output target set to file: {}", p.display()),
        None => log::debug!("Output target set to stdout (default)."),
    }
    path
}

/// Absolute form of an output path with its parent canonicalized, so it
/// compares equal to the same file reached by walking the canonical root.
/// `None` when the parent does not exist yet, in which case the file cannot
/// be inside the tree either.
fn resolve_target_path(path: &Path) -> Option<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir().ok()?.join(path)
    };
    let file_name = absolute.file_name()?;
    let parent = absolute.parent()?.canonicalize().ok()?;
    Some(parent.join(file_name))
}

/// Ctrl-C stops the walk at the next filesystem operation.
fn install_interrupt_handler(cancel: CancellationToken) {
    let result = ctrlc::set_handler(move || {
        log::warn!("Interrupt received, stopping generation...");
        cancel.cancel();
    });
    if let Err(e) = result {
        log::warn!("Could not install Ctrl-C handler: {}", e);
    }
}

fn count_exact_tokens(content: &str) -> Result<usize> {
    let bpe = cl100k_base()
        .map_err(|e| anyhow::anyhow!("Failed to load cl100k tokenizer: {}", e))?;
    Ok(bpe.encode_ordinary(content).len())
}
