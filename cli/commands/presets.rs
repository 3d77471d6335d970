use anyhow::{Context, Result};
use colored::*;
use ctxbuild_core::{
    AppError, FilterRuleSet, JsonPresetStore, NamedRuleSet, RuleKind, RuleSetStore,
    builtin_presets, create_preset, delete_preset, find_preset, find_preset_mut,
};

use crate::cli_args::{PatternOpts, PresetAction, PresetsArgs};
use crate::{open_preset_store, output};

pub fn handle_presets_command(args: PresetsArgs, quiet: bool) -> Result<()> {
    let store = open_preset_store(None, args.presets_file.as_ref())?;
    log::debug!("Using presets file: {}", store.path().display());

    match args.action {
        PresetAction::List => {
            let presets = store.load();
            output::print_presets_table(&presets, store.path());
        }
        PresetAction::Show { name } => {
            let presets = store.load();
            let preset = find_preset(&presets, &name).ok_or_else(|| unknown_preset(&name))?;
            let json = output::serialize_output(preset, "json", false)?;
            output::write_to_stdout(&json)?;
        }
        PresetAction::Create { name, from } => {
            let mut presets = store.load();
            let rules = match from.as_deref() {
                Some(source) => find_preset(&presets, source)
                    .map(|p| p.rules.clone())
                    .ok_or_else(|| unknown_preset(source))?,
                None => FilterRuleSet::new(),
            };
            create_preset(&mut presets, &name, rules)?;
            save(&store, &presets)?;
            if !quiet {
                println!("{} Created preset '{}'.", "✅".green(), name.trim().cyan());
            }
        }
        PresetAction::Delete { name, yes } => {
            let mut presets = store.load();
            if !yes {
                if quiet {
                    anyhow::bail!(AppError::InvalidArgument(
                        "Refusing to delete a preset in quiet mode without --yes".to_string()
                    ));
                }
                let question = format!("Delete preset '{}'?", name.cyan());
                if !output::confirm(&question, quiet)? {
                    println!("Delete cancelled.");
                    return Ok(());
                }
            }
            let removed = delete_preset(&mut presets, &name)?;
            save(&store, &presets)?;
            if !quiet {
                println!("{} Deleted preset '{}'.", "✅".green(), removed.name.cyan());
            }
        }
        PresetAction::Add { name, patterns } => {
            let changed = edit_patterns(&store, &name, &patterns, FilterRuleSet::add_pattern)?;
            if !quiet {
                println!(
                    "{} Added {} pattern(s) to '{}'.",
                    "✅".green(),
                    changed,
                    name.cyan()
                );
            }
        }
        PresetAction::Remove { name, patterns } => {
            let changed = edit_patterns(&store, &name, &patterns, FilterRuleSet::remove_pattern)?;
            if !quiet {
                println!(
                    "{} Removed {} pattern(s) from '{}'.",
                    "✅".green(),
                    changed,
                    name.cyan()
                );
            }
        }
        PresetAction::Reset { yes } => {
            if !yes {
                if quiet {
                    anyhow::bail!(AppError::InvalidArgument(
                        "Refusing to reset presets in quiet mode without --yes".to_string()
                    ));
                }
                let question = format!(
                    "Replace all presets in '{}' with the built-in defaults?",
                    store.path().display().to_string().cyan()
                );
                if !output::confirm(&question, quiet)? {
                    println!("Reset cancelled.");
                    return Ok(());
                }
            }
            save(&store, &builtin_presets())?;
            if !quiet {
                println!(
                    "{} Presets reset to defaults in: {}",
                    "✅".green(),
                    store.path().display().to_string().blue()
                );
            }
        }
    }
    Ok(())
}

/// Applies `edit` to every pattern given on the command line and saves the
/// presets when anything changed. Returns the number of changed entries.
fn edit_patterns(
    store: &JsonPresetStore,
    name: &str,
    patterns: &PatternOpts,
    edit: fn(&mut FilterRuleSet, RuleKind, &str) -> bool,
) -> Result<usize> {
    let mut presets = store.load();
    let preset = find_preset_mut(&mut presets, name).ok_or_else(|| unknown_preset(name))?;

    let requested = [
        (RuleKind::Folder, &patterns.folders),
        (RuleKind::File, &patterns.files),
        (RuleKind::Extension, &patterns.extensions),
    ];
    let mut changed = 0;
    for (kind, values) in requested {
        for value in values {
            if edit(&mut preset.rules, kind, value) {
                changed += 1;
            } else {
                log::info!("No change for {:?} pattern '{}'", kind, value);
            }
        }
    }

    if changed > 0 {
        save(store, &presets)?;
    }
    Ok(changed)
}

fn save(store: &JsonPresetStore, presets: &[NamedRuleSet]) -> Result<()> {
    store
        .save(presets)
        .with_context(|| format!("Failed to write presets to {}", store.path().display()))
}

fn unknown_preset(name: &str) -> AppError {
    AppError::InvalidArgument(format!("Unknown preset '{}'", name))
}
