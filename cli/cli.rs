mod cli_args;
mod commands;
mod output;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use colored::*;
use std::path::{Path, PathBuf};
use std::process;

use cli_args::{Cli, Commands, FilterGroup, PresetSelectOpts, ProjectConfigOpts};
use ctxbuild_core::{
    AppError, Config, FilterRuleSet, JsonPresetStore, NamedRuleSet, RuleSetStore, find_preset,
};

fn main() {
    let cli_args = Cli::parse();

    setup_logging(cli_args.quiet, cli_args.verbose);

    let quiet = cli_args.quiet;

    log::debug!("CLI args parsed: {:?}", cli_args);

    let exit_code = match run_app(cli_args, quiet) {
        Ok(_) => {
            log::info!("Application finished successfully.");
            0
        }
        Err(e) => {
            let exit_code = exit_code_for(&e);

            // Config and argument errors are shown even in quiet mode.
            if !quiet || exit_code == 1 || exit_code == 5 {
                eprintln!("{} {:#}", "Error:".red().bold(), e);
            } else {
                log::error!("Application failed: {:#}", e);
            }

            exit_code
        }
    };
    log::debug!("Exiting with code {}", exit_code);
    process::exit(exit_code);
}

fn exit_code_for(error: &anyhow::Error) -> i32 {
    match error.downcast_ref::<AppError>() {
        Some(AppError::Config(_)) => 1,
        Some(AppError::TomlParse(_)) => 1,
        Some(AppError::TomlSerialize(_)) => 1,
        Some(AppError::DataLoading(_)) => 1,
        Some(AppError::Io(_)) => 2,
        Some(AppError::FileRead { .. }) => 2,
        Some(AppError::FileWrite { .. }) => 2,
        Some(AppError::DirCreation { .. }) => 2,
        Some(AppError::InvalidRoot { .. }) => 2,
        Some(AppError::InvalidArgument(_)) => 5,
        Some(AppError::JsonSerialize(_)) => 6,
        Some(AppError::YamlError(_)) => 6,
        Some(AppError::Cancelled) => 130,
        Some(_) => 1,
        None => 1,
    }
}

fn setup_logging(quiet: bool, verbose: u8) {
    let log_level = if quiet {
        log::LevelFilter::Off
    } else {
        match verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();
    log::trace!("Logger initialized with level: {:?}", log_level);
}

fn run_app(cli: Cli, quiet: bool) -> Result<()> {
    match cli.command {
        None => {
            Cli::command().print_help()?;
        }
        Some(command) => match command {
            Commands::Generate(args) => {
                log::debug!("Executing 'generate' command...");
                commands::generate::handle_generate_command(args, quiet)?;
            }
            Commands::Presets(args) => {
                log::debug!("Executing 'presets' command...");
                commands::presets::handle_presets_command(args, quiet)?;
            }
            Commands::Config(args) => {
                log::debug!("Executing 'config' command...");
                let project_root = Config::determine_project_root(args.project_root.as_ref())
                    .context("Failed to determine project root for config command")?;
                commands::config::handle_config_command(&args, &project_root, quiet)?;
            }
            Commands::Completion(args) => {
                log::debug!("Executing 'completion' command...");
                commands::completion::handle_completion_command(&args, quiet)?;
            }
        },
    }
    Ok(())
}

pub fn load_config_for_command(
    project_root: &Path,
    project_opts: &ProjectConfigOpts,
) -> Result<Config> {
    let config_path = Config::resolve_config_path(
        project_root,
        project_opts.config_file.as_ref(),
        project_opts.disable_config,
    )
    .context("Failed to resolve configuration path")?;

    let config = match &config_path {
        Some(path) => Config::load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    log::trace!("Effective config: {:?}", config);
    Ok(config)
}

/// CLI flag wins over the config file, which wins over the per-user default.
pub fn open_preset_store(
    config: Option<&Config>,
    cli_presets_file: Option<&PathBuf>,
) -> Result<JsonPresetStore> {
    if let Some(path) = cli_presets_file {
        return Ok(JsonPresetStore::new(path));
    }
    if let Some(path) = config.and_then(Config::presets_path) {
        return Ok(JsonPresetStore::new(path));
    }
    JsonPresetStore::default_location().context("Failed to locate presets file")
}

/// Picks the preset named on the command line or in the config, else the
/// first stored one, and appends config and CLI filter overrides to it.
pub fn resolve_rules(
    config: &Config,
    select: &PresetSelectOpts,
    filters: &FilterGroup,
) -> Result<(String, FilterRuleSet)> {
    let store = open_preset_store(Some(config), select.presets_file.as_ref())?;
    let presets = store.load();
    let requested = select
        .preset
        .as_deref()
        .or(config.general.preset.as_deref());

    let preset: NamedRuleSet = match requested {
        Some(name) => find_preset(&presets, name).cloned().ok_or_else(|| {
            let available: Vec<&str> = presets.iter().map(|p| p.name.as_str()).collect();
            AppError::InvalidArgument(format!(
                "Unknown preset '{}'. Available presets: {}",
                name,
                available.join(", ")
            ))
        })?,
        None => presets
            .into_iter()
            .next()
            .unwrap_or_else(|| NamedRuleSet::new("None", FilterRuleSet::new())),
    };
    log::info!("Using preset: {}", preset.name);

    let NamedRuleSet { name, mut rules } = preset;
    rules.merge(&config.filters.to_rule_set());
    rules.merge(
        &FilterRuleSet::new()
            .with_ignored_folders(filters.ignore_folders.iter().cloned())
            .with_ignored_files(filters.ignore_files.iter().cloned())
            .with_ignored_extensions(filters.ignore_extensions.iter().cloned()),
    );
    if rules.is_empty() {
        log::info!("No filter rules active, only hidden entries are skipped.");
    } else {
        log::debug!("Effective rules: {:?}", rules);
    }
    Ok((name, rules))
}
