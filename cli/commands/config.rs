use anyhow::{Context, Result};
use colored::*;
use ctxbuild_core::Config;
use ctxbuild_core::config::{DEFAULT_CONFIG_DIR, DEFAULT_CONFIG_FILENAME};
use std::path::Path;

use crate::cli_args::ConfigArgs;
use crate::output;

pub fn handle_config_command(args: &ConfigArgs, project_root: &Path, quiet: bool) -> Result<()> {
    let default_toml = Config::default_toml().context("Failed to render default config")?;

    if !args.save {
        output::write_to_stdout(&default_toml)?;
        return Ok(());
    }

    let save_path = project_root
        .join(DEFAULT_CONFIG_DIR)
        .join(DEFAULT_CONFIG_FILENAME);

    if save_path.exists() {
        if quiet {
            anyhow::bail!(
                "Config file '{}' exists. Overwrite prevented in quiet mode.",
                save_path.display()
            );
        }
        let question = format!(
            "Config file already exists at '{}'. Overwrite?",
            save_path.display().to_string().cyan()
        );
        if !output::confirm(&question, quiet)? {
            println!("Save cancelled.");
            return Ok(());
        }
    }

    output::write_to_file(&save_path, &default_toml)?;
    log::info!("Default config written to {}", save_path.display());

    if !quiet {
        println!(
            "{} Default config saved to: {}",
            "✅".green(),
            save_path.display().to_string().blue()
        );
    }
    Ok(())
}
