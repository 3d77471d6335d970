use anyhow::{Context, Result};
use byte_unit::{Byte, UnitType};
use colored::*;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL};
use ctxbuild_core::{GenerationResult, NamedRuleSet};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

pub fn write_output(content: &str, output_path: Option<&Path>) -> Result<()> {
    match output_path {
        Some(path) => write_to_file(path, content),
        None => write_to_stdout(content),
    }
}

pub fn serialize_output<T: Serialize>(data: &T, format: &str, compact: bool) -> Result<String> {
    match format.to_lowercase().as_str() {
        "yaml" | "yml" => serde_yml::to_string(data).context("Failed to serialize YAML"),
        _ => {
            let json = if compact {
                serde_json::to_string(data)
            } else {
                serde_json::to_string_pretty(data)
            };
            json.context("Failed to serialize JSON")
        }
    }
}

pub fn write_to_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let mut file =
        File::create(path).with_context(|| format!("Failed to create file {}", path.display()))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write to file {}", path.display()))?;
    Ok(())
}

/// Asks a y/N question on stdout. Quiet mode never prompts and refuses.
pub fn confirm(question: &str, quiet: bool) -> Result<bool> {
    if quiet {
        return Ok(false);
    }
    print!("{} {} [{}/{}] ", "⚠️".yellow(), question, "y".green(), "N".red());
    io::stdout().flush().context("Failed to flush stdout")?;
    let mut response = String::new();
    io::stdin()
        .read_line(&mut response)
        .context("Failed to read user input")?;
    Ok(response.trim().eq_ignore_ascii_case("y"))
}

pub fn write_to_stdout(content: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(content.as_bytes())
        .context("Failed to write to stdout")?;
    if !content.ends_with('\n') {
        handle
            .write_all(b"\n")
            .context("Failed to write newline to stdout")?;
    }
    handle.flush().context("Failed to flush stdout")?;
    Ok(())
}

/// Run summary, printed to stderr so stdout stays a clean document.
pub fn print_generation_summary(
    result: &GenerationResult,
    preset_name: &str,
    exact_tokens: Option<usize>,
    output_path: Option<&Path>,
) {
    let size = Byte::from_u64(result.full_content.len() as u64)
        .get_appropriate_unit(UnitType::Binary)
        .to_string();

    eprintln!();
    eprintln!("{}", " Context Summary ".green().bold().underline());
    eprintln!("{:<20} {}", "Preset:".green(), preset_name.cyan());
    eprintln!(
        "{:<20} {}",
        "Files included:".green(),
        result.file_count.to_string().cyan()
    );
    eprintln!(
        "{:<20} {}",
        "Files skipped:".green(),
        result.skipped_count().to_string().cyan()
    );
    eprintln!(
        "{:<20} {}",
        "Characters:".green(),
        result.total_bytes.to_string().cyan()
    );
    eprintln!("{:<20} {}", "Output size:".green(), size.cyan());
    eprintln!(
        "{:<20} {}",
        "Est. tokens:".green(),
        result.estimated_token_count.to_string().cyan()
    );
    if let Some(tokens) = exact_tokens {
        eprintln!(
            "{:<20} {}",
            "cl100k tokens:".green(),
            tokens.to_string().cyan()
        );
    }
    for warning in &result.warnings {
        eprintln!(
            "{} Skipped '{}': {}",
            "⚠️".yellow(),
            warning.path,
            warning.message
        );
    }
    if let Some(path) = output_path {
        eprintln!(
            "{} Context saved to: {}",
            "✅".green(),
            path.display().to_string().blue()
        );
    }
}

pub fn print_presets_table(presets: &[NamedRuleSet], store_path: &Path) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Name").fg(Color::Green),
        Cell::new("Folders").fg(Color::Green),
        Cell::new("Files").fg(Color::Green),
        Cell::new("Extensions").fg(Color::Green),
    ]);
    for preset in presets {
        table.add_row(vec![
            Cell::new(&preset.name).fg(Color::Cyan),
            Cell::new(preset.rules.ignored_folders.join(", ")),
            Cell::new(preset.rules.ignored_files.join(", ")),
            Cell::new(preset.rules.ignored_extensions.join(" ")).fg(Color::DarkGrey),
        ]);
    }
    println!("{table}");
    println!(
        "{} {}",
        "Stored in:".dimmed(),
        store_path.display().to_string().dimmed()
    );
}
