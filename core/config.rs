use crate::binary::{BinaryDetector, DEFAULT_SAMPLE_SIZE};
use crate::error::{AppError, Result};
use crate::rules::FilterRuleSet;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_DIR: &str = ".ctxbuild";
pub const DEFAULT_CONFIG_FILENAME: &str = "ctxbuild.toml";
pub const OUTPUT_FORMATS: &[&str] = &["text", "json", "yaml"];

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub filters: FiltersConfig,
    #[serde(default)]
    pub binary: BinaryConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct GeneralConfig {
    /// Preset used when none is named on the command line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
    /// Presets file overriding the per-user default location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presets_file: Option<String>,
}

/// Extra patterns appended to whichever preset is selected.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct FiltersConfig {
    #[serde(default)]
    pub ignored_folders: Vec<String>,
    #[serde(default)]
    pub ignored_files: Vec<String>,
    #[serde(default)]
    pub ignored_extensions: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BinaryConfig {
    #[serde(default)]
    pub extra_extensions: Vec<String>,
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file: Option<PathBuf>,
}

fn default_sample_size() -> usize {
    DEFAULT_SAMPLE_SIZE
}
fn default_format() -> String {
    "text".to_string()
}

impl Default for BinaryConfig {
    fn default() -> Self {
        Self {
            extra_extensions: Vec::new(),
            sample_size: default_sample_size(),
        }
    }
}
impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            output_file: None,
        }
    }
}

impl FiltersConfig {
    pub fn to_rule_set(&self) -> FilterRuleSet {
        FilterRuleSet::new()
            .with_ignored_folders(self.ignored_folders.iter().cloned())
            .with_ignored_files(self.ignored_files.iter().cloned())
            .with_ignored_extensions(self.ignored_extensions.iter().cloned())
    }
}

impl Config {
    pub fn determine_project_root(cli_project_root: Option<&PathBuf>) -> Result<PathBuf> {
        let path_str_opt = cli_project_root
            .map(|p| p.to_string_lossy().to_string())
            .or_else(|| env::var("PROJECT_ROOT").ok().filter(|s| !s.is_empty()));

        let path_to_resolve = match path_str_opt {
            Some(p_str) => PathBuf::from(shellexpand::tilde(&p_str).as_ref()),
            None => env::current_dir().map_err(AppError::Io)?,
        };

        path_to_resolve
            .canonicalize()
            .map_err(|e| AppError::InvalidRoot {
                path: path_to_resolve.clone(),
                reason: format!("cannot be resolved: {}", e),
            })
    }

    pub fn resolve_config_path(
        project_root: &Path,
        cli_config_file: Option<&String>,
        cli_disable_config: bool,
    ) -> Result<Option<PathBuf>> {
        if cli_disable_config {
            log::debug!("Config file loading disabled via CLI flag.");
            return Ok(None);
        }

        let Some(p_str) = cli_config_file else {
            let default_path = project_root
                .join(DEFAULT_CONFIG_DIR)
                .join(DEFAULT_CONFIG_FILENAME);
            if default_path.exists() {
                log::debug!("Using default config file path: {}", default_path.display());
                return Ok(Some(default_path));
            }
            log::debug!(
                "No config file specified and default not found at: {}",
                default_path.display()
            );
            return Ok(None);
        };

        let mut path = PathBuf::from(shellexpand::tilde(p_str).as_ref());
        let looks_like_path =
            path.is_absolute() || path.components().count() > 1 || p_str.contains(['/', '\\']);

        if looks_like_path {
            if !path.exists() && path.extension().is_none() {
                path.set_extension("toml");
            }
            if !path.exists() {
                return Err(AppError::Config(format!(
                    "Specified config file not found at path: {}",
                    path.display()
                )));
            }
            log::debug!("Using specified config file path: {}", path.display());
            return Ok(Some(path));
        }

        let filename = if path.extension().is_none_or(|e| e != "toml") {
            format!("{}.toml", path.to_string_lossy())
        } else {
            path.to_string_lossy().to_string()
        };
        let full_path = project_root.join(DEFAULT_CONFIG_DIR).join(filename);
        if !full_path.exists() {
            return Err(AppError::Config(format!(
                "Specified config file '{}' not found in default directory: {}",
                path.display(),
                project_root.join(DEFAULT_CONFIG_DIR).display()
            )));
        }
        log::debug!(
            "Using specified config filename in default directory: {}",
            full_path.display()
        );
        Ok(Some(full_path))
    }

    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        log::info!("Loading configuration from: {}", config_path.display());
        let toml_content = fs::read_to_string(config_path).map_err(|e| AppError::FileRead {
            path: config_path.to_path_buf(),
            source: e,
        })?;
        let config = toml::from_str::<Config>(&toml_content).map_err(|e| {
            AppError::TomlParse(format!(
                "Error parsing config file '{}': {}. Check TOML syntax and structure.",
                config_path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let format = self.output.format.to_lowercase();
        if !OUTPUT_FORMATS.contains(&format.as_str()) {
            return Err(AppError::InvalidArgument(format!(
                "Unknown output format '{}'. Expected one of: {}",
                self.output.format,
                OUTPUT_FORMATS.join(", ")
            )));
        }
        if self.binary.sample_size == 0 {
            return Err(AppError::InvalidArgument(
                "[binary].sample_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// The default configuration rendered as TOML, for `config` output.
    pub fn default_toml() -> Result<String> {
        Ok(toml::to_string_pretty(&Config::default())?)
    }

    pub fn build_detector(&self) -> BinaryDetector {
        BinaryDetector::new()
            .with_extra_extensions(&self.binary.extra_extensions)
            .with_sample_size(self.binary.sample_size)
    }

    pub fn presets_path(&self) -> Option<PathBuf> {
        self.general
            .presets_file
            .as_deref()
            .map(|p| PathBuf::from(shellexpand::tilde(p).as_ref()))
    }

    /// Output file from the config, resolved against the project root.
    pub fn output_path(&self, project_root: &Path) -> Option<PathBuf> {
        self.output.output_file.as_ref().map(|p| {
            if p.is_absolute() {
                p.clone()
            } else {
                project_root.join(p)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn empty_file_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.binary.sample_size, 8192);
        assert_eq!(config.output.format, "text");
    }

    #[test]
    fn full_file_parses() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(
            &path,
            r#"
[general]
preset = "Default Web"

[filters]
ignored_folders = ["target"]
ignored_extensions = [".lock"]

[binary]
extra_extensions = [".blend"]
sample_size = 1024

[output]
format = "json"
output_file = "out/context.json"
"#,
        )
        .unwrap();

        let config = Config::load_from_path(&path).unwrap();
        assert_eq!(config.general.preset.as_deref(), Some("Default Web"));
        let rules = config.filters.to_rule_set();
        assert_eq!(rules.ignored_folders, vec!["target"]);
        assert_eq!(rules.ignored_extensions, vec![".lock"]);
        assert_eq!(config.build_detector().sample_size(), 1024);
        assert!(config.build_detector().is_binary(Path::new("/x/scene.blend")));
        assert_eq!(
            config.output_path(Path::new("/proj")),
            Some(PathBuf::from("/proj/out/context.json"))
        );
    }

    #[test]
    fn unknown_keys_and_formats_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[general]\nunknown = 1\n").unwrap();
        assert!(matches!(
            Config::load_from_path(&path),
            Err(AppError::TomlParse(_))
        ));

        fs::write(&path, "[output]\nformat = \"xml\"\n").unwrap();
        assert!(matches!(
            Config::load_from_path(&path),
            Err(AppError::InvalidArgument(_))
        ));
    }

    #[test]
    fn config_path_resolution() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        assert_eq!(Config::resolve_config_path(root, None, false).unwrap(), None);

        let config_dir = root.join(DEFAULT_CONFIG_DIR);
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(config_dir.join(DEFAULT_CONFIG_FILENAME), "").unwrap();
        fs::write(config_dir.join("alt.toml"), "").unwrap();

        assert_eq!(
            Config::resolve_config_path(root, None, false).unwrap(),
            Some(config_dir.join(DEFAULT_CONFIG_FILENAME))
        );
        assert_eq!(
            Config::resolve_config_path(root, Some(&"alt".to_string()), false).unwrap(),
            Some(config_dir.join("alt.toml"))
        );
        assert_eq!(Config::resolve_config_path(root, None, true).unwrap(), None);
        assert!(Config::resolve_config_path(root, Some(&"missing".to_string()), false).is_err());
    }

    #[test]
    fn default_toml_round_trips() {
        let rendered = Config::default_toml().unwrap();
        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, Config::default());
    }
}
