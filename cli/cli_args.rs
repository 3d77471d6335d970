use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Args, Debug, Clone, Default)]
pub struct ProjectConfigOpts {
    #[arg(
        value_name = "ROOT",
        help = "Directory to export (default: $PROJECT_ROOT or current dir)."
    )]
    pub project_root: Option<PathBuf>,

    #[arg(
        long = "config",
        help = "Specify path/filename of the TOML config file (default: .ctxbuild/ctxbuild.toml).",
        value_name = "CONFIG_FILE",
        conflicts_with = "disable_config",
        help_heading = "Project Setup"
    )]
    pub config_file: Option<String>,

    #[arg(
        long = "no-config",
        help = "Disable loading any TOML config file.",
        conflicts_with = "config_file",
        help_heading = "Project Setup"
    )]
    pub disable_config: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct PresetSelectOpts {
    #[arg(
        short = 'p',
        long,
        help = "Filter preset to apply (default: config preset, else the first stored preset).",
        value_name = "NAME",
        help_heading = "Filtering"
    )]
    pub preset: Option<String>,

    #[arg(
        long,
        help = "Presets file to use instead of the per-user default.",
        value_name = "PATH",
        help_heading = "Filtering"
    )]
    pub presets_file: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct FilterGroup {
    #[arg(long = "ignore-folder", value_name = "NAME_OR_PATH", action = clap::ArgAction::Append, help = "Exclude a folder name (anywhere) or root-relative folder path.", help_heading = "Filtering")]
    pub ignore_folders: Vec<String>,
    #[arg(long = "ignore-file", value_name = "NAME_OR_PATH", action = clap::ArgAction::Append, help = "Exclude a file name or root-relative file path.", help_heading = "Filtering")]
    pub ignore_files: Vec<String>,
    #[arg(long = "ignore-ext", value_name = "EXT", action = clap::ArgAction::Append, help = "Exclude an extension (e.g. '.lock').", help_heading = "Filtering")]
    pub ignore_extensions: Vec<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct FormatOutputOpts {
    #[arg(short = 'f', long, help = "Set the output format.", value_name = "FORMAT", value_parser = ["text", "json", "yaml"], help_heading = "Output Formatting")]
    pub format: Option<String>,

    #[arg(
        long,
        help = "Emit compact JSON instead of pretty-printed JSON.",
        help_heading = "Output Formatting"
    )]
    pub compact: bool,
}

#[derive(Parser, Debug)]
#[command(
    name = "ctxbuild",
    author,
    version,
    about = "Export a directory tree and its text files into a single document.",
    long_about = "ctxbuild walks a project directory, drops entries matched by the selected filter preset, \nrenders the surviving structure as a tree and concatenates every text file under a header.",
    help_template = "{about-section}\nUsage: {usage}\n\n{all-args}{after-help}",
    after_help = "EXAMPLES:\n  ctxbuild generate . -o context.txt\n  ctxbuild generate --preset \"C# .NET\" --ignore-folder TestResults\n  ctxbuild presets list",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase message verbosity (-v, -vv).")]
    pub verbose: u8,

    #[arg(
        short,
        long,
        global = true,
        help = "Silence informational messages and warnings."
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    #[command(
        visible_alias = "g",
        visible_alias = "gen",
        about = "Generate the tree and concatenated file contents."
    )]
    Generate(GenerateArgs),

    #[command(visible_alias = "p", about = "List, show and edit stored filter presets.")]
    Presets(PresetsArgs),

    #[command(about = "Show or save the default configuration file structure.")]
    Config(ConfigArgs),

    #[command(about = "Generate or save shell completion scripts.")]
    Completion(CompletionArgs),
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    #[clap(flatten)]
    pub project_config: ProjectConfigOpts,
    #[clap(flatten)]
    pub preset_select: PresetSelectOpts,
    #[clap(flatten)]
    pub filters: FilterGroup,
    #[clap(flatten)]
    pub format_output: FormatOutputOpts,

    #[arg(
        short = 'o',
        long,
        value_name = "FILE",
        help = "Write the output to FILE instead of standard output.",
        help_heading = "Output Control",
        conflicts_with = "stdout"
    )]
    pub output: Option<PathBuf>,

    #[arg(
        long,
        help = "Force output to standard output, ignoring a configured output file.",
        help_heading = "Output Control"
    )]
    pub stdout: bool,

    #[arg(
        long,
        help = "Only output the tree diagram.",
        help_heading = "Output Control"
    )]
    pub tree_only: bool,

    #[arg(
        long,
        help = "Also count cl100k tokens exactly (slower).",
        help_heading = "Output Control"
    )]
    pub exact_tokens: bool,
}

#[derive(Args, Debug, Clone)]
pub struct PresetsArgs {
    #[arg(
        long,
        global = true,
        help = "Presets file to use instead of the per-user default.",
        value_name = "PATH"
    )]
    pub presets_file: Option<PathBuf>,

    #[command(subcommand)]
    pub action: PresetAction,
}

#[derive(Subcommand, Debug, Clone)]
pub enum PresetAction {
    #[command(about = "List stored presets.")]
    List,
    #[command(about = "Show one preset as JSON.")]
    Show { name: String },
    #[command(about = "Create a preset, empty or copied from another one.")]
    Create {
        name: String,
        #[arg(long, value_name = "PRESET", help = "Copy the patterns of an existing preset.")]
        from: Option<String>,
    },
    #[command(about = "Delete a preset (the last one cannot be deleted).")]
    Delete {
        name: String,
        #[arg(long, short = 'y', help = "Do not ask for confirmation.")]
        yes: bool,
    },
    #[command(about = "Add patterns to a preset.")]
    Add {
        name: String,
        #[clap(flatten)]
        patterns: PatternOpts,
    },
    #[command(about = "Remove patterns from a preset.")]
    Remove {
        name: String,
        #[clap(flatten)]
        patterns: PatternOpts,
    },
    #[command(about = "Overwrite the stored presets with the built-in defaults.")]
    Reset {
        #[arg(long, short = 'y', help = "Do not ask for confirmation.")]
        yes: bool,
    },
}

#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = true)]
pub struct PatternOpts {
    #[arg(long = "folder", value_name = "NAME_OR_PATH", action = clap::ArgAction::Append, help = "Folder name or root-relative folder path.")]
    pub folders: Vec<String>,
    #[arg(long = "file", value_name = "NAME_OR_PATH", action = clap::ArgAction::Append, help = "File name or root-relative file path.")]
    pub files: Vec<String>,
    #[arg(long = "ext", value_name = "EXT", action = clap::ArgAction::Append, help = "Extension; a leading dot is added when missing.")]
    pub extensions: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[arg(value_name = "ROOT", help = "Project directory (default: current dir).")]
    pub project_root: Option<PathBuf>,

    #[arg(
        long,
        help = "Save default config structure to the project's default path (prompts overwrite)."
    )]
    pub save: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CompletionArgs {
    #[arg(
        long,
        value_name = "SHELL",
        help = "Shell to generate completions for (fish, bash, zsh) [default: fish]"
    )]
    pub shell: Option<String>,
    #[arg(
        long,
        help = "Save completion script to default location (prompts overwrite)."
    )]
    pub save: bool,
}
