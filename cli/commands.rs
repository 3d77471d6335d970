pub mod completion;
pub mod config;
pub mod generate;
pub mod presets;
