//! Config command implementation.

use crate::cli::args::{ConfigCommands, OutputFormat};
use crate::config::{Config, Paths};
use crate::error::PantryError;
use crate::output::to_json;

/// Execute config subcommands.
///
/// # Errors
///
/// Returns an error if the config file cannot be serialized or written, or
/// if `init` would overwrite an existing file without `--force`.
pub fn config(
    config: &Config,
    paths: &Paths,
    cmd: ConfigCommands,
    format: OutputFormat,
) -> Result<String, PantryError> {
    match cmd {
        ConfigCommands::Show => match format {
            OutputFormat::Json => to_json(config),
            OutputFormat::Pretty => {
                let yaml = serde_yaml::to_string(config)
                    .map_err(|e| PantryError::Config(format!("Failed to serialize config: {e}")))?;
                Ok(format!("# {}\n{}", paths.config_file.display(), yaml.trim_end()))
            }
        },
        ConfigCommands::Init { force } => init(paths, force, format),
    }
}

fn init(paths: &Paths, force: bool, format: OutputFormat) -> Result<String, PantryError> {
    if paths.config_file.exists() && !force {
        return Err(PantryError::Config(format!(
            "{} already exists, use --force to overwrite",
            paths.config_file.display()
        )));
    }

    paths.ensure_dirs()?;
    Config::default().save_to_path(&paths.config_file)?;

    match format {
        OutputFormat::Json => to_json(&serde_json::json!({
            "written": paths.config_file.display().to_string(),
        })),
        OutputFormat::Pretty => Ok(format!(
            "Wrote default config to {}",
            paths.config_file.display()
        )),
    }
}
