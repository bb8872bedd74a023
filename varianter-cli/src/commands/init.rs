//! Init command - write a default configuration file.

use std::path::Path;

use varianter::app::{AppConfig, ConfigFile};

use crate::error::CliError;

/// Run the init command.
pub fn run(config_path: Option<&Path>, force: bool) -> Result<(), CliError> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(ConfigFile::default_path);

    if path.exists() && !force {
        return Err(CliError::Config(format!(
            "{} already exists. Use --force to overwrite it.",
            path.display()
        )));
    }

    let config = AppConfig::default();
    ConfigFile::save(&config, &path)?;

    println!("Configuration file: {}", path.display());
    println!("  store:    {}", config.storage.directory.display());
    println!("  variants: {}", config.generator.output_dir.display());
    println!();
    println!("Edit this file to customize varianter settings.");
    println!("CLI arguments override config file values when specified.");
    Ok(())
}
