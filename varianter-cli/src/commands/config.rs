//! Configuration inspection commands.

use std::path::Path;

use clap::Subcommand;
use varianter::app::ConfigFile;

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration as INI
    Show,

    /// Show the configuration file path
    Path,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands, config_path: Option<&Path>) -> Result<(), CliError> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(ConfigFile::default_path);

    match command {
        ConfigCommands::Show => {
            let config = ConfigFile::load_or_default(&path)?;
            let mut buffer = Vec::new();
            ConfigFile::to_ini(&config)
                .write_to(&mut buffer)
                .map_err(|e| CliError::Config(e.to_string()))?;
            print!("{}", String::from_utf8_lossy(&buffer));
        }
        ConfigCommands::Path => {
            println!("{}", path.display());
            if !path.exists() {
                println!("(file does not exist; defaults apply, run 'varianter init' to create it)");
            }
        }
    }
    Ok(())
}
