//! Application configuration.
//!
//! [`AppConfig`] gathers everything needed to bootstrap the application.
//! [`ConfigFile`] maps it to and from an INI file:
//!
//! ```ini
//! [queue]
//! concurrency = 2
//! drain_timeout_secs = 300
//!
//! [storage]
//! backend = json
//! directory = ~/.local/share/varianter/store
//!
//! [output]
//! directory = ~/.local/share/varianter/variants
//! format = original
//! fit = inside
//! allow_upscale = false
//! jpeg_quality = 80
//!
//! [source]
//! http_timeout_secs = 30
//!
//! [logging]
//! level = info
//! directory =
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use crate::executor::QueueConfig;
use crate::variant::{GenerateOptions, DEFAULT_HTTP_TIMEOUT};

/// Default time `shutdown` waits for queued work.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(300);

/// Default log filter directive.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Name of the config file inside the config directory.
const CONFIG_FILE_NAME: &str = "config.ini";

/// Application directory name under the platform config/data dirs.
const APP_DIR_NAME: &str = "varianter";

/// Errors loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read or parsed.
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    /// The file could not be written.
    #[error("failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A value is present but unusable.
    #[error("invalid value '{value}' for [{section}] {key}: {reason}")]
    InvalidValue {
        section: &'static str,
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Which store backend to use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StorageBackend {
    /// Process-local; nothing survives a restart.
    Memory,
    /// JSON documents under [`StorageConfig::directory`].
    #[default]
    Json,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown backend '{}' (expected 'memory' or 'json')", other)),
        }
    }
}

/// Store configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Root directory of the JSON store. Unused by the memory backend.
    pub directory: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            directory: default_data_dir().join("store"),
        }
    }
}

/// Variant generator configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Root under which variants are written.
    pub output_dir: PathBuf,
    pub options: GenerateOptions,
    /// Timeout for fetching remote sources.
    pub http_timeout: Duration,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            output_dir: default_data_dir().join("variants"),
            options: GenerateOptions::default(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Directory for daily rolling log files; stderr only when `None`.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            directory: None,
        }
    }
}

/// Top-level configuration passed to [`App::start`](super::App::start).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub queue: QueueConfig,
    /// How long shutdown waits for queued work to finish.
    pub drain_timeout: Duration,
    pub storage: StorageConfig,
    pub generator: GeneratorConfig,
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            queue: QueueConfig::default(),
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            storage: StorageConfig::default(),
            generator: GeneratorConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Config with every directory placed under `root`.
    ///
    /// Used by tests and `--data-dir`.
    pub fn rooted_at(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self::default()
            .with_store_dir(root.join("store"))
            .with_output_dir(root.join("variants"))
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.queue = QueueConfig::new(concurrency);
        self
    }

    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    pub fn with_storage_backend(mut self, backend: StorageBackend) -> Self {
        self.storage.backend = backend;
        self
    }

    pub fn with_store_dir(mut self, directory: impl Into<PathBuf>) -> Self {
        self.storage.directory = directory.into();
        self
    }

    pub fn with_output_dir(mut self, directory: impl Into<PathBuf>) -> Self {
        self.generator.output_dir = directory.into();
        self
    }

    pub fn with_generate_options(mut self, options: GenerateOptions) -> Self {
        self.generator.options = options;
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.logging.level = level.into();
        self
    }
}

/// Loads and saves [`AppConfig`] as INI.
pub struct ConfigFile;

impl ConfigFile {
    /// Default config path, e.g. `~/.config/varianter/config.ini`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Loads the file at `path`, or defaults when it does not exist.
    pub fn load_or_default(path: &Path) -> Result<AppConfig, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(AppConfig::default())
        }
    }

    /// Loads `path`. Missing sections and keys take their defaults.
    pub fn load(path: &Path) -> Result<AppConfig, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ini(&ini)
    }

    /// Builds a config from parsed INI.
    pub fn from_ini(ini: &Ini) -> Result<AppConfig, ConfigError> {
        let mut config = AppConfig::default();
        let get = |section: &str, key: &str| {
            ini.section(Some(section))
                .and_then(|s| s.get(key))
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        if let Some(value) = get("queue", "concurrency") {
            let concurrency: usize = parse_value("queue", "concurrency", value)?;
            if concurrency == 0 {
                return Err(invalid("queue", "concurrency", value, "must be at least 1"));
            }
            config.queue = QueueConfig::new(concurrency);
        }
        if let Some(value) = get("queue", "drain_timeout_secs") {
            config.drain_timeout =
                Duration::from_secs(parse_value("queue", "drain_timeout_secs", value)?);
        }

        if let Some(value) = get("storage", "backend") {
            config.storage.backend = parse_value("storage", "backend", value)?;
        }
        if let Some(value) = get("storage", "directory") {
            config.storage.directory = expand_tilde(value);
        }

        if let Some(value) = get("output", "directory") {
            config.generator.output_dir = expand_tilde(value);
        }
        if let Some(value) = get("output", "format") {
            config.generator.options.output_format = parse_value("output", "format", value)?;
        }
        if let Some(value) = get("output", "fit") {
            config.generator.options.fit = parse_value("output", "fit", value)?;
        }
        if let Some(value) = get("output", "allow_upscale") {
            config.generator.options.allow_upscale = parse_value("output", "allow_upscale", value)?;
        }
        if let Some(value) = get("output", "jpeg_quality") {
            let quality: u8 = parse_value("output", "jpeg_quality", value)?;
            if !(1..=100).contains(&quality) {
                return Err(invalid("output", "jpeg_quality", value, "must be 1-100"));
            }
            config.generator.options.jpeg_quality = quality;
        }

        if let Some(value) = get("source", "http_timeout_secs") {
            let secs: u64 = parse_value("source", "http_timeout_secs", value)?;
            if secs == 0 {
                return Err(invalid("source", "http_timeout_secs", value, "must be positive"));
            }
            config.generator.http_timeout = Duration::from_secs(secs);
        }

        if let Some(value) = get("logging", "level") {
            config.logging.level = value.to_string();
        }
        config.logging.directory = get("logging", "directory").map(expand_tilde);

        Ok(config)
    }

    /// Renders `config` as INI.
    pub fn to_ini(config: &AppConfig) -> Ini {
        let mut ini = Ini::new();
        let options = &config.generator.options;

        ini.with_section(Some("queue"))
            .set("concurrency", config.queue.concurrency.to_string())
            .set("drain_timeout_secs", config.drain_timeout.as_secs().to_string());
        ini.with_section(Some("storage"))
            .set("backend", config.storage.backend.as_str())
            .set("directory", config.storage.directory.display().to_string());
        ini.with_section(Some("output"))
            .set("directory", config.generator.output_dir.display().to_string())
            .set("format", options.output_format.as_str())
            .set("fit", options.fit.as_str())
            .set("allow_upscale", options.allow_upscale.to_string())
            .set("jpeg_quality", options.jpeg_quality.to_string());
        ini.with_section(Some("source")).set(
            "http_timeout_secs",
            config.generator.http_timeout.as_secs().to_string(),
        );
        ini.with_section(Some("logging"))
            .set("level", config.logging.level.clone())
            .set(
                "directory",
                config
                    .logging
                    .directory
                    .as_ref()
                    .map(|d| d.display().to_string())
                    .unwrap_or_default(),
            );
        ini
    }

    /// Writes `config` to `path`, creating parent directories.
    pub fn save(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        Self::to_ini(config).write_to_file(path).map_err(write_err)
    }
}

/// Platform data directory for the application.
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR_NAME)
}

fn parse_value<T>(section: &'static str, key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| invalid(section, key, value, e.to_string()))
}

fn invalid(
    section: &'static str,
    key: &'static str,
    value: &str,
    reason: impl Into<String>,
) -> ConfigError {
    ConfigError::InvalidValue {
        section,
        key,
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn expand_tilde(value: &str) -> PathBuf {
    match value.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(value)),
        None => PathBuf::from(value),
    }
}
