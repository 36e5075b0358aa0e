//! Host configuration: a TOML file plus `PARLEY_*` environment overrides.

use parley_voice::VoiceConfig;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File read when neither the command line nor the environment names one.
pub const DEFAULT_CONFIG_PATH: &str = "parley.toml";

/// Top-level host configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub voice: VoiceConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive, e.g. "info" or "parley_voice=debug,info".
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Where the config file path came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// First command-line argument.
    Argument(PathBuf),
    /// `PARLEY_CONFIG_PATH`.
    Environment(PathBuf),
    /// [`DEFAULT_CONFIG_PATH`].
    Default,
}

impl ConfigSource {
    /// Picks the first non-blank of `argument` and `PARLEY_CONFIG_PATH`.
    pub fn resolve<F>(argument: Option<String>, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |value: String| (!value.trim().is_empty()).then(|| PathBuf::from(value));
        if let Some(path) = argument.and_then(non_blank) {
            return Self::Argument(path);
        }
        match env("PARLEY_CONFIG_PATH").and_then(non_blank) {
            Some(path) => Self::Environment(path),
            None => Self::Default,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Argument(path) | Self::Environment(path) => path,
            Self::Default => Path::new(DEFAULT_CONFIG_PATH),
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Argument(_) => "cli-arg",
            Self::Environment(_) => "env-var",
            Self::Default => "default",
        })
    }
}

type Override = fn(&mut Config, String);

/// Environment variables applied over the file, in order.
const ENV_OVERRIDES: &[(&str, Override)] = &[
    ("PARLEY_TOKEN_SERVER_URL", |c: &mut Config, v: String| c.voice.token_server_url = v),
    ("PARLEY_LIVEKIT_URL", |c: &mut Config, v: String| c.voice.livekit_url = v),
    ("PARLEY_DEFAULT_LANGUAGE", |c: &mut Config, v: String| c.voice.default_language = v),
    ("PARLEY_DEBUG", |c: &mut Config, v: String| c.voice.debug = is_truthy(&v)),
    ("PARLEY_LOG_LEVEL", |c: &mut Config, v: String| c.logging.level = v),
    ("PARLEY_LOG_JSON", |c: &mut Config, v: String| c.logging.json = is_truthy(&v)),
];

fn is_truthy(value: &str) -> bool {
    value == "true" || value == "1"
}

impl Config {
    /// Reads `path`, or starts from defaults when it does not exist, then
    /// applies the `PARLEY_*` variables `env` knows about.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be read or parsed.
    pub fn load<F>(path: &Path, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "config file not found, using defaults");
                Self::default()
            }
            Err(e) => return Err(e.into()),
        };

        for &(key, apply) in ENV_OVERRIDES {
            if let Some(value) = env(key) {
                apply(&mut config, value);
            }
        }
        Ok(config)
    }
}
