//! Application configuration.
//!
//! Resolution order (lowest to highest priority):
//! 1. built-in defaults
//! 2. a YAML file (`AppConfig::load`) or string (`AppConfig::from_yaml_str`)
//! 3. `.env` (loaded into the process environment, never overwriting)
//! 4. `DOCKET_*` environment variables

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::router::{RouterOptions, DEFAULT_BODY_LIMIT};

/// Error type for configuration operations.
#[derive(Debug)]
pub enum ConfigError {
    /// The configuration file exists but could not be read.
    Load(String),
    /// The YAML is malformed or does not match the expected shape.
    Parse(String),
    /// A value was read but is not acceptable.
    Invalid { key: String, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Load(msg) => write!(f, "Config load error: {msg}"),
            ConfigError::Parse(msg) => write!(f, "Config parse error: {msg}"),
            ConfigError::Invalid { key, message } => write!(f, "Invalid config '{key}': {message}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl ConfigError {
    fn invalid(key: &str, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Prefix every controller is mounted under, e.g. `/api`. Empty mounts at the root.
    pub mount_path: String,
    pub body_limit: usize,
    /// Install a permissive CORS layer.
    pub cors: bool,
    pub log: LogConfig,
    pub openapi: DocsConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mount_path: String::new(),
            body_limit: DEFAULT_BODY_LIMIT,
            cors: false,
            log: LogConfig::default(),
            openapi: DocsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Emit JSON lines instead of the human-readable format.
    pub json: bool,
    /// `EnvFilter` directives used when `RUST_LOG` is unset.
    pub filter: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocsConfig {
    pub enabled: bool,
    pub title: String,
    pub version: String,
    pub description: Option<String>,
    pub spec_path: String,
    pub docs_path: String,
    pub docs_ui: bool,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            title: "API".to_string(),
            version: "1.0.0".to_string(),
            description: None,
            spec_path: "/openapi.json".to_string(),
            docs_path: "/docs".to_string(),
            docs_ui: true,
        }
    }
}

impl AppConfig {
    /// Load the YAML file at `path`, then `.env` and `DOCKET_*` overrides.
    ///
    /// A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let content =
                std::fs::read_to_string(path).map_err(|e| ConfigError::Load(format!("{}: {e}", path.display())))?;
            Self::parse_yaml(&content)?
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };

        let _ = dotenvy::dotenv();
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML string, without environment overrides (useful for testing).
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config = Self::parse_yaml(yaml)?;
        config.validate()?;
        Ok(config)
    }

    fn parse_yaml(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Overlay `DOCKET_*` variables read through `lookup`.
    ///
    /// `DOCKET_MOUNT_PATH`, `DOCKET_BODY_LIMIT`, `DOCKET_CORS`,
    /// `DOCKET_LOG_JSON`, `DOCKET_LOG_FILTER`, `DOCKET_OPENAPI_ENABLED`,
    /// `DOCKET_OPENAPI_TITLE`, `DOCKET_OPENAPI_VERSION`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("DOCKET_MOUNT_PATH") {
            self.mount_path = v;
        }
        if let Some(v) = lookup("DOCKET_BODY_LIMIT") {
            self.body_limit = v
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid("body_limit", format!("`{v}` is not a byte count")))?;
        }
        if let Some(v) = lookup("DOCKET_CORS") {
            self.cors = parse_bool("cors", &v)?;
        }
        if let Some(v) = lookup("DOCKET_LOG_JSON") {
            self.log.json = parse_bool("log.json", &v)?;
        }
        if let Some(v) = lookup("DOCKET_LOG_FILTER") {
            self.log.filter = Some(v);
        }
        if let Some(v) = lookup("DOCKET_OPENAPI_ENABLED") {
            self.openapi.enabled = parse_bool("openapi.enabled", &v)?;
        }
        if let Some(v) = lookup("DOCKET_OPENAPI_TITLE") {
            self.openapi.title = v;
        }
        if let Some(v) = lookup("DOCKET_OPENAPI_VERSION") {
            self.openapi.version = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.mount_path.is_empty() && !self.mount_path.starts_with('/') {
            return Err(ConfigError::invalid("mount_path", "must be empty or start with `/`"));
        }
        if self.body_limit == 0 {
            return Err(ConfigError::invalid("body_limit", "must be greater than zero"));
        }
        for (key, path) in [
            ("openapi.spec_path", &self.openapi.spec_path),
            ("openapi.docs_path", &self.openapi.docs_path),
        ] {
            if !path.starts_with('/') {
                return Err(ConfigError::invalid(key, "must start with `/`"));
            }
        }
        if self.openapi.docs_ui && self.openapi.spec_path == self.openapi.docs_path {
            return Err(ConfigError::invalid(
                "openapi.docs_path",
                "must differ from openapi.spec_path",
            ));
        }
        Ok(())
    }

    pub fn router_options(&self) -> RouterOptions {
        RouterOptions {
            body_limit: self.body_limit,
        }
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::invalid(key, format!("`{other}` is not a boolean"))),
    }
}
