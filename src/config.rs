use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::form::NavigationPolicy;
use crate::persistence::DEFAULT_KEY_PREFIX;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub forms: FormsConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory for snapshots and log files
    #[serde(default = "default_state_path")]
    pub state: String,
}

fn default_state_path() -> String {
    ".crm-forms".to_string()
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            state: default_state_path(),
        }
    }
}

/// Behavior of form sessions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormsConfig {
    /// Quiet period in milliseconds before an edited step is revalidated (default: 300)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// "free" allows any jump, "guarded" stops forward jumps past incomplete required steps
    #[serde(default)]
    pub navigation: NavigationPolicy,
}

fn default_debounce_ms() -> u64 {
    300
}

impl Default for FormsConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            navigation: NavigationPolicy::default(),
        }
    }
}

/// Snapshot persistence for resumable sessions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    #[serde(default = "default_persistence_enabled")]
    pub enabled: bool,
    /// Prepended to the session key to build the snapshot key
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

fn default_persistence_enabled() -> bool {
    true
}

fn default_key_prefix() -> String {
    DEFAULT_KEY_PREFIX.to_string()
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: default_persistence_enabled(),
            key_prefix: default_key_prefix(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to write logs to a file under the state directory instead of stderr
    #[serde(default)]
    pub to_file: bool,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            to_file: false,
        }
    }
}

impl Config {
    /// Project-local config file
    pub fn local_config_path() -> PathBuf {
        PathBuf::from("crm-forms.toml")
    }

    pub fn load(config_path: Option<&str>) -> Result<Self> {
        // Start with embedded defaults so the tool works without config files
        let defaults = Config::default();
        let defaults_json =
            serde_json::to_string(&defaults).context("Failed to serialize default config")?;

        let mut builder = config::Config::builder().add_source(config::File::from_str(
            &defaults_json,
            config::FileFormat::Json,
        ));

        // User config in ~/.config/crm-forms/ (optional global overrides)
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("crm-forms").join("config.toml");
            if user_config.exists() {
                builder = builder.add_source(config::File::from(user_config));
            }
        }

        let local_config = Self::local_config_path();
        if local_config.exists() {
            builder = builder.add_source(config::File::from(local_config));
        }

        // Explicit config file (CLI override)
        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        }

        // Environment variables with CRM_FORMS_ prefix, e.g. CRM_FORMS__FORMS__DEBOUNCE_MS
        builder = builder.add_source(
            config::Environment::with_prefix("CRM_FORMS")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to load configuration")?;
        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    pub fn state_path(&self) -> PathBuf {
        PathBuf::from(&self.paths.state)
    }

    pub fn snapshots_path(&self) -> PathBuf {
        self.state_path().join("snapshots")
    }

    pub fn logs_path(&self) -> PathBuf {
        self.state_path().join("logs")
    }
}
