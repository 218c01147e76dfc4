//! Configuration for hosts embedding the variance checker.
//!
//! A config file is plain TOML:
//!
//! ```toml
//! [policy]
//! raw_unchecked = "warn"
//! super_read_widened = "deny"
//!
//! [logging]
//! level = "variance.types=debug"
//!
//! [limits]
//! max_depth = 64
//! ```
//!
//! Every section is optional; missing keys take their defaults.

use std::path::{Path, PathBuf};
use std::sync::{Once, OnceLock};

use parking_lot::ReentrantMutex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Layer;
use variance_types::{Policy, TypeStore, DEFAULT_MAX_RELATION_DEPTH};

mod schema;

pub use schema::json_schema;

const CONFIG_TRACE_TARGET: &str = "variance.config";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
    #[error("invalid value for `{key}`: {message}")]
    Invalid { key: &'static str, message: String },
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        // The default `Display` carries a source snippet; keep only the message.
        ConfigError::Toml(err.message().trim().to_owned())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
#[schemars(deny_unknown_fields)]
pub struct VarianceConfig {
    /// Treatment of the findings that are warnings by default.
    #[serde(default)]
    pub policy: Policy,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
#[schemars(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Either a simple level (`info`, `debug`, ...) or a full `EnvFilter` directive string such
    /// as `variance.types=trace`.
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
    /// Emit one JSON object per event instead of human-readable lines.
    #[serde(default)]
    pub json: bool,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_owned()
    }

    pub(crate) fn normalize_level_directives(input: &str) -> String {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Self::default_level();
        }

        match trimmed.to_ascii_lowercase().as_str() {
            "trace" => "trace".to_owned(),
            "debug" => "debug".to_owned(),
            "info" => "info".to_owned(),
            "warn" | "warning" => "warn".to_owned(),
            "error" => "error".to_owned(),
            _ => trimmed.to_owned(),
        }
    }

    fn config_env_filter(&self) -> tracing_subscriber::EnvFilter {
        let directives = Self::normalize_level_directives(&self.level);
        tracing_subscriber::EnvFilter::try_new(directives).unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::default()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
        })
    }

    /// Effective filter for the checker's tracing output.
    ///
    /// If `RUST_LOG` is set, it is merged into the configured directives.
    pub fn env_filter(&self) -> tracing_subscriber::EnvFilter {
        let env_directives = std::env::var("RUST_LOG")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());

        let config_directives = Self::normalize_level_directives(&self.level);

        match env_directives {
            Some(env_directives) => {
                let combined = format!("{config_directives},{env_directives}");
                tracing_subscriber::EnvFilter::try_new(combined)
                    .or_else(|_| tracing_subscriber::EnvFilter::try_new(env_directives))
                    .unwrap_or_else(|_| self.config_env_filter())
            }
            None => self.config_env_filter(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
#[schemars(deny_unknown_fields)]
pub struct LimitsConfig {
    /// Recursion budget for a single subtype query. Deeper queries are reported as unrelated.
    #[serde(default = "LimitsConfig::default_max_depth")]
    #[schemars(range(min = 1))]
    pub max_depth: usize,
}

impl LimitsConfig {
    fn default_max_depth() -> usize {
        DEFAULT_MAX_RELATION_DEPTH
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_depth: Self::default_max_depth(),
        }
    }
}

impl VarianceConfig {
    /// Load and validate a config file.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::load_from_str(&text)
    }

    /// Parse and validate a config from TOML text.
    pub fn load_from_str(text: &str) -> Result<Self, ConfigError> {
        let config: VarianceConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the semantic constraints serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_depth == 0 {
            return Err(ConfigError::Invalid {
                key: "limits.max_depth",
                message: "must be at least 1".to_owned(),
            });
        }

        let directives = LoggingConfig::normalize_level_directives(&self.logging.level);
        if let Err(err) = tracing_subscriber::EnvFilter::try_new(&directives) {
            return Err(ConfigError::Invalid {
                key: "logging.level",
                message: format!("`{directives}` is not a valid filter: {err}"),
            });
        }

        Ok(())
    }

    /// Push the store-level settings into `store`.
    pub fn apply_to(&self, store: &mut TypeStore) {
        store.set_max_relation_depth(self.limits.max_depth);
    }
}

pub const VARIANCE_CONFIG_ENV_VAR: &str = "VARIANCE_CONFIG_PATH";

const CONFIG_FILE_NAMES: [&str; 2] = ["variance.toml", ".variance.toml"];

static CONFIG_ENV_LOCK: OnceLock<ReentrantMutex<()>> = OnceLock::new();

fn config_env_lock() -> &'static ReentrantMutex<()> {
    CONFIG_ENV_LOCK.get_or_init(|| ReentrantMutex::new(()))
}

/// Run `f` while holding the config environment lock.
///
/// Tests that set [`VARIANCE_CONFIG_ENV_VAR`] should wrap the mutation and the discovery call in
/// this helper, since environment variables are process-global.
pub fn with_config_env_lock<R>(f: impl FnOnce() -> R) -> R {
    let _guard = config_env_lock().lock();
    f()
}

/// Discover the config file for a project root.
///
/// Search order:
/// 1) `VARIANCE_CONFIG_PATH` (absolute or relative to `root`)
/// 2) `variance.toml` in `root`
/// 3) `.variance.toml` in `root`
pub fn discover_config_path(root: &Path) -> Option<PathBuf> {
    let _guard = config_env_lock().lock();
    if let Some(value) = std::env::var_os(VARIANCE_CONFIG_ENV_VAR) {
        let candidate = PathBuf::from(value);
        let path = if candidate.is_absolute() {
            candidate
        } else {
            root.join(candidate)
        };
        return Some(path.canonicalize().unwrap_or(path));
    }

    CONFIG_FILE_NAMES
        .into_iter()
        .map(|name| root.join(name))
        .find(|path| path.is_file())
        .map(|path| path.canonicalize().unwrap_or(path))
}

/// Load the config for a project root.
///
/// If no config is present, returns [`VarianceConfig::default`] and `None`.
pub fn load_for_root(root: &Path) -> Result<(VarianceConfig, Option<PathBuf>), ConfigError> {
    let Some(path) = discover_config_path(root) else {
        return Ok((VarianceConfig::default(), None));
    };

    let config = VarianceConfig::load_from_path(&path)?;
    tracing::debug!(
        target: CONFIG_TRACE_TARGET,
        path = %path.display(),
        "loaded config"
    );
    Ok((config, Some(path)))
}

static TRACING_INIT: Once = Once::new();

/// Install a global subscriber writing to stderr.
///
/// Only the first call installs anything. Returns whether this call installed the subscriber.
pub fn init_tracing(config: &LoggingConfig) -> bool {
    let mut installed = false;
    TRACING_INIT.call_once(|| {
        let layer: Box<dyn Layer<_> + Send + Sync> = if config.json {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .boxed()
        };

        let subscriber = tracing_subscriber::registry()
            .with(config.env_filter())
            .with(layer);
        installed = tracing::subscriber::set_global_default(subscriber).is_ok();
    });
    installed
}
