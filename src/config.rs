//! Router configuration.
//!
//! Configuration is a plain value handed to the router at construction.
//! It can be built in code or loaded from YAML:
//!
//! ```yaml
//! mode: release
//! router:
//!   case_sensitive: true
//!   strict: false
//!   merge_params: true
//! ```

use anyhow::{Context, bail};
use serde::Deserialize;
use tracing::Level;

/// Environment variable naming a YAML config file.
pub const CONFIG_ENV: &str = "WAYPOINT_CONFIG";
/// Environment variable overriding the configured mode.
pub const MODE_ENV: &str = "WAYPOINT_MODE";

/// Run mode. Controls registration logging and the default log level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Logs every registered route.
    #[default]
    Debug,
    Release,
    /// Quiet; only warnings and errors.
    Test,
}

impl Mode {
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Some(Mode::Debug),
            "release" => Some(Mode::Release),
            "test" => Some(Mode::Test),
            _ => None,
        }
    }

    pub fn max_level(&self) -> Level {
        match self {
            Mode::Debug => Level::DEBUG,
            Mode::Release => Level::INFO,
            Mode::Test => Level::WARN,
        }
    }
}

/// Matching behavior of a router and every route registered on it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RouterOptions {
    /// `/Foo` and `/foo` are different routes.
    pub case_sensitive: bool,
    /// A trailing slash is significant: `/foo/` does not match `/foo`.
    pub strict: bool,
    /// Mounted routes see the parameters captured by their mount prefix.
    pub merge_params: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mode: Mode,
    pub router: RouterOptions,
}

impl Config {
    /// Parses a YAML document. Missing fields take their defaults.
    pub fn from_yaml(source: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(source).context("invalid router configuration")
    }

    /// Loads configuration from the environment.
    ///
    /// Reads the file named by `WAYPOINT_CONFIG` when set, otherwise starts
    /// from defaults. `WAYPOINT_MODE` then overrides the mode.
    pub fn load() -> anyhow::Result<Self> {
        let mut cfg = match std::env::var(CONFIG_ENV) {
            Ok(path) => {
                let source = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read config file {path}"))?;
                Self::from_yaml(&source)?
            }
            Err(_) => Self::default(),
        };

        if let Ok(mode) = std::env::var(MODE_ENV) {
            match Mode::from_str(&mode) {
                Some(mode) => cfg.mode = mode,
                None => bail!("unknown {MODE_ENV} value: {mode}"),
            }
        }

        Ok(cfg)
    }
}
