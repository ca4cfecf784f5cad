//! Ambient configuration for the resolver and facade.

use std::path::PathBuf;

use serde::Deserialize;

use crate::{error::Result, text::Charset};

/// Directory name under the user configuration root.
pub const CONFIG_DIR: &str = "sourcefall";
/// Configuration file name.
pub const CONFIG_FILE: &str = "config.toml";
/// Prefix for environment overrides, e.g. `SOURCEFALL_CHARSET=latin1`.
pub const ENV_PREFIX: &str = "SOURCEFALL";

/// Process configuration for resolution defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Extra roots appended to the system search path, lowest priority.
    #[serde(default)]
    pub search_path: Vec<PathBuf>,
    /// Initial text decoding mode; `None` keeps the platform default.
    #[serde(default)]
    pub charset: Option<Charset>,
}

impl AppConfig {
    /// Load from the default location, merged under environment overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_path())
    }

    /// Load from an explicit file path, merged under environment
    /// overrides. A missing file yields the defaults.
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path.into()).required(false))
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("search_path"),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Default file location under the user's config directory.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_DIR)
            .join(CONFIG_FILE)
    }
}
