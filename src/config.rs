//! Application configuration management.
//!
//! Settings are layered with [`figment`], later layers winning:
//!
//! 1. built-in defaults
//! 2. `config.toml` in the platform config directory, or the file given
//!    with `--config`
//! 3. `STACKY_*` environment variables (`__` separates nested keys)
//! 4. command-line flags, applied by the caller
//!
//! ```toml
//! icon_size = 16
//! staleness = "ordered"
//! header = "compact"
//! dark_mode = true
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::cache::StalenessPolicy;
use crate::icon::DEFAULT_ICON_SIZE;
use crate::menu::HeaderStyle;

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "STACKY_";

/// Smallest and largest accepted icon size in pixels.
pub const ICON_SIZE_RANGE: (u32, u32) = (8, 256);

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Icon edge length in pixels.
    pub icon_size: u32,
    /// How stored entry names are compared against a fresh scan.
    pub staleness: StalenessPolicy,
    /// Header style.
    pub header: HeaderStyle,
    /// Dark menu palette.
    pub dark_mode: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            icon_size: DEFAULT_ICON_SIZE,
            staleness: StalenessPolicy::default(),
            header: HeaderStyle::default(),
            dark_mode: false,
        }
    }
}

impl Config {
    /// Load the layered configuration.
    ///
    /// With `file` set the file must exist; otherwise the platform default
    /// file is used when present.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit file is missing or any layer holds
    /// values of the wrong type.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let path = match file {
            Some(path) => {
                if !path.is_file() {
                    anyhow::bail!("Config file not found: {}", path.display());
                }
                Some(path.to_path_buf())
            }
            None => Self::config_path(),
        };

        let config: Self = Self::figment(path.as_deref())
            .extract()
            .context("Invalid configuration")?;
        Ok(config.normalized())
    }

    /// The provider stack without the CLI layer.
    #[must_use]
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = file {
            log::debug!("Reading config from {}", path.display());
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Clamp values into their accepted ranges.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        let (min, max) = ICON_SIZE_RANGE;
        let clamped = self.icon_size.clamp(min, max);
        if clamped != self.icon_size {
            log::warn!(
                "icon_size {} out of range, using {}",
                self.icon_size,
                clamped
            );
            self.icon_size = clamped;
        }
        self
    }

    /// Render as TOML, e.g. to seed a config file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }

    /// Default platform-specific configuration path.
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "stacky", "stacky").map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
