use crate::{PagelessError, PagelessResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// HTTP verb handed to the fetcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
        }
    }
}

/// Construction-time options of a range loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Pixel height of one item.
    pub item_size: f64,
    pub url: String,
    pub method: HttpMethod,
    pub start_param_name: String,
    pub count_param_name: String,
    /// Delay before a scheduled load issues its fetch.
    pub debounce_ms: u64,
    /// Pixels above the viewport that still count as visible.
    pub margin: f64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            item_size: 20.0,
            url: "/data".to_string(),
            method: HttpMethod::Get,
            start_param_name: "start".to_string(),
            count_param_name: "count".to_string(),
            debounce_ms: 1000,
            margin: 100.0,
        }
    }
}

impl LoaderConfig {
    pub fn config_path() -> Option<PathBuf> {
        #[cfg(target_os = "macos")]
        {
            dirs::home_dir().map(|home| home.join(".config/pageless/config.toml"))
        }
        #[cfg(target_os = "linux")]
        {
            dirs::config_dir().map(|config| config.join("pageless/config.toml"))
        }
        #[cfg(target_os = "windows")]
        {
            dirs::config_dir().map(|config| config.join("pageless\\config.toml"))
        }
        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        {
            None
        }
    }

    /// Load the user config file, or defaults when there is none.
    ///
    /// A config file that exists but cannot be read or fails validation is an
    /// error.
    pub fn load() -> PagelessResult<Self> {
        match Self::config_path() {
            Some(config_path) => Self::load_or_default(config_path),
            None => Ok(Self::default()),
        }
    }

    /// Like [`LoaderConfig::load_from`], but a missing file yields defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> PagelessResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(path)
    }

    /// Parse and validate a TOML config file.
    pub fn load_from(path: impl AsRef<Path>) -> PagelessResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self =
            toml::from_str(&content).map_err(|e| PagelessError::Serialization(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> PagelessResult<()> {
        if !self.item_size.is_finite() || self.item_size <= 0.0 {
            return Err(PagelessError::Configuration(format!(
                "item_size must be a positive number, got {}",
                self.item_size
            )));
        }
        if !self.margin.is_finite() || self.margin < 0.0 {
            return Err(PagelessError::Configuration(format!(
                "margin must be a non-negative number, got {}",
                self.margin
            )));
        }
        if self.start_param_name.is_empty() || self.count_param_name.is_empty() {
            return Err(PagelessError::Configuration(
                "range parameter names must not be empty".to_string(),
            ));
        }
        if self.start_param_name == self.count_param_name {
            return Err(PagelessError::Configuration(format!(
                "start and count parameters share the name '{}'",
                self.start_param_name
            )));
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
