use crate::cli::GeometryArgs;
use pageless_core::{LoaderConfig, PagelessResult};
use std::path::Path;
use std::time::Duration;

/// Loader settings resolved from the config file and command-line overrides.
pub struct CliContext {
    pub config: LoaderConfig,
}

impl CliContext {
    /// Read `path` if given, otherwise the per-user config file (or defaults
    /// when that does not exist).
    pub fn load(path: Option<&Path>) -> PagelessResult<Self> {
        let config = match path {
            Some(path) => LoaderConfig::load_from(path)?,
            None => LoaderConfig::load()?,
        };
        tracing::debug!(?config, "Resolved loader config");
        Ok(Self { config })
    }

    pub fn apply_geometry(&mut self, geometry: &GeometryArgs) {
        if let Some(item_size) = geometry.item_size {
            self.config.item_size = item_size;
        }
        if let Some(margin) = geometry.margin {
            self.config.margin = margin;
        }
    }

    pub fn apply_debounce(&mut self, debounce_ms: Option<u64>) {
        if let Some(ms) = debounce_ms {
            self.config.debounce_ms = ms;
        }
    }

    /// Longest a single step may take before its load is considered lost.
    pub fn step_timeout(&self, latency: Duration) -> Duration {
        self.config.debounce() + latency + Duration::from_secs(15)
    }
}
