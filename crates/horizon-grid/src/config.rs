//! Engine configuration.
//!
//! [`GridConfig`] can be built in code or loaded from TOML:
//!
//! ```
//! use horizon_grid::GridConfig;
//!
//! let config = GridConfig::from_toml_str(r#"
//!     debounce_ms = 5
//!     multi_select = false
//!     date_format = "%d.%m.%Y"
//! "#).unwrap();
//!
//! assert_eq!(config.debounce_ms, 5);
//! assert!(!config.multi_select);
//! assert_eq!(config.time_format, "%H:%M");
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Tunables for a [`GridEngine`](crate::GridEngine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Debounce window between a mutation and the coalesced rebuild.
    pub debounce_ms: u64,
    /// Upper bound on how long repeated mutations may postpone a rebuild.
    pub max_wait_ms: Option<u64>,
    /// Whether more than one row may be selected.
    pub multi_select: bool,
    /// `chrono` format for date columns.
    pub date_format: String,
    /// `chrono` format for time columns.
    pub time_format: String,
    /// `chrono` format for date-time columns.
    pub date_time_format: String,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 16,
            max_wait_ms: Some(250),
            multi_select: true,
            date_format: "%Y-%m-%d".to_string(),
            time_format: "%H:%M".to_string(),
            date_time_format: "%Y-%m-%d %H:%M".to_string(),
        }
    }
}

impl GridConfig {
    /// Parse a configuration from TOML. Missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// The debounce window as a [`Duration`].
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// The max-wait cap as a [`Duration`].
    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait_ms.map(Duration::from_millis)
    }

    /// Sets the debounce window.
    pub fn with_debounce_ms(mut self, debounce_ms: u64) -> Self {
        self.debounce_ms = debounce_ms;
        self
    }

    /// Enables or disables multi-row selection.
    pub fn with_multi_select(mut self, multi_select: bool) -> Self {
        self.multi_select = multi_select;
        self
    }
}
