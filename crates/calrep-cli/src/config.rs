//! Configuration loading and management.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the period cache database.
    pub database_path: PathBuf,
    /// Path to the OAuth token file.
    pub token_path: PathBuf,
    /// Calendars to fetch, in fetch order.
    pub calendars: Vec<String>,
    /// IANA timezone for period boundaries (e.g. `America/Sao_Paulo`).
    pub timezone: String,
    /// Hours counted per calendar day of an all-day event.
    pub all_day_event_hours: f64,
    /// Working days per seven-day week.
    pub working_days_per_week: u32,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        let config_dir = dirs_config_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("periods.db"),
            token_path: config_dir.join("token.json"),
            calendars: vec!["primary".to_string()],
            timezone: "America/Sao_Paulo".to_string(),
            all_day_event_hours: 8.0,
            working_days_per_week: 5,
        }
    }
}

impl Config {
    /// Loads configuration from default locations.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(None)
    }

    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (CALREP_*)
        figment = figment.merge(Env::prefixed("CALREP_"));

        figment.extract()
    }
}

/// Returns the platform-specific config directory for calrep.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("calrep"))
}

/// Returns the platform-specific data directory for calrep.
///
/// On Linux: `~/.local/share/calrep`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("calrep"))
}
