//! Application settings
//!
//! Loaded from an optional TOML file, then overridden by `GAZE__`-prefixed
//! environment variables, e.g. `GAZE__DEBOUNCE__WINDOW_CAPACITY=20`.

use action_dispatch::{DatasetCatalog, DispatchConfig, PhraseDataset};
use config::{Config, ConfigError, Environment, File};
use gaze_debounce::DebounceConfig;
use serde::{Deserialize, Serialize};
use tracking_session::{SessionConfig, SessionError};

use crate::ApiError;

/// Default settings file looked up when no path is given
pub const DEFAULT_SETTINGS_FILE: &str = "gaze-pipeline";

/// Top-level settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub debounce: DebounceConfig,
    pub dispatch: DispatchConfig,
    pub session: SessionConfig,
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub history: HistorySettings,
    /// Phrase datasets; the built-in set is used when empty
    pub datasets: Vec<PhraseDataset>,
    /// Start tracking as soon as the server is up
    pub autostart: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            debounce: DebounceConfig::default(),
            dispatch: DispatchConfig::default(),
            session: SessionConfig::default(),
            server: ServerSettings::default(),
            logging: LoggingSettings::default(),
            history: HistorySettings::default(),
            datasets: DatasetCatalog::default_datasets(),
            autostart: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `trace`, `debug`, `info`, `warn` or `error`
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    pub max_entries: usize,
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self { max_entries: 500 }
    }
}

impl AppSettings {
    /// Load settings from `path` (or the default file, if present) and the environment
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::with_name(path),
            None => File::with_name(DEFAULT_SETTINGS_FILE).required(false),
        };

        Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix("GAZE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Fail fast on anything that would stop a session from starting
    pub fn validate(&self) -> Result<(), ApiError> {
        self.debounce.validate().map_err(SessionError::from)?;
        self.dispatch.validate().map_err(SessionError::from)?;
        if self.session.frame_buffer < 1 {
            return Err(SessionError::InvalidFrameBuffer(self.session.frame_buffer).into());
        }
        Ok(())
    }

    /// Phrase catalog from the configured datasets
    pub fn catalog(&self) -> Result<DatasetCatalog, ApiError> {
        if self.datasets.is_empty() {
            return Ok(DatasetCatalog::default());
        }
        Ok(DatasetCatalog::new(self.datasets.clone()).map_err(SessionError::from)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gaze_debounce::Strategy;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let settings = AppSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.catalog().unwrap().len(), 2);
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("gaze-settings-{}.toml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
autostart = true

[debounce]
strategy = "run_length"
run_length_threshold = 12

[[datasets]]
name = "nav"
up = "Back"
down = "Next"
left = "Home"
right = "Menu"
"#
        )
        .unwrap();

        let settings = AppSettings::load(path.to_str()).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert!(settings.autostart);
        assert_eq!(settings.debounce.strategy, Strategy::RunLength);
        assert_eq!(settings.debounce.run_length_threshold, 12);
        // Unset fields keep their defaults
        assert_eq!(settings.debounce.window_capacity, 15);
        assert_eq!(settings.datasets.len(), 1);
        assert_eq!(settings.catalog().unwrap().current().name, "nav");
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let mut settings = AppSettings::default();
        settings.debounce.window_capacity = 0;
        assert!(matches!(
            settings.validate(),
            Err(ApiError::Session(SessionError::Config(_)))
        ));

        let mut settings = AppSettings::default();
        settings.dispatch.backlog = 0;
        assert!(settings.validate().is_err());
    }
}
