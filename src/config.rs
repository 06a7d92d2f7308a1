// Persisted application settings, stored as JSON in the user config dir.
//
// Persistence is best-effort throughout: a missing or unreadable file falls
// back to defaults and a failed write is logged by the caller — overlay
// functionality never blocks on the settings store. `#[serde(default)]` on
// each field merges defaults into partial files from older versions, and
// because serialization only ever writes the fields below, re-saving after
// load prunes legacy keys (strict allow-list).

use crate::display::DisplayId;
use crate::overlay::configuration::OverlayConfiguration;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;

pub const APP_NAME: &str = "ScreenShade";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("settings read failed: {0}")]
    Read(#[source] std::io::Error),
    #[error("settings write failed: {0}")]
    Write(#[source] std::io::Error),
    #[error("settings parse failed: {0}")]
    Parse(#[source] serde_json::Error),
}

/// Application settings stored in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_true")]
    pub auto_update: bool,
    #[serde(default = "default_true")]
    pub launch_on_startup: bool,
    /// Version that last wrote this file, for post-update bookkeeping.
    #[serde(default = "default_version")]
    pub last_version: String,
    /// Global overlay switch; when off no overlay windows exist.
    #[serde(default = "default_true")]
    pub is_enabled: bool,
    /// Per-display overlay snapshots keyed by display id. May hold stale
    /// entries for unplugged displays; they are overwritten if the id
    /// reappears (last-write-wins).
    #[serde(default)]
    pub overlay_configurations: HashMap<DisplayId, OverlayConfiguration>,
}

fn default_true() -> bool {
    true
}

fn default_version() -> String {
    APP_VERSION.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_update: true,
            launch_on_startup: true,
            last_version: APP_VERSION.to_string(),
            is_enabled: true,
            overlay_configurations: HashMap::new(),
        }
    }
}

/// Settings persistence seam. The overlay manager reads and writes through
/// this; nothing else touches the overlay configuration database.
pub trait SettingsStore {
    fn load(&self) -> Result<Settings, ConfigError>;
    fn save(&self, settings: &Settings) -> Result<(), ConfigError>;
}

/// JSON file store under the user's config directory.
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    pub fn new() -> Self {
        Self {
            path: config_path(),
        }
    }

    pub fn at(path: PathBuf) -> Self {
        Self { path }
    }
}

impl Default for JsonSettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsStore for JsonSettingsStore {
    fn load(&self) -> Result<Settings, ConfigError> {
        if !self.path.exists() {
            return Ok(Settings::default());
        }
        let data = fs::read_to_string(&self.path).map_err(ConfigError::Read)?;
        serde_json::from_str(&data).map_err(ConfigError::Parse)
    }

    fn save(&self, settings: &Settings) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(ConfigError::Write)?;
        }
        let data = serde_json::to_string_pretty(settings).map_err(ConfigError::Parse)?;
        fs::write(&self.path, data).map_err(ConfigError::Write)
    }
}

/// In-memory store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemorySettingsStore {
    settings: Mutex<Settings>,
}

impl MemorySettingsStore {
    pub fn with(settings: Settings) -> Self {
        Self {
            settings: Mutex::new(settings),
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> Result<Settings, ConfigError> {
        Ok(self.settings.lock().unwrap().clone())
    }

    fn save(&self, settings: &Settings) -> Result<(), ConfigError> {
        *self.settings.lock().unwrap() = settings.clone();
        Ok(())
    }
}

pub fn config_path() -> PathBuf {
    let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join(APP_NAME).join("config.json")
}

/// Load settings, stamp the current version and write them straight back.
/// The rewrite drops keys no longer in the schema and materializes defaults
/// for new ones. Any failure degrades to in-memory defaults.
pub fn load_and_prune(store: &dyn SettingsStore) -> Settings {
    let mut settings = match store.load() {
        Ok(settings) => settings,
        Err(err) => {
            tracing::warn!(error = %err, "settings load failed, using defaults");
            Settings::default()
        }
    };
    settings.last_version = APP_VERSION.to_string();
    if let Err(err) = store.save(&settings) {
        tracing::warn!(error = %err, "settings prune write failed");
    }
    settings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::configuration::ConfigurationUpdate;

    #[test]
    fn defaults_merge_into_partial_file() {
        let settings: Settings = serde_json::from_str(r#"{"auto_update": false}"#).unwrap();
        assert!(!settings.auto_update);
        assert!(settings.launch_on_startup);
        assert!(settings.is_enabled);
        assert!(settings.overlay_configurations.is_empty());
    }

    #[test]
    fn unknown_keys_are_dropped_on_rewrite() {
        let settings: Settings =
            serde_json::from_str(r#"{"appChangelog": "old junk", "is_enabled": false}"#).unwrap();
        let rewritten = serde_json::to_string(&settings).unwrap();
        assert!(!rewritten.contains("appChangelog"));
        assert!(rewritten.contains("\"is_enabled\":false"));
    }

    #[test]
    fn overlay_database_round_trips() {
        let mut settings = Settings::default();
        let configuration = OverlayConfiguration::default()
            .merged(&ConfigurationUpdate::alpha(0.5))
            .unwrap();
        settings
            .overlay_configurations
            .insert(DisplayId::from("1"), configuration.clone());

        let json = serde_json::to_string(&settings).unwrap();
        let restored: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(
            restored.overlay_configurations.get(&DisplayId::from("1")),
            Some(&configuration)
        );
    }

    #[test]
    fn json_store_round_trips_through_disk() {
        let path = std::env::temp_dir().join(format!(
            "screenshade-config-test-{}.json",
            std::process::id()
        ));
        let store = JsonSettingsStore::at(path.clone());

        let mut settings = Settings::default();
        settings.is_enabled = false;
        settings.overlay_configurations.insert(
            DisplayId::from("1"),
            OverlayConfiguration::default()
                .merged(&ConfigurationUpdate::alpha(0.25))
                .unwrap(),
        );

        store.save(&settings).unwrap();
        assert_eq!(store.load().unwrap(), settings);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn memory_store_round_trips() {
        let store = MemorySettingsStore::default();
        let settings = Settings {
            is_enabled: false,
            ..Settings::default()
        };
        store.save(&settings).unwrap();
        assert_eq!(store.load().unwrap(), settings);
    }

    #[test]
    fn load_and_prune_stamps_version() {
        let store = MemorySettingsStore::with(Settings {
            last_version: "0.1.0".to_string(),
            ..Settings::default()
        });
        let settings = load_and_prune(&store);
        assert_eq!(settings.last_version, APP_VERSION);
        assert_eq!(store.load().unwrap().last_version, APP_VERSION);
    }
}
