//! JSON file-backed settings store.
//!
//! Format: a flat JSON object, pretty-printed with 4-space indentation.
//! Missing keys are filled from [`Settings::with_defaults`].

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use tracing::{debug, warn};

use super::{Settings, SettingsError, SettingsUpdate, validate_settings};
use crate::paths::config_file_path;
use crate::ports::ConfigStore;

/// Settings persisted to a JSON file, readable concurrently.
///
/// Reads hit the in-memory copy; [`JsonConfigStore::save`] writes it back.
#[derive(Debug)]
pub struct JsonConfigStore {
    path: PathBuf,
    settings: RwLock<Settings>,
}

impl JsonConfigStore {
    /// Open the store at the default location (`<data_root>/config.json`).
    pub fn open_default() -> Result<Self, SettingsError> {
        Ok(Self::open(config_file_path()?))
    }

    /// Open the store at `path`.
    ///
    /// A missing file yields defaults. A corrupt file is logged and replaced
    /// by defaults in memory; it is not overwritten until the next save.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let settings = load_settings(&path);
        Self {
            path,
            settings: RwLock::new(settings),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy of the current settings.
    pub fn snapshot(&self) -> Settings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Validate and apply a partial update in memory.
    pub fn update(&self, update: &SettingsUpdate) -> Result<(), SettingsError> {
        let mut guard = self
            .settings
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let mut candidate = guard.clone();
        candidate.merge(update);
        validate_settings(&candidate)?;
        *guard = candidate;
        Ok(())
    }

    /// Write the current settings to disk atomically (temp file + rename).
    pub fn save(&self) -> Result<(), SettingsError> {
        let settings = self.snapshot();
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut content = serialize_pretty(&settings)?;
        content.push('\n');

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, content)?;
        fs::rename(&temp_path, &self.path)?;

        debug!(path = %self.path.display(), "Settings saved");
        Ok(())
    }
}

impl ConfigStore for JsonConfigStore {
    fn interpreter_path(&self) -> String {
        self.snapshot().effective_interpreter().to_string()
    }

    fn script_path(&self) -> String {
        self.snapshot().effective_script().to_string()
    }

    fn selected_model(&self) -> String {
        self.snapshot().effective_model().to_string()
    }
}

fn load_settings(path: &Path) -> Settings {
    let defaults = Settings::with_defaults();
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "Failed to read settings, using defaults");
            }
            return defaults;
        }
    };

    match serde_json::from_str::<Settings>(&content) {
        Ok(mut loaded) => {
            loaded.fill_from(&defaults);
            loaded
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Corrupt settings file, using defaults");
            defaults
        }
    }
}

fn serialize_pretty(settings: &Settings) -> Result<String, serde_json::Error> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    serde::Serialize::serialize(settings, &mut ser)?;
    // serde_json only ever emits valid UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let store = JsonConfigStore::open(dir.path().join("config.json"));
        assert_eq!(store.snapshot(), Settings::with_defaults());
        assert_eq!(store.selected_model(), "base");
        assert_eq!(store.script_path(), "");
    }

    #[test]
    fn partial_file_is_merged_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"script_path": "/srv/ptt.py", "selected_model": "small"}"#).unwrap();

        let store = JsonConfigStore::open(&path);
        assert_eq!(store.script_path(), "/srv/ptt.py");
        assert_eq!(store.selected_model(), "small");
        assert_eq!(store.snapshot().auto_start, Some(false));
    }

    #[test]
    fn corrupt_file_falls_back_without_overwriting() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let store = JsonConfigStore::open(&path);
        assert_eq!(store.snapshot(), Settings::with_defaults());
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn update_validates_before_applying() {
        let dir = tempdir().unwrap();
        let store = JsonConfigStore::open(dir.path().join("config.json"));

        let bad = SettingsUpdate {
            selected_model: Some(Some("enormous".into())),
            ..Default::default()
        };
        assert!(store.update(&bad).is_err());
        assert_eq!(store.selected_model(), "base");

        let good = SettingsUpdate {
            selected_model: Some(Some("medium".into())),
            ..Default::default()
        };
        store.update(&good).unwrap();
        assert_eq!(store.selected_model(), "medium");
    }

    #[test]
    fn save_round_trips_and_keeps_legacy_keys() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let store = JsonConfigStore::open(&path);
        store
            .update(&SettingsUpdate {
                interpreter_path: Some(Some("/opt/venv/bin/python".into())),
                ..Default::default()
            })
            .unwrap();
        store.save().unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"python_path\": \"/opt/venv/bin/python\""));
        assert!(!path.with_extension("json.tmp").exists());

        let reopened = JsonConfigStore::open(&path);
        assert_eq!(reopened.interpreter_path(), "/opt/venv/bin/python");
    }
}
