//! Settings domain types and validation.
//!
//! The persisted key-value store shared with the desktop front end. Keys keep
//! their historical JSON names so existing `config.json` files load as-is.

mod store;

pub use store::JsonConfigStore;

use serde::{Deserialize, Serialize};

/// Transcription models the worker understands.
pub const KNOWN_MODELS: [&str; 6] = ["tiny", "base", "small", "medium", "large", "turbo"];

/// Model used when nothing (or something unknown) is selected.
pub const DEFAULT_MODEL: &str = "base";

const LOG_LEVELS: [&str; 5] = ["TRACE", "DEBUG", "INFO", "WARNING", "ERROR"];

#[cfg(windows)]
const DEFAULT_INTERPRETER: &str = "python";
#[cfg(not(windows))]
const DEFAULT_INTERPRETER: &str = "python3";

/// Application settings structure.
///
/// All fields are optional to support partial files and graceful defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Model passed to the worker when the caller names none.
    pub selected_model: Option<String>,

    /// Start the worker when the front end launches.
    pub auto_start: Option<bool>,

    /// Hide to the tray instead of closing.
    pub minimize_to_tray: Option<bool>,

    /// Log level label shown in the front end.
    pub log_level: Option<String>,

    /// Interpreter that runs the worker script (path or bare command).
    #[serde(rename = "python_path")]
    pub interpreter_path: Option<String>,

    /// Worker script path.
    pub script_path: Option<String>,

    /// Saved window geometry, e.g. `600x500`.
    pub window_geometry: Option<String>,

    /// Saved window position.
    pub window_position: Option<String>,
}

impl Settings {
    /// Create settings with sensible defaults.
    pub fn with_defaults() -> Self {
        Self {
            selected_model: Some(DEFAULT_MODEL.to_string()),
            auto_start: Some(false),
            minimize_to_tray: Some(false),
            log_level: Some("INFO".to_string()),
            interpreter_path: Some(DEFAULT_INTERPRETER.to_string()),
            script_path: Some(String::new()),
            window_geometry: Some("600x500".to_string()),
            window_position: None,
        }
    }

    /// Selected model, falling back to [`DEFAULT_MODEL`] when unknown.
    pub fn effective_model(&self) -> &str {
        match self.selected_model.as_deref() {
            Some(model) if is_known_model(model) => model,
            _ => DEFAULT_MODEL,
        }
    }

    /// Interpreter path, falling back to the platform default.
    pub fn effective_interpreter(&self) -> &str {
        match self.interpreter_path.as_deref() {
            Some(path) if !path.trim().is_empty() => path,
            _ => DEFAULT_INTERPRETER,
        }
    }

    /// Script path, empty when unconfigured.
    pub fn effective_script(&self) -> &str {
        self.script_path.as_deref().unwrap_or_default()
    }

    /// Fill every unset field from `defaults`.
    pub fn fill_from(&mut self, defaults: &Self) {
        fn fill<T: Clone>(slot: &mut Option<T>, default: &Option<T>) {
            if slot.is_none() {
                slot.clone_from(default);
            }
        }
        fill(&mut self.selected_model, &defaults.selected_model);
        fill(&mut self.auto_start, &defaults.auto_start);
        fill(&mut self.minimize_to_tray, &defaults.minimize_to_tray);
        fill(&mut self.log_level, &defaults.log_level);
        fill(&mut self.interpreter_path, &defaults.interpreter_path);
        fill(&mut self.script_path, &defaults.script_path);
        fill(&mut self.window_geometry, &defaults.window_geometry);
        fill(&mut self.window_position, &defaults.window_position);
    }

    /// Merge another settings into this one, only updating fields that are Some.
    pub fn merge(&mut self, other: &SettingsUpdate) {
        if let Some(ref model) = other.selected_model {
            self.selected_model.clone_from(model);
        }
        if let Some(auto_start) = other.auto_start {
            self.auto_start = auto_start;
        }
        if let Some(tray) = other.minimize_to_tray {
            self.minimize_to_tray = tray;
        }
        if let Some(ref level) = other.log_level {
            self.log_level.clone_from(level);
        }
        if let Some(ref path) = other.interpreter_path {
            self.interpreter_path.clone_from(path);
        }
        if let Some(ref path) = other.script_path {
            self.script_path.clone_from(path);
        }
        if let Some(ref geometry) = other.window_geometry {
            self.window_geometry.clone_from(geometry);
        }
        if let Some(ref position) = other.window_position {
            self.window_position.clone_from(position);
        }
    }
}

/// Partial settings update.
///
/// Each field is `Option<Option<T>>`:
/// - `None` = don't change this field
/// - `Some(None)` = set field to None/null
/// - `Some(Some(value))` = set field to value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsUpdate {
    pub selected_model: Option<Option<String>>,
    pub auto_start: Option<Option<bool>>,
    pub minimize_to_tray: Option<Option<bool>>,
    pub log_level: Option<Option<String>>,
    pub interpreter_path: Option<Option<String>>,
    pub script_path: Option<Option<String>>,
    pub window_geometry: Option<Option<String>>,
    pub window_position: Option<Option<String>>,
}

/// Settings validation and persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Unknown model '{0}' (expected one of: {list})", list = KNOWN_MODELS.join(", "))]
    UnknownModel(String),

    #[error("Unknown log level '{0}'")]
    InvalidLogLevel(String),

    #[error("Interpreter path cannot be empty")]
    EmptyInterpreterPath,

    #[error(transparent)]
    Path(#[from] crate::paths::PathError),

    #[error("Failed to access settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize settings: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Whether `model` is one of [`KNOWN_MODELS`].
pub fn is_known_model(model: &str) -> bool {
    KNOWN_MODELS.contains(&model)
}

/// Check that a model name is safe to pass as a single argument.
///
/// Accepts non-empty names made of ASCII letters, digits, `.`, `-` and `_`.
pub fn validate_model_name(model: &str) -> bool {
    !model.is_empty()
        && model
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
}

/// Validate settings values.
pub fn validate_settings(settings: &Settings) -> Result<(), SettingsError> {
    if let Some(ref model) = settings.selected_model
        && !is_known_model(model)
    {
        return Err(SettingsError::UnknownModel(model.clone()));
    }

    if let Some(ref level) = settings.log_level
        && !LOG_LEVELS.contains(&level.to_ascii_uppercase().as_str())
    {
        return Err(SettingsError::InvalidLogLevel(level.clone()));
    }

    if settings
        .interpreter_path
        .as_ref()
        .is_some_and(|p| p.trim().is_empty())
    {
        return Err(SettingsError::EmptyInterpreterPath);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::with_defaults();
        assert_eq!(settings.selected_model.as_deref(), Some("base"));
        assert_eq!(settings.auto_start, Some(false));
        assert_eq!(settings.effective_script(), "");
        assert!(validate_settings(&settings).is_ok());
    }

    #[test]
    fn test_effective_model_falls_back_for_unknown() {
        let settings = Settings {
            selected_model: Some("gigantic".into()),
            ..Default::default()
        };
        assert_eq!(settings.effective_model(), DEFAULT_MODEL);

        let settings = Settings {
            selected_model: Some("turbo".into()),
            ..Default::default()
        };
        assert_eq!(settings.effective_model(), "turbo");
    }

    #[test]
    fn test_legacy_python_path_key() {
        let json = r#"{"python_path": "/opt/venv/bin/python", "script_path": "/opt/ptt.py"}"#;
        let settings: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.effective_interpreter(), "/opt/venv/bin/python");
        assert_eq!(settings.effective_script(), "/opt/ptt.py");
        assert_eq!(settings.selected_model, None);
    }

    #[test]
    fn test_validate_unknown_model() {
        let settings = Settings {
            selected_model: Some("huge".into()),
            ..Default::default()
        };
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::UnknownModel(m)) if m == "huge"
        ));
    }

    #[test]
    fn test_validate_log_level_is_case_insensitive() {
        let mut settings = Settings {
            log_level: Some("debug".into()),
            ..Default::default()
        };
        assert!(validate_settings(&settings).is_ok());

        settings.log_level = Some("chatty".into());
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::InvalidLogLevel(_))
        ));
    }

    #[test]
    fn test_validate_empty_interpreter() {
        let settings = Settings {
            interpreter_path: Some("  ".into()),
            ..Default::default()
        };
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::EmptyInterpreterPath)
        ));
    }

    #[test]
    fn test_merge_settings() {
        let mut settings = Settings::with_defaults();
        let update = SettingsUpdate {
            selected_model: Some(Some("small".into())),
            window_geometry: Some(None),
            ..Default::default()
        };
        settings.merge(&update);

        assert_eq!(settings.selected_model.as_deref(), Some("small"));
        assert_eq!(settings.window_geometry, None);
        assert_eq!(settings.auto_start, Some(false)); // Unchanged
    }

    #[test]
    fn test_fill_from_keeps_explicit_values() {
        let mut settings = Settings {
            script_path: Some("/srv/worker.py".into()),
            ..Default::default()
        };
        settings.fill_from(&Settings::with_defaults());
        assert_eq!(settings.effective_script(), "/srv/worker.py");
        assert_eq!(settings.selected_model.as_deref(), Some(DEFAULT_MODEL));
    }

    #[test]
    fn test_model_name_charset() {
        assert!(validate_model_name("base"));
        assert!(validate_model_name("large-v3"));
        assert!(validate_model_name("base.en"));
        assert!(!validate_model_name(""));
        assert!(!validate_model_name("base\"); import os; (\""));
        assert!(!validate_model_name("two words"));
    }
}
