//! Data directory resolution.
//!
//! Resolution order for the data root:
//! 1. `WHISPERCTL_DATA_DIR` environment variable
//! 2. `~/.whisper_auto` (shared with existing installs)

use std::env;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

/// Environment variable overriding the data root.
pub const DATA_DIR_ENV: &str = "WHISPERCTL_DATA_DIR";

const DEFAULT_DIR_NAME: &str = ".whisper_auto";
const CONFIG_FILE_NAME: &str = "config.json";

/// Errors that can occur during path resolution and directory operations.
#[derive(Debug, Error)]
pub enum PathError {
    /// Could not determine the user's home directory.
    #[error("Cannot determine home directory")]
    NoHomeDir,

    /// Failed to create a directory.
    #[error("Failed to create directory {path}: {reason}")]
    CreateFailed { path: PathBuf, reason: String },
}

/// Root directory for configuration and logs.
pub fn data_root() -> Result<PathBuf, PathError> {
    if let Ok(dir) = env::var(DATA_DIR_ENV)
        && !dir.trim().is_empty()
    {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(DEFAULT_DIR_NAME))
        .ok_or(PathError::NoHomeDir)
}

/// Location of the persisted settings file.
pub fn config_file_path() -> Result<PathBuf, PathError> {
    Ok(data_root()?.join(CONFIG_FILE_NAME))
}

/// Directory for rotated log files, created on demand.
pub fn logs_dir() -> Result<PathBuf, PathError> {
    let dir = data_root()?.join("logs");
    fs::create_dir_all(&dir).map_err(|e| PathError::CreateFailed {
        path: dir.clone(),
        reason: e.to_string(),
    })?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_file_lives_under_data_root() {
        let root = data_root().unwrap();
        let config = config_file_path().unwrap();
        assert_eq!(config.parent(), Some(root.as_path()));
        assert_eq!(config.file_name().unwrap(), "config.json");
    }
}
