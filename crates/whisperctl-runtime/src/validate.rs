//! Launch precondition checks for the interpreter and worker script.
//!
//! Checks run in a fixed order and stop at the first failure:
//! 1. script path configured
//! 2. script exists
//! 3. script has the expected extension
//! 4. interpreter exists (bare names resolved on `PATH`) and is executable
//! 5. interpreter version query parses and meets the minimum
//!
//! Nothing here mutates state, so a validator can be shared freely.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;
use whisperctl_core::ValidationError;

/// Tunables for [`PathValidator`].
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Required script extension, without the dot.
    pub script_extension: String,
    /// Minimum `(major, minor)` interpreter version.
    pub min_version: (u32, u32),
    /// Flag that makes the interpreter print its version.
    pub version_flag: String,
    /// Upper bound on the version query.
    pub version_timeout: Duration,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            script_extension: "py".to_string(),
            min_version: (3, 8),
            version_flag: "--version".to_string(),
            version_timeout: Duration::from_secs(5),
        }
    }
}

/// Paths that passed validation, ready to spawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPaths {
    /// Resolved interpreter path.
    pub interpreter: PathBuf,
    /// Absolute script path.
    pub script: PathBuf,
    /// Interpreter `(major, minor)` version.
    pub version: (u32, u32),
}

/// Validates interpreter and script paths before a launch.
#[derive(Debug, Clone, Default)]
pub struct PathValidator {
    config: ValidatorConfig,
}

impl PathValidator {
    /// Create a validator with explicit settings.
    pub const fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    /// Settings in use.
    pub const fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Run every check in order.
    pub async fn validate(
        &self,
        interpreter: &str,
        script: &str,
    ) -> Result<ValidatedPaths, ValidationError> {
        let script = self.check_script(script)?;
        let (interpreter, version) = self.validate_interpreter(interpreter).await?;
        Ok(ValidatedPaths {
            interpreter,
            script,
            version,
        })
    }

    /// Run the interpreter checks only (steps 4 and 5).
    pub async fn validate_interpreter(
        &self,
        interpreter: &str,
    ) -> Result<(PathBuf, (u32, u32)), ValidationError> {
        let interpreter = self.check_interpreter(interpreter)?;
        let version = self.check_version(&interpreter).await?;
        Ok((interpreter, version))
    }

    /// Steps 1-3: configured, present, right file type.
    pub fn check_script(&self, script: &str) -> Result<PathBuf, ValidationError> {
        if script.trim().is_empty() {
            return Err(ValidationError::ScriptNotConfigured);
        }

        let path = PathBuf::from(script);
        if !path.is_file() {
            return Err(ValidationError::ScriptNotFound { path });
        }

        let expected = &self.config.script_extension;
        let matches = path
            .extension()
            .and_then(OsStr::to_str)
            .is_some_and(|ext| ext.eq_ignore_ascii_case(expected));
        if !matches {
            return Err(ValidationError::ScriptWrongType {
                path,
                expected: expected.clone(),
            });
        }

        // The worker runs from the script's directory, so pin the path first
        Ok(std::path::absolute(&path).unwrap_or(path))
    }

    /// Step 4: interpreter exists and is executable.
    pub fn check_interpreter(&self, interpreter: &str) -> Result<PathBuf, ValidationError> {
        let trimmed = interpreter.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::InterpreterNotFound {
                path: PathBuf::new(),
            });
        }

        let path = if is_bare_command(trimmed) {
            which::which(trimmed).map_err(|e| {
                debug!(interpreter = %trimmed, error = %e, "Interpreter not found on PATH");
                ValidationError::InterpreterNotFound {
                    path: PathBuf::from(trimmed),
                }
            })?
        } else {
            PathBuf::from(trimmed)
        };

        if !path.is_file() {
            return Err(ValidationError::InterpreterNotFound { path });
        }

        if !is_executable(&path) {
            return Err(ValidationError::InterpreterNotExecutable { path });
        }

        Ok(path)
    }

    /// Step 5: version query parses and meets the minimum.
    pub async fn check_version(&self, interpreter: &Path) -> Result<(u32, u32), ValidationError> {
        let unparseable = |detail: String| ValidationError::InterpreterVersionUnparseable {
            path: interpreter.to_path_buf(),
            detail,
        };

        let mut cmd = Command::new(interpreter);
        cmd.arg(&self.config.version_flag)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(windows)]
        cmd.creation_flags(crate::process::CREATE_NO_WINDOW);

        let output = match timeout(self.config.version_timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(unparseable(e.to_string())),
            Err(_) => {
                return Err(unparseable(format!(
                    "version query timed out after {:?}",
                    self.config.version_timeout
                )));
            }
        };

        if !output.status.success() {
            return Err(unparseable(format!(
                "version query exited with {}",
                output.status
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        // Older interpreters print their version to stderr
        let text = if stdout.trim().is_empty() {
            stderr
        } else {
            stdout
        };

        let found = parse_version(&text)
            .ok_or_else(|| unparseable(format!("unrecognized output: {}", text.trim())))?;

        if found < self.config.min_version {
            return Err(ValidationError::InterpreterVersionTooLow {
                found,
                required: self.config.min_version,
            });
        }

        debug!(interpreter = %interpreter.display(), major = found.0, minor = found.1, "Interpreter version ok");
        Ok(found)
    }
}

/// Parse the first `major.minor[.patch]` token in `text`.
///
/// `"Python 3.12.1"` -> `(3, 12)`, `"v20.10.0"` -> `(20, 10)`.
pub fn parse_version(text: &str) -> Option<(u32, u32)> {
    text.split_whitespace().find_map(|word| {
        let word = word.trim_start_matches('v');
        let mut parts = word.split('.');
        let major = parts.next()?.parse().ok()?;
        let minor_digits: String = parts
            .next()?
            .chars()
            .take_while(char::is_ascii_digit)
            .collect();
        let minor = minor_digits.parse().ok()?;
        Some((major, minor))
    })
}

fn is_bare_command(value: &str) -> bool {
    let path = Path::new(value);
    path.components().count() == 1 && !path.has_root() && !value.contains(['/', '\\'])
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .is_ok_and(|meta| meta.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_parse_version_valid() {
        assert_eq!(parse_version("Python 3.12.1"), Some((3, 12)));
        assert_eq!(parse_version("Python 3.13.0a1"), Some((3, 13)));
        assert_eq!(parse_version("v20.10.0"), Some((20, 10)));
        assert_eq!(parse_version("3.8"), Some((3, 8)));
    }

    #[test]
    fn test_parse_version_invalid() {
        assert_eq!(parse_version("invalid"), None);
        assert_eq!(parse_version("Python 3"), None);
        assert_eq!(parse_version(""), None);
    }

    #[test]
    fn test_empty_script_is_not_configured() {
        let validator = PathValidator::default();
        assert_eq!(
            validator.check_script("  "),
            Err(ValidationError::ScriptNotConfigured)
        );
    }

    #[test]
    fn test_missing_script() {
        let validator = PathValidator::default();
        let err = validator.check_script("/nonexistent/worker.py").unwrap_err();
        assert!(matches!(err, ValidationError::ScriptNotFound { .. }));
    }

    #[test]
    fn test_script_directory_is_not_found() {
        let dir = tempdir().unwrap();
        let validator = PathValidator::default();
        let err = validator
            .check_script(dir.path().to_str().unwrap())
            .unwrap_err();
        assert!(matches!(err, ValidationError::ScriptNotFound { .. }));
    }

    #[test]
    fn test_script_wrong_extension() {
        let dir = tempdir().unwrap();
        let script = dir.path().join("worker.sh");
        fs::write(&script, "echo hi").unwrap();

        let validator = PathValidator::default();
        let err = validator.check_script(script.to_str().unwrap()).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::ScriptWrongType { ref expected, .. } if expected == "py"
        ));
    }

    #[test]
    fn test_script_ok_is_absolute() {
        let dir = tempdir().unwrap();
        let script = dir.path().join("Worker.PY");
        fs::write(&script, "print('hi')").unwrap();

        let validator = PathValidator::default();
        let path = validator.check_script(script.to_str().unwrap()).unwrap();
        assert!(path.is_absolute());
    }

    #[test]
    fn test_interpreter_empty_or_missing() {
        let validator = PathValidator::default();
        assert!(matches!(
            validator.check_interpreter(""),
            Err(ValidationError::InterpreterNotFound { .. })
        ));
        assert!(matches!(
            validator.check_interpreter("/nonexistent/bin/python3"),
            Err(ValidationError::InterpreterNotFound { .. })
        ));
        assert!(matches!(
            validator.check_interpreter("definitely_not_a_real_interpreter_12345"),
            Err(ValidationError::InterpreterNotFound { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_interpreter_not_executable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let interp = dir.path().join("python3");
        fs::write(&interp, "#!/bin/sh\necho test").unwrap();
        let mut perms = fs::metadata(&interp).unwrap().permissions();
        perms.set_mode(0o644);
        fs::set_permissions(&interp, perms).unwrap();

        let validator = PathValidator::default();
        assert!(matches!(
            validator.check_interpreter(interp.to_str().unwrap()),
            Err(ValidationError::InterpreterNotExecutable { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_bare_command_resolves_on_path() {
        let validator = PathValidator::default();
        let resolved = validator.check_interpreter("sh").unwrap();
        assert!(resolved.is_absolute());
    }

    #[cfg(unix)]
    fn fake_interpreter(dir: &Path, version_line: &str, stream: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let redirect = if stream == "stderr" { " 1>&2" } else { "" };
        let path = dir.join("python");
        fs::write(
            &path,
            format!("#!/bin/sh\necho \"{version_line}\"{redirect}\n"),
        )
        .unwrap();
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_version_too_low() {
        let dir = tempdir().unwrap();
        let interp = fake_interpreter(dir.path(), "Python 3.6.15", "stdout");

        let validator = PathValidator::default();
        let err = validator.check_version(&interp).await.unwrap_err();
        assert_eq!(
            err,
            ValidationError::InterpreterVersionTooLow {
                found: (3, 6),
                required: (3, 8)
            }
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_version_read_from_stderr() {
        let dir = tempdir().unwrap();
        let interp = fake_interpreter(dir.path(), "Python 3.11.4", "stderr");

        let validator = PathValidator::default();
        assert_eq!(validator.check_version(&interp).await, Ok((3, 11)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_version_unparseable() {
        let dir = tempdir().unwrap();
        let interp = fake_interpreter(dir.path(), "hello there", "stdout");

        let validator = PathValidator::default();
        assert!(matches!(
            validator.check_version(&interp).await,
            Err(ValidationError::InterpreterVersionUnparseable { .. })
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_validate_short_circuits_on_script() {
        // Interpreter is bogus, but the script check fails first
        let validator = PathValidator::default();
        let err = validator
            .validate("/nonexistent/python", "")
            .await
            .unwrap_err();
        assert_eq!(err, ValidationError::ScriptNotConfigured);
    }
}
