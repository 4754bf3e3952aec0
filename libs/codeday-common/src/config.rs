//! Grader configuration
//!
//! Defaults, then an optional JSON file, then environment overrides.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Wall-clock bound for a single submission run
pub const DEFAULT_TIMEOUT_MS: u64 = 3000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid config file {path}: {reason}")]
    Invalid { path: PathBuf, reason: &'static str },
    #[error("invalid value for {var}: {value}")]
    InvalidEnv { var: &'static str, value: String },
}

/// How a submission is run: `command [args..] <scratch file>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interpreter {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    pub file_extension: String,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self {
            command: "python3".to_string(),
            args: Vec::new(),
            file_extension: "py".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub interpreter: Interpreter,
    pub timeout_ms: u64,
    /// Parent directory for per-submission scratch dirs; system temp dir if unset
    pub scratch_dir: Option<PathBuf>,
    /// Challenge store; in-memory store if unset
    pub redis_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interpreter: Interpreter::default(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            scratch_dir: None,
            redis_url: None,
        }
    }
}

impl Config {
    /// Load from a JSON file. Missing keys fall back to defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        // Same bound as CODEDAY_TIMEOUT_MS: a zero timeout fails every run
        if config.timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                path: path.to_path_buf(),
                reason: "timeout_ms must be greater than zero",
            });
        }
        Ok(config)
    }

    /// Defaults (or `path` if given) with environment overrides applied
    pub fn from_env(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(p) => Self::load(p)?,
            None => Self::default(),
        };
        base.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(command) = lookup("CODEDAY_INTERPRETER") {
            self.interpreter.command = command;
        }
        if let Some(args) = lookup("CODEDAY_INTERPRETER_ARGS") {
            self.interpreter.args = args.split_whitespace().map(str::to_string).collect();
        }
        if let Some(ext) = lookup("CODEDAY_FILE_EXTENSION") {
            self.interpreter.file_extension = ext;
        }
        if let Some(raw) = lookup("CODEDAY_TIMEOUT_MS") {
            self.timeout_ms = match raw.parse::<u64>() {
                Ok(ms) if ms > 0 => ms,
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        var: "CODEDAY_TIMEOUT_MS",
                        value: raw,
                    })
                }
            };
        }
        if let Some(dir) = lookup("CODEDAY_SCRATCH_DIR") {
            self.scratch_dir = Some(PathBuf::from(dir));
        }
        if let Some(url) = lookup("REDIS_URL") {
            self.redis_url = Some(url);
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.timeout_ms, 3000);
        assert_eq!(config.interpreter.command, "python3");
        assert_eq!(config.interpreter.file_extension, "py");
        assert!(config.redis_url.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::default()
            .with_overrides(env(&[
                ("CODEDAY_INTERPRETER", "sh"),
                ("CODEDAY_INTERPRETER_ARGS", "-e  -u"),
                ("CODEDAY_FILE_EXTENSION", "sh"),
                ("CODEDAY_TIMEOUT_MS", "500"),
                ("REDIS_URL", "redis://127.0.0.1:6379"),
            ]))
            .unwrap();

        assert_eq!(config.interpreter.command, "sh");
        assert_eq!(config.interpreter.args, vec!["-e", "-u"]);
        assert_eq!(config.interpreter.file_extension, "sh");
        assert_eq!(config.timeout_ms, 500);
        assert_eq!(config.redis_url.as_deref(), Some("redis://127.0.0.1:6379"));
    }

    #[test]
    fn test_invalid_timeout_rejected() {
        for bad in ["0", "abc", "-5"] {
            let result = Config::default().with_overrides(env(&[("CODEDAY_TIMEOUT_MS", bad)]));
            assert!(matches!(result, Err(ConfigError::InvalidEnv { .. })), "{bad}");
        }
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "interpreter": {{ "command": "node", "file_extension": "js" }}, "timeout_ms": 1500 }}"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.interpreter.command, "node");
        assert!(config.interpreter.args.is_empty());
        assert_eq!(config.timeout_ms, 1500);
        assert!(config.scratch_dir.is_none());
    }

    #[test]
    fn test_load_zero_timeout_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "timeout_ms": 0 }}"#).unwrap();

        let result = Config::load(file.path());
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
        assert!(Config::from_env(Some(file.path())).is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Path::new("/nonexistent/codeday.json"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
