use crate::error::ConfigError;
use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_CONTEXT_LINES: u32 = 4;

/// Engine configuration. The engine only ever consumes the struct; reading
/// files and the environment is the caller's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Maximum context lines kept above and below a commented hunk line.
    pub code_comment_context_lines: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            code_comment_context_lines: DEFAULT_CONTEXT_LINES,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct ConfigFile {
    code_comment_context_lines: Option<u32>,
}

impl Config {
    /// Load from a `perch.toml`, falling back to defaults for absent keys. A
    /// missing file is the default config.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(ConfigError::ReadFailed {
                    message: err.to_string(),
                });
            }
        };
        let file: ConfigFile = toml::from_str(&text).map_err(|err| ConfigError::ParseFailed {
            message: err.to_string(),
        })?;
        Ok(Self {
            code_comment_context_lines: file
                .code_comment_context_lines
                .unwrap_or(DEFAULT_CONTEXT_LINES),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("perch.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_file_overrides_context_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("perch.toml");
        std::fs::write(&path, "code_comment_context_lines = 9\n").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.code_comment_context_lines, 9);
    }

    #[test]
    fn test_garbage_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("perch.toml");
        std::fs::write(&path, "code_comment_context_lines = \"nope\"").unwrap();
        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn test_load_error_bubbles_through_perch_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("perch.toml");
        std::fs::write(&path, "code_comment_context_lines = [").unwrap();
        let load = || -> Result<Config, crate::error::PerchError> { Ok(Config::load(&path)?) };
        assert!(matches!(
            load(),
            Err(crate::error::PerchError::Config(
                ConfigError::ParseFailed { .. }
            ))
        ));
    }
}
