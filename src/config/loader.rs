//! Configuration loader.
//!
//! Pipeline:
//! 1. Size check and UTF-8 BOM strip
//! 2. Environment variable expansion (on raw text, before parsing)
//! 3. YAML parsing and empty-document check
//! 4. Deserialization to [`AppConfig`] (unknown keys rejected)
//! 5. Validation
//! 6. Freeze with `Arc`

use std::iter::Peekable;
use std::path::{Path, PathBuf};
use std::str::Chars;
use std::sync::Arc;

use serde_yaml::Value;

use crate::config::schema::AppConfig;
use crate::config::validation::Validator;
use crate::error::ConfigError;

// ============================================================================
// Public API
// ============================================================================

/// Loader limits.
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// Maximum configuration file size in bytes.
    pub max_config_size: usize,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            max_config_size: env_or("SKYNT_PHI_MAX_CONFIG_SIZE", 1024 * 1024),
        }
    }
}

/// Result of loading a configuration file.
#[derive(Debug)]
pub struct LoadResult {
    /// The loaded and validated configuration.
    pub config: Arc<AppConfig>,
    /// Warnings encountered during loading.
    pub warnings: Vec<LoadWarning>,
}

/// Non-fatal problem found while loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadWarning {
    /// Warning message.
    pub message: String,
    /// Where it was found (`file:line` or a field path).
    pub location: Option<String>,
}

/// Configuration loader.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: LoaderOptions,
}

impl ConfigLoader {
    /// Creates a loader with the given options.
    #[must_use]
    pub const fn new(options: LoaderOptions) -> Self {
        Self { options }
    }

    /// Loads, validates and freezes a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file is missing or too large, an
    /// environment reference cannot be resolved, parsing fails, or
    /// validation reports errors.
    pub fn load(&self, path: &Path) -> Result<LoadResult, ConfigError> {
        let metadata = std::fs::metadata(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;

        let file_size = usize::try_from(metadata.len()).unwrap_or(usize::MAX);
        if file_size > self.options.max_config_size {
            return Err(ConfigError::InvalidValue {
                field: "file_size".to_string(),
                value: format!("{file_size} bytes"),
                expected: format!("at most {} bytes", self.options.max_config_size),
            });
        }

        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            line: None,
            message: e.to_string(),
        })?;

        self.load_str(&raw, path)
    }

    /// Runs the pipeline on in-memory text. `path` is used for messages only.
    ///
    /// # Errors
    ///
    /// Same as [`ConfigLoader::load`], except for file access.
    pub fn load_str(&self, raw: &str, path: &Path) -> Result<LoadResult, ConfigError> {
        if raw.len() > self.options.max_config_size {
            return Err(ConfigError::InvalidValue {
                field: "file_size".to_string(),
                value: format!("{} bytes", raw.len()),
                expected: format!("at most {} bytes", self.options.max_config_size),
            });
        }

        let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);

        let mut env_sub = EnvSubstitution::new(path);
        let substituted = env_sub.substitute(raw)?;
        let mut warnings = env_sub.warnings;

        let root: Value = serde_yaml::from_str(&substituted).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            line: e.location().map(|l| l.line()),
            message: e.to_string(),
        })?;

        if root.is_null() {
            return Err(ConfigError::ParseError {
                path: path.to_path_buf(),
                line: None,
                message: "Configuration file is empty".to_string(),
            });
        }

        let config: AppConfig = serde_yaml::from_value(root).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            line: e.location().map(|l| l.line()),
            message: format!("Failed to deserialize configuration: {e}"),
        })?;

        let result = Validator::new().validate(&config);
        if result.has_errors() {
            return Err(ConfigError::ValidationError {
                path: path.display().to_string(),
                errors: result.errors,
            });
        }

        warnings.extend(result.warnings.into_iter().map(|issue| LoadWarning {
            message: issue.message,
            location: Some(issue.path),
        }));

        Ok(LoadResult {
            config: Arc::new(config),
            warnings,
        })
    }
}

// ============================================================================
// Environment Variable Substitution
// ============================================================================

/// Pre-parse environment variable substitution.
///
/// Supports:
/// - `${VAR}`: value, or empty string with a warning when unset
/// - `${VAR:-default}`: default when unset
/// - `${VAR:?message}`: error when unset
/// - `$$`: literal `$`
struct EnvSubstitution {
    path: PathBuf,
    line: usize,
    warnings: Vec<LoadWarning>,
}

impl EnvSubstitution {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            line: 1,
            warnings: Vec::new(),
        }
    }

    fn location(&self) -> String {
        format!("{}:{}", self.path.display(), self.line)
    }

    fn substitute(&mut self, raw: &str) -> Result<String, ConfigError> {
        let mut result = String::with_capacity(raw.len());
        let mut chars = raw.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '\n' => {
                    self.line += 1;
                    result.push(c);
                }
                '$' if chars.peek() == Some(&'$') => {
                    chars.next();
                    result.push('$');
                }
                '$' if chars.peek() == Some(&'{') => {
                    chars.next();
                    let spec = self.parse_var_spec(&mut chars)?;
                    self.expand(&spec, &mut result)?;
                }
                _ => result.push(c),
            }
        }

        Ok(result)
    }

    fn expand(&mut self, spec: &VarSpec, out: &mut String) -> Result<(), ConfigError> {
        if let Ok(value) = std::env::var(&spec.name) {
            out.push_str(&value);
            return Ok(());
        }
        match &spec.fallback {
            Fallback::Default(default) => out.push_str(default),
            Fallback::Required(message) => {
                return Err(ConfigError::EnvVarNotSet {
                    var: spec.name.clone(),
                    location: if message.is_empty() {
                        self.location()
                    } else {
                        format!("{}: {message}", self.location())
                    },
                });
            }
            Fallback::Empty => self.warnings.push(LoadWarning {
                message: format!(
                    "Environment variable '{}' is not set, using empty string",
                    spec.name
                ),
                location: Some(self.location()),
            }),
        }
        Ok(())
    }

    fn parse_var_spec(&mut self, chars: &mut Peekable<Chars<'_>>) -> Result<VarSpec, ConfigError> {
        let mut name = String::new();

        while let Some(c) = chars.next() {
            match c {
                '}' => return self.finish(name, Fallback::Empty),
                ':' if chars.peek() == Some(&'-') => {
                    chars.next();
                    let default = self.read_until_close(chars)?;
                    return self.finish(name, Fallback::Default(default));
                }
                ':' if chars.peek() == Some(&'?') => {
                    chars.next();
                    let message = self.read_until_close(chars)?;
                    return self.finish(name, Fallback::Required(message));
                }
                '\n' => break,
                _ => name.push(c),
            }
        }

        Err(self.parse_error(format!(
            "Unclosed environment variable reference: ${{{name}"
        )))
    }

    fn finish(&self, name: String, fallback: Fallback) -> Result<VarSpec, ConfigError> {
        if name.is_empty() {
            return Err(self.parse_error("Empty environment variable name in ${}".to_string()));
        }
        Ok(VarSpec { name, fallback })
    }

    /// Reads up to the matching `}`, allowing nested braces.
    fn read_until_close(&mut self, chars: &mut Peekable<Chars<'_>>) -> Result<String, ConfigError> {
        let mut value = String::new();
        let mut depth = 1;

        for c in chars.by_ref() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(value);
                    }
                }
                '\n' => self.line += 1,
                _ => {}
            }
            value.push(c);
        }

        Err(self.parse_error("Unclosed environment variable reference".to_string()))
    }

    fn parse_error(&self, message: String) -> ConfigError {
        ConfigError::ParseError {
            path: self.path.clone(),
            line: Some(self.line),
            message,
        }
    }
}

struct VarSpec {
    name: String,
    fallback: Fallback,
}

enum Fallback {
    Empty,
    Default(String),
    Required(String),
}

/// Reads an environment variable and parses it, falling back to `default`.
pub(crate) fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
