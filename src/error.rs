//! Error types for `skynt-phi`
//!
//! Domain errors are split by concern (engine input, upstream data source,
//! configuration) and aggregated into [`SkyntError`], which maps every
//! failure to a process exit code.

use std::path::PathBuf;
use thiserror::Error;

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for `skynt-phi` CLI operations.
///
/// These codes follow Unix conventions.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// General error
    pub const ERROR: i32 = 1;

    /// Configuration error (invalid YAML, validation failure)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, permission denied)
    pub const IO_ERROR: i32 = 3;

    /// Upstream data source unavailable or returned malformed data
    pub const UPSTREAM_ERROR: i32 = 4;

    /// Engine input rejected (mismatched lengths, negative values, overflow)
    pub const INPUT_ERROR: i32 = 5;

    /// Usage error (invalid arguments, missing required options)
    pub const USAGE_ERROR: i32 = 64;

    /// Interrupted by SIGINT (Ctrl+C)
    pub const INTERRUPTED: i32 = 130;

    /// Terminated by SIGTERM
    pub const TERMINATED: i32 = 143;
}

// ============================================================================
// Error Kinds
// ============================================================================

/// Coarse classification of a failure.
///
/// Callers use this to decide between rejecting a request outright
/// ([`ErrorKind::InvalidInput`]) and degrading to a placeholder result
/// ([`ErrorKind::UpstreamUnavailable`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Inputs were rejected before any computation ran.
    InvalidInput,
    /// The external data source could not supply usable data.
    UpstreamUnavailable,
    /// Configuration could not be loaded or validated.
    Config,
    /// Local I/O or serialization failure.
    Io,
    /// Bad command-line usage.
    Usage,
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for `skynt-phi` operations.
#[derive(Debug, Error)]
pub enum SkyntError {
    /// Engine input rejected
    #[error(transparent)]
    Phi(#[from] PhiError),

    /// Upstream data source failure
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// Configuration loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Invalid command-line usage
    #[error("usage error: {0}")]
    Usage(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl SkyntError {
    /// Returns the coarse kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Phi(_) => ErrorKind::InvalidInput,
            Self::Upstream(_) => ErrorKind::UpstreamUnavailable,
            Self::Config(_) | Self::Yaml(_) => ErrorKind::Config,
            Self::Usage(_) => ErrorKind::Usage,
            Self::Io(_) | Self::Json(_) => ErrorKind::Io,
        }
    }

    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::InvalidInput => ExitCode::INPUT_ERROR,
            ErrorKind::UpstreamUnavailable => ExitCode::UPSTREAM_ERROR,
            ErrorKind::Config => ExitCode::CONFIG_ERROR,
            ErrorKind::Usage => ExitCode::USAGE_ERROR,
            ErrorKind::Io => ExitCode::IO_ERROR,
        }
    }
}

// ============================================================================
// Engine Input Errors
// ============================================================================

/// Rejected engine input.
///
/// Every variant belongs to the `InvalidInput` kind: the engine validates
/// before it computes and never returns NaN or a silently clamped value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhiError {
    /// Parallel sequences have different lengths
    #[error("length mismatch: {left} has {left_len} entries, {right} has {right_len}")]
    LengthMismatch {
        /// Name of the first sequence
        left: &'static str,
        /// Length of the first sequence
        left_len: usize,
        /// Name of the second sequence
        right: &'static str,
        /// Length of the second sequence
        right_len: usize,
    },

    /// Sequences contain no entries
    #[error("parameter set is empty")]
    Empty,

    /// A value that must be non-negative is negative
    #[error("{field}[{index}] is negative ({value})")]
    Negative {
        /// Name of the offending sequence or argument
        field: &'static str,
        /// Position within the sequence (0 for scalar arguments)
        index: usize,
        /// The rejected value, formatted
        value: String,
    },

    /// A value is NaN or infinite
    #[error("{field}[{index}] is not a finite number")]
    NonFinite {
        /// Name of the offending sequence or argument
        field: &'static str,
        /// Position within the sequence (0 for scalar arguments)
        index: usize,
    },

    /// 256-bit arithmetic overflowed
    #[error("arithmetic overflow while computing {0}")]
    Overflow(&'static str),
}

// ============================================================================
// Upstream Errors
// ============================================================================

/// Failures of the external data source.
///
/// All variants belong to the `UpstreamUnavailable` kind, which lets the
/// service fall back to a labelled placeholder result.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Network failure, timeout, or non-success HTTP status
    #[error("upstream unavailable: {0}")]
    Unavailable(String),

    /// The node answered with a JSON-RPC error (e.g. a revert)
    #[error("RPC error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code
        code: i64,
        /// JSON-RPC error message
        message: String,
    },

    /// The response could not be decoded
    #[error("malformed upstream data: {0}")]
    Malformed(String),

    /// A required contract address is not present in the deployment file
    #[error("contract not deployed: {0}")]
    NotDeployed(String),

    /// The source has no token with this id
    #[error("token {0} does not exist")]
    UnknownToken(u64),
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// YAML or JSON parsing failed
    #[error("parse error in {path}: {message}")]
    ParseError {
        /// Path to the configuration file
        path: PathBuf,
        /// Line number where the error occurred (if available)
        line: Option<usize>,
        /// Error message from the parser
        message: String,
    },

    /// Configuration validation failed
    #[error("validation failed for {path}: {}", join_issues(.errors))]
    ValidationError {
        /// Path to the configuration file
        path: String,
        /// List of validation issues found
        errors: Vec<ValidationIssue>,
    },

    /// Referenced configuration file not found
    #[error("file not found: {path}")]
    MissingFile {
        /// Path to the missing file
        path: PathBuf,
    },

    /// Field has an invalid value
    #[error("invalid value for '{field}': got '{value}', expected {expected}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The actual value provided
        value: String,
        /// Description of what was expected
        expected: String,
    },

    /// Environment variable referenced in configuration is not set
    #[error("environment variable '{var}' not set (referenced at {location})")]
    EnvVarNotSet {
        /// Name of the environment variable
        var: String,
        /// Location in the configuration where it was referenced
        location: String,
    },
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// ============================================================================
// Validation Types
// ============================================================================

/// A single validation issue found during configuration validation.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Path to the problematic field (e.g., "history.capacity")
    pub path: String,
    /// Description of the validation issue
    pub message: String,
    /// Severity level of the issue
    pub severity: Severity,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {} at {}", prefix, self.message, self.path)
    }
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Error - validation failure that prevents configuration from being used
    Error,
    /// Warning - potential issue that does not prevent configuration loading
    Warning,
}

// ============================================================================
// Result Type Alias
// ============================================================================

/// Result type alias for `skynt-phi` operations.
pub type Result<T> = std::result::Result<T, SkyntError>;

// ============================================================================
// Tests
// ============================================================================
