//! Semantic validation of a deserialized [`AppConfig`].
//!
//! Collects every issue rather than stopping at the first.

use crate::config::schema::{AppConfig, MAX_MOCK_TOKENS, SourceKind};
use crate::error::{Severity, ValidationIssue};

/// Outcome of validating one configuration.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Issues that prevent the configuration from being used.
    pub errors: Vec<ValidationIssue>,
    /// Informational issues.
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Returns `true` if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Configuration validator.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl Validator {
    /// Creates a validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates `config`, returning all errors and warnings found.
    pub fn validate(&mut self, config: &AppConfig) -> ValidationResult {
        self.errors.clear();
        self.warnings.clear();

        self.validate_source(config);
        self.validate_mock(config);
        self.validate_history(config);
        self.validate_particles(config);
        self.validate_watch(config);

        ValidationResult {
            errors: std::mem::take(&mut self.errors),
            warnings: std::mem::take(&mut self.warnings),
        }
    }

    fn validate_source(&mut self, config: &AppConfig) {
        let source = &config.source;
        if source.timeout.is_zero() {
            self.add_error("source.timeout", "timeout must be greater than zero");
        }
        if let Some(url) = source.rpc_url() {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                self.add_error("source.rpc_url", "RPC URL must use http:// or https://");
            }
        }
        // The URL may still arrive via --rpc-url or RPC_URL; startup enforces it.
        if source.kind == SourceKind::Contract && source.rpc_url().is_none() {
            self.add_warning(
                "source.rpc_url",
                "source.kind is 'contract' but no RPC URL is configured",
            );
        }
    }

    fn validate_mock(&mut self, config: &AppConfig) {
        if config.mock.token_count > MAX_MOCK_TOKENS {
            self.add_error(
                "mock.token_count",
                &format!("must be at most {MAX_MOCK_TOKENS}"),
            );
        }
    }

    fn validate_history(&mut self, config: &AppConfig) {
        let history = &config.history;
        if history.capacity == 0 {
            self.add_error("history.capacity", "must be greater than zero");
        }
        if history.default_limit > history.capacity {
            self.add_error(
                "history.default_limit",
                "must not exceed history.capacity",
            );
        }
    }

    fn validate_particles(&mut self, config: &AppConfig) {
        let particles = &config.particles;
        if particles.count == 0 {
            self.add_error("particles.count", "must be greater than zero");
        }
        for (path, value) in [
            ("particles.width", particles.width),
            ("particles.height", particles.height),
        ] {
            if !value.is_finite() || value <= 0.0 {
                self.add_error(path, "must be a positive number");
            }
        }
    }

    fn validate_watch(&mut self, config: &AppConfig) {
        if config.watch.interval.is_zero() {
            self.add_error("watch.interval", "must be greater than zero");
        }
    }

    fn add_error(&mut self, path: &str, message: &str) {
        self.errors.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Error,
        });
    }

    fn add_warning(&mut self, path: &str, message: &str) {
        self.warnings.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Warning,
        });
    }
}
