//! Configuration module
//!
//! Loads and validates the optional YAML configuration file. Command-line
//! flags and environment variables are layered on top by the CLI.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{ConfigLoader, LoadResult, LoadWarning, LoaderOptions};
pub use schema::*;
pub use validation::{ValidationResult, Validator};
