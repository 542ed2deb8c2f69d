//! Contract addresses from the deployment record.
//!
//! The deployment scripts write a JSON file of the form
//!
//! ```json
//! { "contracts": { "Admin": { "address": "0x..." }, "SKYNTLaunchNFT": { "address": "0x..." } } }
//! ```
//!
//! Other keys are ignored.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// Contract holding the Φ parameters.
pub const ADMIN_CONTRACT: &str = "Admin";

/// NFT contract holding token metadata.
pub const NFT_CONTRACT: &str = "SKYNTLaunchNFT";

/// Maximum deployment file size.
const MAX_DEPLOYMENT_SIZE: u64 = 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
struct ContractEntry {
    address: String,
}

/// Parsed deployment record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Deployment {
    #[serde(default)]
    contracts: HashMap<String, ContractEntry>,
}

impl Deployment {
    /// Reads and validates a deployment file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingFile`] if the file does not exist,
    /// [`ConfigError::ParseError`] if it is not valid JSON, and
    /// [`ConfigError::InvalidValue`] if any address is malformed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let metadata = std::fs::metadata(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;
        if metadata.len() > MAX_DEPLOYMENT_SIZE {
            return Err(ConfigError::InvalidValue {
                field: path.display().to_string(),
                value: format!("{} bytes", metadata.len()),
                expected: format!("at most {MAX_DEPLOYMENT_SIZE} bytes"),
            });
        }
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            line: None,
            message: e.to_string(),
        })?;
        Self::parse(&text).map_err(|e| match e {
            ConfigError::ParseError { line, message, .. } => ConfigError::ParseError {
                path: path.to_path_buf(),
                line,
                message,
            },
            other => other,
        })
    }

    /// Parses a deployment record from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ParseError`] (with an empty path) or
    /// [`ConfigError::InvalidValue`].
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let deployment: Self = serde_json::from_str(text).map_err(|e| ConfigError::ParseError {
            path: std::path::PathBuf::new(),
            line: Some(e.line()),
            message: e.to_string(),
        })?;

        for (name, entry) in &deployment.contracts {
            if !is_address(&entry.address) {
                return Err(ConfigError::InvalidValue {
                    field: format!("contracts.{name}.address"),
                    value: entry.address.clone(),
                    expected: "a 0x-prefixed 20-byte hex address".into(),
                });
            }
        }
        Ok(deployment)
    }

    /// Address of a named contract.
    #[must_use]
    pub fn address(&self, name: &str) -> Option<&str> {
        self.contracts.get(name).map(|c| c.address.as_str())
    }
}

fn is_address(text: &str) -> bool {
    text.strip_prefix("0x")
        .is_some_and(|hex| hex.len() == 40 && hex.bytes().all(|b| b.is_ascii_hexdigit()))
}
