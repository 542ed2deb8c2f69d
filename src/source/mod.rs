//! Data sources for Φ parameters and token metadata.
//!
//! A [`DataSource`] is chosen once at startup from [`SourceKind`]:
//! [`MockSource`] serves fixed placeholder data, [`ContractSource`] reads the
//! deployed contracts over JSON-RPC. Every result the service reports is
//! tagged with the [`Provenance`] of the source that produced it.

pub mod abi;
pub mod contract;
pub mod deployment;
pub mod mock;
pub mod rpc;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use ethereum_types::U256;
use serde::{Deserialize, Serialize};

use crate::config::schema::{MockConfig, SourceConfig, SourceKind};
use crate::engine::{PhiParameterSet, RarityInput, RarityTier, serialize_decimal};
use crate::error::{ConfigError, SkyntError, UpstreamError};

pub use contract::ContractSource;
pub use deployment::Deployment;
pub use mock::MockSource;
pub use rpc::RpcClient;

/// The zero address, reported as owner by the mock source.
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

// ============================================================================
// Provenance
// ============================================================================

/// Whether data is authoritative (read from the contract) or a placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Placeholder data.
    Mock,
    /// Read from the deployed contracts.
    Contract,
}

impl Provenance {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mock => "mock",
            Self::Contract => "contract",
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Source Data
// ============================================================================

/// A parameter set together with the source's own Φ total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhiSnapshot {
    /// Weights, values and eigen-coefficients.
    pub params: PhiParameterSet,
    /// Φ total as computed by the source.
    pub total: U256,
}

/// Per-token metadata recorded at mint time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenMetadata {
    /// Stored rarity score.
    #[serde(serialize_with = "serialize_decimal")]
    pub rarity: U256,
    /// φ value at mint.
    #[serde(serialize_with = "serialize_decimal")]
    pub phi_value: U256,
    /// Mint timestamp (Unix seconds).
    #[serde(serialize_with = "serialize_decimal")]
    pub mint_time: U256,
    /// Supply at mint.
    #[serde(serialize_with = "serialize_decimal")]
    pub supply: U256,
    /// Demand at mint.
    #[serde(serialize_with = "serialize_decimal")]
    pub demand: U256,
    /// Display tier.
    pub rarity_tier: RarityTier,
}

impl TokenMetadata {
    /// The inputs of the rarity formula for this token.
    #[must_use]
    pub const fn rarity_input(&self) -> RarityInput {
        RarityInput {
            supply: self.supply,
            demand: self.demand,
            phi_value: self.phi_value,
        }
    }
}

// ============================================================================
// DataSource Trait
// ============================================================================

/// Supplier of Φ parameters and token metadata.
#[async_trait]
pub trait DataSource: Send + Sync + fmt::Debug {
    /// Provenance tag attached to everything this source returns.
    fn provenance(&self) -> Provenance;

    /// The source's current Φ total.
    async fn phi_total(&self) -> Result<U256, UpstreamError>;

    /// The full parameter set and the source's Φ total.
    async fn phi_parameters(&self) -> Result<PhiSnapshot, UpstreamError>;

    /// Number of minted tokens.
    async fn total_supply(&self) -> Result<u64, UpstreamError>;

    /// Metadata for one token.
    async fn token_metadata(&self, token_id: u64) -> Result<TokenMetadata, UpstreamError>;

    /// Owner address of one token.
    async fn token_owner(&self, token_id: u64) -> Result<String, UpstreamError>;

    /// Display tier of one token.
    async fn rarity_tier(&self, token_id: u64) -> Result<RarityTier, UpstreamError>;
}

// ============================================================================
// Selection
// ============================================================================

/// Builds the data source selected by configuration.
///
/// `auto` resolves to the contract source when an RPC URL is configured and
/// the deployment file loads, and to the mock source otherwise.
///
/// # Errors
///
/// Returns a configuration error when `contract` is requested without an
/// RPC URL or a readable deployment file, or an upstream error when the
/// deployment lacks the `Admin` contract.
pub fn build_source(
    source: &SourceConfig,
    mock: &MockConfig,
) -> Result<Arc<dyn DataSource>, SkyntError> {
    match source.kind {
        SourceKind::Mock => Ok(Arc::new(MockSource::new(mock)?)),
        SourceKind::Contract => {
            let Some(rpc_url) = source.rpc_url() else {
                return Err(ConfigError::InvalidValue {
                    field: "source.rpc_url".into(),
                    value: String::new(),
                    expected: "an RPC URL when source.kind is 'contract'".into(),
                }
                .into());
            };
            let deployment = Deployment::load(&source.deployment_file)?;
            let rpc = RpcClient::new(rpc_url, source.timeout)?;
            Ok(Arc::new(ContractSource::new(rpc, &deployment)?))
        }
        SourceKind::Auto => {
            let Some(rpc_url) = source.rpc_url() else {
                tracing::warn!("no RPC URL configured, serving mock data");
                return Ok(Arc::new(MockSource::new(mock)?));
            };
            let deployment = match Deployment::load(&source.deployment_file) {
                Ok(d) => d,
                Err(e) => {
                    tracing::warn!(
                        file = %source.deployment_file.display(),
                        error = %e,
                        "deployment file unavailable, serving mock data"
                    );
                    return Ok(Arc::new(MockSource::new(mock)?));
                }
            };
            let rpc = RpcClient::new(rpc_url, source.timeout)?;
            Ok(Arc::new(ContractSource::new(rpc, &deployment)?))
        }
    }
}

/// Narrows a `uint256` to `u64`.
///
/// # Errors
///
/// Returns [`UpstreamError::Malformed`] if the value does not fit.
pub fn u256_to_u64(value: U256, what: &str) -> Result<u64, UpstreamError> {
    if value > U256::from(u64::MAX) {
        return Err(UpstreamError::Malformed(format!(
            "{what} does not fit in 64 bits: {value}"
        )));
    }
    Ok(value.low_u64())
}
