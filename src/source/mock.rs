//! Placeholder data source.
//!
//! Serves the reference parameter set and a seeded collection of tokens.
//! Every value it returns is derived deterministically from the configured
//! seed, so repeated runs and tests see identical data.

use async_trait::async_trait;
use ethereum_types::U256;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::schema::MockConfig;
use crate::engine::{PhiParameterSet, RarityInput, RarityTier};
use crate::error::{PhiError, UpstreamError};

use super::{DataSource, PhiSnapshot, Provenance, TokenMetadata, ZERO_ADDRESS};

/// Reference weights.
pub const MOCK_WEIGHTS: [u64; 3] = [100, 150, 200];

/// Reference values.
pub const MOCK_VALUES: [u64; 3] = [1000, 1500, 2000];

/// Reference eigen-coefficients.
pub const MOCK_EIGEN_VECTORS: [u64; 3] = [150, 200, 250];

/// Mint time of token 0 (2025-01-01T00:00:00Z).
const MINT_EPOCH: u64 = 1_735_689_600;

/// Seconds between consecutive mints.
const MINT_SPACING: u64 = 3600;

/// [`DataSource`] serving fixed, seeded placeholder data.
#[derive(Debug, Clone)]
pub struct MockSource {
    params: PhiParameterSet,
    total: U256,
    tokens: Vec<TokenMetadata>,
}

impl MockSource {
    /// Builds the mock data set.
    ///
    /// # Errors
    ///
    /// Returns [`PhiError`] if the reference parameters fail validation,
    /// which only happens if the constants above are edited inconsistently.
    pub fn new(config: &MockConfig) -> Result<Self, PhiError> {
        let params = PhiParameterSet::from_u64(&MOCK_WEIGHTS, &MOCK_VALUES, &MOCK_EIGEN_VECTORS)?;
        let total = params.exact_total()?;

        let mut rng = StdRng::seed_from_u64(config.seed);
        let tokens = (0..config.token_count)
            .map(|id| mock_token(id, &mut rng))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            params,
            total,
            tokens,
        })
    }

    fn token(&self, token_id: u64) -> Result<&TokenMetadata, UpstreamError> {
        usize::try_from(token_id)
            .ok()
            .and_then(|i| self.tokens.get(i))
            .ok_or(UpstreamError::UnknownToken(token_id))
    }
}

// Supply at mint equals the token id. Demand scales with supply so scores
// spread across every tier instead of saturating at Legendary.
fn mock_token(id: u64, rng: &mut StdRng) -> Result<TokenMetadata, PhiError> {
    let demand = rng.random_range(0..=5 * (id + 1));
    let phi_value = rng.random_range(1000..=2000_u64);
    let mint_time = MINT_EPOCH + id * MINT_SPACING + rng.random_range(0..MINT_SPACING);

    let input = RarityInput {
        supply: U256::from(id),
        demand: U256::from(demand),
        phi_value: U256::from(phi_value),
    };
    let rarity = input.score()?;

    Ok(TokenMetadata {
        rarity,
        phi_value: input.phi_value,
        mint_time: U256::from(mint_time),
        supply: input.supply,
        demand: input.demand,
        rarity_tier: RarityTier::from_score(rarity),
    })
}

#[async_trait]
impl DataSource for MockSource {
    fn provenance(&self) -> Provenance {
        Provenance::Mock
    }

    async fn phi_total(&self) -> Result<U256, UpstreamError> {
        Ok(self.total)
    }

    async fn phi_parameters(&self) -> Result<PhiSnapshot, UpstreamError> {
        Ok(PhiSnapshot {
            params: self.params.clone(),
            total: self.total,
        })
    }

    async fn total_supply(&self) -> Result<u64, UpstreamError> {
        Ok(self.tokens.len() as u64)
    }

    async fn token_metadata(&self, token_id: u64) -> Result<TokenMetadata, UpstreamError> {
        self.token(token_id).cloned()
    }

    async fn token_owner(&self, token_id: u64) -> Result<String, UpstreamError> {
        self.token(token_id)?;
        Ok(ZERO_ADDRESS.to_owned())
    }

    async fn rarity_tier(&self, token_id: u64) -> Result<RarityTier, UpstreamError> {
        Ok(self.token(token_id)?.rarity_tier)
    }
}
