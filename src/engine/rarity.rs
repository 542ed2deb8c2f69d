//! NFT rarity scoring.
//!
//! `R_i = floor((demand * φ_i) / (supply + 1) / 100)`
//!
//! [`compute_rarity_exact`] is the canonical form and is used for every
//! rarity report. It floors after the division by `supply + 1` and again
//! after the division by 100, which for non-negative integers equals the
//! floor of the real-valued expression.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use ethereum_types::U256;
use serde::{Deserialize, Serialize};

use crate::error::PhiError;

use super::{check_non_negative, finite};

/// Human-readable rarity formula, reported alongside scores.
pub const RARITY_FORMULA: &str = "R_i = (demand * Φ_i) / (supply + 1)";

/// Final scale divisor applied to the raw ratio.
const SCORE_SCALE: u64 = 100;

// ============================================================================
// Scoring
// ============================================================================

/// Per-entity rarity inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RarityInput {
    /// Number of tokens minted when this one was minted.
    #[serde(serialize_with = "super::serialize_decimal")]
    pub supply: U256,
    /// Demand counter at mint time.
    #[serde(serialize_with = "super::serialize_decimal")]
    pub demand: U256,
    /// Per-token φ value (not the aggregate Φ).
    #[serde(serialize_with = "super::serialize_decimal")]
    pub phi_value: U256,
}

impl RarityInput {
    /// Scores this input with the canonical integer formula.
    ///
    /// # Errors
    ///
    /// Returns [`PhiError::Overflow`] if `demand * phi_value` exceeds 256 bits.
    pub fn score(&self) -> Result<U256, PhiError> {
        compute_rarity_exact(self.supply, self.demand, self.phi_value)
    }
}

/// Computes the rarity score with floating-point inputs.
///
/// # Errors
///
/// Returns [`PhiError::Negative`] or [`PhiError::NonFinite`] for invalid
/// inputs and [`PhiError::Overflow`] if `demand * phi_value` exceeds the
/// `f64` range; negative scores are never produced.
pub fn compute_rarity(supply: f64, demand: f64, phi_value: f64) -> Result<f64, PhiError> {
    check_non_negative("supply", &[supply])?;
    check_non_negative("demand", &[demand])?;
    check_non_negative("phiValue", &[phi_value])?;

    let numerator = finite(demand * phi_value, "demand * phiValue")?;
    #[allow(clippy::cast_precision_loss)]
    let score = numerator / (supply + 1.0) / SCORE_SCALE as f64;
    Ok(score.floor())
}

/// Computes the rarity score over `uint256` inputs.
///
/// # Errors
///
/// Returns [`PhiError::Overflow`] if `demand * phi_value` or `supply + 1`
/// exceeds 256 bits.
pub fn compute_rarity_exact(supply: U256, demand: U256, phi_value: U256) -> Result<U256, PhiError> {
    let numerator = demand
        .checked_mul(phi_value)
        .ok_or(PhiError::Overflow("demand * phiValue"))?;
    let denominator = supply
        .checked_add(U256::one())
        .ok_or(PhiError::Overflow("supply + 1"))?;
    Ok(numerator / denominator / U256::from(SCORE_SCALE))
}

// ============================================================================
// Tiers
// ============================================================================

/// Display tier derived from a rarity score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RarityTier {
    /// Score below 20.
    Common,
    /// Score 20..40.
    Uncommon,
    /// Score 40..60.
    Rare,
    /// Score 60..80.
    Epic,
    /// Score 80 and above.
    Legendary,
}

impl RarityTier {
    /// All tiers, most common first.
    pub const ALL: [Self; 5] = [
        Self::Common,
        Self::Uncommon,
        Self::Rare,
        Self::Epic,
        Self::Legendary,
    ];

    /// Classifies a score.
    #[must_use]
    pub fn from_score(score: U256) -> Self {
        if score < U256::from(20u64) {
            Self::Common
        } else if score < U256::from(40u64) {
            Self::Uncommon
        } else if score < U256::from(60u64) {
            Self::Rare
        } else if score < U256::from(80u64) {
            Self::Epic
        } else {
            Self::Legendary
        }
    }

    /// Tier name as reported by the contract.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Common => "Common",
            Self::Uncommon => "Uncommon",
            Self::Rare => "Rare",
            Self::Epic => "Epic",
            Self::Legendary => "Legendary",
        }
    }

    /// Suggests the closest tier name for a misspelt input.
    ///
    /// Returns `None` when nothing is within a Damerau-Levenshtein distance
    /// of 3.
    #[must_use]
    pub fn suggest(input: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .map(|t| (*t, strsim::damerau_levenshtein(input, t.as_str())))
            .filter(|(_, dist)| *dist <= 3)
            .min_by_key(|(_, dist)| *dist)
            .map(|(tier, _)| tier)
    }
}

impl fmt::Display for RarityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a tier name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTier {
    /// The rejected input.
    pub input: String,
    /// Closest known tier, if any.
    pub suggestion: Option<RarityTier>,
}

impl fmt::Display for UnknownTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown rarity tier '{}'", self.input)?;
        if let Some(tier) = self.suggestion {
            write!(f, " (did you mean '{tier}'?)")?;
        }
        Ok(())
    }
}

impl std::error::Error for UnknownTier {}

impl FromStr for RarityTier {
    type Err = UnknownTier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownTier {
                input: trimmed.to_string(),
                suggestion: Self::suggest(trimmed),
            })
    }
}

// ============================================================================
// Distribution
// ============================================================================

/// Count of tokens per tier. Every tier is always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RarityDistribution(BTreeMap<RarityTier, u64>);

impl RarityDistribution {
    /// Creates a distribution with every tier at zero.
    #[must_use]
    pub fn new() -> Self {
        Self(RarityTier::ALL.into_iter().map(|t| (t, 0)).collect())
    }

    /// Counts one token of the given tier.
    pub fn record(&mut self, tier: RarityTier) {
        *self.0.entry(tier).or_insert(0) += 1;
    }

    /// Count for one tier.
    #[must_use]
    pub fn count(&self, tier: RarityTier) -> u64 {
        self.0.get(&tier).copied().unwrap_or(0)
    }

    /// Total tokens counted.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    /// Iterates tiers from most common to rarest.
    pub fn iter(&self) -> impl Iterator<Item = (RarityTier, u64)> + '_ {
        self.0.iter().map(|(t, c)| (*t, *c))
    }
}

impl Default for RarityDistribution {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<RarityTier> for RarityDistribution {
    fn from_iter<I: IntoIterator<Item = RarityTier>>(iter: I) -> Self {
        let mut dist = Self::new();
        for tier in iter {
            dist.record(tier);
        }
        dist
    }
}
