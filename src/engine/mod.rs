//! Φ computation engine
//!
//! Pure functions over small parallel parameter arrays:
//!
//! - `Φ_total = Σ_i (w_i * v_i) / N`
//! - `ΔS_geom = Σ_i sqrt(w_i * v_i)`
//! - `ΔS_protocol = Σ_i e_i / N`
//! - `ΔS_total = ΔS_geom + ΔS_protocol`
//!
//! Every operation validates its inputs up front and fails with a
//! [`PhiError`] instead of producing NaN; a result that exceeds the `f64`
//! range is [`PhiError::Overflow`], never infinity. The `_exact` variants operate on
//! unsigned 256-bit integers with the same truncating semantics as the
//! upstream contract.

pub mod particles;
pub mod rarity;

use ethereum_types::U256;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::PhiError;

pub use particles::{Particle, ParticleConfig, ParticleField};
pub use rarity::{
    RARITY_FORMULA, RarityDistribution, RarityInput, RarityTier, compute_rarity,
    compute_rarity_exact,
};

// ============================================================================
// Results
// ============================================================================

/// The three entropy-shift components.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeltaS {
    /// `Σ sqrt(w_i * v_i)`
    pub geom: f64,
    /// Mean of the eigen-coefficients.
    pub protocol: f64,
    /// `geom + protocol`
    pub total: f64,
}

/// Aggregate Φ plus the derived entropy-shift metrics.
///
/// Serialized with camelCase names; the `deltaS_*` spellings used by older
/// consumers are accepted when deserializing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhiResult {
    /// Arithmetic mean of the pairwise products.
    pub total: f64,
    /// Geometric-shift term.
    #[serde(alias = "deltaS_geom")]
    pub delta_geom: f64,
    /// Protocol term.
    #[serde(alias = "deltaS_protocol")]
    pub delta_protocol: f64,
    /// Sum of the two shift terms.
    #[serde(alias = "deltaS_total")]
    pub delta_total: f64,
}

impl PhiResult {
    /// Combines a total with its entropy-shift components.
    #[must_use]
    pub const fn new(total: f64, delta: DeltaS) -> Self {
        Self {
            total,
            delta_geom: delta.geom,
            delta_protocol: delta.protocol,
            delta_total: delta.total,
        }
    }
}

// ============================================================================
// Parameter Set
// ============================================================================

/// Three equal-length, non-empty parameter sequences as read from the
/// source contract.
///
/// Entries are `uint256` on chain, so non-negativity holds by construction.
/// The set is immutable; a refresh replaces it whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhiParameterSet {
    #[serde(serialize_with = "serialize_decimal_seq")]
    weights: Vec<U256>,
    #[serde(serialize_with = "serialize_decimal_seq")]
    values: Vec<U256>,
    #[serde(serialize_with = "serialize_decimal_seq")]
    eigen_vectors: Vec<U256>,
}

impl PhiParameterSet {
    /// Builds a parameter set.
    ///
    /// # Errors
    ///
    /// Returns [`PhiError::LengthMismatch`] if the sequences differ in
    /// length, or [`PhiError::Empty`] if they are empty.
    pub fn new(
        weights: Vec<U256>,
        values: Vec<U256>,
        eigen_vectors: Vec<U256>,
    ) -> Result<Self, PhiError> {
        check_lengths("weights", weights.len(), "values", values.len())?;
        check_lengths("weights", weights.len(), "eigenVectors", eigen_vectors.len())?;
        if weights.is_empty() {
            return Err(PhiError::Empty);
        }
        Ok(Self {
            weights,
            values,
            eigen_vectors,
        })
    }

    /// Convenience constructor from small integers.
    ///
    /// # Errors
    ///
    /// Same as [`PhiParameterSet::new`].
    pub fn from_u64(weights: &[u64], values: &[u64], eigen_vectors: &[u64]) -> Result<Self, PhiError> {
        Self::new(
            weights.iter().copied().map(U256::from).collect(),
            values.iter().copied().map(U256::from).collect(),
            eigen_vectors.iter().copied().map(U256::from).collect(),
        )
    }

    /// Number of parameters (N).
    #[must_use]
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Always `false`; construction rejects empty sets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Weight coefficients.
    #[must_use]
    pub fn weights(&self) -> &[U256] {
        &self.weights
    }

    /// Per-parameter values.
    #[must_use]
    pub fn values(&self) -> &[U256] {
        &self.values
    }

    /// Eigen-coefficients.
    #[must_use]
    pub fn eigen_vectors(&self) -> &[U256] {
        &self.eigen_vectors
    }

    /// Φ total with contract (truncating 256-bit) semantics.
    ///
    /// # Errors
    ///
    /// Returns [`PhiError::Overflow`] if a product or the sum exceeds 256 bits.
    pub fn exact_total(&self) -> Result<U256, PhiError> {
        compute_total_exact(&self.weights, &self.values)
    }

    /// Runs the floating-point engine over this set.
    ///
    /// # Errors
    ///
    /// Propagates validation failures from [`compute_total`] and
    /// [`compute_delta_s`].
    pub fn evaluate(&self) -> Result<PhiResult, PhiError> {
        let weights = to_f64_vec(&self.weights);
        let values = to_f64_vec(&self.values);
        let eigen = to_f64_vec(&self.eigen_vectors);

        let total = compute_total(&weights, &values)?;
        let delta = compute_delta_s(&weights, &values, &eigen)?;
        Ok(PhiResult::new(total, delta))
    }

    /// Weights, values and eigen-coefficients as `f64` (lossy above 2^53).
    #[must_use]
    pub fn to_f64(&self) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        (
            to_f64_vec(&self.weights),
            to_f64_vec(&self.values),
            to_f64_vec(&self.eigen_vectors),
        )
    }
}

// ============================================================================
// Operations
// ============================================================================

/// Computes `Σ_i (w_i * v_i) / N`.
///
/// # Errors
///
/// Returns [`PhiError`] if the slices differ in length, are empty, or
/// contain a negative or non-finite entry, and [`PhiError::Overflow`] if the
/// sum of products exceeds the `f64` range.
pub fn compute_total(weights: &[f64], values: &[f64]) -> Result<f64, PhiError> {
    check_lengths("weights", weights.len(), "values", values.len())?;
    if weights.is_empty() {
        return Err(PhiError::Empty);
    }
    check_non_negative("weights", weights)?;
    check_non_negative("values", values)?;

    let sum: f64 = weights.iter().zip(values).map(|(w, v)| w * v).sum();
    let sum = finite(sum, "sum of products")?;
    #[allow(clippy::cast_precision_loss)]
    Ok(sum / weights.len() as f64)
}

/// Computes `Σ_i (w_i * v_i) / N` over `uint256` inputs.
///
/// Products and the running sum are checked; the final division floors,
/// matching Solidity integer division.
///
/// # Errors
///
/// Returns [`PhiError::LengthMismatch`], [`PhiError::Empty`], or
/// [`PhiError::Overflow`].
pub fn compute_total_exact(weights: &[U256], values: &[U256]) -> Result<U256, PhiError> {
    check_lengths("weights", weights.len(), "values", values.len())?;
    if weights.is_empty() {
        return Err(PhiError::Empty);
    }

    let mut sum = U256::zero();
    for (w, v) in weights.iter().zip(values) {
        let product = w.checked_mul(*v).ok_or(PhiError::Overflow("weight * value"))?;
        sum = sum
            .checked_add(product)
            .ok_or(PhiError::Overflow("sum of products"))?;
    }
    Ok(sum / U256::from(weights.len()))
}

/// Computes the entropy-shift terms.
///
/// Negative entries are rejected rather than clamped, so the square root
/// never sees a negative product.
///
/// # Errors
///
/// Returns [`PhiError`] if the three slices differ in length, are empty, or
/// contain a negative or non-finite entry, and [`PhiError::Overflow`] if a
/// term exceeds the `f64` range.
pub fn compute_delta_s(
    weights: &[f64],
    values: &[f64],
    eigen_vectors: &[f64],
) -> Result<DeltaS, PhiError> {
    check_lengths("weights", weights.len(), "values", values.len())?;
    check_lengths("weights", weights.len(), "eigenVectors", eigen_vectors.len())?;
    if weights.is_empty() {
        return Err(PhiError::Empty);
    }
    check_non_negative("weights", weights)?;
    check_non_negative("values", values)?;
    check_non_negative("eigenVectors", eigen_vectors)?;

    let geom: f64 = weights
        .iter()
        .zip(values)
        .map(|(w, v)| (w * v).sqrt())
        .sum();
    let geom = finite(geom, "ΔS_geom")?;
    let eigen_sum = finite(eigen_vectors.iter().sum(), "sum of eigenVectors")?;
    #[allow(clippy::cast_precision_loss)]
    let protocol = eigen_sum / eigen_vectors.len() as f64;

    Ok(DeltaS {
        geom,
        protocol,
        total: finite(geom + protocol, "ΔS_total")?,
    })
}

// ============================================================================
// Helpers
// ============================================================================

/// Converts a `U256` to the nearest `f64`.
#[must_use]
pub fn u256_to_f64(value: U256) -> f64 {
    // Limbs are little-endian 64-bit words.
    #[allow(clippy::cast_precision_loss)]
    value
        .0
        .iter()
        .rev()
        .fold(0.0_f64, |acc, &limb| acc.mul_add(18_446_744_073_709_551_616.0, limb as f64))
}

fn to_f64_vec(values: &[U256]) -> Vec<f64> {
    values.iter().copied().map(u256_to_f64).collect()
}

pub(crate) fn finite(value: f64, what: &'static str) -> Result<f64, PhiError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(PhiError::Overflow(what))
    }
}

const fn check_lengths(
    left: &'static str,
    left_len: usize,
    right: &'static str,
    right_len: usize,
) -> Result<(), PhiError> {
    if left_len == right_len {
        Ok(())
    } else {
        Err(PhiError::LengthMismatch {
            left,
            left_len,
            right,
            right_len,
        })
    }
}

pub(crate) fn check_non_negative(field: &'static str, values: &[f64]) -> Result<(), PhiError> {
    for (index, &value) in values.iter().enumerate() {
        if !value.is_finite() {
            return Err(PhiError::NonFinite { field, index });
        }
        if value < 0.0 {
            return Err(PhiError::Negative {
                field,
                index,
                value: value.to_string(),
            });
        }
    }
    Ok(())
}

/// Serializes a `U256` as a decimal string.
///
/// # Errors
///
/// Propagates serializer errors.
pub fn serialize_decimal<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

/// Serializes a slice of `U256` as an array of decimal strings.
///
/// # Errors
///
/// Propagates serializer errors.
pub fn serialize_decimal_seq<S: Serializer>(
    values: &[U256],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(values.iter().map(ToString::to_string))
}

// ============================================================================
// Tests
// ============================================================================
