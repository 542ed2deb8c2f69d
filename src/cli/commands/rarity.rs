//! Offline rarity scoring (`rarity`).

use ethereum_types::U256;
use serde::Serialize;

use crate::cli::args::RarityArgs;
use crate::engine::{RARITY_FORMULA, RarityTier, compute_rarity, compute_rarity_exact};
use crate::error::SkyntError;

use super::{emit, parse_f64, parse_u256};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ScoreReport {
    rarity_score: serde_json::Value,
    tier: RarityTier,
    formula: &'static str,
}

/// Scores the given mint-time inputs.
///
/// # Errors
///
/// Returns [`SkyntError::Usage`] for unparseable numbers and
/// [`SkyntError::Phi`] for negative, non-finite or overflowing inputs.
pub fn run(args: &RarityArgs) -> Result<(), SkyntError> {
    let report = score(args)?;
    emit(args.format, &report, |r| {
        println!("rarity score = {} ({})", r.rarity_score, r.tier);
        println!("{}", r.formula);
    })
}

fn score(args: &RarityArgs) -> Result<ScoreReport, SkyntError> {
    let (rarity_score, tier) = if args.exact {
        let supply = parse_u256("supply", "supply", 0, &args.supply)?;
        let demand = parse_u256("demand", "demand", 0, &args.demand)?;
        let phi_value = parse_u256("phi", "phiValue", 0, &args.phi_value)?;
        let score = compute_rarity_exact(supply, demand, phi_value)?;
        (serde_json::Value::String(score.to_string()), RarityTier::from_score(score))
    } else {
        let supply = parse_f64("supply", &args.supply)?;
        let demand = parse_f64("demand", &args.demand)?;
        let phi_value = parse_f64("phi", &args.phi_value)?;
        let score = compute_rarity(supply, demand, phi_value)?;
        // Floored and non-negative; `as` saturates above u64::MAX.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let tier = RarityTier::from_score(U256::from(score as u64));
        (serde_json::json!(score), tier)
    };

    Ok(ScoreReport {
        rarity_score,
        tier,
        formula: RARITY_FORMULA,
    })
}
