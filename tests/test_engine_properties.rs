//! Property tests for the Φ engine, rarity scoring and history buffer.

use chrono::Utc;
use ethereum_types::U256;
use proptest::prelude::*;

use skynt_phi::engine::{
    RarityTier, compute_delta_s, compute_rarity, compute_rarity_exact, compute_total,
    compute_total_exact,
};
use skynt_phi::error::PhiError;
use skynt_phi::history::{HistoryEntry, PhiHistory};
use skynt_phi::source::Provenance;

fn entry(value: u64) -> HistoryEntry {
    HistoryEntry {
        value: U256::from(value),
        timestamp: Utc::now(),
        source: Provenance::Mock,
    }
}

/// Equal-length pairs of non-negative weights and values.
fn weights_and_values() -> impl Strategy<Value = (Vec<f64>, Vec<f64>)> {
    (1usize..32).prop_flat_map(|n| {
        (
            prop::collection::vec(0.0f64..1e6, n),
            prop::collection::vec(0.0f64..1e6, n),
        )
    })
}

proptest! {
    #[test]
    fn total_is_mean_of_products((weights, values) in weights_and_values()) {
        let expected: f64 = weights.iter().zip(&values).map(|(w, v)| w * v).sum::<f64>()
            / weights.len() as f64;
        let total = compute_total(&weights, &values).unwrap();
        prop_assert!((total - expected).abs() <= expected.abs() * 1e-12 + 1e-9);
    }

    #[test]
    fn mismatched_lengths_rejected(
        weights in prop::collection::vec(0.0f64..1e3, 0..8),
        values in prop::collection::vec(0.0f64..1e3, 0..8),
    ) {
        prop_assume!(weights.len() != values.len());
        let err = compute_total(&weights, &values).unwrap_err();
        prop_assert!(
            matches!(err, PhiError::LengthMismatch { .. }),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn delta_total_is_geom_plus_protocol(
        ((weights, values), eigen) in weights_and_values()
            .prop_flat_map(|(w, v)| {
                let n = w.len();
                (Just((w, v)), prop::collection::vec(0.0f64..1e4, n))
            })
    ) {
        let delta = compute_delta_s(&weights, &values, &eigen).unwrap();
        prop_assert!(delta.geom >= 0.0 && delta.protocol >= 0.0);
        prop_assert!((delta.total - (delta.geom + delta.protocol)).abs() < 1e-9 * delta.total.max(1.0));
    }

    #[test]
    fn negative_entry_rejected_not_clamped(
        (weights, values) in weights_and_values(),
        index in any::<prop::sample::Index>(),
        magnitude in 1e-6f64..1e6,
    ) {
        let mut weights = weights;
        let i = index.index(weights.len());
        weights[i] = -magnitude;
        let err = compute_total(&weights, &values).unwrap_err();
        prop_assert!(
            matches!(err, PhiError::Negative { field: "weights", index, .. } if index == i),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn exact_total_matches_float_for_small_integers(
        pairs in prop::collection::vec((0u64..1_000_000, 0u64..1_000_000), 1..16)
    ) {
        let (w, v): (Vec<u64>, Vec<u64>) = pairs.into_iter().unzip();
        let exact = compute_total_exact(
            &w.iter().copied().map(U256::from).collect::<Vec<_>>(),
            &v.iter().copied().map(U256::from).collect::<Vec<_>>(),
        )
        .unwrap();
        let sum: u128 = w.iter().zip(&v).map(|(a, b)| u128::from(*a) * u128::from(*b)).sum();
        prop_assert_eq!(exact, U256::from(sum / w.len() as u128));
    }

    #[test]
    fn rarity_float_and_exact_agree(
        supply in 0u64..1_000_000,
        demand in 0u64..1_000_000,
        phi in 0u64..10_000,
    ) {
        let exact = compute_rarity_exact(supply.into(), demand.into(), phi.into()).unwrap();
        let float = compute_rarity(supply as f64, demand as f64, phi as f64).unwrap();
        prop_assert!(float >= 0.0);
        // Float division can land one below an exact integer boundary.
        let diff = (float - exact.low_u64() as f64).abs();
        prop_assert!(diff <= 1.0, "float {float} exact {exact}");
    }

    #[test]
    fn tier_is_monotonic_in_score(a in 0u64..200, b in 0u64..200) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(RarityTier::from_score(lo.into()) <= RarityTier::from_score(hi.into()));
    }

    #[test]
    fn history_keeps_last_capacity_entries(capacity in 1usize..64, appends in 0u64..200) {
        let history = PhiHistory::new(capacity);
        for i in 0..appends {
            history.record(entry(i));
        }
        let kept = usize::try_from(appends).unwrap().min(capacity);
        prop_assert_eq!(history.len(), kept);

        let all = history.recent(capacity);
        let expected: Vec<U256> = (appends - kept as u64..appends).map(U256::from).collect();
        let got: Vec<U256> = all.iter().map(|e| e.value).collect();
        prop_assert_eq!(got, expected);
    }
}

#[test]
fn reference_parameters() {
    let weights = [100.0, 150.0, 200.0];
    let values = [1000.0, 1500.0, 2000.0];
    let total = compute_total(&weights, &values).unwrap();
    assert!((total - 241_666.67).abs() < 0.01);

    let delta = compute_delta_s(&weights, &values, &[150.0, 200.0, 250.0]).unwrap();
    assert!((delta.protocol - 200.0).abs() < 1e-12);
    assert!((delta.geom - 1423.03).abs() < 0.01);
    assert!((delta.total - 1623.03).abs() < 0.01);
}

#[test]
fn rarity_reference_values() {
    assert!(compute_rarity(0.0, 0.0, 0.0).unwrap().abs() < f64::EPSILON);
    assert!((compute_rarity(9.0, 10.0, 1000.0).unwrap() - 10.0).abs() < f64::EPSILON);
    assert_eq!(
        compute_rarity_exact(9u64.into(), 10u64.into(), 1000u64.into()).unwrap(),
        U256::from(10u64)
    );
}

#[test]
fn empty_input_rejected() {
    assert_eq!(compute_total(&[], &[]).unwrap_err(), PhiError::Empty);
}

#[test]
fn history_after_150_appends() {
    let history = PhiHistory::new(100);
    for i in 0..150 {
        history.record(entry(i));
    }
    assert_eq!(history.len(), 100);
    let values: Vec<U256> = history.recent(100).iter().map(|e| e.value).collect();
    assert_eq!(values, (50..150).map(U256::from).collect::<Vec<_>>());
}
