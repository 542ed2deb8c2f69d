mod common;

use common::{fixture_path, run, run_json, run_with_env};

#[tokio::test]
async fn version_json() {
    let json = run_json(&["version", "--format", "json"]).await;
    assert_eq!(json["name"], "skynt-phi");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn help_exits_zero() {
    let output = run(&["--help"]).await;
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("phi"));
}

#[tokio::test]
async fn bad_arguments_exit_with_usage_code() {
    let output = run(&["phi", "compute", "--values", "1"]).await;
    assert_eq!(output.status.code(), Some(64));

    let output = run(&["nft", "get", "seven"]).await;
    assert_eq!(output.status.code(), Some(64));
}

#[tokio::test]
async fn completions_generate_script() {
    let output = run(&["completions", "bash"]).await;
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("skynt-phi"));
}

// ============================================================================
// phi
// ============================================================================

#[tokio::test]
async fn phi_compute_float() {
    let json = run_json(&[
        "phi",
        "compute",
        "--weights",
        "100,150,200",
        "--values",
        "1000,1500,2000",
        "--eigen",
        "150,200,250",
        "--format",
        "json",
    ])
    .await;

    let total = json["total"].as_f64().unwrap();
    assert!((total - 725_000.0 / 3.0).abs() < 1e-6);
    assert!((json["deltaProtocol"].as_f64().unwrap() - 200.0).abs() < 1e-12);
    let geom = json["deltaGeom"].as_f64().unwrap();
    let expected = 100_000f64.sqrt() + 225_000f64.sqrt() + 400_000f64.sqrt();
    assert!((geom - expected).abs() < 1e-9);
    assert!((json["deltaTotal"].as_f64().unwrap() - (geom + 200.0)).abs() < 1e-9);
}

#[tokio::test]
async fn phi_compute_exact_is_decimal_string() {
    let json = run_json(&[
        "phi",
        "compute",
        "--exact",
        "--weights",
        "100,150,200",
        "--values",
        "1000,1500,2000",
        "--format",
        "json",
    ])
    .await;
    assert_eq!(json["total"], "241666");
}

#[tokio::test]
async fn phi_compute_rejects_negative_input() {
    let output = run(&["phi", "compute", "--weights", "1,-2", "--values", "3,4"]).await;
    assert_eq!(output.status.code(), Some(5));
    assert!(String::from_utf8_lossy(&output.stderr).contains("negative"));
}

#[tokio::test]
async fn phi_compute_overflow_is_error_not_null() {
    let output = run(&[
        "phi", "compute", "--weights", "1e300,1e300", "--values", "1e300,1e300", "--format",
        "json",
    ])
    .await;
    assert_eq!(output.status.code(), Some(5));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("overflow"));
}

#[tokio::test]
async fn phi_compute_rejects_length_mismatch() {
    let output = run(&["phi", "compute", "--weights", "1,2", "--values", "3"]).await;
    assert_eq!(output.status.code(), Some(5));
}

#[tokio::test]
async fn phi_current_from_mock() {
    let json = run_json(&["phi", "current", "--source", "mock", "--format", "json"]).await;
    assert_eq!(json["phiTotal"], "241666");
    assert_eq!(json["source"], "mock");
    assert!(json["timestamp"].is_i64());
}

#[tokio::test]
async fn phi_current_defaults_to_mock_without_rpc_url() {
    let json = run_json(&["phi", "current", "--format", "json"]).await;
    assert_eq!(json["source"], "mock");
}

#[tokio::test]
async fn phi_details_from_mock() {
    let json = run_json(&["phi", "details", "--source", "mock", "--format", "json"]).await;
    assert_eq!(json["weights"], serde_json::json!(["100", "150", "200"]));
    assert_eq!(json["values"], serde_json::json!(["1000", "1500", "2000"]));
    assert_eq!(json["parameterCount"], 3);
    assert_eq!(json["total"], "241666");
    assert!((json["phi"]["deltaProtocol"].as_f64().unwrap() - 200.0).abs() < 1e-12);
}

// ============================================================================
// rarity
// ============================================================================

#[tokio::test]
async fn rarity_exact() {
    let json = run_json(&[
        "rarity", "--supply", "9", "--demand", "50", "--phi", "1500", "--exact", "--format",
        "json",
    ])
    .await;
    assert_eq!(json["rarityScore"], "75");
    assert_eq!(json["tier"], "Epic");
}

#[tokio::test]
async fn rarity_rejects_negative_supply() {
    let output = run(&["rarity", "--supply", "-1", "--demand", "1", "--phi", "1"]).await;
    assert_eq!(output.status.code(), Some(5));
}

// ============================================================================
// nft
// ============================================================================

#[tokio::test]
async fn nft_list_from_config_file() {
    let config = fixture_path("mock_source.yaml");
    let json = run_json(&[
        "--config",
        config.to_str().unwrap(),
        "nft",
        "list",
        "--format",
        "json",
    ])
    .await;
    assert_eq!(json["total"], 25);
    assert_eq!(json["nfts"].as_array().unwrap().len(), 25);
    assert_eq!(json["source"], "mock");
    assert_eq!(json["nfts"][4]["tokenId"], 4);
    assert_eq!(
        json["nfts"][4]["owner"],
        "0x0000000000000000000000000000000000000000"
    );
}

#[tokio::test]
async fn nft_get_is_deterministic_per_seed() {
    let config = fixture_path("mock_source.yaml");
    let args = [
        "--config",
        config.to_str().unwrap(),
        "nft",
        "get",
        "3",
        "--format",
        "json",
    ];
    assert_eq!(run_json(&args).await, run_json(&args).await);
}

#[tokio::test]
async fn nft_get_unknown_token_is_upstream_error() {
    let output = run(&["--source", "mock", "nft", "get", "999"]).await;
    assert_eq!(output.status.code(), Some(4));
    assert!(String::from_utf8_lossy(&output.stderr).contains("does not exist"));
}

#[tokio::test]
async fn nft_rarity_matches_formula() {
    let json = run_json(&["--source", "mock", "nft", "rarity", "2", "--format", "json"]).await;
    let supply: u64 = json["supply"].as_str().unwrap().parse().unwrap();
    let demand: u64 = json["demand"].as_str().unwrap().parse().unwrap();
    let phi: u64 = json["phiValue"].as_str().unwrap().parse().unwrap();
    let score: u64 = json["rarityScore"].as_str().unwrap().parse().unwrap();
    assert_eq!(score, demand * phi / (supply + 1) / 100);
    assert!(json["formula"].as_str().unwrap().contains("supply + 1"));
}

#[tokio::test]
async fn nft_distribution_has_every_tier() {
    let json = run_json(&["--source", "mock", "nft", "distribution", "--format", "json"]).await;
    let distribution = json["distribution"].as_object().unwrap();
    for tier in ["Common", "Uncommon", "Rare", "Epic", "Legendary"] {
        assert!(distribution.contains_key(tier), "missing {tier}");
    }
    let sum: u64 = distribution.values().map(|v| v.as_u64().unwrap()).sum();
    assert_eq!(sum, json["counted"].as_u64().unwrap());
    assert_eq!(json["counted"], json["total"]);
}

// ============================================================================
// particles / watch
// ============================================================================

#[tokio::test]
async fn particles_from_mock() {
    let json = run_json(&[
        "--source", "mock", "particles", "--count", "8", "--seed", "4", "--steps", "3",
        "--format", "json",
    ])
    .await;
    assert_eq!(json["particles"].as_array().unwrap().len(), 8);
    assert_eq!(json["ticks"], 3);
    assert_eq!(json["seed"], 4);
}

#[tokio::test]
async fn watch_samples_into_history() {
    let dir = tempfile::tempdir().unwrap();
    let events = dir.path().join("events.jsonl");
    let config = fixture_path("mock_source.yaml");

    let json = run_json(&[
        "--config",
        config.to_str().unwrap(),
        "watch",
        "--samples",
        "4",
        "--events-file",
        events.to_str().unwrap(),
        "--format",
        "json",
    ])
    .await;

    // Capacity 5, default limit 3.
    assert_eq!(json["count"], 3);
    assert!(json["history"].as_array().unwrap().iter().all(|e| e["source"] == "mock"));

    let lines: Vec<serde_json::Value> = std::fs::read_to_string(&events)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.first().unwrap()["type"], "WatchStarted");
    assert_eq!(lines.last().unwrap()["type"], "WatchStopped");
    assert_eq!(lines.last().unwrap()["reason"], "completed");
    let sampled = lines.iter().filter(|l| l["type"] == "PhiSampled").count();
    assert_eq!(sampled, 4);
}

// ============================================================================
// configuration errors
// ============================================================================

#[tokio::test]
async fn invalid_config_exits_with_config_code() {
    let config = fixture_path("invalid_history.yaml");
    let output = run(&["--config", config.to_str().unwrap(), "phi", "current"]).await;
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("history.capacity"));
}

#[tokio::test]
async fn missing_config_file_exits_with_config_code() {
    let output = run(&["--config", "/nonexistent/skynt-phi.yaml", "phi", "current"]).await;
    assert_eq!(output.status.code(), Some(2));
}

#[tokio::test]
async fn contract_without_rpc_url_fails_at_startup() {
    let config = fixture_path("contract_no_rpc.yaml");
    let output = run(&["--config", config.to_str().unwrap(), "phi", "current"]).await;
    assert_eq!(output.status.code(), Some(2));
}

#[tokio::test]
async fn config_path_from_environment() {
    let config = fixture_path("mock_source.yaml");
    let output = run_with_env(
        &["nft", "list", "--format", "json"],
        &[("SKYNT_PHI_CONFIG", config.to_str().unwrap())],
    )
    .await;
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["total"], 25);
}
