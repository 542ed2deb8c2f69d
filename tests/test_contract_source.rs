//! Contract source against an in-process JSON-RPC node.

mod common;

use std::sync::Arc;
use std::time::Duration;

use ethereum_types::U256;

use common::{
    FakeNode, NODE_EIGEN, NODE_PHI_TOTAL, NODE_TOKEN_DEMAND, NODE_TOKEN_PHI, NODE_VALUES,
    NODE_WEIGHTS, OWNER_ADDRESS, run, run_json, token_score, write_deployment,
};
use skynt_phi::config::schema::MockConfig;
use skynt_phi::engine::RarityTier;
use skynt_phi::error::{SkyntError, UpstreamError};
use skynt_phi::history::PhiHistory;
use skynt_phi::service::PhiService;
use skynt_phi::source::{ContractSource, DataSource, Deployment, MockSource, Provenance, RpcClient};

fn contract_source(url: &str, dir: &std::path::Path) -> ContractSource {
    let deployment = Deployment::load(&write_deployment(dir)).unwrap();
    let rpc = RpcClient::new(url, Duration::from_secs(2)).unwrap();
    ContractSource::new(rpc, &deployment).unwrap()
}

#[tokio::test]
async fn reads_phi_total_and_parameters() {
    let node = FakeNode::start(3).await;
    let dir = tempfile::tempdir().unwrap();
    let source = contract_source(&node.url(), dir.path());

    assert_eq!(source.phi_total().await.unwrap(), U256::from(NODE_PHI_TOTAL));

    let snapshot = source.phi_parameters().await.unwrap();
    let as_u256 = |xs: &[u64]| xs.iter().copied().map(U256::from).collect::<Vec<_>>();
    assert_eq!(snapshot.params.weights(), as_u256(&NODE_WEIGHTS).as_slice());
    assert_eq!(snapshot.params.values(), as_u256(&NODE_VALUES).as_slice());
    assert_eq!(snapshot.params.eigen_vectors(), as_u256(&NODE_EIGEN).as_slice());
    assert_eq!(snapshot.total, snapshot.params.exact_total().unwrap());
    assert_eq!(node.calls(), 2);
}

#[tokio::test]
async fn reads_token_metadata_owner_and_tier() {
    let node = FakeNode::start(3).await;
    let dir = tempfile::tempdir().unwrap();
    let source = contract_source(&node.url(), dir.path());

    assert_eq!(source.total_supply().await.unwrap(), 3);

    let meta = source.token_metadata(1).await.unwrap();
    assert_eq!(meta.supply, U256::one());
    assert_eq!(meta.demand, U256::from(NODE_TOKEN_DEMAND));
    assert_eq!(meta.phi_value, U256::from(NODE_TOKEN_PHI));
    assert_eq!(meta.rarity, U256::from(token_score(1)));
    assert_eq!(meta.rarity_input().score().unwrap(), meta.rarity);

    assert_eq!(source.token_owner(1).await.unwrap(), OWNER_ADDRESS);
    assert_eq!(
        source.rarity_tier(1).await.unwrap(),
        RarityTier::from_score(U256::from(token_score(1)))
    );
}

#[tokio::test]
async fn reverted_token_call_is_unknown_token() {
    let node = FakeNode::start(3).await;
    let dir = tempfile::tempdir().unwrap();
    let source = contract_source(&node.url(), dir.path());

    let err = source.token_metadata(99).await.unwrap_err();
    assert!(matches!(err, UpstreamError::UnknownToken(99)), "{err:?}");
    let err = source.token_owner(3).await.unwrap_err();
    assert!(matches!(err, UpstreamError::UnknownToken(3)), "{err:?}");
    let err = source.rarity_tier(7).await.unwrap_err();
    assert!(matches!(err, UpstreamError::UnknownToken(7)), "{err:?}");
}

#[tokio::test]
async fn unminted_token_is_not_answered_from_mock() {
    let node = FakeNode::start(3).await;
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(contract_source(&node.url(), dir.path()));
    let fallback: Arc<dyn DataSource> = Arc::new(MockSource::new(&MockConfig::default()).unwrap());
    let service = PhiService::new(source, Some(fallback), PhiHistory::default(), 50);

    let err = service.token(5).await.unwrap_err();
    assert!(
        matches!(err, SkyntError::Upstream(UpstreamError::UnknownToken(5))),
        "{err:?}"
    );
    let err = service.rarity(7).await.unwrap_err();
    assert!(
        matches!(err, SkyntError::Upstream(UpstreamError::UnknownToken(7))),
        "{err:?}"
    );

    // Minted tokens are still read from the contract.
    let token = service.token(2).await.unwrap();
    assert_eq!(token.source, Provenance::Contract);
}

#[tokio::test]
async fn service_reports_contract_provenance() {
    let node = FakeNode::start(4).await;
    let dir = tempfile::tempdir().unwrap();
    let source = Arc::new(contract_source(&node.url(), dir.path()));
    let service = PhiService::new(source, None, PhiHistory::default(), 50);

    let reading = service.current_phi().await.unwrap();
    assert_eq!(reading.source, Provenance::Contract);
    assert_eq!(reading.phi_total, U256::from(NODE_PHI_TOTAL));

    let list = service.tokens().await.unwrap();
    assert_eq!(list.total, 4);
    assert_eq!(list.nfts.len(), 4);
    assert!(list.nfts.iter().all(|t| t.source == Provenance::Contract));

    let distribution = service.distribution().await.unwrap();
    assert_eq!(distribution.counted, 4);
}

#[tokio::test]
async fn unreachable_node_falls_back_to_mock() {
    let dir = tempfile::tempdir().unwrap();
    // Port 9 (discard) is closed on test hosts; the connection is refused.
    let source = Arc::new(contract_source("http://127.0.0.1:9", dir.path()));
    let fallback: Arc<dyn DataSource> = Arc::new(MockSource::new(&MockConfig::default()).unwrap());

    let service = PhiService::new(source.clone(), Some(fallback), PhiHistory::default(), 50);
    let reading = service.current_phi().await.unwrap();
    assert_eq!(reading.source, Provenance::Mock);

    let strict = PhiService::new(source, None, PhiHistory::default(), 50);
    let err = strict.current_phi().await.unwrap_err();
    assert!(matches!(err, SkyntError::Upstream(UpstreamError::Unavailable(_))));
    assert_eq!(err.exit_code(), 4);
}

// ============================================================================
// Binary
// ============================================================================

#[tokio::test]
async fn cli_reads_from_contract() {
    let node = FakeNode::start(2).await;
    let dir = tempfile::tempdir().unwrap();
    let deployment = write_deployment(dir.path());
    let url = node.url();

    let json = run_json(&[
        "--source",
        "contract",
        "--rpc-url",
        &url,
        "--deployment",
        deployment.to_str().unwrap(),
        "phi",
        "details",
        "--format",
        "json",
    ])
    .await;
    assert_eq!(json["source"], "contract");
    assert_eq!(json["total"], NODE_PHI_TOTAL.to_string());
    assert_eq!(json["parameterCount"], 2);

    let json = run_json(&[
        "--source",
        "contract",
        "--rpc-url",
        &url,
        "--deployment",
        deployment.to_str().unwrap(),
        "nft",
        "get",
        "0",
        "--format",
        "json",
    ])
    .await;
    assert_eq!(json["owner"], OWNER_ADDRESS);
    assert_eq!(json["rarity"], token_score(0).to_string());
}

#[tokio::test]
async fn cli_unminted_token_fails_despite_fallback() {
    let node = FakeNode::start(2).await;
    let dir = tempfile::tempdir().unwrap();
    let deployment = write_deployment(dir.path());
    let url = node.url();

    let output = run(&[
        "--source",
        "contract",
        "--rpc-url",
        &url,
        "--deployment",
        deployment.to_str().unwrap(),
        "nft",
        "get",
        "5",
        "--format",
        "json",
    ])
    .await;
    assert_eq!(output.status.code(), Some(4));
    assert!(output.stdout.is_empty());
}

#[tokio::test]
async fn cli_falls_back_unless_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let deployment = write_deployment(dir.path());
    let base = [
        "--source",
        "contract",
        "--rpc-url",
        "http://127.0.0.1:9",
        "--deployment",
        deployment.to_str().unwrap(),
    ];

    let mut args = base.to_vec();
    args.extend(["phi", "current", "--format", "json"]);
    let json = run_json(&args).await;
    assert_eq!(json["source"], "mock");

    let mut args = base.to_vec();
    args.extend(["--no-fallback", "phi", "current"]);
    let output = run(&args).await;
    assert_eq!(output.status.code(), Some(4));
}

#[tokio::test]
async fn cli_missing_deployment_is_config_error() {
    let output = run(&[
        "--source",
        "contract",
        "--rpc-url",
        "http://127.0.0.1:9",
        "--deployment",
        "/nonexistent/deployed_admin.json",
        "phi",
        "current",
    ])
    .await;
    assert_eq!(output.status.code(), Some(2));
}

#[tokio::test]
async fn config_file_env_substitution_selects_node() {
    let node = FakeNode::start(1).await;
    let dir = tempfile::tempdir().unwrap();
    let deployment = write_deployment(dir.path());
    let config = common::fixture_path("env_rpc.yaml");
    let url = node.url();

    let output = common::run_with_env(
        &["--config", config.to_str().unwrap(), "phi", "current", "--format", "json"],
        &[
            ("SKYNT_PHI_TEST_RPC_URL", url.as_str()),
            ("SKYNT_PHI_TEST_DEPLOYMENT", deployment.to_str().unwrap()),
        ],
    )
    .await;
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["source"], "contract");

    let output = run(&["--config", config.to_str().unwrap(), "phi", "current"]).await;
    assert_eq!(output.status.code(), Some(2));
}
