//! Shared integration-test harness: runs the `skynt-phi` binary and serves a
//! fake JSON-RPC node that answers the SKYNT contract calls.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use ethereum_types::U256;
use ethers::abi::{Token, encode};
use ethers::types::{Address, Bytes};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use skynt_phi::engine::RarityTier;
use skynt_phi::source::abi::Interface;

pub const ADMIN_ADDRESS: &str = "0x5fbdb2315678afecb367f032d93f642f64180aa3";
pub const NFT_ADDRESS: &str = "0xe7f1725e7734ce288f8367e1bb143e90bb3f0512";
pub const OWNER_ADDRESS: &str = "0xabababababababababababababababababababab";

/// Weights, values and eigen-coefficients served by [`FakeNode`].
pub const NODE_WEIGHTS: [u64; 2] = [10, 20];
pub const NODE_VALUES: [u64; 2] = [30, 40];
pub const NODE_EIGEN: [u64; 2] = [4, 8];
/// `(10*30 + 20*40) / 2`
pub const NODE_PHI_TOTAL: u64 = 550;
/// φ value of every token served by [`FakeNode`].
pub const NODE_TOKEN_PHI: u64 = 1500;
/// Demand of every token served by [`FakeNode`].
pub const NODE_TOKEN_DEMAND: u64 = 50;

// ============================================================================
// Binary
// ============================================================================

/// Path of a file under `tests/fixtures`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn command(args: &[&str]) -> tokio::process::Command {
    let bin = env!("CARGO_BIN_EXE_skynt-phi");
    let mut cmd = tokio::process::Command::new(bin);
    cmd.args(args)
        .arg("--quiet")
        .env_remove("RPC_URL")
        .env_remove("SKYNT_PHI_CONFIG")
        .env_remove("SKYNT_PHI_SOURCE")
        .env_remove("SKYNT_PHI_DEPLOYMENT")
        .env_remove("SKYNT_PHI_LOG_LEVEL")
        .kill_on_drop(true);
    cmd
}

/// Runs the binary to completion.
#[allow(clippy::missing_panics_doc)]
pub async fn run(args: &[&str]) -> Output {
    command(args)
        .output()
        .await
        .expect("failed to spawn skynt-phi")
}

/// Runs the binary with extra environment variables.
#[allow(clippy::missing_panics_doc)]
pub async fn run_with_env(args: &[&str], env: &[(&str, &str)]) -> Output {
    let mut cmd = command(args);
    for (key, value) in env {
        cmd.env(key, value);
    }
    cmd.output().await.expect("failed to spawn skynt-phi")
}

/// Runs the binary, asserts success and parses stdout as JSON.
#[allow(clippy::missing_panics_doc)]
pub async fn run_json(args: &[&str]) -> Value {
    let output = run(args).await;
    assert!(
        output.status.success(),
        "skynt-phi {args:?} failed ({:?}): {}",
        output.status.code(),
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "stdout is not JSON ({e}): {}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

// ============================================================================
// Deployment record
// ============================================================================

/// Writes a deployment record naming both contracts.
#[allow(clippy::missing_panics_doc)]
pub fn write_deployment(dir: &Path) -> PathBuf {
    let path = dir.join("deployed_admin.json");
    let record = json!({
        "network": "localhost",
        "contracts": {
            "Admin": { "address": ADMIN_ADDRESS },
            "SKYNTLaunchNFT": { "address": NFT_ADDRESS }
        }
    });
    std::fs::write(&path, record.to_string()).expect("write deployment record");
    path
}

// ============================================================================
// Fake node
// ============================================================================

/// In-process JSON-RPC node answering `eth_call` by selector.
///
/// Token `i` has `supply = i`, so its score is `750 / (i + 1)`.
pub struct FakeNode {
    addr: SocketAddr,
    state: Arc<NodeState>,
    cancel: CancellationToken,
}

struct NodeState {
    token_count: u64,
    calls: AtomicUsize,
}

impl FakeNode {
    /// Starts a node serving `token_count` tokens on an ephemeral port.
    #[allow(clippy::missing_panics_doc)]
    pub async fn start(token_count: u64) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local_addr");
        let state = Arc::new(NodeState {
            token_count,
            calls: AtomicUsize::new(0),
        });
        let cancel = CancellationToken::new();

        let router = Router::new()
            .route("/", post(handle))
            .with_state(Arc::clone(&state));
        let server_cancel = cancel.clone();
        tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move { server_cancel.cancelled().await })
                .await
                .ok();
        });

        Self {
            addr,
            state,
            cancel,
        }
    }

    /// `http://` URL of the node.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// `eth_call` requests served so far.
    pub fn calls(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }
}

impl Drop for FakeNode {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn handle(State(state): State<Arc<NodeState>>, Json(request): Json<Value>) -> Json<Value> {
    state.calls.fetch_add(1, Ordering::SeqCst);
    let id = request["id"].clone();
    let call = &request["params"][0];
    let to = call["to"].as_str().unwrap_or_default().to_lowercase();
    let data = call["data"]
        .as_str()
        .or_else(|| call["input"].as_str())
        .and_then(|d| d.parse::<Bytes>().ok())
        .unwrap_or_default();

    match answer(&state, &to, &data) {
        Some(bytes) => Json(json!({ "jsonrpc": "2.0", "id": id, "result": Bytes::from(bytes) })),
        None => Json(json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": 3, "message": "execution reverted" }
        })),
    }
}

fn answer(state: &NodeState, to: &str, data: &[u8]) -> Option<Vec<u8>> {
    let selector = data.get(..4)?;
    let interface = if to == ADMIN_ADDRESS {
        Interface::admin().ok()?
    } else if to == NFT_ADDRESS {
        Interface::nft().ok()?
    } else {
        return None;
    };
    let called = |name: &str| {
        interface
            .function(name)
            .is_ok_and(|f| f.short_signature() == selector)
    };
    let token_arg = |name: &str| -> Option<u64> {
        let args = interface.function(name).ok()?.decode_input(&data[4..]).ok()?;
        match args.first()? {
            Token::Uint(id) if *id < U256::from(state.token_count) => Some(id.low_u64()),
            _ => None,
        }
    };

    if called("computePhi") {
        return Some(encode(&[uint(NODE_PHI_TOTAL)]));
    }
    if called("getPhiDetails") {
        let array = |xs: &[u64]| Token::Array(xs.iter().copied().map(uint).collect());
        return Some(encode(&[
            array(&NODE_WEIGHTS),
            array(&NODE_VALUES),
            array(&NODE_EIGEN),
            uint(NODE_PHI_TOTAL),
        ]));
    }
    if called("totalSupply") {
        return Some(encode(&[uint(state.token_count)]));
    }
    if called("getMetadata") {
        let token = token_arg("getMetadata")?;
        let score = token_score(token);
        return Some(encode(&[
            uint(score),
            uint(NODE_TOKEN_PHI),
            uint(1_700_000_000 + token),
            uint(token),
            uint(NODE_TOKEN_DEMAND),
            Token::String(tier_name(score).into()),
        ]));
    }
    if called("ownerOf") {
        token_arg("ownerOf")?;
        let owner: Address = OWNER_ADDRESS.parse().ok()?;
        return Some(encode(&[Token::Address(owner)]));
    }
    if called("getRarityTier") {
        let token = token_arg("getRarityTier")?;
        return Some(encode(&[Token::String(tier_name(token_score(token)).into())]));
    }
    None
}

/// Rarity score of token `id` on the fake node.
pub const fn token_score(id: u64) -> u64 {
    NODE_TOKEN_DEMAND * NODE_TOKEN_PHI / (id + 1) / 100
}

fn tier_name(score: u64) -> &'static str {
    RarityTier::from_score(score.into()).as_str()
}

fn uint(value: u64) -> Token {
    Token::Uint(U256::from(value))
}
