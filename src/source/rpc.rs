//! JSON-RPC `eth_call` client.
//!
//! Wraps an [`ethers`] HTTP provider. The underlying HTTP client does not
//! follow redirects and every call is bounded by the configured timeout.

use std::time::Duration;

use ethers::providers::{Http, Middleware, Provider, ProviderError, RpcError};
use ethers::types::transaction::eip2718::TypedTransaction;
use ethers::types::{Address, Bytes, TransactionRequest};
use reqwest::{Url, redirect};
use tracing::debug;

use crate::error::UpstreamError;

/// HTTP JSON-RPC client for read-only contract calls.
#[derive(Debug)]
pub struct RpcClient {
    provider: Provider<Http>,
    url: String,
    timeout: Duration,
}

impl RpcClient {
    /// Creates a client for `url`.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Unavailable`] if the URL does not parse or the
    /// HTTP client cannot be built.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, UpstreamError> {
        let url = url.into();
        let parsed = Url::parse(&url)
            .map_err(|e| UpstreamError::Unavailable(format!("invalid RPC URL '{url}': {e}")))?;
        let http = reqwest::Client::builder()
            .redirect(redirect::Policy::none())
            .timeout(timeout)
            .build()
            .map_err(|e| UpstreamError::Unavailable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            provider: Provider::new(Http::new_with_client(parsed, http)),
            url,
            timeout,
        })
    }

    /// Node URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Executes `eth_call` against `to` at the latest block and returns the
    /// raw return data.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Unavailable`] on network failure or timeout,
    /// [`UpstreamError::Rpc`] when the node reports an error (including
    /// reverts), and [`UpstreamError::Malformed`] when the response is not
    /// valid JSON-RPC.
    pub async fn eth_call(&self, to: Address, data: Vec<u8>) -> Result<Bytes, UpstreamError> {
        let tx: TypedTransaction = TransactionRequest::new().to(to).data(data).into();
        debug!(url = %self.url, to = ?to, "eth_call");

        tokio::time::timeout(self.timeout, self.provider.call(&tx, None))
            .await
            .map_err(|_| timed_out(self.timeout))?
            .map_err(classify)
    }
}

fn timed_out(timeout: Duration) -> UpstreamError {
    UpstreamError::Unavailable(format!(
        "request timed out after {}",
        humantime::format_duration(timeout)
    ))
}

fn classify(err: ProviderError) -> UpstreamError {
    if let Some(rpc) = err.as_error_response() {
        return UpstreamError::Rpc {
            code: rpc.code,
            message: rpc.message.clone(),
        };
    }
    if err.as_serde_error().is_some() {
        return UpstreamError::Malformed(err.to_string());
    }
    UpstreamError::Unavailable(err.to_string())
}
