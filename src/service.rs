//! Φ service: source → engine → history.
//!
//! Every report names the [`Provenance`] of the data it was built from. When
//! the primary source fails with an upstream error and fallback is enabled,
//! the operation is answered by the mock source instead and labelled `mock`.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use ethereum_types::U256;
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::schema::AppConfig;
use crate::engine::{
    Particle, ParticleConfig, ParticleField, PhiParameterSet, PhiResult, RARITY_FORMULA,
    RarityDistribution, serialize_decimal, u256_to_f64,
};
use crate::error::{SkyntError, UpstreamError};
use crate::history::{HistoryEntry, PhiHistory};
use crate::observability::metrics;
use crate::observability::{Event, EventEmitter};
use crate::source::{DataSource, MockSource, Provenance, TokenMetadata, build_source};

/// Tokens returned by [`PhiService::tokens`].
pub const MAX_LISTED_TOKENS: u64 = 100;

/// Tokens counted by [`PhiService::distribution`].
pub const MAX_DISTRIBUTION_TOKENS: u64 = 1000;

/// Concurrent per-token fetches.
const TOKEN_FETCH_CONCURRENCY: usize = 8;

// ============================================================================
// Reports
// ============================================================================

/// Current Φ reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhiReading {
    /// Φ total.
    #[serde(serialize_with = "serialize_decimal")]
    pub phi_total: U256,
    /// When it was read.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    /// Where it came from.
    pub source: Provenance,
}

/// Parameter set plus the engine's derived metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhiDetails {
    /// Weights, values and eigen-coefficients.
    #[serde(flatten)]
    pub parameters: PhiParameterSet,
    /// Φ total as reported by the source.
    #[serde(serialize_with = "serialize_decimal")]
    pub total: U256,
    /// Number of parameters.
    pub parameter_count: usize,
    /// Engine result.
    pub phi: PhiResult,
    /// When it was read.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    /// Where it came from.
    pub source: Provenance,
}

/// Recent history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryReport {
    /// Entries, oldest first.
    pub history: Vec<HistoryEntry>,
    /// Number of entries returned.
    pub count: usize,
}

/// One token with its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenView {
    /// Token id.
    pub token_id: u64,
    /// Mint-time metadata.
    #[serde(flatten)]
    pub metadata: TokenMetadata,
    /// Owner address.
    pub owner: String,
    /// Where it came from.
    pub source: Provenance,
}

/// First tokens of the collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenList {
    /// Tokens that could be fetched, by id.
    pub nfts: Vec<TokenView>,
    /// Total supply reported by the source.
    pub total: u64,
    /// Where it came from.
    pub source: Provenance,
}

/// Rarity score of one token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RarityReport {
    /// Token id.
    pub token_id: u64,
    /// Score recomputed from the token's inputs.
    #[serde(serialize_with = "serialize_decimal")]
    pub rarity_score: U256,
    /// Score stored at mint.
    #[serde(serialize_with = "serialize_decimal")]
    pub rarity: U256,
    /// φ value at mint.
    #[serde(serialize_with = "serialize_decimal")]
    pub phi_value: U256,
    /// Supply at mint.
    #[serde(serialize_with = "serialize_decimal")]
    pub supply: U256,
    /// Demand at mint.
    #[serde(serialize_with = "serialize_decimal")]
    pub demand: U256,
    /// The formula used.
    pub formula: &'static str,
    /// Where it came from.
    pub source: Provenance,
}

/// Token count per tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistributionReport {
    /// Count per tier; every tier is present.
    pub distribution: RarityDistribution,
    /// Total supply reported by the source.
    pub total: u64,
    /// Tokens actually counted.
    pub counted: u64,
    /// Where it came from.
    pub source: Provenance,
}

/// Particle field built from live parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticlesReport {
    /// Particles after `ticks` steps.
    pub particles: Vec<Particle>,
    /// Steps simulated.
    pub ticks: u64,
    /// Canvas width.
    pub width: f64,
    /// Canvas height.
    pub height: f64,
    /// RNG seed.
    pub seed: u64,
    /// Where the parameters came from.
    pub source: Provenance,
}

// ============================================================================
// Service
// ============================================================================

/// Orchestrates the data source, the engine and the history buffer.
#[derive(Debug)]
pub struct PhiService {
    primary: Arc<dyn DataSource>,
    fallback: Option<Arc<dyn DataSource>>,
    history: PhiHistory,
    default_limit: usize,
    events: Option<Arc<EventEmitter>>,
}

impl PhiService {
    /// Creates a service over explicit sources.
    ///
    /// `fallback` answers operations the primary fails with an upstream error.
    #[must_use]
    pub fn new(
        primary: Arc<dyn DataSource>,
        fallback: Option<Arc<dyn DataSource>>,
        history: PhiHistory,
        default_limit: usize,
    ) -> Self {
        Self {
            primary,
            fallback,
            history,
            default_limit,
            events: None,
        }
    }

    /// Builds the service described by `config`.
    ///
    /// A mock fallback is attached only when fallback is enabled and the
    /// primary is not already the mock source.
    ///
    /// # Errors
    ///
    /// Propagates source selection failures from [`build_source`].
    pub fn from_config(config: &AppConfig) -> Result<Self, SkyntError> {
        let primary = build_source(&config.source, &config.mock)?;
        let fallback: Option<Arc<dyn DataSource>> =
            if config.source.fallback_to_mock && primary.provenance() != Provenance::Mock {
                Some(Arc::new(MockSource::new(&config.mock)?))
            } else {
                None
            };
        debug!(
            source = %primary.provenance(),
            fallback = fallback.is_some(),
            "data source selected"
        );
        Ok(Self::new(
            primary,
            fallback,
            PhiHistory::new(config.history.capacity),
            config.history.default_limit,
        ))
    }

    /// Emits `SourceFallback` events to `events`.
    #[must_use]
    pub fn with_events(mut self, events: Arc<EventEmitter>) -> Self {
        self.events = Some(events);
        self
    }

    /// Provenance of the primary source.
    #[must_use]
    pub fn primary_provenance(&self) -> Provenance {
        self.primary.provenance()
    }

    /// The history buffer.
    #[must_use]
    pub const fn history_store(&self) -> &PhiHistory {
        &self.history
    }

    /// Reads the current Φ total and records it in history.
    ///
    /// # Errors
    ///
    /// Returns [`SkyntError::Upstream`] if no source can answer.
    pub async fn current_phi(&self) -> Result<PhiReading, SkyntError> {
        let (total, source) = self
            .with_fallback("current_phi", |s| async move { s.phi_total().await })
            .await?;
        let timestamp = Utc::now();
        let provenance = source.provenance();

        self.history.record(HistoryEntry {
            value: total,
            timestamp,
            source: provenance,
        });
        metrics::record_reading(provenance, u256_to_f64(total), self.history.len());

        Ok(PhiReading {
            phi_total: total,
            timestamp,
            source: provenance,
        })
    }

    /// Reads the parameter set and runs the engine over it.
    ///
    /// # Errors
    ///
    /// Returns [`SkyntError::Upstream`] if no source can answer, or
    /// [`SkyntError::Phi`] if the parameters fail engine validation.
    pub async fn details(&self) -> Result<PhiDetails, SkyntError> {
        let (snapshot, source) = self
            .with_fallback("details", |s| async move { s.phi_parameters().await })
            .await?;
        let phi = snapshot.params.evaluate()?;
        metrics::set_delta_total(phi.delta_total);

        Ok(PhiDetails {
            parameter_count: snapshot.params.len(),
            parameters: snapshot.params,
            total: snapshot.total,
            phi,
            timestamp: Utc::now(),
            source: source.provenance(),
        })
    }

    /// Returns up to `limit` recent readings (the configured default when
    /// `None`).
    #[must_use]
    pub fn history(&self, limit: Option<usize>) -> HistoryReport {
        let history = self.history.recent(limit.unwrap_or(self.default_limit));
        HistoryReport {
            count: history.len(),
            history,
        }
    }

    /// Fetches one token and its owner.
    ///
    /// # Errors
    ///
    /// Returns [`SkyntError::Upstream`] if no source can answer.
    pub async fn token(&self, token_id: u64) -> Result<TokenView, SkyntError> {
        let (view, _) = self
            .with_fallback("token", move |s| async move { fetch_token(s, token_id).await })
            .await?;
        Ok(view)
    }

    /// Fetches the first [`MAX_LISTED_TOKENS`] tokens.
    ///
    /// Tokens that fail to load are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`SkyntError::Upstream`] if the total supply cannot be read.
    pub async fn tokens(&self) -> Result<TokenList, SkyntError> {
        let (total, source) = self
            .with_fallback("tokens", |s| async move { s.total_supply().await })
            .await?;
        let provenance = source.provenance();

        let nfts: Vec<TokenView> = stream::iter(0..total.min(MAX_LISTED_TOKENS))
            .map(|id| {
                let source = Arc::clone(&source);
                async move {
                    fetch_token(source, id)
                        .await
                        .inspect_err(|e| warn!(token_id = id, error = %e, "skipping token"))
                        .ok()
                }
            })
            .buffered(TOKEN_FETCH_CONCURRENCY)
            .filter_map(std::future::ready)
            .collect()
            .await;

        Ok(TokenList {
            nfts,
            total,
            source: provenance,
        })
    }

    /// Recomputes the rarity score of one token from its mint-time inputs.
    ///
    /// # Errors
    ///
    /// Returns [`SkyntError::Upstream`] if no source can answer, or
    /// [`SkyntError::Phi`] if the score overflows.
    pub async fn rarity(&self, token_id: u64) -> Result<RarityReport, SkyntError> {
        let (metadata, source) = self
            .with_fallback("rarity", move |s| async move { s.token_metadata(token_id).await })
            .await?;
        let rarity_score = metadata.rarity_input().score()?;

        Ok(RarityReport {
            token_id,
            rarity_score,
            rarity: metadata.rarity,
            phi_value: metadata.phi_value,
            supply: metadata.supply,
            demand: metadata.demand,
            formula: RARITY_FORMULA,
            source: source.provenance(),
        })
    }

    /// Counts the first [`MAX_DISTRIBUTION_TOKENS`] tokens per tier.
    ///
    /// Tokens whose tier cannot be read are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`SkyntError::Upstream`] if the total supply cannot be read.
    pub async fn distribution(&self) -> Result<DistributionReport, SkyntError> {
        let (total, source) = self
            .with_fallback("distribution", |s| async move { s.total_supply().await })
            .await?;
        let provenance = source.provenance();

        let distribution: RarityDistribution = stream::iter(0..total.min(MAX_DISTRIBUTION_TOKENS))
            .map(|id| {
                let source = Arc::clone(&source);
                async move {
                    source
                        .rarity_tier(id)
                        .await
                        .inspect_err(|e| warn!(token_id = id, error = %e, "skipping token"))
                        .ok()
                }
            })
            .buffered(TOKEN_FETCH_CONCURRENCY)
            .filter_map(std::future::ready)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect();

        Ok(DistributionReport {
            counted: distribution.total(),
            distribution,
            total,
            source: provenance,
        })
    }

    /// Builds a particle field from the current parameters and advances it
    /// `steps` ticks.
    ///
    /// # Errors
    ///
    /// Returns [`SkyntError::Upstream`] if no source can answer, or
    /// [`SkyntError::Phi`] if the parameters are unusable.
    pub async fn particles(
        &self,
        config: ParticleConfig,
        steps: u64,
    ) -> Result<ParticlesReport, SkyntError> {
        let (snapshot, source) = self
            .with_fallback("particles", |s| async move { s.phi_parameters().await })
            .await?;
        let (_, values, eigen) = snapshot.params.to_f64();

        let mut field = ParticleField::generate(&eigen, &values, config)?;
        field.advance(steps);

        Ok(ParticlesReport {
            particles: field.particles().to_vec(),
            ticks: field.ticks(),
            width: config.width,
            height: config.height,
            seed: config.seed,
            source: source.provenance(),
        })
    }

    /// Runs `op` against the primary source, retrying against the fallback
    /// on a recoverable upstream error. Returns the value and the source that
    /// produced it.
    async fn with_fallback<T, F, Fut>(
        &self,
        operation: &'static str,
        op: F,
    ) -> Result<(T, Arc<dyn DataSource>), SkyntError>
    where
        F: Fn(Arc<dyn DataSource>) -> Fut,
        Fut: Future<Output = Result<T, UpstreamError>>,
    {
        let started = Instant::now();
        let result = op(Arc::clone(&self.primary)).await;
        metrics::record_fetch_duration(operation, started.elapsed());

        let err = match result {
            Ok(value) => return Ok((value, Arc::clone(&self.primary))),
            Err(err) => err,
        };
        metrics::record_upstream_error(operation);

        let Some(fallback) = self.fallback.as_ref().filter(|_| is_recoverable(&err)) else {
            return Err(err.into());
        };

        warn!(operation, error = %err, "primary source failed, answering from mock data");
        metrics::record_fallback(operation);
        if let Some(events) = &self.events {
            events.emit(Event::SourceFallback {
                timestamp: Utc::now(),
                operation: operation.to_string(),
                error: err.to_string(),
            });
        }

        let value = op(Arc::clone(fallback)).await?;
        Ok((value, Arc::clone(fallback)))
    }
}

// A missing token is a definitive answer, not an outage.
const fn is_recoverable(err: &UpstreamError) -> bool {
    !matches!(err, UpstreamError::UnknownToken(_))
}

async fn fetch_token(source: Arc<dyn DataSource>, token_id: u64) -> Result<TokenView, UpstreamError> {
    let (metadata, owner) = tokio::try_join!(
        source.token_metadata(token_id),
        source.token_owner(token_id)
    )?;
    Ok(TokenView {
        token_id,
        metadata,
        owner,
        source: source.provenance(),
    })
}
