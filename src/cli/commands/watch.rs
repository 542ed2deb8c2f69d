//! `watch`: periodic Φ sampling into the history buffer.
//!
//! Each tick reads Φ and the parameter set, records the reading and emits a
//! `PhiSampled` event. Failed samples are counted and sampling continues.
//! On exit the recent history and a run summary are printed.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::time::MissedTickBehavior;

use crate::cli::Shutdown;
use crate::cli::args::{OutputFormat, WatchArgs};
use crate::config::schema::AppConfig;
use crate::error::SkyntError;
use crate::observability::{Event, EventEmitter, StopReason, WatchSummary, init_metrics};
use crate::service::PhiService;
use crate::source::Provenance;

use super::emit;

/// Samples Φ until `--samples` readings were attempted or shutdown fires.
///
/// # Errors
///
/// Returns an error if the interval is zero, the event file or metrics
/// listener cannot be opened, or the source cannot be built. Individual
/// sample failures are not errors.
pub async fn run(config: &AppConfig, args: &WatchArgs, shutdown: &Shutdown) -> Result<(), SkyntError> {
    let interval = args.interval.unwrap_or(config.watch.interval);
    if interval.is_zero() {
        return Err(SkyntError::Usage("--interval must be greater than zero".into()));
    }

    if let Some(port) = args.metrics_port {
        init_metrics(port)?;
    }

    let events = Arc::new(match &args.events_file {
        Some(path) => EventEmitter::from_file(path)?,
        None => EventEmitter::stderr(),
    });

    let service = PhiService::from_config(config)?.with_events(Arc::clone(&events));
    let run_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(%run_id, source = %service.primary_provenance(), ?interval, "watch started");

    events.emit(Event::WatchStarted {
        timestamp: Utc::now(),
        run_id,
        source: service.primary_provenance(),
        interval_ms: u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
    });

    let started = Instant::now();
    let (reason, mut summary) = sample_loop(&service, &events, interval, args.samples, shutdown).await;
    summary.uptime_secs = started.elapsed().as_secs_f64();

    tracing::info!(?reason, %summary, "watch stopped");
    events.emit(Event::WatchStopped {
        timestamp: Utc::now(),
        reason,
        summary: summary.clone(),
    });

    let history = service.history(args.history_limit);
    emit(args.format, &history, |h| {
        for entry in &h.history {
            println!(
                "{}  Φ={}  ({})",
                entry.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
                entry.value,
                entry.source
            );
        }
    })?;
    if args.format == OutputFormat::Human {
        println!("{summary}");
    }
    Ok(())
}

async fn sample_loop(
    service: &PhiService,
    events: &EventEmitter,
    interval: Duration,
    limit: Option<u64>,
    shutdown: &Shutdown,
) -> (StopReason, WatchSummary) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut summary = WatchSummary::default();
    let mut attempted: u64 = 0;

    loop {
        if limit.is_some_and(|limit| attempted >= limit) {
            return (StopReason::Completed, summary);
        }

        tokio::select! {
            biased;
            reason = shutdown.cancelled() => return (reason, summary),
            _ = ticker.tick() => {}
        }

        attempted += 1;
        sample_once(service, events, attempted, &mut summary).await;
    }
}

async fn sample_once(
    service: &PhiService,
    events: &EventEmitter,
    sample: u64,
    summary: &mut WatchSummary,
) {
    let result = async {
        let reading = service.current_phi().await?;
        let details = service.details().await?;
        Ok::<_, SkyntError>((reading, details))
    }
    .await;

    match result {
        Ok((reading, details)) => {
            summary.samples += 1;
            if reading.source == Provenance::Mock && service.primary_provenance() != Provenance::Mock
            {
                summary.fallbacks += 1;
            }
            tracing::debug!(sample, value = %reading.phi_total, source = %reading.source, "sampled");
            events.emit(Event::PhiSampled {
                timestamp: reading.timestamp,
                sample,
                value: reading.phi_total.to_string(),
                delta_total: details.phi.delta_total,
                source: reading.source,
                history_len: service.history_store().len(),
            });
        }
        Err(e) => {
            summary.failures += 1;
            tracing::warn!(sample, error = %e, "sample failed");
            events.emit(Event::SampleFailed {
                timestamp: Utc::now(),
                sample,
                error: e.to_string(),
            });
        }
    }
}
