//! Structured event stream.
//!
//! Discrete, typed events emitted while `watch` runs. Events are serialized
//! as newline-delimited JSON (JSONL) and carry a monotonically increasing
//! sequence number.

use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::source::Provenance;

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// Why a watch run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The requested number of samples was taken.
    Completed,
    /// Interrupted by SIGINT.
    Interrupted,
    /// Terminated by SIGTERM.
    Terminated,
}

/// Summary emitted when a watch run stops.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WatchSummary {
    /// Successful samples.
    pub samples: u64,
    /// Samples that failed outright.
    pub failures: u64,
    /// Samples served by the mock fallback.
    pub fallbacks: u64,
    /// Wall-clock run time in seconds.
    pub uptime_secs: f64,
}

impl std::fmt::Display for WatchSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "samples={} failures={} fallbacks={} uptime={:.1}s",
            self.samples, self.failures, self.fallbacks, self.uptime_secs,
        )
    }
}

// ---------------------------------------------------------------------------
// Event variants
// ---------------------------------------------------------------------------

/// A discrete event, tagged with `"type"` when serialized.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    /// Sampling started.
    WatchStarted {
        /// When sampling started.
        timestamp: DateTime<Utc>,
        /// Unique id of this run.
        run_id: String,
        /// Provenance of the primary source.
        source: Provenance,
        /// Sampling interval in milliseconds.
        interval_ms: u64,
    },

    /// A Φ reading was taken and recorded.
    PhiSampled {
        /// When the reading was taken.
        timestamp: DateTime<Utc>,
        /// One-based sample number.
        sample: u64,
        /// Φ total as a decimal string.
        value: String,
        /// `ΔS_total` of the current parameter set.
        delta_total: f64,
        /// Where the reading came from.
        source: Provenance,
        /// History length after recording.
        history_len: usize,
    },

    /// The primary source failed and the mock source answered instead.
    SourceFallback {
        /// When the fallback happened.
        timestamp: DateTime<Utc>,
        /// Service operation that fell back.
        operation: String,
        /// The upstream failure.
        error: String,
    },

    /// A sample could not be taken at all.
    SampleFailed {
        /// When the sample failed.
        timestamp: DateTime<Utc>,
        /// One-based sample number.
        sample: u64,
        /// The failure.
        error: String,
    },

    /// Sampling stopped.
    WatchStopped {
        /// When sampling stopped.
        timestamp: DateTime<Utc>,
        /// Why it stopped.
        reason: StopReason,
        /// Run statistics.
        summary: WatchSummary,
    },
}

// ---------------------------------------------------------------------------
// Envelope (adds sequence number via serde flatten)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct EventEnvelope {
    sequence: u64,
    #[serde(flatten)]
    event: Event,
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// Thread-safe, buffered JSONL event writer.
///
/// Serialization or I/O failures are dropped; the event stream never aborts
/// sampling.
pub struct EventEmitter {
    writer: Mutex<BufWriter<Box<dyn Write + Send>>>,
    sequence: AtomicU64,
}

// Box<dyn Write> is not Debug
impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("sequence", &self.sequence.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl EventEmitter {
    /// Creates an emitter that writes to the given writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
            sequence: AtomicU64::new(0),
        }
    }

    /// Creates an emitter that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Creates an emitter that discards all events.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(Box::new(std::io::sink()))
    }

    /// Creates an emitter that writes to a file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::new(Box::new(file)))
    }

    /// Emits an event as a single JSONL line.
    pub fn emit(&self, event: Event) {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let envelope = EventEnvelope {
            sequence: seq,
            event,
        };

        if let Ok(mut w) = self.writer.lock() {
            if let Ok(line) = serde_json::to_string(&envelope) {
                let _ = writeln!(w, "{line}");
                let _ = w.flush();
            }
        }
    }

    /// Number of events emitted so far.
    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }
}
