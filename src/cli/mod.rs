//! Command-line interface.

pub mod args;
pub mod commands;

use std::sync::{Arc, OnceLock};

use tokio_util::sync::CancellationToken;

use crate::error::ExitCode;
use crate::observability::StopReason;

/// Shutdown signal shared between the signal handler and running commands.
///
/// The first [`trigger`](Self::trigger) wins; its reason decides the exit
/// code once the command has wound down.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    token: CancellationToken,
    reason: Arc<OnceLock<StopReason>>,
}

impl Shutdown {
    /// Creates an untriggered shutdown handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests shutdown.
    pub fn trigger(&self, reason: StopReason) {
        let _ = self.reason.set(reason);
        self.token.cancel();
    }

    /// Resolves once shutdown has been requested.
    pub async fn cancelled(&self) -> StopReason {
        self.token.cancelled().await;
        self.reason().unwrap_or(StopReason::Interrupted)
    }

    /// Why shutdown was requested, if it was.
    #[must_use]
    pub fn reason(&self) -> Option<StopReason> {
        self.reason.get().copied()
    }

    /// Exit code implied by the shutdown reason.
    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        self.reason().and_then(|reason| match reason {
            StopReason::Completed => None,
            StopReason::Interrupted => Some(ExitCode::INTERRUPTED),
            StopReason::Terminated => Some(ExitCode::TERMINATED),
        })
    }
}
