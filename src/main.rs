//! `skynt-phi` - Φ scoring engine and on-chain parameter reader

use clap::Parser;
use tokio::signal::unix::{SignalKind, signal};

use skynt_phi::cli::Shutdown;
use skynt_phi::cli::args::Cli;
use skynt_phi::cli::commands;
use skynt_phi::error::ExitCode;
use skynt_phi::observability::{StopReason, init_logging};

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() {
                ExitCode::USAGE_ERROR
            } else {
                ExitCode::SUCCESS
            };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    if !cli.quiet {
        init_logging(cli.log_format, cli.verbose, cli.color);
    }

    let shutdown = Shutdown::new();
    tokio::spawn(handle_signals(shutdown.clone()));

    let result = commands::dispatch(cli, shutdown.clone()).await;

    match result {
        Ok(()) => std::process::exit(shutdown.exit_code().unwrap_or(ExitCode::SUCCESS)),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}

/// First SIGINT/SIGTERM stops gracefully; a second one exits immediately.
async fn handle_signals(shutdown: Shutdown) {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => Some(s),
        Err(e) => {
            tracing::warn!(error = %e, "failed to register SIGTERM handler");
            None
        }
    };

    let reason = tokio::select! {
        _ = tokio::signal::ctrl_c() => StopReason::Interrupted,
        Some(()) = recv(sigterm.as_mut()) => StopReason::Terminated,
    };

    eprintln!("\nShutting down gracefully... (press Ctrl+C again to force)");
    shutdown.trigger(reason);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => std::process::exit(ExitCode::INTERRUPTED),
        Some(()) = recv(sigterm.as_mut()) => std::process::exit(ExitCode::TERMINATED),
    }
}

async fn recv(sigterm: Option<&mut tokio::signal::unix::Signal>) -> Option<()> {
    match sigterm {
        Some(s) => s.recv().await,
        None => std::future::pending().await,
    }
}
