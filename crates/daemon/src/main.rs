// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dalston Orchestrator Daemon (dalstond)
//!
//! Controller process that owns the event loop and the leader-gated
//! stale scan. Stateless between events: any number of controllers can
//! run against the same Postgres/Redis pair, coordinated only by the CAS
//! guards and the leader lease.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use dalston_daemon::{lifecycle, Config, LifecycleError};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("dalstond {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("dalstond {}", env!("CARGO_PKG_VERSION"));
                println!("Dalston orchestrator daemon - turns submitted jobs into task DAGs");
                println!("and drives them to completion across engine workers.");
                println!();
                println!("USAGE:");
                println!("    dalstond");
                println!();
                println!("Configuration is environment-driven; see DALSTON_* variables.");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: dalstond [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = Config::load()?;
    if let Some(log_path) = &config.log_path {
        rotate_log_if_needed(log_path);
    }
    let _log_guard = setup_logging(&config)?;

    info!(version = env!("CARGO_PKG_VERSION"), "starting dalstond");

    let mut daemon = match lifecycle::startup(&config).await {
        Ok(daemon) => daemon,
        Err(err) => {
            error!("failed to start daemon: {err}");
            return Err(err.into());
        }
    };

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    // NOTE: interval must live outside the loop — tokio::select!
    // re-evaluates branches each iteration, so constructing it inside
    // would reset the scan cadence on every event.
    let mut scan_tick = tokio::time::interval(config.knobs.scanner_interval);

    info!("daemon ready, processing events");

    loop {
        tokio::select! {
            event = daemon.subscriber.recv() => {
                match event {
                    Some(event) => {
                        let kind = event.kind();
                        let job_id = event.job_id().clone();
                        if let Err(err) = daemon.runtime.handle_event(event).await {
                            // Handler errors must not kill the loop. The
                            // job's stuck work is bounded by the scanner's
                            // timeout enforcement, so log and move on.
                            error!(kind, job_id = %job_id, "error processing event: {err}");
                        }
                    }
                    None => {
                        error!("event subscription closed, shutting down");
                        break;
                    }
                }
            }

            _ = scan_tick.tick() => {
                match daemon.scanner.tick().await {
                    Ok(true) => {}
                    Ok(false) => {} // not the leader this round
                    Err(err) => error!("stale scan failed: {err}"),
                }
            }

            _ = sigterm.recv() => {
                info!("received SIGTERM, shutting down");
                break;
            }

            _ = sigint.recv() => {
                info!("received SIGINT, shutting down");
                break;
            }
        }
    }

    info!("daemon stopped");
    Ok(())
}

/// Maximum log file size before rotation (10 MB).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated log files to keep (dalstond.log.1, .2, .3).
const MAX_ROTATED_LOGS: u32 = 3;

/// Rotate the daemon log file if it exceeds [`MAX_LOG_SIZE`].
///
/// Shifts `dalstond.log` → `dalstond.log.1` → `.2` → `.3`, deleting the
/// oldest. Best-effort: rotation failures never block startup.
fn rotate_log_if_needed(log_path: &std::path::Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };

    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();

    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }

    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

fn setup_logging(
    config: &Config,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match &config.log_path {
        Some(log_path) => {
            if let Some(parent) = log_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let directory = log_path
                .parent()
                .map(std::path::Path::to_path_buf)
                .unwrap_or_else(|| std::path::PathBuf::from("."));
            let file_name = log_path
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_else(|| "dalstond.log".to_string());
            let file_appender = tracing_appender::rolling::never(directory, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(non_blocking))
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
            Ok(None)
        }
    }
}
