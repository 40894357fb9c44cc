use anyhow::Result;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError};

use rollcall::config::Config;
use rollcall::connectivity::spawn_probe_loop;
use rollcall::sync::SyncEvent;

use super::scan::report;
use super::App;

/// Long-running capture loop fed by stdin
///
/// Stops on EOF or Ctrl-C. Connectivity is probed in the background and
/// the queue is drained on every offline to online transition.
pub async fn watch(config: Config) -> Result<()> {
    let app = App::init(config).await?;
    let orchestrator = Arc::clone(&app.orchestrator);
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let probe_handle = spawn_probe_loop(
        orchestrator.monitor().clone(),
        app.probe.clone(),
        app.config.probe_interval(),
        shutdown_rx.clone(),
    );
    let sync_handle = tokio::spawn(
        Arc::clone(&orchestrator).run(app.config.retry_interval(), shutdown_rx),
    );
    let events_handle = tokio::spawn(print_events(orchestrator.subscribe_events()));

    let report_now = orchestrator.status();
    println!(
        "Watching for scans ({}, {} pending). One tag per line, Ctrl-D to stop.",
        if report_now.online { "online" } else { "offline" },
        report_now.pending
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match orchestrator.record_scan(&line).await {
                    Ok(outcome) => report(&outcome),
                    Err(e) => eprintln!("Rejected: {e}"),
                }
            }
            _ = &mut ctrl_c => {
                tracing::info!("Interrupted, shutting down");
                break;
            }
        }
    }

    let _ = shutdown_tx.send(true);
    let (probe_result, sync_result) = tokio::join!(probe_handle, sync_handle);
    if let Err(e) = probe_result {
        tracing::warn!(error = %e, "Probe loop ended abnormally");
    }
    if let Err(e) = sync_result {
        tracing::warn!(error = %e, "Sync loop ended abnormally");
    }
    events_handle.abort();

    println!("Stopped with {} records pending", orchestrator.pending().await);
    Ok(())
}

async fn print_events(mut events: broadcast::Receiver<SyncEvent>) {
    loop {
        match events.recv().await {
            Ok(SyncEvent::DrainStarted {
                trigger,
                batch_size,
            }) => println!("Syncing... {batch_size} records ({trigger})"),
            Ok(SyncEvent::DrainCompleted { delivered, pending }) => {
                println!("Sync Complete: {delivered} delivered, {pending} pending");
            }
            Ok(SyncEvent::DrainFailed { error, pending }) => {
                println!("Sync Failed - Will retry ({pending} pending): {error}");
            }
            Ok(SyncEvent::StorageFailed { error }) => {
                eprintln!("Storage failure: {error}");
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Event printer lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
