//! Subcommand implementations.

use crate::app::SyncApp;
use sync_config_and_utils::{Config, Paths};
use sync_coordinator::{CoordinatorConfig, SyncCoordinator};
use sync_database::Visibility;
use sync_queue_engine::SyncSummary;
use tracing::{info, warn};

/// Run the coordinator until Ctrl-C.
pub async fn run(config: Config, paths: &Paths) -> anyhow::Result<()> {
    let app = SyncApp::open(config, paths, true)?;
    info!("Starting Anchorline sync service");

    let mut status = app.queue.subscribe();
    let status_log = tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let current = *status.borrow_and_update();
            info!(
                pending = current.pending_count,
                failed = current.failed_count,
                syncing = current.is_syncing,
                "Queue status"
            );
        }
    });

    let mut coordinator =
        SyncCoordinator::start(app.queue.clone(), CoordinatorConfig::from(&app.config));

    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "Failed to listen for Ctrl-C, shutting down");
    }
    info!("Shutdown requested");

    coordinator.shutdown().await;
    status_log.abort();
    info!("Sync service stopped");
    Ok(())
}

pub async fn sync_now(config: Config, paths: &Paths) -> anyhow::Result<()> {
    let app = SyncApp::open(config, paths, false)?;
    let summary = app.queue.process_queue().await;
    print_summary(&summary);
    Ok(())
}

pub fn status(config: Config, paths: &Paths) -> anyhow::Result<()> {
    let app = SyncApp::open(config, paths, false)?;
    let status = app.queue.status();
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

pub async fn publish(
    config: Config,
    paths: &Paths,
    id: &str,
    visibility: Visibility,
) -> anyhow::Result<()> {
    let app = SyncApp::open(config, paths, false)?;
    let enqueued = app.publisher.publish(id, visibility)?;
    println!(
        "Queued {} #{} ({})",
        enqueued.kind.as_str(),
        enqueued.operation_id,
        enqueued.public_id.as_deref().unwrap_or("-")
    );
    let summary = app.queue.process_queue().await;
    print_summary(&summary);
    Ok(())
}

pub async fn unpublish(config: Config, paths: &Paths, id: &str) -> anyhow::Result<()> {
    let app = SyncApp::open(config, paths, false)?;
    let enqueued = app.publisher.unpublish(id)?;
    println!(
        "Queued {} #{}",
        enqueued.kind.as_str(),
        enqueued.operation_id
    );
    let summary = app.queue.process_queue().await;
    print_summary(&summary);
    Ok(())
}

pub fn list(config: Config, paths: &Paths, operations: bool) -> anyhow::Result<()> {
    let app = SyncApp::open(config, paths, false)?;

    if operations {
        for op in app.db.list_operations(50)? {
            println!(
                "#{:<5} {:<15} {:<10} retries={} {} {}",
                op.id,
                op.kind.as_str(),
                op.status.as_str(),
                op.retry_count,
                op.content_id,
                op.last_error.as_deref().unwrap_or("")
            );
        }
        return Ok(());
    }

    for item in app.db.list_content_items()? {
        println!(
            "{:<24} {:<9} {:<8} {:<32} {}",
            item.id,
            item.visibility.as_str(),
            item.sync_status.as_str(),
            item.public_id.as_deref().unwrap_or("-"),
            item.title
        );
    }
    for charter in app.db.list_charters()? {
        println!(
            "{:<24} {:<9} {:<8} {:<32} {} (charter)",
            charter.id,
            charter.visibility.as_str(),
            charter.sync_status.as_str(),
            charter.remote_id.as_deref().unwrap_or("-"),
            charter.name
        );
    }
    Ok(())
}

fn print_summary(summary: &SyncSummary) {
    println!(
        "attempted={} succeeded={} failed={} skipped={}",
        summary.attempted, summary.succeeded, summary.failed, summary.skipped
    );
}
