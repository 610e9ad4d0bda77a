//! Scrape-session glue: orchestrator output into the store.
//!
//! One session gets one import: a `pending` manifest is allocated up front,
//! every adapter batch is ingested under it as it arrives (Diesel work runs
//! on the blocking pool), and the manifest is activated — archiving the
//! previously active one — only after every batch committed cleanly. If any
//! ingest fails the manifest stays `pending`, invisible to the resolver,
//! and the failure is reported in the session outcome.

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use inventory_ingestor::adapters::InventoryAdapter;
use inventory_ingestor::models::events::{SessionEvent, SessionSummary};
use inventory_ingestor::orchestrator::{self, SessionOptions};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::db::connection::connect_sqlite;
use crate::store::manifests::{self, ImportSource};

/// The result of one scrape session.
#[derive(Debug)]
pub struct ScrapeSessionOutcome {
    /// Orchestrator aggregate totals.
    pub summary: SessionSummary,
    /// The import the session wrote under.
    pub import_id: String,
    /// Raw rows ingested across all batches.
    pub ingested_rows: usize,
    /// Whether the manifest was activated (false when an ingest failed).
    pub activated: bool,
    /// Per-adapter ingest failures, `(adapter, error)`.
    pub ingest_errors: Vec<(String, String)>,
}

/// Runs a scraping session end to end.
///
/// `events` receives the orchestrator's progress stream; pass a drain from
/// the UI layer or [`log_events`] for CLI runs. The adapter list comes from
/// the caller — the core takes the schedule as input and does not own a
/// calendar.
pub async fn run_scrape_session(
    database_url: &str,
    adapters: Vec<Arc<dyn InventoryAdapter>>,
    events: mpsc::UnboundedSender<SessionEvent>,
    cancel: CancellationToken,
) -> anyhow::Result<ScrapeSessionOutcome> {
    let now = Utc::now();
    let import_id = format!("IMP-{}-{:06}", now.format("%Y%m%d%H%M%S"), now.timestamp_subsec_micros() % 1_000_000);
    let session_id = format!("SES-{}", now.format("%Y%m%d%H%M%S"));

    {
        let url = database_url.to_string();
        let import_id = import_id.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = connect_sqlite(&url)?;
            manifests::create_manifest(&mut conn, &import_id, ImportSource::Scrape, None, now)?;
            Ok::<_, anyhow::Error>(())
        })
        .await
        .context("manifest task panicked")??;
    }

    let (batch_tx, mut batch_rx) = mpsc::channel(8);
    let opts = SessionOptions::new(session_id, import_id.clone());
    let orchestrator = tokio::spawn(orchestrator::run_session(
        adapters,
        opts,
        events,
        batch_tx,
        cancel,
    ));

    let mut ingested_rows = 0usize;
    let mut ingest_errors: Vec<(String, String)> = Vec::new();
    while let Some(batch) = batch_rx.recv().await {
        let url = database_url.to_string();
        let adapter = batch.adapter.clone();
        let result = tokio::task::spawn_blocking(move || {
            let mut conn = connect_sqlite(&url)?;
            let outcome = crate::ingest::ingest_batch(
                &mut conn,
                &batch.location,
                &batch.import_id,
                &batch.rows,
                Utc::now(),
            )?;
            Ok::<_, anyhow::Error>(outcome.raw_rows)
        })
        .await
        .context("ingest task panicked")?;

        match result {
            Ok(rows) => ingested_rows += rows,
            Err(e) => {
                tracing::error!(adapter = %adapter, error = %e, "batch ingest failed");
                ingest_errors.push((adapter, e.to_string()));
            }
        }
    }

    let summary = orchestrator.await.context("orchestrator task panicked")?;

    let activated = ingest_errors.is_empty();
    if activated {
        let url = database_url.to_string();
        let import_id = import_id.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = connect_sqlite(&url)?;
            manifests::activate_manifest(&mut conn, &import_id)?;
            Ok::<_, anyhow::Error>(())
        })
        .await
        .context("activation task panicked")??;
    } else {
        tracing::warn!(
            import_id = %import_id,
            errors = ingest_errors.len(),
            "leaving manifest pending after ingest failures"
        );
    }

    Ok(ScrapeSessionOutcome {
        summary,
        import_id,
        ingested_rows,
        activated,
        ingest_errors,
    })
}

/// Spawns a task that drains session events into tracing logs. Handy for
/// CLI runs where no UI is attached.
pub fn log_events() -> mpsc::UnboundedSender<SessionEvent> {
    let (tx, mut rx) = mpsc::unbounded_channel::<SessionEvent>();
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                SessionEvent::SessionStart { session_id, adapter_count, .. } => {
                    tracing::info!(%session_id, adapter_count, "session started");
                }
                SessionEvent::ScraperStart { adapter, expected_hint } => {
                    tracing::info!(%adapter, ?expected_hint, "scraper started");
                }
                SessionEvent::ScraperProgress(update) => {
                    tracing::debug!(
                        adapter = %update.adapter,
                        current = update.current,
                        vehicles = update.vehicles,
                        status = %update.status,
                        "progress"
                    );
                }
                SessionEvent::ScraperComplete { adapter, outcome } => {
                    tracing::info!(%adapter, success = outcome.is_success(), "scraper complete");
                }
                SessionEvent::SessionComplete(summary) => {
                    tracing::info!(
                        session_id = %summary.session_id,
                        vehicles = summary.vehicles_total,
                        failures = summary.failures.len(),
                        "session complete"
                    );
                }
            }
        }
    });
    tx
}
