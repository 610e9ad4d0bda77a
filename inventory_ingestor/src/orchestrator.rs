//! Scraper orchestrator — drives many dealership adapters concurrently.
//!
//! The orchestrator owns the session lifecycle: it emits `SessionStart`,
//! runs every adapter under a bounded concurrency cap with a per-adapter
//! soft deadline, forwards each successful adapter's rows to the caller as
//! an [`AdapterBatch`], and emits exactly one `SessionComplete` after the
//! last per-adapter completion. An adapter failure never aborts the session;
//! it is recorded in the summary instead.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use indexmap::IndexMap;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::adapters::{AdapterError, InventoryAdapter, ProgressHandle, ScrapeContext};
use crate::errors::{CancelledSnafu, DeadlineSnafu, Error};
use crate::models::events::{ScrapeOutcome, SessionEvent, SessionSummary};
use crate::models::vehicle::RawVehicle;

/// Default soft deadline for one adapter.
pub const DEFAULT_ADAPTER_DEADLINE: Duration = Duration::from_secs(15 * 60);

/// Rows produced by one successful adapter, tagged with the session import.
#[derive(Debug, Clone)]
pub struct AdapterBatch {
    pub adapter: String,
    /// Dealership display name the rows belong to.
    pub location: String,
    pub import_id: String,
    pub rows: Vec<RawVehicle>,
}

/// Options for one scraping session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Identifier echoed in session events.
    pub session_id: String,
    /// The single import every batch of this session belongs to.
    pub import_id: String,
    /// Concurrency cap; `None` uses [`default_concurrency`].
    pub concurrency: Option<usize>,
    /// Per-adapter soft deadline.
    pub adapter_deadline: Duration,
}

impl SessionOptions {
    /// Options with the default cap and deadline.
    pub fn new(session_id: impl Into<String>, import_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            import_id: import_id.into(),
            concurrency: None,
            adapter_deadline: DEFAULT_ADAPTER_DEADLINE,
        }
    }
}

/// Default adapter concurrency: the machine's parallelism clamped to [2, 16].
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(2)
        .clamp(2, 16)
}

/// Runs a single adapter outside a session, with the same deadline and
/// cancellation semantics, returning its rows or a typed [`Error`].
///
/// Useful for probing one dealership's wiring without allocating an import.
pub async fn run_adapter_once(
    adapter: Arc<dyn InventoryAdapter>,
    deadline: Duration,
    cancel: CancellationToken,
) -> Result<Vec<RawVehicle>, Error> {
    let (events, _drain) = mpsc::unbounded_channel();
    let ctx = ScrapeContext::new(
        cancel.clone(),
        ProgressHandle::new(adapter.name(), adapter.expected_count_hint(), events),
    );

    if cancel.is_cancelled() {
        return CancelledSnafu.fail();
    }

    match tokio::time::timeout(deadline, adapter.produce(&ctx)).await {
        Err(_elapsed) => DeadlineSnafu {
            adapter: adapter.name().to_string(),
        }
        .fail(),
        Ok(Err(AdapterError::Cancelled)) => CancelledSnafu.fail(),
        Ok(Err(source)) => Err(Error::Adapter {
            adapter: adapter.name().to_string(),
            source,
        }),
        Ok(Ok(rows)) => Ok(rows),
    }
}

/// Runs one scraping session to completion and returns its summary.
///
/// Events are emitted on `events`; each successful adapter's rows are sent
/// on `batches` before that adapter's `ScraperComplete` event. Both channels
/// are best-effort: a dropped receiver does not fail the session. The
/// summary is also carried by the final `SessionComplete` event.
pub async fn run_session(
    adapters: Vec<Arc<dyn InventoryAdapter>>,
    opts: SessionOptions,
    events: mpsc::UnboundedSender<SessionEvent>,
    batches: mpsc::Sender<AdapterBatch>,
    cancel: CancellationToken,
) -> SessionSummary {
    let started_at = Utc::now();
    let session_start = Instant::now();
    let cap = opts.concurrency.unwrap_or_else(default_concurrency);
    let semaphore = Arc::new(Semaphore::new(cap));

    let _ = events.send(SessionEvent::SessionStart {
        session_id: opts.session_id.clone(),
        adapter_count: adapters.len(),
        started_at,
    });

    let mut set: JoinSet<(String, ScrapeOutcome)> = JoinSet::new();
    for adapter in adapters.iter().cloned() {
        let semaphore = Arc::clone(&semaphore);
        let events = events.clone();
        let batches = batches.clone();
        let cancel = cancel.clone();
        let import_id = opts.import_id.clone();
        let deadline = opts.adapter_deadline;

        set.spawn(async move {
            // Hold the permit for the whole scrape so at most `cap` adapters
            // run at once; the rest queue here. The semaphore is never
            // closed, so acquisition cannot fail.
            let _permit = semaphore.acquire_owned().await.ok();
            let name = adapter.name().to_string();

            let _ = events.send(SessionEvent::ScraperStart {
                adapter: name.clone(),
                expected_hint: adapter.expected_count_hint(),
            });

            let started = Instant::now();
            let ctx = ScrapeContext::new(
                cancel.clone(),
                ProgressHandle::new(name.as_str(), adapter.expected_count_hint(), events.clone()),
            );

            let outcome = tokio::select! {
                _ = cancel.cancelled() => ScrapeOutcome::Failure {
                    reason: "cancelled".to_string(),
                    duration: started.elapsed(),
                },
                produced = tokio::time::timeout(deadline, adapter.produce(&ctx)) => {
                    match produced {
                        // Deadline hit: the adapter future is dropped and its
                        // partial output discarded with it.
                        Err(_elapsed) => ScrapeOutcome::Failure {
                            reason: "deadline".to_string(),
                            duration: started.elapsed(),
                        },
                        Ok(Err(err)) => ScrapeOutcome::Failure {
                            reason: err.to_string(),
                            duration: started.elapsed(),
                        },
                        Ok(Ok(rows)) => {
                            let vehicles = rows.len();
                            let _ = batches
                                .send(AdapterBatch {
                                    adapter: name.clone(),
                                    location: adapter.location().to_string(),
                                    import_id,
                                    rows,
                                })
                                .await;
                            ScrapeOutcome::Success {
                                vehicles,
                                data_origin: adapter.data_origin().to_string(),
                                duration: started.elapsed(),
                            }
                        }
                    }
                }
            };

            let _ = events.send(SessionEvent::ScraperComplete {
                adapter: name.clone(),
                outcome: outcome.clone(),
            });
            (name, outcome)
        });
    }
    // Batch senders live only in the spawned tasks now; dropping ours lets
    // the receiver close once the last adapter finishes.
    drop(batches);

    let mut vehicles_total = 0usize;
    let mut origin_counts: IndexMap<String, usize> = IndexMap::new();
    let mut failures: Vec<(String, String)> = Vec::new();

    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((adapter, ScrapeOutcome::Success { vehicles, data_origin, .. })) => {
                vehicles_total += vehicles;
                *origin_counts.entry(data_origin).or_insert(0) += vehicles;
                tracing::info!(%adapter, vehicles, "scraper finished");
            }
            Ok((adapter, ScrapeOutcome::Failure { reason, .. })) => {
                tracing::warn!(%adapter, %reason, "scraper failed");
                failures.push((adapter, reason));
            }
            Err(join_err) => {
                tracing::error!(error = %join_err, "scraper task panicked");
                failures.push(("<unknown>".to_string(), join_err.to_string()));
            }
        }
    }

    let summary = SessionSummary {
        session_id: opts.session_id,
        import_id: opts.import_id,
        started_at,
        duration: session_start.elapsed(),
        adapters_run: adapters.len(),
        vehicles_total,
        origin_counts,
        failures,
    };

    let _ = events.send(SessionEvent::SessionComplete(summary.clone()));
    summary
}
