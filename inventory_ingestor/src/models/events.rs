//! Structured progress events emitted by the scraper orchestrator.
//!
//! Observers (the operator UI, the CLI, tests) receive these over a single
//! fan-out channel. Ordering guarantees: per adapter, `ScraperStart` precedes
//! any `ScraperProgress` which precede exactly one `ScraperComplete`; events
//! for different adapters may interleave; `SessionStart` is first and
//! `SessionComplete` is emitted exactly once, after the last per-adapter
//! completion.

use std::time::Duration;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

/// One event in the scraping session stream.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    SessionStart {
        session_id: String,
        adapter_count: usize,
        started_at: DateTime<Utc>,
    },
    ScraperStart {
        adapter: String,
        expected_hint: Option<usize>,
    },
    ScraperProgress(ProgressUpdate),
    ScraperComplete {
        adapter: String,
        outcome: ScrapeOutcome,
    },
    SessionComplete(SessionSummary),
}

/// A progress snapshot for one adapter, rich enough to reproduce the UI.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub adapter: String,
    /// Index of the item currently being processed (page, listing, ...).
    pub current: usize,
    /// Adapter's own estimate of the total, when it has one.
    pub total_hint: Option<usize>,
    /// Vehicles produced so far.
    pub vehicles: usize,
    /// Cumulative per-adapter error count (retries, skipped listings).
    pub errors: usize,
    /// Human-readable status line.
    pub status: String,
}

/// Terminal outcome of one adapter within a session.
#[derive(Debug, Clone, PartialEq)]
pub enum ScrapeOutcome {
    Success {
        vehicles: usize,
        /// Opaque adapter-defined tag classifying the data source, e.g.
        /// `"real"` or `"fallback"`.
        data_origin: String,
        duration: Duration,
    },
    Failure {
        /// Machine-readable reason: `"deadline"`, `"cancelled"`, or an
        /// adapter error rendering.
        reason: String,
        duration: Duration,
    },
}

impl ScrapeOutcome {
    /// True for the `Success` variant.
    pub fn is_success(&self) -> bool {
        matches!(self, ScrapeOutcome::Success { .. })
    }
}

/// Aggregate totals for a finished session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub session_id: String,
    /// The import every successful batch was ingested under.
    pub import_id: String,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    pub adapters_run: usize,
    /// Total vehicles across successful adapters.
    pub vehicles_total: usize,
    /// Vehicle counts keyed by the adapters' `data_origin` tag, preserving
    /// first-seen order.
    pub origin_counts: IndexMap<String, usize>,
    /// `(adapter, reason)` for every failed adapter.
    pub failures: Vec<(String, String)>,
}
