//! Adapter abstraction for dealership inventory sources.
//!
//! This module defines the [`InventoryAdapter`] trait, the unified interface
//! for pulling raw vehicle rows from any dealership website or inventory API.
//!
//! Concrete adapters handle site-specific transport and parsing; the
//! orchestrator only sees the trait. The trait is designed for async usage
//! and supports dynamic dispatch (`dyn InventoryAdapter`) so a session can be
//! assembled from a runtime-selected set of adapters.

pub mod dealer_api;
mod errors;

pub use errors::{AdapterError, AdapterInitError};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::models::events::{ProgressUpdate, SessionEvent};
use crate::models::vehicle::RawVehicle;

/// Per-adapter execution context handed to [`InventoryAdapter::produce`].
///
/// Adapters must check [`ScrapeContext::is_cancelled`] at every progress
/// boundary (page fetch, listing batch) and bail out promptly when set.
pub struct ScrapeContext {
    cancel: CancellationToken,
    progress: ProgressHandle,
}

impl ScrapeContext {
    /// Builds a context from a cancellation token and a progress handle.
    pub fn new(cancel: CancellationToken, progress: ProgressHandle) -> Self {
        Self { cancel, progress }
    }

    /// True once the session (or this adapter) has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// The cancellation token, for adapters that want to `select!` on it.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Reports a progress snapshot to session observers.
    pub fn report(&self, current: usize, vehicles: usize, errors: usize, status: impl Into<String>) {
        self.progress.report(current, vehicles, errors, status);
    }
}

/// Sends `ScraperProgress` events on behalf of one adapter.
///
/// Event delivery is best-effort: a dropped observer never fails a scrape.
#[derive(Clone)]
pub struct ProgressHandle {
    adapter: String,
    total_hint: Option<usize>,
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl ProgressHandle {
    /// Creates a handle tagged with the adapter's name and count hint.
    pub fn new(
        adapter: impl Into<String>,
        total_hint: Option<usize>,
        tx: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            adapter: adapter.into(),
            total_hint,
            tx,
        }
    }

    fn report(&self, current: usize, vehicles: usize, errors: usize, status: impl Into<String>) {
        let _ = self.tx.send(SessionEvent::ScraperProgress(ProgressUpdate {
            adapter: self.adapter.clone(),
            current,
            total_hint: self.total_hint,
            vehicles,
            errors,
            status: status.into(),
        }));
    }
}

/// Capability implemented by each dealership inventory source.
#[async_trait]
pub trait InventoryAdapter: Send + Sync {
    /// Stable adapter name; also used as the event stream tag.
    fn name(&self) -> &str;

    /// Dealership display name this adapter's rows belong to. Defaults to
    /// the adapter name; adapters serving a differently-labelled lot
    /// override it.
    fn location(&self) -> &str {
        self.name()
    }

    /// The adapter's own estimate of how many vehicles it will produce.
    fn expected_count_hint(&self) -> Option<usize> {
        None
    }

    /// Opaque tag classifying where the data came from (e.g. `"real"` for a
    /// live API, `"fallback"` for a cached or secondary source).
    fn data_origin(&self) -> &str {
        "real"
    }

    /// Produces the full set of raw rows for this source.
    ///
    /// Implementations must observe `ctx` cancellation at progress
    /// boundaries and should call [`ScrapeContext::report`] as they go.
    async fn produce(&self, ctx: &ScrapeContext) -> Result<Vec<RawVehicle>, AdapterError>;
}
