use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use inventory_ingestor::adapters::{AdapterError, InventoryAdapter, ScrapeContext};
use inventory_ingestor::models::events::{ScrapeOutcome, SessionEvent};
use inventory_ingestor::models::vehicle::RawVehicle;
use inventory_ingestor::errors::Error;
use inventory_ingestor::orchestrator::{AdapterBatch, SessionOptions, run_adapter_once, run_session};

fn car(vin: &str, location: &str) -> RawVehicle {
    RawVehicle {
        vin: vin.into(),
        stock: "S1".into(),
        year: Some(2022),
        make: "Honda".into(),
        model: "Accord".into(),
        trim: "LX".into(),
        price: Some("25000".into()),
        mileage: Some(100),
        condition: "used".into(),
        exterior_color: "Red".into(),
        location: location.into(),
        vehicle_url: String::new(),
        time_scraped: Utc::now(),
    }
}

/// Adapter producing a fixed set of rows, reporting once per row.
struct FixedAdapter {
    name: String,
    rows: Vec<RawVehicle>,
    origin: String,
}

impl FixedAdapter {
    fn new(name: &str, count: usize) -> Self {
        Self {
            name: name.to_string(),
            rows: (0..count).map(|i| car(&format!("VIN{i:014}"), name)).collect(),
            origin: "real".to_string(),
        }
    }
}

#[async_trait]
impl InventoryAdapter for FixedAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn expected_count_hint(&self) -> Option<usize> {
        Some(self.rows.len())
    }

    fn data_origin(&self) -> &str {
        &self.origin
    }

    async fn produce(&self, ctx: &ScrapeContext) -> Result<Vec<RawVehicle>, AdapterError> {
        for (i, _) in self.rows.iter().enumerate() {
            if ctx.is_cancelled() {
                return Err(AdapterError::Cancelled);
            }
            ctx.report(i + 1, i + 1, 0, format!("listing {}", i + 1));
            tokio::task::yield_now().await;
        }
        Ok(self.rows.clone())
    }
}

/// Adapter that always fails.
struct BrokenAdapter;

#[async_trait]
impl InventoryAdapter for BrokenAdapter {
    fn name(&self) -> &str {
        "broken"
    }

    async fn produce(&self, _ctx: &ScrapeContext) -> Result<Vec<RawVehicle>, AdapterError> {
        Err(AdapterError::Api("503 upstream".into()))
    }
}

/// Adapter that never finishes on its own.
struct StalledAdapter;

#[async_trait]
impl InventoryAdapter for StalledAdapter {
    fn name(&self) -> &str {
        "stalled"
    }

    async fn produce(&self, _ctx: &ScrapeContext) -> Result<Vec<RawVehicle>, AdapterError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(vec![])
    }
}

/// Tracks the peak number of concurrently running adapters.
struct GaugedAdapter {
    name: String,
    running: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

#[async_trait]
impl InventoryAdapter for GaugedAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn produce(&self, _ctx: &ScrapeContext) -> Result<Vec<RawVehicle>, AdapterError> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.running.fetch_sub(1, Ordering::SeqCst);
        Ok(vec![])
    }
}

fn collect_events(mut rx: mpsc::UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(e) = rx.try_recv() {
        events.push(e);
    }
    events
}

#[tokio::test]
async fn events_are_ordered_per_adapter_and_session_complete_is_last() {
    let adapters: Vec<Arc<dyn InventoryAdapter>> = vec![
        Arc::new(FixedAdapter::new("lot-a", 3)),
        Arc::new(FixedAdapter::new("lot-b", 2)),
    ];
    let (tx, rx) = mpsc::unbounded_channel();
    let (btx, mut brx) = mpsc::channel(8);

    let summary = run_session(
        adapters,
        SessionOptions::new("S1", "IMP-1"),
        tx,
        btx,
        CancellationToken::new(),
    )
    .await;
    brx.close();

    let events = collect_events(rx);
    assert!(matches!(events.first(), Some(SessionEvent::SessionStart { adapter_count: 2, .. })));
    assert!(matches!(events.last(), Some(SessionEvent::SessionComplete(_))));

    // Per adapter: start before every progress, progress before complete.
    for name in ["lot-a", "lot-b"] {
        let start = events
            .iter()
            .position(|e| matches!(e, SessionEvent::ScraperStart { adapter, .. } if adapter == name))
            .expect("start event");
        let complete = events
            .iter()
            .position(
                |e| matches!(e, SessionEvent::ScraperComplete { adapter, .. } if adapter == name),
            )
            .expect("complete event");
        assert!(start < complete);
        for (i, e) in events.iter().enumerate() {
            if let SessionEvent::ScraperProgress(p) = e {
                if p.adapter == name {
                    assert!(start < i && i < complete, "progress outside start..complete");
                }
            }
        }
        // Exactly one completion per adapter.
        let completions = events
            .iter()
            .filter(
                |e| matches!(e, SessionEvent::ScraperComplete { adapter, .. } if adapter == name),
            )
            .count();
        assert_eq!(completions, 1);
    }

    assert_eq!(summary.vehicles_total, 5);
    assert_eq!(summary.origin_counts.get("real"), Some(&5));
    assert!(summary.failures.is_empty());
}

#[tokio::test]
async fn adapter_failure_does_not_abort_the_session() {
    let adapters: Vec<Arc<dyn InventoryAdapter>> = vec![
        Arc::new(BrokenAdapter),
        Arc::new(FixedAdapter::new("lot-a", 4)),
    ];
    let (tx, rx) = mpsc::unbounded_channel();
    let (btx, mut brx) = mpsc::channel(8);

    let summary = run_session(
        adapters,
        SessionOptions::new("S2", "IMP-2"),
        tx,
        btx,
        CancellationToken::new(),
    )
    .await;

    assert_eq!(summary.vehicles_total, 4);
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].0, "broken");

    // The healthy adapter's batch still arrived, tagged with the import.
    let mut batches: Vec<AdapterBatch> = Vec::new();
    while let Ok(b) = brx.try_recv() {
        batches.push(b);
    }
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].adapter, "lot-a");
    assert_eq!(batches[0].import_id, "IMP-2");
    assert_eq!(batches[0].rows.len(), 4);

    let events = collect_events(rx);
    let broken_outcome = events.iter().find_map(|e| match e {
        SessionEvent::ScraperComplete { adapter, outcome } if adapter == "broken" => {
            Some(outcome.clone())
        }
        _ => None,
    });
    assert!(matches!(broken_outcome, Some(ScrapeOutcome::Failure { .. })));
}

#[tokio::test(start_paused = true)]
async fn stalled_adapter_hits_deadline_and_partial_output_is_discarded() {
    let adapters: Vec<Arc<dyn InventoryAdapter>> = vec![Arc::new(StalledAdapter)];
    let (tx, rx) = mpsc::unbounded_channel();
    let (btx, mut brx) = mpsc::channel(8);

    let mut opts = SessionOptions::new("S3", "IMP-3");
    opts.adapter_deadline = Duration::from_secs(60);

    let summary = run_session(adapters, opts, tx, btx, CancellationToken::new()).await;

    assert_eq!(summary.failures, vec![("stalled".to_string(), "deadline".to_string())]);
    assert_eq!(summary.vehicles_total, 0);
    assert!(brx.try_recv().is_err(), "no batch for a timed-out adapter");

    let events = collect_events(rx);
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::ScraperComplete {
            outcome: ScrapeOutcome::Failure { reason, .. },
            ..
        } if reason == "deadline"
    )));
}

#[tokio::test]
async fn cancellation_fails_remaining_adapters() {
    let cancel = CancellationToken::new();
    cancel.cancel();

    let adapters: Vec<Arc<dyn InventoryAdapter>> = vec![
        Arc::new(FixedAdapter::new("lot-a", 3)),
        Arc::new(FixedAdapter::new("lot-b", 3)),
    ];
    let (tx, _rx) = mpsc::unbounded_channel();
    let (btx, _brx) = mpsc::channel(8);

    let summary = run_session(adapters, SessionOptions::new("S4", "IMP-4"), tx, btx, cancel).await;

    assert_eq!(summary.vehicles_total, 0);
    assert_eq!(summary.failures.len(), 2);
    for (_, reason) in &summary.failures {
        assert!(reason == "cancelled" || reason == "Scrape cancelled");
    }
}

#[tokio::test(start_paused = true)]
async fn run_adapter_once_maps_outcomes_to_typed_errors() {
    let rows = run_adapter_once(
        Arc::new(FixedAdapter::new("lot-a", 2)),
        Duration::from_secs(60),
        CancellationToken::new(),
    )
    .await
    .expect("adapter rows");
    assert_eq!(rows.len(), 2);

    let err = run_adapter_once(
        Arc::new(StalledAdapter),
        Duration::from_secs(60),
        CancellationToken::new(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::Deadline { .. }));

    let err = run_adapter_once(
        Arc::new(BrokenAdapter),
        Duration::from_secs(60),
        CancellationToken::new(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::Adapter { .. }));

    let cancelled = CancellationToken::new();
    cancelled.cancel();
    let err = run_adapter_once(
        Arc::new(FixedAdapter::new("lot-a", 2)),
        Duration::from_secs(60),
        cancelled,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::Cancelled { .. }));
}

#[tokio::test]
async fn concurrency_cap_bounds_parallel_adapters() {
    let running = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let adapters: Vec<Arc<dyn InventoryAdapter>> = (0..6)
        .map(|i| {
            Arc::new(GaugedAdapter {
                name: format!("lot-{i}"),
                running: Arc::clone(&running),
                peak: Arc::clone(&peak),
            }) as Arc<dyn InventoryAdapter>
        })
        .collect();

    let (tx, _rx) = mpsc::unbounded_channel();
    let (btx, _brx) = mpsc::channel(8);
    let mut opts = SessionOptions::new("S5", "IMP-5");
    opts.concurrency = Some(2);

    run_session(adapters, opts, tx, btx, CancellationToken::new()).await;

    assert!(peak.load(Ordering::SeqCst) <= 2, "cap exceeded: {}", peak.load(Ordering::SeqCst));
}
