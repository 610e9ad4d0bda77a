mod common;

use std::sync::{Arc, Mutex};

use common::{count, ingest_active, raw, seed_dealership, setup_db, ts};
use order_engine::queue::{JobState, QueueJob, QueueOptions, QueueProcessor};
use order_engine::resolver::OrderMode;

const DEALER: &str = "Example Honda";
const VIN_1: &str = "1HGCM82633A000001";

fn cao_job(dealership: &str) -> QueueJob {
    QueueJob {
        dealership: dealership.to_string(),
        mode: OrderMode::Cao,
        template: None,
        vins: Vec::new(),
    }
}

#[test]
fn job_failure_does_not_abort_peers() {
    let (_db, mut conn) = setup_db();
    let out = tempfile::tempdir().unwrap();
    seed_dealership(&mut conn, DEALER, out.path(), &Default::default(), &Default::default());
    ingest_active(&mut conn, DEALER, "IMP-1", &[raw(VIN_1, DEALER)], ts(2025, 2, 1));

    let transitions: Arc<Mutex<Vec<(usize, JobState)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&transitions);
    let processor = QueueProcessor::new().on_transition(Box::new(move |t| {
        sink.lock().unwrap().push((t.index, t.state));
    }));

    let jobs = [cao_job("Nowhere Motors"), cao_job(DEALER)];
    let results = processor.process(&mut conn, &jobs, QueueOptions::default());

    assert_eq!(results.len(), 2);
    assert!(!results[0].success);
    assert!(results[0].error.as_deref().unwrap_or("").contains("Nowhere Motors"));
    assert!(results[1].success);
    assert_eq!(results[1].included, 1);
    assert!(results[1].csv_path.is_some());

    // Each job walks PENDING -> IN_PROGRESS -> terminal, in submission order.
    let transitions = transitions.lock().unwrap();
    let of = |index: usize| -> Vec<JobState> {
        transitions
            .iter()
            .filter(|(i, _)| *i == index)
            .map(|(_, s)| *s)
            .collect()
    };
    assert_eq!(
        of(0),
        vec![JobState::Pending, JobState::InProgress, JobState::Failed]
    );
    assert_eq!(
        of(1),
        vec![JobState::Pending, JobState::InProgress, JobState::Completed]
    );
}

#[test]
fn skip_vin_logging_routes_jobs_through_dry_mode() {
    let (_db, mut conn) = setup_db();
    let out = tempfile::tempdir().unwrap();
    seed_dealership(&mut conn, DEALER, out.path(), &Default::default(), &Default::default());
    ingest_active(&mut conn, DEALER, "IMP-1", &[raw(VIN_1, DEALER)], ts(2025, 2, 1));

    let results = QueueProcessor::new().process(
        &mut conn,
        &[cao_job(DEALER)],
        QueueOptions {
            skip_vin_logging: true,
        },
    );

    assert!(results[0].success);
    let csv_path = results[0].csv_path.clone().unwrap();
    assert!(csv_path.display().to_string().contains("/dry/"));
    assert!(csv_path.exists());
    assert_eq!(count(&mut conn, "vin_log"), 0);
    assert_eq!(count(&mut conn, "order_runs"), 0);
}

#[test]
fn cancellation_fails_remaining_jobs() {
    let (_db, mut conn) = setup_db();
    let out = tempfile::tempdir().unwrap();
    seed_dealership(&mut conn, DEALER, out.path(), &Default::default(), &Default::default());
    ingest_active(&mut conn, DEALER, "IMP-1", &[raw(VIN_1, DEALER)], ts(2025, 2, 1));

    let processor = QueueProcessor::new();
    processor
        .cancel_flag()
        .store(true, std::sync::atomic::Ordering::SeqCst);

    let results = processor.process(&mut conn, &[cao_job(DEALER)], QueueOptions::default());
    assert!(!results[0].success);
    assert!(results[0].error.as_deref().unwrap_or("").contains("cancelled"));
    assert_eq!(count(&mut conn, "vin_log"), 0);
}

#[test]
fn list_mode_job_emits_for_the_requested_vins() {
    let (_db, mut conn) = setup_db();
    let out = tempfile::tempdir().unwrap();
    seed_dealership(&mut conn, DEALER, out.path(), &Default::default(), &Default::default());
    ingest_active(&mut conn, DEALER, "IMP-1", &[raw(VIN_1, DEALER)], ts(2025, 2, 1));

    let job = QueueJob {
        dealership: DEALER.to_string(),
        mode: OrderMode::List,
        template: None,
        vins: vec![VIN_1.to_string(), "5YJ3E1EA6KF000002".to_string()],
    };
    let results = QueueProcessor::new().process(&mut conn, &[job], QueueOptions::default());

    assert!(results[0].success);
    assert_eq!(results[0].included, 1);
    // The absent VIN shows up as a skipped classification.
    assert_eq!(results[0].skipped, 1);
    assert_eq!(count(&mut conn, "vin_log"), 1);
}
