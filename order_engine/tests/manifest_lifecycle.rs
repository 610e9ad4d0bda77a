mod common;

use common::{count, ingest_active, raw, setup_db, ts};
use diesel::prelude::*;
use order_engine::error::EngineError;
use order_engine::ops;
use order_engine::resolver;
use order_engine::store::manifests::{self, ImportSource};

const DEALER: &str = "Example Honda";
const VIN_A: &str = "1HGCM82633A004352";
const VIN_B: &str = "5YJ3E1EA6KF316234";

fn active_count(conn: &mut SqliteConnection) -> i64 {
    use order_engine::schema::import_manifests::dsl as im;
    im::import_manifests
        .filter(im::status.eq("active"))
        .count()
        .get_result(conn)
        .unwrap()
}

#[test]
fn activation_archives_the_prior_active_manifest() {
    let (_db, mut conn) = setup_db();

    ingest_active(&mut conn, DEALER, "IMP-1", &[raw(VIN_A, DEALER)], ts(2025, 1, 20));
    assert_eq!(active_count(&mut conn), 1);

    ingest_active(&mut conn, DEALER, "IMP-2", &[raw(VIN_B, DEALER)], ts(2025, 1, 21));
    assert_eq!(active_count(&mut conn), 1);

    let first = manifests::get_manifest(&mut conn, "IMP-1").unwrap().unwrap();
    let second = manifests::get_manifest(&mut conn, "IMP-2").unwrap().unwrap();
    assert_eq!(first.status, "archived");
    assert_eq!(second.status, "active");
}

#[test]
fn duplicate_import_id_conflicts() {
    let (_db, mut conn) = setup_db();

    manifests::create_manifest(&mut conn, "IMP-1", ImportSource::Scrape, None, ts(2025, 1, 20))
        .unwrap();
    let err = manifests::create_manifest(
        &mut conn,
        "IMP-1",
        ImportSource::CsvUpload,
        None,
        ts(2025, 1, 21),
    )
    .unwrap_err();
    assert!(matches!(err, EngineError::IngestConflict { .. }));
}

#[test]
fn toggle_round_trip_keeps_at_most_one_active() {
    let (_db, mut conn) = setup_db();

    ingest_active(&mut conn, DEALER, "IMP-1", &[raw(VIN_A, DEALER)], ts(2025, 1, 20));
    ingest_active(&mut conn, DEALER, "IMP-2", &[raw(VIN_B, DEALER)], ts(2025, 1, 21));

    // Re-activate the archived import; the newer one archives in turn.
    ops::toggle_import_status(&mut conn, "IMP-1", "active").unwrap();
    assert_eq!(active_count(&mut conn), 1);
    assert_eq!(
        manifests::get_manifest(&mut conn, "IMP-2").unwrap().unwrap().status,
        "archived"
    );

    ops::toggle_import_status(&mut conn, "IMP-1", "archived").unwrap();
    assert_eq!(active_count(&mut conn), 0);

    let err = ops::toggle_import_status(&mut conn, "IMP-1", "frozen").unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));
}

#[test]
fn pending_manifest_is_invisible_to_the_resolver() {
    let (_db, mut conn) = setup_db();
    let out = tempfile::tempdir().unwrap();
    common::seed_dealership(
        &mut conn,
        DEALER,
        out.path(),
        &Default::default(),
        &Default::default(),
    );

    ingest_active(&mut conn, DEALER, "IMP-1", &[raw(VIN_A, DEALER)], ts(2025, 1, 20));

    // A second import stays pending: its rows must not back resolution.
    manifests::create_manifest(&mut conn, "IMP-2", ImportSource::Scrape, None, ts(2025, 1, 21))
        .unwrap();
    order_engine::ingest::ingest_batch(
        &mut conn,
        DEALER,
        "IMP-2",
        &[raw(VIN_B, DEALER)],
        ts(2025, 1, 21),
    )
    .unwrap();

    let resolution = resolver::resolve_cao(&mut conn, DEALER, ts(2025, 1, 21)).unwrap();
    assert_eq!(resolution.import_id, "IMP-1");
    // VIN_B's only observation sits in the pending import, so only VIN_A
    // backs the resolution.
    let vins: Vec<&str> = resolution.included.iter().map(|v| v.vin.as_str()).collect();
    assert_eq!(vins, vec![VIN_A]);

    assert_eq!(count(&mut conn, "import_manifests"), 2);
}

#[test]
fn no_active_manifest_is_invalid_input() {
    let (_db, mut conn) = setup_db();
    let out = tempfile::tempdir().unwrap();
    common::seed_dealership(
        &mut conn,
        DEALER,
        out.path(),
        &Default::default(),
        &Default::default(),
    );

    let err = resolver::resolve_cao(&mut conn, DEALER, ts(2025, 1, 20)).unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));
}
