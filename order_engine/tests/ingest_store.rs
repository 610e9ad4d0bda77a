mod common;

use common::{assert_sqlite_pragmas, count, ingest_active, raw, setup_db, ts};
use diesel::prelude::*;
use order_engine::error::EngineError;
use order_engine::ingest::ingest_batch;
use order_engine::models::VehicleRow;
use order_engine::schema::vehicles::dsl as v;
use order_engine::store::manifests::{self, ImportSource};

const VIN_A: &str = "1HGCM82633A004352";
const VIN_B: &str = "5YJ3E1EA6KF316234";
const DEALER: &str = "Example Honda";

fn vehicle_row(conn: &mut SqliteConnection, vin: &str) -> VehicleRow {
    v::vehicles
        .filter(v::vin.eq(vin))
        .filter(v::location.eq(DEALER))
        .select(VehicleRow::as_select())
        .first(conn)
        .expect("vehicle row")
}

#[test]
fn first_ingest_creates_raw_and_normalized_rows() {
    let (_db, mut conn) = setup_db();
    assert_sqlite_pragmas(&mut conn);

    let rows = vec![raw(VIN_A, DEALER), raw(VIN_B, DEALER)];
    let outcome = ingest_active(&mut conn, DEALER, "IMP-1", &rows, ts(2025, 1, 20));

    assert_eq!(outcome.raw_rows, 2);
    assert_eq!(outcome.inserted, 2);
    assert_eq!(outcome.updated, 0);
    assert_eq!(count(&mut conn, "raw_vehicles"), 2);
    assert_eq!(count(&mut conn, "vehicles"), 2);

    let row = vehicle_row(&mut conn, VIN_A);
    assert_eq!(row.scrape_count, 1);
    assert_eq!(row.first_scraped, row.last_scraped);
    assert_eq!(row.price, Some(30499.0));
    assert_eq!(row.price_formatted, "$30,499");
    assert_eq!(row.mileage_formatted, "12,345 mi");
    assert_eq!(row.last_import_id, "IMP-1");
}

#[test]
fn double_ingest_bumps_scrape_count_and_nothing_else() {
    let (_db, mut conn) = setup_db();

    let rows = vec![raw(VIN_A, DEALER)];
    ingest_active(&mut conn, DEALER, "IMP-1", &rows, ts(2025, 1, 20));
    let before = vehicle_row(&mut conn, VIN_A);

    ingest_active(&mut conn, DEALER, "IMP-2", &rows, ts(2025, 1, 21));
    let after = vehicle_row(&mut conn, VIN_A);

    assert_eq!(after.scrape_count, 2);
    assert!(after.last_scraped > before.last_scraped);
    assert!(after.first_scraped <= after.last_scraped);
    assert_eq!(after.first_scraped, before.first_scraped);
    assert_eq!(after.last_import_id, "IMP-2");

    // Everything else unchanged.
    assert_eq!(after.stock, before.stock);
    assert_eq!(after.price, before.price);
    assert_eq!(after.mileage, before.mileage);
    assert_eq!(after.condition, before.condition);

    // Raw snapshots are append-only: one per ingest.
    assert_eq!(count(&mut conn, "raw_vehicles"), 2);
}

#[test]
fn null_observation_does_not_erase_prior_value() {
    let (_db, mut conn) = setup_db();

    ingest_active(&mut conn, DEALER, "IMP-1", &[raw(VIN_A, DEALER)], ts(2025, 1, 20));

    let mut gone_quiet = raw(VIN_A, DEALER);
    gone_quiet.price = Some("Call for price".into());
    gone_quiet.mileage = None;
    ingest_active(&mut conn, DEALER, "IMP-2", &[gone_quiet], ts(2025, 1, 21));

    let row = vehicle_row(&mut conn, VIN_A);
    assert_eq!(row.price, Some(30499.0), "null price must not erase");
    assert_eq!(row.price_formatted, "$30,499");
    assert_eq!(row.mileage, Some(12345));
    assert_eq!(row.scrape_count, 2);
}

#[test]
fn condition_change_overwrites() {
    let (_db, mut conn) = setup_db();

    ingest_active(&mut conn, DEALER, "IMP-1", &[raw(VIN_A, DEALER)], ts(2025, 1, 20));

    let mut certified = raw(VIN_A, DEALER);
    certified.condition = "Certified Pre-Owned".into();
    ingest_active(&mut conn, DEALER, "IMP-2", &[certified], ts(2025, 1, 21));

    assert_eq!(vehicle_row(&mut conn, VIN_A).condition, "certified");
}

#[test]
fn blank_vin_rows_are_kept_raw_but_not_normalized() {
    let (_db, mut conn) = setup_db();

    let mut incomplete = raw(VIN_A, DEALER);
    incomplete.vin = "".into();
    let outcome = ingest_active(&mut conn, DEALER, "IMP-1", &[incomplete], ts(2025, 1, 20));

    assert_eq!(outcome.raw_rows, 1);
    assert_eq!(outcome.skipped_blank_vin, 1);
    assert_eq!(count(&mut conn, "raw_vehicles"), 1);
    assert_eq!(count(&mut conn, "vehicles"), 0);
}

#[test]
fn ingest_into_finalized_import_conflicts() {
    let (_db, mut conn) = setup_db();

    ingest_active(&mut conn, DEALER, "IMP-1", &[raw(VIN_A, DEALER)], ts(2025, 1, 20));

    let err = ingest_batch(&mut conn, DEALER, "IMP-1", &[raw(VIN_B, DEALER)], ts(2025, 1, 20))
        .unwrap_err();
    match err {
        EngineError::IngestConflict { import_id, status } => {
            assert_eq!(import_id, "IMP-1");
            assert_eq!(status, "active");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unknown_import_is_invalid_input() {
    let (_db, mut conn) = setup_db();
    let err = ingest_batch(&mut conn, DEALER, "IMP-NONE", &[raw(VIN_A, DEALER)], ts(2025, 1, 20))
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));
}

#[test]
fn manifest_counts_accumulate_across_batches() {
    let (_db, mut conn) = setup_db();

    manifests::create_manifest(&mut conn, "IMP-1", ImportSource::Scrape, None, ts(2025, 1, 20))
        .unwrap();
    ingest_batch(&mut conn, DEALER, "IMP-1", &[raw(VIN_A, DEALER)], ts(2025, 1, 20)).unwrap();
    ingest_batch(
        &mut conn,
        "Example Toyota",
        "IMP-1",
        &[raw(VIN_B, "Example Toyota")],
        ts(2025, 1, 20),
    )
    .unwrap();
    manifests::activate_manifest(&mut conn, "IMP-1").unwrap();

    let manifest = manifests::get_manifest(&mut conn, "IMP-1").unwrap().unwrap();
    assert_eq!(manifest.status, "active");
    assert_eq!(manifest.vehicle_count, 2);
    assert_eq!(manifest.dealership_count, 2);
}
