#![allow(dead_code)]

use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use diesel::QueryableByName;
use diesel::prelude::*;
use diesel::sql_query;
use diesel::sql_types::{Integer, Text};
use inventory_ingestor::models::vehicle::RawVehicle;
use tempfile::TempDir;

use order_engine::db::{connection, migrate};
use order_engine::emitter::OutputRules;
use order_engine::filter::FilterRules;
use order_engine::ingest;
use order_engine::models::NewVinLogRow;
use order_engine::schema::dealerships;
use order_engine::store::manifests::{self, ImportSource};
use order_engine::store::vin_log;

#[derive(QueryableByName)]
struct JournalMode {
    #[diesel(sql_type = Text)]
    journal_mode: String,
}
#[derive(QueryableByName)]
struct ForeignKeys {
    #[diesel(sql_type = Integer)]
    foreign_keys: i32,
}
#[derive(QueryableByName)]
struct BusyTimeout {
    #[diesel(sql_type = Integer, column_name = "timeout")]
    busy_timeout: i32,
}

pub struct TestDb {
    _dir: TempDir, // keep alive for the life of the test
    pub path: String,
}

pub fn setup_db() -> (TestDb, SqliteConnection) {
    let dir = TempDir::new().expect("tempdir");
    let mut p = PathBuf::from(dir.path());
    p.push("test.db");
    let path = p.to_string_lossy().to_string();

    migrate::run_sqlite(&path).expect("migrations");

    let conn = connection::connect_sqlite(&path).expect("connect");
    (TestDb { _dir: dir, path }, conn)
}

pub fn assert_sqlite_pragmas(conn: &mut SqliteConnection) {
    let jm: JournalMode = sql_query("PRAGMA journal_mode;").get_result(conn).unwrap();
    assert_eq!(jm.journal_mode.to_lowercase(), "wal");

    let fk: ForeignKeys = sql_query("PRAGMA foreign_keys;").get_result(conn).unwrap();
    assert_eq!(fk.foreign_keys, 1);

    let bt: BusyTimeout = sql_query("PRAGMA busy_timeout;").get_result(conn).unwrap();
    assert_eq!(bt.busy_timeout, 5000);
}

pub fn count(conn: &mut SqliteConnection, table: &str) -> i64 {
    #[derive(QueryableByName)]
    struct C {
        #[diesel(sql_type = diesel::sql_types::BigInt)]
        c: i64,
    }
    let q = format!("SELECT COUNT(*) AS c FROM {table}");
    sql_query(q).get_result::<C>(conn).unwrap().c
}

/// Noon UTC on the given day: early morning in the service timezone, so the
/// local calendar date matches the UTC date.
pub fn ts(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
}

pub fn seed_dealership(
    conn: &mut SqliteConnection,
    name: &str,
    qr_root: &Path,
    rules: &FilterRules,
    output: &OutputRules,
) {
    diesel::insert_into(dealerships::table)
        .values((
            dealerships::name.eq(name),
            dealerships::is_active.eq(true),
            dealerships::filtering_rules.eq(serde_json::to_string(rules).unwrap()),
            dealerships::output_rules.eq(serde_json::to_string(output).unwrap()),
            dealerships::qr_output_path.eq(qr_root.to_string_lossy().to_string()),
            dealerships::url_template.eq("https://vin.example.com/{vin}"),
            dealerships::extra.eq("{}"),
        ))
        .execute(conn)
        .expect("seed dealership");
}

pub fn raw(vin: &str, location: &str) -> RawVehicle {
    RawVehicle {
        vin: vin.into(),
        stock: format!("S-{}", &vin[vin.len().saturating_sub(4)..]),
        year: Some(2022),
        make: "Honda".into(),
        model: "Accord".into(),
        trim: "EX-L".into(),
        price: Some("$30,499".into()),
        mileage: Some(12345),
        condition: "used".into(),
        exterior_color: "White".into(),
        location: location.into(),
        vehicle_url: format!("https://example.test/{vin}"),
        time_scraped: ts(2025, 1, 20),
    }
}

/// Creates a pending manifest, ingests one batch, and activates it.
pub fn ingest_active(
    conn: &mut SqliteConnection,
    dealership: &str,
    import_id: &str,
    rows: &[RawVehicle],
    now: DateTime<Utc>,
) -> ingest::IngestOutcome {
    manifests::create_manifest(conn, import_id, ImportSource::Scrape, None, now).expect("manifest");
    let outcome = ingest::ingest_batch(conn, dealership, import_id, rows, now).expect("ingest");
    manifests::activate_manifest(conn, import_id).expect("activate");
    outcome
}

/// Appends one VIN-log entry directly.
pub fn log_entry(
    conn: &mut SqliteConnection,
    dealership: &str,
    vin: &str,
    order_number: &str,
    processed_date: &str,
    order_type: &str,
    condition: Option<&str>,
) {
    vin_log::append_entries(
        conn,
        &[NewVinLogRow {
            dealership,
            vin,
            order_number,
            processed_date,
            order_type,
            condition,
        }],
    )
    .expect("log entry");
}
