//! Diesel models mapping to the database schema.
//!
//! These types mirror the tables defined in the embedded migrations and in
//! [`crate::schema`] for use with Diesel's Queryable/Insertable APIs:
//! - [`crate::schema::raw_vehicles`] — append-only scrape snapshots
//! - [`crate::schema::vehicles`] — normalized inventory keyed by (vin, location)
//! - [`crate::schema::vin_log`] — per-dealership processing history
//! - [`crate::schema::dealerships`] — catalog-backed dealership configs
//! - [`crate::schema::import_manifests`] — import lifecycle and counts
//! - [`crate::schema::order_runs`] — immutable emission records
//!
//! All timestamps are RFC3339 UTC strings (see [`crate::tz`]); VIN-log
//! `processed_date` is a calendar date (`YYYY-MM-DD`) in the service
//! timezone.

use diesel::prelude::*;

use crate::schema::*;

/// A row in [`crate::schema::raw_vehicles`]: one vehicle as scraped, never mutated.
#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = raw_vehicles, check_for_backend(diesel::sqlite::Sqlite))]
pub struct RawVehicleRow {
    /// Database primary key.
    pub id: i32,
    /// VIN as normalised (trimmed, uppercased); may be blank or short.
    pub vin: String,
    /// Dealer stock number; may be blank.
    pub stock: String,
    /// Model year, if it survived validation.
    pub year: Option<i32>,
    /// Vehicle make.
    pub make: String,
    /// Vehicle model.
    pub model: String,
    /// Trim level.
    pub trim: String,
    /// Asking price in dollars, if the site reported one.
    pub price: Option<f64>,
    /// Odometer miles, if reported.
    pub mileage: Option<i64>,
    /// Canonical condition string: "new" | "used" | "certified" | "unknown".
    pub condition: String,
    /// Exterior colour as reported.
    pub exterior_color: String,
    /// Dealership display name.
    pub location: String,
    /// Detail-page URL.
    pub vehicle_url: String,
    /// The import this snapshot belongs to.
    pub import_id: String,
    /// When the adapter observed the row (RFC3339 UTC).
    pub time_scraped: String,
}

/// Insertable form of [`RawVehicleRow`].
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = raw_vehicles)]
pub struct NewRawVehicleRow<'a> {
    /// VIN as normalised; may be blank or short.
    pub vin: &'a str,
    /// Dealer stock number.
    pub stock: &'a str,
    /// Model year, if valid.
    pub year: Option<i32>,
    /// Vehicle make.
    pub make: &'a str,
    /// Vehicle model.
    pub model: &'a str,
    /// Trim level.
    pub trim: &'a str,
    /// Asking price in dollars.
    pub price: Option<f64>,
    /// Odometer miles.
    pub mileage: Option<i64>,
    /// Canonical condition string.
    pub condition: &'a str,
    /// Exterior colour.
    pub exterior_color: &'a str,
    /// Dealership display name.
    pub location: &'a str,
    /// Detail-page URL.
    pub vehicle_url: &'a str,
    /// Owning import.
    pub import_id: &'a str,
    /// Observation time (RFC3339 UTC).
    pub time_scraped: &'a str,
}

/// A row in [`crate::schema::vehicles`]: the normalized view of one vehicle
/// at one dealership, upserted on every ingest.
#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, Selectable)]
#[diesel(table_name = vehicles, check_for_backend(diesel::sqlite::Sqlite))]
pub struct VehicleRow {
    /// Database primary key.
    pub id: i32,
    /// VIN (trimmed, uppercased). Unique together with `location`.
    pub vin: String,
    /// Dealer stock number.
    pub stock: String,
    /// Model year.
    pub year: Option<i32>,
    /// Vehicle make.
    pub make: String,
    /// Vehicle model.
    pub model: String,
    /// Trim level.
    pub trim: String,
    /// Asking price in dollars.
    pub price: Option<f64>,
    /// Odometer miles.
    pub mileage: Option<i64>,
    /// Canonical condition string.
    pub condition: String,
    /// Exterior colour.
    pub exterior_color: String,
    /// Dealership display name. Unique together with `vin`.
    pub location: String,
    /// Detail-page URL.
    pub vehicle_url: String,
    /// `"$30,499"` or `"N/A"`.
    pub price_formatted: String,
    /// `"12,345 mi"` or `"N/A"`.
    pub mileage_formatted: String,
    /// First observation time (RFC3339 UTC). Invariant: ≤ `last_scraped`.
    pub first_scraped: String,
    /// Most recent observation time (RFC3339 UTC).
    pub last_scraped: String,
    /// How many ingests have observed this vehicle. Invariant: ≥ 1.
    pub scrape_count: i32,
    /// The import that most recently observed this vehicle.
    pub last_import_id: String,
}

/// Insertable form of [`VehicleRow`] for first-time observations.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = vehicles)]
pub struct NewVehicleRow<'a> {
    /// VIN (trimmed, uppercased).
    pub vin: &'a str,
    /// Dealer stock number.
    pub stock: &'a str,
    /// Model year.
    pub year: Option<i32>,
    /// Vehicle make.
    pub make: &'a str,
    /// Vehicle model.
    pub model: &'a str,
    /// Trim level.
    pub trim: &'a str,
    /// Asking price in dollars.
    pub price: Option<f64>,
    /// Odometer miles.
    pub mileage: Option<i64>,
    /// Canonical condition string.
    pub condition: &'a str,
    /// Exterior colour.
    pub exterior_color: &'a str,
    /// Dealership display name.
    pub location: &'a str,
    /// Detail-page URL.
    pub vehicle_url: &'a str,
    /// Formatted price.
    pub price_formatted: &'a str,
    /// Formatted mileage.
    pub mileage_formatted: &'a str,
    /// First observation time (RFC3339 UTC).
    pub first_scraped: &'a str,
    /// Most recent observation time (RFC3339 UTC).
    pub last_scraped: &'a str,
    /// Initial scrape count (1).
    pub scrape_count: i32,
    /// Owning import.
    pub last_import_id: &'a str,
}

/// A row in [`crate::schema::vin_log`]: one processed-VIN record at one
/// dealership. `(dealership, vin, processed_date)` is unique.
#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, Selectable)]
#[diesel(table_name = vin_log, check_for_backend(diesel::sqlite::Sqlite))]
pub struct VinLogRow {
    /// Database primary key.
    pub id: i32,
    /// Owning dealership.
    pub dealership: String,
    /// Processed VIN.
    pub vin: String,
    /// Order/run identifier the VIN was processed under.
    pub order_number: String,
    /// Calendar date of processing (`YYYY-MM-DD`, service timezone).
    pub processed_date: String,
    /// "BASELINE" | "CAO" | "LIST".
    pub order_type: String,
    /// Vehicle condition at processing time, when known.
    pub condition: Option<String>,
}

/// Insertable form of [`VinLogRow`].
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = vin_log)]
pub struct NewVinLogRow<'a> {
    /// Owning dealership.
    pub dealership: &'a str,
    /// Processed VIN.
    pub vin: &'a str,
    /// Order/run identifier.
    pub order_number: &'a str,
    /// Calendar date of processing (`YYYY-MM-DD`).
    pub processed_date: &'a str,
    /// "BASELINE" | "CAO" | "LIST".
    pub order_type: &'a str,
    /// Vehicle condition at processing time, when known.
    pub condition: Option<&'a str>,
}

/// A row in [`crate::schema::dealerships`]: one dealership's configuration.
///
/// `filtering_rules` and `output_rules` are JSON renderings of the typed
/// structs in [`crate::filter`] and [`crate::emitter`]; `extra` preserves
/// unknown catalog keys without acting on them.
#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, Selectable)]
#[diesel(table_name = dealerships, primary_key(name), check_for_backend(diesel::sqlite::Sqlite))]
pub struct DealershipRow {
    /// Dealership display name (primary key).
    pub name: String,
    /// Inactive dealerships are skipped by scheduled scrapes and hidden
    /// from the config cache.
    pub is_active: bool,
    /// JSON-encoded [`crate::filter::FilterRules`].
    pub filtering_rules: String,
    /// JSON-encoded [`crate::emitter::OutputRules`].
    pub output_rules: String,
    /// Root directory for this dealership's artifact output.
    pub qr_output_path: String,
    /// QR payload template with `{vin}` / `{stock}` placeholders.
    pub url_template: String,
    /// Unknown catalog keys, preserved verbatim (JSON object).
    pub extra: String,
}

/// Insertable/changeset form of [`DealershipRow`].
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = dealerships)]
pub struct NewDealershipRow<'a> {
    /// Dealership display name.
    pub name: &'a str,
    /// Active flag.
    pub is_active: bool,
    /// JSON-encoded filter rules.
    pub filtering_rules: &'a str,
    /// JSON-encoded output rules.
    pub output_rules: &'a str,
    /// Artifact output root.
    pub qr_output_path: &'a str,
    /// QR payload template.
    pub url_template: &'a str,
    /// Preserved unknown keys (JSON object).
    pub extra: &'a str,
}

/// A row in [`crate::schema::import_manifests`]: one import's lifecycle.
///
/// Status walks `pending` → `active` → `archived`; a partial unique index
/// keeps at most one row `active`. `pending` rows are invisible to the
/// resolver.
#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, Selectable)]
#[diesel(table_name = import_manifests, primary_key(import_id), check_for_backend(diesel::sqlite::Sqlite))]
pub struct ImportManifestRow {
    /// Import identifier (primary key).
    pub import_id: String,
    /// When the import was created (RFC3339 UTC).
    pub import_date: String,
    /// "scrape" | "csv_upload".
    pub import_source: String,
    /// Uploaded file name for CSV imports.
    pub file_name: Option<String>,
    /// "pending" | "active" | "archived".
    pub status: String,
    /// Raw rows written under this import.
    pub vehicle_count: i32,
    /// Distinct dealerships covered by this import.
    pub dealership_count: i32,
}

/// Insertable form of [`ImportManifestRow`].
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = import_manifests)]
pub struct NewImportManifestRow<'a> {
    /// Import identifier.
    pub import_id: &'a str,
    /// Creation time (RFC3339 UTC).
    pub import_date: &'a str,
    /// "scrape" | "csv_upload".
    pub import_source: &'a str,
    /// Uploaded file name for CSV imports.
    pub file_name: Option<&'a str>,
    /// Initial status (always "pending").
    pub status: &'a str,
}

/// A row in [`crate::schema::order_runs`]: one emission, immutable once
/// recorded except for the `FILES_EMITTED_NO_LOG` remediation marker.
#[derive(Debug, Clone, PartialEq, Queryable, Identifiable, Selectable)]
#[diesel(table_name = order_runs, primary_key(run_id), check_for_backend(diesel::sqlite::Sqlite))]
pub struct OrderRunRow {
    /// Run identifier; also the artifact directory name.
    pub run_id: String,
    /// Dealership the run was produced for.
    pub dealership: String,
    /// "CAO" | "LIST".
    pub mode: String,
    /// Template the CSV was rendered with.
    pub template_type: String,
    /// Creation time (RFC3339 UTC).
    pub created_at: String,
    /// Vehicles included in the run.
    pub vehicle_count: i32,
    /// Absolute path of the emitted CSV.
    pub csv_path: String,
    /// Absolute path of the directory holding the QR PNGs.
    pub qr_dir: String,
    /// "COMPLETED" | "FILES_EMITTED_NO_LOG".
    pub status: String,
    /// Operator-facing note (remediation details).
    pub note: Option<String>,
}

/// Insertable form of [`OrderRunRow`].
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = order_runs)]
pub struct NewOrderRunRow<'a> {
    /// Run identifier.
    pub run_id: &'a str,
    /// Dealership.
    pub dealership: &'a str,
    /// "CAO" | "LIST".
    pub mode: &'a str,
    /// Template type.
    pub template_type: &'a str,
    /// Creation time (RFC3339 UTC).
    pub created_at: &'a str,
    /// Vehicles included.
    pub vehicle_count: i32,
    /// Emitted CSV path.
    pub csv_path: &'a str,
    /// QR directory path.
    pub qr_dir: &'a str,
    /// Run status.
    pub status: &'a str,
    /// Operator-facing note.
    pub note: Option<&'a str>,
}
