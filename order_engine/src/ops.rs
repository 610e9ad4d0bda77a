//! Operator surface — the library contract the external HTTP layer calls.
//!
//! Everything here is a plain function over a connection: search and
//! history queries with pagination and facet counts, bulk CSV import as the
//! alternative to scraping, manifest status toggling, and VIN-log
//! import/export. No HTTP, no sessions; the transport layer owns those.

use std::io::Read;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use inventory_ingestor::models::vehicle::RawVehicle;

use crate::error::{EngineError, EngineResult};
use crate::ingest;
use crate::models::{DealershipRow, NewVinLogRow, RawVehicleRow, VehicleRow, VinLogRow};
use crate::schema::raw_vehicles::dsl as rv;
use crate::schema::vehicles::dsl as v;
use crate::store::manifests::{self, ImportSource};
use crate::store::vin_log;
use crate::tz;

/// All configured dealerships, active first, then by name.
pub fn list_dealerships(conn: &mut SqliteConnection) -> EngineResult<Vec<DealershipRow>> {
    use crate::schema::dealerships::dsl as d;
    Ok(d::dealerships
        .select(DealershipRow::as_select())
        .order((d::is_active.desc(), d::name.asc()))
        .load(conn)?)
}

/// Optional narrowing filters for [`search_vehicles`].
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    /// Exact dealership display name.
    pub location: Option<String>,
    /// Exact model year.
    pub year: Option<i32>,
    /// Exact make (case-insensitive).
    pub make: Option<String>,
    /// Exact model (case-insensitive).
    pub model: Option<String>,
    /// Canonical condition string.
    pub condition: Option<String>,
    /// Only vehicles last scraped at or after this instant.
    pub scraped_after: Option<DateTime<Utc>>,
    /// Only vehicles last scraped at or before this instant.
    pub scraped_before: Option<DateTime<Utc>>,
}

/// Pagination window (1-based page index).
#[derive(Debug, Clone, Copy)]
pub struct Page {
    /// 1-based page number.
    pub page: usize,
    /// Rows per page.
    pub per_page: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self { page: 1, per_page: 50 }
    }
}

/// Sort orders offered by the search surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Most recently scraped first (default).
    #[default]
    LastScrapedDesc,
    /// Cheapest first; unpriced vehicles last.
    PriceAsc,
    /// Priciest first; unpriced vehicles last.
    PriceDesc,
    /// Newest model year first.
    YearDesc,
    /// VIN ascending.
    VinAsc,
}

/// Counts of each distinct value within the matching set, for the UI's
/// filter dropdowns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacetCounts {
    /// Per-location counts.
    pub locations: Vec<(String, usize)>,
    /// Per-make counts.
    pub makes: Vec<(String, usize)>,
    /// Per-condition counts.
    pub conditions: Vec<(String, usize)>,
    /// Per-year counts (vehicles with a known year).
    pub years: Vec<(i32, usize)>,
}

/// One page of search results.
#[derive(Debug, Clone)]
pub struct SearchPage {
    /// The page's rows.
    pub rows: Vec<VehicleRow>,
    /// Total matching rows across all pages.
    pub total: usize,
    /// Facet counts over the whole matching set.
    pub filter_option_counts: FacetCounts,
}

/// Free-text + filtered search over the normalized inventory.
///
/// The free-text query matches VIN, stock, make, and model
/// (case-insensitive substring). Facet counts cover the entire matching
/// set, not just the returned page.
pub fn search_vehicles(
    conn: &mut SqliteConnection,
    query: &str,
    filters: &SearchFilters,
    page: Page,
    sort: SortOrder,
) -> EngineResult<SearchPage> {
    let mut rows: Vec<VehicleRow> = {
        let mut q = v::vehicles.select(VehicleRow::as_select()).into_boxed();

        if let Some(location) = &filters.location {
            q = q.filter(v::location.eq(location.clone()));
        }
        if let Some(year) = filters.year {
            q = q.filter(v::year.eq(year));
        }
        if let Some(condition) = &filters.condition {
            q = q.filter(v::condition.eq(condition.to_lowercase()));
        }
        if let Some(after) = filters.scraped_after {
            q = q.filter(v::last_scraped.ge(tz::to_rfc3339_millis(after)));
        }
        if let Some(before) = filters.scraped_before {
            q = q.filter(v::last_scraped.le(tz::to_rfc3339_millis(before)));
        }
        q.load(conn)?
    };

    // Case-insensitive narrowing that SQLite's default collation won't do
    // for us; inventories are small enough to finish in memory.
    if let Some(make) = &filters.make {
        rows.retain(|r| r.make.eq_ignore_ascii_case(make));
    }
    if let Some(model) = &filters.model {
        rows.retain(|r| r.model.eq_ignore_ascii_case(model));
    }
    let needle = query.trim().to_lowercase();
    if !needle.is_empty() {
        rows.retain(|r| {
            r.vin.to_lowercase().contains(&needle)
                || r.stock.to_lowercase().contains(&needle)
                || r.make.to_lowercase().contains(&needle)
                || r.model.to_lowercase().contains(&needle)
        });
    }

    let filter_option_counts = facet_counts(&rows);
    let total = rows.len();

    match sort {
        SortOrder::LastScrapedDesc => {
            rows.sort_by(|a, b| b.last_scraped.cmp(&a.last_scraped));
        }
        SortOrder::PriceAsc => rows.sort_by(|a, b| {
            cmp_option_f64(a.price, b.price)
        }),
        SortOrder::PriceDesc => rows.sort_by(|a, b| {
            cmp_option_f64(b.price, a.price)
        }),
        SortOrder::YearDesc => rows.sort_by(|a, b| b.year.cmp(&a.year)),
        SortOrder::VinAsc => rows.sort_by(|a, b| a.vin.cmp(&b.vin)),
    }

    let per_page = page.per_page.max(1);
    let start = (page.page.max(1) - 1) * per_page;
    let rows = rows.into_iter().skip(start).take(per_page).collect();

    Ok(SearchPage {
        rows,
        total,
        filter_option_counts,
    })
}

fn cmp_option_f64(a: Option<f64>, b: Option<f64>) -> std::cmp::Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    }
}

fn facet_counts(rows: &[VehicleRow]) -> FacetCounts {
    use std::collections::BTreeMap;

    let mut locations: BTreeMap<String, usize> = BTreeMap::new();
    let mut makes: BTreeMap<String, usize> = BTreeMap::new();
    let mut conditions: BTreeMap<String, usize> = BTreeMap::new();
    let mut years: BTreeMap<i32, usize> = BTreeMap::new();

    for row in rows {
        *locations.entry(row.location.clone()).or_insert(0) += 1;
        *makes.entry(row.make.clone()).or_insert(0) += 1;
        *conditions.entry(row.condition.clone()).or_insert(0) += 1;
        if let Some(year) = row.year {
            *years.entry(year).or_insert(0) += 1;
        }
    }

    FacetCounts {
        locations: locations.into_iter().collect(),
        makes: makes.into_iter().collect(),
        conditions: conditions.into_iter().collect(),
        years: years.into_iter().collect(),
    }
}

/// Aggregate stats over a VIN-log query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VinLogStats {
    /// Entries matched.
    pub total_entries: usize,
    /// Distinct VINs matched.
    pub distinct_vins: usize,
    /// BASELINE entries matched.
    pub baseline: usize,
    /// CAO entries matched.
    pub cao: usize,
    /// LIST entries matched.
    pub list: usize,
}

/// One page of VIN-log history.
#[derive(Debug, Clone)]
pub struct VinHistoryPage {
    /// The page's entries.
    pub rows: Vec<VinLogRow>,
    /// Stats over the whole matching set.
    pub stats: VinLogStats,
}

/// A dealership's VIN-log history, newest first, with optional VIN
/// substring query and processed-date range (`YYYY-MM-DD` bounds).
pub fn vin_history(
    conn: &mut SqliteConnection,
    dealership: &str,
    query: &str,
    date_from: Option<&str>,
    date_to: Option<&str>,
    page: Page,
) -> EngineResult<VinHistoryPage> {
    let mut rows = vin_log::entries_for_dealership(conn, dealership)?;

    let needle = query.trim().to_uppercase();
    if !needle.is_empty() {
        rows.retain(|r| r.vin.contains(&needle));
    }
    if let Some(from) = date_from {
        tz::parse_date(from).map_err(|e| EngineError::InvalidInput(e.to_string()))?;
        rows.retain(|r| r.processed_date.as_str() >= from);
    }
    if let Some(to) = date_to {
        tz::parse_date(to).map_err(|e| EngineError::InvalidInput(e.to_string()))?;
        rows.retain(|r| r.processed_date.as_str() <= to);
    }

    let mut stats = VinLogStats {
        total_entries: rows.len(),
        ..Default::default()
    };
    let mut vins: std::collections::HashSet<&str> = std::collections::HashSet::new();
    for row in &rows {
        vins.insert(row.vin.as_str());
        match row.order_type.as_str() {
            "BASELINE" => stats.baseline += 1,
            "CAO" => stats.cao += 1,
            "LIST" => stats.list += 1,
            _ => {}
        }
    }
    stats.distinct_vins = vins.len();
    drop(vins);

    rows.sort_by(|a, b| (b.processed_date.as_str(), b.vin.as_str()).cmp(&(a.processed_date.as_str(), a.vin.as_str())));
    let per_page = page.per_page.max(1);
    let start = (page.page.max(1) - 1) * per_page;
    let rows = rows.into_iter().skip(start).take(per_page).collect();

    Ok(VinHistoryPage { rows, stats })
}

/// Every scrape of one VIN across all dealerships and imports.
#[derive(Debug, Clone)]
pub struct VehicleHistory {
    /// Snapshot rows, oldest first.
    pub scrapes: Vec<RawVehicleRow>,
    /// First time the VIN was ever observed.
    pub first_scraped: Option<String>,
    /// Total snapshot count.
    pub total_scrapes: usize,
}

/// Full scrape history for a VIN.
pub fn vehicle_history(conn: &mut SqliteConnection, vin: &str) -> EngineResult<VehicleHistory> {
    let vin = vin.trim().to_uppercase();
    if vin.is_empty() {
        return Err(EngineError::InvalidInput("empty vin".to_string()));
    }

    let scrapes: Vec<RawVehicleRow> = rv::raw_vehicles
        .filter(rv::vin.eq(&vin))
        .select(RawVehicleRow::as_select())
        .order(rv::time_scraped.asc())
        .load(conn)?;

    Ok(VehicleHistory {
        first_scraped: scrapes.first().map(|s| s.time_scraped.clone()),
        total_scrapes: scrapes.len(),
        scrapes,
    })
}

/// What a CSV inventory import produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportCsvOutcome {
    /// The new (now active) import.
    pub import_id: String,
    /// Raw rows ingested.
    pub vehicle_count: usize,
}

#[derive(Debug, serde::Deserialize)]
struct InventoryCsvRecord {
    vin: String,
    #[serde(default)]
    stock: String,
    year: Option<i32>,
    #[serde(default)]
    make: String,
    #[serde(default)]
    model: String,
    #[serde(default)]
    trim: String,
    price: Option<String>,
    mileage: Option<i64>,
    #[serde(default)]
    condition: String,
    #[serde(default)]
    exterior_color: String,
    location: Option<String>,
    #[serde(default)]
    vehicle_url: String,
}

/// Bulk-ingests an inventory CSV as the alternative to scraping, then
/// activates the new manifest (archiving the prior active one).
///
/// Each record needs a `location` column unless `dealership` overrides it
/// for the whole file.
pub fn import_csv<R: Read>(
    conn: &mut SqliteConnection,
    reader: R,
    dealership: Option<&str>,
    file_name: Option<&str>,
    now: DateTime<Utc>,
) -> EngineResult<ImportCsvOutcome> {
    let mut csv_reader = csv::Reader::from_reader(reader);

    // Group rows by dealership; one file may cover several lots.
    let mut by_location: indexmap::IndexMap<String, Vec<RawVehicle>> = indexmap::IndexMap::new();
    for (i, record) in csv_reader.deserialize::<InventoryCsvRecord>().enumerate() {
        let record = record.map_err(|e| {
            EngineError::InvalidInput(format!("csv record {}: {e}", i + 1))
        })?;
        let location = dealership
            .map(str::to_string)
            .or_else(|| record.location.clone())
            .ok_or_else(|| {
                EngineError::InvalidInput(format!(
                    "csv record {}: no location column and no dealership override",
                    i + 1
                ))
            })?;

        by_location.entry(location.clone()).or_default().push(RawVehicle {
            vin: record.vin,
            stock: record.stock,
            year: record.year,
            make: record.make,
            model: record.model,
            trim: record.trim,
            price: record.price,
            mileage: record.mileage,
            condition: record.condition,
            exterior_color: record.exterior_color,
            location,
            vehicle_url: record.vehicle_url,
            time_scraped: now,
        });
    }

    if by_location.is_empty() {
        return Err(EngineError::InvalidInput("csv contains no records".to_string()));
    }

    let import_id = format!(
        "IMP-CSV-{}-{:06}",
        now.format("%Y%m%d%H%M%S"),
        now.timestamp_subsec_micros() % 1_000_000
    );
    manifests::create_manifest(conn, &import_id, ImportSource::CsvUpload, file_name, now)?;

    let mut vehicle_count = 0;
    for (location, rows) in &by_location {
        let outcome = ingest::ingest_batch(conn, location, &import_id, rows, now)?;
        vehicle_count += outcome.raw_rows;
    }

    manifests::activate_manifest(conn, &import_id)?;

    Ok(ImportCsvOutcome {
        import_id,
        vehicle_count,
    })
}

/// Sets an import's status, enforcing at-most-one-active. Thin wrapper over
/// the store so the UI contract lives in one module.
pub fn toggle_import_status(
    conn: &mut SqliteConnection,
    import_id: &str,
    target: &str,
) -> EngineResult<()> {
    manifests::toggle_status(conn, import_id, target)
}

/// Options for [`import_vin_log`].
#[derive(Debug, Clone, Copy, Default)]
pub struct VinLogImportOptions {
    /// Silently skip records that already exist.
    pub skip_duplicates: bool,
    /// Overwrite existing records in place.
    pub update_existing: bool,
}

/// Counts returned by [`import_vin_log`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VinLogImportCounts {
    /// New entries inserted.
    pub imported: usize,
    /// Duplicates skipped.
    pub skipped: usize,
    /// Existing entries overwritten.
    pub updated: usize,
}

#[derive(Debug, serde::Deserialize)]
struct VinLogCsvRecord {
    vin: String,
    #[serde(default)]
    order_number: String,
    processed_date: String,
    #[serde(default = "default_order_type")]
    order_type: String,
    condition: Option<String>,
}

fn default_order_type() -> String {
    vin_log::ORDER_TYPE_BASELINE.to_string()
}

/// Bulk-appends entries to a dealership's VIN log (typically the BASELINE
/// load when onboarding a dealership).
pub fn import_vin_log<R: Read>(
    conn: &mut SqliteConnection,
    reader: R,
    dealership: &str,
    opts: VinLogImportOptions,
) -> EngineResult<VinLogImportCounts> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut records = Vec::new();
    for (i, record) in csv_reader.deserialize::<VinLogCsvRecord>().enumerate() {
        let mut record = record.map_err(|e| {
            EngineError::InvalidInput(format!("csv record {}: {e}", i + 1))
        })?;
        record.vin = record.vin.trim().to_uppercase();
        if record.vin.is_empty() {
            return Err(EngineError::InvalidInput(format!("csv record {}: empty vin", i + 1)));
        }
        tz::parse_date(&record.processed_date)
            .map_err(|e| EngineError::InvalidInput(format!("csv record {}: {e}", i + 1)))?;
        match record.order_type.as_str() {
            "BASELINE" | "CAO" | "LIST" => {}
            other => {
                return Err(EngineError::InvalidInput(format!(
                    "csv record {}: unknown order_type '{other}'",
                    i + 1
                )));
            }
        }
        records.push(record);
    }

    let dealership = dealership.to_string();
    conn.immediate_transaction::<_, EngineError, _>(|tx| {
        use crate::schema::vin_log::dsl as vl;

        let mut counts = VinLogImportCounts::default();
        for record in &records {
            let existing: Option<i32> = vl::vin_log
                .filter(vl::dealership.eq(&dealership))
                .filter(vl::vin.eq(&record.vin))
                .filter(vl::processed_date.eq(&record.processed_date))
                .select(vl::id)
                .first(tx)
                .optional()?;

            match existing {
                Some(id) if opts.update_existing => {
                    diesel::update(vl::vin_log.find(id))
                        .set((
                            vl::order_number.eq(&record.order_number),
                            vl::order_type.eq(&record.order_type),
                            vl::condition.eq(record.condition.as_deref()),
                        ))
                        .execute(tx)?;
                    counts.updated += 1;
                }
                Some(_) if opts.skip_duplicates => {
                    counts.skipped += 1;
                }
                Some(_) => {
                    return Err(EngineError::InvalidInput(format!(
                        "duplicate vin log entry: {} on {}",
                        record.vin, record.processed_date
                    )));
                }
                None => {
                    vin_log::append_entries(
                        tx,
                        &[NewVinLogRow {
                            dealership: &dealership,
                            vin: &record.vin,
                            order_number: &record.order_number,
                            processed_date: &record.processed_date,
                            order_type: &record.order_type,
                            condition: record.condition.as_deref(),
                        }],
                    )?;
                    counts.imported += 1;
                }
            }
        }
        Ok(counts)
    })
}

/// Exports a dealership's VIN log as CSV bytes.
pub fn export_vin_log(conn: &mut SqliteConnection, dealership: &str) -> EngineResult<Vec<u8>> {
    let rows = vin_log::entries_for_dealership(conn, dealership)?;

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["vin", "order_number", "processed_date", "order_type", "condition"])?;
    for row in rows {
        writer.write_record([
            row.vin.as_str(),
            row.order_number.as_str(),
            row.processed_date.as_str(),
            row.order_type.as_str(),
            row.condition.as_deref().unwrap_or(""),
        ])?;
    }
    writer
        .into_inner()
        .map_err(|e| EngineError::Config(format!("csv buffer: {e}")))
}

/// Exports every raw row of one import as CSV bytes.
pub fn export_scraper_import(
    conn: &mut SqliteConnection,
    import_id: &str,
) -> EngineResult<Vec<u8>> {
    if manifests::get_manifest(conn, import_id)?.is_none() {
        return Err(EngineError::InvalidInput(format!("unknown import '{import_id}'")));
    }

    let rows: Vec<RawVehicleRow> = rv::raw_vehicles
        .filter(rv::import_id.eq(import_id))
        .select(RawVehicleRow::as_select())
        .order((rv::location.asc(), rv::vin.asc()))
        .load(conn)?;

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "vin", "stock", "year", "make", "model", "trim", "price", "mileage", "condition",
        "exterior_color", "location", "vehicle_url", "time_scraped",
    ])?;
    for row in rows {
        let record = [
            row.vin,
            row.stock,
            row.year.map(|y| y.to_string()).unwrap_or_default(),
            row.make,
            row.model,
            row.trim,
            row.price.map(|p| p.to_string()).unwrap_or_default(),
            row.mileage.map(|m| m.to_string()).unwrap_or_default(),
            row.condition,
            row.exterior_color,
            row.location,
            row.vehicle_url,
            row.time_scraped,
        ];
        writer.write_record(&record)?;
    }
    writer
        .into_inner()
        .map_err(|e| EngineError::Config(format!("csv buffer: {e}")))
}
