//! Ingest — writes one batch of raw rows under an import and keeps the
//! normalized view current.
//!
//! All writes for a batch happen in one immediate transaction: raw inserts,
//! normalized upserts, and the manifest count bump either all land or none
//! do. A batch may only target a `pending` manifest; once a manifest is
//! activated or archived its row set is frozen and further batches fail
//! with `IngestConflict`. Ingest emits no artifacts and never touches the
//! VIN log.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use inventory_ingestor::models::vehicle::{NormalizedVehicle, RawVehicle};
use inventory_ingestor::normalizer;

use crate::error::{EngineError, EngineResult};
use crate::models::{NewRawVehicleRow, NewVehicleRow, VehicleRow};
use crate::schema::raw_vehicles::dsl as rv;
use crate::schema::vehicles::dsl as v;
use crate::store::manifests;
use crate::tz;

/// Raw rows per INSERT statement. 15 columns * 60 rows stays under the 999
/// bind limit of older SQLite builds.
const CHUNK_ROWS: usize = 60;

/// What one ingest batch did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestOutcome {
    /// Raw snapshot rows written.
    pub raw_rows: usize,
    /// Normalized rows inserted for the first time.
    pub inserted: usize,
    /// Normalized rows updated (scrape count bumped).
    pub updated: usize,
    /// Rows kept raw but skipped for the normalized view (blank VIN).
    pub skipped_blank_vin: usize,
    /// Normalizer warnings, tagged with the offending VIN (may be blank).
    pub warnings: Vec<(String, String)>,
}

/// Ingests one batch of raw rows for `dealership` under `import_id`.
///
/// Rows whose `location` disagrees with `dealership` are stamped with the
/// dealership anyway; the adapter name is advisory, the batch tag is
/// authoritative.
pub fn ingest_batch(
    conn: &mut SqliteConnection,
    dealership: &str,
    import_id: &str,
    rows: &[RawVehicle],
    now: DateTime<Utc>,
) -> EngineResult<IngestOutcome> {
    let manifest = manifests::get_manifest(conn, import_id)?.ok_or_else(|| {
        EngineError::InvalidInput(format!("unknown import '{import_id}'"))
    })?;
    if manifest.status != "pending" {
        return Err(EngineError::IngestConflict {
            import_id: import_id.to_string(),
            status: manifest.status,
        });
    }

    let mut normalized = Vec::with_capacity(rows.len());
    let mut outcome = IngestOutcome::default();
    for raw in rows {
        let result = normalizer::normalize(raw, now);
        for w in &result.warnings {
            outcome
                .warnings
                .push((result.vehicle.vin.clone(), format!("{}: {}", w.field, w.message)));
        }
        normalized.push(result.vehicle);
    }

    let now_str = tz::to_rfc3339_millis(now);
    let dealership = dealership.to_string();
    let import_id = import_id.to_string();

    // The adapter's observation time is authoritative on the snapshot row;
    // `now` only drives the normalized view's first/last bookkeeping.
    let scraped_times: Vec<String> = normalized
        .iter()
        .map(|n| tz::to_rfc3339_millis(n.time_scraped))
        .collect();

    conn.immediate_transaction::<_, EngineError, _>(|tx| {
        let raw_rows: Vec<NewRawVehicleRow<'_>> = normalized
            .iter()
            .zip(&scraped_times)
            .map(|(n, scraped_at)| NewRawVehicleRow {
                vin: &n.vin,
                stock: &n.stock,
                year: n.year,
                make: &n.make,
                model: &n.model,
                trim: &n.trim,
                price: n.price,
                mileage: n.mileage,
                condition: n.condition.as_str(),
                exterior_color: &n.exterior_color,
                location: &dealership,
                vehicle_url: &n.vehicle_url,
                import_id: &import_id,
                time_scraped: scraped_at,
            })
            .collect();

        for chunk in raw_rows.chunks(CHUNK_ROWS) {
            diesel::insert_into(rv::raw_vehicles).values(chunk).execute(tx)?;
        }
        outcome.raw_rows = raw_rows.len();

        for n in &normalized {
            if n.vin.is_empty() {
                outcome.skipped_blank_vin += 1;
                continue;
            }
            if upsert_normalized(tx, n, &dealership, &import_id, &now_str)? {
                outcome.inserted += 1;
            } else {
                outcome.updated += 1;
            }
        }

        manifests::bump_vehicle_count(tx, &import_id, outcome.raw_rows)?;
        Ok(())
    })?;

    tracing::info!(
        dealership = %dealership,
        import_id = %import_id,
        raw = outcome.raw_rows,
        inserted = outcome.inserted,
        updated = outcome.updated,
        "ingested batch"
    );
    Ok(outcome)
}

/// Upserts one normalized row. Returns true on first-time insert.
///
/// Update semantics: `last_scraped` and `last_import_id` always move,
/// `scrape_count` increments, and scalar fields take the latest non-null
/// (for text: non-empty) observation — a null never erases a prior value.
fn upsert_normalized(
    conn: &mut SqliteConnection,
    n: &NormalizedVehicle,
    dealership: &str,
    import_id: &str,
    now_str: &str,
) -> Result<bool, EngineError> {
    let existing: Option<VehicleRow> = v::vehicles
        .filter(v::vin.eq(&n.vin))
        .filter(v::location.eq(dealership))
        .select(VehicleRow::as_select())
        .first(conn)
        .optional()?;

    match existing {
        None => {
            let row = NewVehicleRow {
                vin: &n.vin,
                stock: &n.stock,
                year: n.year,
                make: &n.make,
                model: &n.model,
                trim: &n.trim,
                price: n.price,
                mileage: n.mileage,
                condition: n.condition.as_str(),
                exterior_color: &n.exterior_color,
                location: dealership,
                vehicle_url: &n.vehicle_url,
                price_formatted: &n.price_formatted,
                mileage_formatted: &n.mileage_formatted,
                first_scraped: now_str,
                last_scraped: now_str,
                scrape_count: 1,
                last_import_id: import_id,
            };
            diesel::insert_into(v::vehicles).values(&row).execute(conn)?;
            Ok(true)
        }
        Some(prev) => {
            let price = n.price.or(prev.price);
            let mileage = n.mileage.or(prev.mileage);
            let year = n.year.or(prev.year);
            let price_formatted = if n.price.is_some() {
                n.price_formatted.clone()
            } else {
                prev.price_formatted
            };
            let mileage_formatted = if n.mileage.is_some() {
                n.mileage_formatted.clone()
            } else {
                prev.mileage_formatted
            };

            diesel::update(v::vehicles.find(prev.id))
                .set((
                    v::stock.eq(keep_nonempty(&n.stock, &prev.stock)),
                    v::year.eq(year),
                    v::make.eq(keep_nonempty(&n.make, &prev.make)),
                    v::model.eq(keep_nonempty(&n.model, &prev.model)),
                    v::trim.eq(keep_nonempty(&n.trim, &prev.trim)),
                    v::price.eq(price),
                    v::mileage.eq(mileage),
                    v::condition.eq(n.condition.as_str()),
                    v::exterior_color.eq(keep_nonempty(&n.exterior_color, &prev.exterior_color)),
                    v::vehicle_url.eq(keep_nonempty(&n.vehicle_url, &prev.vehicle_url)),
                    v::price_formatted.eq(price_formatted),
                    v::mileage_formatted.eq(mileage_formatted),
                    v::last_scraped.eq(now_str),
                    v::scrape_count.eq(prev.scrape_count + 1),
                    v::last_import_id.eq(import_id),
                ))
                .execute(conn)?;
            Ok(false)
        }
    }
}

fn keep_nonempty(new: &str, prev: &str) -> String {
    if new.is_empty() {
        prev.to_string()
    } else {
        new.to_string()
    }
}
