//! Normalized-inventory reads.

use diesel::prelude::*;

use crate::db::retry::with_retry;
use crate::error::EngineResult;
use crate::models::VehicleRow;
use crate::schema::vehicles::dsl as v;

/// A dealership's active inventory: rows whose most recent observation came
/// from the given (active) import.
///
/// Read while scrape sessions may be writing, so it goes through the
/// transient-failure retry.
pub fn active_inventory(
    conn: &mut SqliteConnection,
    dealership: &str,
    import_id: &str,
) -> EngineResult<Vec<VehicleRow>> {
    with_retry(|| {
        v::vehicles
            .filter(v::location.eq(dealership))
            .filter(v::last_import_id.eq(import_id))
            .select(VehicleRow::as_select())
            .order(v::vin.asc())
            .load(conn)
    })
}

/// The subset of `vins` present in a dealership's active inventory.
pub fn active_inventory_by_vins(
    conn: &mut SqliteConnection,
    dealership: &str,
    import_id: &str,
    vins: &[String],
) -> EngineResult<Vec<VehicleRow>> {
    with_retry(|| {
        v::vehicles
            .filter(v::location.eq(dealership))
            .filter(v::last_import_id.eq(import_id))
            .filter(v::vin.eq_any(vins))
            .select(VehicleRow::as_select())
            .order(v::vin.asc())
            .load(conn)
    })
}

/// One vehicle row by its (vin, location) identity, regardless of import.
pub fn find_vehicle(
    conn: &mut SqliteConnection,
    vin: &str,
    dealership: &str,
) -> EngineResult<Option<VehicleRow>> {
    Ok(v::vehicles
        .filter(v::vin.eq(vin))
        .filter(v::location.eq(dealership))
        .select(VehicleRow::as_select())
        .first(conn)
        .optional()?)
}
