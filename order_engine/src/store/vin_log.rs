//! VIN-log reads and the linearizable append.
//!
//! One log per dealership; `(dealership, vin, processed_date)` is unique.
//! The BASELINE order type marks inventory that already carried graphics
//! before the system began tracking.

use std::collections::{HashMap, HashSet};

use diesel::prelude::*;

use crate::error::EngineResult;
use crate::models::{NewVinLogRow, VinLogRow};
use crate::schema::vin_log::dsl as vl;

/// Order type marking pre-existing processed inventory.
pub const ORDER_TYPE_BASELINE: &str = "BASELINE";

/// Appends entries on the current connection.
///
/// Callers are expected to hold a transaction so the append is atomic with
/// whatever record accompanies it (the emitter pairs it with the order-run
/// insert). A same-day re-run for the same VIN updates the existing row
/// (latest order number wins) instead of violating the uniqueness
/// invariant. Returns the number of entries written.
pub fn append_entries(
    conn: &mut SqliteConnection,
    entries: &[NewVinLogRow<'_>],
) -> EngineResult<usize> {
    let mut written = 0;
    for entry in entries {
        written += diesel::insert_into(vl::vin_log)
            .values(entry)
            .on_conflict((vl::dealership, vl::vin, vl::processed_date))
            .do_update()
            .set((
                vl::order_number.eq(entry.order_number),
                vl::order_type.eq(entry.order_type),
                vl::condition.eq(entry.condition),
            ))
            .execute(conn)?;
    }
    Ok(written)
}

/// All log entries for one dealership, keyed by VIN.
pub fn entries_by_vin(
    conn: &mut SqliteConnection,
    dealership: &str,
) -> EngineResult<HashMap<String, Vec<VinLogRow>>> {
    let rows: Vec<VinLogRow> = vl::vin_log
        .filter(vl::dealership.eq(dealership))
        .select(VinLogRow::as_select())
        .order(vl::processed_date.asc())
        .load(conn)?;

    let mut map: HashMap<String, Vec<VinLogRow>> = HashMap::new();
    for row in rows {
        map.entry(row.vin.clone()).or_default().push(row);
    }
    Ok(map)
}

/// Which of `vins` appear in any *other* dealership's log.
///
/// This backs the cross-dealership move rule; the comparison is by VIN only.
pub fn vins_known_elsewhere(
    conn: &mut SqliteConnection,
    dealership: &str,
    vins: &[String],
) -> EngineResult<HashSet<String>> {
    if vins.is_empty() {
        return Ok(HashSet::new());
    }
    let rows: Vec<String> = vl::vin_log
        .filter(vl::dealership.ne(dealership))
        .filter(vl::vin.eq_any(vins))
        .select(vl::vin)
        .distinct()
        .load(conn)?;
    Ok(rows.into_iter().collect())
}

/// All entries for one dealership in insertion-friendly export order.
pub fn entries_for_dealership(
    conn: &mut SqliteConnection,
    dealership: &str,
) -> EngineResult<Vec<VinLogRow>> {
    Ok(vl::vin_log
        .filter(vl::dealership.eq(dealership))
        .select(VinLogRow::as_select())
        .order((vl::processed_date.asc(), vl::vin.asc()))
        .load(conn)?)
}
