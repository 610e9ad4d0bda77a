//! Order-run records.

use diesel::prelude::*;

use crate::error::EngineResult;
use crate::models::{NewOrderRunRow, OrderRunRow};
use crate::schema::order_runs::dsl as orr;

/// Records a run. Runs are immutable once written.
pub fn record_run(conn: &mut SqliteConnection, run: &NewOrderRunRow<'_>) -> EngineResult<()> {
    diesel::insert_into(orr::order_runs)
        .values(run)
        .execute(conn)?;
    Ok(())
}

/// Fetches a run by id.
pub fn get_run(conn: &mut SqliteConnection, run_id: &str) -> EngineResult<Option<OrderRunRow>> {
    Ok(orr::order_runs
        .find(run_id)
        .select(OrderRunRow::as_select())
        .first(conn)
        .optional()?)
}

/// All runs for a dealership, newest first.
pub fn runs_for_dealership(
    conn: &mut SqliteConnection,
    dealership: &str,
) -> EngineResult<Vec<OrderRunRow>> {
    Ok(orr::order_runs
        .filter(orr::dealership.eq(dealership))
        .select(OrderRunRow::as_select())
        .order(orr::created_at.desc())
        .load(conn)?)
}
