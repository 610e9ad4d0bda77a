//! Dealership catalog synchronization.
//!
//! ## What this does
//! - Parses a [`Catalog`] (TOML) and **normalizes** it (trim, dedupe, bound checks).
//! - Computes a **diff** between TOML (desired) and the DB (current).
//! - Applies the diff with UPSERTs (idempotent) and optional **prune** deletes.
//!
//! ## Transactions & consistency
//! Everything runs inside a single **`BEGIN IMMEDIATE`** transaction via
//! `SqliteConnection::immediate_transaction`. This reduces `SQLITE_BUSY`
//! surprises and ensures we either apply the whole diff or none of it.
//!
//! ## Dry-run
//! When `SyncOptions::dry_run` is `true`, we return a structured
//! [`DealerDiff`] and do **not** write anything. Callers can pretty-print
//! the diff or log it.

mod apply;
mod diff;
mod read;
mod want;

pub use diff::DealerDiff;
pub use want::DealerSpec;

use diesel::SqliteConnection;

use crate::dealer::config::{Catalog, normalize_catalog};
use crate::dealer::sync::apply::apply_diff;
use crate::dealer::sync::diff::make_diff;
use crate::dealer::sync::read::read_current;
use crate::dealer::sync::want::wanted_from_catalog;

/// Options for dealership catalog synchronization.
pub struct SyncOptions {
    /// If true, compute the diff only and print/log what would change.
    pub dry_run: bool,
    /// If true, delete dealerships from the DB that are not in the TOML.
    pub prune: bool,
}

/// Sync the dealership catalog into SQLite.
///
/// - Reads a TOML [`Catalog`], normalizes it, and UPSERTs dealership rows.
/// - When `opt.prune` is true, removes dealerships not present in the TOML.
/// - Runs in a single immediate transaction to reduce SQLITE_BUSY surprises.
///
/// Callers that serve readers from the snapshot cache should follow up with
/// [`crate::dealer::cache::refresh_dealers`].
pub fn sync_dealerships(
    conn: &mut SqliteConnection,
    mut cat: Catalog,
    opt: SyncOptions,
) -> anyhow::Result<DealerDiff> {
    let _ = normalize_catalog(&mut cat)?;

    let want = wanted_from_catalog(&cat)?;
    let cur = read_current(conn)?;
    let diff = make_diff(&want, &cur, opt.prune);

    if opt.dry_run {
        return Ok(diff);
    }

    // one-shot transactional apply, BEGIN IMMEDIATE
    conn.immediate_transaction::<_, anyhow::Error, _>(|tx| apply_diff(tx, &diff))?;

    Ok(diff)
}
