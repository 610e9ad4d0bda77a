//! Lock-free, read-mostly cache of active dealership configurations.
//!
//! Readers call [`get_dealer`], which loads an `Arc` snapshot with no
//! locking contention. Writers call [`refresh_dealers`] after syncing the
//! catalog (or editing a dealership) to atomically swap in a new snapshot —
//! this is what makes configuration refreshable without a restart.
//!
//! Implementation notes:
//! - Uses `arc-swap` for atomic pointer swaps + cheap reads (no RwLock).
//! - Initializes to an empty map; until you call `refresh_dealers`, all
//!   lookups return `None`.
//! - Only active dealerships enter the snapshot; resolving against an
//!   inactive dealership goes through the store directly.

use std::{collections::HashMap, sync::Arc};

use arc_swap::ArcSwap;
use diesel::prelude::*;
use once_cell::sync::Lazy;

use crate::dealer::DealerConfig;
use crate::models::DealershipRow;
use crate::schema::dealerships::dsl as d;

/// Snapshot type held inside the cache.
type DealerMap = HashMap<String, Arc<DealerConfig>>;

/// Global cache: starts empty; refreshed by `refresh_dealers`.
static ACTIVE: Lazy<ArcSwap<DealerMap>> = Lazy::new(|| ArcSwap::from_pointee(DealerMap::new()));

/// Returns the cached configuration for an active dealership, if present.
///
/// Fast path: one atomic load + a HashMap lookup. No database access.
///
/// Note: returns `None` until someone calls `refresh_dealers`.
pub fn get_dealer(name: &str) -> Option<Arc<DealerConfig>> {
    ACTIVE.load().get(name).cloned()
}

/// Rebuilds the snapshot from the database and atomically swaps it in.
///
/// Call this after `dealer::sync` finishes, or at app start. It's safe to
/// call from any thread; readers see either the old or new snapshot.
pub fn refresh_dealers(conn: &mut SqliteConnection) -> anyhow::Result<()> {
    let rows: Vec<DealershipRow> = d::dealerships
        .filter(d::is_active.eq(true))
        .select(DealershipRow::as_select())
        .load(conn)?;

    let mut new_map = DealerMap::with_capacity(rows.len());
    for row in &rows {
        let cfg = DealerConfig::from_row(row)?;
        new_map.insert(cfg.name.clone(), Arc::new(cfg));
    }

    ACTIVE.store(Arc::new(new_map));
    Ok(())
}

/// Clears the cache to an empty map. Useful for tests.
pub fn clear_dealer_cache() {
    ACTIVE.store(Arc::new(DealerMap::new()));
}

/// Returns an `Arc` snapshot (if a caller needs to iterate or inspect).
pub fn snapshot() -> Arc<DealerMap> {
    ACTIVE.load_full()
}
