//! One-shot retry for transient SQLite failures.
//!
//! Store operations outside ingest are short transactions; the only failures
//! worth retrying are lock contention ("database is locked" / "busy") while
//! another connection holds a write. Those get one retry after a short
//! pause, then surface as [`EngineError::StoreUnavailable`].

use std::time::Duration;

use diesel::result::Error as DieselError;

use crate::error::{EngineError, EngineResult};

const RETRY_PAUSE: Duration = Duration::from_millis(50);

/// Runs `op`, retrying once on a transient failure.
pub fn with_retry<T, F>(mut op: F) -> EngineResult<T>
where
    F: FnMut() -> Result<T, DieselError>,
{
    match op() {
        Ok(v) => Ok(v),
        Err(e) if is_transient(&e) => {
            tracing::warn!(error = %e, "transient store failure, retrying once");
            std::thread::sleep(RETRY_PAUSE);
            op().map_err(|source| EngineError::StoreUnavailable { source })
        }
        Err(e) => Err(EngineError::Store(e)),
    }
}

fn is_transient(e: &DieselError) -> bool {
    match e {
        DieselError::DatabaseError(_, info) => {
            let message = info.message();
            message.contains("locked") || message.contains("busy")
        }
        _ => false,
    }
}
