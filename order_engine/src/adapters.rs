//! Adapter registry that helps the runtime map dealership configs to
//! concrete inventory adapters.
//!
//! The adapter wiring lives in the catalog's preserved `extra` keys rather
//! than in code: a dealership with a `feed_url` key gets a
//! [`DealerApiAdapter`] built for it; dealerships without one are not
//! scrapeable (CSV import remains available for them).

use std::sync::Arc;

use inventory_ingestor::adapters::InventoryAdapter;
use inventory_ingestor::adapters::dealer_api::{DealerApiAdapter, DealerApiConfig};

use crate::error::{EngineError, EngineResult};
use crate::models::DealershipRow;

/// Builds the adapter for one dealership, or `None` when its config carries
/// no feed wiring.
pub fn build_adapter(
    row: &DealershipRow,
) -> EngineResult<Option<Arc<dyn InventoryAdapter>>> {
    let extra: serde_json::Value = serde_json::from_str(&row.extra)
        .map_err(|e| EngineError::Config(format!("extra keys for '{}': {e}", row.name)))?;

    let Some(feed_url) = extra.get("feed_url").and_then(|v| v.as_str()) else {
        return Ok(None);
    };

    let mut cfg = DealerApiConfig::open_feed(&row.name, feed_url, &row.name);
    if let Some(var) = extra.get("feed_api_key_env").and_then(|v| v.as_str()) {
        cfg.api_key_env = Some(var.to_string());
    }
    if let Some(size) = extra.get("feed_page_size").and_then(|v| v.as_u64()) {
        cfg.page_size = size as u32;
    }
    if let Some(count) = extra.get("expected_count").and_then(|v| v.as_u64()) {
        cfg.expected_count = Some(count as usize);
    }

    let adapter = DealerApiAdapter::new(cfg)
        .map_err(|e| EngineError::Config(format!("adapter for '{}': {e}", row.name)))?;
    Ok(Some(Arc::new(adapter)))
}

/// Builds adapters for the given dealership rows, skipping (with a log
/// line) the ones with no feed wiring.
pub fn build_adapters(rows: &[DealershipRow]) -> EngineResult<Vec<Arc<dyn InventoryAdapter>>> {
    let mut adapters = Vec::with_capacity(rows.len());
    for row in rows {
        match build_adapter(row)? {
            Some(adapter) => adapters.push(adapter),
            None => {
                tracing::warn!(dealership = %row.name, "no feed_url configured; skipping");
            }
        }
    }
    Ok(adapters)
}
