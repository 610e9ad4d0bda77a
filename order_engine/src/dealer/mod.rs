//! Dealership configuration: the TOML catalog, DB sync, and the runtime
//! snapshot cache.

pub mod cache;
pub mod config;
pub mod sync;

use std::path::PathBuf;

use crate::emitter::OutputRules;
use crate::error::{EngineError, EngineResult};
use crate::filter::FilterRules;
use crate::models::DealershipRow;

/// A dealership's configuration in runtime form, with the JSON rule columns
/// parsed into their typed structs.
#[derive(Debug, Clone, PartialEq)]
pub struct DealerConfig {
    /// Dealership display name.
    pub name: String,
    /// Active flag.
    pub is_active: bool,
    /// Parsed filtering rules.
    pub filtering_rules: FilterRules,
    /// Parsed output rules.
    pub output_rules: OutputRules,
    /// Root directory for artifact output.
    pub qr_output_path: PathBuf,
    /// QR payload template with `{vin}` / `{stock}` placeholders.
    pub url_template: String,
}

impl DealerConfig {
    /// Parses a stored row into runtime form.
    pub fn from_row(row: &DealershipRow) -> EngineResult<Self> {
        let filtering_rules: FilterRules = serde_json::from_str(&row.filtering_rules)
            .map_err(|e| EngineError::Config(format!("filtering_rules for '{}': {e}", row.name)))?;
        let output_rules: OutputRules = serde_json::from_str(&row.output_rules)
            .map_err(|e| EngineError::Config(format!("output_rules for '{}': {e}", row.name)))?;
        Ok(Self {
            name: row.name.clone(),
            is_active: row.is_active,
            filtering_rules,
            output_rules,
            qr_output_path: PathBuf::from(&row.qr_output_path),
            url_template: row.url_template.clone(),
        })
    }
}

/// Loads one dealership's configuration from the store.
pub fn load_dealer(
    conn: &mut diesel::SqliteConnection,
    dealership: &str,
) -> EngineResult<DealerConfig> {
    use diesel::prelude::*;

    use crate::schema::dealerships::dsl as d;

    let row: Option<DealershipRow> = d::dealerships
        .find(dealership)
        .select(DealershipRow::as_select())
        .first(conn)
        .optional()?;

    match row {
        Some(row) => DealerConfig::from_row(&row),
        None => Err(EngineError::UnknownDealership(dealership.to_string())),
    }
}
