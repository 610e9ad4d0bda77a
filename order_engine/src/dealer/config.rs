//! Dealership catalog: parsing, normalization, and loading.
//!
//! This module defines a TOML-backed dealership catalog that describes, per
//! dealership:
//! - The active flag and artifact output root
//! - The QR payload template (`{vin}` / `{stock}` placeholders)
//! - Filtering rules (conditions, price/year bounds, make/model lists)
//! - Output rules (template type, quantity, sort order, graphic size)
//!
//! Key behaviors:
//! - Normalization trims dealership names, rejects duplicates that collide
//!   case-insensitively after trimming, and de-duplicates the make/model
//!   lists inside the filtering rules while preserving order.
//! - Inverted bounds (min above max) are handled per
//!   [`InvalidBoundsPolicy`]: dropped with a report count, or an error.
//! - Unknown per-dealership keys are preserved in `extra` and not acted
//!   upon; they survive a sync round-trip untouched.
//!
//! Entrypoints:
//! - Parse + normalize from a TOML string: [`load_catalog_str`]
//! - Parse + normalize from a file path: [`load_catalog_path`]
//! - Normalization with explicit policy: [`normalize_catalog_with_policy`]
//! - Back-compat wrapper (drop invalid-bounds dealerships): [`normalize_catalog`]
//!
//! The normalized shape is what [`crate::dealer::sync`] writes into the
//! [`crate::schema::dealerships`] table.

use std::collections::HashSet;

use anyhow::{Context, bail};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use toml::from_str;

use crate::emitter::OutputRules;
use crate::filter::FilterRules;

/// Top-level catalog mapping dealership names to their configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Catalog {
    /// Map of dealership display name -> configuration.
    ///
    /// Names are trimmed by [`normalize_catalog_with_policy`].
    pub dealerships: IndexMap<String, DealershipCfg>,
}

/// Configuration payload for one dealership.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DealershipCfg {
    /// Whether the dealership takes part in scheduled scrapes and orders.
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Root directory for this dealership's artifact output.
    pub qr_output_path: String,
    /// QR payload template, e.g. `"https://vin.example.com/{vin}"`.
    pub url_template: String,
    /// Filtering rules applied by the CAO resolver.
    #[serde(default)]
    pub filtering_rules: FilterRules,
    /// Output rules applied by the artifact emitter.
    #[serde(default)]
    pub output_rules: OutputRules,
    /// Unknown keys, preserved but not acted upon.
    #[serde(flatten)]
    pub extra: IndexMap<String, toml::Value>,
}

fn default_true() -> bool {
    true
}

/// Summary of changes performed during normalization.
///
/// All counters are additive for the processed catalog.
#[derive(Debug, Default)]
pub struct NormalizationReport {
    /// Number of dealership names that changed when trimming.
    pub dealerships_renamed: usize,
    /// Count of removed duplicate entries across the make lists.
    pub makes_deduped: usize,
    /// Count of removed duplicate entries in the model exclusion lists.
    pub models_deduped: usize,
    /// Count of dealerships dropped for inverted bounds (Drop policy).
    pub invalid_bounds_dropped: usize,
}

/// Policy for dealerships whose filter bounds are inverted (min above max).
#[derive(Copy, Clone, Debug)]
pub enum InvalidBoundsPolicy {
    /// Drop the dealership from the catalog.
    Drop,
    /// Treat as an error.
    Error,
}

/// Normalize a catalog in-place with an explicit policy for inverted bounds.
///
/// What normalization does:
/// - Trim dealership names; reject empties and case-insensitive collisions
/// - Require a non-empty `qr_output_path` and a `url_template` containing a
///   `{vin}` or `{stock}` placeholder
/// - Deduplicate `exclude_makes` / `include_only_makes` / `exclude_models`
///   case-insensitively, preserving first-occurrence order
/// - Enforce `min ≤ max` for the price and year bounds (`Drop` vs `Error`)
///
/// Returns a [`NormalizationReport`] detailing the changes made.
pub fn normalize_catalog_with_policy(
    cat: &mut Catalog,
    policy: InvalidBoundsPolicy,
) -> anyhow::Result<NormalizationReport> {
    let mut report = NormalizationReport::default();

    let mut rebuilt: IndexMap<String, DealershipCfg> = IndexMap::new();
    let mut seen_lower: HashSet<String> = HashSet::new();
    let old = std::mem::take(&mut cat.dealerships);

    for (raw_name, mut cfg) in old {
        let name = raw_name.trim().to_string();
        if name.is_empty() {
            bail!("dealership name cannot be empty after trimming");
        }
        if name != raw_name {
            report.dealerships_renamed += 1;
        }
        if !seen_lower.insert(name.to_lowercase()) {
            bail!("duplicate dealership name after normalization: {name}");
        }

        if cfg.qr_output_path.trim().is_empty() {
            bail!("dealership '{name}': qr_output_path cannot be empty");
        }
        if !cfg.url_template.contains("{vin}") && !cfg.url_template.contains("{stock}") {
            bail!("dealership '{name}': url_template needs a {{vin}} or {{stock}} placeholder");
        }

        let rules = &mut cfg.filtering_rules;
        let inverted_price = matches!(
            (rules.min_price, rules.max_price),
            (Some(min), Some(max)) if min > max
        );
        let inverted_year = matches!(
            (rules.min_year, rules.max_year),
            (Some(min), Some(max)) if min > max
        );
        if inverted_price || inverted_year {
            match policy {
                InvalidBoundsPolicy::Drop => {
                    report.invalid_bounds_dropped += 1;
                    continue;
                }
                InvalidBoundsPolicy::Error => {
                    bail!("dealership '{name}': inverted filter bounds (min above max)");
                }
            }
        }

        report.makes_deduped += dedupe_ci(&mut rules.exclude_makes);
        report.makes_deduped += dedupe_ci(&mut rules.include_only_makes);
        report.models_deduped += dedupe_ci(&mut rules.exclude_models);

        rebuilt.insert(name, cfg);
    }

    cat.dealerships = rebuilt;
    Ok(report)
}

/// Trims entries and removes case-insensitive duplicates, preserving the
/// first occurrence. Returns the number of entries removed.
fn dedupe_ci(list: &mut Vec<String>) -> usize {
    let before = list.len();
    let mut seen = HashSet::new();
    list.retain_mut(|entry| {
        *entry = entry.trim().to_string();
        !entry.is_empty() && seen.insert(entry.to_lowercase())
    });
    before - list.len()
}

/// This calls [`normalize_catalog_with_policy`] using [`InvalidBoundsPolicy::Drop`]
/// so that dealerships with inverted bounds are silently dropped.
pub fn normalize_catalog(cat: &mut Catalog) -> anyhow::Result<NormalizationReport> {
    normalize_catalog_with_policy(cat, InvalidBoundsPolicy::Drop)
}

/// Parse and normalize a catalog from a TOML string.
///
/// Steps:
/// - Deserialize TOML into [`Catalog`]
/// - Normalize via [`normalize_catalog`]
///
/// Errors:
/// - TOML parse failures
/// - Normalization errors (see [`normalize_catalog_with_policy`])
pub fn load_catalog_str(toml_str: &str) -> anyhow::Result<Catalog> {
    let mut cat: Catalog = from_str(toml_str).context("failed to parse catalog TOML")?;
    let _report = normalize_catalog(&mut cat).context("normalize_catalog failed")?;
    Ok(cat)
}

/// Read a catalog TOML file from disk, parse, and normalize it.
///
/// See [`load_catalog_str`] for details on parsing and normalization.
pub fn load_catalog_path(path: impl AsRef<std::path::Path>) -> anyhow::Result<Catalog> {
    let text = std::fs::read_to_string(path.as_ref())
        .with_context(|| format!("read catalog file {}", path.as_ref().display()))?;
    load_catalog_str(&text)
}
