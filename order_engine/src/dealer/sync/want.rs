use std::collections::BTreeMap;

use anyhow::Context;

use crate::dealer::config::Catalog;

/// The DB-shaped form of one dealership: rule structs rendered to the
/// canonical JSON stored in the text columns, so desired and current state
/// compare as plain strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DealerSpec {
    /// Active flag.
    pub is_active: bool,
    /// JSON-encoded filter rules.
    pub filtering_rules: String,
    /// JSON-encoded output rules.
    pub output_rules: String,
    /// Artifact output root.
    pub qr_output_path: String,
    /// QR payload template.
    pub url_template: String,
    /// Preserved unknown keys (JSON object).
    pub extra: String,
}

pub fn wanted_from_catalog(cat: &Catalog) -> anyhow::Result<BTreeMap<String, DealerSpec>> {
    let mut want = BTreeMap::new();
    for (name, cfg) in &cat.dealerships {
        let spec = DealerSpec {
            is_active: cfg.is_active,
            filtering_rules: serde_json::to_string(&cfg.filtering_rules)
                .with_context(|| format!("serialize filtering_rules for '{name}'"))?,
            output_rules: serde_json::to_string(&cfg.output_rules)
                .with_context(|| format!("serialize output_rules for '{name}'"))?,
            qr_output_path: cfg.qr_output_path.clone(),
            url_template: cfg.url_template.clone(),
            extra: serde_json::to_string(&cfg.extra)
                .with_context(|| format!("serialize extra keys for '{name}'"))?,
        };
        want.insert(name.clone(), spec);
    }
    Ok(want)
}
