//! Variable-data CSV rendering for the downstream print workflow.
//!
//! Format contract: UTF-8, CRLF line endings, every field double-quoted,
//! header row first, columns in template order. One row per physical item —
//! a logical quantity of N expands to N identical rows whose `QUANTITY`
//! column is always `"1"`, because the printer counts rows, not quantities.

use csv::{QuoteStyle, Terminator, WriterBuilder};
use serde::{Deserialize, Serialize};

use crate::error::EngineResult;
use crate::models::VehicleRow;

/// The CSV template families the print shop runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateType {
    /// Window shortcut decal.
    #[default]
    Shortcut,
    /// Shortcut pack; carries the size column and therefore the
    /// static-size constraint.
    ShortcutPack,
    /// Flyout hanger with the asking price.
    Flyout,
}

impl TemplateType {
    /// Stored string form (matches the serde rendering).
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateType::Shortcut => "shortcut",
            TemplateType::ShortcutPack => "shortcut_pack",
            TemplateType::Flyout => "flyout",
        }
    }

    /// Column order for this template.
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            TemplateType::Shortcut => {
                &["YEARMAKE", "MODEL", "TRIM", "STOCK", "VIN", "QRPATH", "QUANTITY"]
            }
            TemplateType::ShortcutPack => {
                &["YEARMAKE", "MODEL", "TRIM", "STOCK", "VIN", "SIZE", "QRPATH", "QUANTITY"]
            }
            TemplateType::Flyout => {
                &["YEARMAKE", "MODEL", "TRIM", "STOCK", "VIN", "PRICE", "QRPATH", "QUANTITY"]
            }
        }
    }

    /// Whether the template carries the size column.
    pub fn has_size(&self) -> bool {
        matches!(self, TemplateType::ShortcutPack)
    }
}

/// One logical order line: a vehicle, its graphic size (when the template
/// carries one), and the operator's quantity.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    /// The included vehicle.
    pub vehicle: VehicleRow,
    /// Graphic size, e.g. `"Medium (STD)"`. Subject to the static-size
    /// constraint when present.
    pub graphic_size: Option<String>,
    /// Logical quantity; expanded into this many physical rows.
    pub quantity: u32,
}

/// Renders the order CSV for `items`, with `QRPATH` cells pointing into
/// `qr_dir`.
pub fn render_order_csv(
    template: TemplateType,
    items: &[OrderItem],
    qr_dir: &std::path::Path,
) -> EngineResult<Vec<u8>> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::CRLF)
        .from_writer(Vec::new());

    writer.write_record(template.columns())?;

    for item in items {
        let v = &item.vehicle;
        let year_make = match v.year {
            Some(year) => format!("{year} {}", v.make),
            None => v.make.clone(),
        };
        let qr_path = qr_dir.join(format!("{}.png", v.vin)).display().to_string();

        for _ in 0..item.quantity.max(1) {
            let mut record: Vec<String> = vec![
                year_make.clone(),
                v.model.clone(),
                v.trim.clone(),
                v.stock.clone(),
                v.vin.clone(),
            ];
            match template {
                TemplateType::Shortcut => {}
                TemplateType::ShortcutPack => {
                    record.push(item.graphic_size.clone().unwrap_or_default());
                }
                TemplateType::Flyout => {
                    record.push(v.price_formatted.clone());
                }
            }
            record.push(qr_path.clone());
            record.push("1".to_string());
            writer.write_record(&record)?;
        }
    }

    writer
        .into_inner()
        .map_err(|e| crate::error::EngineError::Config(format!("csv buffer: {e}")))
}
