//! Artifact emitter — turns a resolution into the print artifact set.
//!
//! Emission order:
//! 1. Pre-flight: the static-size check ([`EngineError::MixedSizeRejected`])
//!    runs before any file exists.
//! 2. Everything is staged under a `.tmp-<run_id>` directory beside the
//!    final location: one QR PNG per VIN, then `order.csv`.
//! 3. The staged directory is renamed into place — the artifact set appears
//!    atomically. Any staging failure removes the directory.
//! 4. Non-dry runs then append VIN-log entries and record the order run in
//!    one transaction. If that transaction fails after the rename, the run
//!    is recorded `FILES_EMITTED_NO_LOG` and surfaced as
//!    [`EngineError::PartialEmission`]; the files stay for recovery.
//!
//! Dry runs stage under a sibling `dry/` subtree and leave the store
//! byte-identical: no VIN-log entries, no order-run record.

mod csv;
mod qr;

pub use self::csv::{OrderItem, TemplateType, render_order_csv};
pub use self::qr::{QR_SIZE, QrKey, qr_payload, render_qr, write_qr};

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use diesel::SqliteConnection;
use serde::{Deserialize, Serialize};

use crate::dealer::DealerConfig;
use crate::error::{EngineError, EngineResult};
use crate::models::{NewOrderRunRow, NewVinLogRow};
use crate::resolver::Resolution;
use crate::store::{runs, vin_log};
use crate::tz;

/// A dealership's output rules: how the artifact set is shaped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputRules {
    /// CSV template family.
    pub template: TemplateType,
    /// Logical quantity per vehicle; expanded to unit rows in the CSV.
    pub quantity: u32,
    /// Graphic size for size-bearing templates. One size per order.
    pub graphic_size: Option<String>,
    /// Which vehicle field fills the QR URL template.
    pub qr_key: QrKey,
    /// Row ordering in the CSV.
    pub sort_by: SortKey,
}

impl Default for OutputRules {
    fn default() -> Self {
        Self {
            template: TemplateType::default(),
            quantity: 1,
            graphic_size: None,
            qr_key: QrKey::default(),
            sort_by: SortKey::default(),
        }
    }
}

/// CSV row ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// By stock number (default).
    #[default]
    Stock,
    /// By VIN.
    Vin,
    /// By model, then VIN.
    Model,
}

/// Options for one emission.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmitOptions {
    /// Dry run: produce files under `dry/` and persist nothing.
    pub skip_vin_logging: bool,
}

/// Terminal state of an emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Files and VIN-log entries landed.
    Completed,
    /// Files landed; the VIN-log write failed and needs an operator.
    FilesEmittedNoLog,
}

impl RunStatus {
    /// Stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Completed => "COMPLETED",
            RunStatus::FilesEmittedNoLog => "FILES_EMITTED_NO_LOG",
        }
    }
}

/// What an emission produced.
#[derive(Debug, Clone, PartialEq)]
pub struct EmitOutcome {
    /// Run identifier; also the artifact directory name.
    pub run_id: String,
    /// Path of the emitted CSV.
    pub csv_path: PathBuf,
    /// Directory holding the QR PNGs (same as the run directory).
    pub qr_dir: PathBuf,
    /// Vehicles included.
    pub vehicle_count: usize,
    /// Physical CSV rows written (after quantity expansion).
    pub rows_written: usize,
    /// VIN-log entries appended (0 for dry runs).
    pub vin_log_appended: usize,
    /// Whether this was a dry run.
    pub dry_run: bool,
}

/// Emits the artifact set for a resolution using the dealership's output
/// rules.
pub fn emit(
    conn: &mut SqliteConnection,
    resolution: &Resolution,
    cfg: &DealerConfig,
    opts: EmitOptions,
    now: DateTime<Utc>,
) -> EngineResult<EmitOutcome> {
    let rules = &cfg.output_rules;
    let mut items: Vec<OrderItem> = resolution
        .included
        .iter()
        .map(|vehicle| OrderItem {
            vehicle: vehicle.clone(),
            graphic_size: if rules.template.has_size() {
                rules.graphic_size.clone()
            } else {
                None
            },
            quantity: rules.quantity,
        })
        .collect();

    match rules.sort_by {
        SortKey::Stock => items.sort_by(|a, b| a.vehicle.stock.cmp(&b.vehicle.stock)),
        SortKey::Vin => items.sort_by(|a, b| a.vehicle.vin.cmp(&b.vehicle.vin)),
        SortKey::Model => items.sort_by(|a, b| {
            (a.vehicle.model.as_str(), a.vehicle.vin.as_str())
                .cmp(&(b.vehicle.model.as_str(), b.vehicle.vin.as_str()))
        }),
    }

    emit_items(conn, resolution, rules.template, items, cfg, opts, now)
}

/// Emits a prepared item list. Callers that build their own items (explicit
/// sizes, per-item quantities) enter here; [`emit`] is the common path.
pub fn emit_items(
    conn: &mut SqliteConnection,
    resolution: &Resolution,
    template: TemplateType,
    items: Vec<OrderItem>,
    cfg: &DealerConfig,
    opts: EmitOptions,
    now: DateTime<Utc>,
) -> EngineResult<EmitOutcome> {
    check_static_size(&items)?;

    let run_id = make_run_id(now);
    let slug = slugify(&resolution.dealership);
    let dealer_root = cfg.qr_output_path.join(&slug);
    let final_parent = if opts.skip_vin_logging {
        dealer_root.join("dry")
    } else {
        dealer_root.clone()
    };
    let final_dir = final_parent.join(&run_id);
    let staging = dealer_root.join(format!(".tmp-{run_id}"));

    let rows_written = match stage_artifacts(&staging, &final_dir, template, &items, cfg) {
        Ok(rows) => rows,
        Err(e) => {
            // Leave nothing behind on a failed stage.
            let _ = std::fs::remove_dir_all(&staging);
            return Err(e);
        }
    };

    std::fs::create_dir_all(&final_parent)?;
    if let Err(e) = std::fs::rename(&staging, &final_dir) {
        let _ = std::fs::remove_dir_all(&staging);
        return Err(e.into());
    }

    let csv_path = final_dir.join("order.csv");
    let mut outcome = EmitOutcome {
        run_id: run_id.clone(),
        csv_path: csv_path.clone(),
        qr_dir: final_dir.clone(),
        vehicle_count: items.len(),
        rows_written,
        vin_log_appended: 0,
        dry_run: opts.skip_vin_logging,
    };

    if opts.skip_vin_logging {
        tracing::info!(run_id = %run_id, dealership = %resolution.dealership, "dry run emitted");
        return Ok(outcome);
    }

    let processed_date = tz::local_date(now).to_string();
    let created_at = tz::to_rfc3339_millis(now);
    let persisted = persist_run(
        conn,
        resolution,
        template,
        &items,
        &run_id,
        &processed_date,
        &created_at,
        &csv_path,
        &final_dir,
    );

    match persisted {
        Ok(appended) => {
            outcome.vin_log_appended = appended;
            tracing::info!(run_id = %run_id, dealership = %resolution.dealership, appended, "run recorded");
            Ok(outcome)
        }
        Err(e) => {
            // Files are already in place; record the half-finished run so an
            // operator can reconcile, then surface PartialEmission.
            let note = format!("vin log write failed: {e}");
            let csv_display = csv_path.display().to_string();
            let qr_display = final_dir.display().to_string();
            let marker = NewOrderRunRow {
                run_id: &run_id,
                dealership: &resolution.dealership,
                mode: resolution.mode.as_str(),
                template_type: template.as_str(),
                created_at: &created_at,
                vehicle_count: items.len() as i32,
                csv_path: &csv_display,
                qr_dir: &qr_display,
                status: RunStatus::FilesEmittedNoLog.as_str(),
                note: Some(&note),
            };
            if let Err(record_err) = runs::record_run(conn, &marker) {
                tracing::error!(run_id = %run_id, error = %record_err, "failed to record partial emission");
            }
            Err(EngineError::PartialEmission {
                run_id,
                message: e.to_string(),
            })
        }
    }
}

/// Enforces the static-size constraint: every sized item in one order must
/// share a single size value.
fn check_static_size(items: &[OrderItem]) -> EngineResult<()> {
    let sizes: BTreeSet<String> = items
        .iter()
        .filter_map(|i| i.graphic_size.clone())
        .collect();
    if sizes.len() > 1 {
        return Err(EngineError::MixedSizeRejected {
            sizes: sizes.into_iter().collect(),
        });
    }
    Ok(())
}

fn stage_artifacts(
    staging: &Path,
    final_dir: &Path,
    template: TemplateType,
    items: &[OrderItem],
    cfg: &DealerConfig,
) -> EngineResult<usize> {
    std::fs::create_dir_all(staging)?;

    for item in items {
        let payload = qr_payload(&cfg.url_template, &item.vehicle, cfg.output_rules.qr_key);
        write_qr(&staging.join(format!("{}.png", item.vehicle.vin)), &payload)?;
    }

    // QRPATH cells point at the final directory, where the files will live
    // after the rename.
    let bytes = render_order_csv(template, items, final_dir)?;
    std::fs::write(staging.join("order.csv"), &bytes)?;

    Ok(items.iter().map(|i| i.quantity.max(1) as usize).sum())
}

#[allow(clippy::too_many_arguments)]
fn persist_run(
    conn: &mut SqliteConnection,
    resolution: &Resolution,
    template: TemplateType,
    items: &[OrderItem],
    run_id: &str,
    processed_date: &str,
    created_at: &str,
    csv_path: &Path,
    final_dir: &Path,
) -> EngineResult<usize> {
    let entries: Vec<NewVinLogRow<'_>> = items
        .iter()
        .map(|item| NewVinLogRow {
            dealership: &resolution.dealership,
            vin: &item.vehicle.vin,
            order_number: run_id,
            processed_date,
            order_type: resolution.mode.as_str(),
            condition: Some(item.vehicle.condition.as_str()),
        })
        .collect();

    let csv_path = csv_path.display().to_string();
    let qr_dir = final_dir.display().to_string();

    conn.immediate_transaction::<_, EngineError, _>(|tx| {
        let appended = vin_log::append_entries(tx, &entries)?;
        runs::record_run(
            tx,
            &NewOrderRunRow {
                run_id,
                dealership: &resolution.dealership,
                mode: resolution.mode.as_str(),
                template_type: template.as_str(),
                created_at,
                vehicle_count: items.len() as i32,
                csv_path: &csv_path,
                qr_dir: &qr_dir,
                status: RunStatus::Completed.as_str(),
                note: None,
            },
        )?;
        Ok(appended)
    })
}

/// Builds the run identifier, which doubles as the artifact directory name:
/// `<YYYY-MM-DD_HHMMSS>_<suffix>` in the service timezone.
fn make_run_id(now: DateTime<Utc>) -> String {
    let local = now.with_timezone(&tz::service_tz());
    format!(
        "{}_{:06}",
        local.format("%Y-%m-%d_%H%M%S"),
        now.timestamp_subsec_micros() % 1_000_000
    )
}

/// Lowercases and dashes a dealership display name for the directory layout.
fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_dash = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            prev_dash = false;
        } else if !prev_dash {
            out.push('-');
            prev_dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}
