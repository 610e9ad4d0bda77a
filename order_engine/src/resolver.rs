//! Order resolver — decides which vehicles need graphics.
//!
//! Two modes:
//! - **LIST**: an operator-supplied VIN set is matched against the active
//!   inventory; filter rules are bypassed and absent VINs are reported back
//!   under `missing`.
//! - **CAO** (Comparative Analysis / Order): the active inventory is run
//!   through the dealership's filter rules and each surviving candidate is
//!   classified against the dealership-local and cross-dealership VIN logs.
//!
//! The resolver is pure with respect to the store — it only reads — and is
//! reproducible: given the same inventory snapshot and VIN-log snapshot it
//! always produces the same classifications. The active manifest is
//! captured once at entry, so a mid-run manifest switch cannot split a
//! resolution.

use chrono::{DateTime, NaiveDate, Utc};
use diesel::SqliteConnection;
use inventory_ingestor::models::condition::Condition;

use crate::dealer::{self, DealerConfig};
use crate::error::{EngineError, EngineResult};
use crate::models::{VehicleRow, VinLogRow};
use crate::store::{manifests, vehicles, vin_log};
use crate::tz;

/// Which decision mode produced a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderMode {
    /// Comparative analysis against the VIN logs.
    Cao,
    /// Operator-supplied VIN list.
    List,
}

impl OrderMode {
    /// Stored string form ("CAO" / "LIST").
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderMode::Cao => "CAO",
            OrderMode::List => "LIST",
        }
    }
}

/// Window for the same-day duplicate rule, in calendar days.
const SAME_DAY_WINDOW: i64 = 1;
/// Window for the unchanged-status duplicate rule, in calendar days.
const RECENT_WINDOW: i64 = 7;

/// Per-vehicle decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The vehicle needs graphics now.
    Include,
    /// No work needed; see the reason.
    Skip,
}

/// One row of the audit table: what the resolver decided and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// The candidate VIN.
    pub vin: String,
    /// Include or skip.
    pub decision: Decision,
    /// Machine-readable reason, e.g. `"baseline"`, `"filtered:min_price"`.
    pub reason: String,
}

/// The output of a resolution, consumed by the artifact emitter.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Dealership the resolution is for.
    pub dealership: String,
    /// CAO or LIST.
    pub mode: OrderMode,
    /// The active manifest snapshot the inventory was read from.
    pub import_id: String,
    /// When the resolution ran.
    pub resolved_at: DateTime<Utc>,
    /// Vehicles needing graphics, in VIN order.
    pub included: Vec<VehicleRow>,
    /// The full classification table, one row per candidate.
    pub classifications: Vec<Classification>,
    /// LIST mode only: requested VINs absent from the active inventory.
    pub missing: Vec<String>,
}

/// Resolves a LIST-mode order: the subset of `vins` present in the active
/// inventory. No filter rules, no VIN-log consultation.
pub fn resolve_list(
    conn: &mut SqliteConnection,
    dealership: &str,
    vins: &[String],
    now: DateTime<Utc>,
) -> EngineResult<Resolution> {
    // Fails early on an unknown dealership, like CAO does.
    let _cfg = dealer::load_dealer(conn, dealership)?;
    let manifest = require_active_manifest(conn)?;

    let requested: Vec<String> = vins.iter().map(|s| s.trim().to_uppercase()).collect();
    let found = vehicles::active_inventory_by_vins(conn, dealership, &manifest, &requested)?;

    let mut classifications = Vec::with_capacity(requested.len());
    let mut missing = Vec::new();
    for vin in &requested {
        if found.iter().any(|v| &v.vin == vin) {
            classifications.push(Classification {
                vin: vin.clone(),
                decision: Decision::Include,
                reason: "listed".to_string(),
            });
        } else {
            classifications.push(Classification {
                vin: vin.clone(),
                decision: Decision::Skip,
                reason: "missing".to_string(),
            });
            missing.push(vin.clone());
        }
    }

    Ok(Resolution {
        dealership: dealership.to_string(),
        mode: OrderMode::List,
        import_id: manifest,
        resolved_at: now,
        included: found,
        classifications,
        missing,
    })
}

/// Resolves a CAO-mode order: the set of vehicles needing graphics today.
pub fn resolve_cao(
    conn: &mut SqliteConnection,
    dealership: &str,
    now: DateTime<Utc>,
) -> EngineResult<Resolution> {
    let cfg = dealer::load_dealer(conn, dealership)?;
    let manifest = require_active_manifest(conn)?;

    let inventory = vehicles::active_inventory(conn, dealership, &manifest)?;
    let local_log = vin_log::entries_by_vin(conn, dealership)?;

    // Cross-dealership lookup only matters for candidate VINs, so collect
    // them first; the comparison is by VIN alone.
    let candidate_vins: Vec<String> = inventory.iter().map(|v| v.vin.clone()).collect();
    let elsewhere = vin_log::vins_known_elsewhere(conn, dealership, &candidate_vins)?;

    let today = tz::local_date(now);
    let mut included = Vec::new();
    let mut classifications = Vec::with_capacity(inventory.len());

    for vehicle in inventory {
        let classification = classify(&cfg, &vehicle, local_log.get(&vehicle.vin), &elsewhere, today);
        if classification.decision == Decision::Include {
            included.push(vehicle);
        }
        classifications.push(classification);
    }

    Ok(Resolution {
        dealership: dealership.to_string(),
        mode: OrderMode::Cao,
        import_id: manifest,
        resolved_at: now,
        included,
        classifications,
        missing: Vec::new(),
    })
}

fn require_active_manifest(conn: &mut SqliteConnection) -> EngineResult<String> {
    manifests::active_manifest(conn)?
        .map(|m| m.import_id)
        .ok_or_else(|| EngineError::InvalidInput("no active import manifest".to_string()))
}

/// Applies the ordered decision rules to one candidate. The first matching
/// rule wins; local-log skips (rules 1-3) take precedence over the
/// cross-dealership include (rule 4).
fn classify(
    cfg: &DealerConfig,
    vehicle: &VehicleRow,
    local_entries: Option<&Vec<VinLogRow>>,
    elsewhere: &std::collections::HashSet<String>,
    today: NaiveDate,
) -> Classification {
    let vin = vehicle.vin.clone();

    if vin.len() != 17 {
        return Classification {
            vin,
            decision: Decision::Skip,
            reason: "invalid_vin".to_string(),
        };
    }

    if let crate::filter::Verdict::Reject { rule } = cfg.filtering_rules.evaluate(vehicle) {
        return Classification {
            vin,
            decision: Decision::Skip,
            reason: format!("filtered:{rule}"),
        };
    }

    let condition = Condition::parse(&vehicle.condition);
    let entries: &[VinLogRow] = local_entries.map(Vec::as_slice).unwrap_or(&[]);

    // Rule 1: a BASELINE entry means the vehicle already carried graphics
    // when tracking began.
    if entries.iter().any(|e| e.order_type == vin_log::ORDER_TYPE_BASELINE) {
        return Classification {
            vin,
            decision: Decision::Skip,
            reason: "baseline".to_string(),
        };
    }

    // Rules 2 and 3: recent processing with an unchanged condition. An
    // entry whose condition was never recorded matches nothing.
    let same_type_days_ago = entries
        .iter()
        .filter(|e| {
            e.condition
                .as_deref()
                .map(Condition::parse)
                .is_some_and(|logged| logged == condition)
        })
        .filter_map(|e| tz::parse_date(&e.processed_date).ok())
        .map(|d| tz::days_between(d, today))
        .filter(|days| *days >= 0)
        .min();

    if let Some(days) = same_type_days_ago {
        if days <= SAME_DAY_WINDOW {
            return Classification {
                vin,
                decision: Decision::Skip,
                reason: "processed_within_1_day".to_string(),
            };
        }
        if days <= RECENT_WINDOW {
            return Classification {
                vin,
                decision: Decision::Skip,
                reason: "processed_within_7_days".to_string(),
            };
        }
    }

    // Rule 4: the VIN moved here from another lot.
    if entries.is_empty() && elsewhere.contains(&vin) {
        return Classification {
            vin,
            decision: Decision::Include,
            reason: "cross_dealership_move".to_string(),
        };
    }

    // Rule 5: condition changed since the most recent local processing.
    // Uses the dealership-local log only; both conditions must be known.
    let most_recent_logged = entries
        .iter()
        .max_by_key(|e| e.processed_date.clone())
        .and_then(|e| e.condition.as_deref().map(Condition::parse));
    if let Some(logged) = most_recent_logged {
        if logged != condition {
            return Classification {
                vin,
                decision: Decision::Include,
                reason: "status_change".to_string(),
            };
        }
    }

    // Rule 6: first-time processing within the tracking window.
    Classification {
        vin,
        decision: Decision::Include,
        reason: "first_time".to_string(),
    }
}
