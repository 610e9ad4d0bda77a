//! Canonical in-memory representations of a scraped vehicle.
//!
//! [`RawVehicle`] is the exchange row between adapters and the rest of the
//! pipeline: loosely typed, exactly what the site reported. The
//! [`normalizer`](crate::normalizer) turns it into a [`NormalizedVehicle`],
//! which is what the store upserts and the order resolver reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::condition::Condition;

/// A single vehicle row as produced by a dealership adapter.
///
/// Fields are kept close to the wire: `price` stays a string because sites
/// report anything from `"$30,499"` to `"Call for price"`, and `condition`
/// stays the site's own wording until normalisation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawVehicle {
    /// Vehicle identification number as reported; may be blank or malformed.
    pub vin: String,
    /// Dealer stock number; may be blank.
    pub stock: String,
    /// Model year as reported, if the site exposed one.
    pub year: Option<i32>,
    pub make: String,
    pub model: String,
    pub trim: String,
    /// Raw price text, e.g. `"$30,499"`, `"30499"`, `"Call"`.
    pub price: Option<String>,
    /// Odometer reading in miles, if reported.
    pub mileage: Option<i64>,
    /// The site's own condition wording, e.g. `"Pre-Owned"`.
    pub condition: String,
    pub exterior_color: String,
    /// Dealership display name this row was scraped from.
    pub location: String,
    /// Detail-page URL on the dealership site.
    pub vehicle_url: String,
    /// When the adapter observed this row (UTC).
    pub time_scraped: DateTime<Utc>,
}

/// A vehicle row after normalisation.
///
/// All invariants of the normalizer hold here: `vin` is trimmed and
/// uppercased, `price`/`mileage`/`year` have been range-checked, and the
/// formatted fields are ready for print templates.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedVehicle {
    pub vin: String,
    /// False when the VIN is not exactly 17 characters. Such rows are kept
    /// for audit but excluded from order resolution.
    pub vin_complete: bool,
    pub stock: String,
    pub year: Option<i32>,
    pub make: String,
    pub model: String,
    pub trim: String,
    pub price: Option<f64>,
    pub mileage: Option<i64>,
    pub condition: Condition,
    pub exterior_color: String,
    pub location: String,
    pub vehicle_url: String,
    /// `"$30,499"` or `"N/A"`.
    pub price_formatted: String,
    /// `"12,345 mi"` or `"N/A"`.
    pub mileage_formatted: String,
    pub time_scraped: DateTime<Utc>,
}

/// A non-fatal observation made while normalising a row.
///
/// The normalizer is total: problematic input produces nulls plus one of
/// these, never an error.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizerWarning {
    /// Field the warning applies to, e.g. `"price"`.
    pub field: &'static str,
    pub message: String,
}
