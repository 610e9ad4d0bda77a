//! Normalizer — the pure transform from [`RawVehicle`] to [`NormalizedVehicle`].
//!
//! The function is total: it never fails and performs no I/O. Problematic
//! input yields `None` fields plus a companion warning list, so one bad row
//! can never take down an ingest batch. Determinism is preserved by taking
//! the reference time as an argument instead of reading the clock.

use chrono::{DateTime, Datelike, Utc};
use shared_utils::format::group_thousands;

use crate::models::condition::Condition;
use crate::models::vehicle::{NormalizedVehicle, NormalizerWarning, RawVehicle};

/// Result of normalising one raw row.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub vehicle: NormalizedVehicle,
    pub warnings: Vec<NormalizerWarning>,
}

/// Normalises a raw row.
///
/// `reference` anchors the model-year upper bound (`reference year + 2`);
/// callers pass the ingest time.
pub fn normalize(raw: &RawVehicle, reference: DateTime<Utc>) -> Normalized {
    let mut warnings = Vec::new();

    let vin = raw.vin.trim().to_uppercase();
    let vin_complete = vin.len() == 17;
    if !vin_complete {
        warnings.push(NormalizerWarning {
            field: "vin",
            message: format!("incomplete vin ({} chars)", vin.len()),
        });
    }

    let condition = Condition::parse(&raw.condition);
    if condition == Condition::Unknown && !raw.condition.trim().is_empty() {
        warnings.push(NormalizerWarning {
            field: "condition",
            message: format!("unrecognised condition '{}'", raw.condition.trim()),
        });
    }

    let price = match raw.price.as_deref() {
        None => None,
        Some(text) => match parse_price(text) {
            ParsedPrice::Value(p) => Some(p),
            ParsedPrice::Absent => None,
            ParsedPrice::Unparseable => {
                warnings.push(NormalizerWarning {
                    field: "price",
                    message: format!("unparseable price '{}'", text.trim()),
                });
                None
            }
        },
    };

    let mileage = match raw.mileage {
        Some(m) if m < 0 => {
            warnings.push(NormalizerWarning {
                field: "mileage",
                message: format!("negative mileage {m}"),
            });
            None
        }
        Some(m) => Some(m),
        // New vehicles without an odometer reading are delivered-mileage zero.
        None if condition == Condition::New => Some(0),
        None => None,
    };

    let max_year = reference.year() + 2;
    let year = match raw.year {
        Some(y) if (1900..=max_year).contains(&y) => Some(y),
        Some(y) => {
            warnings.push(NormalizerWarning {
                field: "year",
                message: format!("year {y} outside [1900, {max_year}]"),
            });
            None
        }
        None => None,
    };

    let price_formatted = match price {
        Some(p) => format!("${}", group_thousands(p.round() as u64)),
        None => "N/A".to_string(),
    };
    let mileage_formatted = match mileage {
        Some(m) => format!("{} mi", group_thousands(m as u64)),
        None => "N/A".to_string(),
    };

    Normalized {
        vehicle: NormalizedVehicle {
            vin,
            vin_complete,
            stock: raw.stock.trim().to_string(),
            year,
            make: raw.make.trim().to_string(),
            model: raw.model.trim().to_string(),
            trim: raw.trim.trim().to_string(),
            price,
            mileage,
            condition,
            exterior_color: raw.exterior_color.trim().to_string(),
            location: raw.location.trim().to_string(),
            vehicle_url: raw.vehicle_url.trim().to_string(),
            price_formatted,
            mileage_formatted,
            time_scraped: raw.time_scraped,
        },
        warnings,
    }
}

enum ParsedPrice {
    Value(f64),
    /// Legitimately no price: empty, "call", "contact us", ...
    Absent,
    Unparseable,
}

fn parse_price(text: &str) -> ParsedPrice {
    let lowered = text.trim().to_lowercase();
    if lowered.is_empty() || lowered.contains("call") || lowered.contains("contact") {
        return ParsedPrice::Absent;
    }

    // Strip currency symbols and separators, keep digits, sign, and decimal point.
    let cleaned: String = lowered
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return ParsedPrice::Unparseable;
    }

    match cleaned.parse::<f64>() {
        Ok(p) if p < 0.0 => ParsedPrice::Absent,
        Ok(p) => ParsedPrice::Value(p),
        Err(_) => ParsedPrice::Unparseable,
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn raw() -> RawVehicle {
        RawVehicle {
            vin: "1hgcm82633a004352".into(),
            stock: "A1234".into(),
            year: Some(2022),
            make: "Honda".into(),
            model: "Accord".into(),
            trim: "EX-L".into(),
            price: Some("$30,499".into()),
            mileage: Some(12345),
            condition: "Pre-Owned".into(),
            exterior_color: "White".into(),
            location: "Example Honda".into(),
            vehicle_url: "https://example.test/a1234".into(),
            time_scraped: Utc.with_ymd_and_hms(2025, 1, 20, 12, 0, 0).unwrap(),
        }
    }

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 20, 12, 0, 0).unwrap()
    }

    #[test]
    fn happy_path_formats_and_uppercases() {
        let n = normalize(&raw(), reference());
        assert!(n.warnings.is_empty());
        assert_eq!(n.vehicle.vin, "1HGCM82633A004352");
        assert!(n.vehicle.vin_complete);
        assert_eq!(n.vehicle.condition, Condition::Used);
        assert_eq!(n.vehicle.price, Some(30499.0));
        assert_eq!(n.vehicle.price_formatted, "$30,499");
        assert_eq!(n.vehicle.mileage_formatted, "12,345 mi");
    }

    #[test]
    fn call_for_price_is_null_without_warning() {
        let mut r = raw();
        r.price = Some("Call for price".into());
        let n = normalize(&r, reference());
        assert_eq!(n.vehicle.price, None);
        assert_eq!(n.vehicle.price_formatted, "N/A");
        assert!(n.warnings.iter().all(|w| w.field != "price"));
    }

    #[test]
    fn negative_price_is_null() {
        let mut r = raw();
        r.price = Some("-100".into());
        let n = normalize(&r, reference());
        assert_eq!(n.vehicle.price, None);
    }

    #[test]
    fn garbage_price_warns() {
        let mut r = raw();
        r.price = Some("TBD".into());
        let n = normalize(&r, reference());
        assert_eq!(n.vehicle.price, None);
        assert!(n.warnings.iter().any(|w| w.field == "price"));
    }

    #[test]
    fn new_vehicle_null_mileage_defaults_to_zero() {
        let mut r = raw();
        r.condition = "New".into();
        r.mileage = None;
        let n = normalize(&r, reference());
        assert_eq!(n.vehicle.mileage, Some(0));
        assert_eq!(n.vehicle.mileage_formatted, "0 mi");
    }

    #[test]
    fn used_vehicle_null_mileage_stays_null() {
        let mut r = raw();
        r.mileage = None;
        let n = normalize(&r, reference());
        assert_eq!(n.vehicle.mileage, None);
        assert_eq!(n.vehicle.mileage_formatted, "N/A");
    }

    #[test]
    fn year_outside_window_is_null_with_warning() {
        let mut r = raw();
        r.year = Some(2031);
        let n = normalize(&r, reference());
        assert_eq!(n.vehicle.year, None);
        assert!(n.warnings.iter().any(|w| w.field == "year"));

        r.year = Some(2027); // reference 2025 + 2 is still in range
        let n = normalize(&r, reference());
        assert_eq!(n.vehicle.year, Some(2027));
    }

    #[test]
    fn short_vin_is_flagged_but_retained() {
        let mut r = raw();
        r.vin = " abc123 ".into();
        let n = normalize(&r, reference());
        assert_eq!(n.vehicle.vin, "ABC123");
        assert!(!n.vehicle.vin_complete);
        assert!(n.warnings.iter().any(|w| w.field == "vin"));
    }
}
