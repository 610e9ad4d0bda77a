//! Filter engine — evaluates a dealership's filtering rules against a
//! candidate vehicle.
//!
//! Evaluation is deterministic and pure: rules combine by logical AND, and
//! the verdict names the first failing rule for diagnostics. Absent bounds
//! mean no bound; a present bound rejects vehicles whose field is null
//! (`min_price = 0` therefore means "price must be present and ≥ 0" while
//! `min_price` unset means "no lower bound").

use inventory_ingestor::models::condition::Condition;
use serde::{Deserialize, Serialize};

use crate::models::VehicleRow;

/// A dealership's filtering rules.
///
/// The struct is closed: unknown keys in persisted configs are preserved at
/// the catalog layer but are not part of rule evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterRules {
    /// Reject when the vehicle's condition is in this set.
    pub exclude_conditions: Vec<Condition>,
    /// Reject when the stock number is empty.
    pub require_stock: bool,
    /// Reject when price is null or below this bound.
    pub min_price: Option<f64>,
    /// Reject when price is null or above this bound.
    pub max_price: Option<f64>,
    /// Reject when year is null or below this bound.
    pub min_year: Option<i32>,
    /// Reject when year is null or above this bound.
    pub max_year: Option<i32>,
    /// Reject these makes (case-insensitive exact match). Ignored when
    /// `include_only_makes` is non-empty.
    pub exclude_makes: Vec<String>,
    /// When non-empty, only these makes are accepted; this list wins over
    /// `exclude_makes`.
    pub include_only_makes: Vec<String>,
    /// Reject models containing any of these substrings (case-insensitive).
    pub exclude_models: Vec<String>,
}

/// Outcome of evaluating the rules against one vehicle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// All rules passed.
    Accept,
    /// The named rule failed first.
    Reject {
        /// Rule name, e.g. `"min_price"`.
        rule: &'static str,
    },
}

impl Verdict {
    /// True for [`Verdict::Accept`].
    pub fn is_accept(&self) -> bool {
        matches!(self, Verdict::Accept)
    }
}

impl FilterRules {
    /// Evaluates the rules, returning the first failing rule name.
    pub fn evaluate(&self, v: &VehicleRow) -> Verdict {
        let condition = Condition::parse(&v.condition);
        if self.exclude_conditions.contains(&condition) {
            return Verdict::Reject {
                rule: "exclude_conditions",
            };
        }

        if self.require_stock && v.stock.trim().is_empty() {
            return Verdict::Reject {
                rule: "require_stock",
            };
        }

        if let Some(min) = self.min_price {
            match v.price {
                Some(p) if p >= min => {}
                _ => return Verdict::Reject { rule: "min_price" },
            }
        }
        if let Some(max) = self.max_price {
            match v.price {
                Some(p) if p <= max => {}
                _ => return Verdict::Reject { rule: "max_price" },
            }
        }

        if let Some(min) = self.min_year {
            match v.year {
                Some(y) if y >= min => {}
                _ => return Verdict::Reject { rule: "min_year" },
            }
        }
        if let Some(max) = self.max_year {
            match v.year {
                Some(y) if y <= max => {}
                _ => return Verdict::Reject { rule: "max_year" },
            }
        }

        if !self.include_only_makes.is_empty() {
            let allowed = self
                .include_only_makes
                .iter()
                .any(|m| m.eq_ignore_ascii_case(&v.make));
            if !allowed {
                return Verdict::Reject {
                    rule: "include_only_makes",
                };
            }
        } else if self
            .exclude_makes
            .iter()
            .any(|m| m.eq_ignore_ascii_case(&v.make))
        {
            return Verdict::Reject {
                rule: "exclude_makes",
            };
        }

        let model_lower = v.model.to_lowercase();
        if self
            .exclude_models
            .iter()
            .any(|m| !m.is_empty() && model_lower.contains(&m.to_lowercase()))
        {
            return Verdict::Reject {
                rule: "exclude_models",
            };
        }

        Verdict::Accept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vehicle() -> VehicleRow {
        VehicleRow {
            id: 1,
            vin: "1HGCM82633A004352".into(),
            stock: "A1234".into(),
            year: Some(2022),
            make: "Honda".into(),
            model: "Accord".into(),
            trim: "EX-L".into(),
            price: Some(30499.0),
            mileage: Some(12345),
            condition: "used".into(),
            exterior_color: "White".into(),
            location: "Example Honda".into(),
            vehicle_url: String::new(),
            price_formatted: "$30,499".into(),
            mileage_formatted: "12,345 mi".into(),
            first_scraped: "2025-01-01T00:00:00.000Z".into(),
            last_scraped: "2025-01-02T00:00:00.000Z".into(),
            scrape_count: 2,
            last_import_id: "IMP-1".into(),
        }
    }

    #[test]
    fn empty_rules_accept_everything() {
        assert!(FilterRules::default().evaluate(&vehicle()).is_accept());
    }

    #[test]
    fn condition_exclusion_fires_first() {
        let rules = FilterRules {
            exclude_conditions: vec![Condition::Used],
            min_price: Some(1_000_000.0), // would also fail, but condition wins
            ..Default::default()
        };
        assert_eq!(
            rules.evaluate(&vehicle()),
            Verdict::Reject {
                rule: "exclude_conditions"
            }
        );
    }

    #[test]
    fn null_price_with_zero_min_rejects() {
        let mut v = vehicle();
        v.price = None;
        let rules = FilterRules {
            min_price: Some(0.0),
            ..Default::default()
        };
        assert_eq!(rules.evaluate(&v), Verdict::Reject { rule: "min_price" });

        // No bound at all: null price is fine.
        assert!(FilterRules::default().evaluate(&v).is_accept());
    }

    #[test]
    fn price_bounds_are_inclusive() {
        let rules = FilterRules {
            min_price: Some(30499.0),
            max_price: Some(30499.0),
            ..Default::default()
        };
        assert!(rules.evaluate(&vehicle()).is_accept());
    }

    #[test]
    fn year_bounds() {
        let rules = FilterRules {
            min_year: Some(2023),
            ..Default::default()
        };
        assert_eq!(rules.evaluate(&vehicle()), Verdict::Reject { rule: "min_year" });

        let mut v = vehicle();
        v.year = None;
        let rules = FilterRules {
            max_year: Some(2030),
            ..Default::default()
        };
        assert_eq!(rules.evaluate(&v), Verdict::Reject { rule: "max_year" });
    }

    #[test]
    fn include_list_wins_over_exclude_list() {
        let rules = FilterRules {
            include_only_makes: vec!["honda".into()],
            exclude_makes: vec!["Honda".into()],
            ..Default::default()
        };
        assert!(rules.evaluate(&vehicle()).is_accept());

        let rules = FilterRules {
            include_only_makes: vec!["Toyota".into()],
            ..Default::default()
        };
        assert_eq!(
            rules.evaluate(&vehicle()),
            Verdict::Reject {
                rule: "include_only_makes"
            }
        );
    }

    #[test]
    fn model_substring_match_is_case_insensitive() {
        let rules = FilterRules {
            exclude_models: vec!["accord".into()],
            ..Default::default()
        };
        assert_eq!(
            rules.evaluate(&vehicle()),
            Verdict::Reject {
                rule: "exclude_models"
            }
        );
    }

    #[test]
    fn require_stock_rejects_blank() {
        let mut v = vehicle();
        v.stock = "  ".into();
        let rules = FilterRules {
            require_stock: true,
            ..Default::default()
        };
        assert_eq!(rules.evaluate(&v), Verdict::Reject { rule: "require_stock" });
    }

    use proptest::prelude::*;

    proptest! {
        // Evaluation is total and deterministic over arbitrary field shapes.
        #[test]
        fn evaluation_never_panics_and_is_stable(
            price in proptest::option::of(0.0f64..200_000.0),
            year in proptest::option::of(1900i32..2030),
            stock in "[A-Z0-9]{0,8}",
            make in "[A-Za-z ]{0,12}",
        ) {
            let mut v = vehicle();
            v.price = price;
            v.year = year;
            v.stock = stock;
            v.make = make;

            let rules = FilterRules {
                require_stock: true,
                min_price: Some(1_000.0),
                max_year: Some(2026),
                exclude_makes: vec!["Fisker".into()],
                ..Default::default()
            };

            let first = rules.evaluate(&v);
            let second = rules.evaluate(&v);
            prop_assert_eq!(first, second);
        }
    }
}
