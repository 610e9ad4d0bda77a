//! Vehicle sale condition, normalised across all dealership sites.

use serde::{Deserialize, Serialize};

/// The sale condition of a vehicle after normalisation.
///
/// Site-specific spellings ("Pre-Owned", "CPO", ...) are folded into these
/// four values by [`Condition::parse`]. `Unknown` is a real value, not an
/// error: downstream layers store and compare it like any other condition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    New,
    Used,
    Certified,
    Unknown,
}

impl Condition {
    /// Folds a raw site string into a canonical condition.
    ///
    /// Matching is case-insensitive on the trimmed input. Anything not in the
    /// known synonym sets maps to `Unknown`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "new" => Condition::New,
            "used" | "pre-owned" | "preowned" | "po" => Condition::Used,
            "certified" | "cpo" | "certified pre-owned" => Condition::Certified,
            _ => Condition::Unknown,
        }
    }

    /// Canonical lowercase string form, used for storage and display.
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::New => "new",
            Condition::Used => "used",
            Condition::Certified => "certified",
            Condition::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
