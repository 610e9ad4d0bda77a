use std::collections::{BTreeMap, BTreeSet};

use crate::dealer::sync::want::DealerSpec;

/// What needs to change to make DB == TOML.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DealerDiff {
    /// Dealerships to insert or overwrite.
    pub upsert: BTreeMap<String, DealerSpec>,
    /// Dealerships to delete (prune only).
    pub delete: BTreeSet<String>,
}

impl DealerDiff {
    /// True when applying the diff would change nothing.
    pub fn is_noop(&self) -> bool {
        self.upsert.is_empty() && self.delete.is_empty()
    }
}

pub fn make_diff(
    want: &BTreeMap<String, DealerSpec>,
    cur: &BTreeMap<String, DealerSpec>,
    prune: bool,
) -> DealerDiff {
    let mut diff = DealerDiff::default();

    for (name, spec) in want {
        if cur.get(name) != Some(spec) {
            diff.upsert.insert(name.clone(), spec.clone());
        }
    }

    if prune {
        for name in cur.keys() {
            if !want.contains_key(name) {
                diff.delete.insert(name.clone());
            }
        }
    }

    diff
}
