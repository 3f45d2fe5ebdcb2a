//! Per-crop nutrient targets.
//!
//! The built-in table covers six staple crops. Deployments add or override
//! crops through the `[crops.<name>]` sections of the config file rather
//! than code (see [`crate::config::Config::crops`]).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Target application of N, P and K in kg/ha for one crop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NutrientTarget {
    pub n: f64,
    pub p: f64,
    pub k: f64,
}

impl NutrientTarget {
    pub const fn new(n: f64, p: f64, k: f64) -> Self {
        Self { n, p, k }
    }
}

const BUILT_IN: &[(&str, NutrientTarget)] = &[
    ("rice", NutrientTarget::new(120.0, 60.0, 60.0)),
    ("wheat", NutrientTarget::new(150.0, 60.0, 40.0)),
    ("maize", NutrientTarget::new(180.0, 80.0, 50.0)),
    ("sugarcane", NutrientTarget::new(250.0, 80.0, 120.0)),
    ("cotton", NutrientTarget::new(160.0, 70.0, 80.0)),
    ("potato", NutrientTarget::new(180.0, 100.0, 120.0)),
];

/// Lookup table from crop name to nutrient target. Names are matched
/// case-insensitively.
#[derive(Debug, Clone, PartialEq)]
pub struct CropTable {
    targets: BTreeMap<String, NutrientTarget>,
}

impl Default for CropTable {
    fn default() -> Self {
        Self {
            targets: BUILT_IN
                .iter()
                .map(|(name, target)| (name.to_string(), *target))
                .collect(),
        }
    }
}

impl CropTable {
    /// The built-in table.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty table.
    pub fn empty() -> Self {
        Self {
            targets: BTreeMap::new(),
        }
    }

    /// Add or replace a crop.
    pub fn with_crop(mut self, name: &str, target: NutrientTarget) -> Self {
        self.insert(name, target);
        self
    }

    /// Add or replace every crop in `extra`.
    pub fn extend<'a>(&mut self, extra: impl IntoIterator<Item = (&'a String, &'a NutrientTarget)>) {
        for (name, target) in extra {
            self.insert(name, *target);
        }
    }

    pub fn insert(&mut self, name: &str, target: NutrientTarget) {
        self.targets.insert(normalize(name), target);
    }

    pub fn get(&self, name: &str) -> Option<NutrientTarget> {
        self.targets.get(&normalize(name)).copied()
    }

    /// Known crop names, sorted.
    pub fn crops(&self) -> impl Iterator<Item = &str> {
        self.targets.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}
