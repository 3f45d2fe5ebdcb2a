//! Deterministic agronomic calculations.
//!
//! Pure functions with no I/O and no shared state: soil fertility
//! classification and fertilizer-gap computation. Errors are returned to the
//! caller, which decides on any fallback.
//!
//! # Fertility banding
//!
//! Two-level banding:
//!
//! | Input | Rule |
//! |-------|------|
//! | pH | `< 5.5` → `Acidic`, else `Neutral` |
//! | N (kg/ha) | `< 100` → `Low`, else `Medium` |
//! | P (kg/ha) | `< 20` → `Low`, else `Medium` |
//! | K (kg/ha) | `< 100` → `Low`, else `Medium` |
//!
//! Each `Low`/`Acidic` classification appends exactly one recommendation.
//!
//! # Fertilizer gap
//!
//! `gap = max(0, target - current)` per nutrient. DAP is costed first from
//! the P gap; the nitrogen it supplies is subtracted from the N gap before
//! the Urea dose is computed. MOP covers the K gap.

pub mod crops;

pub use crops::{CropTable, NutrientTarget};

use serde::{Deserialize, Serialize};

use crate::{KrishiError, Result};

pub const PH_ACIDIC_BELOW: f64 = 5.5;
pub const N_LOW_BELOW: f64 = 100.0;
pub const P_LOW_BELOW: f64 = 20.0;
pub const K_LOW_BELOW: f64 = 100.0;

/// Nitrogen fraction of Urea.
pub const UREA_N: f64 = 0.46;
/// Nitrogen fraction of DAP.
pub const DAP_N: f64 = 0.18;
/// Phosphorus fraction of DAP.
pub const DAP_P: f64 = 0.46;
/// Potassium fraction of MOP.
pub const MOP_K: f64 = 0.60;

/// Classification of a single soil parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Level {
    Low,
    Medium,
    Acidic,
    Neutral,
    /// Only produced by three-level banding, which this crate does not use.
    High,
}

impl Level {
    /// Whether this level calls for corrective action.
    pub fn needs_action(&self) -> bool {
        matches!(self, Level::Low | Level::Acidic)
    }
}

/// Fertility classification of a soil reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FertilityAssessment {
    pub ph_level: Level,
    pub n_level: Level,
    pub p_level: Level,
    pub k_level: Level,
    pub recommendations: Vec<String>,
}

/// Classify N/P/K/pH into fertility levels.
pub fn classify_fertility(n: f64, p: f64, k: f64, ph: f64) -> FertilityAssessment {
    let mut recommendations = Vec::new();

    let ph_level = if ph < PH_ACIDIC_BELOW {
        recommendations.push("Apply lime.".to_string());
        Level::Acidic
    } else {
        Level::Neutral
    };
    let n_level = band(n, N_LOW_BELOW, "Apply Nitrogen fertilizer.", &mut recommendations);
    let p_level = band(p, P_LOW_BELOW, "Apply Phosphorus fertilizer.", &mut recommendations);
    let k_level = band(k, K_LOW_BELOW, "Apply Potassium fertilizer.", &mut recommendations);

    FertilityAssessment {
        ph_level,
        n_level,
        p_level,
        k_level,
        recommendations,
    }
}

fn band(value: f64, low_below: f64, advice: &str, recommendations: &mut Vec<String>) -> Level {
    if value < low_below {
        recommendations.push(advice.to_string());
        Level::Low
    } else {
        Level::Medium
    }
}

/// A validated soil reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoilReading {
    pub n: f64,
    pub p: f64,
    pub k: f64,
    pub ph: f64,
}

impl SoilReading {
    /// Validate raw inputs: nutrients finite and non-negative, pH in 0–14.
    pub fn new(n: f64, p: f64, k: f64, ph: f64) -> Result<Self> {
        for (name, value) in [("N", n), ("P", p), ("K", k)] {
            if !value.is_finite() || value < 0.0 {
                return Err(KrishiError::Validation(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        if !ph.is_finite() || !(0.0..=14.0).contains(&ph) {
            return Err(KrishiError::Validation(format!(
                "pH must be between 0 and 14, got {ph}"
            )));
        }
        Ok(Self { n, p, k, ph })
    }

    pub fn classify(&self) -> FertilityAssessment {
        classify_fertility(self.n, self.p, self.k, self.ph)
    }
}

/// Nutrient shortfall in kg/ha.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NutrientGap {
    pub n: f64,
    pub p: f64,
    pub k: f64,
}

/// Fertilizer quantities in kg/ha, rounded to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FertilizerPlan {
    pub crop: String,
    pub gap: NutrientGap,
    pub urea_kg: f64,
    pub dap_kg: f64,
    pub mop_kg: f64,
    pub recommendations: Vec<String>,
}

/// Fertilizer plan using the built-in crop table.
pub fn compute_fertilizer_gap(n: f64, p: f64, k: f64, crop: &str) -> Result<FertilizerPlan> {
    CropTable::default().fertilizer_plan(n, p, k, crop)
}

impl CropTable {
    /// Fertilizer plan for `crop` given current N/P/K.
    ///
    /// Fails with [`KrishiError::UnknownCrop`] when the crop is not in the
    /// table.
    pub fn fertilizer_plan(&self, n: f64, p: f64, k: f64, crop: &str) -> Result<FertilizerPlan> {
        if crop.trim().is_empty() {
            return Err(KrishiError::Validation("crop is required".to_string()));
        }
        let target = self
            .get(crop)
            .ok_or_else(|| KrishiError::UnknownCrop(crop.trim().to_string()))?;

        let gap = NutrientGap {
            n: (target.n - n).max(0.0),
            p: (target.p - p).max(0.0),
            k: (target.k - k).max(0.0),
        };

        let dap_kg = gap.p / DAP_P;
        let n_from_dap = dap_kg * DAP_N;
        let n_still_needed = (gap.n - n_from_dap).max(0.0);
        let urea_kg = n_still_needed / UREA_N;
        let mop_kg = gap.k / MOP_K;

        let crop_name = crate::types::forecast::title_case(crop.trim());
        let recommendations = vec![
            format!(
                "For your {crop_name}, you need to add {} kg/ha of Nitrogen, {} kg/ha of Phosphorus, and {} kg/ha of Potassium.",
                round2(gap.n),
                round2(gap.p),
                round2(gap.k)
            ),
            "Apply in split doses as per local agricultural guidelines.".to_string(),
        ];

        Ok(FertilizerPlan {
            crop: crop.trim().to_lowercase(),
            gap,
            urea_kg: round2(urea_kg),
            dap_kg: round2(dap_kg),
            mop_kg: round2(mop_kg),
            recommendations,
        })
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
