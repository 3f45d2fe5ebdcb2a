//! Tests for fertility classification and fertilizer-gap computation.

use krishi::{
    CropTable, KrishiError, Level, NutrientTarget, classify_fertility, compute_fertilizer_gap,
};

// ============================================================================
// Fertility classification
// ============================================================================

#[test]
fn one_recommendation_per_deficiency() {
    let readings = [
        (50.0, 10.0, 50.0, 5.0),
        (150.0, 10.0, 50.0, 7.0),
        (150.0, 30.0, 150.0, 7.0),
        (0.0, 0.0, 0.0, 0.0),
        (99.9, 19.9, 99.9, 5.49),
    ];
    for (n, p, k, ph) in readings {
        let a = classify_fertility(n, p, k, ph);
        let flagged = [a.ph_level, a.n_level, a.p_level, a.k_level]
            .iter()
            .filter(|level| level.needs_action())
            .count();
        assert_eq!(a.recommendations.len(), flagged, "reading {n}/{p}/{k}/{ph}");
    }
}

#[test]
fn healthy_soil_needs_nothing() {
    let a = classify_fertility(150.0, 30.0, 150.0, 7.0);
    assert_eq!(a.ph_level, Level::Neutral);
    assert_eq!(a.n_level, Level::Medium);
    assert_eq!(a.p_level, Level::Medium);
    assert_eq!(a.k_level, Level::Medium);
    assert!(a.recommendations.is_empty());
}

#[test]
fn acidic_soil_gets_lime() {
    let a = classify_fertility(150.0, 30.0, 150.0, 4.8);
    assert_eq!(a.ph_level, Level::Acidic);
    assert_eq!(a.recommendations, vec!["Apply lime."]);
}

// ============================================================================
// Fertilizer gap
// ============================================================================

#[test]
fn rice_from_bare_soil() {
    let plan = compute_fertilizer_gap(0.0, 0.0, 0.0, "rice").unwrap();
    assert_eq!(plan.dap_kg, 130.43);
    assert_eq!(plan.urea_kg, 209.83);
    assert_eq!(plan.mop_kg, 100.0);
    assert_eq!(plan.gap.n, 120.0);
    assert_eq!(plan.gap.p, 60.0);
    assert_eq!(plan.gap.k, 60.0);
}

#[test]
fn surplus_soil_needs_no_fertilizer() {
    let plan = compute_fertilizer_gap(150.0, 60.0, 40.0, "Wheat").unwrap();
    assert_eq!(plan.urea_kg, 0.0);
    assert_eq!(plan.dap_kg, 0.0);
    assert_eq!(plan.mop_kg, 0.0);
    assert_eq!(plan.crop, "wheat");
    assert!(plan.recommendations[0].starts_with("For your Wheat, you need to add 0 kg/ha"));
}

/// Nitrogen from DAP can cover the whole N gap; urea never goes negative.
#[test]
fn dap_nitrogen_offsets_urea() {
    let plan = compute_fertilizer_gap(115.0, 0.0, 60.0, "rice").unwrap();
    // DAP 130.43 kg supplies ~23.5 kg N, more than the 5 kg gap.
    assert_eq!(plan.urea_kg, 0.0);
    assert_eq!(plan.dap_kg, 130.43);
    assert_eq!(plan.mop_kg, 0.0);
}

#[test]
fn quantities_are_never_negative() {
    for crop in CropTable::new().crops() {
        for (n, p, k) in [(0.0, 0.0, 0.0), (500.0, 500.0, 500.0), (10.0, 200.0, 5.0)] {
            let plan = compute_fertilizer_gap(n, p, k, crop).unwrap();
            assert!(plan.urea_kg >= 0.0 && plan.dap_kg >= 0.0 && plan.mop_kg >= 0.0);
        }
    }
}

#[test]
fn unknown_crop_is_reported() {
    let err = compute_fertilizer_gap(10.0, 10.0, 10.0, "durian").unwrap_err();
    assert_eq!(err, KrishiError::UnknownCrop("durian".to_string()));
    assert_eq!(err.to_string(), "crop not found in our database: durian");
}

#[test]
fn configured_crops_are_used() {
    let table = CropTable::new().with_crop("mustard", NutrientTarget::new(80.0, 46.0, 60.0));
    let plan = table.fertilizer_plan(0.0, 0.0, 0.0, "Mustard").unwrap();
    assert_eq!(plan.dap_kg, 100.0);
    assert_eq!(plan.urea_kg, 134.78);
    assert_eq!(plan.mop_kg, 100.0);
}
