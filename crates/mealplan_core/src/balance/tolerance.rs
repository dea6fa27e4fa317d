//! Caller options and resolved tolerances for one auto-balance run.

use crate::balance::deviation::Deviations;
use crate::model::macros::Macros;
use serde::{Deserialize, Serialize};

pub const MIN_KCAL_TOL: f64 = 60.0;
pub const KCAL_TOL_RATIO: f64 = 0.03;
pub const DEFAULT_PROTEIN_TOL: f64 = 8.0;
pub const DEFAULT_CARB_TOL: f64 = 15.0;
pub const DEFAULT_FAT_FLOOR: f64 = 40.0;

/// Options accepted by `apply_auto_balance`.
///
/// Every field is optional; unset or non-finite numbers fall back to the
/// defaults computed in `Tolerances::resolve`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AutoBalanceOptions {
    /// Slot visited first by the tuner and preferred by the nudge.
    pub prefer_index: Option<usize>,
    /// Replaces the stored day target for this run only.
    pub target: Option<Macros>,
    pub kcal_tol: Option<f64>,
    pub protein_tol: Option<f64>,
    #[serde(alias = "carbsTol")]
    pub carb_tol: Option<f64>,
    #[serde(alias = "fatsTol")]
    pub fat_tol: Option<f64>,
    pub fat_floor: Option<f64>,
    /// Explicit must-touch slots; an empty list means "resolve".
    pub primary_slots: Option<Vec<usize>>,
}

impl AutoBalanceOptions {
    /// Options preferring one meal slot, defaults elsewhere.
    pub fn for_meal(index: usize) -> Self {
        Self {
            prefer_index: Some(index),
            ..Self::default()
        }
    }

    pub fn with_target(mut self, target: Macros) -> Self {
        self.target = Some(target);
        self
    }

    pub fn with_primary_slots(mut self, slots: Vec<usize>) -> Self {
        self.primary_slots = Some(slots);
        self
    }

    pub fn with_kcal_tol(mut self, value: f64) -> Self {
        self.kcal_tol = Some(value);
        self
    }

    pub fn with_fat_floor(mut self, value: f64) -> Self {
        self.fat_floor = Some(value);
        self
    }
}

/// Fully resolved limits for one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    pub kcal: f64,
    pub protein: f64,
    pub carbs: f64,
    /// `None` disables the fat deviation check.
    pub fats: Option<f64>,
    pub fat_floor: f64,
}

impl Tolerances {
    /// Applies defaults against the effective target.
    ///
    /// `kcal` defaults to 3% of target calories with a 60 kcal minimum.
    pub fn resolve(options: &AutoBalanceOptions, target: &Macros) -> Self {
        let default_kcal = (target.kcal * KCAL_TOL_RATIO).round().max(MIN_KCAL_TOL);
        Self {
            kcal: finite_or(options.kcal_tol, default_kcal),
            protein: finite_or(options.protein_tol, DEFAULT_PROTEIN_TOL),
            carbs: finite_or(options.carb_tol, DEFAULT_CARB_TOL),
            fats: options.fat_tol.filter(|value| value.is_finite()),
            fat_floor: finite_or(options.fat_floor, DEFAULT_FAT_FLOOR),
        }
    }

    /// Whether all four deviations sit inside their limits.
    pub fn accepts(&self, deviations: &Deviations) -> bool {
        deviations.kcal <= self.kcal
            && deviations.protein <= self.protein
            && deviations.carbs <= self.carbs
            && self.fats.map_or(true, |limit| deviations.fats <= limit)
    }
}

fn finite_or(value: Option<f64>, fallback: f64) -> f64 {
    value.filter(|value| value.is_finite()).unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::{AutoBalanceOptions, Tolerances};
    use crate::model::macros::Macros;

    #[test]
    fn defaults_scale_kcal_tolerance_with_target() {
        let small = Tolerances::resolve(&AutoBalanceOptions::default(), &Macros::new(1500.0, 0.0, 0.0, 0.0));
        assert_eq!(small.kcal, 60.0);
        let large = Tolerances::resolve(&AutoBalanceOptions::default(), &Macros::new(3000.0, 0.0, 0.0, 0.0));
        assert_eq!(large.kcal, 90.0);
        assert_eq!(large.protein, 8.0);
        assert_eq!(large.carbs, 15.0);
        assert_eq!(large.fats, None);
        assert_eq!(large.fat_floor, 40.0);
    }

    #[test]
    fn aliases_and_non_finite_values_are_handled() {
        let options: AutoBalanceOptions = serde_json::from_str(
            r#"{"preferIndex": 0, "carbsTol": 20, "fatsTol": 9, "primarySlots": [0, 1]}"#,
        )
        .expect("options should parse");
        assert_eq!(options.prefer_index, Some(0));
        assert_eq!(options.primary_slots, Some(vec![0, 1]));

        let mut options = options;
        options.kcal_tol = Some(f64::NAN);
        let resolved = Tolerances::resolve(&options, &Macros::new(2200.0, 0.0, 0.0, 0.0));
        assert_eq!(resolved.kcal, 66.0);
        assert_eq!(resolved.carbs, 20.0);
        assert_eq!(resolved.fats, Some(9.0));
    }
}
