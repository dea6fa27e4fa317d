//! Shared deviation math for the balance passes.

use crate::model::macros::Macros;
use crate::model::session::{plan_totals, Item};

const CALORIE_BAND_RATIO: f64 = 0.03;

/// Absolute per-field distance between plan totals and a target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Deviations {
    pub totals: Macros,
    pub kcal: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fats: f64,
}

impl Deviations {
    pub fn of(items: &[Option<Item>], target: &Macros) -> Self {
        let totals = plan_totals(items);
        Self {
            totals,
            kcal: (totals.kcal - target.kcal).abs(),
            protein: (totals.protein - target.protein).abs(),
            carbs: (totals.carbs - target.carbs).abs(),
            fats: (totals.fats - target.fats).abs(),
        }
    }
}

/// Tight calorie band (3% of target, at least 1 kcal) that gates the
/// carbohydrate pass.
pub fn calorie_band(target: &Macros) -> f64 {
    (target.kcal * CALORIE_BAND_RATIO).round().max(1.0)
}

/// Whether rounded day fat grams stay at or above the rounded floor.
pub fn fat_floor_holds(items: &[Option<Item>], fat_floor: f64) -> bool {
    let fat_grams: f64 = items.iter().flatten().map(Item::fat_grams).sum();
    fat_grams.round() >= fat_floor.round()
}

/// Per-100 g value scaled to one 10 g quantum, rounded.
pub(crate) fn per_quantum(value_per_100g: f64) -> f64 {
    (value_per_100g * 0.1).round()
}

pub(crate) fn set_grams(items: &mut [Option<Item>], index: usize, grams: u32) {
    if let Some(Some(item)) = items.get_mut(index) {
        item.grams = grams;
    }
}

/// Count of present items that may be moved.
pub(crate) fn unlocked_count(items: &[Option<Item>]) -> usize {
    items.iter().flatten().filter(|item| item.is_movable()).count()
}
