//! Baseline portion planning.
//!
//! # Responsibility
//! - Split the day calorie target into per-slot shares.
//! - Convert a slot share into grams for the slot's food.
//!
//! # Invariants
//! - Shares are non-negative and sum to the day target when it is positive.
//! - Locked items are never re-portioned.

pub mod anchor;

pub use anchor::{AnchorDayPlanner, DEFAULT_ANCHOR_SHARE};

use crate::model::session::{quantize, Item};

/// Options for `apply_baseline_portions`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BaselineOptions {
    /// Main-meal slots; `None` uses the production primary slots.
    pub anchor_slots: Option<Vec<usize>>,
    /// Fraction of day calories given to anchors.
    pub anchor_share: Option<f64>,
    /// Relative weights across anchors, in anchor order.
    pub anchor_weights: Option<Vec<f64>>,
}

/// Collaborator that seeds portion sizes from a calorie plan.
pub trait DayPlanner: Send + Sync {
    /// Calories assigned to each of `meals` slots.
    fn kcal_shares(&self, day_kcal: f64, meals: usize, options: &BaselineOptions) -> Vec<f64>;

    /// Grams of `item` that deliver `kcal`. `0` when the food has no calories.
    fn grams_for_kcal(&self, item: &Item, kcal: f64) -> f64 {
        let per_100g = item.per_100g.kcal;
        if per_100g <= 0.0 || !kcal.is_finite() || kcal <= 0.0 {
            return 0.0;
        }
        kcal / per_100g * 100.0
    }
}

/// Assigns grams to unlocked, empty-portion items from their slot share.
///
/// Items that already carry grams keep them.
pub fn seed_portions(
    planner: &dyn DayPlanner,
    items: &[Option<Item>],
    day_kcal: f64,
    options: &BaselineOptions,
) -> Vec<Option<Item>> {
    let shares = planner.kcal_shares(day_kcal, items.len(), options);
    items
        .iter()
        .enumerate()
        .map(|(index, slot)| {
            let item = slot.as_ref()?;
            if !item.is_movable() || item.grams > 0 {
                return Some(item.clone());
            }
            let share = shares.get(index).copied().unwrap_or(0.0);
            let mut seeded = item.clone();
            seeded.grams = quantize(planner.grams_for_kcal(item, share));
            Some(seeded)
        })
        .collect()
}
