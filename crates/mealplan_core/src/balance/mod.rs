//! Auto-balance engine.
//!
//! # Responsibility
//! - Adjust unlocked slot portions so day totals approach the target.
//! - Keep every pass pure: items in, items out, no storage access.
//!
//! # Invariants
//! - Every portion change is a multiple of `QUANTUM_GRAMS`.
//! - Locked items are never moved (the nudge pin is restored on output).
//! - Every accepted step keeps the fat floor, except the one late step the
//!   carbohydrate pass may leave behind before it stops.
//! - Each pass terminates without an iteration cap.

pub mod carbs;
mod deviation;
pub mod enforce;
pub mod primary;
pub mod strategy;
pub mod tolerance;
pub mod tuner;

pub use deviation::{calorie_band, fat_floor_holds, Deviations};
pub use primary::{effective_primary_slots, resolve_primary_slots, PrimarySlotProfile};
pub use strategy::{
    strategy_for, BalanceInput, BalanceOutcome, BalanceStrategy, CalorieOnlyBalancer, EngineKind,
    GuidedBalancer,
};
pub use tolerance::{AutoBalanceOptions, Tolerances};

use crate::model::macros::Macros;
use crate::model::session::Item;
use carbs::{redistribute_carbs, should_redistribute, CarbPassParams};
use tuner::tune_calories;

/// Runs the calorie tuner and, when its result qualifies, the carbohydrate
/// redistribution pass.
pub fn run_passes(
    items: &[Option<Item>],
    target: &Macros,
    tolerances: &Tolerances,
    prefer_index: Option<usize>,
) -> Vec<Option<Item>> {
    let tuned = tune_calories(items, target, prefer_index, tolerances.fat_floor);
    if !should_redistribute(&tuned, target, tolerances.carbs) {
        return tuned;
    }

    redistribute_carbs(
        &tuned,
        target,
        CarbPassParams {
            protein_tol: tolerances.protein,
            fat_floor: tolerances.fat_floor,
        },
    )
}
