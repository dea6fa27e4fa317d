//! Carbohydrate redistribution pass.
//!
//! Runs only when calories already sit inside the tight band but
//! carbohydrates do not. Each round adds mass to the most carb-dense,
//! protein-light slot (the acceptor) and pays the calorie cost back from the
//! most fat-dense slots (the donors).
//!
//! The fat floor is checked after the round is applied, so a violating round
//! stays in the result. That late check is intentional and covered by tests.

use crate::balance::deviation::{
    calorie_band, fat_floor_holds, per_quantum, set_grams, unlocked_count, Deviations,
};
use crate::model::macros::Macros;
use crate::model::session::{quantize, Item, QUANTUM_GRAMS};
use log::debug;

/// Carb deviation at which the pass declares success.
pub const CARB_FINISH_THRESHOLD: f64 = 15.0;
/// Extra calorie drift above the band tolerated before aborting.
pub const CALORIE_DRIFT_MARGIN: f64 = 10.0;
const PROTEIN_PENALTY: f64 = 0.6;
// Acceptor scores must beat this floor to qualify.
const MIN_ACCEPTOR_SCORE: f64 = -1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CarbPassParams {
    pub protein_tol: f64,
    pub fat_floor: f64,
}

/// Gate for the pass: calories in band, carbohydrates outside `carb_tol`.
pub fn should_redistribute(items: &[Option<Item>], target: &Macros, carb_tol: f64) -> bool {
    let deviations = Deviations::of(items, target);
    deviations.kcal <= calorie_band(target) && deviations.carbs > carb_tol
}

/// Moves mass from fat-dense donors into a carb-dense acceptor until the
/// carbohydrate deviation is small enough or a stop rule fires.
pub fn redistribute_carbs(
    items: &[Option<Item>],
    target: &Macros,
    params: CarbPassParams,
) -> Vec<Option<Item>> {
    let mut work = items.to_vec();
    let band = calorie_band(target);
    let mut current = Deviations::of(&work, target);
    if current.kcal > band {
        return work;
    }

    while current.carbs > CARB_FINISH_THRESHOLD {
        let Some(acceptor) = pick_acceptor(&work) else {
            break;
        };
        let step = step_for(current.carbs, unlocked_count(&work));
        let (grown, kcal_per_quantum) = match work.get(acceptor) {
            Some(Some(item)) => (
                quantize(f64::from(item.grams) + step),
                per_quantum(item.per_100g.kcal).max(0.0),
            ),
            _ => break,
        };
        set_grams(&mut work, acceptor, grown);

        let debt = kcal_per_quantum * step / f64::from(QUANTUM_GRAMS);
        compensate_from_donors(&mut work, acceptor, debt, target, params.protein_tol);

        let fats_ok = fat_floor_holds(&work, params.fat_floor);
        let previous_carbs = current.carbs;
        current = Deviations::of(&work, target);

        if !fats_ok {
            debug!("event=carb_pass module=balance status=stopped reason=fat_floor");
            break;
        }
        if current.kcal > band + CALORIE_DRIFT_MARGIN {
            debug!(
                "event=carb_pass module=balance status=stopped reason=kcal_drift dk={:.1}",
                current.kcal
            );
            break;
        }
        if current.carbs >= previous_carbs {
            debug!("event=carb_pass module=balance status=stopped reason=no_progress");
            break;
        }
    }

    work
}

/// Unlocked slot maximizing `carbs/kcal - 0.6 * protein/kcal`; first wins ties.
pub fn pick_acceptor(items: &[Option<Item>]) -> Option<usize> {
    let mut best: Option<usize> = None;
    let mut best_score = MIN_ACCEPTOR_SCORE;
    for (index, slot) in items.iter().enumerate() {
        let Some(item) = slot.as_ref().filter(|item| item.is_movable()) else {
            continue;
        };
        let kcal = item.per_100g.kcal.max(1.0);
        let score = item.per_100g.carbs / kcal - PROTEIN_PENALTY * item.per_100g.protein / kcal;
        if score > best_score {
            best_score = score;
            best = Some(index);
        }
    }
    best
}

/// Unlocked slots with fat, most fat-dense first (stable for equal scores).
pub fn rank_donors(items: &[Option<Item>]) -> Vec<usize> {
    let mut scored: Vec<(usize, f64)> = items
        .iter()
        .enumerate()
        .filter_map(|(index, slot)| {
            let item = slot.as_ref()?;
            if !item.is_movable() || item.per_100g.fats <= 0.0 {
                return None;
            }
            Some((index, item.per_100g.fats / item.per_100g.kcal.max(1.0)))
        })
        .collect();
    scored.sort_by(|left, right| right.1.total_cmp(&left.1));
    scored.into_iter().map(|(index, _)| index).collect()
}

/// Acceptor step in grams: coarser when few slots can move or the gap is large.
pub fn step_for(carb_deviation: f64, unlocked: usize) -> f64 {
    if unlocked <= 3 {
        if carb_deviation >= 60.0 {
            15.0
        } else {
            10.0
        }
    } else if carb_deviation >= 30.0 {
        10.0
    } else {
        5.0
    }
}

fn compensate_from_donors(
    work: &mut [Option<Item>],
    acceptor: usize,
    mut debt: f64,
    target: &Macros,
    protein_tol: f64,
) {
    for donor in rank_donors(work) {
        if debt <= 0.0 {
            break;
        }
        if donor == acceptor {
            continue;
        }
        let (held, kcal_per_quantum, protein_per_quantum) = match work.get(donor) {
            Some(Some(item)) => (
                quantize(f64::from(item.grams)),
                per_quantum(item.per_100g.kcal),
                per_quantum(item.per_100g.protein),
            ),
            _ => continue,
        };
        if held == 0 {
            continue;
        }

        let protein_gap = Deviations::of(work, target).protein;
        if protein_gap + (-protein_per_quantum).max(0.0) > protein_tol {
            continue;
        }

        let removed = held.min(QUANTUM_GRAMS);
        set_grams(work, donor, held - removed);
        debt -= kcal_per_quantum.max(0.0) * f64::from(removed) / f64::from(QUANTUM_GRAMS);
    }
}
