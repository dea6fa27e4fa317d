//! Calorie tuner: one greedy ±quantum sweep over the slots.
//!
//! A step is kept when the fat floor still holds and the absolute calorie
//! deviation is no worse than the best seen so far. Ties are accepted, so a
//! later slot can take over a residual that an earlier slot left.

use crate::balance::deviation::{fat_floor_holds, set_grams, Deviations};
use crate::model::macros::Macros;
use crate::model::session::{quantize, Item, QUANTUM_GRAMS};

/// Runs a single forward sweep and returns the adjusted items.
///
/// `prefer_index` is visited first when it addresses a slot; the other
/// slots follow in natural order. Locked and empty slots are skipped.
pub fn tune_calories(
    items: &[Option<Item>],
    target: &Macros,
    prefer_index: Option<usize>,
    fat_floor: f64,
) -> Vec<Option<Item>> {
    let mut work = items.to_vec();
    let mut best = Deviations::of(&work, target).kcal;
    let quantum = f64::from(QUANTUM_GRAMS);

    for index in visit_order(work.len(), prefer_index) {
        for step in [quantum, -quantum] {
            try_step(&mut work, index, step, target, fat_floor, &mut best);
        }
    }

    work
}

/// `[prefer, rest...]` when `prefer` is in range, else `0..len`.
pub fn visit_order(len: usize, prefer_index: Option<usize>) -> Vec<usize> {
    match prefer_index {
        Some(prefer) if prefer < len => std::iter::once(prefer)
            .chain((0..len).filter(|index| *index != prefer))
            .collect(),
        _ => (0..len).collect(),
    }
}

fn try_step(
    work: &mut [Option<Item>],
    index: usize,
    step: f64,
    target: &Macros,
    fat_floor: f64,
    best: &mut f64,
) {
    let before = match work.get(index) {
        Some(Some(item)) if item.is_movable() => quantize(f64::from(item.grams)),
        _ => return,
    };
    let after = quantize(f64::from(before) + step);
    if after == before {
        return;
    }

    set_grams(work, index, after);
    let deviation = Deviations::of(work, target).kcal;
    if fat_floor_holds(work, fat_floor) && deviation <= *best {
        *best = deviation;
    } else {
        set_grams(work, index, before);
    }
}
