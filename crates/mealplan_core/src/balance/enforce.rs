//! Must-touch enforcement: guarantees an observable change on a primary slot.
//!
//! When the regular passes leave every primary slot where it was, one slot is
//! nudged by a quantum, pinned, and the passes are rerun around it. The nudge
//! is kept only if the whole plan still lands inside tolerance and its
//! calorie deviation is no worse than before the nudge.

use crate::balance::deviation::{fat_floor_holds, Deviations};
use crate::balance::run_passes;
use crate::balance::tolerance::Tolerances;
use crate::model::macros::Macros;
use crate::model::session::{quantize, slot_grams, Item, QUANTUM_GRAMS};
use log::debug;

/// Whether any present, unlocked item changed its quantized grams.
pub fn changed_unlocked(before: &[Option<Item>], after: &[Option<Item>]) -> bool {
    let after_grams = slot_grams(after);
    before.iter().enumerate().any(|(index, slot)| match slot {
        None => after.get(index).is_some_and(Option::is_some),
        Some(item) if !item.is_movable() => false,
        Some(item) => {
            quantize(f64::from(item.grams)) != after_grams.get(index).copied().unwrap_or(0)
        }
    })
}

/// Whether a present, unlocked primary slot changed its quantized grams.
pub fn primary_touched(before: &[Option<Item>], after: &[Option<Item>], primary: &[usize]) -> bool {
    let before_grams = slot_grams(before);
    let after_grams = slot_grams(after);
    primary.iter().any(|&slot| {
        if slot >= after_grams.len() {
            return false;
        }
        match before.get(slot) {
            Some(Some(item)) if item.is_movable() => {
                before_grams.get(slot) != after_grams.get(slot)
            }
            _ => false,
        }
    })
}

/// Whether the run must force a change: no primary moved, or the preferred
/// slot is primary and stayed put.
pub fn needs_forced_touch(
    before: &[Option<Item>],
    after: &[Option<Item>],
    primary: &[usize],
    prefer_index: Option<usize>,
) -> bool {
    if !primary_touched(before, after, primary) {
        return true;
    }
    match prefer_index {
        Some(prefer) if primary.contains(&prefer) => {
            let before_grams = slot_grams(before);
            let after_grams = slot_grams(after);
            before_grams.get(prefer).copied().unwrap_or(0)
                == after_grams.get(prefer).copied().unwrap_or(0)
        }
        _ => false,
    }
}

/// Tries a pinned nudge on a primary slot, then on a distinct preferred slot
/// outside the primary set. Returns the accepted plan, if any.
pub fn force_primary_touch(
    base: &[Option<Item>],
    target: &Macros,
    tolerances: &Tolerances,
    primary: &[usize],
    prefer_index: Option<usize>,
) -> Option<Vec<Option<Item>>> {
    if let Some(slot) = pick_nudge_slot(base, primary, prefer_index) {
        if let Some(items) = nudge_slot(base, slot, target, tolerances) {
            return Some(items);
        }
    }

    let prefer = prefer_index.filter(|prefer| !primary.contains(prefer))?;
    nudge_slot(base, prefer, target, tolerances)
}

/// The preferred slot when it is primary and unlocked, else the first
/// unlocked primary slot.
pub fn pick_nudge_slot(
    items: &[Option<Item>],
    primary: &[usize],
    prefer_index: Option<usize>,
) -> Option<usize> {
    let unlocked = |slot: usize| matches!(items.get(slot), Some(Some(item)) if item.is_movable());
    if let Some(prefer) = prefer_index {
        if primary.contains(&prefer) && unlocked(prefer) {
            return Some(prefer);
        }
    }
    primary.iter().copied().find(|slot| unlocked(*slot))
}

/// Nudges `slot` by `+10` then `-10` grams with the slot pinned, reruns the
/// passes, and accepts the first direction that ends inside tolerance without
/// widening the calorie deviation of `base`.
///
/// The pin only lasts for the rerun; the accepted plan keeps the slot's
/// original (unlocked) state.
pub fn nudge_slot(
    base: &[Option<Item>],
    slot: usize,
    target: &Macros,
    tolerances: &Tolerances,
) -> Option<Vec<Option<Item>>> {
    let start = match base.get(slot) {
        Some(Some(item)) if item.is_movable() => quantize(f64::from(item.grams)),
        _ => return None,
    };
    let quantum = f64::from(QUANTUM_GRAMS);
    let base_kcal = Deviations::of(base, target).kcal;

    for step in [quantum, -quantum] {
        let mut work = base.to_vec();
        if let Some(Some(item)) = work.get_mut(slot) {
            item.grams = quantize(f64::from(start) + step);
            item.locked = true;
        }

        let mut out = run_passes(&work, target, tolerances, Some(slot));
        let moved = slot_grams(&out).get(slot).copied().unwrap_or(start) != start;
        let deviations = Deviations::of(&out, target);
        if moved
            && deviations.kcal <= base_kcal
            && tolerances.accepts(&deviations)
            && fat_floor_holds(&out, tolerances.fat_floor)
        {
            if let Some(Some(item)) = out.get_mut(slot) {
                item.locked = false;
            }
            debug!(
                "event=must_touch module=balance status=ok slot={} step={} dk={:.1}",
                slot, step, deviations.kcal
            );
            return Some(out);
        }
    }

    debug!(
        "event=must_touch module=balance status=rejected slot={}",
        slot
    );
    None
}

#[cfg(test)]
mod tests {
    use super::{changed_unlocked, needs_forced_touch, nudge_slot, pick_nudge_slot};
    use crate::balance::tolerance::{AutoBalanceOptions, Tolerances};
    use crate::model::macros::Macros;
    use crate::model::session::{FoodInput, Item};

    fn item(grams: f64, locked: bool) -> Option<Item> {
        Some(Item::from_food(
            &FoodInput::new("food", Macros::new(100.0, 10.0, 10.0, 4.0)),
            grams,
            locked,
        ))
    }

    fn balanced_plan() -> Vec<Option<Item>> {
        vec![
            item(410.0, false),
            item(410.0, false),
            item(450.0, false),
            item(450.0, false),
            item(480.0, false),
        ]
    }

    #[test]
    fn change_detection_ignores_locked_and_empty_slots() {
        let before = vec![item(100.0, true), None, item(100.0, false)];
        let mut after = before.clone();
        if let Some(item) = after[0].as_mut() {
            item.grams = 200;
        }
        assert!(!changed_unlocked(&before, &after));

        if let Some(item) = after[2].as_mut() {
            item.grams = 110;
        }
        assert!(changed_unlocked(&before, &after));
    }

    #[test]
    fn forced_touch_needed_when_primary_or_preferred_slot_is_static() {
        let before = balanced_plan();
        let mut after = before.clone();
        assert!(needs_forced_touch(&before, &after, &[0, 1], None));

        if let Some(item) = after[1].as_mut() {
            item.grams = 400;
        }
        assert!(!needs_forced_touch(&before, &after, &[0, 1], None));
        assert!(needs_forced_touch(&before, &after, &[0, 1], Some(0)));
        assert!(!needs_forced_touch(&before, &after, &[0, 1], Some(3)));
    }

    #[test]
    fn nudge_slot_prefers_unlocked_primary() {
        let mut items = balanced_plan();
        if let Some(item) = items[0].as_mut() {
            item.locked = true;
        }
        assert_eq!(pick_nudge_slot(&items, &[0, 1], Some(0)), Some(1));
        assert_eq!(pick_nudge_slot(&items, &[0, 1], Some(4)), Some(1));
        assert_eq!(pick_nudge_slot(&items, &[0], None), None);
    }

    #[test]
    fn nudge_moves_slot_and_rebalances_neighbours() {
        let target = Macros::new(2200.0, 220.0, 220.0, 88.0);
        let tolerances = Tolerances::resolve(&AutoBalanceOptions::default(), &target);

        let out = nudge_slot(&balanced_plan(), 0, &target, &tolerances)
            .expect("nudge should be accepted");
        let grams: Vec<u32> = out
            .iter()
            .map(|slot| slot.as_ref().map_or(0, |item| item.grams))
            .collect();
        assert_eq!(grams, vec![420, 400, 450, 450, 480]);
        assert!(out.iter().flatten().all(|item| !item.locked));
    }

    #[test]
    fn nudge_is_rejected_when_tolerance_cannot_be_met() {
        let target = Macros::new(2200.0, 220.0, 220.0, 88.0);
        let options = AutoBalanceOptions {
            fat_floor: Some(89.0),
            ..AutoBalanceOptions::default()
        };
        let tolerances = Tolerances::resolve(&options, &target);
        assert!(nudge_slot(&balanced_plan(), 0, &target, &tolerances).is_none());
    }

    fn grams(items: &[Option<Item>]) -> Vec<u32> {
        items
            .iter()
            .map(|slot| slot.as_ref().map_or(0, |item| item.grams))
            .collect()
    }

    fn mixed_plan(first: f64, second: f64) -> Vec<Option<Item>> {
        vec![
            Some(Item::from_food(
                &FoodInput::new("lean", Macros::new(100.0, 0.0, 0.0, 0.0)),
                first,
                false,
            )),
            Some(Item::from_food(
                &FoodInput::new("dense", Macros::new(130.0, 0.0, 0.0, 0.0)),
                second,
                false,
            )),
        ]
    }

    #[test]
    fn nudge_never_widens_calorie_deviation() {
        let target = Macros::new(460.0, 0.0, 0.0, 0.0);
        let options = AutoBalanceOptions {
            fat_floor: Some(0.0),
            ..AutoBalanceOptions::default()
        };
        let tolerances = Tolerances::resolve(&options, &target);

        let out = nudge_slot(&mixed_plan(210.0, 190.0), 0, &target, &tolerances)
            .expect("closing nudge should be accepted");
        assert_eq!(grams(&out), vec![200, 200]);

        // Both directions land 3 kcal off an exact plan.
        assert!(nudge_slot(&mixed_plan(200.0, 200.0), 0, &target, &tolerances).is_none());
    }
}
