//! Anchor-share day planner.
//!
//! Main meals (anchors) split `anchor_share` of the day; the remaining slots
//! split the rest evenly.

use crate::balance::primary::{resolve_primary_slots, PrimarySlotProfile};
use crate::planner::{BaselineOptions, DayPlanner};

pub const DEFAULT_ANCHOR_SHARE: f64 = 0.7;

#[derive(Debug, Clone, Copy, Default)]
pub struct AnchorDayPlanner;

impl DayPlanner for AnchorDayPlanner {
    fn kcal_shares(&self, day_kcal: f64, meals: usize, options: &BaselineOptions) -> Vec<f64> {
        let day_kcal = if day_kcal.is_finite() { day_kcal.max(0.0) } else { 0.0 };
        if meals == 0 {
            return Vec::new();
        }

        let anchors = anchor_slots(options.anchor_slots.as_deref(), meals);
        let snack_count = meals - anchors.len();
        if anchors.is_empty() || snack_count == 0 {
            return vec![day_kcal / meals as f64; meals];
        }

        let share = options
            .anchor_share
            .filter(|value| value.is_finite())
            .unwrap_or(DEFAULT_ANCHOR_SHARE)
            .clamp(0.0, 1.0);
        let weights = anchor_weights(options.anchor_weights.as_deref(), anchors.len());

        let mut shares = vec![day_kcal * (1.0 - share) / snack_count as f64; meals];
        for (anchor, weight) in anchors.iter().zip(weights) {
            shares[*anchor] = day_kcal * share * weight;
        }
        shares
    }
}

fn anchor_slots(requested: Option<&[usize]>, meals: usize) -> Vec<usize> {
    let candidates = match requested {
        Some(slots) => slots.to_vec(),
        None => resolve_primary_slots(meals, PrimarySlotProfile::Production),
    };
    let mut anchors: Vec<usize> = Vec::with_capacity(candidates.len());
    for slot in candidates {
        if slot < meals && !anchors.contains(&slot) {
            anchors.push(slot);
        }
    }
    anchors
}

/// Normalized weights; equal split unless the caller's list fits.
fn anchor_weights(requested: Option<&[f64]>, count: usize) -> Vec<f64> {
    if let Some(weights) = requested {
        let valid = weights.len() == count
            && weights.iter().all(|weight| weight.is_finite() && *weight >= 0.0);
        let sum: f64 = weights.iter().sum();
        if valid && sum > 0.0 {
            return weights.iter().map(|weight| weight / sum).collect();
        }
    }
    vec![1.0 / count as f64; count]
}
