//! Day-plan session and slot items.
//!
//! # Responsibility
//! - Define the persisted session record (`meals`, `items`, `dayTarget`).
//! - Own gram quantization and plan totals math.
//!
//! # Invariants
//! - `items.len() == meals` for every session produced by this module.
//! - `Item::grams` is quantized on construction and on deserialization, so
//!   no code path can observe an off-grid portion.

use crate::model::macros::{lenient_number, MacroDelta, Macros};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Step size for every portion adjustment.
pub const QUANTUM_GRAMS: u32 = 10;
pub const MIN_MEALS: usize = 1;
pub const MAX_MEALS: usize = 6;
pub const DEFAULT_MEALS: usize = 5;

const DEFAULT_ITEM_NAME: &str = "Item";

/// Rounds grams to the nearest multiple of `QUANTUM_GRAMS`.
///
/// Negative and non-finite inputs map to `0`. Idempotent on quantized values.
pub fn quantize(grams: f64) -> u32 {
    if !grams.is_finite() || grams <= 0.0 {
        return 0;
    }
    let quantum = f64::from(QUANTUM_GRAMS);
    let snapped = (grams / quantum).round() * quantum;
    if snapped >= f64::from(u32::MAX) {
        return u32::MAX - (u32::MAX % QUANTUM_GRAMS);
    }
    snapped as u32
}

/// Clamps a requested meal count into `[MIN_MEALS, MAX_MEALS]`.
pub fn clamp_meals(meals: f64) -> usize {
    if !meals.is_finite() {
        return DEFAULT_MEALS;
    }
    meals.round().clamp(MIN_MEALS as f64, MAX_MEALS as f64) as usize
}

/// One filled meal slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(default, deserialize_with = "or_default")]
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_grams")]
    pub grams: u32,
    #[serde(rename = "per100g", default, deserialize_with = "or_default")]
    pub per_100g: Macros,
    #[serde(default, deserialize_with = "or_default")]
    pub locked: bool,
}

impl Item {
    /// Builds an item from caller food data, quantizing `grams`.
    pub fn from_food(food: &FoodInput, grams: f64, locked: bool) -> Self {
        let name = food.name.trim();
        Self {
            name: if name.is_empty() {
                DEFAULT_ITEM_NAME.to_string()
            } else {
                name.to_string()
            },
            grams: quantize(grams),
            per_100g: food.per_100g,
            locked,
        }
    }

    /// Macro contribution of this item at its current portion.
    pub fn contribution(&self) -> Macros {
        self.per_100g.scaled_to(f64::from(self.grams))
    }

    /// Fat grams contributed at the current portion.
    pub fn fat_grams(&self) -> f64 {
        self.per_100g.fats * f64::from(self.grams) / 100.0
    }

    pub fn is_movable(&self) -> bool {
        !self.locked
    }
}

/// Food data accepted by `upsert_item`.
///
/// `per100g` may use any macro alias; a bare `title` is accepted as name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FoodInput {
    #[serde(default, alias = "title")]
    pub name: String,
    #[serde(rename = "per100g", default)]
    pub per_100g: Macros,
}

impl FoodInput {
    pub fn new(name: impl Into<String>, per_100g: Macros) -> Self {
        Self {
            name: name.into(),
            per_100g,
        }
    }
}

/// Flags for `upsert_item`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertOptions {
    /// Lock state written to the new item.
    pub locked: bool,
    /// Replace the slot even when the current item is locked.
    pub force: bool,
}

/// Whole-day plan; the unit of persistence.
///
/// Decoding is field-tolerant: a field of the wrong type falls back to its
/// default and a slot that is not an item reads as empty, so one bad value
/// never discards the rest of the plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default, deserialize_with = "or_default")]
    pub meals: usize,
    #[serde(deserialize_with = "deserialize_slots")]
    pub items: Vec<Option<Item>>,
    #[serde(default, deserialize_with = "or_default")]
    pub day_target: Macros,
    #[serde(
        default,
        deserialize_with = "or_default",
        skip_serializing_if = "Option::is_none"
    )]
    pub diet_style: Option<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self::empty(DEFAULT_MEALS, Macros::default(), None)
    }
}

impl Session {
    /// Creates a session with `meals` empty slots.
    pub fn empty(meals: usize, day_target: Macros, diet_style: Option<String>) -> Self {
        let meals = meals.clamp(MIN_MEALS, MAX_MEALS);
        Self {
            meals,
            items: vec![None; meals],
            day_target,
            diet_style,
        }
    }

    /// Re-establishes `meals == items.len()` after decoding foreign data.
    pub fn normalize(&mut self) {
        self.meals = self.items.len();
    }

    pub fn totals(&self) -> Macros {
        plan_totals(&self.items)
    }

    pub fn delta(&self) -> MacroDelta {
        self.totals().minus(&self.day_target)
    }

    /// Quantized grams per slot; empty slots read as `0`.
    pub fn grams_by_slot(&self) -> Vec<u32> {
        slot_grams(&self.items)
    }

    /// Whether at least one present item can be moved.
    pub fn has_unlocked_item(&self) -> bool {
        self.items.iter().flatten().any(Item::is_movable)
    }
}

/// Sums contributions of all present items.
pub fn plan_totals(items: &[Option<Item>]) -> Macros {
    let mut totals = Macros::default();
    for item in items.iter().flatten() {
        totals.accumulate(&item.contribution());
    }
    totals
}

/// Quantized grams per slot; empty slots read as `0`.
pub fn slot_grams(items: &[Option<Item>]) -> Vec<u32> {
    items
        .iter()
        .map(|slot| slot.as_ref().map_or(0, |item| quantize(f64::from(item.grams))))
        .collect()
}

fn deserialize_grams<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(quantize(lenient_number(deserializer)?.unwrap_or(0.0)))
}

/// Decodes `T`, or yields `T::default()` when the value has the wrong shape.
fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

fn deserialize_slots<'de, D>(deserializer: D) -> Result<Vec<Option<Item>>, D::Error>
where
    D: Deserializer<'de>,
{
    let slots = Vec::<Value>::deserialize(deserializer)?;
    Ok(slots
        .into_iter()
        .map(|slot| serde_json::from_value::<Option<Item>>(slot).unwrap_or(None))
        .collect())
}
