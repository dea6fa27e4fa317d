//! Macro-nutrient values and alias canonicalization.
//!
//! Stored and caller-supplied records name the same field several ways
//! (`kcal`/`calories`, `carbs`/`carbohydrates`, `fats`/`fat`). `RawMacros`
//! accepts all of them and converts into the single canonical `Macros`;
//! serialization writes both calorie names with the same value.
//!
//! Stored numbers may arrive as numeric strings; anything that is neither a
//! number nor a numeric string reads as `0` instead of failing the record.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Canonical calorie and macro amounts.
///
/// Used both per 100 g of a food and for day-level targets and totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawMacros", into = "StoredMacros")]
pub struct Macros {
    pub kcal: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fats: f64,
}

impl Macros {
    /// Builds sanitized macros; non-finite and negative inputs become `0`.
    pub fn new(kcal: f64, protein: f64, carbs: f64, fats: f64) -> Self {
        Self {
            kcal: sanitize(kcal),
            protein: sanitize(protein),
            carbs: sanitize(carbs),
            fats: sanitize(fats),
        }
    }

    /// Alias for `kcal`, kept for callers that think in "calories".
    pub fn calories(&self) -> f64 {
        self.kcal
    }

    /// Returns `self * grams / 100`.
    pub fn scaled_to(&self, grams: f64) -> Self {
        Self {
            kcal: self.kcal * grams / 100.0,
            protein: self.protein * grams / 100.0,
            carbs: self.carbs * grams / 100.0,
            fats: self.fats * grams / 100.0,
        }
    }

    /// Signed per-field difference `self - other`.
    pub fn minus(&self, other: &Macros) -> MacroDelta {
        MacroDelta {
            calories: self.kcal - other.kcal,
            protein: self.protein - other.protein,
            carbs: self.carbs - other.carbs,
            fats: self.fats - other.fats,
        }
    }

    pub(crate) fn accumulate(&mut self, other: &Macros) {
        self.kcal += other.kcal;
        self.protein += other.protein;
        self.carbs += other.carbs;
        self.fats += other.fats;
    }
}

/// Signed difference between totals and target. Positive means over target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MacroDelta {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fats: f64,
}

/// Lenient input shape accepting every known field alias.
#[derive(Debug, Default, Deserialize)]
struct RawMacros {
    #[serde(default, deserialize_with = "lenient_number")]
    kcal: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    calories: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    protein: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    carbs: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    carbohydrates: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    fats: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    fat: Option<f64>,
}

impl From<RawMacros> for Macros {
    fn from(raw: RawMacros) -> Self {
        Self::new(
            raw.kcal.or(raw.calories).unwrap_or(0.0),
            raw.protein.unwrap_or(0.0),
            raw.carbs.or(raw.carbohydrates).unwrap_or(0.0),
            raw.fats.or(raw.fat).unwrap_or(0.0),
        )
    }
}

/// Persisted shape: both calorie names, always equal.
#[derive(Debug, Serialize)]
struct StoredMacros {
    kcal: f64,
    calories: f64,
    protein: f64,
    carbs: f64,
    fats: f64,
}

impl From<Macros> for StoredMacros {
    fn from(value: Macros) -> Self {
        Self {
            kcal: value.kcal,
            calories: value.kcal,
            protein: value.protein,
            carbs: value.carbs,
            fats: value.fats,
        }
    }
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// `null`/absent reads as `None`; every other value is coerced.
pub(crate) fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(coerce_number))
}

/// Numbers pass through, numeric strings are parsed, the rest is `0`.
pub(crate) fn coerce_number(value: &Value) -> f64 {
    match value {
        Value::Number(number) => number.as_f64().unwrap_or(0.0),
        Value::String(text) => text.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    }
}
