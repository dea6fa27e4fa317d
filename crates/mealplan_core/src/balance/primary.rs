//! Primary ("must-touch") slot resolution.
//!
//! The profile is an explicit input so resolution never depends on ambient
//! process state.

/// Which primary slot layout applies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PrimarySlotProfile {
    /// Breakfast/lunch/dinner positions for the meal count.
    #[default]
    Production,
    /// Always `[0, 1]`; reproducible layout for verification runs.
    Fixed,
}

impl PrimarySlotProfile {
    /// Parses a configuration value (`production` | `fixed`, case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Some(Self::Production),
            "fixed" | "test" => Some(Self::Fixed),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Fixed => "fixed",
        }
    }
}

/// Returns the canonical primary slot indices for `meals` slots.
pub fn resolve_primary_slots(meals: usize, profile: PrimarySlotProfile) -> Vec<usize> {
    if profile == PrimarySlotProfile::Fixed {
        return vec![0, 1];
    }

    match meals {
        3 => vec![0, 1, 2],
        4 => vec![0, 1, 3],
        5 => vec![0, 2, 4],
        6 => vec![0, 2, 5],
        _ => (0..3).filter(|index| *index < meals).collect(),
    }
}

/// A non-empty caller list wins; otherwise resolve from the profile.
pub fn effective_primary_slots(
    explicit: Option<&[usize]>,
    meals: usize,
    profile: PrimarySlotProfile,
) -> Vec<usize> {
    match explicit {
        Some(slots) if !slots.is_empty() => slots.to_vec(),
        _ => resolve_primary_slots(meals, profile),
    }
}
