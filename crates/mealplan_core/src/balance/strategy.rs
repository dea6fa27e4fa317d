//! Balance engine strategies.
//!
//! The engine is chosen once, from configuration, when the service is built.
//! Call sites only ever talk to `dyn BalanceStrategy`.

use crate::balance::enforce::{changed_unlocked, force_primary_touch, needs_forced_touch};
use crate::balance::tolerance::Tolerances;
use crate::balance::tuner::tune_calories;
use crate::balance::run_passes;
use crate::model::macros::Macros;
use crate::model::session::Item;
use std::sync::Arc;

/// Engine identifiers accepted by configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EngineKind {
    /// Calorie tuner, carbohydrate pass and must-touch enforcement.
    #[default]
    Guided,
    /// Calorie tuner only.
    CalorieOnly,
}

impl EngineKind {
    /// Parses a configuration value; `v2`/`legacy` are accepted as aliases.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "guided" | "v2" => Some(Self::Guided),
            "calorie_only" | "calorie-only" | "legacy" => Some(Self::CalorieOnly),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Guided => "guided",
            Self::CalorieOnly => "calorie_only",
        }
    }
}

/// Everything one balance run needs; no storage handles.
#[derive(Debug, Clone)]
pub struct BalanceInput<'a> {
    pub items: &'a [Option<Item>],
    pub target: Macros,
    pub tolerances: Tolerances,
    pub prefer_index: Option<usize>,
    pub primary_slots: Vec<usize>,
}

/// Result of one balance run.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceOutcome {
    pub items: Vec<Option<Item>>,
    /// `true` when a forced nudge was accepted or any unlocked slot moved.
    pub applied: bool,
    /// `true` when the must-touch layer produced `items`.
    pub forced: bool,
}

/// Pluggable auto-balance engine.
pub trait BalanceStrategy: Send + Sync {
    fn kind(&self) -> EngineKind;
    fn balance(&self, input: &BalanceInput<'_>) -> BalanceOutcome;
}

/// Default engine: tuner, conditional carb pass, must-touch guarantee.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuidedBalancer;

impl BalanceStrategy for GuidedBalancer {
    fn kind(&self) -> EngineKind {
        EngineKind::Guided
    }

    fn balance(&self, input: &BalanceInput<'_>) -> BalanceOutcome {
        let run = run_passes(
            input.items,
            &input.target,
            &input.tolerances,
            input.prefer_index,
        );

        if needs_forced_touch(input.items, &run, &input.primary_slots, input.prefer_index) {
            if let Some(forced) = force_primary_touch(
                &run,
                &input.target,
                &input.tolerances,
                &input.primary_slots,
                input.prefer_index,
            ) {
                return BalanceOutcome {
                    items: forced,
                    applied: true,
                    forced: true,
                };
            }
        }

        BalanceOutcome {
            applied: changed_unlocked(input.items, &run),
            items: run,
            forced: false,
        }
    }
}

/// Single calorie sweep with no carbohydrate or must-touch phases.
#[derive(Debug, Clone, Copy, Default)]
pub struct CalorieOnlyBalancer;

impl BalanceStrategy for CalorieOnlyBalancer {
    fn kind(&self) -> EngineKind {
        EngineKind::CalorieOnly
    }

    fn balance(&self, input: &BalanceInput<'_>) -> BalanceOutcome {
        let items = tune_calories(
            input.items,
            &input.target,
            input.prefer_index,
            input.tolerances.fat_floor,
        );
        BalanceOutcome {
            applied: changed_unlocked(input.items, &items),
            items,
            forced: false,
        }
    }
}

/// Builds the engine for `kind`.
pub fn strategy_for(kind: EngineKind) -> Arc<dyn BalanceStrategy> {
    match kind {
        EngineKind::Guided => Arc::new(GuidedBalancer),
        EngineKind::CalorieOnly => Arc::new(CalorieOnlyBalancer),
    }
}
