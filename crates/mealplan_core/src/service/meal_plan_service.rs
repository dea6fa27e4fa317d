//! Meal-plan session use-case service.
//!
//! # Responsibility
//! - Load, repair and persist the single day-plan session.
//! - Provide slot upsert, totals/delta views, baseline portions and
//!   auto-balance on top of a `SessionStore`.
//!
//! # Invariants
//! - Every mutating call persists the whole session at most once.
//! - Store read failures degrade to a default session; write failures are
//!   returned to the caller.
//! - Returned sessions always satisfy `meals == items.len()` and carry
//!   quantized grams.

use crate::balance::primary::{effective_primary_slots, PrimarySlotProfile};
use crate::balance::strategy::{strategy_for, BalanceInput, BalanceStrategy, EngineKind};
use crate::balance::tolerance::{AutoBalanceOptions, Tolerances};
use crate::config::PlannerConfig;
use crate::model::macros::{MacroDelta, Macros};
use crate::model::session::{
    clamp_meals, quantize, FoodInput, Item, Session, UpsertOptions, DEFAULT_MEALS, MAX_MEALS,
    MIN_MEALS,
};
use crate::planner::{seed_portions, AnchorDayPlanner, BaselineOptions, DayPlanner};
use crate::repo::session_store::{RepoError, SessionStore};
use log::{debug, info, warn};
use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Instant;

/// Storage key of the persisted session blob.
pub const SESSION_KEY: &str = "mealplan_session_v1";

/// Service error for meal-plan use-cases.
#[derive(Debug)]
pub enum MealPlanError {
    /// Persistence-layer failure.
    Repo(RepoError),
    /// Session could not be encoded for storage.
    Serialize(serde_json::Error),
}

impl Display for MealPlanError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Serialize(err) => write!(f, "session encode failed: {err}"),
        }
    }
}

impl Error for MealPlanError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Serialize(err) => Some(err),
        }
    }
}

impl From<RepoError> for MealPlanError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<serde_json::Error> for MealPlanError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialize(value)
    }
}

pub type MealPlanResult<T> = Result<T, MealPlanError>;

/// Totals, signed deviation and target for the current session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanDelta {
    pub totals: Macros,
    pub delta: MacroDelta,
    pub target: Macros,
    pub session: Session,
}

/// Why an auto-balance run did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BalanceReason {
    /// No present item is unlocked.
    AllLocked,
}

impl BalanceReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AllLocked => "all-locked",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BalanceSummary {
    pub reason: BalanceReason,
}

/// Result of `apply_auto_balance`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AutoBalanceResult {
    pub applied: bool,
    pub session: Session,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<BalanceSummary>,
}

/// Result of `apply_baseline_portions`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaselineResult {
    pub applied: bool,
    pub session: Session,
}

/// Meal-plan service facade over a session store.
pub struct MealPlanService<S: SessionStore> {
    store: S,
    balancer: Arc<dyn BalanceStrategy>,
    primary_profile: PrimarySlotProfile,
    planner: Arc<dyn DayPlanner>,
}

impl<S: SessionStore> MealPlanService<S> {
    /// Creates a service with default engine and primary-slot profile.
    pub fn new(store: S) -> Self {
        Self::with_config(store, &PlannerConfig::default())
    }

    /// Creates a service using engine and profile from `config`.
    pub fn with_config(store: S, config: &PlannerConfig) -> Self {
        Self {
            store,
            balancer: strategy_for(config.engine),
            primary_profile: config.primary_profile,
            planner: Arc::new(AnchorDayPlanner),
        }
    }

    /// Replaces the balance engine.
    pub fn with_balancer(mut self, balancer: Arc<dyn BalanceStrategy>) -> Self {
        self.balancer = balancer;
        self
    }

    /// Replaces the baseline day planner.
    pub fn with_day_planner(mut self, planner: Arc<dyn DayPlanner>) -> Self {
        self.planner = planner;
        self
    }

    pub fn engine(&self) -> EngineKind {
        self.balancer.kind()
    }

    /// Loads the stored session, repairing it when needed.
    ///
    /// Missing or malformed data yields a fresh default session that is
    /// written back. Alias-normalized data is written back once.
    pub fn load_session(&self) -> MealPlanResult<Session> {
        let started_at = Instant::now();
        let raw = match self.store.read(SESSION_KEY) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(
                    "event=session_load module=service status=fallback reason=read_failed error={}",
                    err
                );
                None
            }
        };

        let Some(raw) = raw else {
            return self.reset_session(DEFAULT_MEALS, "missing");
        };
        let value = match serde_json::from_str::<Value>(&raw) {
            Ok(value) => value,
            Err(_) => return self.reset_session(DEFAULT_MEALS, "unparsable"),
        };
        let item_count = value.get("items").and_then(Value::as_array).map(Vec::len);
        if !item_count.is_some_and(|len| (MIN_MEALS..=MAX_MEALS).contains(&len)) {
            let meals = value
                .get("meals")
                .and_then(Value::as_f64)
                .map_or(DEFAULT_MEALS, clamp_meals);
            return self.reset_session(meals, "malformed_items");
        }

        let mut session = match serde_json::from_value::<Session>(value.clone()) {
            Ok(session) => session,
            Err(_) => return self.reset_session(DEFAULT_MEALS, "undecodable"),
        };
        session.normalize();

        let repaired = serde_json::to_value(&session)? != value;
        if repaired {
            self.write_session(&session)?;
        }
        debug!(
            "event=session_load module=service status=ok meals={} repaired={} duration_ms={}",
            session.meals,
            repaired,
            started_at.elapsed().as_millis()
        );
        Ok(session)
    }

    /// Replaces the stored session with `meals` empty slots.
    ///
    /// `meals` is rounded and clamped into `[1, 6]`.
    pub fn init_session(
        &self,
        meals: f64,
        day_target: Macros,
        diet_style: Option<String>,
    ) -> MealPlanResult<Session> {
        let diet_style = diet_style
            .map(|style| style.trim().to_string())
            .filter(|style| !style.is_empty());
        let session = Session::empty(clamp_meals(meals), day_target, diet_style);
        self.write_session(&session)?;
        info!(
            "event=session_init module=service status=ok meals={} target_kcal={}",
            session.meals, session.day_target.kcal
        );
        Ok(session)
    }

    /// Places `food` at `index`.
    ///
    /// Out-of-range indexes and locked slots (without `force`) are no-ops
    /// that write nothing.
    pub fn upsert_item(
        &self,
        index: usize,
        food: &FoodInput,
        grams: f64,
        options: UpsertOptions,
    ) -> MealPlanResult<Session> {
        let mut session = self.load_session()?;
        let Some(slot) = session.items.get_mut(index) else {
            debug!(
                "event=item_upsert module=service status=skipped reason=out_of_range index={}",
                index
            );
            return Ok(session);
        };
        if slot.as_ref().is_some_and(|current| current.locked) && !options.force {
            debug!(
                "event=item_upsert module=service status=skipped reason=locked index={}",
                index
            );
            return Ok(session);
        }

        *slot = Some(Item::from_food(food, grams, options.locked));
        self.write_session(&session)?;
        info!(
            "event=item_upsert module=service status=ok index={} locked={}",
            index, options.locked
        );
        Ok(session)
    }

    /// Sum of contributions of all present items.
    pub fn totals(&self) -> MealPlanResult<Macros> {
        Ok(self.load_session()?.totals())
    }

    /// Totals and signed deviation from the stored day target.
    pub fn delta(&self) -> MealPlanResult<PlanDelta> {
        let session = self.load_session()?;
        Ok(PlanDelta {
            totals: session.totals(),
            delta: session.delta(),
            target: session.day_target,
            session,
        })
    }

    /// Seeds portions for unlocked items that have no grams yet.
    ///
    /// A plan without any item is returned untouched with `applied = false`.
    pub fn apply_baseline_portions(
        &self,
        options: &BaselineOptions,
    ) -> MealPlanResult<BaselineResult> {
        let session = self.load_session()?;
        if session.items.iter().all(Option::is_none) {
            debug!("event=baseline_portions module=service status=skipped reason=empty_plan");
            return Ok(BaselineResult {
                applied: false,
                session,
            });
        }

        let seeded = seed_portions(
            self.planner.as_ref(),
            &session.items,
            session.day_target.kcal,
            options,
        );
        let session = self.persist_items(session, seeded)?;
        info!(
            "event=baseline_portions module=service status=ok meals={}",
            session.meals
        );
        Ok(BaselineResult {
            applied: true,
            session,
        })
    }

    /// Adjusts unlocked portions toward the day target and persists them.
    pub fn apply_auto_balance(
        &self,
        options: &AutoBalanceOptions,
    ) -> MealPlanResult<AutoBalanceResult> {
        let started_at = Instant::now();
        let session = self.load_session()?;
        if !session.has_unlocked_item() {
            info!(
                "event=auto_balance module=service status=skipped reason={}",
                BalanceReason::AllLocked.as_str()
            );
            return Ok(AutoBalanceResult {
                applied: false,
                session,
                summary: Some(BalanceSummary {
                    reason: BalanceReason::AllLocked,
                }),
            });
        }

        let target = options.target.unwrap_or(session.day_target);
        let input = BalanceInput {
            items: &session.items,
            target,
            tolerances: Tolerances::resolve(options, &target),
            prefer_index: options.prefer_index,
            primary_slots: effective_primary_slots(
                options.primary_slots.as_deref(),
                session.items.len(),
                self.primary_profile,
            ),
        };
        let outcome = self.balancer.balance(&input);

        let session = self.persist_items(session, outcome.items)?;
        info!(
            "event=auto_balance module=service status=ok engine={} applied={} forced={} duration_ms={}",
            self.balancer.kind().as_str(),
            outcome.applied,
            outcome.forced,
            started_at.elapsed().as_millis()
        );
        Ok(AutoBalanceResult {
            applied: outcome.applied,
            session,
            summary: None,
        })
    }

    fn reset_session(&self, meals: usize, reason: &str) -> MealPlanResult<Session> {
        let session = Session::empty(meals, Macros::default(), None);
        self.write_session(&session)?;
        info!(
            "event=session_load module=service status=reset reason={} meals={}",
            reason, session.meals
        );
        Ok(session)
    }

    fn persist_items(
        &self,
        mut session: Session,
        items: Vec<Option<Item>>,
    ) -> MealPlanResult<Session> {
        session.items = items
            .into_iter()
            .map(|slot| {
                slot.map(|mut item| {
                    item.grams = quantize(f64::from(item.grams));
                    item
                })
            })
            .collect();
        session.normalize();
        self.write_session(&session)?;
        Ok(session)
    }

    fn write_session(&self, session: &Session) -> MealPlanResult<()> {
        let encoded = serde_json::to_string(session)?;
        self.store.write(SESSION_KEY, &encoded)?;
        Ok(())
    }
}
