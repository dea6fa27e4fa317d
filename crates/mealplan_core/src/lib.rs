//! Core domain logic for the meal-plan auto-balance engine.
//! This crate owns every portion and balance invariant; FFI and CLI only
//! forward calls into it.

pub mod balance;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod planner;
pub mod repo;
pub mod service;

pub use balance::{
    strategy_for, AutoBalanceOptions, BalanceStrategy, CalorieOnlyBalancer, EngineKind,
    GuidedBalancer, PrimarySlotProfile, Tolerances,
};
pub use config::PlannerConfig;
pub use db::{open_db, open_db_in_memory, DbError};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::macros::{MacroDelta, Macros};
pub use model::session::{FoodInput, Item, Session, UpsertOptions};
pub use planner::{AnchorDayPlanner, BaselineOptions, DayPlanner};
pub use repo::session_store::{RepoError, RepoResult, SessionStore, SqliteSessionStore};
pub use service::meal_plan_service::{
    AutoBalanceResult, BalanceReason, BalanceSummary, BaselineResult, MealPlanError,
    MealPlanResult, MealPlanService, PlanDelta, SESSION_KEY,
};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
