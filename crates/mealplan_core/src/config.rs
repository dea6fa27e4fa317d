//! Process-level planner configuration.
//!
//! # Responsibility
//! - Resolve engine, primary-slot profile and database location once, at
//!   process start.
//!
//! # Invariants
//! - Unknown or blank values fall back to defaults; configuration never fails.
//! - Nothing in the balance engine reads the environment directly.

use crate::balance::primary::PrimarySlotProfile;
use crate::balance::strategy::EngineKind;
use log::warn;
use std::path::PathBuf;

pub const ENV_ENGINE: &str = "MEALPLAN_AUTOBALANCE_ENGINE";
pub const ENV_PRIMARY_PROFILE: &str = "MEALPLAN_PRIMARY_PROFILE";
pub const ENV_DB_PATH: &str = "MEALPLAN_DB_PATH";

/// Settings chosen once per process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlannerConfig {
    pub engine: EngineKind,
    pub primary_profile: PrimarySlotProfile,
    /// Session database file; `None` lets the host pick a location.
    pub db_path: Option<PathBuf>,
}

impl PlannerConfig {
    /// Reads configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let engine = match non_blank(lookup(ENV_ENGINE)) {
            Some(raw) => EngineKind::parse(&raw).unwrap_or_else(|| {
                warn!(
                    "event=config_load module=config status=fallback key={} value={}",
                    ENV_ENGINE, raw
                );
                EngineKind::default()
            }),
            None => EngineKind::default(),
        };

        let primary_profile = match non_blank(lookup(ENV_PRIMARY_PROFILE)) {
            Some(raw) => PrimarySlotProfile::parse(&raw).unwrap_or_else(|| {
                warn!(
                    "event=config_load module=config status=fallback key={} value={}",
                    ENV_PRIMARY_PROFILE, raw
                );
                PrimarySlotProfile::default()
            }),
            None => PrimarySlotProfile::default(),
        };

        Self {
            engine,
            primary_profile,
            db_path: non_blank(lookup(ENV_DB_PATH)).map(PathBuf::from),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}
