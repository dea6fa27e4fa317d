//! FFI use-case API for Flutter-facing meal-plan calls.
//!
//! # Responsibility
//! - Expose session, totals, baseline and auto-balance use-cases to Dart via FRB.
//! - Translate core types into flat, FRB-friendly envelopes.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Session-mutating calls are serialized within the process.
//! - Configuration is read from the environment once per process.

use log::warn;
use mealplan_core::db::open_db;
use mealplan_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    AutoBalanceOptions, BaselineOptions, FoodInput, Item, MacroDelta, Macros, MealPlanResult,
    MealPlanService, PlannerConfig, Session, SqliteSessionStore, UpsertOptions,
};
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock, PoisonError};

const DEFAULT_DB_FILE_NAME: &str = "mealplan.sqlite3";
static PLANNER_CONFIG: OnceLock<PlannerConfig> = OnceLock::new();
static SESSION_LOCK: Mutex<()> = Mutex::new(());

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Sync call; may perform small file-system setup work.
/// - Safe to call repeatedly with the same `level + log_dir`.
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Macro values in canonical field names.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MealMacros {
    pub kcal: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fats: f64,
}

/// One filled meal slot.
#[derive(Debug, Clone, PartialEq)]
pub struct MealItem {
    pub name: String,
    /// Quantized portion in grams.
    pub grams: u32,
    pub per_100g: MealMacros,
    pub locked: bool,
}

/// Day-plan snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct MealSession {
    pub meals: u32,
    /// One entry per slot; `None` marks an empty slot.
    pub items: Vec<Option<MealItem>>,
    pub day_target: MealMacros,
    pub diet_style: Option<String>,
}

/// Envelope for calls that return the session.
#[derive(Debug, Clone, PartialEq)]
pub struct MealPlanResponse {
    pub ok: bool,
    pub message: String,
    pub session: Option<MealSession>,
}

/// Envelope for `meal_plan_totals`.
#[derive(Debug, Clone, PartialEq)]
pub struct MealTotalsResponse {
    pub ok: bool,
    pub message: String,
    pub totals: Option<MealMacros>,
}

/// Envelope for `meal_plan_delta`; `delta` is `totals - target`.
#[derive(Debug, Clone, PartialEq)]
pub struct MealDeltaResponse {
    pub ok: bool,
    pub message: String,
    pub totals: Option<MealMacros>,
    pub delta: Option<MealMacros>,
    pub target: Option<MealMacros>,
}

/// Envelope for auto-balance and baseline calls.
#[derive(Debug, Clone, PartialEq)]
pub struct MealPlanActionResponse {
    pub ok: bool,
    /// Whether any portion changed.
    pub applied: bool,
    /// Machine-readable no-op reason, e.g. `all-locked`.
    pub reason: Option<String>,
    pub message: String,
    pub session: Option<MealSession>,
}

impl MealPlanActionResponse {
    fn failure(message: String) -> Self {
        Self {
            ok: false,
            applied: false,
            reason: None,
            message,
            session: None,
        }
    }
}

/// Auto-balance options; unset fields use core defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AutoBalanceRequest {
    /// Negative values mean "no preference".
    pub prefer_index: Option<i64>,
    pub target: Option<MealMacros>,
    pub kcal_tol: Option<f64>,
    pub protein_tol: Option<f64>,
    pub carb_tol: Option<f64>,
    pub fat_tol: Option<f64>,
    pub fat_floor: Option<f64>,
    pub primary_slots: Option<Vec<u32>>,
}

/// Baseline portion options; unset fields use core defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BaselineRequest {
    pub anchor_slots: Option<Vec<u32>>,
    pub anchor_share: Option<f64>,
    pub anchor_weights: Option<Vec<f64>>,
}

/// Loads the stored session, repairing it when missing or malformed.
///
/// # FFI contract
/// - Async on the Dart side, DB-backed execution.
/// - Never panics.
pub fn meal_plan_load() -> MealPlanResponse {
    session_response(
        "meal_plan_load",
        with_meal_plan_service(|service| service.load_session()),
        "Session loaded.",
    )
}

/// Replaces the session with `meals` empty slots (clamped to 1..=6).
///
/// # FFI contract
/// - Async on the Dart side, DB-backed execution.
/// - Never panics.
pub fn meal_plan_init(
    meals: i32,
    day_target: MealMacros,
    diet_style: Option<String>,
) -> MealPlanResponse {
    session_response(
        "meal_plan_init",
        with_meal_plan_service(|service| {
            service.init_session(f64::from(meals), to_core_macros(day_target), diet_style)
        }),
        "Session initialized.",
    )
}

/// Places one food at slot `index`.
///
/// Out-of-range (including negative) indexes and locked slots without
/// `force` leave the session unchanged and still report `ok`.
///
/// # FFI contract
/// - Async on the Dart side, DB-backed execution.
/// - Never panics.
pub fn meal_plan_upsert_item(
    index: i64,
    name: String,
    per_100g: MealMacros,
    grams: f64,
    locked: bool,
    force: bool,
) -> MealPlanResponse {
    let food = FoodInput::new(name, to_core_macros(per_100g));
    let options = UpsertOptions { locked, force };
    let result = with_meal_plan_service(|service| match usize::try_from(index) {
        Ok(slot) => service.upsert_item(slot, &food, grams, options),
        Err(_) => service.load_session(),
    });
    session_response("meal_plan_upsert_item", result, "Slot updated.")
}

/// Sum of all present items' contributions.
///
/// # FFI contract
/// - Async on the Dart side, DB-backed execution.
/// - Never panics.
pub fn meal_plan_totals() -> MealTotalsResponse {
    match with_meal_plan_service(|service| service.totals()) {
        Ok(totals) => MealTotalsResponse {
            ok: true,
            message: "Totals computed.".to_string(),
            totals: Some(to_ffi_macros(totals)),
        },
        Err(message) => MealTotalsResponse {
            ok: false,
            message: format!("meal_plan_totals failed: {message}"),
            totals: None,
        },
    }
}

/// Totals, signed deviation and stored target.
///
/// # FFI contract
/// - Async on the Dart side, DB-backed execution.
/// - Never panics.
pub fn meal_plan_delta() -> MealDeltaResponse {
    match with_meal_plan_service(|service| service.delta()) {
        Ok(plan) => MealDeltaResponse {
            ok: true,
            message: "Delta computed.".to_string(),
            totals: Some(to_ffi_macros(plan.totals)),
            delta: Some(delta_to_ffi(plan.delta)),
            target: Some(to_ffi_macros(plan.target)),
        },
        Err(message) => MealDeltaResponse {
            ok: false,
            message: format!("meal_plan_delta failed: {message}"),
            totals: None,
            delta: None,
            target: None,
        },
    }
}

/// Runs the configured auto-balance engine and persists the result.
///
/// # FFI contract
/// - Async on the Dart side, DB-backed execution.
/// - Never panics.
/// - `applied=false` with `reason="all-locked"` when nothing may move.
pub fn meal_plan_apply_auto_balance(request: AutoBalanceRequest) -> MealPlanActionResponse {
    let options = to_balance_options(request);
    match with_meal_plan_service(|service| service.apply_auto_balance(&options)) {
        Ok(result) => {
            let reason = result
                .summary
                .map(|summary| summary.reason.as_str().to_string());
            let message = match (&reason, result.applied) {
                (Some(reason), _) => format!("Nothing to balance ({reason})."),
                (None, true) => "Portions balanced.".to_string(),
                (None, false) => "No portion change fit the tolerances.".to_string(),
            };
            MealPlanActionResponse {
                ok: true,
                applied: result.applied,
                reason,
                message,
                session: Some(to_ffi_session(&result.session)),
            }
        }
        Err(message) => MealPlanActionResponse::failure(format!(
            "meal_plan_apply_auto_balance failed: {message}"
        )),
    }
}

/// Seeds portions for unlocked items that have no grams yet.
///
/// # FFI contract
/// - Async on the Dart side, DB-backed execution.
/// - Never panics.
pub fn meal_plan_apply_baseline(request: BaselineRequest) -> MealPlanActionResponse {
    let options = BaselineOptions {
        anchor_slots: request
            .anchor_slots
            .map(|slots| slots.into_iter().map(slot_index).collect()),
        anchor_share: request.anchor_share,
        anchor_weights: request.anchor_weights,
    };
    match with_meal_plan_service(|service| service.apply_baseline_portions(&options)) {
        Ok(result) => MealPlanActionResponse {
            ok: true,
            applied: result.applied,
            reason: None,
            message: if result.applied {
                "Baseline portions applied.".to_string()
            } else {
                "Plan has no items to portion.".to_string()
            },
            session: Some(to_ffi_session(&result.session)),
        },
        Err(message) => MealPlanActionResponse::failure(format!(
            "meal_plan_apply_baseline failed: {message}"
        )),
    }
}

fn planner_config() -> &'static PlannerConfig {
    PLANNER_CONFIG.get_or_init(PlannerConfig::from_env)
}

fn resolve_db_path() -> PathBuf {
    planner_config()
        .db_path
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_DB_FILE_NAME))
}

fn with_meal_plan_service<T>(
    f: impl FnOnce(&MealPlanService<SqliteSessionStore<'_>>) -> MealPlanResult<T>,
) -> Result<T, String> {
    let _guard = SESSION_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    let conn = open_db(resolve_db_path()).map_err(|err| {
        warn!("event=db_open module=ffi status=error error={err}");
        format!("meal plan DB open failed: {err}")
    })?;
    let service = MealPlanService::with_config(SqliteSessionStore::new(&conn), planner_config());
    f(&service).map_err(|err| err.to_string())
}

fn session_response(
    operation: &str,
    result: Result<Session, String>,
    success_message: &str,
) -> MealPlanResponse {
    match result {
        Ok(session) => MealPlanResponse {
            ok: true,
            message: success_message.to_string(),
            session: Some(to_ffi_session(&session)),
        },
        Err(message) => MealPlanResponse {
            ok: false,
            message: format!("{operation} failed: {message}"),
            session: None,
        },
    }
}

fn to_balance_options(request: AutoBalanceRequest) -> AutoBalanceOptions {
    AutoBalanceOptions {
        prefer_index: request
            .prefer_index
            .and_then(|index| usize::try_from(index).ok()),
        target: request.target.map(to_core_macros),
        kcal_tol: request.kcal_tol,
        protein_tol: request.protein_tol,
        carb_tol: request.carb_tol,
        fat_tol: request.fat_tol,
        fat_floor: request.fat_floor,
        primary_slots: request
            .primary_slots
            .map(|slots| slots.into_iter().map(slot_index).collect()),
    }
}

fn slot_index(slot: u32) -> usize {
    usize::try_from(slot).unwrap_or(usize::MAX)
}

fn to_core_macros(value: MealMacros) -> Macros {
    Macros::new(value.kcal, value.protein, value.carbs, value.fats)
}

fn to_ffi_macros(value: Macros) -> MealMacros {
    MealMacros {
        kcal: value.kcal,
        protein: value.protein,
        carbs: value.carbs,
        fats: value.fats,
    }
}

fn delta_to_ffi(value: MacroDelta) -> MealMacros {
    MealMacros {
        kcal: value.calories,
        protein: value.protein,
        carbs: value.carbs,
        fats: value.fats,
    }
}

fn to_ffi_item(item: &Item) -> MealItem {
    MealItem {
        name: item.name.clone(),
        grams: item.grams,
        per_100g: to_ffi_macros(item.per_100g),
        locked: item.locked,
    }
}

fn to_ffi_session(session: &Session) -> MealSession {
    MealSession {
        meals: u32::try_from(session.meals).unwrap_or(u32::MAX),
        items: session
            .items
            .iter()
            .map(|slot| slot.as_ref().map(to_ffi_item))
            .collect(),
        day_target: to_ffi_macros(session.day_target),
        diet_style: session.diet_style.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        core_version, init_logging, meal_plan_apply_auto_balance, meal_plan_apply_baseline,
        meal_plan_delta, meal_plan_init, meal_plan_load, meal_plan_totals, meal_plan_upsert_item,
        ping, resolve_db_path, to_balance_options, AutoBalanceRequest, BaselineRequest,
        MealMacros, DEFAULT_DB_FILE_NAME, PLANNER_CONFIG,
    };
    use mealplan_core::PlannerConfig;
    use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
    use tempfile::TempDir;

    static SERIAL: Mutex<()> = Mutex::new(());
    static TEST_DB_DIR: OnceLock<TempDir> = OnceLock::new();

    /// Serializes session tests and points the process config at a private
    /// database file before any call can read the environment.
    fn serial() -> MutexGuard<'static, ()> {
        let guard = SERIAL.lock().unwrap_or_else(PoisonError::into_inner);
        let dir = TEST_DB_DIR.get_or_init(|| tempfile::tempdir().expect("temp dir"));
        let config = PLANNER_CONFIG.get_or_init(|| PlannerConfig {
            db_path: Some(dir.path().join("ffi-tests.sqlite3")),
            ..PlannerConfig::default()
        });
        assert!(config
            .db_path
            .as_ref()
            .is_some_and(|path| path.starts_with(dir.path())));
        guard
    }

    #[test]
    fn session_tests_never_touch_the_shared_temp_database() {
        let _serial = serial();
        let path = resolve_db_path();
        assert_ne!(path, std::env::temp_dir().join(DEFAULT_DB_FILE_NAME));
        assert_eq!(
            path.file_name().and_then(|name| name.to_str()),
            Some("ffi-tests.sqlite3")
        );
    }

    fn mix() -> MealMacros {
        MealMacros {
            kcal: 100.0,
            protein: 10.0,
            carbs: 10.0,
            fats: 4.0,
        }
    }

    fn target() -> MealMacros {
        MealMacros {
            kcal: 2200.0,
            protein: 220.0,
            carbs: 220.0,
            fats: 88.0,
        }
    }

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_empty_log_dir() {
        let error = init_logging("info".to_string(), String::new());
        assert!(!error.is_empty());
    }

    #[test]
    fn init_logging_rejects_unsupported_level() {
        let error = init_logging("verbose".to_string(), "/tmp/logs".to_string());
        assert!(!error.is_empty());
    }

    #[test]
    fn negative_indexes_are_ignored() {
        let _serial = serial();
        let init = meal_plan_init(3, target(), None);
        assert!(init.ok, "{}", init.message);

        let response = meal_plan_upsert_item(-1, "Mix".to_string(), mix(), 100.0, false, false);
        assert!(response.ok, "{}", response.message);
        let session = response.session.expect("session should be returned");
        assert_eq!(session.meals, 3);
        assert!(session.items.iter().all(Option::is_none));
    }

    #[test]
    fn upsert_totals_and_delta_agree() {
        let _serial = serial();
        assert!(meal_plan_init(2, target(), Some("balanced".to_string())).ok);
        let response = meal_plan_upsert_item(1, "Mix".to_string(), mix(), 204.0, false, false);
        assert!(response.ok, "{}", response.message);
        let item = response.session.expect("session should be returned").items[1]
            .clone()
            .expect("slot 1 should be filled");
        assert_eq!(item.grams, 200);

        let totals = meal_plan_totals().totals.expect("totals should be present");
        assert_eq!(totals.kcal, 200.0);
        let delta = meal_plan_delta();
        assert!(delta.ok, "{}", delta.message);
        assert_eq!(delta.delta.expect("delta should be present").kcal, -2000.0);

        let loaded = meal_plan_load().session.expect("session should load");
        assert_eq!(loaded.diet_style.as_deref(), Some("balanced"));
    }

    #[test]
    fn auto_balance_reports_all_locked_reason() {
        let _serial = serial();
        assert!(meal_plan_init(1, target(), None).ok);
        assert!(meal_plan_upsert_item(0, "Mix".to_string(), mix(), 300.0, true, false).ok);

        let response = meal_plan_apply_auto_balance(AutoBalanceRequest::default());
        assert!(response.ok, "{}", response.message);
        assert!(!response.applied);
        assert_eq!(response.reason.as_deref(), Some("all-locked"));
    }

    #[test]
    fn auto_balance_and_baseline_move_portions() {
        let _serial = serial();
        assert!(meal_plan_init(5, target(), None).ok);
        for (index, grams) in [400.0, 400.0, 440.0, 440.0, 480.0].into_iter().enumerate() {
            let index = i64::try_from(index).expect("index fits i64");
            assert!(meal_plan_upsert_item(index, "Mix".to_string(), mix(), grams, false, false).ok);
        }

        let balanced = meal_plan_apply_auto_balance(AutoBalanceRequest::default());
        assert!(balanced.applied, "{}", balanced.message);
        let grams: Vec<u32> = balanced
            .session
            .expect("session should be returned")
            .items
            .iter()
            .map(|slot| slot.as_ref().map_or(0, |item| item.grams))
            .collect();
        assert_eq!(grams, vec![410, 410, 450, 450, 480]);

        let baseline = meal_plan_apply_baseline(BaselineRequest::default());
        assert!(baseline.ok, "{}", baseline.message);
        assert!(baseline.applied);
        let session = baseline.session.expect("session should be returned");
        assert_eq!(session.items.iter().flatten().count(), 5);
        assert!(session.items.iter().flatten().all(|item| item.grams > 0));
    }

    #[test]
    fn negative_preference_maps_to_none() {
        let options = to_balance_options(AutoBalanceRequest {
            prefer_index: Some(-3),
            primary_slots: Some(vec![0, 2]),
            ..AutoBalanceRequest::default()
        });
        assert_eq!(options.prefer_index, None);
        assert_eq!(options.primary_slots, Some(vec![0, 2]));
    }
}
