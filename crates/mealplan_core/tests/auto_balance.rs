use mealplan_core::db::open_db_in_memory;
use mealplan_core::{
    AutoBalanceOptions, BalanceReason, BaselineOptions, EngineKind, FoodInput, Macros,
    MealPlanService, PlannerConfig, SessionStore, SqliteSessionStore, UpsertOptions, SESSION_KEY,
};
use rusqlite::Connection;

fn plain_food() -> FoodInput {
    FoodInput::new("Mix", Macros::new(100.0, 10.0, 10.0, 4.0))
}

fn target() -> Macros {
    Macros::new(2200.0, 220.0, 220.0, 88.0)
}

fn seeded_service<'a>(
    conn: &'a Connection,
    config: &PlannerConfig,
    grams: &[f64],
) -> MealPlanService<SqliteSessionStore<'a>> {
    let service = MealPlanService::with_config(SqliteSessionStore::new(conn), config);
    service
        .init_session(grams.len() as f64, target(), None)
        .unwrap();
    for (index, value) in grams.iter().enumerate() {
        service
            .upsert_item(index, &plain_food(), *value, UpsertOptions::default())
            .unwrap();
    }
    service
}

const START: [f64; 5] = [400.0, 400.0, 440.0, 440.0, 480.0];

#[test]
fn first_run_closes_calorie_gap() {
    let conn = open_db_in_memory().unwrap();
    let service = seeded_service(&conn, &PlannerConfig::default(), &START);

    let result = service
        .apply_auto_balance(&AutoBalanceOptions::default())
        .unwrap();

    assert!(result.applied);
    assert!(result.summary.is_none());
    assert_eq!(result.session.grams_by_slot(), vec![410, 410, 450, 450, 480]);
    assert_eq!(service.load_session().unwrap(), result.session);
}

#[test]
fn balanced_plan_still_moves_a_primary_slot() {
    let conn = open_db_in_memory().unwrap();
    let service = seeded_service(&conn, &PlannerConfig::default(), &START);
    service
        .apply_auto_balance(&AutoBalanceOptions::default())
        .unwrap();

    let result = service
        .apply_auto_balance(&AutoBalanceOptions::default())
        .unwrap();

    assert!(result.applied);
    assert_eq!(result.session.grams_by_slot(), vec![420, 400, 450, 450, 480]);
    assert!(result.session.items.iter().flatten().all(|item| !item.locked));
    let kcal = result.session.totals().kcal;
    assert!((kcal - 2200.0).abs() <= 66.0);
}

#[test]
fn explicit_primary_slots_and_tolerance_are_honored() {
    let conn = open_db_in_memory().unwrap();
    let service = seeded_service(&conn, &PlannerConfig::default(), &START);
    let before = service.load_session().unwrap().grams_by_slot();

    let options = AutoBalanceOptions::for_meal(0)
        .with_kcal_tol(60.0)
        .with_primary_slots(vec![0, 1])
        .with_fat_floor(40.0);
    let result = service.apply_auto_balance(&options).unwrap();

    let after = result.session.grams_by_slot();
    assert!((result.session.totals().kcal - 2200.0).abs() <= 60.0);
    assert!(after[0] != before[0] || after[1] != before[1]);
}

#[test]
fn all_locked_plan_is_left_untouched() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteSessionStore::new(&conn);
    let service = MealPlanService::new(&store);
    service.init_session(3.0, target(), None).unwrap();
    for index in 0..2 {
        service
            .upsert_item(
                index,
                &plain_food(),
                300.0,
                UpsertOptions {
                    locked: true,
                    force: false,
                },
            )
            .unwrap();
    }
    let stored_before = store.read(SESSION_KEY).unwrap();

    let result = service
        .apply_auto_balance(&AutoBalanceOptions::default())
        .unwrap();

    assert!(!result.applied);
    assert_eq!(
        result.summary.map(|summary| summary.reason),
        Some(BalanceReason::AllLocked)
    );
    assert_eq!(store.read(SESSION_KEY).unwrap(), stored_before);
}

#[test]
fn locked_items_never_move() {
    let conn = open_db_in_memory().unwrap();
    let service = seeded_service(&conn, &PlannerConfig::default(), &START);
    service
        .upsert_item(
            2,
            &plain_food(),
            440.0,
            UpsertOptions {
                locked: true,
                force: true,
            },
        )
        .unwrap();

    for _ in 0..3 {
        let result = service
            .apply_auto_balance(&AutoBalanceOptions::for_meal(2))
            .unwrap();
        let locked = result.session.items[2].as_ref().unwrap();
        assert!(locked.locked);
        assert_eq!(locked.grams, 440);
    }
}

#[test]
fn repeated_runs_stay_inside_calorie_tolerance() {
    let conn = open_db_in_memory().unwrap();
    let service = seeded_service(&conn, &PlannerConfig::default(), &START);

    for _ in 0..4 {
        let result = service
            .apply_auto_balance(&AutoBalanceOptions::default())
            .unwrap();
        let totals = result.session.totals();
        assert!((totals.kcal - 2200.0).abs() <= 66.0);
        assert!(totals.fats.round() >= 40.0);
        assert!(result.session.grams_by_slot().iter().all(|grams| grams % 10 == 0));
    }
}

#[test]
fn repeated_runs_never_increase_calorie_deviation() {
    let conn = open_db_in_memory().unwrap();
    let service = MealPlanService::new(SqliteSessionStore::new(&conn));
    service
        .init_session(2.0, Macros::new(460.0, 0.0, 0.0, 0.0), None)
        .unwrap();
    let lean = FoodInput::new("Lean", Macros::new(100.0, 0.0, 0.0, 0.0));
    let dense = FoodInput::new("Dense", Macros::new(130.0, 0.0, 0.0, 0.0));
    service
        .upsert_item(0, &lean, 210.0, UpsertOptions::default())
        .unwrap();
    service
        .upsert_item(1, &dense, 190.0, UpsertOptions::default())
        .unwrap();
    let options = AutoBalanceOptions::default()
        .with_primary_slots(vec![0])
        .with_fat_floor(0.0);

    let first = service.apply_auto_balance(&options).unwrap();
    assert!(first.applied);
    assert_eq!(first.session.grams_by_slot(), vec![200, 200]);
    let first_deviation = (first.session.totals().kcal - 460.0).abs();

    let second = service.apply_auto_balance(&options).unwrap();
    let second_deviation = (second.session.totals().kcal - 460.0).abs();
    assert!(!second.applied);
    assert_eq!(second.session.grams_by_slot(), vec![200, 200]);
    assert!(second_deviation <= first_deviation);
}

#[test]
fn unreachable_fat_floor_blocks_forced_touch() {
    let conn = open_db_in_memory().unwrap();
    let balanced = [410.0, 410.0, 450.0, 450.0, 480.0];
    let service = seeded_service(&conn, &PlannerConfig::default(), &balanced);

    let result = service
        .apply_auto_balance(&AutoBalanceOptions::default().with_fat_floor(89.0))
        .unwrap();

    assert!(!result.applied);
    assert_eq!(result.session.grams_by_slot(), vec![410, 410, 450, 450, 480]);
}

#[test]
fn calorie_only_engine_skips_forced_touch() {
    let conn = open_db_in_memory().unwrap();
    let config = PlannerConfig {
        engine: EngineKind::CalorieOnly,
        ..PlannerConfig::default()
    };
    let service = seeded_service(&conn, &config, &START);
    assert_eq!(service.engine(), EngineKind::CalorieOnly);

    let first = service
        .apply_auto_balance(&AutoBalanceOptions::default())
        .unwrap();
    assert!(first.applied);
    assert_eq!(first.session.grams_by_slot(), vec![410, 410, 450, 450, 480]);

    let second = service
        .apply_auto_balance(&AutoBalanceOptions::default())
        .unwrap();
    assert!(!second.applied);
    assert_eq!(second.session.grams_by_slot(), vec![410, 410, 450, 450, 480]);
}

#[test]
fn target_override_does_not_replace_stored_target() {
    let conn = open_db_in_memory().unwrap();
    let service = seeded_service(&conn, &PlannerConfig::default(), &START);

    let result = service
        .apply_auto_balance(
            &AutoBalanceOptions::default().with_target(Macros::new(2300.0, 230.0, 230.0, 92.0)),
        )
        .unwrap();

    assert!(result.applied);
    assert!(result.session.totals().kcal > 2160.0);
    assert_eq!(result.session.day_target, target());
    assert_eq!(service.load_session().unwrap().day_target, target());
}

#[test]
fn baseline_portions_fill_empty_unlocked_items() {
    let conn = open_db_in_memory().unwrap();
    let service = MealPlanService::new(SqliteSessionStore::new(&conn));
    service
        .init_session(5.0, Macros::new(2000.0, 150.0, 200.0, 60.0), None)
        .unwrap();
    for index in [0, 1, 3, 4] {
        service
            .upsert_item(index, &plain_food(), 0.0, UpsertOptions::default())
            .unwrap();
    }
    service
        .upsert_item(
            2,
            &plain_food(),
            100.0,
            UpsertOptions {
                locked: true,
                force: false,
            },
        )
        .unwrap();

    let result = service
        .apply_baseline_portions(&BaselineOptions::default())
        .unwrap();

    assert!(result.applied);
    assert_eq!(result.session.grams_by_slot(), vec![470, 300, 100, 300, 470]);
    assert_eq!(service.load_session().unwrap(), result.session);
}
