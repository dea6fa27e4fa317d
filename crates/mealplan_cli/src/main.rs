//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `mealplan_core` linkage.
//! - Balance a fixed in-memory demo plan and print totals before/after.

use mealplan_core::db::open_db_in_memory;
use mealplan_core::{
    AutoBalanceOptions, FoodInput, Macros, MealPlanService, PlannerConfig, SqliteSessionStore,
    UpsertOptions,
};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    println!("mealplan_core ping={}", mealplan_core::ping());
    println!("mealplan_core version={}", mealplan_core::core_version());

    let config = PlannerConfig::from_env();
    let conn = open_db_in_memory()?;
    let service = MealPlanService::with_config(SqliteSessionStore::new(&conn), &config);

    service.init_session(4.0, Macros::new(2000.0, 140.0, 220.0, 60.0), None)?;
    let demo = [
        ("Oats", Macros::new(389.0, 16.9, 66.3, 6.9), 80.0),
        ("Chicken breast", Macros::new(165.0, 31.0, 0.0, 3.6), 200.0),
        ("Banana", Macros::new(89.0, 1.1, 22.8, 0.3), 120.0),
        ("Rice", Macros::new(130.0, 2.7, 28.0, 0.3), 250.0),
    ];
    for (index, (name, per_100g, grams)) in demo.into_iter().enumerate() {
        service.upsert_item(
            index,
            &FoodInput::new(name, per_100g),
            grams,
            UpsertOptions::default(),
        )?;
    }

    print_totals("before", service.totals()?);
    let result = service.apply_auto_balance(&AutoBalanceOptions::default())?;
    print_totals("after", result.session.totals());
    println!(
        "engine={} applied={} grams={:?}",
        service.engine().as_str(),
        result.applied,
        result.session.grams_by_slot()
    );
    Ok(())
}

fn print_totals(label: &str, totals: Macros) {
    println!(
        "{label}: kcal={:.0} protein={:.1} carbs={:.1} fats={:.1}",
        totals.kcal, totals.protein, totals.carbs, totals.fats
    );
}
