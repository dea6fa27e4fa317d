//! Flutter-facing bindings for the meal-plan core.

pub mod api;
