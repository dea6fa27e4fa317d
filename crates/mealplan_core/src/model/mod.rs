//! Meal-plan domain model.
//!
//! # Responsibility
//! - Define the canonical session, item and macro structures.
//! - Resolve every input alias once, at deserialization/construction time.
//!
//! # Invariants
//! - `Session::items.len() == Session::meals`.
//! - Every `Item::grams` value is a multiple of `QUANTUM_GRAMS`.
//! - `Macros` fields are finite and non-negative.

pub mod macros;
pub mod session;
