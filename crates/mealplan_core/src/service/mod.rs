//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store access and the balance engine into use-case APIs.
//! - Keep UI/FFI layers decoupled from storage details.

pub mod meal_plan_service;
