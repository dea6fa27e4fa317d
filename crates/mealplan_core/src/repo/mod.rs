//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the whole-record storage contract used by the session service.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Records are read and written whole; there are no partial updates.
//! - Keys are non-empty after trimming.

pub mod session_store;
