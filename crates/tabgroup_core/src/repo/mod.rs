//! Persistence of the tab/group forest.
//!
//! # Responsibility
//! - Define the single-slot state store contract used by the tabs view.
//! - Isolate SQLite query and payload details from orchestration.

pub mod state_repo;
