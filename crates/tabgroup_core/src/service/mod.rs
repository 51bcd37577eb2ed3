//! Tab groups services.
//!
//! # Responsibility
//! - Reconcile persisted and live tabs into the forest.
//! - Project the forest for rendering and drag/drop.
//! - Orchestrate host events, commands and persistence.

pub mod gate;
pub mod host;
pub mod label;
pub mod provider;
pub mod reconcile;
pub mod view;
