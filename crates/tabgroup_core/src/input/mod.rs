//! Live tab inputs and per-kind handler dispatch.
//!
//! # Responsibility
//! - Model the closed set of tab input kinds reported by the host.
//! - Map each live tab to a deterministic identity id, a render description
//!   and an open request through one ordered handler table.
//!
//! # Invariants
//! - Identity resolution is pure: the same live tab always yields the same id.
//! - Kinds without a registered handler fail with `CannotIdentify` and are
//!   never tracked.

pub mod registry;
pub mod tab;
