//! Tab/group forest domain model.
//!
//! # Responsibility
//! - Define the persisted record shapes for tabs, groups and the root forest.
//! - Own the authoritative tree (`TreeData`) and its lookup indices.
//! - Allocate group colors from the fixed palette.
//!
//! # Invariants
//! - A tab id appears at most once in the whole forest.
//! - A tab's `group_id` is `None` or names a group currently in root.
//! - Groups are one level deep and never persist empty.

pub mod color;
pub mod item;
pub mod tree;
