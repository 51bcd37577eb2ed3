//! Reconciliation of the persisted forest against live tabs.
//!
//! # Responsibility
//! - Merge a persisted forest with the live tab set at startup.
//! - Follow incremental open/close events on a live tree.
//!
//! # Invariants
//! - Only tabs with a live counterpart survive a merge.
//! - Persisted order wins for surviving tabs; new tabs go to root end.
//! - Each tab id appears at most once in the merge output.
//! - A persisted group without a surviving child is dropped.

use crate::input::registry::HandlerRegistry;
use crate::input::tab::LiveTab;
use crate::model::item::{Tab, TabId, TreeItem};
use crate::model::tree::TreeData;
use log::{debug, info};
use std::collections::HashSet;

/// Builds the startup forest from `persisted` and the `live` tabs.
///
/// Unidentifiable live tabs never enter the forest.
pub fn merge_state(
    persisted: Vec<TreeItem>,
    live: &[LiveTab],
    registry: &HandlerRegistry,
) -> Vec<TreeItem> {
    let live_ids = identify_all(live, registry);
    let mut pool = live_ids.iter().map(String::as_str).collect::<HashSet<_>>();
    let mut placed = HashSet::<TabId>::new();
    let mut dropped = 0usize;
    let mut merged = Vec::with_capacity(persisted.len());

    for item in persisted {
        match item {
            TreeItem::Tab(mut tab) => {
                if !pool.remove(tab.id.as_str()) {
                    dropped += 1;
                    continue;
                }
                tab.group_id = None;
                placed.insert(tab.id.clone());
                merged.push(TreeItem::Tab(tab));
            }
            TreeItem::Group(mut group) => {
                let group_id = group.id;
                group.children.retain_mut(|child| {
                    if !pool.remove(child.id.as_str()) {
                        dropped += 1;
                        return false;
                    }
                    child.group_id = Some(group_id);
                    placed.insert(child.id.clone());
                    true
                });
                if group.children.is_empty() {
                    debug!(
                        "event=reconcile_merge module=reconcile status=skip \
                         reason=empty_group group_id={group_id}"
                    );
                    continue;
                }
                merged.push(TreeItem::Group(group));
            }
        }
    }

    let mut appended = 0usize;
    for id in live_ids {
        if placed.contains(&id) {
            continue;
        }
        placed.insert(id.clone());
        merged.push(TreeItem::Tab(Tab::new(id)));
        appended += 1;
    }

    info!(
        "event=reconcile_merge module=reconcile status=ok live={} kept={} dropped={} appended={}",
        live.len(),
        placed.len() - appended,
        dropped,
        appended
    );
    merged
}

/// Appends every newly seen opened tab to root end.
///
/// Returns the ids that were added, in event order.
pub fn apply_opened(
    tree: &mut TreeData,
    opened: &[LiveTab],
    registry: &HandlerRegistry,
) -> Vec<TabId> {
    let added = identify_all(opened, registry)
        .into_iter()
        .filter(|id| tree.append_tab(id.clone()))
        .collect::<Vec<_>>();
    if !added.is_empty() {
        debug!(
            "event=reconcile_opened module=reconcile status=ok added={}",
            added.len()
        );
    }
    added
}

/// Removes closed tabs that no remaining live tab maps to.
///
/// `live_now` is the live tab set after the close. Returns removed ids.
pub fn apply_closed(
    tree: &mut TreeData,
    closed: &[LiveTab],
    live_now: &[LiveTab],
    registry: &HandlerRegistry,
) -> Vec<TabId> {
    let still_open = identify_all(live_now, registry)
        .into_iter()
        .collect::<HashSet<_>>();
    let mut removed = Vec::new();
    for id in identify_all(closed, registry) {
        if still_open.contains(&id) || removed.contains(&id) {
            continue;
        }
        if tree.delete_tab(&id) {
            removed.push(id);
        }
    }
    if !removed.is_empty() {
        debug!(
            "event=reconcile_closed module=reconcile status=ok removed={}",
            removed.len()
        );
    }
    removed
}

/// Ids of every identifiable tab, in order, first occurrence only.
fn identify_all(tabs: &[LiveTab], registry: &HandlerRegistry) -> Vec<TabId> {
    let mut seen = HashSet::new();
    let mut ids = Vec::with_capacity(tabs.len());
    for tab in tabs {
        match registry.identify(tab) {
            Ok(id) => {
                if seen.insert(id.clone()) {
                    ids.push(id);
                }
            }
            Err(err) => debug!(
                "event=reconcile_identify module=reconcile status=skip handler={}",
                err.handler
            ),
        }
    }
    ids
}
