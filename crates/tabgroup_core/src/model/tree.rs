//! Authoritative tab/group forest.
//!
//! # Responsibility
//! - Own root ordering and every group's child ordering.
//! - Provide group/ungroup/move primitives used by drag/drop and commands.
//! - Keep tab and group indices in step with root after every operation.
//!
//! # Invariants
//! - `tab_index[id]` names the container currently holding tab `id`.
//! - `group_index` holds exactly the ids of groups present in root.
//! - A detach that empties a group removes it immediately unless the caller
//!   keeps that group alive for the rest of a compound operation.
//! - `get_state()` never returns an empty group.

use crate::model::color::{next_color_id, ColorId};
use crate::model::item::{Group, GroupId, ItemKey, Tab, TabId, TreeItem};
use log::{debug, warn};
use std::collections::{HashMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Result type used by tree operations.
pub type TreeResult<T> = Result<T, TreeError>;

/// Non-fatal tree operation outcomes. Every error leaves the forest unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// Operation targets a tab or group that is no longer present.
    StaleReference(ItemKey),
    /// Operation received no applicable items.
    EmptyOperation,
}

impl Display for TreeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StaleReference(key) => write!(f, "stale tree reference: {key}"),
            Self::EmptyOperation => write!(f, "operation has no applicable items"),
        }
    }
}

impl Error for TreeError {}

/// Result of a `group` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupOutcome {
    /// Group now holding the moved tabs.
    pub group_id: GroupId,
    /// Whether the group was synthesized by this call.
    pub created: bool,
}

/// In-memory forest of root tabs and one-level groups.
#[derive(Debug, Default)]
pub struct TreeData {
    root: Vec<TreeItem>,
    /// Tab id -> owning group (`None` = root).
    tab_index: HashMap<TabId, Option<GroupId>>,
    group_index: HashSet<GroupId>,
}

impl TreeData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces root wholesale and rebuilds both indices.
    ///
    /// Grouped tabs get `group_id` normalized to their owner. A repeated tab
    /// id keeps its first occurrence; a repeated group id is re-generated so
    /// its children are not lost.
    pub fn set_state(&mut self, forest: Vec<TreeItem>) {
        self.root.clear();
        self.tab_index.clear();
        self.group_index.clear();

        let mut dropped_duplicates = 0usize;
        for item in forest {
            match item {
                TreeItem::Tab(mut tab) => {
                    if self.tab_index.contains_key(&tab.id) {
                        dropped_duplicates += 1;
                        continue;
                    }
                    tab.group_id = None;
                    self.tab_index.insert(tab.id.clone(), None);
                    self.root.push(TreeItem::Tab(tab));
                }
                TreeItem::Group(mut group) => {
                    if self.group_index.contains(&group.id) {
                        group.id = Uuid::new_v4();
                    }
                    let group_id = group.id;
                    let tab_index = &mut self.tab_index;
                    group.children.retain_mut(|child| {
                        if tab_index.contains_key(&child.id) {
                            dropped_duplicates += 1;
                            return false;
                        }
                        child.group_id = Some(group_id);
                        tab_index.insert(child.id.clone(), Some(group_id));
                        true
                    });
                    self.group_index.insert(group_id);
                    self.root.push(TreeItem::Group(group));
                }
            }
        }

        if dropped_duplicates > 0 {
            warn!(
                "event=tree_set_state module=tree status=ok dropped_duplicates={}",
                dropped_duplicates
            );
        }
    }

    /// Prunes empty groups and returns root.
    pub fn get_state(&mut self) -> &[TreeItem] {
        self.prune_empty_groups();
        &self.root
    }

    /// Prunes empty groups and returns an owned copy of root for persistence.
    pub fn snapshot(&mut self) -> Vec<TreeItem> {
        self.get_state().to_vec()
    }

    /// Moves `tabs` into a group defined by `target`.
    ///
    /// - Group target: tabs are appended to it.
    /// - Grouped tab target: tabs are inserted before it, in payload order.
    /// - Root tab target: a new group replaces the target in root, holds the
    ///   target first, then the tabs.
    ///
    /// The target itself and unknown tab ids are skipped.
    pub fn group(&mut self, target: &ItemKey, tabs: &[TabId]) -> TreeResult<GroupOutcome> {
        if tabs.is_empty() {
            return Err(TreeError::EmptyOperation);
        }

        let target_owner = match target {
            ItemKey::Group(group_id) => {
                if !self.group_index.contains(group_id) {
                    return Err(TreeError::StaleReference(target.clone()));
                }
                None
            }
            ItemKey::Tab(tab_id) => *self
                .tab_index
                .get(tab_id)
                .ok_or_else(|| TreeError::StaleReference(target.clone()))?,
        };

        let moving = self.applicable_tabs(target, tabs);
        if moving.is_empty() {
            return Err(TreeError::EmptyOperation);
        }

        match (target, target_owner) {
            (ItemKey::Group(group_id), _) => {
                let group_id = *group_id;
                for tab_id in &moving {
                    if let Some(tab) = self.detach_tab(tab_id, Some(group_id)) {
                        self.insert_tab(tab, Some(group_id), None);
                    }
                }
                Ok(GroupOutcome {
                    group_id,
                    created: false,
                })
            }
            (ItemKey::Tab(target_id), Some(group_id)) => {
                let detached = moving
                    .iter()
                    .filter_map(|tab_id| self.detach_tab(tab_id, Some(group_id)))
                    .collect::<Vec<_>>();
                let mut index = self.child_position(group_id, target_id).unwrap_or(0);
                for tab in detached {
                    self.insert_tab(tab, Some(group_id), Some(index));
                    index += 1;
                }
                Ok(GroupOutcome {
                    group_id,
                    created: false,
                })
            }
            (ItemKey::Tab(target_id), None) => {
                let group_id = self.wrap_root_tab(target_id)?;
                for tab_id in &moving {
                    if let Some(tab) = self.detach_tab(tab_id, Some(group_id)) {
                        self.insert_tab(tab, Some(group_id), None);
                    }
                }
                Ok(GroupOutcome {
                    group_id,
                    created: true,
                })
            }
        }
    }

    /// Moves grouped tabs back to root.
    ///
    /// Each tab lands right after its former group, or at root end when
    /// `push_to_end` is set. Root tabs and unknown ids are left alone.
    pub fn ungroup(&mut self, tabs: &[TabId], push_to_end: bool) -> TreeResult<()> {
        if tabs.is_empty() {
            return Err(TreeError::EmptyOperation);
        }

        for tab_id in tabs {
            let Some(owner) = self.tab_index.get(tab_id).copied() else {
                debug!("event=tree_ungroup module=tree status=skip reason=stale_reference");
                continue;
            };
            let Some(group_id) = owner else {
                continue;
            };
            let Some(group_position) = self.group_position(group_id) else {
                continue;
            };
            let Some(tab) = self.detach_tab(tab_id, None) else {
                continue;
            };

            let index = if push_to_end {
                None
            } else if self.group_index.contains(&group_id) {
                Some(group_position + 1)
            } else {
                Some(group_position)
            };
            self.insert_tab(tab, None, index);
        }
        Ok(())
    }

    /// Splices `dragged` immediately before `target` in target's container.
    ///
    /// Dragged groups stay groups; when the container is a group's child list
    /// they are placed in root before that group instead.
    pub fn move_to(&mut self, target: &ItemKey, dragged: &[ItemKey]) -> TreeResult<()> {
        if dragged.is_empty() {
            return Err(TreeError::EmptyOperation);
        }

        let container = match target {
            ItemKey::Tab(tab_id) => *self
                .tab_index
                .get(tab_id)
                .ok_or_else(|| TreeError::StaleReference(target.clone()))?,
            ItemKey::Group(group_id) => {
                if !self.group_index.contains(group_id) {
                    return Err(TreeError::StaleReference(target.clone()));
                }
                None
            }
        };
        let keep = match target {
            ItemKey::Group(group_id) => Some(*group_id),
            ItemKey::Tab(_) => container,
        };

        let moving = self.detach_items(dragged, Some(target), keep);
        if moving.is_empty() {
            return Err(TreeError::EmptyOperation);
        }

        match container {
            None => {
                let mut index = self.root_position(target).unwrap_or(self.root.len());
                for item in moving {
                    self.insert_root_item(item, index);
                    index += 1;
                }
            }
            Some(group_id) => {
                let target_id = target.as_tab_id().unwrap_or_default().to_string();
                let mut root_index = self.group_position(group_id).unwrap_or(self.root.len());
                let mut child_index = self.child_position(group_id, &target_id).unwrap_or(0);
                for item in moving {
                    match item {
                        TreeItem::Tab(tab) => {
                            self.insert_tab(tab, Some(group_id), Some(child_index));
                            child_index += 1;
                        }
                        TreeItem::Group(group) => {
                            self.insert_group(group, root_index);
                            root_index += 1;
                        }
                    }
                }
            }
        }

        self.prune_empty_groups();
        Ok(())
    }

    /// Appends `dragged` to the end of a container (`None` = root).
    ///
    /// Dragged groups always land at root end.
    pub fn push_back(&mut self, group_id: Option<GroupId>, dragged: &[ItemKey]) -> TreeResult<()> {
        if dragged.is_empty() {
            return Err(TreeError::EmptyOperation);
        }
        if let Some(group_id) = group_id {
            if !self.group_index.contains(&group_id) {
                return Err(TreeError::StaleReference(ItemKey::Group(group_id)));
            }
        }

        let moving = self.detach_items(dragged, None, group_id);
        if moving.is_empty() {
            return Err(TreeError::EmptyOperation);
        }

        for item in moving {
            match item {
                TreeItem::Tab(tab) => self.insert_tab(tab, group_id, None),
                TreeItem::Group(group) => {
                    let end = self.root.len();
                    self.insert_group(group, end);
                }
            }
        }

        self.prune_empty_groups();
        Ok(())
    }

    pub fn rename_group(&mut self, group_id: GroupId, label: impl Into<String>) -> TreeResult<()> {
        let group = self
            .group_mut(group_id)
            .ok_or(TreeError::StaleReference(ItemKey::Group(group_id)))?;
        group.label = label.into();
        Ok(())
    }

    /// Dissolves a group, keeping its children in order at its root position.
    pub fn cancel_group(&mut self, group_id: GroupId) -> TreeResult<()> {
        let group = self
            .get_group(group_id)
            .ok_or(TreeError::StaleReference(ItemKey::Group(group_id)))?;
        let children = group
            .children
            .iter()
            .rev()
            .map(|child| child.id.clone())
            .collect::<Vec<_>>();
        if children.is_empty() {
            self.prune_empty_groups();
            return Ok(());
        }
        self.ungroup(&children, false)
    }

    /// Appends an untracked tab to root end. Returns whether it was added.
    pub fn append_tab(&mut self, tab_id: impl Into<TabId>) -> bool {
        let tab_id = tab_id.into();
        if self.tab_index.contains_key(&tab_id) {
            return false;
        }
        self.insert_tab(Tab::new(tab_id), None, None);
        true
    }

    /// Removes a tab wherever it lives. Returns whether it was present.
    pub fn delete_tab(&mut self, tab_id: &str) -> bool {
        self.detach_tab(tab_id, None).is_some()
    }

    pub fn contains_tab(&self, tab_id: &str) -> bool {
        self.tab_index.contains_key(tab_id)
    }

    pub fn tab_count(&self) -> usize {
        self.tab_index.len()
    }

    pub fn get_tab(&self, tab_id: &str) -> Option<&Tab> {
        match self.tab_index.get(tab_id)? {
            None => self.root.iter().find_map(|item| match item {
                TreeItem::Tab(tab) if tab.id == tab_id => Some(tab),
                _ => None,
            }),
            Some(group_id) => self
                .get_group(*group_id)?
                .children
                .iter()
                .find(|child| child.id == tab_id),
        }
    }

    pub fn get_group(&self, group_id: GroupId) -> Option<&Group> {
        if !self.group_index.contains(&group_id) {
            return None;
        }
        self.groups().find(|group| group.id == group_id)
    }

    /// Returns the group owning `tab_id`, or `None` for root tabs.
    pub fn get_parent(&self, tab_id: &str) -> Option<&Group> {
        let group_id = (*self.tab_index.get(tab_id)?)?;
        self.get_group(group_id)
    }

    /// Keys of the items directly under `parent` (`None` = root), in order.
    ///
    /// An unknown group yields an empty list.
    pub fn get_children(&self, parent: Option<GroupId>) -> Vec<ItemKey> {
        match parent {
            None => self.root.iter().map(TreeItem::key).collect(),
            Some(group_id) => self
                .get_group(group_id)
                .map(|group| {
                    group
                        .children
                        .iter()
                        .map(|child| ItemKey::Tab(child.id.clone()))
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.root.iter().filter_map(TreeItem::as_group)
    }

    /// Colors held by groups currently in root.
    pub fn used_colors(&self) -> impl Iterator<Item = ColorId> + '_ {
        self.groups().map(|group| group.color_id)
    }

    /// True when no group is expanded.
    pub fn is_all_collapsed(&self) -> bool {
        self.groups().all(|group| group.collapsed)
    }

    pub fn set_collapsed_state(&mut self, group_id: GroupId, collapsed: bool) -> TreeResult<()> {
        let group = self
            .group_mut(group_id)
            .ok_or(TreeError::StaleReference(ItemKey::Group(group_id)))?;
        group.collapsed = collapsed;
        Ok(())
    }

    pub fn set_all_collapsed(&mut self, collapsed: bool) {
        for item in &mut self.root {
            if let TreeItem::Group(group) = item {
                group.collapsed = collapsed;
            }
        }
    }

    fn applicable_tabs(&self, target: &ItemKey, tabs: &[TabId]) -> Vec<TabId> {
        let mut seen = HashSet::new();
        let mut applicable = Vec::new();
        for tab_id in tabs {
            if target.as_tab_id() == Some(tab_id.as_str()) {
                continue;
            }
            if !self.tab_index.contains_key(tab_id) {
                debug!("event=tree_group module=tree status=skip reason=stale_reference");
                continue;
            }
            if seen.insert(tab_id.as_str()) {
                applicable.push(tab_id.clone());
            }
        }
        applicable
    }

    /// Detaches every dragged item, skipping `skip`, duplicates, unknown ids
    /// and the `keep` group (a container cannot be moved into itself).
    fn detach_items(
        &mut self,
        dragged: &[ItemKey],
        skip: Option<&ItemKey>,
        keep: Option<GroupId>,
    ) -> Vec<TreeItem> {
        let mut seen = HashSet::new();
        let mut detached = Vec::new();
        for key in dragged {
            if Some(key) == skip || !seen.insert(key) {
                continue;
            }
            match key {
                ItemKey::Tab(tab_id) => match self.detach_tab(tab_id, keep) {
                    Some(tab) => detached.push(TreeItem::Tab(tab)),
                    None => {
                        debug!("event=tree_move module=tree status=skip reason=stale_reference")
                    }
                },
                ItemKey::Group(group_id) => {
                    if Some(*group_id) == keep {
                        continue;
                    }
                    match self.take_group(*group_id) {
                        Some(group) => detached.push(TreeItem::Group(group)),
                        None => {
                            debug!("event=tree_move module=tree status=skip reason=stale_reference")
                        }
                    }
                }
            }
        }
        detached
    }

    /// Replaces a root tab with a new group holding it.
    fn wrap_root_tab(&mut self, tab_id: &str) -> TreeResult<GroupId> {
        let position = self
            .root_position(&ItemKey::Tab(tab_id.to_string()))
            .ok_or_else(|| TreeError::StaleReference(ItemKey::tab(tab_id)))?;

        let TreeItem::Tab(tab) = &self.root[position] else {
            return Err(TreeError::StaleReference(ItemKey::tab(tab_id)));
        };
        let mut tab = tab.clone();

        let mut group = Group::new(next_color_id(self.used_colors()));
        let group_id = group.id;
        tab.group_id = Some(group_id);
        self.tab_index.insert(tab.id.clone(), Some(group_id));
        group.children.push(tab);
        self.group_index.insert(group_id);
        self.root[position] = TreeItem::Group(group);
        Ok(group_id)
    }

    /// Removes a tab from its container and the index.
    ///
    /// A group emptied by the removal is dropped from root, unless it is
    /// `keep`.
    fn detach_tab(&mut self, tab_id: &str, keep: Option<GroupId>) -> Option<Tab> {
        let owner = *self.tab_index.get(tab_id)?;
        let mut tab = match owner {
            None => {
                let position = self.root_position(&ItemKey::tab(tab_id))?;
                match self.root.remove(position) {
                    TreeItem::Tab(tab) => tab,
                    TreeItem::Group(group) => {
                        self.root.insert(position, TreeItem::Group(group));
                        return None;
                    }
                }
            }
            Some(group_id) => {
                let group = self.group_mut(group_id)?;
                let position = group.children.iter().position(|child| child.id == tab_id)?;
                let tab = group.children.remove(position);
                let emptied = group.children.is_empty();
                if emptied && keep != Some(group_id) {
                    self.take_group(group_id);
                }
                tab
            }
        };
        self.tab_index.remove(tab_id);
        tab.group_id = None;
        Some(tab)
    }

    fn insert_tab(&mut self, mut tab: Tab, container: Option<GroupId>, index: Option<usize>) {
        let container = container.filter(|group_id| self.group_index.contains(group_id));
        tab.group_id = container;
        self.tab_index.insert(tab.id.clone(), container);
        match container {
            None => {
                let index = index.unwrap_or(self.root.len()).min(self.root.len());
                self.root.insert(index, TreeItem::Tab(tab));
            }
            Some(group_id) => {
                if let Some(group) = self.group_mut(group_id) {
                    let index = index
                        .unwrap_or(group.children.len())
                        .min(group.children.len());
                    group.children.insert(index, tab);
                }
            }
        }
    }

    fn insert_root_item(&mut self, item: TreeItem, index: usize) {
        match item {
            TreeItem::Tab(tab) => self.insert_tab(tab, None, Some(index)),
            TreeItem::Group(group) => self.insert_group(group, index),
        }
    }

    /// Re-inserts a group taken with `take_group`; child index entries are
    /// still pointing at it.
    fn insert_group(&mut self, group: Group, index: usize) {
        self.group_index.insert(group.id);
        let index = index.min(self.root.len());
        self.root.insert(index, TreeItem::Group(group));
    }

    /// Removes a group from root and the group index, leaving child index
    /// entries for the caller to restore or discard.
    fn take_group(&mut self, group_id: GroupId) -> Option<Group> {
        let position = self.group_position(group_id)?;
        self.group_index.remove(&group_id);
        match self.root.remove(position) {
            TreeItem::Group(group) => Some(group),
            TreeItem::Tab(tab) => {
                self.root.insert(position, TreeItem::Tab(tab));
                None
            }
        }
    }

    fn prune_empty_groups(&mut self) {
        let group_index = &mut self.group_index;
        self.root.retain(|item| match item {
            TreeItem::Group(group) if group.children.is_empty() => {
                group_index.remove(&group.id);
                false
            }
            _ => true,
        });
    }

    fn group_mut(&mut self, group_id: GroupId) -> Option<&mut Group> {
        self.root.iter_mut().find_map(|item| match item {
            TreeItem::Group(group) if group.id == group_id => Some(group),
            _ => None,
        })
    }

    fn group_position(&self, group_id: GroupId) -> Option<usize> {
        self.root_position(&ItemKey::Group(group_id))
    }

    fn root_position(&self, key: &ItemKey) -> Option<usize> {
        self.root.iter().position(|item| match (item, key) {
            (TreeItem::Tab(tab), ItemKey::Tab(tab_id)) => tab.id == *tab_id,
            (TreeItem::Group(group), ItemKey::Group(group_id)) => group.id == *group_id,
            _ => false,
        })
    }

    fn child_position(&self, group_id: GroupId, tab_id: &str) -> Option<usize> {
        self.get_group(group_id)?
            .children
            .iter()
            .position(|child| child.id == tab_id)
    }
}
