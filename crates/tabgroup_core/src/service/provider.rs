//! Presentation adapter over the tab/group forest.
//!
//! # Responsibility
//! - Project the forest into renderable nodes with stable identity.
//! - Translate drag/drop gestures into tree operations.
//! - Keep duplicate-name descriptions current.
//!
//! # Invariants
//! - One `NodeKey` maps to one node handle for as long as the item exists.
//! - Slots exist only in sort mode and never enter drag payloads.
//! - Cached nodes for items that left the forest are evicted after every
//!   refresh or drop.

use crate::input::registry::{HandlerRegistry, TabDescription};
use crate::input::tab::{display_name, uri_path, LiveTab};
use crate::model::color::ColorId;
use crate::model::item::{GroupId, ItemKey, TabId};
use crate::model::tree::{TreeData, TreeError, TreeResult};
use crate::service::label::disambiguate;
use log::debug;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Identity of one rendered node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKey {
    Tab(TabId),
    Group(GroupId),
    /// Trailing insertion marker of a container (`None` = root).
    Slot(Option<GroupId>),
}

impl NodeKey {
    /// Tree address of this node. Slots have none.
    pub fn item_key(&self) -> Option<ItemKey> {
        match self {
            Self::Tab(id) => Some(ItemKey::Tab(id.clone())),
            Self::Group(id) => Some(ItemKey::Group(*id)),
            Self::Slot(_) => None,
        }
    }
}

impl From<ItemKey> for NodeKey {
    fn from(value: ItemKey) -> Self {
        match value {
            ItemKey::Tab(id) => Self::Tab(id),
            ItemKey::Group(id) => Self::Group(id),
        }
    }
}

/// Context value exposed to host menus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextValue {
    Tab,
    GroupedTab,
    Group,
    Slot,
}

impl ContextValue {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tab => "tab",
            Self::GroupedTab => "grouped-tab",
            Self::Group => "group",
            Self::Slot => "slot",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collapsible {
    None,
    Collapsed,
    Expanded,
}

/// Render record for one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub key: NodeKey,
    pub label: String,
    /// Secondary label shown next to `label`.
    pub description: Option<String>,
    pub context_value: ContextValue,
    pub collapsible: Collapsible,
    pub color: Option<ColorId>,
    pub resource_uri: Option<String>,
}

pub type NodeHandle = Rc<RefCell<TreeNode>>;

/// Items carried by one drag gesture.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DragPayload {
    pub items: Vec<ItemKey>,
}

impl DragPayload {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// What a drop did to the forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    Unchanged,
    Changed,
    /// A new group was synthesized; the caller should prompt for its label.
    GroupCreated(GroupId),
}

pub struct TabsTreeProvider {
    tree: TreeData,
    sort_mode: bool,
    separator: String,
    /// Render summaries of live tabs, by tab id.
    described: HashMap<TabId, TabDescription>,
    /// Duplicate-name secondary labels, by tab id.
    secondary: HashMap<TabId, String>,
    nodes: HashMap<NodeKey, NodeHandle>,
}

impl TabsTreeProvider {
    pub fn new(tree: TreeData, sort_mode: bool, separator: impl Into<String>) -> Self {
        Self {
            tree,
            sort_mode,
            separator: separator.into(),
            described: HashMap::new(),
            secondary: HashMap::new(),
            nodes: HashMap::new(),
        }
    }

    pub fn tree(&self) -> &TreeData {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut TreeData {
        &mut self.tree
    }

    pub fn is_sort_mode(&self) -> bool {
        self.sort_mode
    }

    /// Switches drop semantics. Slot nodes of the old mode are evicted.
    pub fn set_sort_mode(&mut self, sort_mode: bool) {
        self.sort_mode = sort_mode;
        self.evict_stale_nodes();
    }

    pub fn description_of(&self, tab_id: &str) -> Option<&TabDescription> {
        self.described.get(tab_id)
    }

    /// Re-reads live tab summaries and recomputes secondary labels.
    pub fn refresh(&mut self, live: &[LiveTab], registry: &HandlerRegistry) {
        self.described.clear();
        for tab in live {
            if let Ok(id) = registry.identify(tab) {
                self.described
                    .entry(id)
                    .or_insert_with(|| registry.describe(tab));
            }
        }
        self.refresh_descriptions();
    }

    /// Recomputes secondary labels for tracked tabs and evicts stale nodes.
    pub fn refresh_descriptions(&mut self) {
        let tree = &self.tree;
        let entries = self
            .described
            .iter()
            .filter(|(id, _)| tree.contains_tab(id))
            .filter_map(|(id, description)| {
                description
                    .path
                    .as_deref()
                    .map(|path| (id.as_str(), path))
            });
        self.secondary = disambiguate(entries, &self.separator);
        self.evict_stale_nodes();
    }

    /// Children of `parent` (`None` = root), with a trailing slot in sort mode.
    pub fn get_children(&mut self, parent: Option<&NodeKey>) -> Vec<NodeHandle> {
        let container = match parent {
            None => None,
            Some(NodeKey::Group(group_id)) => Some(*group_id),
            Some(_) => return Vec::new(),
        };

        let mut keys = self
            .tree
            .get_children(container)
            .into_iter()
            .map(NodeKey::from)
            .collect::<Vec<_>>();
        if self.sort_mode && !keys.is_empty() {
            keys.push(NodeKey::Slot(container));
        }
        keys.iter().filter_map(|key| self.node(key)).collect()
    }

    /// Returns the up-to-date node for `key`, or `None` if it left the forest.
    pub fn get_tree_item(&mut self, key: &NodeKey) -> Option<NodeHandle> {
        self.node(key)
    }

    /// Parent node of `key`; root-level nodes have none.
    pub fn get_parent(&self, key: &NodeKey) -> Option<NodeKey> {
        match key {
            NodeKey::Tab(tab_id) => self
                .tree
                .get_parent(tab_id)
                .map(|group| NodeKey::Group(group.id)),
            NodeKey::Slot(Some(group_id)) => Some(NodeKey::Group(*group_id)),
            NodeKey::Group(_) | NodeKey::Slot(None) => None,
        }
    }

    /// Builds a drag payload from selected nodes, skipping slots and items
    /// no longer in the forest.
    pub fn handle_drag(&self, selection: &[NodeKey]) -> DragPayload {
        let items = selection
            .iter()
            .filter_map(NodeKey::item_key)
            .filter(|key| match key {
                ItemKey::Tab(tab_id) => self.tree.contains_tab(tab_id),
                ItemKey::Group(group_id) => self.tree.get_group(*group_id).is_some(),
            })
            .collect();
        DragPayload { items }
    }

    /// Applies a drop of `payload` onto `target` (`None` = empty space).
    ///
    /// Drops with nothing applicable report `Unchanged`. A target that left
    /// the forest reports `StaleReference`.
    pub fn handle_drop(
        &mut self,
        target: Option<&NodeKey>,
        payload: &DragPayload,
    ) -> TreeResult<DropOutcome> {
        let target_item = target.and_then(NodeKey::item_key);
        let dragged = payload
            .items
            .iter()
            .filter(|key| Some(*key) != target_item.as_ref())
            .cloned()
            .collect::<Vec<_>>();
        if dragged.is_empty() {
            return Ok(DropOutcome::Unchanged);
        }

        let result = if self.sort_mode {
            self.drop_sorted(target, &dragged)
        } else {
            self.drop_grouping(target, &dragged)
        };
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(TreeError::EmptyOperation) => DropOutcome::Unchanged,
            Err(err) => return Err(err),
        };
        debug!(
            "event=provider_drop module=provider status=ok sort_mode={} items={} outcome={:?}",
            self.sort_mode,
            dragged.len(),
            outcome
        );
        if outcome != DropOutcome::Unchanged {
            self.refresh_descriptions();
        }
        Ok(outcome)
    }

    /// Drops all cached nodes; the next read rebuilds them.
    pub fn clear_cache(&mut self) {
        self.nodes.clear();
    }

    fn drop_sorted(
        &mut self,
        target: Option<&NodeKey>,
        dragged: &[ItemKey],
    ) -> TreeResult<DropOutcome> {
        match target {
            None => self.tree.push_back(None, dragged)?,
            Some(NodeKey::Slot(container)) => self.tree.push_back(*container, dragged)?,
            Some(NodeKey::Tab(tab_id)) => {
                self.tree.move_to(&ItemKey::Tab(tab_id.clone()), dragged)?
            }
            Some(NodeKey::Group(group_id)) => {
                self.tree.move_to(&ItemKey::Group(*group_id), dragged)?
            }
        }
        Ok(DropOutcome::Changed)
    }

    /// Grouping mode: tabs are grouped with the target, groups are reordered
    /// before it.
    fn drop_grouping(
        &mut self,
        target: Option<&NodeKey>,
        dragged: &[ItemKey],
    ) -> TreeResult<DropOutcome> {
        let mut tabs = Vec::new();
        let mut groups = Vec::new();
        for key in dragged {
            match key {
                ItemKey::Tab(tab_id) => tabs.push(tab_id.clone()),
                ItemKey::Group(_) => groups.push(key.clone()),
            }
        }

        let target_key = match target {
            None => {
                let mut changed = false;
                if !groups.is_empty() {
                    changed |= applied(self.tree.push_back(None, &groups))?;
                }
                if !tabs.is_empty() {
                    changed |= applied(self.tree.ungroup(&tabs, true))?;
                }
                return Ok(changed_outcome(changed));
            }
            Some(NodeKey::Slot(_)) => return Ok(DropOutcome::Unchanged),
            Some(NodeKey::Tab(tab_id)) => ItemKey::Tab(tab_id.clone()),
            Some(NodeKey::Group(group_id)) => ItemKey::Group(*group_id),
        };

        let mut changed = false;
        if !groups.is_empty() {
            changed |= applied(self.tree.move_to(&target_key, &groups))?;
        }
        if tabs.is_empty() {
            return Ok(changed_outcome(changed));
        }
        let grouped = self.tree.group(&target_key, &tabs)?;
        if grouped.created {
            Ok(DropOutcome::GroupCreated(grouped.group_id))
        } else {
            Ok(DropOutcome::Changed)
        }
    }

    /// Rebuilds the node for `key` in place, reusing its cached handle.
    fn node(&mut self, key: &NodeKey) -> Option<NodeHandle> {
        let Some(fresh) = self.build_node(key) else {
            self.nodes.remove(key);
            return None;
        };
        if let Some(handle) = self.nodes.get(key) {
            *handle.borrow_mut() = fresh;
            return Some(Rc::clone(handle));
        }
        let handle = Rc::new(RefCell::new(fresh));
        self.nodes.insert(key.clone(), Rc::clone(&handle));
        Some(handle)
    }

    fn build_node(&self, key: &NodeKey) -> Option<TreeNode> {
        match key {
            NodeKey::Tab(tab_id) => {
                let tab = self.tree.get_tab(tab_id)?;
                let described = self.described.get(tab_id);
                let label = described
                    .map(|description| description.label.clone())
                    .unwrap_or_else(|| display_name(uri_path(tab_id)).to_string());
                Some(TreeNode {
                    key: key.clone(),
                    label,
                    description: self.secondary.get(tab_id).cloned(),
                    context_value: if tab.group_id.is_some() {
                        ContextValue::GroupedTab
                    } else {
                        ContextValue::Tab
                    },
                    collapsible: Collapsible::None,
                    color: None,
                    resource_uri: described
                        .and_then(|description| description.resource_uri.clone()),
                })
            }
            NodeKey::Group(group_id) => {
                let group = self.tree.get_group(*group_id)?;
                Some(TreeNode {
                    key: key.clone(),
                    label: group.label.clone(),
                    description: None,
                    context_value: ContextValue::Group,
                    collapsible: if group.collapsed {
                        Collapsible::Collapsed
                    } else {
                        Collapsible::Expanded
                    },
                    color: Some(group.color_id),
                    resource_uri: None,
                })
            }
            NodeKey::Slot(container) => {
                if !self.sort_mode {
                    return None;
                }
                if let Some(group_id) = container {
                    self.tree.get_group(*group_id)?;
                }
                Some(TreeNode {
                    key: key.clone(),
                    label: String::new(),
                    description: None,
                    context_value: ContextValue::Slot,
                    collapsible: Collapsible::None,
                    color: None,
                    resource_uri: None,
                })
            }
        }
    }

    fn evict_stale_nodes(&mut self) {
        let tree = &self.tree;
        let sort_mode = self.sort_mode;
        self.nodes.retain(|key, _| match key {
            NodeKey::Tab(tab_id) => tree.contains_tab(tab_id),
            NodeKey::Group(group_id) => tree.get_group(*group_id).is_some(),
            NodeKey::Slot(None) => sort_mode,
            NodeKey::Slot(Some(group_id)) => sort_mode && tree.get_group(*group_id).is_some(),
        });
    }
}

/// Maps an operation result to "did it change anything".
fn applied(result: TreeResult<()>) -> TreeResult<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(TreeError::EmptyOperation) => Ok(false),
        Err(err) => Err(err),
    }
}

fn changed_outcome(changed: bool) -> DropOutcome {
    if changed {
        DropOutcome::Changed
    } else {
        DropOutcome::Unchanged
    }
}
