//! Tab and group records.
//!
//! # Responsibility
//! - Define the canonical records stored in the forest and persisted as JSON.
//! - Provide typed keys used to address items across API boundaries.
//!
//! # Invariants
//! - `Tab::id` is the identity id of a live item, not a display label.
//! - `Group::id` is generated once and never reused for another group.
//!
//! # See also
//! - `crate::repo::state_repo` for the persisted document shape.

use crate::model::color::ColorId;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Identity id of one tracked tab.
///
/// Derived deterministically from the live item's resource identity.
pub type TabId = String;

/// Stable identifier of one group.
pub type GroupId = Uuid;

/// One tracked open item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tab {
    /// Owning group. `None` means root-level tab.
    pub group_id: Option<GroupId>,
    /// Identity id shared with the live item.
    pub id: TabId,
}

impl Tab {
    /// Creates a root-level tab.
    pub fn new(id: impl Into<TabId>) -> Self {
        Self {
            group_id: None,
            id: id.into(),
        }
    }
}

/// Named, colored, one-level container of tabs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: GroupId,
    pub color_id: ColorId,
    /// Free text, empty until the user names the group.
    pub label: String,
    /// Display hint only.
    #[serde(default)]
    pub collapsed: bool,
    #[serde(with = "tagged_children")]
    pub children: Vec<Tab>,
}

impl Group {
    /// Creates an empty, expanded group with a generated stable id.
    pub fn new(color_id: ColorId) -> Self {
        Self::with_id(Uuid::new_v4(), color_id)
    }

    /// Creates an empty, expanded group with a caller-provided id.
    ///
    /// Used by restore paths and tests where identity already exists.
    pub fn with_id(id: GroupId, color_id: ColorId) -> Self {
        Self {
            id,
            color_id,
            label: String::new(),
            collapsed: false,
            children: Vec::new(),
        }
    }
}

/// Group children are stored with the same `type` tag as root tabs.
mod tagged_children {
    use super::Tab;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize)]
    #[serde(tag = "type", rename_all = "snake_case")]
    enum ChildRef<'a> {
        Tab(&'a Tab),
    }

    #[derive(Deserialize)]
    #[serde(tag = "type", rename_all = "snake_case")]
    enum Child {
        Tab(Tab),
    }

    pub fn serialize<S: Serializer>(children: &[Tab], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(children.iter().map(ChildRef::Tab))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Tab>, D::Error> {
        let children = Vec::<Child>::deserialize(deserializer)?;
        Ok(children
            .into_iter()
            .map(|Child::Tab(tab)| tab)
            .collect())
    }
}

/// Root-level entry: either an ungrouped tab or a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TreeItem {
    Tab(Tab),
    Group(Group),
}

impl TreeItem {
    /// Returns the key addressing this item.
    pub fn key(&self) -> ItemKey {
        match self {
            Self::Tab(tab) => ItemKey::Tab(tab.id.clone()),
            Self::Group(group) => ItemKey::Group(group.id),
        }
    }

    pub fn as_group(&self) -> Option<&Group> {
        match self {
            Self::Group(group) => Some(group),
            Self::Tab(_) => None,
        }
    }

    pub fn as_tab(&self) -> Option<&Tab> {
        match self {
            Self::Tab(tab) => Some(tab),
            Self::Group(_) => None,
        }
    }
}

/// Typed address of one tab or group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ItemKey {
    Tab(TabId),
    Group(GroupId),
}

impl ItemKey {
    pub fn tab(id: impl Into<TabId>) -> Self {
        Self::Tab(id.into())
    }

    pub fn as_tab_id(&self) -> Option<&str> {
        match self {
            Self::Tab(id) => Some(id.as_str()),
            Self::Group(_) => None,
        }
    }
}

impl Display for ItemKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            // Tab ids carry user paths; only their length is printed.
            Self::Tab(id) => write!(f, "tab(len={})", id.len()),
            Self::Group(id) => write!(f, "group({id})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Group, Tab, TreeItem};
    use crate::model::color::ColorId;
    use uuid::Uuid;

    #[test]
    fn tree_item_serializes_with_type_tag_and_camel_case_fields() {
        let group_id = Uuid::nil();
        let mut group = Group::with_id(group_id, ColorId::Lines);
        group.children.push(Tab {
            group_id: Some(group_id),
            id: "file:///a.txt".to_string(),
        });
        let json = serde_json::to_value(vec![
            TreeItem::Tab(Tab::new("file:///b.txt")),
            TreeItem::Group(group),
        ])
        .expect("forest should serialize");

        assert_eq!(json[0]["type"], "tab");
        assert_eq!(json[0]["groupId"], serde_json::Value::Null);
        assert_eq!(json[1]["type"], "group");
        assert_eq!(json[1]["colorId"], "charts.lines");
        assert_eq!(json[1]["collapsed"], false);
        assert_eq!(json[1]["children"][0]["type"], "tab");
        assert_eq!(json[1]["children"][0]["groupId"], group_id.to_string());
    }

    #[test]
    fn group_defaults_to_expanded_with_empty_label() {
        let group = Group::new(ColorId::Red);
        assert!(group.label.is_empty());
        assert!(!group.collapsed);
        assert!(group.children.is_empty());
    }
}
