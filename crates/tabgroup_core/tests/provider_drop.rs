use std::rc::Rc;
use tabgroup_core::{
    Collapsible, ColorId, ContextValue, DragPayload, DropOutcome, HandlerRegistry, ItemKey,
    LiveTab, NodeKey, Tab, TabsTreeProvider, TreeData, TreeError, TreeItem,
};

fn provider(ids: &[&str], sort_mode: bool) -> TabsTreeProvider {
    let mut tree = TreeData::new();
    tree.set_state(ids.iter().map(|id| TreeItem::Tab(Tab::new(*id))).collect());
    TabsTreeProvider::new(tree, sort_mode, "/")
}

fn tab(id: &str) -> NodeKey {
    NodeKey::Tab(id.to_string())
}

fn payload(provider: &TabsTreeProvider, nodes: &[NodeKey]) -> DragPayload {
    provider.handle_drag(nodes)
}

fn root_keys(provider: &TabsTreeProvider) -> Vec<ItemKey> {
    provider.tree().get_children(None)
}

#[test]
fn dropping_tab_onto_root_tab_creates_group() {
    let mut provider = provider(&["a", "b", "c"], false);
    let dragged = payload(&provider, &[tab("a")]);

    let outcome = provider.handle_drop(Some(&tab("b")), &dragged).unwrap();

    let DropOutcome::GroupCreated(group_id) = outcome else {
        panic!("expected new group, got {outcome:?}");
    };
    assert_eq!(root_keys(&provider), [ItemKey::Group(group_id), ItemKey::tab("c")]);
    assert_eq!(
        provider.tree().get_children(Some(group_id)),
        [ItemKey::tab("b"), ItemKey::tab("a")]
    );

    let node = provider.get_tree_item(&NodeKey::Group(group_id)).unwrap();
    assert_eq!(node.borrow().context_value, ContextValue::Group);
    assert_eq!(node.borrow().collapsible, Collapsible::Expanded);
    assert_eq!(node.borrow().color, Some(ColorId::Foreground));
    let child = provider.get_tree_item(&tab("a")).unwrap();
    assert_eq!(child.borrow().context_value.as_str(), "grouped-tab");
}

#[test]
fn dropping_tab_onto_existing_group_reports_changed() {
    let mut provider = provider(&["a", "b", "c"], false);
    let dragged = payload(&provider, &[tab("a")]);
    let outcome = provider.handle_drop(Some(&tab("b")), &dragged).unwrap();
    let DropOutcome::GroupCreated(group_id) = outcome else {
        panic!("expected new group");
    };

    let dragged = payload(&provider, &[tab("c")]);
    let outcome = provider
        .handle_drop(Some(&NodeKey::Group(group_id)), &dragged)
        .unwrap();

    assert_eq!(outcome, DropOutcome::Changed);
    assert_eq!(root_keys(&provider), [ItemKey::Group(group_id)]);
}

#[test]
fn dropping_onto_empty_space_ungroups_to_root_end() {
    let mut provider = provider(&["a", "b", "c"], false);
    let dragged = payload(&provider, &[tab("a")]);
    provider.handle_drop(Some(&tab("b")), &dragged).unwrap();

    let dragged = payload(&provider, &[tab("b")]);
    let outcome = provider.handle_drop(None, &dragged).unwrap();

    assert_eq!(outcome, DropOutcome::Changed);
    let keys = root_keys(&provider);
    assert_eq!(keys[1..], [ItemKey::tab("c"), ItemKey::tab("b")]);
}

#[test]
fn dragged_item_equal_to_target_is_a_no_op() {
    let mut provider = provider(&["a", "b"], false);
    let dragged = payload(&provider, &[tab("a")]);

    assert_eq!(
        provider.handle_drop(Some(&tab("a")), &dragged),
        Ok(DropOutcome::Unchanged)
    );
    assert_eq!(root_keys(&provider), [ItemKey::tab("a"), ItemKey::tab("b")]);
}

#[test]
fn stale_drop_target_is_reported() {
    let mut provider = provider(&["a", "b"], false);
    let dragged = payload(&provider, &[tab("a")]);

    assert_eq!(
        provider.handle_drop(Some(&tab("gone")), &dragged),
        Err(TreeError::StaleReference(ItemKey::tab("gone")))
    );
}

#[test]
fn sort_mode_moves_before_target_and_slot_appends_to_container() {
    let mut provider = provider(&["a", "b", "c"], true);

    let dragged = payload(&provider, &[tab("c")]);
    assert_eq!(
        provider.handle_drop(Some(&tab("a")), &dragged),
        Ok(DropOutcome::Changed)
    );
    assert_eq!(
        root_keys(&provider),
        [ItemKey::tab("c"), ItemKey::tab("a"), ItemKey::tab("b")]
    );

    let dragged = payload(&provider, &[tab("c")]);
    provider
        .handle_drop(Some(&NodeKey::Slot(None)), &dragged)
        .unwrap();
    assert_eq!(
        root_keys(&provider),
        [ItemKey::tab("a"), ItemKey::tab("b"), ItemKey::tab("c")]
    );

    let dragged = payload(&provider, &[tab("a")]);
    provider.handle_drop(None, &dragged).unwrap();
    assert_eq!(
        root_keys(&provider),
        [ItemKey::tab("b"), ItemKey::tab("c"), ItemKey::tab("a")]
    );
}

#[test]
fn sort_mode_never_groups() {
    let mut provider = provider(&["a", "b"], true);
    let dragged = payload(&provider, &[tab("b")]);

    provider.handle_drop(Some(&tab("a")), &dragged).unwrap();

    assert_eq!(provider.tree().groups().count(), 0);
}

#[test]
fn slot_drop_in_grouping_mode_is_a_no_op() {
    let mut provider = provider(&["a", "b"], false);
    let dragged = payload(&provider, &[tab("a")]);

    assert_eq!(
        provider.handle_drop(Some(&NodeKey::Slot(None)), &dragged),
        Ok(DropOutcome::Unchanged)
    );
}

#[test]
fn group_children_gain_trailing_slot_in_sort_mode() {
    let mut provider = provider(&["a", "b"], false);
    let dragged = payload(&provider, &[tab("b")]);
    let outcome = provider.handle_drop(Some(&tab("a")), &dragged).unwrap();
    let DropOutcome::GroupCreated(group_id) = outcome else {
        panic!("expected new group");
    };
    provider.set_sort_mode(true);

    let children = provider.get_children(Some(&NodeKey::Group(group_id)));

    assert_eq!(children.len(), 3);
    let slot = children[2].borrow();
    assert_eq!(slot.key, NodeKey::Slot(Some(group_id)));
    assert_eq!(slot.context_value, ContextValue::Slot);
    assert_eq!(provider.get_parent(&slot.key), Some(NodeKey::Group(group_id)));
}

#[test]
fn descriptions_disambiguate_duplicate_names_and_nodes_stay_stable() {
    let registry = HandlerRegistry::with_builtin_handlers();
    let live = [
        LiveTab::text("file:///a/x/f.txt"),
        LiveTab::text("file:///b/x/f.txt"),
        LiveTab::text("file:///b/x/g.txt"),
    ];
    let mut provider = provider(
        &["file:///a/x/f.txt", "file:///b/x/f.txt", "file:///b/x/g.txt"],
        false,
    );
    provider.refresh(&live, &registry);

    let first = provider.get_tree_item(&tab("file:///a/x/f.txt")).unwrap();
    let second = provider.get_tree_item(&tab("file:///b/x/f.txt")).unwrap();
    let unique = provider.get_tree_item(&tab("file:///b/x/g.txt")).unwrap();
    assert_eq!(first.borrow().label, "f.txt");
    assert_eq!(first.borrow().description.as_deref(), Some("a"));
    assert_eq!(second.borrow().description.as_deref(), Some("b"));
    assert_eq!(unique.borrow().description, None);
    let summary = provider.description_of("file:///b/x/g.txt").unwrap();
    assert_eq!(summary.label, "g.txt");
    assert_eq!(summary.path.as_deref(), Some("/b/x/g.txt"));
    assert_eq!(
        first.borrow().resource_uri.as_deref(),
        Some("file:///a/x/f.txt")
    );

    provider.refresh(&live[..1], &registry);
    let again = provider.get_tree_item(&tab("file:///a/x/f.txt")).unwrap();
    assert!(Rc::ptr_eq(&first, &again));
    assert_eq!(again.borrow().description, None);
    assert!(provider.description_of("file:///b/x/g.txt").is_none());
}

#[test]
fn removed_items_leave_the_node_cache() {
    let mut provider = provider(&["a", "b"], false);
    let before = provider.get_tree_item(&tab("a")).unwrap();

    provider.tree_mut().delete_tab("a");
    provider.refresh_descriptions();
    assert!(provider.get_tree_item(&tab("a")).is_none());

    provider.tree_mut().append_tab("a");
    let after = provider.get_tree_item(&tab("a")).unwrap();
    assert!(!Rc::ptr_eq(&before, &after));
}
