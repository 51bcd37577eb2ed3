use futures::channel::oneshot;
use futures::executor::block_on;
use futures::future::{self, FutureExt, LocalBoxFuture};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use tabgroup_core::{
    ColorId, CoreConfig, DropOutcome, EditorHost, Group, GroupId, HandlerRegistry, HostError,
    HostResult, ItemKey, LiveTab, MemoryStateStore, NodeKey, OpenRequest, StateStore, Tab,
    TabChangeEvent, TabInput, TabSource, TabsView, TreeError, TreeItem,
};

#[derive(Clone, Default)]
struct FakeSource {
    tabs: Rc<RefCell<Vec<LiveTab>>>,
}

impl FakeSource {
    fn with(uris: &[&str]) -> Self {
        let source = Self::default();
        source
            .tabs
            .borrow_mut()
            .extend(uris.iter().map(|uri| LiveTab::text(*uri)));
        source
    }

    fn open(&self, uri: &str) -> LiveTab {
        let tab = LiveTab::text(uri);
        self.tabs.borrow_mut().push(tab.clone());
        tab
    }

    fn close(&self, uri: &str) -> LiveTab {
        let mut tabs = self.tabs.borrow_mut();
        let position = tabs.iter().position(|tab| tab == &LiveTab::text(uri)).unwrap();
        tabs.remove(position)
    }
}

impl TabSource for FakeSource {
    fn live_tabs(&self) -> Vec<LiveTab> {
        self.tabs.borrow().clone()
    }
}

#[derive(Default)]
struct FakeHost {
    opened: RefCell<Vec<OpenRequest>>,
    revealed: RefCell<Vec<NodeKey>>,
    closed: RefCell<Vec<LiveTab>>,
    labels: RefCell<VecDeque<Option<String>>>,
    /// When set, the next open waits for this signal.
    hold_open: RefCell<Option<oneshot::Receiver<()>>>,
}

impl EditorHost for FakeHost {
    fn open(&self, request: OpenRequest) -> LocalBoxFuture<'static, HostResult<()>> {
        self.opened.borrow_mut().push(request);
        match self.hold_open.borrow_mut().take() {
            Some(signal) => {
                async move { signal.await.map_err(|_| HostError::Unavailable) }.boxed_local()
            }
            None => future::ready(Ok(())).boxed_local(),
        }
    }

    fn reveal(&self, node: NodeKey) -> LocalBoxFuture<'static, HostResult<()>> {
        self.revealed.borrow_mut().push(node);
        future::ready(Ok(())).boxed_local()
    }

    fn prompt_group_label(&self) -> LocalBoxFuture<'static, Option<String>> {
        let label = self.labels.borrow_mut().pop_front().flatten();
        future::ready(label).boxed_local()
    }

    fn close(&self, tab: &LiveTab) -> HostResult<()> {
        self.closed.borrow_mut().push(tab.clone());
        Ok(())
    }
}

type View<'a> = TabsView<&'a MemoryStateStore, FakeSource, FakeHost>;

fn open_view<'a>(store: &'a MemoryStateStore, source: &FakeSource) -> View<'a> {
    TabsView::open(
        CoreConfig::default(),
        store,
        source.clone(),
        FakeHost::default(),
        HandlerRegistry::with_builtin_handlers(),
    )
}

fn tab(uri: &str) -> NodeKey {
    NodeKey::Tab(uri.to_string())
}

fn persisted(store: &MemoryStateStore) -> Vec<TreeItem> {
    store.load().unwrap().unwrap()
}

fn group_onto(view: &mut View<'_>, dragged: &str, target: &str) -> GroupId {
    let payload = view.provider().handle_drag(&[tab(dragged)]);
    match view.handle_drop(Some(&tab(target)), &payload) {
        DropOutcome::GroupCreated(group_id) => group_id,
        outcome => panic!("expected new group, got {outcome:?}"),
    }
}

#[test]
fn cold_start_lists_live_tabs_and_persists_them() {
    let store = MemoryStateStore::new();
    let source = FakeSource::with(&["file:///a.rs", "file:///b.rs"]);

    let mut view = open_view(&store, &source);

    let expected = vec![
        TreeItem::Tab(Tab::new("file:///a.rs")),
        TreeItem::Tab(Tab::new("file:///b.rs")),
    ];
    assert_eq!(view.snapshot(), expected);
    assert_eq!(persisted(&store), expected);
}

#[test]
fn restart_restores_groups_and_appends_new_tabs() {
    let mut group = Group::new(ColorId::Orange);
    group.label = "pair".to_string();
    group.children = vec![Tab::new("file:///b.rs"), Tab::new("file:///a.rs")];
    let group_id = group.id;
    let store = MemoryStateStore::new();
    store.save(&[TreeItem::Group(group)]).unwrap();
    let source = FakeSource::with(&["file:///a.rs", "file:///c.rs", "file:///b.rs"]);

    let view = open_view(&store, &source);

    assert_eq!(
        view.tree().get_children(None),
        [ItemKey::Group(group_id), ItemKey::tab("file:///c.rs")]
    );
    assert_eq!(
        view.tree().get_children(Some(group_id)),
        [ItemKey::tab("file:///b.rs"), ItemKey::tab("file:///a.rs")]
    );
    assert_eq!(view.tree().get_group(group_id).unwrap().label, "pair");
}

#[test]
fn unreadable_state_is_a_cold_start() {
    let store = MemoryStateStore::with_payload("[{\"type\":\"nope\"}]");
    let source = FakeSource::with(&["file:///a.rs"]);

    let mut view = open_view(&store, &source);

    assert_eq!(view.snapshot(), vec![TreeItem::Tab(Tab::new("file:///a.rs"))]);
    assert_eq!(persisted(&store).len(), 1);
    let raw = store.raw_payload().unwrap();
    assert!(raw.contains("\"id\":\"file:///a.rs\""), "unexpected payload {raw}");
}

#[test]
fn tab_events_update_and_persist_the_forest() {
    let store = MemoryStateStore::new();
    let source = FakeSource::with(&["file:///a.rs"]);
    let mut view = open_view(&store, &source);

    let opened = source.open("file:///b.rs");
    let reveal = view.on_tabs_changed(&TabChangeEvent {
        opened: vec![opened],
        ..TabChangeEvent::default()
    });
    assert!(reveal.is_none());
    assert_eq!(persisted(&store).len(), 2);

    let closed = source.close("file:///a.rs");
    let reveal = view.on_tabs_changed(&TabChangeEvent {
        closed: vec![closed],
        ..TabChangeEvent::default()
    });
    assert!(reveal.is_none());
    assert_eq!(persisted(&store), vec![TreeItem::Tab(Tab::new("file:///b.rs"))]);
}

#[test]
fn activation_change_reveals_the_tab_through_the_gate() {
    let store = MemoryStateStore::new();
    let source = FakeSource::with(&["file:///a.rs", "file:///b.rs"]);
    let mut view = open_view(&store, &source);

    let task = view
        .on_tabs_changed(&TabChangeEvent {
            changed: vec![LiveTab::text("file:///b.rs").active()],
            ..TabChangeEvent::default()
        })
        .unwrap();
    assert!(view.is_busy());
    assert_eq!(block_on(task), Ok(()));

    assert!(!view.is_busy());
    assert_eq!(*view.host().revealed.borrow(), [tab("file:///b.rs")]);
}

#[test]
fn dropped_reveal_task_does_not_swallow_the_next_activation() {
    let store = MemoryStateStore::new();
    let source = FakeSource::with(&["file:///a.rs", "file:///b.rs"]);
    let mut view = open_view(&store, &source);

    let reveal = view.on_tabs_changed(&TabChangeEvent {
        changed: vec![LiveTab::text("file:///b.rs").active()],
        ..TabChangeEvent::default()
    });
    assert!(reveal.is_some());
    drop(reveal);
    assert!(!view.is_busy());

    let activation = view.activate("file:///a.rs").unwrap();
    assert_eq!(block_on(activation), Ok(()));
    assert_eq!(
        *view.host().opened.borrow(),
        [OpenRequest::Open {
            uri: "file:///a.rs".to_string(),
            view_column: 1,
        }]
    );
}

#[test]
fn activating_a_webview_is_rejected_and_frees_the_gate() {
    let store = MemoryStateStore::new();
    let source = FakeSource::with(&["file:///a.rs"]);
    source.tabs.borrow_mut().push(LiveTab::new(
        "Preview",
        TabInput::Webview {
            view_type: "markdown.preview".to_string(),
        },
    ));
    let view = open_view(&store, &source);

    let activation = view.activate("markdown.preview").unwrap();
    assert!(matches!(block_on(activation), Err(HostError::Rejected(_))));
    assert!(view.host().opened.borrow().is_empty());
    assert!(!view.is_busy());

    let next = view.activate("file:///a.rs").unwrap();
    assert_eq!(block_on(next), Ok(()));
    assert_eq!(view.host().opened.borrow().len(), 1);
}

#[test]
fn concurrent_activations_share_one_host_call() {
    let store = MemoryStateStore::new();
    let source = FakeSource::with(&["file:///a.rs", "file:///b.rs"]);
    let view = open_view(&store, &source);
    let (release, signal) = oneshot::channel();
    *view.host().hold_open.borrow_mut() = Some(signal);

    let first = view.activate("file:///a.rs").unwrap();
    let second = view.activate("file:///b.rs").unwrap();
    let reveal = view.reveal(tab("file:///b.rs"));
    assert_eq!(view.host().opened.borrow().len(), 1);
    assert!(view.host().revealed.borrow().is_empty());

    release.send(()).unwrap();
    assert_eq!(block_on(second), Ok(()));
    assert_eq!(block_on(first), Ok(()));
    assert_eq!(block_on(reveal), Ok(()));

    let next = view.activate("file:///b.rs").unwrap();
    assert_eq!(block_on(next), Ok(()));
    assert_eq!(
        *view.host().opened.borrow(),
        [
            OpenRequest::Open {
                uri: "file:///a.rs".to_string(),
                view_column: 1,
            },
            OpenRequest::Open {
                uri: "file:///b.rs".to_string(),
                view_column: 1,
            },
        ]
    );
}

#[test]
fn activating_unknown_tab_is_a_stale_reference() {
    let store = MemoryStateStore::new();
    let source = FakeSource::with(&["file:///a.rs"]);
    let view = open_view(&store, &source);

    assert!(matches!(
        view.activate("file:///gone.rs"),
        Err(TreeError::StaleReference(_))
    ));
    assert!(!view.is_busy());
}

#[test]
fn drop_creating_a_group_prompts_for_its_label() {
    let store = MemoryStateStore::new();
    let source = FakeSource::with(&["file:///a.rs", "file:///b.rs"]);
    let mut view = open_view(&store, &source);
    view.host()
        .labels
        .borrow_mut()
        .push_back(Some("docs".to_string()));
    let payload = view.provider().handle_drag(&[tab("file:///a.rs")]);

    let outcome = block_on(view.drop_and_label(Some(&tab("file:///b.rs")), &payload));

    let DropOutcome::GroupCreated(group_id) = outcome else {
        panic!("expected new group, got {outcome:?}");
    };
    let saved = persisted(&store);
    let [TreeItem::Group(group)] = saved.as_slice() else {
        panic!("expected one persisted group, got {saved:?}");
    };
    assert_eq!(group.id, group_id);
    assert_eq!(group.label, "docs");
}

#[test]
fn dismissed_label_prompt_keeps_empty_label() {
    let store = MemoryStateStore::new();
    let source = FakeSource::with(&["file:///a.rs", "file:///b.rs"]);
    let mut view = open_view(&store, &source);
    let payload = view.provider().handle_drag(&[tab("file:///a.rs")]);

    let outcome = block_on(view.drop_and_label(Some(&tab("file:///b.rs")), &payload));

    let DropOutcome::GroupCreated(group_id) = outcome else {
        panic!("expected new group");
    };
    assert!(view.tree().get_group(group_id).unwrap().label.is_empty());
}

#[test]
fn group_commands_persist_each_change() {
    let store = MemoryStateStore::new();
    let source = FakeSource::with(&["file:///a.rs", "file:///b.rs", "file:///c.rs"]);
    let mut view = open_view(&store, &source);
    let group_id = group_onto(&mut view, "file:///b.rs", "file:///a.rs");

    view.rename_group(group_id, "web").unwrap();
    view.collapse_all();
    let saved = persisted(&store);
    let group = saved[0].as_group().unwrap();
    assert_eq!(group.label, "web");
    assert!(group.collapsed);

    view.expand_all();
    assert!(!persisted(&store)[0].as_group().unwrap().collapsed);

    view.ungroup(&["file:///a.rs".to_string()]).unwrap();
    assert_eq!(
        view.tree().get_children(None),
        [
            ItemKey::Group(group_id),
            ItemKey::tab("file:///a.rs"),
            ItemKey::tab("file:///c.rs"),
        ]
    );

    view.cancel_group(group_id).unwrap();
    assert_eq!(
        persisted(&store),
        vec![
            TreeItem::Tab(Tab::new("file:///b.rs")),
            TreeItem::Tab(Tab::new("file:///a.rs")),
            TreeItem::Tab(Tab::new("file:///c.rs")),
        ]
    );
}

#[test]
fn collapsing_each_group_reports_when_all_are_collapsed() {
    let store = MemoryStateStore::new();
    let source =
        FakeSource::with(&["file:///a.rs", "file:///b.rs", "file:///c.rs", "file:///d.rs"]);
    let mut view = open_view(&store, &source);
    let first = group_onto(&mut view, "file:///b.rs", "file:///a.rs");
    let second = group_onto(&mut view, "file:///d.rs", "file:///c.rs");

    assert_eq!(view.set_collapsed(first, true), Ok(false));
    assert_eq!(view.set_collapsed(second, true), Ok(true));
    assert!(persisted(&store)
        .iter()
        .all(|item| item.as_group().is_some_and(|group| group.collapsed)));

    assert_eq!(view.set_collapsed(first, false), Ok(false));
    assert!(!persisted(&store)[0].as_group().unwrap().collapsed);
    assert!(matches!(
        view.set_collapsed(GroupId::new_v4(), true),
        Err(TreeError::StaleReference(_))
    ));
}

#[test]
fn toggle_sort_mode_switches_drop_semantics() {
    let store = MemoryStateStore::new();
    let source = FakeSource::with(&["file:///a.rs", "file:///b.rs"]);
    let mut view = open_view(&store, &source);

    assert!(view.toggle_sort_mode());
    let payload = view.provider().handle_drag(&[tab("file:///b.rs")]);
    assert_eq!(
        view.handle_drop(Some(&tab("file:///a.rs")), &payload),
        DropOutcome::Changed
    );
    assert_eq!(
        persisted(&store),
        vec![
            TreeItem::Tab(Tab::new("file:///b.rs")),
            TreeItem::Tab(Tab::new("file:///a.rs")),
        ]
    );
    assert!(!view.toggle_sort_mode());
}

#[test]
fn reset_rebuilds_from_live_tabs() {
    let store = MemoryStateStore::new();
    let source = FakeSource::with(&["file:///a.rs", "file:///b.rs"]);
    let mut view = open_view(&store, &source);
    group_onto(&mut view, "file:///b.rs", "file:///a.rs");
    assert_eq!(view.tree().groups().count(), 1);

    view.reset();

    assert_eq!(view.tree().groups().count(), 0);
    assert_eq!(persisted(&store).len(), 2);
}

#[test]
fn closing_a_group_closes_every_live_tab_behind_it() {
    let store = MemoryStateStore::new();
    let source = FakeSource::with(&["file:///a.rs", "file:///b.rs", "file:///c.rs"]);
    source.open("file:///a.rs");
    let mut view = open_view(&store, &source);
    let group_id = group_onto(&mut view, "file:///b.rs", "file:///a.rs");

    assert_eq!(view.close(&NodeKey::Group(group_id)), Ok(3));
    assert_eq!(view.host().closed.borrow().len(), 3);
    assert_eq!(view.tree().tab_count(), 3);
}
