//! Tabs view orchestration.
//!
//! # Responsibility
//! - Build the startup forest from the store and the live tab set.
//! - Route host tab events, drag/drop and commands into the provider.
//! - Persist the forest after every observed change.
//!
//! # Invariants
//! - Every activation and reveal goes through one `ExclusiveGate`.
//! - Persistence is best-effort: a failed save is logged and never blocks
//!   the next mutation.
//! - An absent or unreadable persisted forest means a cold start.

use crate::config::CoreConfig;
use crate::input::registry::HandlerRegistry;
use crate::input::tab::{LiveTab, TabChangeEvent, TabSource};
use crate::model::item::{GroupId, ItemKey, TabId, TreeItem};
use crate::model::tree::{TreeData, TreeError, TreeResult};
use crate::repo::state_repo::StateStore;
use crate::service::gate::{ExclusiveGate, GateFuture};
use crate::service::host::{EditorHost, HostError, HostResult};
use crate::service::provider::{DragPayload, DropOutcome, NodeKey, TabsTreeProvider};
use crate::service::reconcile::{apply_closed, apply_opened, merge_state};
use futures::future::{self, FutureExt, LocalBoxFuture};
use log::{debug, info, warn};

/// Handle on a gated host operation.
///
/// The gate stays occupied until some clone of the task is polled to
/// completion, so hosts spawn it on their local executor.
pub type HostTask = GateFuture<HostResult<()>>;

pub struct TabsView<S: StateStore, T: TabSource, H: EditorHost> {
    config: CoreConfig,
    store: S,
    source: T,
    host: H,
    registry: HandlerRegistry,
    provider: TabsTreeProvider,
    gate: ExclusiveGate<HostResult<()>>,
}

impl<S: StateStore, T: TabSource, H: EditorHost> TabsView<S, T, H> {
    /// Loads the persisted forest, merges it with live tabs and saves the
    /// merged result.
    pub fn open(
        config: CoreConfig,
        store: S,
        source: T,
        host: H,
        registry: HandlerRegistry,
    ) -> Self {
        let persisted = load_or_cold_start(&store);
        let live = source.live_tabs();
        let mut tree = TreeData::new();
        tree.set_state(merge_state(persisted, &live, &registry));

        let mut provider =
            TabsTreeProvider::new(tree, config.sort_mode, config.label_separator.clone());
        provider.refresh(&live, &registry);

        let mut view = Self {
            config,
            store,
            source,
            host,
            registry,
            provider,
            gate: ExclusiveGate::new(),
        };
        view.persist();
        info!(
            "event=view_open module=view status=ok tabs={} groups={} sort_mode={}",
            view.provider.tree().tab_count(),
            view.provider.tree().groups().count(),
            view.provider.is_sort_mode()
        );
        view
    }

    pub fn provider(&self) -> &TabsTreeProvider {
        &self.provider
    }

    /// Mutable provider access for rendering reads (`get_children`,
    /// `get_tree_item`), which refresh cached nodes.
    pub fn provider_mut(&mut self) -> &mut TabsTreeProvider {
        &mut self.provider
    }

    pub fn tree(&self) -> &TreeData {
        self.provider.tree()
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Pruned copy of the current forest.
    pub fn snapshot(&mut self) -> Vec<TreeItem> {
        self.provider.tree_mut().snapshot()
    }

    /// Applies one host change batch.
    ///
    /// Returns the reveal task for the activated tab when revealing on change
    /// is enabled.
    #[must_use = "the reveal only runs when the returned task is polled"]
    pub fn on_tabs_changed(&mut self, event: &TabChangeEvent) -> Option<HostTask> {
        let live = self.source.live_tabs();
        let added = apply_opened(self.provider.tree_mut(), &event.opened, &self.registry);
        let removed = apply_closed(
            self.provider.tree_mut(),
            &event.closed,
            &live,
            &self.registry,
        );
        self.provider.refresh(&live, &self.registry);
        if !added.is_empty() || !removed.is_empty() {
            self.persist();
        }

        if !self.config.reveal_on_change {
            return None;
        }
        let active = event.activated()?;
        let tab_id = self.registry.identify(active).ok()?;
        if !self.tree().contains_tab(&tab_id) {
            return None;
        }
        Some(self.reveal(NodeKey::Tab(tab_id)))
    }

    /// Reveals a node through the gate.
    #[must_use = "the reveal only runs when the returned task is polled"]
    pub fn reveal(&self, node: NodeKey) -> HostTask {
        self.gate.run(|| logged("reveal", self.host.reveal(node)))
    }

    /// Opens the live tab behind `tab_id` through the gate.
    ///
    /// A tab kind the host cannot reopen settles with `HostError::Rejected`.
    #[must_use = "the activation only runs when the returned task is polled"]
    pub fn activate(&self, tab_id: &str) -> TreeResult<HostTask> {
        if !self.tree().contains_tab(tab_id) {
            debug!("event=view_activate module=view status=skip reason=stale_reference");
            return Err(TreeError::StaleReference(ItemKey::tab(tab_id)));
        }
        let request = self
            .live_tabs_for(tab_id)
            .into_iter()
            .find_map(|tab| self.registry.open_request(&tab));
        Ok(self.gate.run(|| {
            let task = match request {
                Some(request) => self.host.open(request),
                None => future::ready(Err(HostError::Rejected(
                    "tab kind cannot be reopened".to_string(),
                )))
                .boxed_local(),
            };
            logged("activate", task)
        }))
    }

    /// Whether an activation or reveal is outstanding.
    pub fn is_busy(&self) -> bool {
        self.gate.is_busy()
    }

    /// Applies a drop and persists the result.
    pub fn handle_drop(&mut self, target: Option<&NodeKey>, payload: &DragPayload) -> DropOutcome {
        match self.provider.handle_drop(target, payload) {
            Ok(DropOutcome::Unchanged) => DropOutcome::Unchanged,
            Ok(outcome) => {
                self.persist();
                outcome
            }
            Err(err) => {
                debug!("event=view_drop module=view status=skip reason={err}");
                DropOutcome::Unchanged
            }
        }
    }

    /// Applies a drop and, when it synthesized a group, prompts for its label.
    pub async fn drop_and_label(
        &mut self,
        target: Option<&NodeKey>,
        payload: &DragPayload,
    ) -> DropOutcome {
        let outcome = self.handle_drop(target, payload);
        if let DropOutcome::GroupCreated(group_id) = outcome {
            self.prompt_rename(group_id).await;
        }
        outcome
    }

    /// Prompts for a new label and applies it. Dismissing the prompt keeps
    /// the current label.
    pub async fn prompt_rename(&mut self, group_id: GroupId) {
        let Some(label) = self.host.prompt_group_label().await else {
            debug!(
                "event=view_rename module=view status=skip reason=dismissed group_id={group_id}"
            );
            return;
        };
        if let Err(err) = self.rename_group(group_id, label) {
            debug!("event=view_rename module=view status=skip reason={err}");
        }
    }

    pub fn rename_group(&mut self, group_id: GroupId, label: impl Into<String>) -> TreeResult<()> {
        self.provider.tree_mut().rename_group(group_id, label)?;
        self.changed();
        Ok(())
    }

    /// Dissolves a group in place.
    pub fn cancel_group(&mut self, group_id: GroupId) -> TreeResult<()> {
        self.provider.tree_mut().cancel_group(group_id)?;
        self.changed();
        Ok(())
    }

    /// Moves grouped tabs out, each right after its former group.
    pub fn ungroup(&mut self, tab_ids: &[TabId]) -> TreeResult<()> {
        self.provider.tree_mut().ungroup(tab_ids, false)?;
        self.changed();
        Ok(())
    }

    /// Flips between grouping and sort mode. Returns the new mode.
    pub fn toggle_sort_mode(&mut self) -> bool {
        let sort_mode = !self.provider.is_sort_mode();
        self.provider.set_sort_mode(sort_mode);
        self.config.sort_mode = sort_mode;
        info!("event=view_sort_mode module=view status=ok sort_mode={sort_mode}");
        sort_mode
    }

    pub fn expand_all(&mut self) {
        self.provider.tree_mut().set_all_collapsed(false);
        self.changed();
    }

    pub fn collapse_all(&mut self) {
        self.provider.tree_mut().set_all_collapsed(true);
        self.changed();
    }

    /// Records a host-side expand/collapse of one group.
    ///
    /// Returns whether every group is now collapsed, for the host's
    /// expand-all/collapse-all toggle.
    pub fn set_collapsed(&mut self, group_id: GroupId, collapsed: bool) -> TreeResult<bool> {
        let tree = self.provider.tree_mut();
        tree.set_collapsed_state(group_id, collapsed)?;
        let all_collapsed = tree.is_all_collapsed();
        self.persist();
        Ok(all_collapsed)
    }

    /// Drops the persisted forest and rebuilds it from live tabs alone.
    pub fn reset(&mut self) {
        if let Err(err) = self.store.clear() {
            warn!("event=view_reset module=view status=error error={err}");
        }
        let live = self.source.live_tabs();
        self.provider
            .tree_mut()
            .set_state(merge_state(Vec::new(), &live, &self.registry));
        self.provider.clear_cache();
        self.provider.refresh(&live, &self.registry);
        self.persist();
        info!(
            "event=view_reset module=view status=ok tabs={}",
            self.tree().tab_count()
        );
    }

    /// Asks the host to close every live tab behind `node`.
    ///
    /// The forest is updated when the host reports the close. Returns how
    /// many live tabs were closed.
    pub fn close(&self, node: &NodeKey) -> HostResult<usize> {
        let tab_ids = match node {
            NodeKey::Tab(tab_id) => vec![tab_id.clone()],
            NodeKey::Group(group_id) => self
                .tree()
                .get_group(*group_id)
                .map(|group| group.children.iter().map(|child| child.id.clone()).collect())
                .unwrap_or_default(),
            NodeKey::Slot(_) => Vec::new(),
        };

        let mut closed = 0usize;
        for tab_id in &tab_ids {
            for tab in self.live_tabs_for(tab_id) {
                self.host.close(&tab)?;
                closed += 1;
            }
        }
        debug!("event=view_close module=view status=ok closed={closed}");
        Ok(closed)
    }

    fn live_tabs_for(&self, tab_id: &str) -> Vec<LiveTab> {
        self.source
            .live_tabs()
            .into_iter()
            .filter(|tab| {
                self.registry
                    .identify(tab)
                    .is_ok_and(|id| id == tab_id)
            })
            .collect()
    }

    fn changed(&mut self) {
        self.provider.refresh_descriptions();
        self.persist();
    }

    fn persist(&mut self) {
        let forest = self.provider.tree_mut().snapshot();
        match self.store.save(&forest) {
            Ok(()) => debug!(
                "event=state_save module=view status=ok items={}",
                forest.len()
            ),
            Err(err) => warn!("event=state_save module=view status=error error={err}"),
        }
    }
}

fn load_or_cold_start(store: &impl StateStore) -> Vec<TreeItem> {
    match store.load() {
        Ok(Some(forest)) => forest,
        Ok(None) => {
            info!("event=state_load module=view status=skip reason=cold_start");
            Vec::new()
        }
        Err(err) => {
            warn!("event=state_load module=view status=error reason=cold_start error={err}");
            Vec::new()
        }
    }
}

fn logged(
    operation: &'static str,
    task: LocalBoxFuture<'static, HostResult<()>>,
) -> LocalBoxFuture<'static, HostResult<()>> {
    task.inspect(move |result| {
        if let Err(err) = result {
            warn!("event=host_{operation} module=view status=error error={err}");
        }
    })
    .boxed_local()
}
