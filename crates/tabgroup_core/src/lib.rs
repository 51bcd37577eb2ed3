//! Core of the tab groups tree.
//! Owns the tab/group forest, its reconciliation against live tabs, and the
//! presentation and persistence around it.

pub mod config;
pub mod db;
pub mod input;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{load_config, load_config_from_dir, ConfigError, CoreConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use input::registry::{HandlerRegistry, OpenRequest, TabDescription, TabKindHandler};
pub use input::tab::{CannotIdentify, LiveTab, TabChangeEvent, TabInput, TabSource};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::color::{next_color_id, ColorId, PALETTE};
pub use model::item::{Group, GroupId, ItemKey, Tab, TabId, TreeItem};
pub use model::tree::{GroupOutcome, TreeData, TreeError, TreeResult};
pub use repo::state_repo::{
    MemoryStateStore, SqliteStateStore, StateRepoError, StateRepoResult, StateStore,
};
pub use service::gate::ExclusiveGate;
pub use service::host::{EditorHost, HostError, HostResult};
pub use service::provider::{
    Collapsible, ContextValue, DragPayload, DropOutcome, NodeHandle, NodeKey, TabsTreeProvider,
    TreeNode,
};
pub use service::reconcile::{apply_closed, apply_opened, merge_state};
pub use service::view::{HostTask, TabsView};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
