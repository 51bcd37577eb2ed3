//! Editor host seam used by the tabs view.
//!
//! The host owns rendering, editors and user prompts. The core only asks it to
//! open, reveal or close things and never blocks on the answer.

use crate::input::registry::OpenRequest;
use crate::input::tab::LiveTab;
use crate::service::provider::NodeKey;
use futures::future::LocalBoxFuture;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type HostResult<T> = Result<T, HostError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    /// Host refused or failed the request.
    Rejected(String),
    /// Host surface is gone (window closing, view disposed).
    Unavailable,
}

impl Display for HostError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected(reason) => write!(f, "host rejected request: {reason}"),
            Self::Unavailable => write!(f, "host is unavailable"),
        }
    }
}

impl Error for HostError {}

/// Operations the tabs view needs from the editor host.
pub trait EditorHost {
    /// Brings a tab's editor to the front.
    fn open(&self, request: OpenRequest) -> LocalBoxFuture<'static, HostResult<()>>;

    /// Selects and scrolls to a rendered node.
    fn reveal(&self, node: NodeKey) -> LocalBoxFuture<'static, HostResult<()>>;

    /// Asks the user for a group label. `None` means the prompt was dismissed.
    fn prompt_group_label(&self) -> LocalBoxFuture<'static, Option<String>>;

    /// Closes one live tab.
    fn close(&self, tab: &LiveTab) -> HostResult<()>;
}
