//! Ordered tab kind handler table.
//!
//! # Responsibility
//! - Resolve one handler per live tab, trying more specific handlers first.
//! - Keep identity, render and open behavior for one kind in one place.
//!
//! # Invariants
//! - Lookup falls back to `UnknownKindHandler`, which renders but never
//!   identifies.
//! - Registration order is dispatch order.

use crate::input::tab::{display_name, uri_path, CannotIdentify, LiveTab, TabInput};
use crate::model::item::TabId;
use serde::Serialize;

/// Render-facing summary of one live tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabDescription {
    /// Primary label.
    pub label: String,
    /// Resource used for icons and tooltips.
    pub resource_uri: Option<String>,
    /// Path used for duplicate-name disambiguation.
    pub path: Option<String>,
}

/// Host action that brings one tab to the front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenRequest {
    Open {
        uri: String,
        view_column: u32,
    },
    Diff {
        original: String,
        modified: String,
        title: String,
        view_column: u32,
    },
    OpenWith {
        uri: String,
        view_type: String,
        view_column: u32,
    },
}

/// Behavior for one tab input kind.
pub trait TabKindHandler {
    fn name(&self) -> &'static str;
    fn matches(&self, tab: &LiveTab) -> bool;
    /// Returns the identity id binding tree data to the live tab.
    fn identify(&self, tab: &LiveTab) -> Result<TabId, CannotIdentify>;
    fn describe(&self, tab: &LiveTab) -> TabDescription;
    /// Returns `None` when the kind cannot be reopened by the host.
    fn open_request(&self, tab: &LiveTab) -> Option<OpenRequest>;
}

/// Text editor tabs, identified by URI.
#[derive(Debug, Default)]
pub struct TextHandler;

impl TabKindHandler for TextHandler {
    fn name(&self) -> &'static str {
        "text"
    }

    fn matches(&self, tab: &LiveTab) -> bool {
        matches!(tab.input, TabInput::Text { .. })
    }

    fn identify(&self, tab: &LiveTab) -> Result<TabId, CannotIdentify> {
        match &tab.input {
            TabInput::Text { uri } => Ok(uri.clone()),
            _ => Err(self.decline()),
        }
    }

    fn describe(&self, tab: &LiveTab) -> TabDescription {
        match &tab.input {
            TabInput::Text { uri } => resource_description(uri),
            _ => label_description(tab),
        }
    }

    fn open_request(&self, tab: &LiveTab) -> Option<OpenRequest> {
        match &tab.input {
            TabInput::Text { uri } => Some(OpenRequest::Open {
                uri: uri.clone(),
                view_column: tab.view_column,
            }),
            _ => None,
        }
    }
}

impl TextHandler {
    fn decline(&self) -> CannotIdentify {
        CannotIdentify {
            handler: self.name(),
        }
    }
}

#[derive(Serialize)]
struct DiffIdentity<'a> {
    original: &'a str,
    modified: &'a str,
}

/// Diff editor tabs, identified by both sides.
#[derive(Debug, Default)]
pub struct TextDiffHandler;

impl TabKindHandler for TextDiffHandler {
    fn name(&self) -> &'static str {
        "text_diff"
    }

    fn matches(&self, tab: &LiveTab) -> bool {
        matches!(tab.input, TabInput::TextDiff { .. })
    }

    fn identify(&self, tab: &LiveTab) -> Result<TabId, CannotIdentify> {
        let TabInput::TextDiff { original, modified } = &tab.input else {
            return Err(CannotIdentify {
                handler: self.name(),
            });
        };
        serde_json::to_string(&DiffIdentity { original, modified }).map_err(|_| CannotIdentify {
            handler: self.name(),
        })
    }

    fn describe(&self, tab: &LiveTab) -> TabDescription {
        match &tab.input {
            TabInput::TextDiff { modified, .. } => TabDescription {
                label: tab.label.clone(),
                ..resource_description(modified)
            },
            _ => label_description(tab),
        }
    }

    fn open_request(&self, tab: &LiveTab) -> Option<OpenRequest> {
        match &tab.input {
            TabInput::TextDiff { original, modified } => Some(OpenRequest::Diff {
                original: original.clone(),
                modified: modified.clone(),
                title: tab.label.clone(),
                view_column: tab.view_column,
            }),
            _ => None,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CustomIdentity<'a> {
    uri: &'a str,
    view_type: &'a str,
}

/// Custom editor tabs, identified by resource path and view type.
///
/// Only the URI path participates: hosts may rewrite query or authority for
/// the same resource between sessions.
#[derive(Debug, Default)]
pub struct CustomHandler;

impl TabKindHandler for CustomHandler {
    fn name(&self) -> &'static str {
        "custom"
    }

    fn matches(&self, tab: &LiveTab) -> bool {
        matches!(tab.input, TabInput::Custom { .. })
    }

    fn identify(&self, tab: &LiveTab) -> Result<TabId, CannotIdentify> {
        let TabInput::Custom { uri, view_type } = &tab.input else {
            return Err(CannotIdentify {
                handler: self.name(),
            });
        };
        serde_json::to_string(&CustomIdentity {
            uri: uri_path(uri),
            view_type,
        })
        .map_err(|_| CannotIdentify {
            handler: self.name(),
        })
    }

    fn describe(&self, tab: &LiveTab) -> TabDescription {
        match &tab.input {
            TabInput::Custom { uri, .. } => resource_description(uri),
            _ => label_description(tab),
        }
    }

    fn open_request(&self, tab: &LiveTab) -> Option<OpenRequest> {
        match &tab.input {
            TabInput::Custom { uri, view_type } => Some(OpenRequest::OpenWith {
                uri: uri.clone(),
                view_type: view_type.clone(),
                view_column: tab.view_column,
            }),
            _ => None,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NotebookIdentity<'a> {
    uri: &'a str,
    notebook_type: &'a str,
}

/// Notebook tabs, identified by resource and notebook type.
#[derive(Debug, Default)]
pub struct NotebookHandler;

impl TabKindHandler for NotebookHandler {
    fn name(&self) -> &'static str {
        "notebook"
    }

    fn matches(&self, tab: &LiveTab) -> bool {
        matches!(tab.input, TabInput::Notebook { .. })
    }

    fn identify(&self, tab: &LiveTab) -> Result<TabId, CannotIdentify> {
        let TabInput::Notebook { uri, notebook_type } = &tab.input else {
            return Err(CannotIdentify {
                handler: self.name(),
            });
        };
        serde_json::to_string(&NotebookIdentity { uri, notebook_type }).map_err(|_| {
            CannotIdentify {
                handler: self.name(),
            }
        })
    }

    fn describe(&self, tab: &LiveTab) -> TabDescription {
        match &tab.input {
            TabInput::Notebook { uri, .. } => resource_description(uri),
            _ => label_description(tab),
        }
    }

    fn open_request(&self, tab: &LiveTab) -> Option<OpenRequest> {
        match &tab.input {
            TabInput::Notebook { uri, notebook_type } => Some(OpenRequest::OpenWith {
                uri: uri.clone(),
                view_type: notebook_type.clone(),
                view_column: tab.view_column,
            }),
            _ => None,
        }
    }
}

/// Webview panels, identified by view type. They cannot be reopened.
#[derive(Debug, Default)]
pub struct WebviewHandler;

impl TabKindHandler for WebviewHandler {
    fn name(&self) -> &'static str {
        "webview"
    }

    fn matches(&self, tab: &LiveTab) -> bool {
        matches!(tab.input, TabInput::Webview { .. })
    }

    fn identify(&self, tab: &LiveTab) -> Result<TabId, CannotIdentify> {
        match &tab.input {
            TabInput::Webview { view_type } => Ok(view_type.clone()),
            _ => Err(CannotIdentify {
                handler: self.name(),
            }),
        }
    }

    fn describe(&self, tab: &LiveTab) -> TabDescription {
        label_description(tab)
    }

    fn open_request(&self, _tab: &LiveTab) -> Option<OpenRequest> {
        None
    }
}

/// Fallback for kinds without a handler.
///
/// Unknown tabs are rendered by label but never tracked: there is no stable
/// id that binds them to tree data.
#[derive(Debug, Default)]
pub struct UnknownKindHandler;

impl TabKindHandler for UnknownKindHandler {
    fn name(&self) -> &'static str {
        "unknown"
    }

    fn matches(&self, _tab: &LiveTab) -> bool {
        true
    }

    fn identify(&self, _tab: &LiveTab) -> Result<TabId, CannotIdentify> {
        Err(CannotIdentify {
            handler: self.name(),
        })
    }

    fn describe(&self, tab: &LiveTab) -> TabDescription {
        label_description(tab)
    }

    fn open_request(&self, _tab: &LiveTab) -> Option<OpenRequest> {
        None
    }
}

/// Ordered dispatch table over tab kind handlers.
pub struct HandlerRegistry {
    handlers: Vec<Box<dyn TabKindHandler>>,
    fallback: UnknownKindHandler,
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::with_builtin_handlers()
    }
}

impl HandlerRegistry {
    /// Creates a registry with no handlers; every tab falls back.
    pub fn empty() -> Self {
        Self {
            handlers: Vec::new(),
            fallback: UnknownKindHandler,
        }
    }

    /// Creates a registry with every built-in handler in dispatch order.
    pub fn with_builtin_handlers() -> Self {
        let mut registry = Self::empty();
        registry.register(TextHandler);
        registry.register(TextDiffHandler);
        registry.register(CustomHandler);
        registry.register(NotebookHandler);
        registry.register(WebviewHandler);
        registry
    }

    /// Appends a handler. Register specific handlers before general ones.
    pub fn register(&mut self, handler: impl TabKindHandler + 'static) {
        self.handlers.push(Box::new(handler));
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Returns the first matching handler, or the fallback.
    pub fn handler_for(&self, tab: &LiveTab) -> &dyn TabKindHandler {
        self.handlers
            .iter()
            .find(|handler| handler.matches(tab))
            .map(|handler| handler.as_ref())
            .unwrap_or(&self.fallback as &dyn TabKindHandler)
    }

    pub fn identify(&self, tab: &LiveTab) -> Result<TabId, CannotIdentify> {
        self.handler_for(tab).identify(tab)
    }

    pub fn describe(&self, tab: &LiveTab) -> TabDescription {
        self.handler_for(tab).describe(tab)
    }

    pub fn open_request(&self, tab: &LiveTab) -> Option<OpenRequest> {
        self.handler_for(tab).open_request(tab)
    }
}

fn resource_description(uri: &str) -> TabDescription {
    let path = uri_path(uri);
    TabDescription {
        label: display_name(path).to_string(),
        resource_uri: Some(uri.to_string()),
        path: Some(path.to_string()),
    }
}

fn label_description(tab: &LiveTab) -> TabDescription {
    TabDescription {
        label: tab.label.clone(),
        resource_uri: None,
        path: None,
    }
}
