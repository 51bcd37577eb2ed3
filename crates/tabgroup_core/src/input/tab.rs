//! Live tab records reported by the host.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static URI_PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]+:(//[^/]*)?").expect("valid uri prefix regex")
});

/// Input kind of one live tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabInput {
    /// Plain text editor on one resource.
    Text { uri: String },
    /// Side-by-side diff of two resources.
    TextDiff { original: String, modified: String },
    /// Custom editor contributed for a resource.
    Custom { uri: String, view_type: String },
    /// Notebook editor on one resource.
    Notebook { uri: String, notebook_type: String },
    /// Webview panel without a backing resource.
    Webview { view_type: String },
    Terminal,
    /// Anything the host reports that has no known shape.
    Unknown,
}

/// One open tab as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveTab {
    /// Host-provided title.
    pub label: String,
    pub input: TabInput,
    /// Editor column the tab lives in.
    pub view_column: u32,
    pub is_active: bool,
}

impl LiveTab {
    pub fn new(label: impl Into<String>, input: TabInput) -> Self {
        Self {
            label: label.into(),
            input,
            view_column: 1,
            is_active: false,
        }
    }

    /// Shorthand for a text tab labelled with the final path segment.
    pub fn text(uri: impl Into<String>) -> Self {
        let uri = uri.into();
        let label = display_name(uri_path(&uri)).to_string();
        Self::new(label, TabInput::Text { uri })
    }

    pub fn in_column(mut self, view_column: u32) -> Self {
        self.view_column = view_column;
        self
    }

    pub fn active(mut self) -> Self {
        self.is_active = true;
        self
    }
}

/// One batch of host tab changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TabChangeEvent {
    pub opened: Vec<LiveTab>,
    pub closed: Vec<LiveTab>,
    /// Tabs whose state changed; the first active one is the new focus.
    pub changed: Vec<LiveTab>,
}

impl TabChangeEvent {
    /// Returns the newly active tab, if this batch carries one.
    pub fn activated(&self) -> Option<&LiveTab> {
        self.changed.first().filter(|tab| tab.is_active)
    }
}

/// Host-side view of currently open tabs.
pub trait TabSource {
    /// Returns every live tab across all editor columns.
    fn live_tabs(&self) -> Vec<LiveTab>;
}

/// Identity resolution failure for unsupported tab kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CannotIdentify {
    /// Handler name that declined the tab.
    pub handler: &'static str,
}

impl Display for CannotIdentify {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "tab kind cannot be identified by `{}`", self.handler)
    }
}

impl Error for CannotIdentify {}

/// Returns the path component of a URI, or the input when it has no scheme.
pub fn uri_path(uri: &str) -> &str {
    match URI_PREFIX_RE.find(uri) {
        Some(prefix) => &uri[prefix.end()..],
        None => uri,
    }
}

/// Returns the final non-empty path segment.
pub fn display_name(path: &str) -> &str {
    path.split(['/', '\\'])
        .rev()
        .find(|segment| !segment.is_empty())
        .unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::{display_name, uri_path, LiveTab, TabChangeEvent};

    #[test]
    fn uri_path_strips_scheme_and_authority() {
        assert_eq!(uri_path("file:///home/me/a.txt"), "/home/me/a.txt");
        assert_eq!(uri_path("vscode-remote://wsl+ubuntu/src/main.rs"), "/src/main.rs");
        assert_eq!(uri_path("untitled:Untitled-1"), "Untitled-1");
        assert_eq!(uri_path("relative/path.rs"), "relative/path.rs");
    }

    #[test]
    fn display_name_returns_last_segment() {
        assert_eq!(display_name("/a/b/c.txt"), "c.txt");
        assert_eq!(display_name("C:\\work\\lib.rs"), "lib.rs");
        assert_eq!(display_name("dir/"), "dir");
    }

    #[test]
    fn activated_requires_active_first_change() {
        let mut event = TabChangeEvent::default();
        event.changed.push(LiveTab::text("file:///a.txt"));
        assert!(event.activated().is_none());

        event.changed[0].is_active = true;
        assert!(event.activated().is_some());
    }
}
