// Window Source Trait
//
// Interface for querying the focused window, polled once per traced event.

use std::sync::Arc;

use parking_lot::Mutex;

/// Error type for window source operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WindowError {
    #[error("no compositor display found")]
    NoDisplay,

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("compositor does not offer {0}")]
    MissingGlobal(&'static str),
}

/// The focused window as the trace reports it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowInfo {
    /// Window title, absent for untitled windows
    pub title: Option<String>,

    /// Name of the application owning the window
    pub owner_app_name: String,
}

impl WindowInfo {
    pub fn new(title: Option<String>, owner_app_name: impl Into<String>) -> Self {
        Self {
            title,
            owner_app_name: owner_app_name.into(),
        }
    }

    /// Title as written to the trace, empty when absent
    pub fn title_or_empty(&self) -> &str {
        self.title.as_deref().unwrap_or("")
    }
}

/// Source of focused-window information
///
/// `None` means nothing is focused or the source cannot tell.
pub trait WindowSource: Send {
    fn active_window(&mut self) -> Option<WindowInfo>;
}

/// Source used when no window system is reachable
#[derive(Debug, Default, Clone, Copy)]
pub struct NullWindowSource;

impl WindowSource for NullWindowSource {
    fn active_window(&mut self) -> Option<WindowInfo> {
        None
    }
}

/// Source whose answer is set from outside, shared through a handle
#[derive(Debug, Default, Clone)]
pub struct StaticWindowSource {
    current: Arc<Mutex<Option<WindowInfo>>>,
}

impl StaticWindowSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, info: Option<WindowInfo>) {
        *self.current.lock() = info;
    }
}

impl WindowSource for StaticWindowSource {
    fn active_window(&mut self) -> Option<WindowInfo> {
        self.current.lock().clone()
    }
}
