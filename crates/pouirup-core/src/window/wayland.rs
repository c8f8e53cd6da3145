//! Wayland window source using wlr-foreign-toplevel-management-unstable-v1
//!
//! A background thread dispatches toplevel events and keeps the activated
//! toplevel's app_id and title in a shared slot.

use std::collections::HashMap;
use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use wayland_backend::rs::client::ObjectId;
use wayland_client::{
    event_created_child,
    globals::{registry_queue_init, GlobalListContents},
    protocol::wl_registry,
    Connection, Dispatch, Proxy, QueueHandle,
};
use wayland_protocols_wlr::foreign_toplevel::v1::client::{
    zwlr_foreign_toplevel_handle_v1, zwlr_foreign_toplevel_manager_v1,
};

use super::provider::{WindowError, WindowInfo, WindowSource};

const ACTIVATED_STATE: u8 = 2;

#[derive(Debug, Clone, Default)]
struct Toplevel {
    app_id: String,
    title: Option<String>,
}

struct ToplevelTracker {
    toplevels: HashMap<ObjectId, Toplevel>,
    active: Option<ObjectId>,
    focused: Arc<Mutex<Option<WindowInfo>>>,
}

impl ToplevelTracker {
    fn publish(&self) {
        let info = self
            .active
            .as_ref()
            .and_then(|id| self.toplevels.get(id))
            .map(|t| WindowInfo::new(t.title.clone(), t.app_id.clone()));
        *self.focused.lock() = info;
    }

    fn touch(&mut self, id: &ObjectId) {
        if self.active.as_ref() == Some(id) {
            self.publish();
        }
    }
}

impl Dispatch<wl_registry::WlRegistry, GlobalListContents> for ToplevelTracker {
    fn event(
        _state: &mut Self,
        _registry: &wl_registry::WlRegistry,
        _event: wl_registry::Event,
        _globals: &GlobalListContents,
        _conn: &Connection,
        _qhandle: &QueueHandle<Self>,
    ) {
    }
}

impl Dispatch<zwlr_foreign_toplevel_manager_v1::ZwlrForeignToplevelManagerV1, ()> for ToplevelTracker {
    fn event(
        state: &mut Self,
        _manager: &zwlr_foreign_toplevel_manager_v1::ZwlrForeignToplevelManagerV1,
        event: zwlr_foreign_toplevel_manager_v1::Event,
        _: &(),
        _conn: &Connection,
        _qhandle: &QueueHandle<Self>,
    ) {
        if let zwlr_foreign_toplevel_manager_v1::Event::Toplevel { toplevel } = event {
            state.toplevels.insert(toplevel.id(), Toplevel::default());
        }
    }

    event_created_child!(ToplevelTracker, zwlr_foreign_toplevel_manager_v1::ZwlrForeignToplevelManagerV1, [
        0 => (zwlr_foreign_toplevel_handle_v1::ZwlrForeignToplevelHandleV1, ())
    ]);
}

impl Dispatch<zwlr_foreign_toplevel_handle_v1::ZwlrForeignToplevelHandleV1, ()> for ToplevelTracker {
    fn event(
        state: &mut Self,
        handle: &zwlr_foreign_toplevel_handle_v1::ZwlrForeignToplevelHandleV1,
        event: zwlr_foreign_toplevel_handle_v1::Event,
        _: &(),
        _conn: &Connection,
        _qhandle: &QueueHandle<Self>,
    ) {
        let id = handle.id();
        match event {
            zwlr_foreign_toplevel_handle_v1::Event::Title { title } => {
                if let Some(t) = state.toplevels.get_mut(&id) {
                    t.title = (!title.is_empty()).then_some(title);
                    state.touch(&id);
                }
            }
            zwlr_foreign_toplevel_handle_v1::Event::AppId { app_id } => {
                if let Some(t) = state.toplevels.get_mut(&id) {
                    t.app_id = app_id;
                    state.touch(&id);
                }
            }
            zwlr_foreign_toplevel_handle_v1::Event::State { state: raw } => {
                if !state.toplevels.contains_key(&id) {
                    return;
                }
                if raw.contains(&ACTIVATED_STATE) {
                    state.active = Some(id);
                    state.publish();
                } else if state.active.as_ref() == Some(&id) {
                    state.active = None;
                    state.publish();
                }
            }
            zwlr_foreign_toplevel_handle_v1::Event::Closed => {
                state.toplevels.remove(&id);
                if state.active.as_ref() == Some(&id) {
                    state.active = None;
                    state.publish();
                }
                handle.destroy();
            }
            _ => {}
        }
    }
}

/// Window source for wlroots-based compositors
pub struct WaylandWindowSource {
    focused: Arc<Mutex<Option<WindowInfo>>>,
    connected: Arc<AtomicBool>,
}

fn wayland_display_suffix(name: &str) -> Option<u32> {
    let suffix = name.strip_prefix("wayland-")?;
    if suffix.is_empty() || !suffix.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    suffix.parse().ok()
}

/// Candidate socket names, `WAYLAND_DISPLAY` first, then the runtime dir
/// sockets newest first.
fn candidate_displays() -> Vec<String> {
    let mut candidates = Vec::new();
    if let Ok(display) = std::env::var("WAYLAND_DISPLAY") {
        if !display.trim().is_empty() {
            candidates.push(display);
        }
    }

    let runtime_dir = match std::env::var("XDG_RUNTIME_DIR") {
        Ok(v) if !v.trim().is_empty() => v,
        _ => return candidates,
    };
    let mut found: Vec<(u32, String)> = Vec::new();
    if let Ok(entries) = fs::read_dir(runtime_dir) {
        for entry in entries.flatten() {
            if let Some(name) = entry.file_name().to_str() {
                if let Some(order) = wayland_display_suffix(name) {
                    found.push((order, name.to_string()));
                }
            }
        }
    }
    found.sort_by(|a, b| b.0.cmp(&a.0));
    for (_, name) in found {
        if !candidates.contains(&name) {
            candidates.push(name);
        }
    }
    candidates
}

impl WaylandWindowSource {
    /// Connect and start the dispatch thread.
    pub fn connect() -> Result<Self, WindowError> {
        let candidates = candidate_displays();
        if candidates.is_empty() {
            return Err(WindowError::NoDisplay);
        }

        let mut connection = None;
        let mut last_error = String::new();
        for display in candidates {
            std::env::set_var("WAYLAND_DISPLAY", &display);
            match Connection::connect_to_env() {
                Ok(conn) => {
                    log::debug!("Connected to Wayland display {}", display);
                    connection = Some(conn);
                    break;
                }
                Err(e) => last_error = e.to_string(),
            }
        }
        let connection = connection.ok_or(WindowError::ConnectionFailed(last_error))?;

        let (globals, mut queue) = registry_queue_init::<ToplevelTracker>(&connection)
            .map_err(|e| WindowError::ConnectionFailed(e.to_string()))?;
        let qhandle = queue.handle();
        globals
            .bind::<zwlr_foreign_toplevel_manager_v1::ZwlrForeignToplevelManagerV1, _, _>(&qhandle, 1..=3, ())
            .map_err(|_| WindowError::MissingGlobal("zwlr_foreign_toplevel_manager_v1"))?;

        let focused = Arc::new(Mutex::new(None));
        let connected = Arc::new(AtomicBool::new(true));
        let mut tracker = ToplevelTracker {
            toplevels: HashMap::new(),
            active: None,
            focused: focused.clone(),
        };

        let alive = connected.clone();
        thread::Builder::new()
            .name("pouirup-wayland".to_string())
            .spawn(move || {
                let _ = queue.roundtrip(&mut tracker);
                while queue.blocking_dispatch(&mut tracker).is_ok() {}
                log::warn!("Wayland connection lost, window tracking stopped");
                alive.store(false, Ordering::SeqCst);
            })
            .map_err(|e| WindowError::ConnectionFailed(e.to_string()))?;

        Ok(Self { focused, connected })
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

impl WindowSource for WaylandWindowSource {
    fn active_window(&mut self) -> Option<WindowInfo> {
        if !self.is_connected() {
            return None;
        }
        self.focused.lock().clone()
    }
}
