//! Window context module
//!
//! Reports the focused window for the event trace. The Wayland source talks
//! wlr-foreign-toplevel; everything else falls back to the null source.

mod provider;
mod wayland;

pub use provider::{NullWindowSource, StaticWindowSource, WindowError, WindowInfo, WindowSource};
pub use wayland::WaylandWindowSource;

/// Connect to the best available window source.
///
/// Falls back to [`NullWindowSource`] when no compositor accepts us.
pub fn detect_window_source() -> Box<dyn WindowSource> {
    match WaylandWindowSource::connect() {
        Ok(source) => {
            log::info!("Window tracking via wlr-foreign-toplevel");
            Box::new(source)
        }
        Err(e) => {
            log::warn!("Window tracking unavailable: {}", e);
            Box::new(NullWindowSource)
        }
    }
}
