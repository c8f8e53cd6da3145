// pouirup Output Layer
// Synthesized key and button events towards the host

mod recording;

#[cfg(feature = "pure-rust")]
mod uinput;

use std::sync::Arc;

use parking_lot::Mutex;

use crate::input::Button;
use crate::Key;

pub use recording::{OutputEvent, RecordingOutput};

#[cfg(feature = "pure-rust")]
pub use uinput::VirtualDevice;

/// Errors raised when the host refuses synthesized input
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OutputError {
    #[error("Failed to create virtual device: {0}")]
    DeviceCreation(String),

    #[error("Failed to write event: {0}")]
    Write(String),
}

/// Sink for synthesized input.
///
/// Calls must reach the host in the order they are made; the host
/// accumulates modifier state incrementally.
pub trait OutputSink: Send {
    fn key_press(&mut self, key: Key) -> Result<(), OutputError>;

    fn key_release(&mut self, key: Key) -> Result<(), OutputError>;

    /// Auto-repeat of an already pressed key
    fn key_repeat(&mut self, key: Key) -> Result<(), OutputError>;

    fn button_press(&mut self, button: Button) -> Result<(), OutputError>;

    fn button_release(&mut self, button: Button) -> Result<(), OutputError>;

    /// Low-level key state change used to flush host modifier state
    fn set_key_physical_state(&mut self, key: Key, pressed: bool) -> Result<(), OutputError>;

    fn key_tap(&mut self, key: Key) -> Result<(), OutputError> {
        self.key_press(key)?;
        self.key_release(key)
    }

    fn button_click(&mut self, button: Button) -> Result<(), OutputError> {
        self.button_press(button)?;
        self.button_release(button)
    }
}

/// Output sink shared between the event path and the sticky timer
pub type SharedOutput = Arc<Mutex<dyn OutputSink>>;

pub fn shared_output<O: OutputSink + 'static>(output: O) -> SharedOutput {
    Arc::new(Mutex::new(output))
}
