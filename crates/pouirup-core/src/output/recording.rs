// pouirup Recording Output
// In-memory sink that records synthesized events in order

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::{OutputError, OutputSink};
use crate::input::Button;
use crate::Key;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputEvent {
    KeyPress(Key),
    KeyRelease(Key),
    KeyRepeat(Key),
    ButtonPress(Button),
    ButtonRelease(Button),
    KeyPhysical { key: Key, pressed: bool },
}

/// Records every synthesized event. Clones share the same log, so a test
/// can keep one handle while the engine owns another.
#[derive(Debug, Clone, Default)]
pub struct RecordingOutput {
    events: Arc<Mutex<Vec<OutputEvent>>>,
    refuse: Arc<AtomicBool>,
}

impl RecordingOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<OutputEvent> {
        self.events.lock().clone()
    }

    /// Return and clear the recorded events
    pub fn take(&self) -> Vec<OutputEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Make every further write fail, as a host denying synthesis would
    pub fn set_refusing(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    fn record(&self, event: OutputEvent) -> Result<(), OutputError> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(OutputError::Write(format!("refused {:?}", event)));
        }
        self.events.lock().push(event);
        Ok(())
    }
}

impl OutputSink for RecordingOutput {
    fn key_press(&mut self, key: Key) -> Result<(), OutputError> {
        self.record(OutputEvent::KeyPress(key))
    }

    fn key_release(&mut self, key: Key) -> Result<(), OutputError> {
        self.record(OutputEvent::KeyRelease(key))
    }

    fn key_repeat(&mut self, key: Key) -> Result<(), OutputError> {
        self.record(OutputEvent::KeyRepeat(key))
    }

    fn button_press(&mut self, button: Button) -> Result<(), OutputError> {
        self.record(OutputEvent::ButtonPress(button))
    }

    fn button_release(&mut self, button: Button) -> Result<(), OutputError> {
        self.record(OutputEvent::ButtonRelease(button))
    }

    fn set_key_physical_state(&mut self, key: Key, pressed: bool) -> Result<(), OutputError> {
        self.record(OutputEvent::KeyPhysical { key, pressed })
    }
}
