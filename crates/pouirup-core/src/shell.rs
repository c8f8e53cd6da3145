// pouirup Engine Shell
// Routes hook events to the gesture adapters, the remapper and the tracer

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use crate::config::{Config, GestureBindings};
use crate::gesture::{
    Gesture, GestureRecognizer, GestureSession, PointerGestureAdapter, PointerRelease,
    TrackpadGestureAdapter,
};
use crate::input::{Button, HookEvent, HookHandler};
use crate::output::SharedOutput;
use crate::remap::{self, DeferredScheduler, EngineError, KeyRemapper};
use crate::trace::{modifier_names, EventTracer, TraceError};
use crate::{Key, ModifierSet};

/// The engine: one owner for all per-instance state.
///
/// Key events go to the remapper, which re-synthesizes everything it
/// handles, so they are suppressed while it runs. Button, motion and
/// finger events feed the gesture adapters; only pointer gesture presses
/// and releases are suppressed.
pub struct Engine {
    recognizer: GestureRecognizer,
    session: GestureSession,
    pointer: PointerGestureAdapter,
    trackpad: TrackpadGestureAdapter,
    remapper: Option<KeyRemapper>,
    output: SharedOutput,
    bindings: GestureBindings,
    tracer: Option<EventTracer>,
    held_keys: HashSet<Key>,
    /// Keys whose press the remapper consumed; their releases stay hidden
    /// even after the quit key stopped it
    consumed_keys: HashSet<Key>,
    held_buttons: HashSet<Button>,
}

impl Engine {
    pub fn new(config: &Config, output: SharedOutput, scheduler: Arc<dyn DeferredScheduler>) -> Self {
        let remapper = config.remap_enabled.then(|| {
            KeyRemapper::new(
                Arc::clone(&config.layout),
                config.remap,
                Arc::clone(&output),
                scheduler,
            )
        });
        log::info!(
            "Engine started (remap: {}, pointer gestures: {}, trackpad gestures: {})",
            remapper.is_some(),
            config.pointer.enabled,
            config.trackpad.enabled
        );
        Self {
            recognizer: GestureRecognizer::new(config.recognizer),
            session: GestureSession::new(),
            pointer: PointerGestureAdapter::new(config.pointer),
            trackpad: TrackpadGestureAdapter::new(config.trackpad),
            remapper,
            output,
            bindings: config.bindings.clone(),
            tracer: None,
            held_keys: HashSet::new(),
            consumed_keys: HashSet::new(),
            held_buttons: HashSet::new(),
        }
    }

    pub fn with_tracer(mut self, tracer: EventTracer) -> Self {
        self.tracer = Some(tracer);
        self
    }

    pub fn remapper(&self) -> Option<&KeyRemapper> {
        self.remapper.as_ref()
    }

    pub fn session(&self) -> &GestureSession {
        &self.session
    }

    /// False once the remapper saw the quit key
    pub fn is_running(&self) -> bool {
        self.remapper.as_ref().map_or(true, KeyRemapper::is_running)
    }

    /// Handle one hook event, returning whether it is suppressed.
    pub fn handle(&mut self, event: HookEvent, now: Instant) -> Result<bool, EngineError> {
        match event {
            HookEvent::KeyPress { key, native_repeat } => self.key_press(key, native_repeat, now),
            HookEvent::KeyRelease { key } => {
                self.held_keys.remove(&key);
                let consumed = self.consumed_keys.remove(&key);
                match self.running_remapper() {
                    Some(remapper) => {
                        remapper.release(key, now)?;
                        Ok(true)
                    }
                    None => Ok(consumed),
                }
            }
            HookEvent::ButtonPress {
                button,
                click_level,
                position,
            } => {
                let started = self.pointer.button_press(
                    &self.recognizer,
                    &mut self.session,
                    button,
                    click_level,
                    position,
                    now,
                );
                let first = self.held_buttons.insert(button);
                if first && !started {
                    let modifiers = self.held_modifier_names();
                    self.trace(|t| t.button_press(modifiers, button, click_level));
                }
                Ok(started)
            }
            HookEvent::ButtonRelease { button, click_level } => {
                self.held_buttons.remove(&button);
                match self
                    .pointer
                    .button_release(&self.recognizer, &mut self.session, button, click_level)
                {
                    PointerRelease::Passthrough => Ok(false),
                    PointerRelease::Gesture(gesture) => {
                        self.run_gesture(&gesture)?;
                        Ok(true)
                    }
                    PointerRelease::Click(button) => {
                        log::debug!("No gesture, replaying {} click", button.name());
                        self.output.lock().button_click(button)?;
                        Ok(true)
                    }
                }
            }
            HookEvent::CursorMove { position } => {
                self.pointer
                    .cursor_move(&self.recognizer, &mut self.session, position, now);
                Ok(false)
            }
            HookEvent::WheelScroll { delta, momentum, .. } => {
                let modifiers = self.held_modifier_names();
                self.trace(|t| t.wheel_scroll(modifiers, delta, momentum, now));
                Ok(false)
            }
            HookEvent::FingerPositions(fingers) => {
                let completed =
                    self.trackpad
                        .fingers_update(&self.recognizer, &mut self.session, fingers, now);
                if let Some(gesture) = completed {
                    self.trace(|t| t.gesture(&gesture));
                    self.run_gesture(&gesture)?;
                }
                Ok(false)
            }
        }
    }

    /// Drop everything held, for deactivation and shutdown.
    pub fn reset(&mut self) -> Result<(), EngineError> {
        self.held_keys.clear();
        self.consumed_keys.clear();
        self.held_buttons.clear();
        if let Some(remapper) = &self.remapper {
            remapper.release_all()?;
        }
        Ok(())
    }

    fn key_press(&mut self, key: Key, native_repeat: bool, now: Instant) -> Result<bool, EngineError> {
        let first = self.held_keys.insert(key);
        if first && !key.is_modifier() {
            let modifiers = self.held_modifier_names();
            self.trace(|t| t.key_press(modifiers, key));
        }
        match self.running_remapper() {
            Some(remapper) => {
                remapper.press(key, native_repeat, now)?;
                self.consumed_keys.insert(key);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn running_remapper(&self) -> Option<&KeyRemapper> {
        self.remapper.as_ref().filter(|r| r.is_running())
    }

    fn held_modifier_names(&self) -> Vec<String> {
        modifier_names(self.held_keys.iter().copied())
    }

    fn run_gesture(&mut self, gesture: &Gesture) -> Result<(), EngineError> {
        let Some(combo) = self.bindings.get(gesture) else {
            log::debug!("Gesture {} is not bound", gesture);
            return Ok(());
        };
        log::info!("Gesture {} -> {}", gesture, combo);
        match self.running_remapper() {
            Some(remapper) => remapper.tap_combo(combo),
            None => {
                let mut out = self.output.lock();
                remap::tap_combo(&mut *out, combo, ModifierSet::new())?;
                Ok(())
            }
        }
    }

    /// Trace failures are logged and end tracing; they never stop input.
    fn trace<F>(&mut self, write: F)
    where
        F: FnOnce(&mut EventTracer) -> Result<(), TraceError>,
    {
        if let Some(tracer) = self.tracer.as_mut() {
            if let Err(e) = write(tracer) {
                log::error!("Disabling event trace: {}", e);
                self.tracer = None;
            }
        }
    }
}

impl HookHandler for Engine {
    fn handle(&mut self, event: HookEvent, now: Instant) -> Result<bool, EngineError> {
        Engine::handle(self, event, now)
    }
}
