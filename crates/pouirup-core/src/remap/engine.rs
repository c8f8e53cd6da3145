// pouirup Remap Engine
// Layered key dispatch with dual-role, sticky and tap handling

use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::combo::{self, Combo, Stroke};
use super::layout::{LayerAction, Layout};
use super::state::{HeldOutput, KeyboardState, PressedKeyRecord};
use super::sticky::DeferredScheduler;
use crate::output::{OutputError, OutputSink, SharedOutput};
use crate::{Key, ModifierId, ModifierSet};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Output refused: {0}")]
    Output(#[from] OutputError),

    #[error("Sticky expiry failed: {0}")]
    StickyExpiry(OutputError),
}

/// Sticky timing thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemapTimings {
    /// Presses shorter than this are taps
    pub min_sticky: Duration,
    /// Presses at least this long are plain holds
    pub max_sticky: Duration,
    /// How long a latched sticky modifier stays down
    pub sticky_duration: Duration,
}

impl Default for RemapTimings {
    fn default() -> Self {
        Self {
            min_sticky: Duration::from_millis(200),
            max_sticky: Duration::from_millis(1000),
            sticky_duration: Duration::from_millis(2000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemapConfig {
    /// Pressing this key stops the engine
    pub quit_key: Option<Key>,
    /// Neutral key pulsed before releasing latched modifiers
    pub mask_key: Key,
    pub timings: RemapTimings,
}

impl Default for RemapConfig {
    fn default() -> Self {
        Self {
            quit_key: Some(Key::F11),
            mask_key: Key::F13,
            timings: RemapTimings::default(),
        }
    }
}

struct RemapCore {
    state: KeyboardState,
    layout: Arc<Layout>,
    config: RemapConfig,
    running: bool,
    /// Failure inside a sticky timer, reported by the next event
    deferred_error: Option<OutputError>,
    output: SharedOutput,
}

/// Key remapping engine.
///
/// Cheap to clone; clones share one state. Event handlers and sticky timers
/// serialize on the same lock, taken before the output lock.
#[derive(Clone)]
pub struct KeyRemapper {
    core: Arc<Mutex<RemapCore>>,
    scheduler: Arc<dyn DeferredScheduler>,
}

impl KeyRemapper {
    pub fn new(
        layout: Arc<Layout>,
        config: RemapConfig,
        output: SharedOutput,
        scheduler: Arc<dyn DeferredScheduler>,
    ) -> Self {
        let core = RemapCore {
            state: KeyboardState::new(),
            layout,
            config,
            running: true,
            deferred_error: None,
            output,
        };
        Self {
            core: Arc::new(Mutex::new(core)),
            scheduler,
        }
    }

    pub fn is_running(&self) -> bool {
        self.core.lock().running
    }

    /// Copy of the current keyboard state
    pub fn state(&self) -> KeyboardState {
        self.core.lock().state.clone()
    }

    pub fn pressed_modifiers(&self) -> ModifierSet {
        self.core.lock().state.pressed_modifiers
    }

    /// Handle a physical key press
    pub fn press(&self, key: Key, native_repeat: bool, now: Instant) -> Result<(), EngineError> {
        let mut core = self.core.lock();
        core.take_deferred_error()?;
        core.press(key, native_repeat, now)?;
        Ok(())
    }

    /// Handle a physical key release
    pub fn release(&self, key: Key, now: Instant) -> Result<(), EngineError> {
        let mut core = self.core.lock();
        core.take_deferred_error()?;
        if let Some(latched) = core.release(key, now)? {
            let delay = core.config.timings.sticky_duration;
            self.schedule_expiry(latched, delay);
        }
        Ok(())
    }

    /// Tap a combo on behalf of another component (gesture bindings)
    pub fn tap_combo(&self, combo: &Combo) -> Result<(), EngineError> {
        let mut core = self.core.lock();
        core.take_deferred_error()?;
        let held = core.state.pressed_modifiers;
        let output = Arc::clone(&core.output);
        let mut out = output.lock();
        combo::tap_combo(&mut *out, combo, held)?;
        Ok(())
    }

    /// Release everything the engine holds on the host and forget all
    /// pressed keys.
    pub fn release_all(&self) -> Result<(), EngineError> {
        let mut core = self.core.lock();
        core.release_all()?;
        Ok(())
    }

    fn schedule_expiry(&self, key: Key, delay: Duration) {
        let core: Weak<Mutex<RemapCore>> = Arc::downgrade(&self.core);
        self.scheduler.schedule(
            delay,
            Box::new(move || {
                if let Some(core) = core.upgrade() {
                    core.lock().expire_sticky(key);
                }
            }),
        );
    }
}

impl RemapCore {
    fn take_deferred_error(&mut self) -> Result<(), EngineError> {
        match self.deferred_error.take() {
            Some(e) => Err(EngineError::StickyExpiry(e)),
            None => Ok(()),
        }
    }

    fn press(&mut self, key: Key, native_repeat: bool, now: Instant) -> Result<(), OutputError> {
        if !self.running {
            return Ok(());
        }
        if self.config.quit_key == Some(key) {
            log::info!("quit key {} pressed, stopping", key);
            self.running = false;
            return Ok(());
        }

        let is_repetition =
            self.state.pressed_keys.contains_key(&key) || self.state.last_press_key() == Some(key);
        if !is_repetition {
            self.state.last_press = Some((now, key));
        }

        let layout = Arc::clone(&self.layout);
        let output = Arc::clone(&self.output);
        let mut out = output.lock();

        let entry = layout.execution(key).or_else(|| {
            if self.state.pressed_modifiers.contains(ModifierId::Function) {
                layout.function(key)
            } else {
                None
            }
        });

        let release_stickies = match entry {
            Some(entry) => {
                if is_repetition && !entry.can_repeat {
                    return Ok(());
                }
                self.run_action(key, &entry.action, native_repeat, now, &mut *out)?;
                entry.release_stickies
            }
            None => {
                let others = self.state.pressed_modifiers.without(ModifierId::Shift);
                if layout.is_char(key) && others.is_empty() {
                    self.press_char(&layout, key, native_repeat, now, &mut *out)?;
                } else {
                    self.press_passthrough(key, native_repeat, now, &mut *out)?;
                }
                true
            }
        };

        if self.state.stickies_latched && release_stickies {
            self.release_pressed_modifiers(&mut *out)?;
        }
        Ok(())
    }

    fn run_action(
        &mut self,
        key: Key,
        action: &LayerAction,
        native_repeat: bool,
        now: Instant,
        out: &mut dyn OutputSink,
    ) -> Result<(), OutputError> {
        let held = match action {
            LayerAction::Modifier { modifier, tap, sticky } => {
                return self.press_dual(key, *modifier, *tap, *sticky, now, out);
            }
            LayerAction::Key(output_key) => {
                match self.stroke_for(key, *output_key, native_repeat) {
                    Stroke::Press => out.key_press(*output_key)?,
                    Stroke::Repeat => out.key_repeat(*output_key)?,
                }
                HeldOutput::Key(*output_key)
            }
            LayerAction::Combo(combo) => {
                let stroke = self.stroke_for(key, combo.key, native_repeat);
                combo::press_combo(out, combo, self.state.pressed_modifiers, stroke)?;
                HeldOutput::Key(combo.key)
            }
            LayerAction::Sequence(combos) => {
                for combo in combos {
                    combo::tap_combo(out, combo, self.state.pressed_modifiers)?;
                }
                HeldOutput::Nothing
            }
            LayerAction::ToggleShiftLock => {
                self.state.shift_lock = !self.state.shift_lock;
                log::debug!("shift lock {}", if self.state.shift_lock { "on" } else { "off" });
                HeldOutput::Nothing
            }
            LayerAction::Nothing => HeldOutput::Nothing,
        };
        self.state
            .pressed_keys
            .insert(key, PressedKeyRecord::plain(now, held));
        Ok(())
    }

    fn press_dual(
        &mut self,
        key: Key,
        modifier: ModifierId,
        tap: Option<Key>,
        sticky: bool,
        now: Instant,
        out: &mut dyn OutputSink,
    ) -> Result<(), OutputError> {
        self.state.hold(modifier);
        if let Some(modifier_key) = modifier.key() {
            out.key_press(modifier_key)?;
        }
        self.state.pressed_keys.insert(
            key,
            PressedKeyRecord {
                press_time: now,
                output: HeldOutput::Modifier(modifier),
                tap,
                sticky,
            },
        );
        self.state.last_dual_role_key = Some(key);
        Ok(())
    }

    fn press_char(
        &mut self,
        layout: &Layout,
        key: Key,
        native_repeat: bool,
        now: Instant,
        out: &mut dyn OutputSink,
    ) -> Result<(), OutputError> {
        let shift_held = self.state.pressed_modifiers.contains(ModifierId::Shift);
        let shifted = shift_held ^ (self.state.shift_lock && layout.is_shift_locked(key));
        let Some(mapping) = layout.char_mapping(shifted, key).copied() else {
            return self.press_passthrough(key, native_repeat, now, out);
        };

        let mut wanted = ModifierSet::new();
        if mapping.needs_shift {
            wanted.insert(ModifierId::Shift);
        }
        let stroke = self.stroke_for(key, mapping.output, native_repeat);
        combo::press_combo(
            out,
            &Combo::new(wanted, mapping.output),
            self.state.pressed_modifiers,
            stroke,
        )?;
        self.state.pressed_keys.insert(
            key,
            PressedKeyRecord::plain(now, HeldOutput::Key(mapping.output)),
        );
        Ok(())
    }

    fn press_passthrough(
        &mut self,
        key: Key,
        native_repeat: bool,
        now: Instant,
        out: &mut dyn OutputSink,
    ) -> Result<(), OutputError> {
        match self.stroke_for(key, key, native_repeat) {
            Stroke::Press => out.key_press(key)?,
            Stroke::Repeat => out.key_repeat(key)?,
        }
        self.state
            .pressed_keys
            .insert(key, PressedKeyRecord::plain(now, HeldOutput::Key(key)));
        Ok(())
    }

    /// Native repeats of a key already holding `output` become auto-repeat
    fn stroke_for(&self, key: Key, output: Key, native_repeat: bool) -> Stroke {
        let holding = self
            .state
            .pressed_key(key)
            .is_some_and(|record| record.output == HeldOutput::Key(output));
        if native_repeat && holding {
            Stroke::Repeat
        } else {
            Stroke::Press
        }
    }

    /// Returns the key to schedule a sticky expiry for, if it latched.
    fn release(&mut self, key: Key, now: Instant) -> Result<Option<Key>, OutputError> {
        if !self.running {
            return Ok(None);
        }
        let Some(record) = self.state.pressed_keys.remove(&key) else {
            log::trace!("ignoring release of {} with no press", key);
            return Ok(None);
        };

        let is_continuous = self.state.last_press_key() == Some(key);
        let held_for = now.saturating_duration_since(record.press_time);
        let timings = self.config.timings;
        let in_sticky_window = timings.min_sticky <= held_for && held_for < timings.max_sticky;

        let mut latched = None;
        if record.sticky && is_continuous && (self.state.stickies_latched || in_sticky_window) {
            log::debug!("applying sticky {:?} from {}", record.output, key);
            self.state.stickies_latched = true;
            self.state.last_dual_role_key = Some(key);
            latched = Some(key);
        } else {
            let output = Arc::clone(&self.output);
            let mut out = output.lock();
            match record.output {
                HeldOutput::Modifier(modifier) => {
                    self.state.unhold(modifier);
                    if self.state.total_held() == 0 {
                        self.release_pressed_modifiers(&mut *out)?;
                    }
                }
                HeldOutput::Key(output_key) => out.key_release(output_key)?,
                HeldOutput::Nothing => {}
            }
            if let Some(tap) = record.tap {
                if is_continuous && held_for < timings.min_sticky {
                    out.key_tap(tap)?;
                }
            }
        }

        if is_continuous {
            self.state.last_press = None;
        }
        Ok(latched)
    }

    /// Full modifier reset: flush with the mask key when stickies are
    /// latched, then release every held modifier.
    fn release_pressed_modifiers(&mut self, out: &mut dyn OutputSink) -> Result<(), OutputError> {
        if self.state.pressed_modifiers.is_empty() {
            self.state.clear_modifiers();
            return Ok(());
        }
        if self.state.stickies_latched {
            log::debug!("masking with {}", self.config.mask_key);
            out.set_key_physical_state(self.config.mask_key, true)?;
            out.set_key_physical_state(self.config.mask_key, false)?;
        }
        for modifier in self.state.pressed_modifiers.iter() {
            if let Some(modifier_key) = modifier.key() {
                out.key_release(modifier_key)?;
            }
        }
        self.state.clear_modifiers();
        Ok(())
    }

    fn expire_sticky(&mut self, key: Key) {
        if self.state.last_dual_role_key != Some(key) {
            log::debug!("sticky expiry for {} superseded", key);
            return;
        }
        log::debug!("sticky {} expired", key);
        let output = Arc::clone(&self.output);
        let mut out = output.lock();
        if let Err(e) = self.release_pressed_modifiers(&mut *out) {
            log::error!("sticky expiry failed: {}", e);
            self.deferred_error = Some(e);
        }
    }

    fn release_all(&mut self) -> Result<(), OutputError> {
        let output = Arc::clone(&self.output);
        let mut out = output.lock();
        let mut records: Vec<(Key, PressedKeyRecord)> = self.state.pressed_keys.drain().collect();
        records.sort_by_key(|(key, _)| *key);
        for (_, record) in records {
            if let HeldOutput::Key(output_key) = record.output {
                out.key_release(output_key)?;
            }
        }
        // no mask pulse: nothing was typed while the stickies were latched
        self.state.stickies_latched = false;
        self.release_pressed_modifiers(&mut *out)?;
        self.state.last_press = None;
        self.state.last_dual_role_key = None;
        Ok(())
    }
}
