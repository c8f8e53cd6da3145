// pouirup Keyboard State
// Pressed keys, held modifiers and sticky bookkeeping

use std::collections::HashMap;
use std::time::Instant;

use strum::IntoEnumIterator;

use crate::{Key, ModifierId, ModifierSet};

/// What a pressed physical key is holding down on the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeldOutput {
    Key(Key),
    Modifier(ModifierId),
    /// The action had no lasting output
    Nothing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PressedKeyRecord {
    pub press_time: Instant,
    pub output: HeldOutput,
    /// Key emitted instead when the press turns out to be a short tap
    pub tap: Option<Key>,
    pub sticky: bool,
}

impl PressedKeyRecord {
    pub fn plain(press_time: Instant, output: HeldOutput) -> Self {
        Self {
            press_time,
            output,
            tap: None,
            sticky: false,
        }
    }
}

const MODIFIER_COUNT: usize = 7;

#[derive(Debug, Clone, Default)]
pub struct KeyboardState {
    pub(crate) pressed_modifiers: ModifierSet,
    pub(crate) shift_lock: bool,
    pub(crate) pressed_keys: HashMap<Key, PressedKeyRecord>,
    pub(crate) last_press: Option<(Instant, Key)>,
    /// Physical keys holding each modifier (two Fn keys can hold Function)
    pub(crate) held_counts: [u32; MODIFIER_COUNT],
    pub(crate) stickies_latched: bool,
    pub(crate) last_dual_role_key: Option<Key>,
}

impl KeyboardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pressed_modifiers(&self) -> ModifierSet {
        self.pressed_modifiers
    }

    pub fn shift_lock(&self) -> bool {
        self.shift_lock
    }

    pub fn pressed_key(&self, key: Key) -> Option<&PressedKeyRecord> {
        self.pressed_keys.get(&key)
    }

    pub fn pressed_key_count(&self) -> usize {
        self.pressed_keys.len()
    }

    pub fn last_press_key(&self) -> Option<Key> {
        self.last_press.map(|(_, key)| key)
    }

    pub fn held_count(&self, modifier: ModifierId) -> u32 {
        self.held_counts[modifier as usize]
    }

    pub fn total_held(&self) -> u32 {
        self.held_counts.iter().sum()
    }

    pub fn stickies_latched(&self) -> bool {
        self.stickies_latched
    }

    pub fn last_dual_role_key(&self) -> Option<Key> {
        self.last_dual_role_key
    }

    pub(crate) fn hold(&mut self, modifier: ModifierId) {
        self.pressed_modifiers.insert(modifier);
        self.held_counts[modifier as usize] += 1;
    }

    pub(crate) fn unhold(&mut self, modifier: ModifierId) {
        let count = &mut self.held_counts[modifier as usize];
        *count = count.saturating_sub(1);
    }

    /// Forget every held modifier and the latch
    pub(crate) fn clear_modifiers(&mut self) {
        self.pressed_modifiers.clear();
        self.held_counts = [0; MODIFIER_COUNT];
        self.stickies_latched = false;
    }

    /// Modifiers with a non-zero hold count, in declaration order
    pub fn held_modifiers(&self) -> impl Iterator<Item = ModifierId> + '_ {
        ModifierId::iter().filter(move |m| self.held_count(*m) > 0)
    }
}
