// pouirup Layout Tables
// Immutable character and layer tables consulted by the remap engine

use std::collections::{HashMap, HashSet};

use super::combo::Combo;
use crate::{Key, ModifierId};

/// Output of a character key for one shift state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharMapping {
    pub output: Key,
    /// Send the output with a synthetic Shift
    pub needs_shift: bool,
}

impl CharMapping {
    pub fn new(output: Key, needs_shift: bool) -> Self {
        Self { output, needs_shift }
    }
}

/// What a layer key does when pressed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerAction {
    /// Hold `modifier` while the key is down. With `tap`, a short
    /// uninterrupted press emits that key instead; with `sticky`, a medium
    /// press latches the modifier.
    Modifier {
        modifier: ModifierId,
        tap: Option<Key>,
        sticky: bool,
    },
    /// Hold another key while this one is down
    Key(Key),
    /// Press the combo; its key is released with the physical key
    Combo(Combo),
    /// Tap each combo in order
    Sequence(Vec<Combo>),
    ToggleShiftLock,
    /// Swallow the key
    Nothing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerEntry {
    /// Whether repeated presses (native or not) run the action again
    pub can_repeat: bool,
    /// Whether pressing this key ends latched sticky modifiers
    pub release_stickies: bool,
    pub action: LayerAction,
}

impl LayerEntry {
    pub fn new(can_repeat: bool, release_stickies: bool, action: LayerAction) -> Self {
        Self {
            can_repeat,
            release_stickies,
            action,
        }
    }

    /// Dual-role modifier entry: never repeats, leaves stickies alone
    pub fn modifier(modifier: ModifierId, tap: Option<Key>, sticky: bool) -> Self {
        Self::new(false, false, LayerAction::Modifier { modifier, tap, sticky })
    }
}

/// All layout tables. Built once at startup and shared read-only.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    /// Indexed by effective shift state
    normal: [HashMap<Key, CharMapping>; 2],
    shift_locked: HashSet<Key>,
    execution: HashMap<Key, LayerEntry>,
    function: HashMap<Key, LayerEntry>,
}

impl Layout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_char(&mut self, shifted: bool, key: Key, mapping: CharMapping) {
        self.normal[shifted as usize].insert(key, mapping);
    }

    pub fn insert_shift_locked(&mut self, key: Key) {
        self.shift_locked.insert(key);
    }

    pub fn insert_execution(&mut self, key: Key, entry: LayerEntry) {
        self.execution.insert(key, entry);
    }

    pub fn insert_function(&mut self, key: Key, entry: LayerEntry) {
        self.function.insert(key, entry);
    }

    /// Whether `key` is a character key of the unshifted table
    pub fn is_char(&self, key: Key) -> bool {
        self.normal[0].contains_key(&key)
    }

    pub fn char_mapping(&self, shifted: bool, key: Key) -> Option<&CharMapping> {
        self.normal[shifted as usize].get(&key)
    }

    pub fn is_shift_locked(&self, key: Key) -> bool {
        self.shift_locked.contains(&key)
    }

    pub fn execution(&self, key: Key) -> Option<&LayerEntry> {
        self.execution.get(&key)
    }

    pub fn function(&self, key: Key) -> Option<&LayerEntry> {
        self.function.get(&key)
    }

    /// Unshifted character keys with no shifted counterpart, sorted
    pub fn missing_shifted(&self) -> Vec<Key> {
        let mut missing: Vec<Key> = self.normal[0]
            .keys()
            .filter(|key| !self.normal[1].contains_key(key))
            .copied()
            .collect();
        missing.sort();
        missing
    }

    pub fn char_count(&self) -> usize {
        self.normal[0].len()
    }

    pub fn layer_counts(&self) -> (usize, usize) {
        (self.execution.len(), self.function.len())
    }
}
