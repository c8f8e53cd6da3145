// pouirup Modifier System
// Real host modifiers (Shift, Ctrl, Alt, Meta) plus virtual layer modifiers

use std::fmt;
use std::str::FromStr;

use strum::IntoEnumIterator;
use strum_macros::{EnumIter, EnumString, IntoStaticStr};

use crate::Key;

/// Identifier of a modifier the remap engine can hold.
///
/// `Function`, `Special` and `Toggle` are virtual: they select layout layers
/// inside the engine and are never synthesized to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, EnumString, IntoStaticStr)]
#[strum(ascii_case_insensitive)]
pub enum ModifierId {
    #[strum(to_string = "Shift")]
    Shift,
    #[strum(to_string = "Ctrl", serialize = "Control", serialize = "C")]
    Ctrl,
    #[strum(to_string = "Alt", serialize = "Opt", serialize = "Option", serialize = "A")]
    Alt,
    #[strum(to_string = "Meta", serialize = "Cmd", serialize = "Super", serialize = "Win")]
    Meta,
    #[strum(to_string = "Fn", serialize = "Function")]
    Function,
    #[strum(to_string = "Special", serialize = "Spec")]
    Special,
    #[strum(to_string = "Toggle", serialize = "Tog")]
    Toggle,
}

impl ModifierId {
    /// Key synthesized for this modifier, `None` for virtual modifiers
    pub fn key(self) -> Option<Key> {
        match self {
            ModifierId::Shift => Some(Key::LEFT_SHIFT),
            ModifierId::Ctrl => Some(Key::LEFT_CTRL),
            ModifierId::Alt => Some(Key::LEFT_ALT),
            ModifierId::Meta => Some(Key::LEFT_META),
            ModifierId::Function | ModifierId::Special | ModifierId::Toggle => None,
        }
    }

    pub fn is_virtual(self) -> bool {
        self.key().is_none()
    }

    /// Modifier a physical key stands for (either side)
    pub fn from_key(key: Key) -> Option<ModifierId> {
        match key {
            Key::LEFT_SHIFT | Key::RIGHT_SHIFT => Some(ModifierId::Shift),
            Key::LEFT_CTRL | Key::RIGHT_CTRL => Some(ModifierId::Ctrl),
            Key::LEFT_ALT | Key::RIGHT_ALT => Some(ModifierId::Alt),
            Key::LEFT_META | Key::RIGHT_META => Some(ModifierId::Meta),
            Key(0x1d0) => Some(ModifierId::Function),
            _ => None,
        }
    }

    /// Whether a physical key is a modifier key
    pub fn is_modifier_key(key: Key) -> bool {
        Self::from_key(key).is_some()
    }

    /// Parse a modifier alias, e.g. `"Ctrl"`, `"cmd"`, `"Fn"`
    pub fn from_alias(alias: &str) -> Option<ModifierId> {
        ModifierId::from_str(alias.trim()).ok()
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for ModifierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name: &'static str = (*self).into();
        write!(f, "{}", name)
    }
}

/// Set of modifiers, iterated in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ModifierSet(u8);

impl ModifierSet {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn insert(&mut self, modifier: ModifierId) {
        self.0 |= modifier.bit();
    }

    pub fn remove(&mut self, modifier: ModifierId) {
        self.0 &= !modifier.bit();
    }

    pub fn contains(&self, modifier: ModifierId) -> bool {
        self.0 & modifier.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Copy of this set without `modifier`
    pub fn without(mut self, modifier: ModifierId) -> Self {
        self.remove(modifier);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = ModifierId> + '_ {
        ModifierId::iter().filter(move |m| self.contains(*m))
    }
}

impl FromIterator<ModifierId> for ModifierSet {
    fn from_iter<I: IntoIterator<Item = ModifierId>>(iter: I) -> Self {
        let mut set = ModifierSet::new();
        for modifier in iter {
            set.insert(modifier);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_alias() {
        assert_eq!(ModifierId::from_alias("Ctrl"), Some(ModifierId::Ctrl));
        assert_eq!(ModifierId::from_alias("cmd"), Some(ModifierId::Meta));
        assert_eq!(ModifierId::from_alias("fn"), Some(ModifierId::Function));
        assert_eq!(ModifierId::from_alias("Hyper"), None);
    }

    #[test]
    fn test_virtual_modifiers_have_no_key() {
        assert!(ModifierId::Function.is_virtual());
        assert!(ModifierId::Special.is_virtual());
        assert!(ModifierId::Toggle.is_virtual());
        assert_eq!(ModifierId::Shift.key(), Some(Key::LEFT_SHIFT));
    }

    #[test]
    fn test_from_key_covers_both_sides() {
        assert_eq!(ModifierId::from_key(Key::RIGHT_ALT), Some(ModifierId::Alt));
        assert_eq!(ModifierId::from_key(Key::LEFT_META), Some(ModifierId::Meta));
        assert_eq!(ModifierId::from_key(Key::A), None);
    }

    #[test]
    fn test_modifier_set_ops() {
        let mut set = ModifierSet::new();
        assert!(set.is_empty());
        set.insert(ModifierId::Shift);
        set.insert(ModifierId::Function);
        set.insert(ModifierId::Shift);
        assert_eq!(set.len(), 2);
        assert!(set.without(ModifierId::Shift).contains(ModifierId::Function));
        assert!(!set.without(ModifierId::Function).without(ModifierId::Shift).contains(ModifierId::Shift));
        let order: Vec<_> = set.iter().collect();
        assert_eq!(order, vec![ModifierId::Shift, ModifierId::Function]);
        set.clear();
        assert!(set.is_empty());
    }
}
