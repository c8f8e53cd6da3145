// pouirup Config - Combo String Parser
// Parses combo strings like "Ctrl-Shift-A" into structured components

use crate::remap::{CharMapping, Combo};
use crate::{ModifierId, ModifierSet};

/// Errors that can occur during combo parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComboParseError {
    #[error("combo string cannot be empty")]
    EmptyInput,

    #[error("unknown key name: '{0}'")]
    UnknownKey(String),

    #[error("unknown modifier: '{0}'")]
    UnknownModifier(String),

    #[error("combo string cannot end with hyphen")]
    TrailingHyphen,

    #[error("character output '{0}' may only carry a Shift- prefix")]
    NotACharacter(String),
}

/// Parse a combo string like "Ctrl-Shift-A" into modifiers and key.
///
/// The last hyphen-separated part is the key, everything before it a
/// modifier alias. Repeated modifiers collapse.
///
/// ```
/// use pouirup_core::config::parse_combo;
/// use pouirup_core::{Key, ModifierId};
/// let combo = parse_combo("Ctrl-A").unwrap();
/// assert!(combo.modifiers.contains(ModifierId::Ctrl));
/// assert_eq!(combo.key, Key::A);
/// ```
pub fn parse_combo(exp: &str) -> Result<Combo, ComboParseError> {
    let trimmed = exp.trim();
    if trimmed.is_empty() {
        return Err(ComboParseError::EmptyInput);
    }
    if trimmed.ends_with('-') {
        return Err(ComboParseError::TrailingHyphen);
    }

    let mut parts: Vec<&str> = trimmed.split('-').collect();
    let key_str = parts.pop().ok_or(ComboParseError::EmptyInput)?;
    let key = crate::key::key_from_name(key_str)
        .ok_or_else(|| ComboParseError::UnknownKey(key_str.trim().to_string()))?;

    let mut modifiers = ModifierSet::new();
    for modifier_str in parts {
        let modifier = ModifierId::from_alias(modifier_str)
            .ok_or_else(|| ComboParseError::UnknownModifier(modifier_str.trim().to_string()))?;
        modifiers.insert(modifier);
    }

    Ok(Combo::new(modifiers, key))
}

/// Parse a character-table output such as "A" or "Shift-1"
pub fn parse_char_output(exp: &str) -> Result<CharMapping, ComboParseError> {
    let combo = parse_combo(exp)?;
    let needs_shift = combo.modifiers.contains(ModifierId::Shift);
    if !combo.modifiers.without(ModifierId::Shift).is_empty() {
        return Err(ComboParseError::NotACharacter(exp.trim().to_string()));
    }
    Ok(CharMapping::new(combo.key, needs_shift))
}
