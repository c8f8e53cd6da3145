// pouirup Combo Emission
// Modifier arithmetic for synthesizing a key with a set of modifiers

use std::fmt;

use smallvec::SmallVec;

use crate::output::{OutputError, OutputSink};
use crate::{Key, ModifierId, ModifierSet};

/// A key chord: modifiers held around one key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Combo {
    pub modifiers: ModifierSet,
    pub key: Key,
}

impl Combo {
    pub fn new(modifiers: ModifierSet, key: Key) -> Self {
        Self { modifiers, key }
    }
}

impl fmt::Display for Combo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for modifier in self.modifiers.iter() {
            write!(f, "{}-", modifier)?;
        }
        write!(f, "{}", self.key)
    }
}

/// How the main key of a combo is sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stroke {
    Press,
    Repeat,
}

/// Modifier keys to change around a combo.
///
/// `lift` holds modifiers the host has down that the combo must not see;
/// `engage` holds modifiers the combo needs that are not down yet. Virtual
/// modifiers never appear in either list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComboPlan {
    pub lift: SmallVec<[Key; 4]>,
    pub engage: SmallVec<[Key; 4]>,
}

impl ComboPlan {
    pub fn is_empty(&self) -> bool {
        self.lift.is_empty() && self.engage.is_empty()
    }
}

/// Work out which modifiers to lift and engage to send `wanted` while `held`
/// is down.
pub fn plan_combo(wanted: ModifierSet, held: ModifierSet) -> ComboPlan {
    let mut plan = ComboPlan::default();
    let real = |m: ModifierId| m.key();

    // Lift rightmost first, matching the restore order in reverse
    let mut lift: SmallVec<[Key; 4]> = held
        .iter()
        .filter(|m| !wanted.contains(*m))
        .filter_map(real)
        .collect();
    lift.reverse();
    plan.lift = lift;

    plan.engage = wanted
        .iter()
        .filter(|m| !held.contains(*m))
        .filter_map(real)
        .collect();
    plan
}

/// Send the combo's key down with exactly its modifiers, then put the
/// host's modifiers back as they were. The main key stays pressed.
pub fn press_combo(
    output: &mut dyn OutputSink,
    combo: &Combo,
    held: ModifierSet,
    stroke: Stroke,
) -> Result<(), OutputError> {
    let plan = plan_combo(combo.modifiers, held);
    for key in &plan.lift {
        output.key_release(*key)?;
    }
    for key in &plan.engage {
        output.key_press(*key)?;
    }
    match stroke {
        Stroke::Press => output.key_press(combo.key)?,
        Stroke::Repeat => output.key_repeat(combo.key)?,
    }
    for key in plan.engage.iter().rev() {
        output.key_release(*key)?;
    }
    for key in plan.lift.iter().rev() {
        output.key_press(*key)?;
    }
    Ok(())
}

/// Press and release the combo's key
pub fn tap_combo(output: &mut dyn OutputSink, combo: &Combo, held: ModifierSet) -> Result<(), OutputError> {
    press_combo(output, combo, held, Stroke::Press)?;
    output.key_release(combo.key)
}
