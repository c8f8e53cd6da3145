// pouirup Remap Layer
// Layered key remapping with dual-role and sticky modifiers

pub mod combo;
pub mod engine;
pub mod layout;
pub mod state;
pub mod sticky;

pub use combo::{plan_combo, press_combo, tap_combo, Combo, ComboPlan, Stroke};
pub use engine::{EngineError, KeyRemapper, RemapConfig, RemapTimings};
pub use layout::{CharMapping, LayerAction, LayerEntry, Layout};
pub use state::{HeldOutput, KeyboardState, PressedKeyRecord};
pub use sticky::{DeferredScheduler, DeferredTask, ManualScheduler, ThreadScheduler};
