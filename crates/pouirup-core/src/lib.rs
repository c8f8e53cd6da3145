// pouirup Core Library
// Gesture recognition and layered key remapping over an input hook

pub mod action;
pub mod config;
pub mod geometry;
pub mod gesture;
pub mod input;
pub mod instance;
pub mod key;
pub mod modifier;
pub mod output;
pub mod remap;
pub mod shell;
pub mod trace;
pub mod window;

pub use action::Action;
pub use config::{Config, ConfigError};
pub use geometry::{Displacement, Position, Vector2};
pub use gesture::{Gesture, GestureMovement, GestureRecognizer, GestureSession, GestureSource};
pub use input::{Button, HookEvent, HookHandler};
pub use key::Key;
pub use modifier::{ModifierId, ModifierSet};
pub use output::{OutputError, OutputSink, SharedOutput};
pub use remap::{EngineError, KeyRemapper};
pub use shell::Engine;
pub use trace::{EventTracer, TraceError};
