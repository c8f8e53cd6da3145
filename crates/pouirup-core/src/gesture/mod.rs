// pouirup Gesture Layer
// Directional swipe recognition from pointer and trackpad motion

pub mod pointer;
pub mod recognizer;
pub mod trackpad;

pub use pointer::{PointerConfig, PointerGestureAdapter, PointerRelease};
pub use recognizer::{
    Gesture, GestureMovement, GestureRecognizer, GestureSession, GestureSource, RecognizerConfig,
};
pub use trackpad::{TrackpadConfig, TrackpadGestureAdapter};
