// pouirup Event Trace
// Comma-terminated JSON lines describing user input activity

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use chrono::{Local, SecondsFormat};
use serde::{Deserialize, Serialize};

use crate::geometry::Displacement;
use crate::gesture::Gesture;
use crate::input::Button;
use crate::window::{WindowInfo, WindowSource};
use crate::Key;

/// Version tag written into every line; bump on any field-shape change
pub const TRACE_PROTOCOL: &str = "v3";

/// Minimum spacing between two traced wheel scrolls
pub const WHEEL_TRACE_INTERVAL: Duration = Duration::from_millis(125);

#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    #[error("trace write failed: {0}")]
    Io(#[from] io::Error),

    #[error("trace encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// One traced occurrence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceRecord {
    KeyPress {
        modifiers: Vec<String>,
        key: String,
    },
    MouseButtonPress {
        modifiers: Vec<String>,
        button: String,
        click_level: u32,
    },
    MouseWheelScroll {
        modifiers: Vec<String>,
        dy: i8,
        dx: i8,
    },
    TrackpadGesture {
        gesture: String,
    },
    WindowChange {
        window: String,
        owner_app: String,
    },
}

#[derive(Serialize)]
struct TraceLine<'a> {
    protocol: &'static str,
    timestamp: String,
    #[serde(flatten)]
    record: &'a TraceRecord,
}

/// Sorted, deduplicated trace names of the given modifier keys
pub fn modifier_names<I: IntoIterator<Item = Key>>(keys: I) -> Vec<String> {
    let mut names: Vec<String> = keys
        .into_iter()
        .filter(|k| k.is_modifier())
        .map(Key::trace_name)
        .collect();
    names.sort();
    names.dedup();
    names
}

fn sign(value: f64) -> i8 {
    if value > 0.0 {
        1
    } else if value < 0.0 {
        -1
    } else {
        0
    }
}

/// Writes trace lines, emitting a window change ahead of any record
/// observed under a different focused window.
pub struct EventTracer {
    sink: Box<dyn Write + Send>,
    window_source: Box<dyn WindowSource>,
    last_window: Option<WindowInfo>,
    last_wheel: Option<Instant>,
}

impl EventTracer {
    pub fn new(sink: Box<dyn Write + Send>, window_source: Box<dyn WindowSource>) -> Self {
        Self {
            sink,
            window_source,
            last_window: None,
            last_wheel: None,
        }
    }

    /// Trace into `path` (appending), or stdout when no path is given
    pub fn open(path: Option<&Path>, window_source: Box<dyn WindowSource>) -> Result<Self, TraceError> {
        let sink: Box<dyn Write + Send> = match path {
            Some(path) => {
                log::info!("Tracing input events to {}", path.display());
                Box::new(OpenOptions::new().create(true).append(true).open(path)?)
            }
            None => Box::new(io::stdout()),
        };
        let mut tracer = Self::new(sink, window_source);
        tracer.start()?;
        Ok(tracer)
    }

    /// Record the window focused when tracing begins
    pub fn start(&mut self) -> Result<(), TraceError> {
        self.check_window()
    }

    pub fn key_press(&mut self, modifiers: Vec<String>, key: Key) -> Result<(), TraceError> {
        self.record(TraceRecord::KeyPress {
            modifiers,
            key: key.trace_name(),
        })
    }

    pub fn button_press(
        &mut self,
        modifiers: Vec<String>,
        button: Button,
        click_level: u32,
    ) -> Result<(), TraceError> {
        self.record(TraceRecord::MouseButtonPress {
            modifiers,
            button: button.name().to_string(),
            click_level,
        })
    }

    /// Momentum scrolls are never traced. Every other scroll restarts the
    /// throttle window, traced or not.
    pub fn wheel_scroll(
        &mut self,
        modifiers: Vec<String>,
        delta: Displacement,
        momentum: bool,
        now: Instant,
    ) -> Result<(), TraceError> {
        if momentum {
            return Ok(());
        }
        let due = self
            .last_wheel
            .map_or(true, |last| now.saturating_duration_since(last) >= WHEEL_TRACE_INTERVAL);
        self.last_wheel = Some(now);
        if !due {
            return Ok(());
        }
        self.record(TraceRecord::MouseWheelScroll {
            modifiers,
            dy: sign(delta.y),
            dx: sign(delta.x),
        })
    }

    pub fn gesture(&mut self, gesture: &Gesture) -> Result<(), TraceError> {
        self.record(TraceRecord::TrackpadGesture {
            gesture: gesture.to_string(),
        })
    }

    /// Write `record`, preceded by a window change when focus moved.
    pub fn record(&mut self, record: TraceRecord) -> Result<(), TraceError> {
        self.check_window()?;
        self.write_line(&record)
    }

    fn check_window(&mut self) -> Result<(), TraceError> {
        let current = self.window_source.active_window();
        if current == self.last_window {
            return Ok(());
        }
        self.last_window = current.clone();
        if let Some(info) = current {
            self.write_line(&TraceRecord::WindowChange {
                window: info.title_or_empty().to_string(),
                owner_app: info.owner_app_name,
            })?;
        }
        Ok(())
    }

    fn write_line(&mut self, record: &TraceRecord) -> Result<(), TraceError> {
        let line = TraceLine {
            protocol: TRACE_PROTOCOL,
            timestamp: Local::now().to_rfc3339_opts(SecondsFormat::Micros, false),
            record,
        };
        let json = serde_json::to_string(&line)?;
        writeln!(self.sink, "{},", json)?;
        self.sink.flush()?;
        Ok(())
    }
}
