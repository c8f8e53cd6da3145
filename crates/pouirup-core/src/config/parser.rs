// pouirup Config Parser - TOML with Serde
// Parses and validates the data-only configuration file

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use super::combo_parser::{parse_char_output, parse_combo, ComboParseError};
use crate::gesture::{Gesture, PointerConfig, RecognizerConfig, TrackpadConfig};
use crate::remap::{Combo, LayerAction, LayerEntry, Layout, RemapConfig, RemapTimings};
use crate::{Key, ModifierId};

/// Configuration shipped with the crate, used when no file exists
const BUILTIN_CONFIG: &str = include_str!("../../config/default.toml");

/// Configuration parser errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Invalid modifier: {0}")]
    InvalidModifier(String),

    #[error("Invalid combo string '{combo}': {source}")]
    InvalidCombo {
        combo: String,
        #[source]
        source: ComboParseError,
    },

    #[error("Invalid gesture: {0}")]
    InvalidGesture(String),

    #[error("Keys missing from [keyboard.shifted]: {0}")]
    MissingShifted(String),

    #[error("Duplicate [[keyboard.{table}]] entry for {key}")]
    DuplicateEntry { table: &'static str, key: String },

    #[error("Invalid [[keyboard.{table}]] entry for {key}: {reason}")]
    InvalidEntry {
        table: &'static str,
        key: String,
        reason: String,
    },

    #[error("Value out of range: {0}")]
    OutOfRange(String),
}

/// Main configuration structure (root TOML table)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigToml {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub timing: TimingConfig,

    #[serde(default)]
    pub gesture: GestureToml,

    #[serde(default)]
    pub keyboard: KeyboardToml,

    #[serde(default)]
    pub trace: TraceToml,

    #[serde(default)]
    pub devices: DevicesConfig,
}

/// General settings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeneralConfig {
    /// Key that stops the engine; "none" disables it
    pub quit_key: Option<String>,
    /// Neutral key pulsed before releasing sticky modifiers
    pub mask_key: Option<String>,
}

/// Sticky timing (milliseconds)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimingConfig {
    pub min_sticky_ms: Option<u64>,
    pub max_sticky_ms: Option<u64>,
    pub sticky_duration_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GestureToml {
    pub pointer_enabled: Option<bool>,
    pub trackpad_enabled: Option<bool>,
    pub min_speed: Option<f64>,
    pub min_distance: Option<f64>,
    pub sample_rate_hz: Option<u32>,
    pub pixels_per_unit: Option<f64>,
    pub min_fingers: Option<usize>,
    pub min_finger_speed: Option<f64>,

    /// Direction letters (e.g. "ES") to combo string
    #[serde(default)]
    pub bindings: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyboardToml {
    pub remap: Option<bool>,

    /// Keys whose shift state flips while shift lock is on
    #[serde(default)]
    pub shift_locked: Vec<String>,

    /// Character table without Shift: physical key to output
    #[serde(default)]
    pub normal: HashMap<String, String>,

    /// Character table with Shift
    #[serde(default)]
    pub shifted: HashMap<String, String>,

    #[serde(default)]
    pub execution: Vec<LayerToml>,

    /// Entries active only while the Fn modifier is held
    #[serde(default)]
    pub function: Vec<LayerToml>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayerToml {
    pub key: String,
    pub repeat: Option<bool>,
    pub release_stickies: Option<bool>,
    pub action: ActionToml,
}

/// Layer action, tagged by `type`
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum ActionToml {
    Modifier {
        modifier: String,
        tap: Option<String>,
        #[serde(default)]
        sticky: bool,
    },
    Key {
        key: String,
    },
    Combo {
        combo: String,
    },
    Sequence {
        combos: Vec<String>,
    },
    ToggleShiftLock,
    #[serde(rename = "none")]
    Nothing,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TraceToml {
    pub enabled: Option<bool>,
    /// Trace file; standard output when absent
    pub path: Option<PathBuf>,
}

/// Device filtering configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DevicesConfig {
    /// Explicit device names/paths to use
    #[serde(default)]
    pub only: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceConfig {
    pub enabled: bool,
    pub path: Option<PathBuf>,
}

/// Completed gesture to the combo it sends
pub type GestureBindings = HashMap<Gesture, Combo>;

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub remap_enabled: bool,
    pub remap: RemapConfig,
    pub layout: Arc<Layout>,
    pub recognizer: RecognizerConfig,
    pub pointer: PointerConfig,
    pub trackpad: TrackpadConfig,
    pub bindings: GestureBindings,
    pub trace: TraceConfig,
    /// Device name/path filter (empty = autodetect)
    pub device_filter: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            remap_enabled: true,
            remap: RemapConfig::default(),
            layout: Arc::new(Layout::new()),
            recognizer: RecognizerConfig::default(),
            pointer: PointerConfig::default(),
            trackpad: TrackpadConfig::default(),
            bindings: GestureBindings::new(),
            trace: TraceConfig::default(),
            device_filter: vec![],
        }
    }
}

impl Config {
    /// Parse a TOML configuration file
    pub fn from_toml_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let toml_config: ConfigToml =
            toml::from_str(content).map_err(|e| ConfigError::TomlParse(e.to_string()))?;
        toml_config.to_config()
    }

    /// The configuration bundled with the crate
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_toml(BUILTIN_CONFIG)
    }

    /// `$XDG_CONFIG_HOME/pouirup/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("pouirup").join("config.toml"))
    }
}

impl ConfigToml {
    /// Convert parsed TOML to the validated runtime structure
    fn to_config(&self) -> Result<Config, ConfigError> {
        let mut config = Config::default();

        match self.general.quit_key.as_deref() {
            Some(name) if name.trim().eq_ignore_ascii_case("none") => config.remap.quit_key = None,
            Some(name) => config.remap.quit_key = Some(parse_key(name)?),
            None => {}
        }
        if let Some(name) = &self.general.mask_key {
            config.remap.mask_key = parse_key(name)?;
        }

        config.remap.timings = self.timing.to_timings()?;
        self.apply_gesture(&mut config)?;

        config.remap_enabled = self.keyboard.remap.unwrap_or(true);
        config.layout = Arc::new(self.keyboard.to_layout()?);

        config.trace = TraceConfig {
            enabled: self.trace.enabled.unwrap_or(false),
            path: self.trace.path.clone(),
        };
        config.device_filter = self.devices.only.clone();

        Ok(config)
    }

    fn apply_gesture(&self, config: &mut Config) -> Result<(), ConfigError> {
        let gesture = &self.gesture;

        let min_speed = gesture.min_speed.unwrap_or(config.recognizer.min_speed);
        let min_distance = gesture.min_distance.unwrap_or(config.recognizer.min_distance);
        ensure_positive("gesture.min_speed", min_speed)?;
        ensure_positive("gesture.min_distance", min_distance)?;
        config.recognizer = RecognizerConfig {
            min_speed,
            min_distance,
        };

        let sample_rate = gesture.sample_rate_hz.unwrap_or(24);
        if sample_rate == 0 {
            return Err(ConfigError::OutOfRange("gesture.sample_rate_hz must be > 0".to_string()));
        }
        let sample_interval = Duration::from_secs(1) / sample_rate;

        let pixels_per_unit = gesture.pixels_per_unit.unwrap_or(config.pointer.pixels_per_unit);
        ensure_positive("gesture.pixels_per_unit", pixels_per_unit)?;
        config.pointer = PointerConfig {
            enabled: gesture.pointer_enabled.unwrap_or(false),
            sample_interval,
            pixels_per_unit,
        };

        let min_fingers = gesture.min_fingers.unwrap_or(config.trackpad.min_fingers);
        if min_fingers == 0 {
            return Err(ConfigError::OutOfRange("gesture.min_fingers must be > 0".to_string()));
        }
        let min_finger_speed = gesture.min_finger_speed.unwrap_or(config.trackpad.min_finger_speed);
        ensure_positive("gesture.min_finger_speed", min_finger_speed)?;
        config.trackpad = TrackpadConfig {
            enabled: gesture.trackpad_enabled.unwrap_or(true),
            sample_interval,
            min_fingers,
            min_finger_speed,
        };

        for (letters, combo) in &gesture.bindings {
            let parsed: Gesture = letters.parse().map_err(ConfigError::InvalidGesture)?;
            config.bindings.insert(parsed, parse_combo_field(combo)?);
        }
        Ok(())
    }
}

impl TimingConfig {
    fn to_timings(&self) -> Result<RemapTimings, ConfigError> {
        let defaults = RemapTimings::default();
        let ms = |value: Option<u64>, default: Duration| {
            value.map(Duration::from_millis).unwrap_or(default)
        };
        let timings = RemapTimings {
            min_sticky: ms(self.min_sticky_ms, defaults.min_sticky),
            max_sticky: ms(self.max_sticky_ms, defaults.max_sticky),
            sticky_duration: ms(self.sticky_duration_ms, defaults.sticky_duration),
        };

        if timings.min_sticky.is_zero() || timings.sticky_duration.is_zero() {
            return Err(ConfigError::OutOfRange(
                "timing values must be greater than zero".to_string(),
            ));
        }
        if timings.min_sticky >= timings.max_sticky {
            return Err(ConfigError::OutOfRange(format!(
                "min_sticky_ms ({}) must be below max_sticky_ms ({})",
                timings.min_sticky.as_millis(),
                timings.max_sticky.as_millis()
            )));
        }
        Ok(timings)
    }
}

impl KeyboardToml {
    fn to_layout(&self) -> Result<Layout, ConfigError> {
        let mut layout = Layout::new();

        for (shifted, table) in [(false, &self.normal), (true, &self.shifted)] {
            for (key_str, output_str) in table {
                let key = parse_key(key_str)?;
                let mapping = parse_char_output(output_str).map_err(|source| ConfigError::InvalidCombo {
                    combo: output_str.clone(),
                    source,
                })?;
                layout.insert_char(shifted, key, mapping);
            }
        }

        let missing = layout.missing_shifted();
        if !missing.is_empty() {
            let names: Vec<&str> = missing.iter().map(|key| key.name()).collect();
            return Err(ConfigError::MissingShifted(names.join(", ")));
        }

        for name in &self.shift_locked {
            layout.insert_shift_locked(parse_key(name)?);
        }

        for entry in &self.execution {
            let (key, layer) = entry.to_entry("execution")?;
            if layout.execution(key).is_some() {
                return Err(ConfigError::DuplicateEntry {
                    table: "execution",
                    key: key.to_string(),
                });
            }
            layout.insert_execution(key, layer);
        }
        for entry in &self.function {
            let (key, layer) = entry.to_entry("function")?;
            if layout.function(key).is_some() {
                return Err(ConfigError::DuplicateEntry {
                    table: "function",
                    key: key.to_string(),
                });
            }
            layout.insert_function(key, layer);
        }

        Ok(layout)
    }
}

impl LayerToml {
    fn to_entry(&self, table: &'static str) -> Result<(Key, LayerEntry), ConfigError> {
        let key = parse_key(&self.key)?;
        let action = self.action.to_action()?;
        let is_modifier = matches!(action, LayerAction::Modifier { .. });

        let can_repeat = self.repeat.unwrap_or(false);
        if is_modifier && can_repeat {
            return Err(ConfigError::InvalidEntry {
                table,
                key: key.to_string(),
                reason: "modifier actions cannot repeat".to_string(),
            });
        }
        let release_stickies = self.release_stickies.unwrap_or(!is_modifier);

        Ok((key, LayerEntry::new(can_repeat, release_stickies, action)))
    }
}

impl ActionToml {
    fn to_action(&self) -> Result<LayerAction, ConfigError> {
        let action = match self {
            ActionToml::Modifier { modifier, tap, sticky } => LayerAction::Modifier {
                modifier: ModifierId::from_alias(modifier)
                    .ok_or_else(|| ConfigError::InvalidModifier(modifier.clone()))?,
                tap: tap.as_deref().map(parse_key).transpose()?,
                sticky: *sticky,
            },
            ActionToml::Key { key } => LayerAction::Key(parse_key(key)?),
            ActionToml::Combo { combo } => LayerAction::Combo(parse_combo_field(combo)?),
            ActionToml::Sequence { combos } => LayerAction::Sequence(
                combos
                    .iter()
                    .map(|combo| parse_combo_field(combo))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            ActionToml::ToggleShiftLock => LayerAction::ToggleShiftLock,
            ActionToml::Nothing => LayerAction::Nothing,
        };
        Ok(action)
    }
}

fn parse_key(name: &str) -> Result<Key, ConfigError> {
    let trimmed = name.trim();
    crate::key::key_from_name(trimmed).ok_or_else(|| ConfigError::InvalidKey(trimmed.to_string()))
}

fn parse_combo_field(combo: &str) -> Result<Combo, ConfigError> {
    parse_combo(combo).map_err(|source| ConfigError::InvalidCombo {
        combo: combo.to_string(),
        source,
    })
}

fn ensure_positive(name: &str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange(format!("{} must be > 0, got {}", name, value)))
    }
}
