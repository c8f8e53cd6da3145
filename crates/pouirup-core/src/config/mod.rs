// pouirup Config
// Data-only TOML configuration and combo string parsing

pub mod combo_parser;
pub mod parser;

pub use combo_parser::{parse_char_output, parse_combo, ComboParseError};
pub use parser::{Config, ConfigError, ConfigToml, GestureBindings, TraceConfig};
