use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::data::text_query::TextQueryMode;
use crate::utils::app_paths::AppPaths;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub display: DisplayConfig,
    pub behavior: BehaviorConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Height of every data row, in terminal rows
    pub row_height: u16,

    /// Height of the header row
    pub header_height: u16,

    /// Extra rows rendered above and below the visible window
    pub overscan_rows: usize,

    /// Extra columns rendered left and right of the visible window
    pub overscan_columns: usize,

    /// Show a row number gutter
    pub show_row_numbers: bool,

    /// Use Unicode glyphs for icons
    pub use_glyphs: bool,

    /// Icons for header affordances (can be overridden)
    pub icons: IconConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IconConfig {
    pub pin: String,
    pub compare: String,
    pub sort_asc: String,
    pub sort_desc: String,
    pub checked: String,
    pub unchecked: String,
    pub indeterminate: String,
    pub menu: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Rows sampled per column when measuring natural widths
    pub sample_size: usize,

    /// Measured width must move by more than this before it is accepted
    pub width_hysteresis: u16,

    /// Quiet period before width changes reach the renderer
    pub width_debounce_ms: u64,

    /// Delay before widths are re-measured after a manual resize
    pub resize_reset_debounce_ms: u64,

    /// Minimum interval between scroll / items-rendered callbacks
    pub scroll_throttle_ms: u64,

    /// How long "scrolling horizontally" stays set after the last scroll
    pub scrolling_hold_ms: u64,

    /// Lifetime of toast notifications
    pub toast_duration_ms: u64,

    /// How the free-text query matches cells
    pub text_query_mode: TextQueryMode,

    /// Case-insensitive text query and filters
    pub case_insensitive: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, `RUST_LOG` wins when set
    pub level: String,

    /// Also append logs to the log file in the data directory
    pub log_to_file: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            row_height: 1,
            header_height: 1,
            overscan_rows: 2,
            overscan_columns: 0,
            show_row_numbers: false,
            use_glyphs: true,
            icons: IconConfig::default(),
        }
    }
}

impl Default for IconConfig {
    fn default() -> Self {
        Self {
            pin: "📌".to_string(),
            compare: "⇔".to_string(),
            sort_asc: "▲".to_string(),
            sort_desc: "▼".to_string(),
            checked: "☑".to_string(),
            unchecked: "☐".to_string(),
            indeterminate: "◪".to_string(),
            menu: "⋮".to_string(),
        }
    }
}

impl IconConfig {
    /// Get simple ASCII alternatives for terminals without glyph support
    pub fn simple() -> Self {
        Self {
            pin: "[P]".to_string(),
            compare: "<>".to_string(),
            sort_asc: "^".to_string(),
            sort_desc: "v".to_string(),
            checked: "[x]".to_string(),
            unchecked: "[ ]".to_string(),
            indeterminate: "[-]".to_string(),
            menu: ":".to_string(),
        }
    }
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            sample_size: 20,
            width_hysteresis: 5,
            width_debounce_ms: 200,
            resize_reset_debounce_ms: 10,
            scroll_throttle_ms: 200,
            scrolling_hold_ms: 200,
            toast_duration_ms: 3000,
            text_query_mode: TextQueryMode::Substring,
            case_insensitive: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_to_file: false,
        }
    }
}

impl Config {
    /// Load config from the default location, writing defaults on first run
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            let default_config = Self::default();
            default_config.save()?;
            return Ok(default_config);
        }

        Self::load_from(&config_path)
    }

    /// Load config from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let mut config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;

        if !config.display.use_glyphs {
            config.display.icons = IconConfig::simple();
        }

        Ok(config)
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;

        Ok(())
    }

    /// Get the default config file path
    pub fn get_config_path() -> Result<PathBuf> {
        AppPaths::config_file()
    }

    /// Create a default config file with comments
    pub fn create_default_with_comments() -> String {
        r#"# datagrid configuration
# Location: ~/.config/datagrid/config.toml (Linux)

[display]
# Terminal rows per data row and for the header
row_height = 1
header_height = 1

# Rows/columns rendered beyond the visible window
overscan_rows = 2
overscan_columns = 0

show_row_numbers = false

# Set to false for ASCII-only icons
use_glyphs = true

[behavior]
# Rows sampled per column when measuring natural widths
sample_size = 20

# A re-measured width must differ by more than this to be applied
width_hysteresis = 5

# Debounce / throttle timings in milliseconds
width_debounce_ms = 200
resize_reset_debounce_ms = 10
scroll_throttle_ms = 200
scrolling_hold_ms = 200
toast_duration_ms = 3000

# "substring", "regex" or "fuzzy"
text_query_mode = "substring"
case_insensitive = true

[logging]
# Overridden by RUST_LOG
level = "info"
log_to_file = false
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.behavior.sample_size, 20);
        assert_eq!(config.behavior.width_hysteresis, 5);
        assert_eq!(config.behavior.width_debounce_ms, 200);
        assert_eq!(config.display.row_height, 1);
    }

    #[test]
    fn test_commented_default_parses() {
        let config: Config = toml::from_str(&Config::create_default_with_comments()).unwrap();
        assert_eq!(config.behavior.text_query_mode, TextQueryMode::Substring);
        assert_eq!(config.display.overscan_rows, 2);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
[behavior]
text_query_mode = "fuzzy"
"#,
        )
        .unwrap();
        assert_eq!(config.behavior.text_query_mode, TextQueryMode::Fuzzy);
        assert_eq!(config.behavior.scroll_throttle_ms, 200);
    }

    #[test]
    fn test_save_and_load_roundtrip_ascii_icons() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::default();
        config.display.use_glyphs = false;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert!(!loaded.display.use_glyphs);
        assert_eq!(loaded.display.icons.pin, "[P]");
    }
}
