//! Board configuration
//!
//! Loaded from defaults, then an optional TOML file, then `SKETCHBOARD_*`
//! environment variables. The resulting struct is handed to every component
//! at construction; nothing reads ambient globals.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sketchboard_shared::{BrushState, ColorId, ThicknessId};
use tracing::warn;

use crate::error::ConfigError;

const ENV_PREFIX: &str = "SKETCHBOARD";

pub const DEFAULT_CANVAS_WIDTH: f64 = 1280.0;
pub const DEFAULT_CANVAS_HEIGHT: f64 = 720.0;
pub const DEFAULT_BATCH_INTERVAL_MS: u64 = 16;
pub const DEFAULT_THROTTLE_INTERVAL_MS: u64 = 8;
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    pub canvas_width: f64,
    pub canvas_height: f64,
    pub batch_interval_ms: u64,
    pub throttle_interval_ms: u64,
    pub history_capacity: usize,
    pub default_color: ColorId,
    pub default_thickness: ThicknessId,
    /// WebSocket endpoint of the hub.
    pub server_url: String,
    /// Base for the participant lookup, without trailing slash.
    pub api_base: String,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            canvas_width: DEFAULT_CANVAS_WIDTH,
            canvas_height: DEFAULT_CANVAS_HEIGHT,
            batch_interval_ms: DEFAULT_BATCH_INTERVAL_MS,
            throttle_interval_ms: DEFAULT_THROTTLE_INTERVAL_MS,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            default_color: ColorId::Default,
            default_thickness: ThicknessId::SemiThin,
            server_url: "ws://localhost:3000/ws".to_string(),
            api_base: "http://localhost:3000/api".to_string(),
        }
    }
}

impl BoardConfig {
    /// Load from a TOML file. A missing file means defaults.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_str(content: &str) -> Result<Self, ConfigError> {
        let config: BoardConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(value) = env_parse("CANVAS_WIDTH") {
            self.canvas_width = value;
        }
        if let Some(value) = env_parse("CANVAS_HEIGHT") {
            self.canvas_height = value;
        }
        if let Some(value) = env_parse("BATCH_INTERVAL_MS") {
            self.batch_interval_ms = value;
        }
        if let Some(value) = env_parse("THROTTLE_INTERVAL_MS") {
            self.throttle_interval_ms = value;
        }
        if let Some(value) = env_parse("HISTORY_CAPACITY") {
            self.history_capacity = value;
        }
        if let Ok(value) = std::env::var(format!("{ENV_PREFIX}_SERVER_URL")) {
            self.server_url = value;
        }
        if let Ok(value) = std::env::var(format!("{ENV_PREFIX}_API_BASE")) {
            self.api_base = value;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("canvas_width", self.canvas_width),
            ("canvas_height", self.canvas_height),
        ] {
            if !value.is_finite() || value <= ThicknessId::Eraser.width_px() {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("{value} must be finite and wider than the widest brush"),
                });
            }
        }
        if self.batch_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "batch_interval_ms",
                reason: "must be at least 1".into(),
            });
        }
        if self.history_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "history_capacity",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    pub fn batch_interval(&self) -> Duration {
        Duration::from_millis(self.batch_interval_ms)
    }

    pub fn throttle_interval(&self) -> Duration {
        Duration::from_millis(self.throttle_interval_ms)
    }

    pub fn default_brush(&self) -> BrushState {
        BrushState::new(self.default_color, self.default_thickness)
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    parse_override(key, std::env::var(format!("{ENV_PREFIX}_{key}")).ok())
}

/// An unparsable override keeps the file value and is logged.
fn parse_override<T: FromStr>(key: &str, raw: Option<String>) -> Option<T> {
    let raw = raw?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key = %format!("{ENV_PREFIX}_{key}"), value = %raw, "ignoring unparsable override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_override_is_skipped() {
        assert_eq!(parse_override::<u64>("BATCH_INTERVAL_MS", Some("fast".into())), None);
        assert_eq!(parse_override::<u64>("BATCH_INTERVAL_MS", Some(" 20 ".into())), Some(20));
        assert_eq!(parse_override::<f64>("CANVAS_WIDTH", Some("800".into())), Some(800.0));
        assert_eq!(parse_override::<usize>("HISTORY_CAPACITY", None), None);
    }

    #[test]
    fn defaults_are_valid() {
        let config = BoardConfig::default();
        config.validate().unwrap();
        assert_eq!(config.batch_interval(), Duration::from_millis(16));
        assert_eq!(config.throttle_interval(), Duration::from_millis(8));
        assert_eq!(
            config.default_brush(),
            BrushState::new(ColorId::Default, ThicknessId::SemiThin)
        );
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = BoardConfig::load_from_str(
            r#"
            canvas_width = 800.0
            canvas_height = 600.0
            history_capacity = 50
            default_color = "red"
            default_thickness = "thick"
            "#,
        )
        .unwrap();
        assert_eq!(config.canvas_width, 800.0);
        assert_eq!(config.history_capacity, 50);
        assert_eq!(config.default_color, ColorId::Red);
        assert_eq!(config.default_thickness, ThicknessId::Thick);
        assert_eq!(config.batch_interval_ms, DEFAULT_BATCH_INTERVAL_MS);
    }

    #[test]
    fn unknown_color_name_fails_to_parse() {
        let result = BoardConfig::load_from_str(r#"default_color = "teal""#);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let result = BoardConfig::load_from_str("history_capacity = 0");
        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                field: "history_capacity",
                ..
            })
        ));
    }

    #[test]
    fn tiny_canvas_is_rejected() {
        let result = BoardConfig::load_from_str("canvas_width = 10.0");
        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                field: "canvas_width",
                ..
            })
        ));
    }

    #[test]
    fn missing_file_uses_defaults() {
        let config =
            BoardConfig::load_from_path(Path::new("/nonexistent/sketchboard/config.toml")).unwrap();
        assert_eq!(config.history_capacity, DEFAULT_HISTORY_CAPACITY);
    }
}
