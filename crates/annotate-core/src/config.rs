//! Engine tunables
//!
//! Every field has a default, so an empty TOML document is a valid config.
//!
//! ```
//! use annotate_core::config::EngineConfig;
//!
//! let config = EngineConfig::from_toml_str("handle_radius_px = 12.0").unwrap();
//! assert_eq!(config.handle_radius_px, 12.0);
//! assert_eq!(config.min_size_px, 5.0);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{AnnotateError, Result};
use crate::store::MIN_SIZE_PX;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Smallest annotation width/height in pixels (default: 5)
    pub min_size_px: f64,
    /// How close, in pixels, a pointer must be to a corner to grab it (default: 8)
    pub handle_radius_px: f64,
    /// Render scale a session opens with (default: 1.5)
    pub default_scale: f64,
    /// Padding in points around the cover box painted under replacement text (default: 2)
    pub cover_padding_pt: f64,
    /// Line spacing for multi-line text, as a multiple of the font size (default: 1.2)
    pub line_height: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_size_px: MIN_SIZE_PX,
            handle_radius_px: 8.0,
            default_scale: 1.5,
            cover_padding_pt: 2.0,
            line_height: 1.2,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(s).map_err(|e| AnnotateError::Config(e.message().to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(s).map_err(|e| AnnotateError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("min_size_px", self.min_size_px),
            ("handle_radius_px", self.handle_radius_px),
            ("default_scale", self.default_scale),
            ("line_height", self.line_height),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value <= 0.0 {
                return Err(AnnotateError::Config(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        if !self.cover_padding_pt.is_finite() || self.cover_padding_pt < 0.0 {
            return Err(AnnotateError::Config(format!(
                "cover_padding_pt must not be negative, got {}",
                self.cover_padding_pt
            )));
        }
        Ok(())
    }
}
