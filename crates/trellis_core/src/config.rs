//! Engine configuration (trellis.toml)

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrellisError};

/// Tunables shared by every node of one tree
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Child-count cap per node
    pub max_children: usize,
    /// Round arranged rects to whole layout units
    pub layout_rounding: bool,
    /// Emit a trace event for every invalidation
    pub trace_invalidation: bool,
    /// Extent of a grid splitter across its resize axis
    pub splitter_thickness: f32,
    /// Distance an arrow key moves a focused splitter
    pub splitter_keyboard_step: f32,
    /// Pointer travel before a press starts moving its target
    pub drag_threshold: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_children: u16::MAX as usize,
            layout_rounding: false,
            trace_invalidation: true,
            splitter_thickness: 5.0,
            splitter_keyboard_step: 10.0,
            drag_threshold: 0.0,
        }
    }
}

impl EngineConfig {
    /// Parse from TOML text; missing keys take their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig =
            toml::from_str(content).map_err(|e| TrellisError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| TrellisError::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Serialize to TOML text
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| TrellisError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_children == 0 {
            return Err(TrellisError::Config("max_children must be at least 1".into()));
        }
        for (name, value) in [
            ("splitter_thickness", self.splitter_thickness),
            ("splitter_keyboard_step", self.splitter_keyboard_step),
            ("drag_threshold", self.drag_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(TrellisError::Config(format!(
                    "{name} must be a finite non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }
}
