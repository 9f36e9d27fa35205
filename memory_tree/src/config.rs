//! Application configuration.
//!
//! Read once at startup from an optional JSON file. Every field has a
//! default, so a partial file only overrides what it names:
//!
//! ```json
//! { "swarm": { "foliage": 4000 }, "control": { "dead_zone": 0.25 }, "debug": true }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use tree_swarm::SwarmConfig;

use crate::error::{ConfigError, ConfigResult};
use crate::gesture::GestureThresholds;
use crate::signal::ControlTuning;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width:  usize,
    pub height: usize,
    /// Frame-rate cap for the render loop.
    pub fps:    usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        WindowConfig { width: 960, height: 640, fps: 60 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Photo asset list; card textures index into it modulo its length.
    pub photos:  Vec<String>,
    pub swarm:   SwarmConfig,
    pub gesture: GestureThresholds,
    pub control: ControlTuning,
    pub window:  WindowConfig,
    /// Start with the debug HUD (landmark inset, speed readout).
    pub debug:   bool,
    /// Fixed seed for a reproducible layout.
    pub seed:    Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let photos = std::iter::once("photos/top.jpg".to_string())
            .chain((1..=31).map(|i| format!("photos/{}.jpg", i)))
            .collect();
        AppConfig {
            photos,
            swarm:   SwarmConfig::default(),
            gesture: GestureThresholds::default(),
            control: ControlTuning::default(),
            window:  WindowConfig::default(),
            debug:   false,
            seed:    None,
        }
    }
}

impl AppConfig {
    /// Defaults, or the file at `path` layered over them. Always validated.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let config = match path {
            None => Self::default(),
            Some(path) => {
                let text = fs::read_to_string(path)
                    .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
                let config: AppConfig = serde_json::from_str(&text)
                    .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
                log::info!("loaded config from {}", path.display());
                config
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let s = &self.swarm;
        for (name, count) in [("foliage", s.foliage), ("photos", s.photos), ("props", s.props), ("lights", s.lights)] {
            if count == 0 {
                return Err(ConfigError::Invalid(format!("swarm.{} must be at least 1", name)));
            }
        }
        if !(s.tree_height.is_finite() && s.tree_height > 0.0) {
            return Err(ConfigError::Invalid(format!("swarm.tree_height must be > 0, got {}", s.tree_height)));
        }
        if !(s.tree_radius.is_finite() && s.tree_radius >= 0.0) {
            return Err(ConfigError::Invalid(format!("swarm.tree_radius must be >= 0, got {}", s.tree_radius)));
        }
        self.gesture.validate().map_err(|e| ConfigError::Invalid(format!("gesture: {}", e)))?;
        self.control.validate().map_err(|e| ConfigError::Invalid(format!("control: {}", e)))?;
        if self.window.width == 0 || self.window.height == 0 || self.window.fps == 0 {
            return Err(ConfigError::Invalid("window width, height and fps must be non-zero".into()));
        }
        if self.photos.is_empty() {
            log::warn!("no photo assets configured; cards will be blank");
        }
        Ok(())
    }

    /// Smaller pools for slow machines.
    pub fn quick(mut self) -> Self {
        let quick = SwarmConfig::quick();
        self.swarm.foliage = quick.foliage;
        self.swarm.photos  = quick.photos;
        self.swarm.props   = quick.props;
        self.swarm.lights  = quick.lights;
        self
    }
}
