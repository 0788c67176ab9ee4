use std::fs;
use std::path::{Path, PathBuf};

use atmosphere::{FogConfig, LightingConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub target_fps: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Atmosphere Demo".to_string(),
            width: 960,
            height: 540,
            target_fps: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct SceneConfig {
    pub player_speed_px_per_second: f32,
    pub torch_spacing_px: f32,
    pub torch_radius: f32,
    pub lantern_radius: f32,
    pub lantern_orbit_radius: f32,
    pub lantern_orbit_seconds: f32,
    pub tile_size_px: u32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            player_speed_px_per_second: 180.0,
            torch_spacing_px: 256.0,
            torch_radius: 72.0,
            lantern_radius: 96.0,
            lantern_orbit_radius: 160.0,
            lantern_orbit_seconds: 6.0,
            tile_size_px: 32,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct DemoConfig {
    pub window: WindowConfig,
    pub scene: SceneConfig,
    pub lighting: LightingConfig,
    pub fog: FogConfig,
}

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {} at '{field_path}': {source}", path.display())]
    Parse {
        path: PathBuf,
        field_path: String,
        #[source]
        source: serde_json::Error,
    },
}

pub(crate) fn load_config(path: &Path) -> Result<DemoConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&raw).map_err(|error| ConfigError::Parse {
        path: path.to_path_buf(),
        field_path: error.path().to_string(),
        source: error.into_inner(),
    })
}

fn parse_config(raw: &str) -> Result<DemoConfig, serde_path_to_error::Error<serde_json::Error>> {
    let deserializer = &mut serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize(deserializer)
}
