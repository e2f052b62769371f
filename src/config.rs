//! Viewer configuration: defaults, JSON file loading and CLI overrides.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_MODEL_URL: &str = "https://cdn.jsdelivr.net/gh/HShaebi11/PLAY-E-2@main/smile.glb";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub model: ModelConfig,
    pub camera: CameraConfig,
    pub orbit: OrbitConfig,
    pub lights: LightConfig,
    pub grid: GridConfig,
    pub render: RenderConfig,
    pub export: ExportConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            camera: CameraConfig::default(),
            orbit: OrbitConfig::default(),
            lights: LightConfig::default(),
            grid: GridConfig::default(),
            render: RenderConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

/// Where the model comes from. A local path wins over the URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub url: String,
    pub path: Option<PathBuf>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_MODEL_URL.to_string(),
            path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_deg: f32,
    pub near: f32,
    pub far: f32,
    pub start_distance: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_deg: 75.0,
            near: 0.1,
            far: 1000.0,
            start_distance: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitConfig {
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub enable_zoom: bool,
    pub enable_pan: bool,
    pub min_distance: f32,
    pub max_distance: f32,
    pub rotate_speed: f32,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            enable_damping: true,
            damping_factor: 0.05,
            enable_zoom: true,
            enable_pan: false,
            min_distance: 2.0,
            max_distance: 10.0,
            rotate_speed: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightConfig {
    pub ambient_intensity: f32,
    pub directional_intensity: f32,
    /// Position of the directional light; it shines toward the origin.
    pub directional_position: [f32; 3],
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            ambient_intensity: 0.5,
            directional_intensity: 0.8,
            directional_position: [0.0, 1.0, 1.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub cols: u32,
    pub rows: u32,
    pub alpha: u8,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cols: 20,
            rows: 20,
            alpha: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub max_pixel_ratio: f32,
    pub target_fps: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_pixel_ratio: 2.0,
            target_fps: 60.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub file_prefix: String,
    pub margin_mm: f32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            file_prefix: "3d-model".to_string(),
            margin_mm: 10.0,
        }
    }
}

#[derive(Debug, Default, clap::Parser)]
#[command(name = "tweakview", about = "Interactive GLB viewer with live transform controls")]
pub struct Cli {
    /// JSON config file; missing fields use defaults
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Remote GLB to load
    #[arg(long)]
    pub model_url: Option<String>,
    /// Local GLB to load instead of the URL
    #[arg(long)]
    pub model_path: Option<PathBuf>,
}

impl ViewerConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| ConfigError::Json {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let mut config = match &cli.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        if let Some(url) = &cli.model_url {
            config.model.url = url.clone();
            config.model.path = None;
        }
        if let Some(path) = &cli.model_path {
            config.model.path = Some(path.clone());
        }
        Ok(config)
    }
}
