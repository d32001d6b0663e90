//! Configuration loading and validation

use anyhow::{Context, Result};
use markar_core::{AssetSpec, Experience, LightingConfig, LoadingConfig, MarkerConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub marker: MarkerConfig,
    #[serde(default)]
    pub loading: LoadingConfig,
    #[serde(default)]
    pub lighting: LightingConfig,
    #[serde(default = "default_assets", rename = "asset")]
    pub assets: Vec<AssetSpec>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            daemon: DaemonConfig::default(),
            marker: MarkerConfig::default(),
            loading: LoadingConfig::default(),
            lighting: LightingConfig::default(),
            assets: default_assets(),
        }
    }
}

fn default_assets() -> Vec<AssetSpec> {
    Experience::default().assets
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Bind address for web server
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Directory local model paths are resolved against
    #[serde(default = "default_assets_root")]
    pub assets_root: String,
    /// Render loop rate in frames per second (0 renders only on demand)
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
    /// Whether a camera is available to the tracker
    #[serde(default = "default_true")]
    pub camera: bool,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            assets_root: default_assets_root(),
            frame_rate: default_frame_rate(),
            camera: true,
        }
    }
}

impl DaemonConfig {
    /// Render loop period, or `None` when frames are stepped by hand
    pub fn frame_interval(&self) -> Option<Duration> {
        match self.frame_rate {
            0 => None,
            rate => Some(Duration::from_secs_f64(1.0 / rate as f64)),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_assets_root() -> String {
    "./assets/models".to_string()
}

fn default_frame_rate() -> u32 {
    30
}

fn default_true() -> bool {
    true
}

impl Config {
    /// The experience the session controller runs
    pub fn experience(&self) -> Experience {
        Experience {
            marker: self.marker.clone(),
            loading: self.loading.clone(),
            lighting: self.lighting.clone(),
            assets: self.assets.clone(),
        }
    }
}

/// Load configuration from file
///
/// The experience is validated here so a bad asset table is reported at
/// startup rather than on the first session start.
pub fn load_config(path: &Path) -> Result<Config> {
    let config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        info!(path = %path.display(), "Loaded configuration");
        config
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Config::default()
    };

    config
        .experience()
        .validate()
        .context("Invalid experience configuration")?;
    Ok(config)
}

/// Save default configuration to file
pub fn save_default_config(path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(&Config::default())?;
    std::fs::write(path, content)?;
    Ok(())
}
