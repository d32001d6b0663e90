//! Experience configuration - which marker file to track and which models to anchor
//!
//! An experience is described in TOML:
//!
//! ```toml
//! [marker]
//! path = "./assets/targets.mind"
//!
//! [loading]
//! timeout_secs = 30
//!
//! [[asset]]
//! path = "h2o.glb"
//! anchor = 0
//! spin = 0.01
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::asset::AssetSpec;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read experience file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse experience file: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("No assets configured")]
    NoAssets,
    #[error("Anchor {0} is used by more than one asset")]
    DuplicateAnchor(usize),
    #[error("Asset {path} targets anchor {anchor}, but only {max} targets are tracked")]
    AnchorOutOfRange {
        path: String,
        anchor: usize,
        max: usize,
    },
    #[error("Asset {path} has invalid scale {scale:?} (components must be finite and positive)")]
    InvalidScale { path: String, scale: [f32; 3] },
    #[error("Asset {path} has non-finite spin rate")]
    InvalidSpin { path: String },
    #[error("Asset path is empty for anchor {0}")]
    EmptyPath(usize),
}

/// Marker (image target) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkerConfig {
    /// Path to the compiled marker file consumed by the tracker
    #[serde(default = "default_marker_path")]
    pub path: String,
    /// Number of markers tracked simultaneously (defaults to the asset count)
    #[serde(default)]
    pub max_tracked_targets: Option<usize>,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            path: default_marker_path(),
            max_tracked_targets: None,
        }
    }
}

fn default_marker_path() -> String {
    "./assets/targets.mind".to_string()
}

/// Asset loading policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadingConfig {
    /// Per-asset load timeout in seconds (0 disables the timeout)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Base URL for remote assets; when unset, assets are read from disk
    #[serde(default)]
    pub base_url: Option<String>,
    /// Cache directory for remotely fetched models
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,
}

impl Default for LoadingConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            base_url: None,
            cache_dir: default_cache_dir(),
        }
    }
}

impl LoadingConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_cache_dir() -> String {
    "./cache".to_string()
}

/// Baseline scene lighting, added before any model is attached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightingConfig {
    /// Sky color of the hemisphere light (RGB 0.0-1.0)
    #[serde(default = "default_sky_color")]
    pub sky_color: [f32; 3],
    /// Ground color of the hemisphere light (RGB 0.0-1.0)
    #[serde(default = "default_ground_color")]
    pub ground_color: [f32; 3],
    #[serde(default = "default_intensity")]
    pub intensity: f32,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            sky_color: default_sky_color(),
            ground_color: default_ground_color(),
            intensity: default_intensity(),
        }
    }
}

fn default_sky_color() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

fn default_ground_color() -> [f32; 3] {
    [0.733, 0.733, 1.0] // #bbbbff
}

fn default_intensity() -> f32 {
    1.0
}

/// A complete AR experience: marker file, loading policy, lighting, and assets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Experience {
    #[serde(default)]
    pub marker: MarkerConfig,
    #[serde(default)]
    pub loading: LoadingConfig,
    #[serde(default)]
    pub lighting: LightingConfig,
    #[serde(default = "default_assets", rename = "asset")]
    pub assets: Vec<AssetSpec>,
}

impl Default for Experience {
    fn default() -> Self {
        Self {
            marker: MarkerConfig::default(),
            loading: LoadingConfig::default(),
            lighting: LightingConfig::default(),
            assets: default_assets(),
        }
    }
}

fn default_assets() -> Vec<AssetSpec> {
    vec![
        AssetSpec::new("h2o.glb", 0).with_spin(0.01),
        AssetSpec::new("ar18.glb", 1)
            .with_uniform_scale(0.2)
            .with_spin(0.01),
    ]
}

impl Experience {
    /// Load and validate an experience from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate an experience from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let experience: Experience = toml::from_str(content)?;
        experience.validate()?;
        Ok(experience)
    }

    /// Number of simultaneously tracked targets requested from the tracker
    pub fn max_tracked_targets(&self) -> usize {
        self.marker
            .max_tracked_targets
            .unwrap_or(self.assets.len())
    }

    /// Check asset specs against each other and against the tracker capacity
    ///
    /// Anchor indexes must be unique and below `max_tracked_targets`, since an
    /// undersized tracker silently never reports the extra anchors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.assets.is_empty() {
            return Err(ConfigError::NoAssets);
        }

        let max = self.max_tracked_targets();
        let mut anchors = HashSet::new();

        for spec in &self.assets {
            if spec.source_path.trim().is_empty() {
                return Err(ConfigError::EmptyPath(spec.anchor_index));
            }
            if !anchors.insert(spec.anchor_index) {
                return Err(ConfigError::DuplicateAnchor(spec.anchor_index));
            }
            if spec.anchor_index >= max {
                return Err(ConfigError::AnchorOutOfRange {
                    path: spec.source_path.clone(),
                    anchor: spec.anchor_index,
                    max,
                });
            }
            if spec.scale.iter().any(|c| !c.is_finite() || *c <= 0.0) {
                return Err(ConfigError::InvalidScale {
                    path: spec.source_path.clone(),
                    scale: spec.scale,
                });
            }
            if !spec.spin_rate.is_finite() {
                return Err(ConfigError::InvalidSpin {
                    path: spec.source_path.clone(),
                });
            }
        }

        Ok(())
    }
}
