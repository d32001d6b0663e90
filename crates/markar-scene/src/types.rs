//! Scene components

use bevy_ecs::component::Component;
use markar_core::{LightingConfig, ModelData};
use serde::{Deserialize, Serialize};

/// Group node that follows one tracked marker's pose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Component)]
pub struct AnchorGroup {
    pub index: usize,
}

/// Visual root of a loaded model, attached under an anchor group
#[derive(Debug, Clone, Component)]
pub struct VisualNode {
    /// Source path the model was loaded from
    pub source: String,
    pub model: ModelData,
}

/// Sky/ground hemisphere light
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Component)]
pub struct HemisphereLight {
    pub sky_color: [f32; 3],
    pub ground_color: [f32; 3],
    pub intensity: f32,
}

impl From<&LightingConfig> for HemisphereLight {
    fn from(config: &LightingConfig) -> Self {
        Self {
            sky_color: config.sky_color,
            ground_color: config.ground_color,
            intensity: config.intensity,
        }
    }
}
