//! Asset specifications and session lifecycle status

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 3D model bound to one tracking anchor
///
/// Specs are fixed at configuration time and never change while the
/// process runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetSpec {
    /// Model path, relative to the configured asset source
    #[serde(rename = "path")]
    pub source_path: String,
    /// Index of the marker/anchor this model follows
    #[serde(rename = "anchor")]
    pub anchor_index: usize,
    /// Local scale applied to the model's visual root
    #[serde(default = "default_scale")]
    pub scale: [f32; 3],
    /// Idle rotation around the vertical axis, in radians per frame
    #[serde(default, rename = "spin")]
    pub spin_rate: f32,
}

fn default_scale() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

impl AssetSpec {
    pub fn new(source_path: impl Into<String>, anchor_index: usize) -> Self {
        Self {
            source_path: source_path.into(),
            anchor_index,
            scale: default_scale(),
            spin_rate: 0.0,
        }
    }

    /// Set a uniform scale on all three axes
    pub fn with_uniform_scale(mut self, scale: f32) -> Self {
        self.scale = [scale; 3];
        self
    }

    pub fn with_spin(mut self, spin_rate: f32) -> Self {
        self.spin_rate = spin_rate;
        self
    }
}

/// File name component of a model path or URL, used to name cache entries
pub fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\'])
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or(path)
}

/// Lifecycle status of an AR session
///
/// The only valid cycle is `Idle -> Starting -> Running -> Stopping -> Idle`,
/// plus the `Starting -> Idle` rollback when a start attempt fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Idle,
    Starting,
    Running,
    Stopping,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Starting => "starting",
            SessionStatus::Running => "running",
            SessionStatus::Stopping => "stopping",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_from_toml_defaults() {
        let spec: AssetSpec = toml::from_str(
            r#"
path = "models/h2o.glb"
anchor = 0
"#,
        )
        .unwrap();

        assert_eq!(spec.source_path, "models/h2o.glb");
        assert_eq!(spec.anchor_index, 0);
        assert_eq!(spec.scale, [1.0, 1.0, 1.0]);
        assert_eq!(spec.spin_rate, 0.0);
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("models/ar18.glb"), "ar18.glb");
        assert_eq!(file_name("h2o.glb"), "h2o.glb");
        assert_eq!(file_name("https://cdn.example.com/a/b.glb"), "b.glb");
        assert_eq!(file_name("models/"), "models/");
    }

    #[test]
    fn test_status_display() {
        assert_eq!(SessionStatus::Running.to_string(), "running");
        assert_eq!(SessionStatus::default(), SessionStatus::Idle);
    }
}
