//! Test doubles for the asset source and the tracking engine

use async_trait::async_trait;
use markar_core::model::encode_glb;
use markar_core::{AssetSpec, Experience, ModelData};
use markar_scene::SharedScene;
use std::collections::HashMap;
use std::time::Duration;
use tempfile::TempDir;

use crate::engine::{Anchor, FrameCallback, TrackingConfig, TrackingEngine, TrackingSession};
use crate::error::BoxError;
use crate::headless::HeadlessEngine;
use crate::loader::AssetSource;

const MODEL_JSON: &str = r#"{
    "asset": {"version": "2.0"},
    "scene": 0,
    "scenes": [{"nodes": [0]}],
    "nodes": [{"name": "molecule"}],
    "buffers": [{"byteLength": 16}]
}"#;

pub fn glb_fixture() -> Vec<u8> {
    encode_glb(MODEL_JSON, &[0u8; 16])
}

pub fn model_fixture(name: &str) -> ModelData {
    ModelData::parse(name, glb_fixture()).unwrap()
}

/// Write a marker file into `dir` and return its path
pub fn marker_file(dir: &TempDir) -> String {
    let path = dir.path().join("targets.mind");
    std::fs::write(&path, b"compiled-marker-data").unwrap();
    path.to_string_lossy().to_string()
}

pub fn experience(marker_path: &str, assets: Vec<AssetSpec>) -> Experience {
    let mut experience = Experience::default();
    experience.marker.path = marker_path.to_string();
    experience.assets = assets;
    experience.validate().unwrap();
    experience
}

/// The two-model experience: water on anchor 0, argon at 0.2 scale on anchor 1
pub fn molecule_specs() -> Vec<AssetSpec> {
    vec![
        AssetSpec::new("h2o.glb", 0).with_spin(0.01),
        AssetSpec::new("ar18.glb", 1)
            .with_uniform_scale(0.2)
            .with_spin(0.01),
    ]
}

struct Entry {
    outcome: Result<Vec<u8>, String>,
    delay: Option<Duration>,
}

/// In-memory asset source with per-path failures and delays
#[derive(Default)]
pub struct MemoryAssetSource {
    entries: HashMap<String, Entry>,
}

impl MemoryAssetSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(self, path: &str) -> Self {
        self.with_bytes(path, glb_fixture())
    }

    pub fn with_bytes(mut self, path: &str, bytes: Vec<u8>) -> Self {
        self.entries.insert(
            path.to_string(),
            Entry {
                outcome: Ok(bytes),
                delay: None,
            },
        );
        self
    }

    pub fn with_failure(mut self, path: &str, reason: &str) -> Self {
        self.entries.insert(
            path.to_string(),
            Entry {
                outcome: Err(reason.to_string()),
                delay: None,
            },
        );
        self
    }

    /// Delay the response for an already-registered path
    pub fn with_delay(mut self, path: &str, delay: Duration) -> Self {
        if let Some(entry) = self.entries.get_mut(path) {
            entry.delay = Some(delay);
        }
        self
    }
}

#[async_trait]
impl AssetSource for MemoryAssetSource {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, BoxError> {
        let entry = self
            .entries
            .get(path)
            .ok_or_else(|| format!("{}: not found", path))?;
        if let Some(delay) = entry.delay {
            tokio::time::sleep(delay).await;
        }
        entry.outcome.clone().map_err(Into::into)
    }
}

/// Headless engine whose sessions fail to release the camera
pub struct FailingReleaseEngine(pub HeadlessEngine);

struct FailingReleaseSession(Box<dyn TrackingSession>);

#[async_trait]
impl TrackingEngine for FailingReleaseEngine {
    async fn create_session(
        &self,
        config: &TrackingConfig,
    ) -> Result<Box<dyn TrackingSession>, BoxError> {
        let inner = self.0.create_session(config).await?;
        Ok(Box::new(FailingReleaseSession(inner)))
    }
}

#[async_trait]
impl TrackingSession for FailingReleaseSession {
    fn scene(&self) -> SharedScene {
        self.0.scene()
    }

    fn add_anchor(&mut self, index: usize) -> Anchor {
        self.0.add_anchor(index)
    }

    async fn start(&mut self) -> Result<(), BoxError> {
        self.0.start().await
    }

    async fn stop(&mut self) -> Result<(), BoxError> {
        let _ = self.0.stop().await;
        Err("camera already released".into())
    }

    fn install_frame_callback(&mut self, callback: FrameCallback) {
        self.0.install_frame_callback(callback)
    }

    fn remove_frame_callback(&mut self) -> Option<FrameCallback> {
        self.0.remove_frame_callback()
    }
}
