//! Asset loading with per-asset failure isolation

use async_trait::async_trait;
use markar_core::{AssetSpec, ModelData};
use markar_scene::Transform;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

use crate::error::{BoxError, LoadError};

/// Store of model files addressable by path
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Fetch the raw bytes of one model
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, BoxError>;
}

/// Reads models from a local directory
#[derive(Debug, Clone)]
pub struct FsAssetSource {
    root: PathBuf,
}

impl FsAssetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl AssetSource for FsAssetSource {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, BoxError> {
        let full_path = self.root.join(path);
        let bytes = tokio::fs::read(&full_path)
            .await
            .map_err(|e| format!("{}: {}", full_path.display(), e))?;
        Ok(bytes)
    }
}

/// Detached visual root of a loaded model, not yet part of any scene
#[derive(Debug, Clone)]
pub struct VisualRoot {
    pub model: ModelData,
    pub transform: Transform,
}

/// A successfully loaded asset, ready to be bound to its anchor
#[derive(Debug, Clone)]
pub struct LoadedAsset {
    pub spec: AssetSpec,
    pub visual: VisualRoot,
}

/// Loads one asset at a time; callers run several loads concurrently
#[derive(Clone)]
pub struct AssetLoader {
    source: Arc<dyn AssetSource>,
    timeout: Option<Duration>,
}

impl AssetLoader {
    pub fn new(source: Arc<dyn AssetSource>) -> Self {
        Self {
            source,
            timeout: None,
        }
    }

    /// Convert loads that stall longer than `limit` into load errors
    pub fn with_timeout(mut self, limit: Option<Duration>) -> Self {
        self.timeout = limit;
        self
    }

    /// Fetch and validate the model for one asset spec
    ///
    /// Never touches the scene. Every failure, whether fetch, timeout, or
    /// decode, comes back as a [`LoadError`] naming the requested path.
    pub async fn load(&self, spec: &AssetSpec) -> Result<LoadedAsset, LoadError> {
        let path = spec.source_path.as_str();
        debug!(path = %path, anchor = spec.anchor_index, "Loading asset");

        let fetch = self.source.fetch(path);
        let bytes = match self.timeout {
            Some(limit) => timeout(limit, fetch)
                .await
                .map_err(|_| LoadError::timed_out(path, limit))?,
            None => fetch.await,
        }
        .map_err(|cause| LoadError::new(path, cause))?;

        let model = ModelData::parse(path, bytes).map_err(|e| LoadError::new(path, e))?;

        debug!(
            path = %path,
            nodes = model.summary.nodes,
            meshes = model.summary.meshes,
            bytes = model.len(),
            "Asset loaded"
        );

        Ok(LoadedAsset {
            spec: spec.clone(),
            visual: VisualRoot {
                model,
                transform: Transform::IDENTITY,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{glb_fixture, MemoryAssetSource};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_from_disk() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("h2o.glb"), glb_fixture()).unwrap();

        let loader = AssetLoader::new(Arc::new(FsAssetSource::new(temp_dir.path())));
        let asset = loader.load(&AssetSpec::new("h2o.glb", 0)).await.unwrap();

        assert_eq!(asset.spec.anchor_index, 0);
        assert_eq!(asset.visual.model.name, "h2o.glb");
        assert_eq!(asset.visual.transform, Transform::IDENTITY);
    }

    #[tokio::test]
    async fn test_missing_file_is_load_error() {
        let temp_dir = TempDir::new().unwrap();
        let loader = AssetLoader::new(Arc::new(FsAssetSource::new(temp_dir.path())));

        let err = loader.load(&AssetSpec::new("missing.glb", 0)).await.unwrap_err();
        assert_eq!(err.path, "missing.glb");
    }

    #[tokio::test]
    async fn test_corrupt_model_is_load_error() {
        let source = MemoryAssetSource::new().with_bytes("bad.glb", b"garbage".to_vec());
        let loader = AssetLoader::new(Arc::new(source));

        let err = loader.load(&AssetSpec::new("bad.glb", 0)).await.unwrap_err();
        assert_eq!(err.path, "bad.glb");
        assert!(err.to_string().contains("Invalid glTF"), "{}", err);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_fetch_times_out() {
        let source = MemoryAssetSource::new()
            .with_model("slow.glb")
            .with_delay("slow.glb", Duration::from_secs(3600));
        let loader =
            AssetLoader::new(Arc::new(source)).with_timeout(Some(Duration::from_secs(5)));

        let err = loader.load(&AssetSpec::new("slow.glb", 0)).await.unwrap_err();
        assert!(err.to_string().contains("timed out"), "{}", err);
    }
}
