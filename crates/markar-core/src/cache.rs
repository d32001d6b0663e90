//! Model caching with SHA-based deduplication
//!
//! Remotely fetched models are stored by the SHA256 of their content so that:
//! - A model fetched once stays available when the network is not
//! - Identical content served from different URLs is stored only once
//!
//! Model files are stored with SHA-prefixed names: `models/{short_sha}-{name}`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("URL not in cache: {0}")]
    NotCached(String),
}

/// Cache manifest entry for a model file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedModel {
    /// URL the model was fetched from
    pub url: String,
    /// SHA256 hash of the model content (full)
    pub sha: String,
    /// Original model name (without SHA prefix)
    pub name: String,
    /// Local file path (relative to cache directory): models/{short_sha}-{name}
    pub path: String,
    /// When this was fetched (RFC 3339)
    pub fetched_at: String,
}

/// The cache manifest tracks all cached models
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheManifest {
    /// Version of the manifest format
    #[serde(default = "default_version")]
    pub version: String,
    /// Model entries keyed by URL
    #[serde(default)]
    pub models: HashMap<String, CachedModel>,
    /// SHA -> relative path, for deduplication across URLs
    #[serde(default)]
    pub models_by_sha: HashMap<String, String>,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl CacheManifest {
    pub fn new() -> Self {
        Self {
            version: default_version(),
            models: HashMap::new(),
            models_by_sha: HashMap::new(),
        }
    }

    /// Load manifest or create new if file doesn't exist
    pub fn load_or_create(path: &Path) -> Result<Self, CacheError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(Self::new())
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), CacheError> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Cache directory manager
#[derive(Debug, Clone)]
pub struct ModelCache {
    pub base_dir: PathBuf,
    pub manifest_path: PathBuf,
    pub manifest: CacheManifest,
}

impl ModelCache {
    /// Open (or create) a model cache at the given directory
    pub fn new(base_dir: PathBuf) -> Result<Self, CacheError> {
        std::fs::create_dir_all(&base_dir)?;

        let manifest_path = base_dir.join("manifest.json");
        let manifest = CacheManifest::load_or_create(&manifest_path)?;

        Ok(Self {
            base_dir,
            manifest_path,
            manifest,
        })
    }

    pub fn models_dir(&self) -> PathBuf {
        self.base_dir.join("models")
    }

    /// Get short SHA (first 8 characters) from a full SHA
    pub fn short_sha(sha: &str) -> &str {
        &sha[..8.min(sha.len())]
    }

    /// Check whether a model fetched from `url` is cached and still on disk
    pub fn has_model(&self, url: &str) -> bool {
        self.manifest
            .models
            .get(url)
            .map(|entry| self.base_dir.join(&entry.path).exists())
            .unwrap_or(false)
    }

    /// Store a model fetched from `url`, returning its absolute path
    pub fn store_model(&mut self, url: &str, name: &str, content: &[u8]) -> Result<PathBuf, CacheError> {
        let sha = sha256_hex(content);

        let relative_path = match self.manifest.models_by_sha.get(&sha) {
            Some(existing) if self.base_dir.join(existing).exists() => {
                debug!(url = %url, sha = %Self::short_sha(&sha), "Model content already cached");
                existing.clone()
            }
            _ => {
                let models_dir = self.models_dir();
                std::fs::create_dir_all(&models_dir)?;

                let file_name = format!("{}-{}", Self::short_sha(&sha), name);
                std::fs::write(models_dir.join(&file_name), content)?;
                format!("models/{}", file_name)
            }
        };

        self.manifest
            .models_by_sha
            .insert(sha.clone(), relative_path.clone());
        self.manifest.models.insert(
            url.to_string(),
            CachedModel {
                url: url.to_string(),
                sha,
                name: name.to_string(),
                path: relative_path.clone(),
                fetched_at: chrono::Utc::now().to_rfc3339(),
            },
        );
        self.manifest.save(&self.manifest_path)?;

        Ok(self.base_dir.join(relative_path))
    }

    /// Read the cached content for a URL
    pub fn read_model(&self, url: &str) -> Result<Vec<u8>, CacheError> {
        let entry = self
            .manifest
            .models
            .get(url)
            .ok_or_else(|| CacheError::NotCached(url.to_string()))?;
        Ok(std::fs::read(self.base_dir.join(&entry.path))?)
    }
}

/// Compute SHA256 hash of data and return as hex string
pub fn sha256_hex(data: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_store_and_read() {
        let temp_dir = TempDir::new().unwrap();
        let mut cache = ModelCache::new(temp_dir.path().to_path_buf()).unwrap();

        let url = "https://cdn.example.com/models/h2o.glb";
        let path = cache.store_model(url, "h2o.glb", b"glb-bytes").unwrap();

        assert!(path.exists());
        assert!(cache.has_model(url));
        assert_eq!(cache.read_model(url).unwrap(), b"glb-bytes");

        let file_name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(file_name.ends_with("-h2o.glb"));
        assert_eq!(file_name.len(), "12345678-h2o.glb".len());
    }

    #[test]
    fn test_manifest_persists() {
        let temp_dir = TempDir::new().unwrap();
        let url = "https://cdn.example.com/ar18.glb";
        {
            let mut cache = ModelCache::new(temp_dir.path().to_path_buf()).unwrap();
            cache.store_model(url, "ar18.glb", b"argon").unwrap();
        }

        let reopened = ModelCache::new(temp_dir.path().to_path_buf()).unwrap();
        assert!(reopened.has_model(url));
        assert_eq!(reopened.read_model(url).unwrap(), b"argon");
    }

    #[test]
    fn test_identical_content_deduplicated() {
        let temp_dir = TempDir::new().unwrap();
        let mut cache = ModelCache::new(temp_dir.path().to_path_buf()).unwrap();

        let a = cache.store_model("https://a.example.com/m.glb", "m.glb", b"same").unwrap();
        let b = cache.store_model("https://b.example.com/other.glb", "other.glb", b"same").unwrap();

        assert_eq!(a, b);
        assert_eq!(std::fs::read_dir(cache.models_dir()).unwrap().count(), 1);
    }

    #[test]
    fn test_missing_url() {
        let temp_dir = TempDir::new().unwrap();
        let cache = ModelCache::new(temp_dir.path().to_path_buf()).unwrap();
        assert!(matches!(
            cache.read_model("https://nowhere/x.glb"),
            Err(CacheError::NotCached(_))
        ));
    }

    #[test]
    fn test_sha256() {
        let hash = sha256_hex(b"hello world");
        assert_eq!(hash, "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9");
    }
}
