//! Remote model fetching with SHA-based caching
//!
//! Models are fetched from `{base_url}/{path}`. Every successful download is
//! stored in the model cache; when the server is unreachable or returns an
//! error status, the last cached copy for that URL is served instead.

use anyhow::{Context, Result};
use async_trait::async_trait;
use markar_core::{file_name, ModelCache};
use markar_session::{AssetSource, BoxError};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("Failed to read response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// HTTP model source with an offline fallback
pub struct HttpAssetSource {
    /// HTTP client
    client: reqwest::Client,
    base_url: String,
    /// Model cache shared by all fetches
    cache: Arc<RwLock<ModelCache>>,
}

impl HttpAssetSource {
    /// Create a source for `base_url`, caching models under `cache_dir`
    pub fn new(base_url: &str, cache_dir: PathBuf, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to create HTTP client")?;

        let cache = ModelCache::new(cache_dir).context("Failed to create model cache")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            cache: Arc::new(RwLock::new(cache)),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL for a model path
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn cached(&self, url: &str) -> Option<Vec<u8>> {
        let cache = self.cache.read().await;
        if !cache.has_model(url) {
            return None;
        }
        match cache.read_model(url) {
            Ok(content) => Some(content),
            Err(e) => {
                warn!(url = %url, error = %e, "Failed to read cached model");
                None
            }
        }
    }

    /// Fall back to the cache, or return the original failure
    async fn fallback(&self, url: &str, err: FetchError) -> Result<Vec<u8>, BoxError> {
        match self.cached(url).await {
            Some(content) => {
                info!(url = %url, "Using cached model fallback (offline)");
                Ok(content)
            }
            None => Err(err.into()),
        }
    }
}

#[async_trait]
impl AssetSource for HttpAssetSource {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, BoxError> {
        let url = self.url(path);
        info!(url = %url, "Fetching remote model");

        let response = match self.client.get(&url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(url = %url, error = %e, "Failed to fetch model, trying cache fallback");
                return self
                    .fallback(&url, FetchError::Request { url: url.clone(), source: e })
                    .await;
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(
                url = %url,
                status = %status,
                "Model fetch returned non-success status, trying cache fallback"
            );
            return self
                .fallback(&url, FetchError::Status { url: url.clone(), status })
                .await;
        }

        let content = match response.bytes().await {
            Ok(body) => body.to_vec(),
            Err(e) => {
                return self
                    .fallback(&url, FetchError::Body { url: url.clone(), source: e })
                    .await;
            }
        };

        {
            let mut cache = self.cache.write().await;
            match cache.store_model(&url, file_name(path), &content) {
                Ok(stored) => debug!(url = %url, path = %stored.display(), "Cached remote model"),
                Err(e) => warn!(url = %url, error = %e, "Failed to cache model"),
            }
        }

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Router};
    use tempfile::TempDir;

    const MODEL: &[u8] = b"model-bytes";

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_fetch_stores_in_cache() {
        let base = serve(Router::new().route("/ar/molecules/h2o.glb", get(|| async { MODEL }))).await;
        let temp_dir = TempDir::new().unwrap();
        let source =
            HttpAssetSource::new(&format!("{}/ar/", base), temp_dir.path().to_path_buf(), None)
                .unwrap();

        let content = source.fetch("molecules/h2o.glb").await.unwrap();
        assert_eq!(content, MODEL);

        let cache = ModelCache::new(temp_dir.path().to_path_buf()).unwrap();
        assert!(cache.has_model(&format!("{}/ar/molecules/h2o.glb", base)));

        // Entries are named after the file, not the nested path
        let stored: Vec<String> = std::fs::read_dir(cache.models_dir())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].ends_with("-h2o.glb"), "{:?}", stored);
    }

    #[tokio::test]
    async fn test_server_error_falls_back_to_cache() {
        let base = serve(Router::new().route(
            "/h2o.glb",
            get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        ))
        .await;
        let temp_dir = TempDir::new().unwrap();
        {
            let mut cache = ModelCache::new(temp_dir.path().to_path_buf()).unwrap();
            cache
                .store_model(&format!("{}/h2o.glb", base), "h2o.glb", MODEL)
                .unwrap();
        }

        let source = HttpAssetSource::new(&base, temp_dir.path().to_path_buf(), None).unwrap();
        assert_eq!(source.fetch("h2o.glb").await.unwrap(), MODEL);
    }

    #[tokio::test]
    async fn test_missing_without_cache_is_error() {
        let base = serve(Router::new()).await;
        let temp_dir = TempDir::new().unwrap();
        let source = HttpAssetSource::new(&base, temp_dir.path().to_path_buf(), None).unwrap();

        let err = source.fetch("ar18.glb").await.unwrap_err();
        assert!(err.to_string().contains("404"), "{}", err);
    }
}
