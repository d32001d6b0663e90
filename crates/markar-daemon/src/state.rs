//! Application state management

use anyhow::{Context, Result};
use markar_session::{
    AssetSource, FrameLoop, FsAssetSource, HeadlessEngine, HeadlessOptions, SessionController,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::fetch::HttpAssetSource;

/// Shared application state
pub struct AppState {
    /// The single AR session
    pub controller: Arc<SessionController>,
    /// Render loop of the tracking engine
    pub frame_loop: FrameLoop,
    /// Where models are loaded from (directory or base URL)
    pub asset_origin: String,
    /// Configuration
    pub config: Config,
}

impl AppState {
    /// Create new application state
    pub fn new(config: Config) -> Result<Arc<Self>> {
        let engine = HeadlessEngine::new(HeadlessOptions {
            camera_available: config.daemon.camera,
            frame_interval: config.daemon.frame_interval(),
        });
        let frame_loop = engine.frame_loop();

        let (source, asset_origin): (Arc<dyn AssetSource>, String) =
            match &config.loading.base_url {
                Some(base_url) => {
                    let source = HttpAssetSource::new(
                        base_url,
                        PathBuf::from(&config.loading.cache_dir),
                        config.loading.timeout(),
                    )?;
                    let origin = source.base_url().to_string();
                    (Arc::new(source), origin)
                }
                None => (
                    Arc::new(FsAssetSource::new(&config.daemon.assets_root)),
                    config.daemon.assets_root.clone(),
                ),
            };

        info!(origin = %asset_origin, assets = config.assets.len(), "Asset source ready");

        let controller = SessionController::new(Arc::new(engine), source, config.experience())
            .context("Invalid experience configuration")?;

        Ok(Arc::new(Self {
            controller: Arc::new(controller),
            frame_loop,
            asset_origin,
            config,
        }))
    }
}
