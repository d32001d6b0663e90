//! Headless tracking engine
//!
//! Stands in for a camera-backed tracker: it checks the marker file, hands
//! out anchors, and drives a render loop into a [`HeadlessRenderer`]. The
//! loop either ticks on a tokio interval or is stepped by hand.

use async_trait::async_trait;
use markar_scene::{lock_scene, CameraPose, HeadlessRenderer, SceneGraph, SharedScene};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::engine::{
    Anchor, FrameCallback, FrameContext, TrackingConfig, TrackingEngine, TrackingSession,
};
use crate::error::BoxError;

#[derive(Debug, Clone)]
pub struct HeadlessOptions {
    /// Without a camera, starting a session fails the way a denied permission does
    pub camera_available: bool,
    /// Render loop period; `None` renders only when [`FrameLoop::step`] is called
    pub frame_interval: Option<Duration>,
}

impl Default for HeadlessOptions {
    fn default() -> Self {
        Self {
            camera_available: true,
            frame_interval: Some(Duration::from_millis(33)),
        }
    }
}

struct FrameLoopState {
    callback: Option<FrameCallback>,
    renderer: HeadlessRenderer,
    camera: CameraPose,
    ticks: u64,
}

/// Render loop shared by every session the engine opens
#[derive(Clone)]
pub struct FrameLoop {
    scene: SharedScene,
    state: Arc<Mutex<FrameLoopState>>,
}

impl FrameLoop {
    fn new(scene: SharedScene) -> Self {
        Self {
            scene,
            state: Arc::new(Mutex::new(FrameLoopState {
                callback: None,
                renderer: HeadlessRenderer::new(),
                camera: CameraPose::default(),
                ticks: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FrameLoopState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run one tick; returns whether a frame callback was invoked
    ///
    /// The loop lock is held for the whole frame, so removing the callback
    /// waits for a frame in progress to finish.
    pub fn step(&self) -> bool {
        let mut guard = self.lock();
        let state = &mut *guard;
        state.ticks += 1;

        let Some(callback) = state.callback.as_mut() else {
            return false;
        };

        let mut scene = lock_scene(&self.scene);
        let mut frame = FrameContext {
            scene: &mut *scene,
            camera: &state.camera,
            renderer: &mut state.renderer,
        };
        callback(&mut frame);
        true
    }

    /// Frames submitted to the renderer
    pub fn frames_rendered(&self) -> u64 {
        self.lock().renderer.frames()
    }

    /// Loop ticks, including ones with no callback installed
    pub fn ticks(&self) -> u64 {
        self.lock().ticks
    }

    pub fn has_callback(&self) -> bool {
        self.lock().callback.is_some()
    }

    /// Visual roots present in the last rendered frame
    pub fn last_visuals(&self) -> usize {
        self.lock().renderer.last_visuals()
    }
}

/// Tracking engine with no camera hardware behind it
pub struct HeadlessEngine {
    options: HeadlessOptions,
    scene: SharedScene,
    frame_loop: FrameLoop,
}

impl HeadlessEngine {
    pub fn new(options: HeadlessOptions) -> Self {
        let scene = SceneGraph::shared();
        let frame_loop = FrameLoop::new(scene.clone());
        Self {
            options,
            scene,
            frame_loop,
        }
    }

    /// The scene container sessions render from
    pub fn scene(&self) -> SharedScene {
        self.scene.clone()
    }

    pub fn frame_loop(&self) -> FrameLoop {
        self.frame_loop.clone()
    }
}

#[async_trait]
impl TrackingEngine for HeadlessEngine {
    async fn create_session(
        &self,
        config: &TrackingConfig,
    ) -> Result<Box<dyn TrackingSession>, BoxError> {
        let metadata = tokio::fs::metadata(&config.marker_path)
            .await
            .map_err(|e| format!("marker file {}: {}", config.marker_path, e))?;
        if !metadata.is_file() || metadata.len() == 0 {
            return Err(format!("marker file {} is empty or not a file", config.marker_path).into());
        }
        if config.max_tracked_targets == 0 {
            return Err("max_tracked_targets must be at least 1".into());
        }

        info!(
            marker = %config.marker_path,
            max_targets = config.max_tracked_targets,
            "Opened headless tracking session"
        );

        Ok(Box::new(HeadlessSession {
            config: config.clone(),
            options: self.options.clone(),
            frame_loop: self.frame_loop.clone(),
            ticker: None,
        }))
    }
}

struct HeadlessSession {
    config: TrackingConfig,
    options: HeadlessOptions,
    frame_loop: FrameLoop,
    ticker: Option<JoinHandle<()>>,
}

#[async_trait]
impl TrackingSession for HeadlessSession {
    fn scene(&self) -> SharedScene {
        self.frame_loop.scene.clone()
    }

    fn add_anchor(&mut self, index: usize) -> Anchor {
        if index >= self.config.max_tracked_targets {
            warn!(
                anchor = index,
                max_targets = self.config.max_tracked_targets,
                "Anchor beyond tracker capacity will never be tracked"
            );
        }
        let group = lock_scene(&self.frame_loop.scene).spawn_anchor(index);
        Anchor { index, group }
    }

    async fn start(&mut self) -> Result<(), BoxError> {
        if !self.options.camera_available {
            return Err("camera unavailable (permission denied)".into());
        }

        if let Some(period) = self.options.frame_interval {
            let frame_loop = self.frame_loop.clone();
            self.ticker = Some(tokio::spawn(async move {
                let mut interval = tokio::time::interval(period);
                loop {
                    interval.tick().await;
                    frame_loop.step();
                }
            }));
        }

        debug!(interval = ?self.options.frame_interval, "Headless tracking started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), BoxError> {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        debug!("Headless tracking stopped");
        Ok(())
    }

    fn install_frame_callback(&mut self, callback: FrameCallback) {
        self.frame_loop.lock().callback = Some(callback);
    }

    fn remove_frame_callback(&mut self) -> Option<FrameCallback> {
        self.frame_loop.lock().callback.take()
    }
}

impl Drop for HeadlessSession {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::marker_file;
    use std::sync::atomic::{AtomicU64, Ordering};
    use tempfile::TempDir;

    fn manual() -> HeadlessOptions {
        HeadlessOptions {
            camera_available: true,
            frame_interval: None,
        }
    }

    #[tokio::test]
    async fn test_missing_marker_file_fails() {
        let engine = HeadlessEngine::new(manual());
        let config = TrackingConfig {
            marker_path: "/nonexistent/targets.mind".to_string(),
            max_tracked_targets: 2,
        };
        assert!(engine.create_session(&config).await.is_err());
    }

    #[tokio::test]
    async fn test_no_camera_fails_start() {
        let dir = TempDir::new().unwrap();
        let engine = HeadlessEngine::new(HeadlessOptions {
            camera_available: false,
            frame_interval: None,
        });
        let config = TrackingConfig {
            marker_path: marker_file(&dir),
            max_tracked_targets: 1,
        };

        let mut session = engine.create_session(&config).await.unwrap();
        let err = session.start().await.unwrap_err();
        assert!(err.to_string().contains("camera"));
    }

    #[tokio::test]
    async fn test_callback_runs_until_removed() {
        let dir = TempDir::new().unwrap();
        let engine = HeadlessEngine::new(manual());
        let frame_loop = engine.frame_loop();
        let config = TrackingConfig {
            marker_path: marker_file(&dir),
            max_tracked_targets: 2,
        };

        let mut session = engine.create_session(&config).await.unwrap();
        let anchor = session.add_anchor(1);
        assert_eq!(lock_scene(&session.scene()).anchor_group(1), Some(anchor.group));

        let calls = Arc::new(AtomicU64::new(0));
        let counter = calls.clone();
        session.install_frame_callback(Box::new(move |frame: &mut FrameContext<'_>| {
            counter.fetch_add(1, Ordering::SeqCst);
            frame.renderer.render(frame.scene, frame.camera).unwrap();
        }));
        session.start().await.unwrap();

        assert!(frame_loop.step());
        assert!(frame_loop.step());
        assert!(session.remove_frame_callback().is_some());
        assert!(!frame_loop.step());

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(frame_loop.frames_rendered(), 2);
        assert_eq!(frame_loop.ticks(), 3);
        session.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_ticker_drives_frames() {
        let dir = TempDir::new().unwrap();
        let engine = HeadlessEngine::new(HeadlessOptions {
            camera_available: true,
            frame_interval: Some(Duration::from_millis(10)),
        });
        let frame_loop = engine.frame_loop();
        let config = TrackingConfig {
            marker_path: marker_file(&dir),
            max_tracked_targets: 1,
        };

        let mut session = engine.create_session(&config).await.unwrap();
        session.install_frame_callback(Box::new(|frame: &mut FrameContext<'_>| {
            let _ = frame.renderer.render(frame.scene, frame.camera);
        }));
        session.start().await.unwrap();

        tokio::time::sleep(Duration::from_millis(55)).await;
        session.remove_frame_callback();
        session.stop().await.unwrap();

        let rendered = frame_loop.frames_rendered();
        assert!(rendered >= 3, "rendered {} frames", rendered);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(frame_loop.frames_rendered(), rendered);
    }
}
