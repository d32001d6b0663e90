//! Tracking/rendering engine seam
//!
//! Marker detection, pose solving, and drawing belong to the engine. The
//! session controller only needs to open a session, ask it for anchors,
//! start and stop it, and hand it a per-frame callback.

use async_trait::async_trait;
use markar_scene::{CameraPose, Entity, Renderer, SceneGraph, SharedScene};

use crate::error::BoxError;

/// Parameters for opening a tracking session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackingConfig {
    /// Compiled marker file with the feature descriptors of every target
    pub marker_path: String,
    /// Markers tracked simultaneously; anchors at or above this index never fire
    pub max_tracked_targets: usize,
}

/// A tracker-owned coordinate frame following one marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    pub index: usize,
    /// Group node in the scene; content attached under it moves with the marker
    pub group: Entity,
}

/// Everything a frame callback may touch during one render tick
pub struct FrameContext<'a> {
    pub scene: &'a mut SceneGraph,
    pub camera: &'a CameraPose,
    pub renderer: &'a mut dyn Renderer,
}

/// Callback invoked by the engine's render loop once per tick
pub type FrameCallback = Box<dyn FnMut(&mut FrameContext<'_>) + Send>;

/// Factory for tracking sessions
#[async_trait]
pub trait TrackingEngine: Send + Sync {
    async fn create_session(
        &self,
        config: &TrackingConfig,
    ) -> Result<Box<dyn TrackingSession>, BoxError>;
}

/// One open tracking session: camera, detector, render loop, and scene
#[async_trait]
pub trait TrackingSession: Send {
    /// Scene container the engine renders from
    fn scene(&self) -> SharedScene;

    /// Create (or return) the anchor for a marker index
    fn add_anchor(&mut self, index: usize) -> Anchor;

    /// Acquire the camera and begin detection
    async fn start(&mut self) -> Result<(), BoxError>;

    /// Stop detection and release the camera
    async fn stop(&mut self) -> Result<(), BoxError>;

    /// Install the per-frame callback, replacing any previous one
    fn install_frame_callback(&mut self, callback: FrameCallback);

    /// Remove the per-frame callback
    ///
    /// Once this returns, the callback is never invoked again; a frame in
    /// progress completes first.
    fn remove_frame_callback(&mut self) -> Option<FrameCallback>;
}
