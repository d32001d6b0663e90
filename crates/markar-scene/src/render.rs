//! Renderer seam
//!
//! The actual GPU renderer belongs to the tracking engine. The session only
//! ever submits whole frames through [`Renderer::render`].

use thiserror::Error;

use crate::camera::CameraPose;
use crate::scene::SceneGraph;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Frame submission failed: {0}")]
    SubmitFailed(String),
}

/// Submits one frame of the scene as seen from the camera
pub trait Renderer: Send {
    fn render(&mut self, scene: &SceneGraph, camera: &CameraPose) -> Result<(), RenderError>;
}

/// Renderer with no output surface that records what it was asked to draw
#[derive(Debug, Clone, Default)]
pub struct HeadlessRenderer {
    frames: u64,
    last_visuals: usize,
    last_anchors: usize,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames submitted so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Visual roots present in the last submitted frame
    pub fn last_visuals(&self) -> usize {
        self.last_visuals
    }

    pub fn last_anchors(&self) -> usize {
        self.last_anchors
    }
}

impl Renderer for HeadlessRenderer {
    fn render(&mut self, scene: &SceneGraph, _camera: &CameraPose) -> Result<(), RenderError> {
        self.frames += 1;
        self.last_visuals = scene.visual_count();
        self.last_anchors = scene.anchor_count();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_counts_frames() {
        let mut scene = SceneGraph::new();
        scene.spawn_anchor(0);
        scene.spawn_anchor(1);

        let mut renderer = HeadlessRenderer::new();
        let camera = CameraPose::default();
        renderer.render(&scene, &camera).unwrap();
        renderer.render(&scene, &camera).unwrap();

        assert_eq!(renderer.frames(), 2);
        assert_eq!(renderer.last_anchors(), 2);
        assert_eq!(renderer.last_visuals(), 0);
    }
}
