//! Per-frame update: idle spin for bound models, then frame submission

use markar_scene::Entity;
use tracing::{trace, warn};

use crate::binder::BoundAsset;
use crate::engine::{FrameCallback, FrameContext};
use crate::error::FrameUpdateError;

struct Spinner {
    anchor_index: usize,
    visual_root: Entity,
    spin_rate: f32,
    /// Set after the first failure so a missing node doesn't flood the log
    faulted: bool,
}

/// The render-loop callback installed while a session is running
///
/// It only knows about the assets that were bound when it was built, so
/// anchors whose model failed to load are never touched.
pub struct FrameUpdater {
    spinners: Vec<Spinner>,
    frames: u64,
}

impl FrameUpdater {
    pub fn new<'a>(bound: impl IntoIterator<Item = &'a BoundAsset>) -> Self {
        let spinners = bound
            .into_iter()
            .filter(|asset| asset.spec.spin_rate != 0.0)
            .map(|asset| Spinner {
                anchor_index: asset.spec.anchor_index,
                visual_root: asset.visual_root,
                spin_rate: asset.spec.spin_rate,
                faulted: false,
            })
            .collect();

        Self {
            spinners,
            frames: 0,
        }
    }

    /// Frames processed so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Run one tick. Errors are logged and absorbed so the loop keeps running.
    pub fn update(&mut self, frame: &mut FrameContext<'_>) {
        for spinner in &mut self.spinners {
            let result = frame
                .scene
                .rotate_y(spinner.visual_root, spinner.spin_rate)
                .map_err(|cause| FrameUpdateError {
                    anchor: spinner.anchor_index,
                    cause,
                });
            match result {
                Ok(()) => spinner.faulted = false,
                Err(e) => {
                    if !spinner.faulted {
                        warn!(error = %e, "Skipping frame update for asset");
                    }
                    spinner.faulted = true;
                }
            }
        }

        if let Err(e) = frame.renderer.render(frame.scene, frame.camera) {
            warn!(frame = self.frames, error = %e, "Frame submission failed");
        }

        self.frames += 1;
        trace!(frame = self.frames, "Frame updated");
    }

    /// Box the updater as an engine frame callback
    pub fn into_callback(mut self) -> FrameCallback {
        Box::new(move |frame: &mut FrameContext<'_>| self.update(frame))
    }
}
