//! Session lifecycle: Idle -> Starting -> Running -> Stopping -> Idle
//!
//! The controller owns the single tracking session. Lifecycle work is
//! serialized behind an async mutex while the status lives in a watch
//! channel, so observers can read it (and see bind progress) mid-start.

use futures_util::stream::{FuturesUnordered, StreamExt};
use markar_core::{AssetSpec, ConfigError, Experience, SessionStatus};
use markar_scene::{lock_scene, HemisphereLight, SharedScene};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{watch, Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

use crate::binder::{AnchorBinder, BoundAsset};
use crate::engine::{TrackingConfig, TrackingEngine, TrackingSession};
use crate::error::{SessionError, TeardownError, TeardownStep};
use crate::frame::FrameUpdater;
use crate::loader::{AssetLoader, AssetSource};

/// Snapshot published on every status change
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusReport {
    pub status: SessionStatus,
    /// Anchors with a model attached, ascending
    pub bound_anchors: Vec<usize>,
    /// Source paths of assets that failed to load or bind
    pub failed_assets: Vec<String>,
    /// Last fatal start error, cleared by the next start
    pub error: Option<String>,
}

impl StatusReport {
    /// Operator-facing label: idle, loading, running, stopping, or failed
    pub fn label(&self) -> &'static str {
        match self.status {
            SessionStatus::Idle if self.error.is_some() => "failed",
            SessionStatus::Idle => "idle",
            SessionStatus::Starting => "loading",
            SessionStatus::Running => "running",
            SessionStatus::Stopping => "stopping",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedAsset {
    pub path: String,
    pub anchor_index: usize,
    pub reason: String,
}

/// Outcome of a successful start
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StartReport {
    /// Anchor indexes in the order their models were bound
    pub bound: Vec<usize>,
    pub failed: Vec<FailedAsset>,
}

/// Outcome of a stop
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StopReport {
    /// The stop arrived during a start, which rolled back instead
    pub aborted_start: bool,
    pub teardown_errors: Vec<String>,
}

#[derive(Default)]
struct ActiveSession {
    handle: Option<Box<dyn TrackingSession>>,
    bound: BTreeMap<usize, BoundAsset>,
}

pub struct SessionController {
    engine: Arc<dyn TrackingEngine>,
    loader: AssetLoader,
    experience: Experience,
    active: Mutex<ActiveSession>,
    status: watch::Sender<StatusReport>,
    abort: watch::Sender<bool>,
}

impl SessionController {
    /// Create a controller for a validated experience
    ///
    /// Fails when two assets share an anchor or any anchor is out of range.
    pub fn new(
        engine: Arc<dyn TrackingEngine>,
        source: Arc<dyn AssetSource>,
        experience: Experience,
    ) -> Result<Self, ConfigError> {
        experience.validate()?;
        let loader = AssetLoader::new(source).with_timeout(experience.loading.timeout());
        Ok(Self {
            engine,
            loader,
            experience,
            active: Mutex::new(ActiveSession::default()),
            status: watch::Sender::new(StatusReport::default()),
            abort: watch::Sender::new(false),
        })
    }

    pub fn status(&self) -> SessionStatus {
        self.status.borrow().status
    }

    pub fn report(&self) -> StatusReport {
        self.status.borrow().clone()
    }

    /// Receive every status change from now on
    pub fn subscribe(&self) -> watch::Receiver<StatusReport> {
        self.status.subscribe()
    }

    pub fn experience(&self) -> &Experience {
        &self.experience
    }

    pub fn tracking_config(&self) -> TrackingConfig {
        TrackingConfig {
            marker_path: self.experience.marker.path.clone(),
            max_tracked_targets: self.experience.max_tracked_targets(),
        }
    }

    /// Assets currently in the scene, by anchor index
    ///
    /// Waits for any lifecycle operation in progress.
    pub async fn bound_assets(&self) -> Vec<BoundAsset> {
        self.active.lock().await.bound.values().cloned().collect()
    }

    /// Bring the session from Idle to Running
    ///
    /// Individual asset failures are reported in the [`StartReport`]; only
    /// acquiring or starting the tracker fails the call, and the session is
    /// back at Idle with an empty scene when it does.
    pub async fn start(&self) -> Result<StartReport, SessionError> {
        let mut rejected = None;
        self.status.send_if_modified(|report| {
            if report.status != SessionStatus::Idle {
                rejected = Some(report.status);
                return false;
            }
            *report = StatusReport {
                status: SessionStatus::Starting,
                ..StatusReport::default()
            };
            self.abort.send_replace(false);
            true
        });
        if let Some(status) = rejected {
            return Err(SessionError::InvalidTransition { op: "start", status });
        }

        info!(
            marker = %self.experience.marker.path,
            assets = self.experience.assets.len(),
            "Starting AR session"
        );

        // Rolls back if this future is dropped before it finishes
        let mut guard = StartGuard {
            controller: self,
            active: None,
            armed: true,
        };
        let abort = self.abort.subscribe();
        let active = guard.active.insert(self.active.lock().await);
        let result = tokio::select! {
            biased;
            _ = abort_requested(abort) => Err(SessionError::Aborted),
            result = self.bring_up(&mut **active) => result,
        };

        match result {
            Ok(report) => {
                let bound_anchors: Vec<usize> = active.bound.keys().copied().collect();
                let failed_assets = report.failed.iter().map(|f| f.path.clone()).collect();
                self.status.send_replace(StatusReport {
                    status: SessionStatus::Running,
                    bound_anchors,
                    failed_assets,
                    error: None,
                });
                guard.disarm();
                info!(
                    bound = report.bound.len(),
                    failed = report.failed.len(),
                    "AR session running"
                );
                Ok(report)
            }
            Err(e) => {
                match &e {
                    SessionError::Aborted => info!("Start aborted, rolling back"),
                    _ => error!(error = %e, "Failed to start AR session, rolling back"),
                }
                self.teardown(&mut **active).await;
                let message = match &e {
                    SessionError::Aborted => None,
                    _ => Some(e.to_string()),
                };
                self.status.send_replace(StatusReport {
                    error: message,
                    ..StatusReport::default()
                });
                guard.disarm();
                Err(e)
            }
        }
    }

    async fn bring_up(&self, active: &mut ActiveSession) -> Result<StartReport, SessionError> {
        let config = self.tracking_config();
        let session = self
            .engine
            .create_session(&config)
            .await
            .map_err(SessionError::Acquire)?;
        let handle = active.handle.insert(session);
        let scene = handle.scene();

        lock_scene(&scene).add_hemisphere_light(HemisphereLight::from(&self.experience.lighting));

        let mut loads: FuturesUnordered<_> = self
            .experience
            .assets
            .iter()
            .map(|spec| async move { (spec, self.loader.load(spec).await) })
            .collect();

        let mut report = StartReport::default();
        while let Some((spec, result)) = loads.next().await {
            let loaded = match result {
                Ok(loaded) => loaded,
                Err(e) => {
                    warn!(
                        path = %e.path,
                        anchor = spec.anchor_index,
                        error = %e.cause,
                        "Asset failed to load, anchor stays empty"
                    );
                    report.failed.push(failure(spec, e.cause.to_string()));
                    self.publish_progress(&active.bound, &report);
                    continue;
                }
            };

            let anchor = handle.add_anchor(spec.anchor_index);
            match AnchorBinder::bind(&mut lock_scene(&scene), &anchor, loaded) {
                Ok(bound) => {
                    active.bound.insert(spec.anchor_index, bound);
                    report.bound.push(spec.anchor_index);
                }
                Err(e) => {
                    warn!(
                        path = %spec.source_path,
                        anchor = spec.anchor_index,
                        error = %e,
                        "Failed to bind asset"
                    );
                    report.failed.push(failure(spec, e.to_string()));
                }
            }
            self.publish_progress(&active.bound, &report);
        }

        if report.bound.is_empty() {
            warn!("No assets could be bound; the session will show nothing");
        }

        handle.start().await.map_err(SessionError::Start)?;
        handle.install_frame_callback(FrameUpdater::new(active.bound.values()).into_callback());
        Ok(report)
    }

    fn publish_progress(&self, bound: &BTreeMap<usize, BoundAsset>, report: &StartReport) {
        self.status.send_modify(|status| {
            status.bound_anchors = bound.keys().copied().collect();
            status.failed_assets = report.failed.iter().map(|f| f.path.clone()).collect();
        });
    }

    /// Bring the session from Running (or Starting) back to Idle
    ///
    /// A stop during Starting aborts the start and returns once the
    /// rollback has reached Idle.
    pub async fn stop(&self) -> Result<StopReport, SessionError> {
        let mut from = SessionStatus::Idle;
        self.status.send_if_modified(|report| {
            from = report.status;
            match report.status {
                SessionStatus::Running => {
                    report.status = SessionStatus::Stopping;
                    true
                }
                SessionStatus::Starting => {
                    self.abort.send_replace(true);
                    false
                }
                SessionStatus::Idle | SessionStatus::Stopping => false,
            }
        });

        match from {
            SessionStatus::Idle | SessionStatus::Stopping => {
                return Err(SessionError::InvalidTransition {
                    op: "stop",
                    status: from,
                });
            }
            SessionStatus::Starting => info!("Stop requested while starting, aborting start"),
            SessionStatus::Running => info!("Stopping AR session"),
        }

        let mut active = self.active.lock().await;
        let mut report = StopReport::default();

        if from == SessionStatus::Starting {
            // The start may have finished before it saw the abort
            let claimed = self.status.send_if_modified(|status| {
                if status.status == SessionStatus::Running {
                    status.status = SessionStatus::Stopping;
                    true
                } else {
                    false
                }
            });
            if !claimed {
                report.aborted_start = true;
                return Ok(report);
            }
        }

        let errors = self.teardown(&mut active).await;
        report.teardown_errors = errors.iter().map(ToString::to_string).collect();
        self.status.send_replace(StatusReport::default());

        info!(
            teardown_errors = report.teardown_errors.len(),
            "AR session stopped"
        );
        Ok(report)
    }

    /// Remove the frame callback, halt tracking, clear the scene
    ///
    /// Every step runs regardless of earlier failures.
    async fn teardown(&self, active: &mut ActiveSession) -> Vec<TeardownError> {
        let mut errors = Vec::new();

        if let Some(mut handle) = active.handle.take() {
            if handle.remove_frame_callback().is_some() {
                debug!("Frame callback removed");
            }

            if let Err(cause) = handle.stop().await {
                errors.push(TeardownError {
                    step: TeardownStep::StopTracking,
                    cause,
                });
            }

            errors.extend(clear_scene(&handle.scene()));
        }

        active.bound.clear();

        for e in &errors {
            warn!(step = %e.step, error = %e.cause, "Teardown step failed");
        }
        errors
    }
}

/// Rollback for a start whose future was dropped mid-flight
///
/// Runs synchronously: the callback is removed and the scene cleared before
/// the lifecycle lock is released, and the tracker is stopped on a
/// background task.
struct StartGuard<'a> {
    controller: &'a SessionController,
    active: Option<MutexGuard<'a, ActiveSession>>,
    armed: bool,
}

impl StartGuard<'_> {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for StartGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        warn!("Start cancelled before completing, rolling back");

        if let Some(active) = self.active.as_mut() {
            if let Some(mut handle) = active.handle.take() {
                handle.remove_frame_callback();
                if let Some(e) = clear_scene(&handle.scene()) {
                    warn!(step = %e.step, error = %e.cause, "Teardown step failed");
                }
                match tokio::runtime::Handle::try_current() {
                    Ok(runtime) => {
                        runtime.spawn(async move {
                            if let Err(e) = handle.stop().await {
                                warn!(error = %e, "Failed to stop abandoned tracking session");
                            }
                        });
                    }
                    Err(_) => warn!("No runtime left to stop the tracking session, dropping it"),
                }
            }
            active.bound.clear();
        }

        self.controller.status.send_replace(StatusReport::default());
    }
}

/// Clear the scene, recovering a lock poisoned by a panicked frame
fn clear_scene(scene: &SharedScene) -> Option<TeardownError> {
    let mut error = None;
    let mut graph = match scene.lock() {
        Ok(graph) => graph,
        Err(poisoned) => {
            error = Some(TeardownError {
                step: TeardownStep::ClearScene,
                cause: "scene lock poisoned by a panicked frame".into(),
            });
            poisoned.into_inner()
        }
    };
    graph.clear();
    drop(graph);
    scene.clear_poison();
    error
}

fn failure(spec: &AssetSpec, reason: String) -> FailedAsset {
    FailedAsset {
        path: spec.source_path.clone(),
        anchor_index: spec.anchor_index,
        reason,
    }
}

async fn abort_requested(mut abort: watch::Receiver<bool>) {
    let _ = abort.wait_for(|requested| *requested).await;
}
