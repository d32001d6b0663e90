//! Session error taxonomy
//!
//! Only [`SessionError::Acquire`] and [`SessionError::Start`] abort a start
//! attempt visibly. Load, frame, and teardown failures are absorbed where
//! they happen and only reduce what ends up on screen.

use markar_core::SessionStatus;
use markar_scene::SceneError;
use std::time::Duration;
use thiserror::Error;

/// Boxed cause reported by a collaborator (tracker, renderer, asset source)
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// One asset failed to load; siblings are unaffected
#[derive(Error, Debug)]
#[error("Failed to load asset {path}: {cause}")]
pub struct LoadError {
    pub path: String,
    #[source]
    pub cause: BoxError,
}

impl LoadError {
    pub fn new(path: impl Into<String>, cause: impl Into<BoxError>) -> Self {
        Self {
            path: path.into(),
            cause: cause.into(),
        }
    }

    pub fn timed_out(path: impl Into<String>, limit: Duration) -> Self {
        Self::new(path, format!("timed out after {:?}", limit))
    }
}

/// A lifecycle request failed
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Failed to acquire tracking session: {0}")]
    Acquire(#[source] BoxError),
    #[error("Failed to start tracking (camera unavailable?): {0}")]
    Start(#[source] BoxError),
    #[error("Start was aborted by a stop request")]
    Aborted,
    #[error("Cannot {op} while session is {status}")]
    InvalidTransition {
        op: &'static str,
        status: SessionStatus,
    },
}

impl SessionError {
    /// Whether the error came from the tracking collaborator rather than the caller
    pub fn is_fatal_start(&self) -> bool {
        matches!(self, SessionError::Acquire(_) | SessionError::Start(_))
    }
}

/// A bound asset could not be updated this frame; the frame still renders
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Frame update skipped for anchor {anchor}: {cause}")]
pub struct FrameUpdateError {
    pub anchor: usize,
    #[source]
    pub cause: SceneError,
}

/// Teardown step that produced a [`TeardownError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownStep {
    StopTracking,
    ClearScene,
}

impl std::fmt::Display for TeardownStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TeardownStep::StopTracking => "stop tracking",
            TeardownStep::ClearScene => "clear scene",
        };
        f.write_str(name)
    }
}

/// Best-effort teardown step failure; never prevents reaching idle
#[derive(Error, Debug)]
#[error("Teardown step '{step}' failed: {cause}")]
pub struct TeardownError {
    pub step: TeardownStep,
    #[source]
    pub cause: BoxError,
}
