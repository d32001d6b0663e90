//! Markar Session - AR session lifecycle
//!
//! Loads the configured models concurrently, binds each one that loads to
//! its tracking anchor, and drives the per-frame update while the session
//! runs. The tracker and renderer sit behind the [`engine`] traits; a
//! [`headless`] implementation is provided for servers and tests.

pub mod binder;
pub mod controller;
pub mod engine;
pub mod error;
pub mod frame;
pub mod headless;
pub mod loader;

#[cfg(test)]
mod testing;

pub use binder::{AnchorBinder, BoundAsset};
pub use controller::{FailedAsset, SessionController, StartReport, StatusReport, StopReport};
pub use engine::{
    Anchor, FrameCallback, FrameContext, TrackingConfig, TrackingEngine, TrackingSession,
};
pub use error::{
    BoxError, FrameUpdateError, LoadError, SessionError, TeardownError, TeardownStep,
};
pub use frame::FrameUpdater;
pub use headless::{FrameLoop, HeadlessEngine, HeadlessOptions};
pub use loader::{AssetLoader, AssetSource, FsAssetSource, LoadedAsset, VisualRoot};
