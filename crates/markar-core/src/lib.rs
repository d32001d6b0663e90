//! Markar Core - Core types, experience configuration, and model validation
//!
//! This crate provides the foundational types for the markar system:
//! - Asset specifications binding a model file to a tracking anchor
//! - Experience configuration (marker file, loading policy, lighting, assets)
//! - glTF/GLB validation producing opaque model handles
//! - SHA-addressed caching for remotely fetched models

pub mod asset;
pub mod cache;
pub mod experience;
pub mod model;

pub use asset::{file_name, AssetSpec, SessionStatus};
pub use cache::{sha256_hex, CacheError, ModelCache};
pub use experience::{ConfigError, Experience, LightingConfig, LoadingConfig, MarkerConfig};
pub use model::{ModelData, ModelError, ModelFormat, ModelSummary};
