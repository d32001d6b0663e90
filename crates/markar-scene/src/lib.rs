//! Markar Scene - Scene container shared by the tracker, the renderer, and the session
//!
//! The scene is a `bevy_ecs` world holding anchor group nodes (one per
//! tracked marker), the visual roots attached under them, and baseline
//! lighting. Rendering itself happens behind the [`render::Renderer`] trait.

pub mod camera;
pub mod render;
pub mod scene;
pub mod types;

pub use bevy_ecs::entity::Entity;
pub use bevy_transform::components::Transform;
pub use camera::CameraPose;
pub use render::{HeadlessRenderer, RenderError, Renderer};
pub use scene::{lock_scene, SceneError, SceneGraph, SharedScene};
pub use types::{AnchorGroup, HemisphereLight, VisualNode};
