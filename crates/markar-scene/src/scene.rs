//! Scene container - lights, anchor groups, and the visual roots under them

use bevy_ecs::entity::Entity;
use bevy_ecs::hierarchy::{ChildOf, Children};
use bevy_ecs::query::{Or, With};
use bevy_ecs::world::World;
use bevy_math::EulerRot;
use bevy_transform::components::Transform;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::debug;

use crate::types::{AnchorGroup, HemisphereLight, VisualNode};

/// Scene container shared between the tracker, its render loop, and the session
pub type SharedScene = Arc<Mutex<SceneGraph>>;

/// Lock a shared scene, recovering it if a frame callback panicked while holding it
pub fn lock_scene(scene: &SharedScene) -> MutexGuard<'_, SceneGraph> {
    scene.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    #[error("Anchor group {0:?} is not in the scene")]
    AnchorMissing(Entity),
    #[error("Entity {0:?} has no transform in the scene")]
    EntityMissing(Entity),
}

/// The scene graph the tracker renders from
///
/// Anchor groups are top-level nodes; visual roots are their children.
/// Index maps are kept alongside the world so lookups don't need queries.
pub struct SceneGraph {
    world: World,
    anchors: BTreeMap<usize, Entity>,
    visuals: Vec<Entity>,
    lights: Vec<Entity>,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        Self {
            world: World::new(),
            anchors: BTreeMap::new(),
            visuals: Vec::new(),
            lights: Vec::new(),
        }
    }

    /// Wrap a new scene for sharing with a render loop
    pub fn shared() -> SharedScene {
        Arc::new(Mutex::new(Self::new()))
    }

    pub fn add_hemisphere_light(&mut self, light: HemisphereLight) -> Entity {
        let entity = self.world.spawn(light).id();
        self.lights.push(entity);
        entity
    }

    pub fn light_count(&self) -> usize {
        self.lights.len()
    }

    /// Create the group node for an anchor index, or return the existing one
    pub fn spawn_anchor(&mut self, index: usize) -> Entity {
        if let Some(existing) = self.anchors.get(&index) {
            return *existing;
        }

        let entity = self
            .world
            .spawn((AnchorGroup { index }, Transform::IDENTITY))
            .id();
        self.anchors.insert(index, entity);
        debug!(anchor = index, "Spawned anchor group");
        entity
    }

    pub fn anchor_group(&self, index: usize) -> Option<Entity> {
        self.anchors.get(&index).copied()
    }

    pub fn anchor_count(&self) -> usize {
        self.anchors.len()
    }

    /// Anchor indexes present in the scene, ascending
    pub fn anchor_indexes(&self) -> Vec<usize> {
        self.anchors.keys().copied().collect()
    }

    /// Spawn a visual root with the given local transform as a child of `group`
    pub fn attach_visual(
        &mut self,
        group: Entity,
        visual: VisualNode,
        transform: Transform,
    ) -> Result<Entity, SceneError> {
        if self.world.get::<AnchorGroup>(group).is_none() {
            return Err(SceneError::AnchorMissing(group));
        }

        let entity = self.world.spawn((visual, transform, ChildOf(group))).id();
        self.visuals.push(entity);
        Ok(entity)
    }

    /// Direct children of a node (visual roots, for an anchor group)
    pub fn children_of(&self, parent: Entity) -> Vec<Entity> {
        self.world
            .get::<Children>(parent)
            .map(|children| children.to_vec())
            .unwrap_or_default()
    }

    pub fn visual_count(&self) -> usize {
        self.visuals.len()
    }

    pub fn visual(&self, entity: Entity) -> Option<&VisualNode> {
        self.world.get::<VisualNode>(entity)
    }

    pub fn transform(&self, entity: Entity) -> Option<Transform> {
        self.world.get::<Transform>(entity).copied()
    }

    /// Rotation around the vertical axis, in radians
    pub fn yaw(&self, entity: Entity) -> Option<f32> {
        self.transform(entity)
            .map(|t| t.rotation.to_euler(EulerRot::YXZ).0)
    }

    /// Rotate a node around its local vertical axis
    pub fn rotate_y(&mut self, entity: Entity, angle: f32) -> Result<(), SceneError> {
        let mut transform = self
            .world
            .get_mut::<Transform>(entity)
            .ok_or(SceneError::EntityMissing(entity))?;
        transform.rotate_y(angle);
        Ok(())
    }

    /// Remove every node (anchors, visual roots, lights)
    ///
    /// Entities are despawned one by one rather than wiping the world, so
    /// handles from a previous session never alias nodes spawned later.
    pub fn clear(&mut self) {
        let visuals = std::mem::take(&mut self.visuals);
        let anchors = std::mem::take(&mut self.anchors);
        let lights = std::mem::take(&mut self.lights);

        for entity in visuals
            .into_iter()
            .chain(anchors.into_values())
            .chain(lights)
        {
            if self.world.get_entity(entity).is_ok() {
                self.world.despawn(entity);
            }
        }
    }

    /// Number of scene nodes in the world, counted by component rather than index
    pub fn node_count(&mut self) -> usize {
        let mut query = self.world.query_filtered::<
            Entity,
            Or<(With<AnchorGroup>, With<VisualNode>, With<HemisphereLight>)>,
        >();
        query.iter(&self.world).count()
    }
}
