//! Anchor binding - attaches loaded models under their tracking anchors

use markar_core::AssetSpec;
use markar_scene::{Entity, SceneError, SceneGraph, VisualNode};
use tracing::debug;

use crate::engine::Anchor;
use crate::loader::LoadedAsset;

/// A model living in the scene under its anchor
#[derive(Debug, Clone, PartialEq)]
pub struct BoundAsset {
    pub spec: AssetSpec,
    pub visual_root: Entity,
}

impl BoundAsset {
    pub fn anchor_index(&self) -> usize {
        self.spec.anchor_index
    }
}

/// Applies an asset's scale and attaches its visual root to an anchor group
pub struct AnchorBinder;

impl AnchorBinder {
    /// Bind one loaded asset; called exactly once per successful load
    pub fn bind(
        scene: &mut SceneGraph,
        anchor: &Anchor,
        asset: LoadedAsset,
    ) -> Result<BoundAsset, SceneError> {
        let LoadedAsset { spec, visual } = asset;

        let mut transform = visual.transform;
        transform.scale = spec.scale.into();

        let node = VisualNode {
            source: spec.source_path.clone(),
            model: visual.model,
        };
        let visual_root = scene.attach_visual(anchor.group, node, transform)?;

        debug!(
            path = %spec.source_path,
            anchor = anchor.index,
            scale = ?spec.scale,
            "Bound asset to anchor"
        );

        Ok(BoundAsset { spec, visual_root })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::VisualRoot;
    use crate::testing::model_fixture;
    use markar_scene::Transform;

    fn loaded(path: &str, anchor: usize, scale: f32) -> LoadedAsset {
        LoadedAsset {
            spec: AssetSpec::new(path, anchor).with_uniform_scale(scale),
            visual: VisualRoot {
                model: model_fixture(path),
                transform: Transform::IDENTITY,
            },
        }
    }

    #[test]
    fn test_bind_applies_scale_and_parent() {
        let mut scene = SceneGraph::new();
        let anchor = Anchor {
            index: 1,
            group: scene.spawn_anchor(1),
        };

        let bound = AnchorBinder::bind(&mut scene, &anchor, loaded("ar18.glb", 1, 0.2)).unwrap();

        assert_eq!(bound.anchor_index(), 1);
        assert_eq!(scene.children_of(anchor.group), vec![bound.visual_root]);
        let transform = scene.transform(bound.visual_root).unwrap();
        assert_eq!(transform.scale.to_array(), [0.2, 0.2, 0.2]);
        assert_eq!(scene.visual(bound.visual_root).unwrap().source, "ar18.glb");
    }

    #[test]
    fn test_bind_to_cleared_anchor_fails() {
        let mut scene = SceneGraph::new();
        let anchor = Anchor {
            index: 0,
            group: scene.spawn_anchor(0),
        };
        scene.clear();

        let result = AnchorBinder::bind(&mut scene, &anchor, loaded("h2o.glb", 0, 1.0));
        assert!(matches!(result, Err(SceneError::AnchorMissing(_))));
        assert_eq!(scene.visual_count(), 0);
    }
}
