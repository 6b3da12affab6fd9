//! Mirrored working copy of the scene
//!
//! The exporter never touches the caller's scene. It works on a copy whose
//! node transforms are axis-inverted and whose root is guaranteed to be a
//! container: a leaf root is wrapped in a synthetic parent for the duration
//! of the export. The copy is owned by [`MirroredScene`] and released when
//! the guard drops, on success and error paths alike.

use tracing::debug;

use sceneport_scene::{NodeId, Scene, SceneNode};

use crate::axis::Axis;
use crate::error::{GltfExportError, GltfResult};

/// Name given to the synthetic parent of a leaf root
pub const WRAPPER_NAME: &str = "__sceneport_wrapper";

/// Wrap a leaf root in a synthetic parent
///
/// Returns the new scene and whether a wrapper was added. The wrapper is
/// always the last node, so [`strip_wrapper`] can undo it exactly.
pub fn wrap_if_leaf(mut scene: Scene) -> (Scene, bool) {
    let is_leaf = scene.nodes.get(scene.root.index()).is_some_and(SceneNode::is_leaf);
    if !is_leaf {
        return (scene, false);
    }
    let mut wrapper = SceneNode::new(WRAPPER_NAME);
    wrapper.children.push(scene.root);
    scene.nodes.push(wrapper);
    scene.root = NodeId(scene.nodes.len() - 1);
    (scene, true)
}

/// Reverse [`wrap_if_leaf`]
pub fn strip_wrapper(mut scene: Scene, wrapped: bool) -> Scene {
    if !wrapped {
        return scene;
    }
    if let Some(&inner) = scene.nodes.last().and_then(|w| w.children.first()) {
        scene.nodes.pop();
        scene.root = inner;
    }
    scene
}

fn mirror_transforms(scene: &mut Scene, axis: Axis) {
    for node in &mut scene.nodes {
        node.translation = axis.invert_vec3(node.translation);
        node.rotation = axis.invert_quat(node.rotation);
        node.scale = axis.invert_scale(node.scale);
    }
}

/// Scoped owner of the axis-inverted, possibly wrapped scene copy
#[derive(Debug)]
pub struct MirroredScene {
    scene: Scene,
    source_root: NodeId,
    wrapped: bool,
}

impl MirroredScene {
    /// Copy `source`, mirror it, and wrap a leaf root
    ///
    /// Fails when the resulting export root carries renderable geometry,
    /// since the root is never exported as a node.
    pub fn new(source: &Scene, axis: Axis) -> GltfResult<Self> {
        let mut copy = source.clone();
        mirror_transforms(&mut copy, axis);
        let (copy, wrapped) = wrap_if_leaf(copy);

        let guard = Self {
            scene: copy,
            source_root: source.root,
            wrapped,
        };

        let scene = guard.scene();
        if scene.has_mesh(scene.root) {
            return Err(GltfExportError::RootHasGeometry {
                name: scene.node(scene.root)?.name.clone(),
            });
        }

        debug!(nodes = scene.nodes.len(), wrapped, %axis, "Mirrored scene copy created");
        Ok(guard)
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Root of the exported hierarchy (the wrapper when wrapped)
    pub fn root(&self) -> NodeId {
        self.scene().root
    }

    /// The caller's root node, present in the copy under the same id
    pub fn source_root(&self) -> NodeId {
        self.source_root
    }

    pub fn was_wrapped(&self) -> bool {
        self.wrapped
    }

    /// Release the guard, handing back the copy without the wrapper
    pub fn into_scene(mut self) -> Scene {
        let scene = std::mem::replace(&mut self.scene, Scene::new(WRAPPER_NAME));
        let wrapped = std::mem::take(&mut self.wrapped);
        strip_wrapper(scene, wrapped)
    }
}

impl Drop for MirroredScene {
    fn drop(&mut self) {
        debug!(nodes = self.scene.nodes.len(), "Mirrored scene copy released");
    }
}
