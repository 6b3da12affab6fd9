//! Node flattening, node list and skins

use std::collections::HashMap;

use tracing::{debug, warn};

use sceneport_scene::{NodeId, Scene};

use crate::axis::Axis;
use crate::buffer::{BufferTarget, BufferWriter};
use crate::error::{GltfExportError, GltfResult};
use crate::gltf::{Node, Skin};
use crate::mesh::{find_same, MeshWithMaterials};

/// Pre-order node list below `scene.root`, the root itself excluded
pub fn flatten(scene: &Scene) -> Vec<NodeId> {
    scene.traverse(scene.root).skip(1).collect()
}

/// Scene node id to export index
#[derive(Debug, Clone, Default)]
pub struct NodeIndex {
    map: HashMap<NodeId, usize>,
}

impl NodeIndex {
    pub fn new(nodes: &[NodeId]) -> Self {
        Self {
            map: nodes.iter().enumerate().map(|(i, id)| (*id, i)).collect(),
        }
    }

    pub fn get(&self, id: NodeId) -> Option<usize> {
        self.map.get(&id).copied()
    }

    /// Export index of a node that must have been flattened
    pub fn resolve(&self, id: NodeId, what: &str) -> GltfResult<usize> {
        self.get(id).ok_or_else(|| {
            GltfExportError::consistency(format!("{what} refers to node {id}, which is not exported"))
        })
    }
}

/// `node.mesh` is signed so that -1 can mark meshes without vertices
fn mesh_reference(index: usize) -> GltfResult<i32> {
    i32::try_from(index)
        .map_err(|_| GltfExportError::consistency(format!("mesh index {index} does not fit a node reference")))
}

/// One glTF node per flattened node, with mesh references resolved
///
/// Skins are attached afterwards by [`build_skins`].
pub fn build_nodes(
    scene: &Scene,
    nodes: &[NodeId],
    index: &NodeIndex,
    unique: &[MeshWithMaterials],
) -> GltfResult<Vec<Node>> {
    nodes
        .iter()
        .map(|&id| {
            let source = scene.node(id)?;
            let children = source
                .children
                .iter()
                .map(|&child| index.resolve(child, &source.name))
                .collect::<GltfResult<Vec<_>>>()?;

            let mut node = Node {
                name: Some(source.name.clone()),
                children,
                translation: Some(source.translation.to_array()),
                rotation: Some(source.rotation.to_array()),
                scale: Some(source.scale.to_array()),
                ..Default::default()
            };

            if source.active {
                if let Some(renderer) = scene.renderer_of(id)? {
                    if let Some(mesh_id) = renderer.mesh {
                        node.mesh = match find_same(unique, mesh_id, &renderer.materials) {
                            Some(mesh) => Some(mesh_reference(mesh)?),
                            None if !scene.mesh(mesh_id)?.has_vertices() => Some(-1),
                            None => {
                                return Err(GltfExportError::MeshNotFound {
                                    node: source.name.clone(),
                                })
                            }
                        };
                    }
                }
            }

            Ok(node)
        })
        .collect()
}

/// Export indices of the root's direct children
pub fn scene_roots(scene: &Scene, index: &NodeIndex) -> GltfResult<Vec<usize>> {
    scene
        .node(scene.root)?
        .children
        .iter()
        .map(|&child| index.resolve(child, "scene root"))
        .collect()
}

/// One skin per unique skinned mesh, attached to every node drawing it
pub fn build_skins(
    scene: &Scene,
    nodes: &[NodeId],
    index: &NodeIndex,
    unique: &[MeshWithMaterials],
    writer: &mut BufferWriter,
    axis: Axis,
    gltf_nodes: &mut [Node],
) -> GltfResult<Vec<Skin>> {
    let mut skins = Vec::new();

    for (mesh_index, instance) in unique.iter().enumerate() {
        let renderer = scene.renderer(instance.renderer)?;
        let Some(binding) = &renderer.skin else {
            continue;
        };
        let geometry = scene.mesh(instance.mesh)?;
        if !geometry.has_bone_weights() {
            continue;
        }

        let (bones, slots) = binding.unique_bones();
        let joints = bones
            .iter()
            .map(|&bone| index.resolve(bone, "skin joint"))
            .collect::<GltfResult<Vec<_>>>()?;

        let mut matrices = Vec::with_capacity(bones.len());
        for joint in 0..bones.len() {
            let pose = slots
                .iter()
                .position(|&slot| slot == joint)
                .and_then(|slot| geometry.bind_poses.get(slot))
                .ok_or_else(|| {
                    GltfExportError::consistency(format!("mesh '{}' lacks a bind pose for joint {joint}", geometry.name))
                })?;
            matrices.push(axis.invert_mat4(*pose).to_flat());
        }
        let inverse_bind_matrices = writer.push_accessor(&matrices, BufferTarget::None)?;

        let skeleton = match binding.root_bone {
            Some(root) => {
                let resolved = index.get(root);
                if resolved.is_none() {
                    warn!(mesh = %geometry.name, root = %root, "Skin root bone is not exported");
                }
                resolved
            }
            None => None,
        };

        let skin_index = skins.len();
        skins.push(Skin {
            name: Some(geometry.name.clone()),
            inverse_bind_matrices: Some(inverse_bind_matrices),
            joints,
            skeleton,
        });
        debug!(mesh = %geometry.name, joints = bones.len(), "Skin built");

        for (export_index, &id) in nodes.iter().enumerate() {
            let node = scene.node(id)?;
            let Some(renderer_id) = node.renderer.filter(|_| node.active) else {
                continue;
            };
            let other = scene.renderer(renderer_id)?;
            let Some(mesh_id) = other.mesh else {
                continue;
            };
            if find_same(unique, mesh_id, &other.materials) != Some(mesh_index) {
                continue;
            }
            if renderer_id == instance.renderer || other.skin.as_ref() == Some(binding) {
                gltf_nodes[export_index].skin = Some(skin_index);
            } else {
                warn!(node = %node.name, "Shared mesh is driven by a different skeleton, exported unskinned");
            }
        }
    }

    Ok(skins)
}
