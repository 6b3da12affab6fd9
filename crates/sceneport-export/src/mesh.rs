//! Mesh deduplication and encoding
//!
//! Renderers that draw the same geometry with the same material list are
//! interchangeable and exported once. Each unique mesh is written as one
//! primitive per submesh, either sharing a single set of vertex streams or,
//! with `divide_vertex_buffer`, with compacted streams per primitive.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use sceneport_core::{Vec3, Vec4};
use sceneport_scene::{MaterialId, MeshGeometry, MeshId, NodeId, Renderer, RendererId, Scene};

use crate::axis::Axis;
use crate::buffer::{BufferTarget, BufferWriter};
use crate::error::{GltfExportError, GltfResult};
use crate::gltf::{Mesh, MeshExtras, Primitive, MODE_TRIANGLES};
use crate::material::material_index;

/// Mesh encoding switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeshExportSettings {
    /// Drop normal and tangent deltas from morph targets
    pub export_only_blend_shape_position: bool,
    /// Write morph target deltas as sparse accessors
    pub use_sparse_accessor_for_morph_target: bool,
    /// Give every primitive its own compacted vertex streams
    pub divide_vertex_buffer: bool,
}

/// One renderer drawing a geometry with an ordered material list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshWithMaterials {
    pub node: NodeId,
    pub renderer: RendererId,
    pub mesh: MeshId,
    pub materials: Vec<Option<MaterialId>>,
}

impl MeshWithMaterials {
    /// Same geometry and same material sequence
    pub fn is_same(&self, mesh: MeshId, materials: &[Option<MaterialId>]) -> bool {
        self.mesh == mesh && self.materials == materials
    }
}

/// An encoded mesh plus its blend-shape remap (original index to target index)
#[derive(Debug, Clone, PartialEq)]
pub struct UniqueMeshExport {
    pub mesh: Mesh,
    pub blend_shape_map: BTreeMap<usize, usize>,
}

/// Renderers of active `nodes` whose geometry has vertices, in node order
pub fn collect_instances(scene: &Scene, nodes: &[NodeId]) -> GltfResult<Vec<MeshWithMaterials>> {
    let mut instances = Vec::new();
    for &node_id in nodes {
        let node = scene.node(node_id)?;
        if !node.active {
            continue;
        }
        let Some(renderer_id) = node.renderer else {
            continue;
        };
        let renderer = scene.renderer(renderer_id)?;
        let Some(mesh_id) = renderer.mesh else {
            continue;
        };
        let geometry = scene.mesh(mesh_id)?;
        if !geometry.has_vertices() {
            warn!(node = %node.name, mesh = %geometry.name, "Mesh has no vertices, not exported");
            continue;
        }
        instances.push(MeshWithMaterials {
            node: node_id,
            renderer: renderer_id,
            mesh: mesh_id,
            materials: renderer.materials.clone(),
        });
    }
    Ok(instances)
}

/// Keep the first instance of every geometry + material-list class
pub fn deduplicate(instances: &[MeshWithMaterials]) -> Vec<MeshWithMaterials> {
    let mut unique: Vec<MeshWithMaterials> = Vec::new();
    for instance in instances {
        if find_same(&unique, instance.mesh, &instance.materials).is_none() {
            unique.push(instance.clone());
        }
    }
    unique
}

/// Export index of the class `mesh` + `materials` belongs to
pub fn find_same(
    unique: &[MeshWithMaterials],
    mesh: MeshId,
    materials: &[Option<MaterialId>],
) -> Option<usize> {
    unique.iter().position(|u| u.is_same(mesh, materials))
}

fn vec3s(values: &[Vec3], axis: Axis) -> Vec<[f32; 3]> {
    values.iter().map(|v| axis.invert_vec3(*v).to_array()).collect()
}

fn vec4s(values: &[Vec4], axis: Axis) -> Vec<[f32; 4]> {
    values.iter().map(|v| axis.invert_vec4(*v).to_array()).collect()
}

/// Blend shapes that move something in the streams being exported
fn kept_blend_shapes(geometry: &MeshGeometry, settings: &MeshExportSettings) -> Vec<usize> {
    geometry
        .blend_shapes
        .iter()
        .enumerate()
        .filter(|(_, shape)| {
            if settings.export_only_blend_shape_position {
                !shape.position_deltas.iter().all(Vec3::is_zero)
            } else {
                !shape.is_empty()
            }
        })
        .map(|(i, _)| i)
        .collect()
}

fn write_attributes(
    writer: &mut BufferWriter,
    geometry: &MeshGeometry,
    bone_slots: Option<&[usize]>,
    axis: Axis,
) -> GltfResult<BTreeMap<String, usize>> {
    let mut attributes = BTreeMap::new();
    let target = BufferTarget::ArrayBuffer;

    let positions = vec3s(&geometry.positions, axis);
    attributes.insert("POSITION".to_string(), writer.push_accessor_with_bounds(&positions, target)?);

    if !geometry.normals.is_empty() {
        let normals = vec3s(&geometry.normals, axis);
        attributes.insert("NORMAL".to_string(), writer.push_accessor(&normals, target)?);
    }
    if !geometry.tangents.is_empty() {
        let tangents = vec4s(&geometry.tangents, axis);
        attributes.insert("TANGENT".to_string(), writer.push_accessor(&tangents, target)?);
    }
    if !geometry.uvs.is_empty() {
        let uvs: Vec<[f32; 2]> = geometry.uvs.iter().map(|uv| uv.to_array()).collect();
        attributes.insert("TEXCOORD_0".to_string(), writer.push_accessor(&uvs, target)?);
    }
    if !geometry.colors.is_empty() {
        let colors: Vec<[f32; 4]> = geometry.colors.iter().map(|c| c.to_array()).collect();
        attributes.insert("COLOR_0".to_string(), writer.push_accessor(&colors, target)?);
    }

    if let Some(slots) = bone_slots.filter(|_| geometry.has_bone_weights()) {
        let mut joints = Vec::with_capacity(geometry.bone_weights.len());
        for bw in &geometry.bone_weights {
            let mut remapped = [0u16; 4];
            for (k, (&bone, &weight)) in bw.indices.iter().zip(bw.weights.iter()).enumerate() {
                if weight == 0.0 {
                    continue;
                }
                let slot = slots.get(bone as usize).copied().ok_or_else(|| {
                    GltfExportError::consistency(format!(
                        "mesh '{}' weights bone {} outside its {} bones",
                        geometry.name,
                        bone,
                        slots.len()
                    ))
                })?;
                remapped[k] = u16::try_from(slot).map_err(|_| {
                    GltfExportError::consistency(format!("joint {slot} does not fit JOINTS_0"))
                })?;
            }
            joints.push(remapped);
        }
        let weights: Vec<[f32; 4]> = geometry.bone_weights.iter().map(|bw| bw.weights).collect();
        attributes.insert("JOINTS_0".to_string(), writer.push_accessor(&joints, target)?);
        attributes.insert("WEIGHTS_0".to_string(), writer.push_accessor(&weights, target)?);
    }

    Ok(attributes)
}

fn write_delta(
    writer: &mut BufferWriter,
    deltas: &[[f32; 3]],
    sparse: bool,
) -> GltfResult<usize> {
    if !sparse {
        return writer.push_accessor_with_bounds(deltas, BufferTarget::ArrayBuffer);
    }
    let (indices, values): (Vec<u32>, Vec<[f32; 3]>) = deltas
        .iter()
        .enumerate()
        .filter(|(_, d)| **d != [0.0; 3])
        .map(|(i, d)| (i as u32, *d))
        .unzip();
    if indices.is_empty() {
        return Ok(writer.push_zero_accessor::<[f32; 3]>(deltas.len()));
    }
    writer.push_sparse_accessor(deltas.len(), &indices, &values)
}

fn write_targets(
    writer: &mut BufferWriter,
    geometry: &MeshGeometry,
    kept: &[usize],
    settings: &MeshExportSettings,
    axis: Axis,
) -> GltfResult<Vec<BTreeMap<String, usize>>> {
    let sparse = settings.use_sparse_accessor_for_morph_target;
    let mut targets = Vec::with_capacity(kept.len());
    for &index in kept {
        let shape = &geometry.blend_shapes[index];
        let mut target = BTreeMap::new();

        let positions = if shape.position_deltas.is_empty() {
            vec![[0.0; 3]; geometry.vertex_count()]
        } else {
            vec3s(&shape.position_deltas, axis)
        };
        target.insert("POSITION".to_string(), write_delta(writer, &positions, sparse)?);

        if !settings.export_only_blend_shape_position {
            if !shape.normal_deltas.is_empty() {
                let normals = vec3s(&shape.normal_deltas, axis);
                target.insert("NORMAL".to_string(), write_delta(writer, &normals, sparse)?);
            }
            if !shape.tangent_deltas.is_empty() {
                let tangents = vec3s(&shape.tangent_deltas, axis);
                target.insert("TANGENT".to_string(), write_delta(writer, &tangents, sparse)?);
            }
        }
        targets.push(target);
    }
    Ok(targets)
}

fn write_indices(
    writer: &mut BufferWriter,
    indices: &[u32],
    vertex_count: usize,
    axis: Axis,
) -> GltfResult<usize> {
    let mut ordered = indices.to_vec();
    if axis.flips_handedness() {
        for triangle in ordered.chunks_exact_mut(3) {
            triangle.swap(1, 2);
        }
    }
    if vertex_count <= u16::MAX as usize {
        let narrow: Vec<u16> = ordered.iter().map(|&i| i as u16).collect();
        writer.push_accessor(&narrow, BufferTarget::ElementArrayBuffer)
    } else {
        writer.push_accessor(&ordered, BufferTarget::ElementArrayBuffer)
    }
}

fn primitive_material(
    renderer: &Renderer,
    submesh: usize,
    materials: &[MaterialId],
) -> GltfResult<Option<usize>> {
    match renderer.materials.get(submesh).copied().flatten() {
        Some(id) => material_index(materials, id).map(Some),
        None => Ok(None),
    }
}

/// Encode one unique mesh
///
/// `materials` is the collected material list; primitives refer to it by
/// index, so it must be complete before any mesh is encoded.
pub fn export_mesh(
    writer: &mut BufferWriter,
    geometry: &MeshGeometry,
    renderer: &Renderer,
    materials: &[MaterialId],
    settings: &MeshExportSettings,
    axis: Axis,
) -> GltfResult<UniqueMeshExport> {
    let bone_slots = renderer.skin.as_ref().map(|skin| skin.unique_bones().1);
    let bone_slots = bone_slots.as_deref();
    let kept = kept_blend_shapes(geometry, settings);
    let dropped = geometry.blend_shapes.len() - kept.len();
    if dropped > 0 {
        debug!(mesh = %geometry.name, dropped, "Dropped blend shapes without deltas");
    }

    let mut primitives = Vec::new();
    if settings.divide_vertex_buffer {
        for (i, submesh) in geometry.submeshes.iter().enumerate() {
            if submesh.indices.is_empty() {
                continue;
            }
            let Some(part) = geometry.split_submesh(i) else {
                continue;
            };
            let attributes = write_attributes(writer, &part, bone_slots, axis)?;
            let targets = write_targets(writer, &part, &kept, settings, axis)?;
            let indices = write_indices(writer, &part.submeshes[0].indices, part.vertex_count(), axis)?;
            primitives.push(Primitive {
                attributes,
                indices: Some(indices),
                material: primitive_material(renderer, i, materials)?,
                mode: Some(MODE_TRIANGLES),
                targets,
            });
        }
        if primitives.is_empty() {
            let attributes = write_attributes(writer, geometry, bone_slots, axis)?;
            let targets = write_targets(writer, geometry, &kept, settings, axis)?;
            primitives.push(Primitive {
                attributes,
                mode: Some(MODE_TRIANGLES),
                targets,
                ..Default::default()
            });
        }
    } else {
        let attributes = write_attributes(writer, geometry, bone_slots, axis)?;
        let targets = write_targets(writer, geometry, &kept, settings, axis)?;
        for (i, submesh) in geometry.submeshes.iter().enumerate() {
            if submesh.indices.is_empty() {
                continue;
            }
            let indices = write_indices(writer, &submesh.indices, geometry.vertex_count(), axis)?;
            primitives.push(Primitive {
                attributes: attributes.clone(),
                indices: Some(indices),
                material: primitive_material(renderer, i, materials)?,
                mode: Some(MODE_TRIANGLES),
                targets: targets.clone(),
            });
        }
        if primitives.is_empty() {
            primitives.push(Primitive {
                attributes,
                mode: Some(MODE_TRIANGLES),
                targets,
                ..Default::default()
            });
        }
    }

    let target_names: Vec<String> = kept
        .iter()
        .map(|&i| geometry.blend_shapes[i].name.clone())
        .collect();
    let blend_shape_map = kept
        .iter()
        .enumerate()
        .map(|(exported, &original)| (original, exported))
        .collect();

    debug!(
        mesh = %geometry.name,
        vertices = geometry.vertex_count(),
        primitives = primitives.len(),
        targets = target_names.len(),
        "Mesh encoded"
    );

    Ok(UniqueMeshExport {
        mesh: Mesh {
            name: Some(geometry.name.clone()),
            primitives,
            extras: (!target_names.is_empty()).then_some(MeshExtras { target_names }),
        },
        blend_shape_map,
    })
}
