//! Mesh geometry data structures

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use sceneport_core::{BoundingBox, Error, Mat4x4, Result, Vec2, Vec3, Vec4};

/// Shared mesh geometry, referenced by one or more renderers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshGeometry {
    /// Mesh name
    pub name: String,
    /// Vertex positions
    pub positions: Vec<Vec3>,
    /// Vertex normals (empty or one per vertex)
    #[serde(default)]
    pub normals: Vec<Vec3>,
    /// Vertex tangents, `w` carries handedness (empty or one per vertex)
    #[serde(default)]
    pub tangents: Vec<Vec4>,
    /// First UV channel (empty or one per vertex)
    ///
    /// Expected in glTF's convention, origin at the top-left of the image
    /// with `v` pointing down. Exported as `TEXCOORD_0` unchanged.
    #[serde(default)]
    pub uvs: Vec<Vec2>,
    /// Vertex colors (empty or one per vertex)
    #[serde(default)]
    pub colors: Vec<Vec4>,
    /// Skin weights, indices point into the renderer's bone list
    #[serde(default)]
    pub bone_weights: Vec<BoneWeight>,
    /// Bind pose per renderer bone
    #[serde(default)]
    pub bind_poses: Vec<Mat4x4>,
    /// Triangle lists, one per material slot
    pub submeshes: Vec<SubMesh>,
    /// Morph targets
    #[serde(default)]
    pub blend_shapes: Vec<BlendShape>,
}

/// Triangle list drawn with one material slot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubMesh {
    pub indices: Vec<u32>,
}

impl SubMesh {
    pub fn new(indices: Vec<u32>) -> Self {
        Self { indices }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Up to four bone influences for one vertex
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoneWeight {
    pub indices: [u16; 4],
    pub weights: [f32; 4],
}

impl BoneWeight {
    pub fn single(bone: u16) -> Self {
        Self {
            indices: [bone, 0, 0, 0],
            weights: [1.0, 0.0, 0.0, 0.0],
        }
    }
}

/// Named vertex-delta morph target
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlendShape {
    pub name: String,
    pub position_deltas: Vec<Vec3>,
    #[serde(default)]
    pub normal_deltas: Vec<Vec3>,
    #[serde(default)]
    pub tangent_deltas: Vec<Vec3>,
}

impl BlendShape {
    /// True when no delta stream moves any vertex
    pub fn is_empty(&self) -> bool {
        self.position_deltas.iter().all(Vec3::is_zero)
            && self.normal_deltas.iter().all(Vec3::is_zero)
            && self.tangent_deltas.iter().all(Vec3::is_zero)
    }
}

impl MeshGeometry {
    /// Create a new empty mesh
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Get vertex count
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Meshes without vertices are never exported
    pub fn has_vertices(&self) -> bool {
        !self.positions.is_empty()
    }

    /// Get triangle count across all submeshes
    pub fn triangle_count(&self) -> usize {
        self.submeshes.iter().map(SubMesh::triangle_count).sum()
    }

    /// Check if mesh has bone weights (skinned)
    pub fn has_bone_weights(&self) -> bool {
        !self.bone_weights.is_empty()
    }

    /// Calculate bounding box from positions
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(&self.positions)
    }

    /// Highest bone index referenced by any weight with non-zero influence
    pub fn max_bone_index(&self) -> Option<u16> {
        self.bone_weights
            .iter()
            .flat_map(|bw| bw.indices.iter().zip(bw.weights.iter()))
            .filter(|(_, w)| **w != 0.0)
            .map(|(&i, _)| i)
            .max()
    }

    /// Check attribute stream lengths and index ranges
    pub fn validate(&self) -> Result<()> {
        let expected = self.vertex_count();
        let check = |attribute: &str, found: usize| -> Result<()> {
            if found != 0 && found != expected {
                return Err(Error::AttributeLength {
                    mesh: self.name.clone(),
                    attribute: attribute.to_string(),
                    expected,
                    found,
                });
            }
            Ok(())
        };

        check("normals", self.normals.len())?;
        check("tangents", self.tangents.len())?;
        check("uvs", self.uvs.len())?;
        check("colors", self.colors.len())?;
        check("bone_weights", self.bone_weights.len())?;
        for shape in &self.blend_shapes {
            check(&format!("blend shape '{}' positions", shape.name), shape.position_deltas.len())?;
            check(&format!("blend shape '{}' normals", shape.name), shape.normal_deltas.len())?;
            check(&format!("blend shape '{}' tangents", shape.name), shape.tangent_deltas.len())?;
        }

        for submesh in &self.submeshes {
            if submesh.indices.len() % 3 != 0 {
                return Err(Error::invalid_data(format!(
                    "mesh '{}' has a submesh with {} indices, not a triangle list",
                    self.name,
                    submesh.indices.len()
                )));
            }
            if let Some(&index) = submesh.indices.iter().find(|&&i| i as usize >= expected) {
                return Err(Error::IndexOutOfRange {
                    mesh: self.name.clone(),
                    index,
                    vertex_count: expected,
                });
            }
        }

        Ok(())
    }

    /// Extract one submesh into standalone geometry
    ///
    /// Vertices are compacted in first-use order and every per-vertex
    /// stream, blend shapes included, is carried along. Bind poses are
    /// shared unchanged.
    pub fn split_submesh(&self, submesh_index: usize) -> Option<MeshGeometry> {
        let submesh = self.submeshes.get(submesh_index)?;

        let mut index_map: HashMap<u32, u32> = HashMap::new();
        let mut remap = Vec::new();
        let mut indices = Vec::with_capacity(submesh.indices.len());

        for &idx in &submesh.indices {
            let new_idx = *index_map.entry(idx).or_insert_with(|| {
                remap.push(idx as usize);
                (remap.len() - 1) as u32
            });
            indices.push(new_idx);
        }

        fn pick<T: Copy>(source: &[T], remap: &[usize]) -> Vec<T> {
            if source.is_empty() {
                return Vec::new();
            }
            remap.iter().map(|&i| source[i]).collect()
        }

        Some(MeshGeometry {
            name: format!("{}_{}", self.name, submesh_index),
            positions: pick(&self.positions, &remap),
            normals: pick(&self.normals, &remap),
            tangents: pick(&self.tangents, &remap),
            uvs: pick(&self.uvs, &remap),
            colors: pick(&self.colors, &remap),
            bone_weights: pick(&self.bone_weights, &remap),
            bind_poses: self.bind_poses.clone(),
            submeshes: vec![SubMesh::new(indices)],
            blend_shapes: self
                .blend_shapes
                .iter()
                .map(|shape| BlendShape {
                    name: shape.name.clone(),
                    position_deltas: pick(&shape.position_deltas, &remap),
                    normal_deltas: pick(&shape.normal_deltas, &remap),
                    tangent_deltas: pick(&shape.tangent_deltas, &remap),
                })
                .collect(),
        })
    }
}
