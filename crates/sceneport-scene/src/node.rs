//! Scene nodes and the renderer components attached to them

use serde::{Deserialize, Serialize};

use sceneport_core::{Quat, Vec3};

use crate::ids::{ClipId, MaterialId, MeshId, NodeId, RendererId};

fn default_scale() -> Vec3 {
    Vec3::ONE
}

fn default_active() -> bool {
    true
}

/// A transform in the scene tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneNode {
    /// Node name
    pub name: String,
    /// Local translation relative to the parent
    #[serde(default)]
    pub translation: Vec3,
    /// Local rotation relative to the parent
    #[serde(default)]
    pub rotation: Quat,
    /// Local scale relative to the parent
    #[serde(default = "default_scale")]
    pub scale: Vec3,
    /// Ordered children
    #[serde(default)]
    pub children: Vec<NodeId>,
    /// Inactive nodes keep their transform but drop their renderer
    #[serde(default = "default_active")]
    pub active: bool,
    /// Attached mesh or skinned-mesh renderer
    #[serde(default)]
    pub renderer: Option<RendererId>,
    /// Clips played by a modern animator component
    #[serde(default)]
    pub animator: Option<Vec<ClipId>>,
    /// Clips played by a legacy animation component
    #[serde(default)]
    pub legacy_animation: Option<Vec<ClipId>>,
}

impl SceneNode {
    /// Create a new node with an identity transform
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            children: Vec::new(),
            active: true,
            renderer: None,
            animator: None,
            legacy_animation: None,
        }
    }

    pub fn with_translation(mut self, translation: Vec3) -> Self {
        self.translation = translation;
        self
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Check if this is a leaf node
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Clips of whichever animation component is present; the animator wins
    pub fn animation_clips(&self) -> &[ClipId] {
        self.animator
            .as_deref()
            .or(self.legacy_animation.as_deref())
            .unwrap_or(&[])
    }
}

/// Draws a mesh with an ordered list of material slots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Renderer {
    /// Geometry drawn by this renderer, `None` when unassigned
    pub mesh: Option<MeshId>,
    /// One entry per submesh, `None` for empty slots
    #[serde(default)]
    pub materials: Vec<Option<MaterialId>>,
    /// Present on skinned renderers
    #[serde(default)]
    pub skin: Option<SkinBinding>,
}

impl Renderer {
    /// A static mesh renderer
    pub fn mesh(mesh: MeshId, materials: Vec<MaterialId>) -> Self {
        Self {
            mesh: Some(mesh),
            materials: materials.into_iter().map(Some).collect(),
            skin: None,
        }
    }

    /// A skinned mesh renderer
    pub fn skinned(mesh: MeshId, materials: Vec<MaterialId>, skin: SkinBinding) -> Self {
        Self {
            skin: Some(skin),
            ..Self::mesh(mesh, materials)
        }
    }

    pub fn is_skinned(&self) -> bool {
        self.skin.is_some()
    }
}

/// Bones driving a skinned renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkinBinding {
    /// Bone nodes, indexed by the mesh's bone weights; may repeat
    pub bones: Vec<NodeId>,
    /// Declared skeleton root
    #[serde(default)]
    pub root_bone: Option<NodeId>,
}

impl SkinBinding {
    pub fn new(bones: Vec<NodeId>, root_bone: Option<NodeId>) -> Self {
        Self { bones, root_bone }
    }

    /// Bones in first-seen order with repeats removed, plus the position of
    /// each original bone slot in that list
    pub fn unique_bones(&self) -> (Vec<NodeId>, Vec<usize>) {
        let mut unique: Vec<NodeId> = Vec::new();
        let mut slots = Vec::with_capacity(self.bones.len());
        for bone in &self.bones {
            let slot = match unique.iter().position(|b| b == bone) {
                Some(slot) => slot,
                None => {
                    unique.push(*bone);
                    unique.len() - 1
                }
            };
            slots.push(slot);
        }
        (unique, slots)
    }
}
