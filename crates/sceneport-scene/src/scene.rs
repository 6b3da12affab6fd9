//! The scene arena
//!
//! A [`Scene`] owns every node, renderer, geometry, material, texture and
//! clip in flat vectors. Nodes form a tree rooted at [`Scene::root`]; the
//! children of a node are stored on the node, parents are derived.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use sceneport_core::{Error, Result, ResultExt};

use crate::animation::{AnimationClip, PropertyPath};
use crate::ids::{ClipId, MaterialId, MeshId, NodeId, RendererId, TextureId};
use crate::material::{MaterialDesc, TextureDesc};
use crate::mesh::MeshGeometry;
use crate::node::{Renderer, SceneNode};

/// A complete host scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    /// The export root; never exported as a node itself
    pub root: NodeId,
    pub nodes: Vec<SceneNode>,
    #[serde(default)]
    pub renderers: Vec<Renderer>,
    #[serde(default)]
    pub meshes: Vec<MeshGeometry>,
    #[serde(default)]
    pub materials: Vec<MaterialDesc>,
    #[serde(default)]
    pub textures: Vec<TextureDesc>,
    #[serde(default)]
    pub clips: Vec<AnimationClip>,
}

impl Scene {
    /// Create a scene holding only a root node
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            root: NodeId(0),
            nodes: vec![SceneNode::new(root_name)],
            renderers: Vec::new(),
            meshes: Vec::new(),
            materials: Vec::new(),
            textures: Vec::new(),
            clips: Vec::new(),
        }
    }

    /// Decode a scene from JSON and validate it
    pub fn from_json_str(json: &str) -> Result<Self> {
        let scene: Scene = serde_json::from_str(json)?;
        scene.validate()?;
        Ok(scene)
    }

    /// Load a scene description from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let json = std::fs::read_to_string(path)?;
        let scene = Self::from_json_str(&json)
            .with_context(|| format!("loading {}", path.display()))?;
        debug!(
            path = %path.display(),
            nodes = scene.nodes.len(),
            meshes = scene.meshes.len(),
            "Loaded scene"
        );
        Ok(scene)
    }

    // ==================== Building ====================

    /// Append a node under `parent`
    pub fn add_node(&mut self, parent: NodeId, node: SceneNode) -> Result<NodeId> {
        let id = NodeId(self.nodes.len());
        self.node_mut(parent)?.children.push(id);
        self.nodes.push(node);
        Ok(id)
    }

    pub fn add_mesh(&mut self, mesh: MeshGeometry) -> MeshId {
        self.meshes.push(mesh);
        MeshId(self.meshes.len() - 1)
    }

    pub fn add_material(&mut self, material: MaterialDesc) -> MaterialId {
        self.materials.push(material);
        MaterialId(self.materials.len() - 1)
    }

    pub fn add_texture(&mut self, texture: TextureDesc) -> TextureId {
        self.textures.push(texture);
        TextureId(self.textures.len() - 1)
    }

    pub fn add_clip(&mut self, clip: AnimationClip) -> ClipId {
        self.clips.push(clip);
        ClipId(self.clips.len() - 1)
    }

    /// Register a renderer and attach it to `node`
    pub fn attach_renderer(&mut self, node: NodeId, renderer: Renderer) -> Result<RendererId> {
        let id = RendererId(self.renderers.len());
        self.node_mut(node)?.renderer = Some(id);
        self.renderers.push(renderer);
        Ok(id)
    }

    // ==================== Lookup ====================

    pub fn node(&self, id: NodeId) -> Result<&SceneNode> {
        self.nodes.get(id.0).ok_or_else(|| Error::dangling("node", id.0))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut SceneNode> {
        self.nodes.get_mut(id.0).ok_or_else(|| Error::dangling("node", id.0))
    }

    pub fn renderer(&self, id: RendererId) -> Result<&Renderer> {
        self.renderers.get(id.0).ok_or_else(|| Error::dangling("renderer", id.0))
    }

    pub fn mesh(&self, id: MeshId) -> Result<&MeshGeometry> {
        self.meshes.get(id.0).ok_or_else(|| Error::dangling("mesh", id.0))
    }

    pub fn material(&self, id: MaterialId) -> Result<&MaterialDesc> {
        self.materials.get(id.0).ok_or_else(|| Error::dangling("material", id.0))
    }

    pub fn texture(&self, id: TextureId) -> Result<&TextureDesc> {
        self.textures.get(id.0).ok_or_else(|| Error::dangling("texture", id.0))
    }

    pub fn clip(&self, id: ClipId) -> Result<&AnimationClip> {
        self.clips.get(id.0).ok_or_else(|| Error::dangling("clip", id.0))
    }

    /// The renderer attached to `node`, if any
    pub fn renderer_of(&self, node: NodeId) -> Result<Option<&Renderer>> {
        match self.node(node)?.renderer {
            Some(id) => self.renderer(id).map(Some),
            None => Ok(None),
        }
    }

    // ==================== Capability probes ====================

    /// Node carries a renderer with a geometry assigned
    pub fn has_mesh(&self, node: NodeId) -> bool {
        matches!(self.renderer_of(node), Ok(Some(r)) if r.mesh.is_some())
    }

    /// Node carries a skinned renderer
    pub fn has_skin(&self, node: NodeId) -> bool {
        matches!(self.renderer_of(node), Ok(Some(r)) if r.is_skinned())
    }

    /// Node carries an animator or legacy animation component
    pub fn has_animator(&self, node: NodeId) -> bool {
        self.nodes
            .get(node.0)
            .is_some_and(|n| n.animator.is_some() || n.legacy_animation.is_some())
    }

    // ==================== Traversal ====================

    /// Pre-order traversal starting at (and including) `from`
    pub fn traverse(&self, from: NodeId) -> Traverse<'_> {
        Traverse {
            scene: self,
            stack: vec![from],
        }
    }

    /// Parent of every node, `None` for roots and unreachable nodes
    pub fn parents(&self) -> Vec<Option<NodeId>> {
        let mut parents = vec![None; self.nodes.len()];
        for (idx, node) in self.nodes.iter().enumerate() {
            for child in &node.children {
                if let Some(slot) = parents.get_mut(child.0) {
                    *slot = Some(NodeId(idx));
                }
            }
        }
        parents
    }

    /// Chain of nodes from `node` up to the top of its tree
    pub fn chain_to_root(&self, node: NodeId) -> Vec<NodeId> {
        let parents = self.parents();
        let mut chain = vec![node];
        let mut current = node;
        while let Some(parent) = parents.get(current.0).copied().flatten() {
            if chain.contains(&parent) {
                break;
            }
            chain.push(parent);
            current = parent;
        }
        chain
    }

    // ==================== Validation ====================

    /// Check every reference and the tree shape
    pub fn validate(&self) -> Result<()> {
        self.node(self.root).context("scene root")?;
        self.validate_tree()?;

        for (idx, node) in self.nodes.iter().enumerate() {
            if let Some(renderer) = node.renderer {
                self.renderer(renderer)
                    .with_context(|| format!("node '{}' ({idx})", node.name))?;
            }
            for &clip in node.animation_clips() {
                self.clip(clip)
                    .with_context(|| format!("animation on node '{}' ({idx})", node.name))?;
            }
        }

        for (idx, renderer) in self.renderers.iter().enumerate() {
            self.validate_renderer(renderer)
                .with_context(|| format!("renderer {idx}"))?;
        }

        for mesh in &self.meshes {
            mesh.validate()?;
        }

        for material in &self.materials {
            for texture in material.textures() {
                self.texture(texture)
                    .with_context(|| format!("material '{}'", material.name))?;
            }
        }

        for clip in &self.clips {
            for curve in &clip.curves {
                self.node(curve.target)
                    .with_context(|| format!("clip '{}' target", clip.name))?;
                if curve.blend_shape.is_some() && curve.path != PropertyPath::Weights {
                    return Err(Error::invalid_data(format!(
                        "clip '{}': blend shape set on a {} curve",
                        clip.name, curve.path
                    )));
                }
            }
        }

        Ok(())
    }

    fn validate_tree(&self) -> Result<()> {
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            let node = self.node(id)?;
            if std::mem::replace(&mut seen[id.0], true) {
                return Err(Error::NotATree {
                    node: id.0,
                    message: "reached twice from the root".to_string(),
                });
            }
            for &child in node.children.iter().rev() {
                if child == self.root {
                    return Err(Error::NotATree {
                        node: child.0,
                        message: "root listed as a child".to_string(),
                    });
                }
                self.node(child)
                    .with_context(|| format!("child of '{}'", node.name))?;
                stack.push(child);
            }
        }
        Ok(())
    }

    fn validate_renderer(&self, renderer: &Renderer) -> Result<()> {
        let Some(mesh_id) = renderer.mesh else {
            return Ok(());
        };
        let mesh = self.mesh(mesh_id)?;

        for material in renderer.materials.iter().flatten() {
            self.material(*material)?;
        }

        if let Some(skin) = &renderer.skin {
            for &bone in &skin.bones {
                self.node(bone).context("skin bone")?;
            }
            if let Some(root_bone) = skin.root_bone {
                self.node(root_bone).context("skin root bone")?;
            }
            if let Some(max) = mesh.max_bone_index() {
                if max as usize >= skin.bones.len() {
                    return Err(Error::invalid_data(format!(
                        "mesh '{}' weights bone {} but the renderer has {} bones",
                        mesh.name,
                        max,
                        skin.bones.len()
                    )));
                }
            }
            if mesh.has_bone_weights() && mesh.bind_poses.len() != skin.bones.len() {
                return Err(Error::invalid_data(format!(
                    "mesh '{}' has {} bind poses for {} bones",
                    mesh.name,
                    mesh.bind_poses.len(),
                    skin.bones.len()
                )));
            }
        }

        Ok(())
    }
}

/// Pre-order node iterator
pub struct Traverse<'a> {
    scene: &'a Scene,
    stack: Vec<NodeId>,
}

impl Iterator for Traverse<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        if let Some(node) = self.scene.nodes.get(id.0) {
            self.stack.extend(node.children.iter().rev().copied());
        }
        Some(id)
    }
}
