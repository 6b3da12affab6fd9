//! Export extension hooks
//!
//! Extensions run after meshes, nodes, skins and animations are in the
//! document but before textures are resolved, so they may still register
//! textures. They can add JSON to the document and data to the buffer.

use sceneport_scene::{NodeId, Scene};

use crate::buffer::BufferWriter;
use crate::error::GltfResult;
use crate::gltf::Gltf;
use crate::material::KHR_MATERIALS_UNLIT;
use crate::texture::TextureRegistry;

pub const KHR_TEXTURE_TRANSFORM: &str = "KHR_texture_transform";

/// Extension names every export declares
pub const DEFAULT_EXTENSIONS_USED: &[&str] = &[KHR_MATERIALS_UNLIT, KHR_TEXTURE_TRANSFORM];

/// State handed to an extension hook
pub struct ExtensionContext<'a, 's> {
    /// Document built so far; textures are not yet filled in
    pub document: &'a mut Gltf,
    pub writer: &'a mut BufferWriter,
    /// Still open for registration
    pub textures: &'a mut TextureRegistry<'s>,
    /// Mirrored scene being exported
    pub scene: &'s Scene,
    /// Flattened node order; export index is the position in this list
    pub nodes: &'a [NodeId],
}

impl ExtensionContext<'_, '_> {
    /// Export index of a scene node
    pub fn node_index(&self, id: NodeId) -> Option<usize> {
        self.nodes.iter().position(|n| *n == id)
    }
}

/// A hook adding vendor data to the document
pub trait ExportExtension {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Names appended to `extensionsUsed`
    fn extensions_used(&self) -> Vec<String> {
        Vec::new()
    }

    fn export(&mut self, ctx: &mut ExtensionContext<'_, '_>) -> GltfResult<()>;
}
