//! sceneport export pipeline
//!
//! Converts a [`sceneport_scene::Scene`] into a glTF 2.0 document plus its
//! binary buffer:
//! - axis conversion of the whole scene into a mirrored working copy
//! - mesh deduplication and encoding (morph targets, skin attributes)
//! - node hierarchy, skins and animation clips
//! - material and texture registration with late extension hooks
//! - GLB and `.gltf` + `.bin` writers

pub mod animation;
pub mod axis;
pub mod buffer;
pub mod error;
pub mod extension;
pub mod gltf;
pub mod logging;
pub mod material;
pub mod mesh;
pub mod mirror;
pub mod node;
pub mod texture;
pub mod writer;

pub use axis::Axis;
pub use buffer::{BufferTarget, BufferWriter};
pub use error::{GltfExportError, GltfResult};
pub use extension::{ExportExtension, ExtensionContext};
pub use gltf::{ExportOutput, GltfExportOptions, GltfExporter};
pub use material::{MaterialEncoder, PbrMaterialEncoder};
pub use mesh::{MeshExportSettings, UniqueMeshExport};
pub use texture::{FileTextureProvider, MemoryTextureProvider, TextureProvider, TextureRegistry};
