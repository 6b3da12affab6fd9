//! sceneport-scene
//!
//! An in-memory description of a host scene: a tree of transform nodes plus
//! the renderers, mesh geometry, materials, textures and animation clips
//! hanging off it. Everything is stored in flat arenas and referenced by
//! typed indices, so the graph never holds back-pointers.
//!
//! # Example
//!
//! ```rust,ignore
//! use sceneport_scene::{Scene, SceneNode};
//!
//! let mut scene = Scene::new("root");
//! let child = scene.add_node(scene.root, SceneNode::new("child"))?;
//! assert_eq!(scene.traverse(scene.root).count(), 2);
//! ```

pub mod animation;
pub mod ids;
pub mod material;
pub mod mesh;
pub mod node;
pub mod scene;

pub use animation::{AnimationClip, AnimationCurve, Interpolation, PropertyPath};
pub use ids::{ClipId, MaterialId, MeshId, NodeId, RendererId, TextureId};
pub use material::{AlphaMode, MaterialDesc, TextureDesc};
pub use mesh::{BlendShape, BoneWeight, MeshGeometry, SubMesh};
pub use node::{Renderer, SceneNode, SkinBinding};
pub use scene::{Scene, Traverse};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
