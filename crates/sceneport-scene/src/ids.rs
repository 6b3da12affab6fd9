//! Typed arena indices

use serde::{Deserialize, Serialize};

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub usize);

        impl $name {
            /// Raw arena index
            pub fn index(self) -> usize {
                self.0
            }
        }

        impl From<usize> for $name {
            fn from(value: usize) -> Self {
                Self(value)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

arena_id!(
    /// Index into [`Scene::nodes`](crate::Scene::nodes)
    NodeId
);
arena_id!(
    /// Index into [`Scene::renderers`](crate::Scene::renderers)
    RendererId
);
arena_id!(
    /// Index into [`Scene::meshes`](crate::Scene::meshes)
    MeshId
);
arena_id!(
    /// Index into [`Scene::materials`](crate::Scene::materials)
    MaterialId
);
arena_id!(
    /// Index into [`Scene::textures`](crate::Scene::textures)
    TextureId
);
arena_id!(
    /// Index into [`Scene::clips`](crate::Scene::clips)
    ClipId
);
