//! Material and texture descriptions

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::ids::TextureId;

/// How alpha is interpreted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlphaMode {
    #[default]
    Opaque,
    Mask,
    Blend,
}

fn white() -> [f32; 4] {
    [1.0, 1.0, 1.0, 1.0]
}

fn one() -> f32 {
    1.0
}

fn half() -> f32 {
    0.5
}

/// A host material, opaque to the exporter except through a material encoder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialDesc {
    pub name: String,
    #[serde(default = "white")]
    pub base_color: [f32; 4],
    #[serde(default)]
    pub base_color_texture: Option<TextureId>,
    #[serde(default)]
    pub metallic: f32,
    #[serde(default = "one")]
    pub roughness: f32,
    #[serde(default)]
    pub metallic_roughness_texture: Option<TextureId>,
    #[serde(default)]
    pub normal_texture: Option<TextureId>,
    #[serde(default)]
    pub emissive: [f32; 3],
    #[serde(default)]
    pub emissive_texture: Option<TextureId>,
    #[serde(default)]
    pub alpha_mode: AlphaMode,
    #[serde(default = "half")]
    pub alpha_cutoff: f32,
    #[serde(default)]
    pub double_sided: bool,
    /// Shade without lighting
    #[serde(default)]
    pub unlit: bool,
}

impl MaterialDesc {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_color: white(),
            base_color_texture: None,
            metallic: 0.0,
            roughness: 1.0,
            metallic_roughness_texture: None,
            normal_texture: None,
            emissive: [0.0; 3],
            emissive_texture: None,
            alpha_mode: AlphaMode::Opaque,
            alpha_cutoff: 0.5,
            double_sided: false,
            unlit: false,
        }
    }

    /// Texture slots in a fixed order
    pub fn textures(&self) -> impl Iterator<Item = TextureId> + '_ {
        [
            self.base_color_texture,
            self.metallic_roughness_texture,
            self.normal_texture,
            self.emissive_texture,
        ]
        .into_iter()
        .flatten()
    }
}

/// A host texture; its encoded bytes come from a texture byte provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureDesc {
    pub name: String,
    /// Source image on disk, if the host keeps one
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl TextureDesc {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }
}
