//! Material collection and encoding

use serde_json::json;
use tracing::debug;

use sceneport_scene::{AlphaMode, MaterialDesc, MaterialId, Scene, TextureId};

use crate::error::{GltfExportError, GltfResult};
use crate::gltf::{Material, PbrMetallicRoughness, TextureInfo};
use crate::mesh::MeshWithMaterials;
use crate::texture::TextureRegistry;

pub const KHR_MATERIALS_UNLIT: &str = "KHR_materials_unlit";

/// Maps a host material onto glTF material JSON
///
/// Encoders register the textures they reference with the registry and use
/// the returned export index.
pub trait MaterialEncoder {
    fn encode(&mut self, material: &MaterialDesc, textures: &mut TextureRegistry<'_>) -> GltfResult<Material>;
}

/// Metallic-roughness encoder, with `KHR_materials_unlit` for unlit materials
#[derive(Debug, Clone, Copy, Default)]
pub struct PbrMaterialEncoder;

fn texture_info(
    slot: Option<TextureId>,
    textures: &mut TextureRegistry<'_>,
) -> GltfResult<Option<TextureInfo>> {
    let Some(id) = slot else {
        return Ok(None);
    };
    Ok(textures.register(id)?.map(|index| TextureInfo {
        index,
        tex_coord: None,
    }))
}

impl MaterialEncoder for PbrMaterialEncoder {
    fn encode(&mut self, material: &MaterialDesc, textures: &mut TextureRegistry<'_>) -> GltfResult<Material> {
        let pbr = PbrMetallicRoughness {
            base_color_factor: Some(material.base_color),
            base_color_texture: texture_info(material.base_color_texture, textures)?,
            metallic_factor: Some(material.metallic),
            roughness_factor: Some(material.roughness),
            metallic_roughness_texture: texture_info(material.metallic_roughness_texture, textures)?,
        };

        let mut encoded = Material {
            name: Some(material.name.clone()),
            pbr_metallic_roughness: Some(pbr),
            normal_texture: texture_info(material.normal_texture, textures)?,
            emissive_texture: texture_info(material.emissive_texture, textures)?,
            emissive_factor: (material.emissive != [0.0; 3]).then_some(material.emissive),
            alpha_mode: None,
            alpha_cutoff: None,
            double_sided: material.double_sided,
            extensions: None,
        };

        match material.alpha_mode {
            AlphaMode::Opaque => {}
            AlphaMode::Mask => {
                encoded.alpha_mode = Some("MASK".to_string());
                encoded.alpha_cutoff = Some(material.alpha_cutoff);
            }
            AlphaMode::Blend => encoded.alpha_mode = Some("BLEND".to_string()),
        }

        if material.unlit {
            let mut extensions = serde_json::Map::new();
            extensions.insert(KHR_MATERIALS_UNLIT.to_string(), json!({}));
            encoded.extensions = Some(extensions);
        }

        Ok(encoded)
    }
}

/// Distinct materials of the unique meshes, first-seen order, empty slots dropped
pub fn collect_materials(unique: &[MeshWithMaterials]) -> Vec<MaterialId> {
    let mut materials: Vec<MaterialId> = Vec::new();
    for id in unique.iter().flat_map(|m| m.materials.iter().flatten()) {
        if !materials.contains(id) {
            materials.push(*id);
        }
    }
    materials
}

/// Encode every collected material in order
pub fn encode_materials(
    scene: &Scene,
    materials: &[MaterialId],
    encoder: &mut dyn MaterialEncoder,
    textures: &mut TextureRegistry<'_>,
) -> GltfResult<Vec<Material>> {
    materials
        .iter()
        .map(|&id| {
            let material = scene.material(id)?;
            debug!(material = %material.name, "Encoding material");
            encoder.encode(material, textures)
        })
        .collect()
}

/// Export index of a material, which must have been collected
pub fn material_index(materials: &[MaterialId], id: MaterialId) -> GltfResult<usize> {
    materials
        .iter()
        .position(|m| *m == id)
        .ok_or_else(|| GltfExportError::consistency(format!("material {id} was not collected")))
}
