//! Texture registry and texture byte providers
//!
//! Materials and extension hooks register textures by id while the document
//! is being built. Encoded bytes are only fetched once the registry is
//! sealed, in registration order, and land in the binary buffer as image
//! buffer views.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use image::ImageFormat;
use tracing::{debug, warn};

use sceneport_scene::{Scene, TextureDesc, TextureId};

use crate::buffer::{BufferTarget, BufferWriter};
use crate::error::{GltfExportError, GltfResult};
use crate::gltf::{
    Image, Sampler, Texture, FILTER_LINEAR, FILTER_LINEAR_MIPMAP_LINEAR, WRAP_REPEAT,
};

/// Supplies encoded image bytes for textures
pub trait TextureProvider {
    /// Whether the texture can be exported at all
    fn is_exportable(&self, id: TextureId, texture: &TextureDesc) -> bool;

    /// Encoded bytes plus MIME type
    fn get_bytes(&self, id: TextureId, texture: &TextureDesc) -> GltfResult<(Vec<u8>, String)>;
}

/// Reads texture files from disk and sniffs their format
#[derive(Debug, Clone, Default)]
pub struct FileTextureProvider {
    base_dir: Option<PathBuf>,
}

impl FileTextureProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative texture paths against `dir`
    pub fn with_base_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(dir.into()),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }
}

/// MIME type of an encoded image glTF can carry
pub fn sniff_mime_type(bytes: &[u8]) -> Option<&'static str> {
    match image::guess_format(bytes).ok()? {
        ImageFormat::Png => Some("image/png"),
        ImageFormat::Jpeg => Some("image/jpeg"),
        _ => None,
    }
}

impl TextureProvider for FileTextureProvider {
    fn is_exportable(&self, _id: TextureId, texture: &TextureDesc) -> bool {
        texture
            .path
            .as_deref()
            .is_some_and(|path| self.resolve(path).is_file())
    }

    fn get_bytes(&self, _id: TextureId, texture: &TextureDesc) -> GltfResult<(Vec<u8>, String)> {
        let path = texture.path.as_deref().ok_or_else(|| GltfExportError::Texture {
            name: texture.name.clone(),
            message: "no source file".to_string(),
        })?;
        let bytes = std::fs::read(self.resolve(path))?;
        let mime = sniff_mime_type(&bytes).ok_or_else(|| GltfExportError::Texture {
            name: texture.name.clone(),
            message: format!("{} is not a PNG or JPEG image", path.display()),
        })?;
        Ok((bytes, mime.to_string()))
    }
}

/// Serves pre-encoded bytes held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryTextureProvider {
    images: HashMap<TextureId, (Vec<u8>, String)>,
}

impl MemoryTextureProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: TextureId, bytes: Vec<u8>, mime_type: impl Into<String>) {
        self.images.insert(id, (bytes, mime_type.into()));
    }
}

impl TextureProvider for MemoryTextureProvider {
    fn is_exportable(&self, id: TextureId, _texture: &TextureDesc) -> bool {
        self.images.contains_key(&id)
    }

    fn get_bytes(&self, id: TextureId, texture: &TextureDesc) -> GltfResult<(Vec<u8>, String)> {
        self.images.get(&id).cloned().ok_or_else(|| GltfExportError::Texture {
            name: texture.name.clone(),
            message: "no bytes registered".to_string(),
        })
    }
}

/// Texture images, samplers and textures ready for the document
#[derive(Debug, Default)]
pub struct ResolvedTextures {
    pub images: Vec<Image>,
    pub samplers: Vec<Sampler>,
    pub textures: Vec<Texture>,
}

/// Assigns stable export indices to textures in first-registration order
pub struct TextureRegistry<'a> {
    scene: &'a Scene,
    provider: &'a dyn TextureProvider,
    exported: Vec<TextureId>,
    sealed: bool,
}

impl<'a> TextureRegistry<'a> {
    pub fn new(scene: &'a Scene, provider: &'a dyn TextureProvider) -> Self {
        Self {
            scene,
            provider,
            exported: Vec::new(),
            sealed: false,
        }
    }

    /// Export index of `id`, registering it on first use
    ///
    /// Returns `None` when the provider cannot export the texture.
    pub fn register(&mut self, id: TextureId) -> GltfResult<Option<usize>> {
        if self.sealed {
            return Err(GltfExportError::TextureRegistryClosed { texture: id.index() });
        }
        if let Some(index) = self.index_of(id) {
            return Ok(Some(index));
        }
        let texture = self.scene.texture(id)?;
        if !self.provider.is_exportable(id, texture) {
            warn!(texture = %texture.name, "Texture is not exportable, skipping");
            return Ok(None);
        }
        self.exported.push(id);
        Ok(Some(self.exported.len() - 1))
    }

    pub fn index_of(&self, id: TextureId) -> Option<usize> {
        self.exported.iter().position(|t| *t == id)
    }

    /// Registered textures in export order
    pub fn textures(&self) -> &[TextureId] {
        &self.exported
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Close the registration window
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    /// Fetch every registered texture once and write it into the buffer
    pub fn resolve(&mut self, writer: &mut BufferWriter) -> GltfResult<ResolvedTextures> {
        self.seal();
        let mut resolved = ResolvedTextures::default();
        if self.exported.is_empty() {
            return Ok(resolved);
        }

        resolved.samplers.push(Sampler {
            mag_filter: Some(FILTER_LINEAR),
            min_filter: Some(FILTER_LINEAR_MIPMAP_LINEAR),
            wrap_s: Some(WRAP_REPEAT),
            wrap_t: Some(WRAP_REPEAT),
        });

        for (index, &id) in self.exported.iter().enumerate() {
            let texture = self.scene.texture(id)?;
            let (bytes, mime_type) = self.provider.get_bytes(id, texture)?;
            let view = writer.push_view(&bytes, 4, BufferTarget::None, None)?;
            debug!(texture = %texture.name, bytes = bytes.len(), mime = %mime_type, "Texture written");

            resolved.images.push(Image {
                name: Some(texture.name.clone()),
                buffer_view: Some(view),
                mime_type: Some(mime_type),
                uri: None,
            });
            resolved.textures.push(Texture {
                name: Some(texture.name.clone()),
                sampler: Some(0),
                source: index,
            });
        }

        Ok(resolved)
    }
}
