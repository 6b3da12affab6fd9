//! glTF exporter implementation

use super::*;
use std::collections::HashMap;
use std::ops::Range;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use sceneport_scene::{MaterialId, MeshId, NodeId, Scene};

use crate::animation::{collect_morph_targets, export_animations};
use crate::axis::Axis;
use crate::buffer::{BufferWriter, DEFAULT_CAPACITY};
use crate::error::GltfResult;
use crate::extension::{ExportExtension, ExtensionContext, DEFAULT_EXTENSIONS_USED};
use crate::logging::stage;
use crate::material::{collect_materials, encode_materials, MaterialEncoder, PbrMaterialEncoder};
use crate::mesh::{collect_instances, deduplicate, export_mesh, MeshExportSettings};
use crate::mirror::MirroredScene;
use crate::node::{build_nodes, build_skins, flatten, scene_roots, NodeIndex};
use crate::texture::{TextureProvider, TextureRegistry};
use crate::writer;

/// glTF export options
#[derive(Debug, Clone)]
pub struct GltfExportOptions {
    /// Axis mirrored to change handedness
    pub axis: Axis,
    /// Mesh encoding switches
    pub mesh: MeshExportSettings,
    /// Export clips of the root's animation component
    pub export_animation: bool,
    /// Hard limit on the binary buffer size
    pub buffer_capacity: usize,
    /// `asset.generator`
    pub generator: String,
    /// Pretty-print JSON
    pub pretty_json: bool,
    /// Write GLB when the output path does not decide
    pub use_glb: bool,
}

impl Default for GltfExportOptions {
    fn default() -> Self {
        Self {
            axis: Axis::Z,
            mesh: MeshExportSettings::default(),
            export_animation: true,
            buffer_capacity: DEFAULT_CAPACITY,
            generator: format!("sceneport-{}", env!("CARGO_PKG_VERSION")),
            pretty_json: true,
            use_glb: true,
        }
    }
}

/// Finished document plus the bytes of its single buffer
#[derive(Debug, Clone)]
pub struct ExportOutput {
    pub document: Gltf,
    pub buffer: Vec<u8>,
}

impl ExportOutput {
    /// Byte range of a buffer view
    pub fn buffer_view_range(&self, view: usize) -> Option<Range<usize>> {
        self.document.buffer_views.get(view).map(BufferView::range)
    }

    /// Byte ranges backing an accessor, sparse storage included
    pub fn accessor_ranges(&self, accessor: usize) -> Vec<Range<usize>> {
        let Some(accessor) = self.document.accessors.get(accessor) else {
            return Vec::new();
        };
        let sparse = accessor
            .sparse
            .iter()
            .flat_map(|s| [s.indices.buffer_view, s.values.buffer_view]);
        accessor
            .buffer_view
            .into_iter()
            .chain(sparse)
            .filter_map(|view| self.buffer_view_range(view))
            .collect()
    }

    pub fn to_json(&self, pretty: bool) -> GltfResult<String> {
        Ok(if pretty {
            serde_json::to_string_pretty(&self.document)?
        } else {
            serde_json::to_string(&self.document)?
        })
    }
}

/// glTF exporter
///
/// One exporter can run many exports; every call builds its own document
/// and buffer. The export order of the last call stays queryable.
pub struct GltfExporter {
    options: GltfExportOptions,
    encoder: Box<dyn MaterialEncoder>,
    extensions: Vec<Box<dyn ExportExtension>>,
    nodes: Vec<NodeId>,
    meshes: Vec<MeshId>,
    materials: Vec<MaterialId>,
    blend_shape_maps: HashMap<MeshId, BTreeMap<usize, usize>>,
}

impl GltfExporter {
    /// Create a new glTF exporter
    pub fn new(options: GltfExportOptions) -> Self {
        Self {
            options,
            encoder: Box::new(PbrMaterialEncoder),
            extensions: Vec::new(),
            nodes: Vec::new(),
            meshes: Vec::new(),
            materials: Vec::new(),
            blend_shape_maps: HashMap::new(),
        }
    }

    pub fn with_material_encoder(mut self, encoder: Box<dyn MaterialEncoder>) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn with_extension(mut self, extension: Box<dyn ExportExtension>) -> Self {
        self.extensions.push(extension);
        self
    }

    pub fn options(&self) -> &GltfExportOptions {
        &self.options
    }

    /// Flattened node order of the last export
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Geometry of each exported mesh, by mesh index
    pub fn meshes(&self) -> &[MeshId] {
        &self.meshes
    }

    /// Exported materials, by material index
    pub fn materials(&self) -> &[MaterialId] {
        &self.materials
    }

    /// Original blend-shape index to morph target index for a geometry
    pub fn blend_shape_index_map(&self, mesh: MeshId) -> Option<&BTreeMap<usize, usize>> {
        self.blend_shape_maps.get(&mesh)
    }

    /// Export `scene` into a document and buffer
    pub fn export(&mut self, scene: &Scene, textures: &dyn TextureProvider) -> GltfResult<ExportOutput> {
        self.nodes.clear();
        self.meshes.clear();
        self.materials.clear();
        self.blend_shape_maps.clear();

        scene.validate()?;
        let axis = self.options.axis;

        let mirrored = stage("mirror", || MirroredScene::new(scene, axis))?;
        let copy = mirrored.scene();

        let mut writer = BufferWriter::with_capacity(self.options.buffer_capacity);
        let mut document = Gltf {
            asset: Asset {
                version: "2.0".to_string(),
                generator: Some(self.options.generator.clone()),
            },
            ..Default::default()
        };
        for name in DEFAULT_EXTENSIONS_USED {
            document.use_extension(*name);
        }

        let nodes = stage("flatten", || flatten(copy));
        let index = NodeIndex::new(&nodes);

        let (instances, unique) = stage("deduplicate", || -> GltfResult<_> {
            let instances = collect_instances(copy, &nodes)?;
            let unique = deduplicate(&instances);
            Ok((instances, unique))
        })?;

        let mut registry = TextureRegistry::new(copy, textures);
        let materials = collect_materials(&unique);
        let encoder = self.encoder.as_mut();
        document.materials = stage("materials", || {
            encode_materials(copy, &materials, encoder, &mut registry)
        })?;

        stage("meshes", || -> GltfResult<()> {
            for instance in &unique {
                let geometry = copy.mesh(instance.mesh)?;
                let renderer = copy.renderer(instance.renderer)?;
                let export = export_mesh(&mut writer, geometry, renderer, &materials, &self.options.mesh, axis)?;
                document.meshes.push(export.mesh);
                self.meshes.push(instance.mesh);
                self.blend_shape_maps
                    .entry(instance.mesh)
                    .or_insert(export.blend_shape_map);
            }
            Ok(())
        })?;

        document.nodes = stage("nodes", || build_nodes(copy, &nodes, &index, &unique))?;
        document.scenes = vec![super::Scene {
            name: None,
            nodes: scene_roots(copy, &index)?,
        }];
        document.scene = Some(0);

        document.skins = stage("skins", || {
            build_skins(copy, &nodes, &index, &unique, &mut writer, axis, &mut document.nodes)
        })?;

        if self.options.export_animation {
            let clips = copy.node(mirrored.source_root())?.animation_clips().to_vec();
            if !clips.is_empty() {
                let blend_shape_maps = &self.blend_shape_maps;
                document.animations = stage("animations", || {
                    let morphs = collect_morph_targets(copy, &instances, blend_shape_maps)?;
                    export_animations(copy, &clips, &index, &morphs, &mut writer, axis)
                })?;
            }
        }

        for extension in &mut self.extensions {
            for name in extension.extensions_used() {
                document.use_extension(name);
            }
            let mut ctx = ExtensionContext {
                document: &mut document,
                writer: &mut writer,
                textures: &mut registry,
                scene: copy,
                nodes: &nodes,
            };
            extension.export(&mut ctx)?;
            debug!(extension = extension.name(), "Extension applied");
        }

        registry.seal();
        let resolved = stage("textures", || registry.resolve(&mut writer))?;
        document.images = resolved.images;
        document.samplers = resolved.samplers;
        document.textures = resolved.textures;

        let (buffer, buffer_views, accessors) = writer.finish();
        document.buffer_views = buffer_views;
        document.accessors = accessors;
        if !buffer.is_empty() {
            document.buffers = vec![Buffer {
                uri: None,
                byte_length: buffer.len(),
            }];
        }

        self.nodes = nodes;
        self.materials = materials;

        info!(
            nodes = document.nodes.len(),
            meshes = document.meshes.len(),
            materials = document.materials.len(),
            textures = document.textures.len(),
            skins = document.skins.len(),
            animations = document.animations.len(),
            bytes = buffer.len(),
            wrapped = mirrored.was_wrapped(),
            "Export complete"
        );

        Ok(ExportOutput { document, buffer })
    }

    /// Export and write to `path`; `.glb` and `.gltf` pick the container
    pub fn export_to_path(
        &mut self,
        scene: &Scene,
        textures: &dyn TextureProvider,
        path: impl AsRef<Path>,
    ) -> GltfResult<PathBuf> {
        let output = self.export(scene, textures)?;
        writer::write_to_path(&output, path.as_ref(), self.options.pretty_json, self.options.use_glb)
    }
}
