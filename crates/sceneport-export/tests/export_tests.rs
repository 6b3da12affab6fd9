//! End-to-end tests for the glTF exporter
//!
//! These tests drive `GltfExporter::export` on small scenes and check:
//! - dummy-parent wrapping and scene-level nodes
//! - mesh deduplication and zero-vertex meshes
//! - skins, animation channels and blend-shape remapping
//! - buffer layout (ranges inside the buffer, no overlap)
//! - texture registration, including late registration from extensions
//! - fatal errors: capacity, root geometry, unsupported animation paths,
//!   keyframe count mismatches and weights without morph targets

use proptest::prelude::*;
use serde_json::json;

use sceneport_core::{Mat4x4, Quat, Vec3};
use sceneport_export::{
    Axis, ExportExtension, ExportOutput, ExtensionContext, GltfExportError, GltfExportOptions,
    GltfExporter, GltfResult, MemoryTextureProvider,
};
use sceneport_scene::{
    AnimationClip, AnimationCurve, BlendShape, BoneWeight, MaterialDesc, MeshGeometry, MeshId,
    NodeId, PropertyPath, Renderer, Scene, SceneNode, SkinBinding, SubMesh, TextureDesc, TextureId,
};

const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

/// Helper to create a single-triangle mesh
fn triangle(name: &str) -> MeshGeometry {
    MeshGeometry {
        name: name.into(),
        positions: vec![Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), Vec3::UP],
        normals: vec![Vec3::FORWARD; 3],
        submeshes: vec![SubMesh::new(vec![0, 1, 2])],
        ..Default::default()
    }
}

fn export(scene: &Scene) -> GltfResult<ExportOutput> {
    GltfExporter::new(GltfExportOptions::default()).export(scene, &MemoryTextureProvider::new())
}

/// Every accessor byte range lies inside the buffer and none overlap
fn assert_disjoint_ranges(output: &ExportOutput) {
    let mut ranges: Vec<_> = (0..output.document.accessors.len())
        .flat_map(|i| output.accessor_ranges(i))
        .collect();
    ranges.sort_by_key(|r| r.start);
    for range in &ranges {
        assert!(range.end <= output.buffer.len());
        assert!(range.end <= output.document.buffers[0].byte_length);
    }
    for pair in ranges.windows(2) {
        assert!(pair[0].end <= pair[1].start, "{:?} overlaps {:?}", pair[0], pair[1]);
    }
}

// ==================== Hierarchy ====================

#[test]
fn test_leaf_root_is_wrapped_and_stripped() {
    let mut scene = Scene::new("avatar");
    let mesh = scene.add_mesh(triangle("body"));
    let root = scene.root;
    scene.attach_renderer(root, Renderer::mesh(mesh, vec![])).unwrap();

    let mut exporter = GltfExporter::new(GltfExportOptions::default());
    let output = exporter.export(&scene, &MemoryTextureProvider::new()).unwrap();
    let doc = &output.document;

    assert_eq!(doc.nodes.len(), 1);
    assert_eq!(doc.scenes[0].nodes, vec![0]);
    assert_eq!(doc.nodes[0].name.as_deref(), Some("avatar"));
    assert_eq!(doc.nodes[0].mesh, Some(0));
    assert_eq!(exporter.nodes(), &[root]);
    // caller's scene is untouched
    assert_eq!(scene.nodes.len(), 1);
}

#[test]
fn test_single_child_gives_one_scene_node() {
    let mut scene = Scene::new("root");
    let mesh = scene.add_mesh(triangle("tri"));
    let child = scene.add_node(scene.root, SceneNode::new("child")).unwrap();
    scene.attach_renderer(child, Renderer::mesh(mesh, vec![])).unwrap();

    let output = export(&scene).unwrap();
    assert_eq!(output.document.nodes.len(), 1);
    assert_eq!(output.document.scenes[0].nodes, vec![0]);
}

#[test]
fn test_transforms_mirror_back_to_source() {
    let mut scene = Scene::new("root");
    let rotation = Quat::from_axis_angle(Vec3::new(0.0, 0.6, 0.8), 0.7);
    let source = SceneNode::new("moved")
        .with_translation(Vec3::new(1.0, 2.0, 3.0))
        .with_rotation(rotation)
        .with_scale(Vec3::new(2.0, 2.0, 2.0));
    let id = scene.add_node(scene.root, source).unwrap();
    scene.add_node(id, SceneNode::new("leaf")).unwrap();

    let output = export(&scene).unwrap();
    let node = &output.document.nodes[0];
    assert_eq!(node.children, vec![1]);

    let t = node.translation.unwrap();
    let r = node.rotation.unwrap();
    let back_t = Axis::Z.invert_vec3(Vec3::from_array(t));
    let back_r = Axis::Z.invert_quat(Quat::new(r[0], r[1], r[2], r[3]));
    assert!((back_t.x - 1.0).abs() < 1e-5 && (back_t.z - 3.0).abs() < 1e-5);
    assert!((back_r.y - rotation.y).abs() < 1e-5 && (back_r.w - rotation.w).abs() < 1e-5);
    assert_eq!(node.scale, Some([2.0, 2.0, 2.0]));
}

#[test]
fn test_inactive_node_keeps_transform_only() {
    let mut scene = Scene::new("root");
    let mesh = scene.add_mesh(triangle("tri"));
    let mut hidden = SceneNode::new("hidden");
    hidden.active = false;
    let hidden = scene.add_node(scene.root, hidden).unwrap();
    scene.attach_renderer(hidden, Renderer::mesh(mesh, vec![])).unwrap();

    let output = export(&scene).unwrap();
    assert_eq!(output.document.nodes[0].mesh, None);
    assert!(output.document.meshes.is_empty());
}

// ==================== Meshes ====================

#[test]
fn test_shared_mesh_exported_once() {
    let mut scene = Scene::new("root");
    let mesh = scene.add_mesh(triangle("rock"));
    let material = scene.add_material(MaterialDesc::new("stone"));
    for name in ["left", "right"] {
        let node = scene.add_node(scene.root, SceneNode::new(name)).unwrap();
        scene.attach_renderer(node, Renderer::mesh(mesh, vec![material])).unwrap();
    }

    let output = export(&scene).unwrap();
    let doc = &output.document;
    assert_eq!(doc.meshes.len(), 1);
    assert_eq!(doc.materials.len(), 1);
    assert_eq!(doc.nodes[0].mesh, Some(0));
    assert_eq!(doc.nodes[1].mesh, Some(0));
    assert_eq!(doc.meshes[0].primitives[0].material, Some(0));
}

#[test]
fn test_same_mesh_different_materials_exported_twice() {
    let mut scene = Scene::new("root");
    let mesh = scene.add_mesh(triangle("rock"));
    let stone = scene.add_material(MaterialDesc::new("stone"));
    let moss = scene.add_material(MaterialDesc::new("moss"));
    for material in [stone, moss] {
        let node = scene.add_node(scene.root, SceneNode::new("rock")).unwrap();
        scene.attach_renderer(node, Renderer::mesh(mesh, vec![material])).unwrap();
    }

    let output = export(&scene).unwrap();
    assert_eq!(output.document.meshes.len(), 2);
    assert_eq!(output.document.nodes[1].mesh, Some(1));
    assert_eq!(output.document.meshes[1].primitives[0].material, Some(1));
}

#[test]
fn test_zero_vertex_mesh_marked_missing() {
    let mut scene = Scene::new("root");
    let empty = scene.add_mesh(MeshGeometry::new("empty"));
    let full = scene.add_mesh(triangle("full"));
    let a = scene.add_node(scene.root, SceneNode::new("a")).unwrap();
    let b = scene.add_node(scene.root, SceneNode::new("b")).unwrap();
    scene.add_node(scene.root, SceneNode::new("plain")).unwrap();
    scene.attach_renderer(a, Renderer::mesh(empty, vec![])).unwrap();
    scene.attach_renderer(b, Renderer::mesh(full, vec![])).unwrap();

    let output = export(&scene).unwrap();
    let doc = &output.document;
    assert_eq!(doc.meshes.len(), 1);
    assert_eq!(doc.nodes[0].mesh, Some(-1));
    assert_eq!(doc.nodes[1].mesh, Some(0));
    assert_eq!(doc.nodes[2].mesh, None);

    let json = serde_json::to_value(doc).unwrap();
    assert_eq!(json["nodes"][0]["mesh"], -1);
    assert!(json["nodes"][2].get("mesh").is_none());
}

#[test]
fn test_blend_shape_index_map() {
    let mut scene = Scene::new("root");
    let mut geometry = triangle("face");
    geometry.blend_shapes = vec![
        BlendShape {
            name: "neutral".into(),
            position_deltas: vec![Vec3::ZERO; 3],
            ..Default::default()
        },
        BlendShape {
            name: "smile".into(),
            position_deltas: vec![Vec3::UP, Vec3::ZERO, Vec3::ZERO],
            ..Default::default()
        },
        BlendShape {
            name: "blink".into(),
            position_deltas: vec![Vec3::ZERO, Vec3::ZERO, Vec3::UP],
            ..Default::default()
        },
    ];
    let mesh = scene.add_mesh(geometry);
    let node = scene.add_node(scene.root, SceneNode::new("face")).unwrap();
    scene.attach_renderer(node, Renderer::mesh(mesh, vec![])).unwrap();

    let mut exporter = GltfExporter::new(GltfExportOptions::default());
    let output = exporter.export(&scene, &MemoryTextureProvider::new()).unwrap();

    let map = exporter.blend_shape_index_map(mesh).unwrap();
    assert_eq!(map.get(&0), None);
    assert_eq!(map.get(&1), Some(&0));
    assert_eq!(map.get(&2), Some(&1));

    let mesh = &output.document.meshes[0];
    assert_eq!(mesh.primitives[0].targets.len(), 2);
    assert_eq!(mesh.extras.as_ref().unwrap().target_names, vec!["smile", "blink"]);
    assert_eq!(exporter.meshes(), &[MeshId(0)]);
}

#[test]
fn test_sparse_target_with_only_normal_deltas() {
    let mut scene = Scene::new("root");
    let mut geometry = triangle("face");
    geometry.blend_shapes = vec![BlendShape {
        name: "soften".into(),
        position_deltas: vec![Vec3::ZERO; 3],
        normal_deltas: vec![Vec3::new(0.0, 0.5, 0.0), Vec3::ZERO, Vec3::ZERO],
        ..Default::default()
    }];
    let mesh = scene.add_mesh(geometry);
    let node = scene.add_node(scene.root, SceneNode::new("face")).unwrap();
    scene.attach_renderer(node, Renderer::mesh(mesh, vec![])).unwrap();

    let mut options = GltfExportOptions::default();
    options.mesh.use_sparse_accessor_for_morph_target = true;
    let output = GltfExporter::new(options)
        .export(&scene, &MemoryTextureProvider::new())
        .unwrap();
    let doc = &output.document;

    let targets = &doc.meshes[0].primitives[0].targets;
    assert_eq!(targets.len(), 1);
    let position = &doc.accessors[targets[0]["POSITION"]];
    assert_eq!(position.buffer_view, None);
    assert!(position.sparse.is_none());
    assert_eq!(position.count, 3);

    let normal = &doc.accessors[targets[0]["NORMAL"]];
    assert_eq!(normal.buffer_view, None);
    assert_eq!(normal.count, 3);
    assert_eq!(normal.sparse.as_ref().unwrap().count, 1);
    assert_disjoint_ranges(&output);
}

// ==================== Skins ====================

fn skinned_scene() -> (Scene, [NodeId; 3], NodeId) {
    let mut scene = Scene::new("root");
    let hips = scene.add_node(scene.root, SceneNode::new("hips")).unwrap();
    let spine = scene
        .add_node(hips, SceneNode::new("spine").with_translation(Vec3::new(0.0, 1.0, 0.0)))
        .unwrap();
    let head = scene
        .add_node(spine, SceneNode::new("head").with_translation(Vec3::new(0.0, 1.0, 0.0)))
        .unwrap();
    let body = scene.add_node(scene.root, SceneNode::new("body")).unwrap();

    let mut geometry = triangle("body");
    geometry.bone_weights = vec![BoneWeight::single(0), BoneWeight::single(1), BoneWeight::single(2)];
    geometry.bind_poses = vec![
        Mat4x4::IDENTITY,
        Mat4x4::from_trs(Vec3::new(0.0, -1.0, 0.0), Quat::IDENTITY, Vec3::ONE),
        Mat4x4::from_trs(Vec3::new(0.0, -2.0, 0.0), Quat::IDENTITY, Vec3::ONE),
    ];
    let mesh = scene.add_mesh(geometry);
    let binding = SkinBinding::new(vec![hips, spine, head], Some(hips));
    scene.attach_renderer(body, Renderer::skinned(mesh, vec![], binding)).unwrap();
    (scene, [hips, spine, head], body)
}

#[test]
fn test_skin_with_three_bones() {
    let (scene, _, _) = skinned_scene();
    let output = export(&scene).unwrap();
    let doc = &output.document;

    assert_eq!(doc.skins.len(), 1);
    let skin = &doc.skins[0];
    assert_eq!(skin.joints, vec![0, 1, 2]);
    assert_eq!(skin.skeleton, Some(0));
    let ibm = &doc.accessors[skin.inverse_bind_matrices.unwrap()];
    assert_eq!(ibm.count, 3);
    assert_eq!(serde_json::to_value(ibm).unwrap()["type"], "MAT4");

    assert_eq!(doc.nodes[3].skin, Some(0));
    let attributes = &doc.meshes[0].primitives[0].attributes;
    assert!(attributes.contains_key("JOINTS_0"));
    assert!(attributes.contains_key("WEIGHTS_0"));
}

#[test]
fn test_shared_skinned_renderer_shares_skin() {
    let (mut scene, _, body) = skinned_scene();
    let renderer = scene.nodes[body.0].renderer;
    let twin = scene.add_node(scene.root, SceneNode::new("twin")).unwrap();
    scene.nodes[twin.0].renderer = renderer;

    let output = export(&scene).unwrap();
    let doc = &output.document;
    assert_eq!(doc.skins.len(), 1);
    assert_eq!(doc.meshes.len(), 1);
    assert_eq!(doc.nodes[3].skin, Some(0));
    assert_eq!(doc.nodes[4].skin, Some(0));
    assert_eq!(doc.nodes[4].mesh, Some(0));
}

// ==================== Animation ====================

/// Face mesh whose first blend shape moves nothing and is dropped
fn face_geometry() -> MeshGeometry {
    let mut geometry = triangle("face");
    geometry.blend_shapes = vec![
        BlendShape {
            name: "neutral".into(),
            position_deltas: vec![Vec3::ZERO; 3],
            ..Default::default()
        },
        BlendShape {
            name: "smile".into(),
            position_deltas: vec![Vec3::UP, Vec3::ZERO, Vec3::ZERO],
            ..Default::default()
        },
        BlendShape {
            name: "blink".into(),
            position_deltas: vec![Vec3::ZERO, Vec3::ZERO, Vec3::UP],
            ..Default::default()
        },
    ];
    geometry
}

fn play_on_root(scene: &mut Scene, clip: AnimationClip) {
    let clip = scene.add_clip(clip);
    scene.nodes[scene.root.0].animator = Some(vec![clip]);
}

#[test]
fn test_weight_channel_with_ten_keyframes() {
    let mut scene = Scene::new("root");
    let face = scene.add_node(scene.root, SceneNode::new("face")).unwrap();
    let mesh = scene.add_mesh(face_geometry());
    scene.attach_renderer(face, Renderer::mesh(mesh, vec![])).unwrap();

    let times: Vec<f32> = (0..10).map(|i| i as f32 / 30.0).collect();
    let values: Vec<f32> = (0..10).map(|i| i as f32 / 10.0).collect();
    let mut clip = AnimationClip::new("blink");
    clip.curves.push(AnimationCurve::blend_shape_weight(face, 2, times, values.clone()));
    play_on_root(&mut scene, clip);

    let output = export(&scene).unwrap();
    let doc = &output.document;
    assert_eq!(doc.meshes[0].primitives[0].targets.len(), 2);
    let animation = &doc.animations[0];
    assert_eq!(animation.name.as_deref(), Some("blink"));
    assert_eq!(animation.channels[0].target.path, "weights");
    assert_eq!(doc.accessors[animation.samplers[0].input].count, 10);

    let out = animation.samplers[0].output;
    assert_eq!(doc.accessors[out].count, 20);
    assert_eq!(serde_json::to_value(&doc.accessors[out]).unwrap()["type"], "SCALAR");

    let range = output.accessor_ranges(out).remove(0);
    let weights: Vec<f32> = output.buffer[range]
        .chunks_exact(4)
        .map(bytemuck::pod_read_unaligned)
        .collect();
    assert_eq!(weights.len(), 20);
    for (key, pair) in weights.chunks_exact(2).enumerate() {
        assert_eq!(pair, [0.0, values[key]]);
    }
}

#[test]
fn test_single_target_weight_channel_keeps_key_count() {
    let mut scene = Scene::new("root");
    let face = scene.add_node(scene.root, SceneNode::new("face")).unwrap();
    let mut geometry = face_geometry();
    geometry.blend_shapes.truncate(2);
    let mesh = scene.add_mesh(geometry);
    scene.attach_renderer(face, Renderer::mesh(mesh, vec![])).unwrap();

    let times: Vec<f32> = (0..10).map(|i| i as f32 / 30.0).collect();
    let mut clip = AnimationClip::new("smile");
    clip.curves.push(AnimationCurve::blend_shape_weight(face, 1, times, vec![0.5; 10]));
    play_on_root(&mut scene, clip);

    let output = export(&scene).unwrap();
    let doc = &output.document;
    let out = &doc.accessors[doc.animations[0].samplers[0].output];
    assert_eq!(out.count, 10);
}

#[test]
fn test_weight_channel_without_mesh_rejected() {
    let mut scene = Scene::new("root");
    let face = scene.add_node(scene.root, SceneNode::new("face")).unwrap();
    let mut clip = AnimationClip::new("blink");
    clip.curves.push(AnimationCurve::new(face, PropertyPath::Weights, vec![0.0, 1.0], vec![0.0, 1.0]));
    play_on_root(&mut scene, clip);

    let err = export(&scene).unwrap_err();
    assert!(matches!(err, GltfExportError::WeightsChannel { .. }));
    assert!(err.is_unsupported_shape());
}

#[test]
fn test_weight_channel_on_dropped_shape_skipped() {
    let mut scene = Scene::new("root");
    let face = scene.add_node(scene.root, SceneNode::new("face")).unwrap();
    let mesh = scene.add_mesh(face_geometry());
    scene.attach_renderer(face, Renderer::mesh(mesh, vec![])).unwrap();
    let mut clip = AnimationClip::new("neutral");
    clip.curves.push(AnimationCurve::blend_shape_weight(face, 0, vec![0.0, 1.0], vec![0.0, 1.0]));
    play_on_root(&mut scene, clip);

    let output = export(&scene).unwrap();
    assert!(output.document.animations.is_empty());
}

#[test]
fn test_keyframe_count_mismatch_is_fatal() {
    let mut scene = Scene::new("root");
    let node = scene.add_node(scene.root, SceneNode::new("n")).unwrap();
    let mut clip = AnimationClip::new("move");
    clip.curves.push(AnimationCurve::new(node, PropertyPath::Translation, vec![0.0, 0.5, 1.0], vec![0.0; 6]));
    play_on_root(&mut scene, clip);

    let err = export(&scene).unwrap_err();
    assert!(matches!(err, GltfExportError::KeyframeCountMismatch { keys: 3, outputs: 2, .. }));
}

#[test]
fn test_animator_preferred_over_legacy() {
    let mut scene = Scene::new("root");
    let node = scene.add_node(scene.root, SceneNode::new("n")).unwrap();
    let make = |name: &str| {
        let mut clip = AnimationClip::new(name);
        clip.curves.push(AnimationCurve::new(node, PropertyPath::Translation, vec![0.0, 1.0], vec![0.0; 6]));
        clip
    };
    let legacy = scene.add_clip(make("legacy"));
    let modern = scene.add_clip(make("modern"));
    scene.nodes[0].legacy_animation = Some(vec![legacy]);
    scene.nodes[0].animator = Some(vec![modern]);

    let output = export(&scene).unwrap();
    assert_eq!(output.document.animations.len(), 1);
    assert_eq!(output.document.animations[0].name.as_deref(), Some("modern"));
    let out = &output.document.accessors[output.document.animations[0].samplers[0].output];
    assert_eq!(out.count, 2);

    let options = GltfExportOptions {
        export_animation: false,
        ..Default::default()
    };
    let output = GltfExporter::new(options)
        .export(&scene, &MemoryTextureProvider::new())
        .unwrap();
    assert!(output.document.animations.is_empty());
}

#[test]
fn test_unknown_animation_path_is_fatal() {
    let mut scene = Scene::new("root");
    let node = scene.add_node(scene.root, SceneNode::new("n")).unwrap();
    let mut clip = AnimationClip::new("tint");
    clip.curves.push(AnimationCurve::new(
        node,
        PropertyPath::Other("material.color".into()),
        vec![0.0, 1.0],
        vec![1.0, 1.0],
    ));
    let clip = scene.add_clip(clip);
    scene.nodes[0].animator = Some(vec![clip]);

    let err = export(&scene).unwrap_err();
    assert!(err.is_unsupported_shape());
    assert!(err.to_string().contains("material.color"));
}

// ==================== Buffer ====================

#[test]
fn test_accessor_ranges_disjoint() {
    let (mut scene, _, _) = skinned_scene();
    let mesh = scene.add_mesh(triangle("prop"));
    let prop = scene.add_node(scene.root, SceneNode::new("prop")).unwrap();
    scene.attach_renderer(prop, Renderer::mesh(mesh, vec![])).unwrap();

    let output = export(&scene).unwrap();
    assert_disjoint_ranges(&output);
}

#[test]
fn test_capacity_exceeded() {
    let mut scene = Scene::new("root");
    let mesh = scene.add_mesh(triangle("tri"));
    let node = scene.add_node(scene.root, SceneNode::new("n")).unwrap();
    scene.attach_renderer(node, Renderer::mesh(mesh, vec![])).unwrap();

    let options = GltfExportOptions {
        buffer_capacity: 16,
        ..Default::default()
    };
    let err = GltfExporter::new(options)
        .export(&scene, &MemoryTextureProvider::new())
        .unwrap_err();
    assert!(err.is_capacity_error());
}

#[test]
fn test_root_geometry_rejected() {
    let mut scene = Scene::new("root");
    let mesh = scene.add_mesh(triangle("tri"));
    scene.add_node(scene.root, SceneNode::new("child")).unwrap();
    let root = scene.root;
    scene.attach_renderer(root, Renderer::mesh(mesh, vec![])).unwrap();

    let err = export(&scene).unwrap_err();
    assert!(matches!(err, GltfExportError::RootHasGeometry { .. }));
}

// ==================== Textures ====================

/// Registers one more texture during the extension window
struct Thumbnail {
    texture: TextureId,
}

impl ExportExtension for Thumbnail {
    fn name(&self) -> &str {
        "thumbnail"
    }

    fn extensions_used(&self) -> Vec<String> {
        vec!["VENDOR_thumbnail".to_string()]
    }

    fn export(&mut self, ctx: &mut ExtensionContext<'_, '_>) -> GltfResult<()> {
        let index = ctx
            .textures
            .register(self.texture)?
            .ok_or_else(|| GltfExportError::consistency("thumbnail not exportable"))?;
        let mut extensions = serde_json::Map::new();
        extensions.insert("VENDOR_thumbnail".to_string(), json!({ "texture": index }));
        ctx.document.extensions = Some(extensions);
        Ok(())
    }
}

#[test]
fn test_late_texture_registration() {
    let mut scene = Scene::new("root");
    let albedo = scene.add_texture(TextureDesc::new("albedo"));
    let thumb = scene.add_texture(TextureDesc::new("thumb"));
    let mut material = MaterialDesc::new("skin");
    material.base_color_texture = Some(albedo);
    let material = scene.add_material(material);
    let mesh = scene.add_mesh(triangle("tri"));
    let node = scene.add_node(scene.root, SceneNode::new("n")).unwrap();
    scene.attach_renderer(node, Renderer::mesh(mesh, vec![material])).unwrap();

    let mut provider = MemoryTextureProvider::new();
    provider.insert(albedo, PNG.to_vec(), "image/png");
    provider.insert(thumb, PNG.to_vec(), "image/png");

    let mut exporter = GltfExporter::new(GltfExportOptions::default())
        .with_extension(Box::new(Thumbnail { texture: thumb }));
    let output = exporter.export(&scene, &provider).unwrap();
    let doc = &output.document;

    assert_eq!(doc.textures.len(), 2);
    assert_eq!(doc.images[0].name.as_deref(), Some("albedo"));
    assert_eq!(doc.images[1].name.as_deref(), Some("thumb"));
    assert_eq!(doc.images[1].mime_type.as_deref(), Some("image/png"));
    assert_eq!(doc.samplers.len(), 1);
    assert!(doc.extensions_used.contains(&"VENDOR_thumbnail".to_string()));
    assert_eq!(doc.extensions.as_ref().unwrap()["VENDOR_thumbnail"]["texture"], 1);
    assert_eq!(exporter.materials().len(), 1);
    assert_disjoint_ranges(&output);
}

#[test]
fn test_export_to_glb_file() {
    let (scene, _, _) = skinned_scene();
    let dir = tempfile::tempdir().unwrap();
    let mut exporter = GltfExporter::new(GltfExportOptions::default());
    let path = exporter
        .export_to_path(&scene, &MemoryTextureProvider::new(), dir.path().join("avatar.glb"))
        .unwrap();

    let bytes = std::fs::read(path).unwrap();
    assert_eq!(&bytes[..4], b"glTF");
    assert_eq!(bytes.len() % 4, 0);
}

// ==================== Properties ====================

fn random_scene(parents: &[(usize, Option<usize>)]) -> Scene {
    let mut scene = Scene::new("root");
    let meshes = [scene.add_mesh(triangle("a")), scene.add_mesh(triangle("b"))];
    let mut ids = vec![scene.root];
    for (i, &(parent, mesh)) in parents.iter().enumerate() {
        let parent = ids[parent % ids.len()];
        let id = scene.add_node(parent, SceneNode::new(format!("n{i}"))).unwrap();
        if let Some(mesh) = mesh {
            scene.attach_renderer(id, Renderer::mesh(meshes[mesh % 2], vec![])).unwrap();
        }
        ids.push(id);
    }
    scene
}

proptest! {
    #[test]
    fn test_random_scenes_export_consistently(
        parents in proptest::collection::vec((0usize..32, proptest::option::of(0usize..2)), 1..24)
    ) {
        let scene = random_scene(&parents);
        let output = export(&scene).unwrap();
        let doc = &output.document;

        prop_assert_eq!(doc.nodes.len(), parents.len());
        prop_assert!(doc.meshes.len() <= 2);
        for (i, node) in doc.nodes.iter().enumerate() {
            for &child in &node.children {
                prop_assert!(child < doc.nodes.len());
                prop_assert_ne!(child, i);
            }
            if let Some(mesh) = node.mesh {
                prop_assert!((mesh as usize) < doc.meshes.len());
            }
        }
        if !doc.meshes.is_empty() {
            assert_disjoint_ranges(&output);
        }
    }
}
