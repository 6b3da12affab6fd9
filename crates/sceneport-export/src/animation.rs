//! Animation clip encoding
//!
//! Each transform curve becomes one sampler and one channel. Times are
//! written as a SCALAR accessor; values are written as a flat float run and
//! then viewed as SCALAR, VEC3 or VEC4 according to the arity of the
//! animated path.
//!
//! Weights curves of one node are merged into a single channel whose output
//! holds a full weights vector per key, one slot per exported morph target.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use sceneport_core::{Quat, Vec3};
use sceneport_scene::{AnimationClip, AnimationCurve, ClipId, Interpolation, MeshId, NodeId, PropertyPath, Scene};

use crate::axis::Axis;
use crate::buffer::{BufferTarget, BufferWriter};
use crate::error::{GltfExportError, GltfResult};
use crate::gltf::{AccessorType, Animation, AnimationSampler, Channel, ChannelTarget};
use crate::mesh::MeshWithMaterials;
use crate::node::NodeIndex;

/// Morph target layout of the mesh drawn by one exported node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MorphTargets {
    /// Blend shapes on the source geometry
    pub source_count: usize,
    /// Source blend shape to exported target
    pub remap: BTreeMap<usize, usize>,
}

impl MorphTargets {
    /// Length of one weights vector
    pub fn count(&self) -> usize {
        self.remap.len()
    }
}

/// Morph targets keyed by the node drawing the mesh
pub type MorphTargetIndex = HashMap<NodeId, MorphTargets>;

/// Morph targets of every node that draws an exported mesh
pub fn collect_morph_targets(
    scene: &Scene,
    instances: &[MeshWithMaterials],
    blend_shape_maps: &HashMap<MeshId, BTreeMap<usize, usize>>,
) -> GltfResult<MorphTargetIndex> {
    let mut morphs = MorphTargetIndex::new();
    for instance in instances {
        let Some(remap) = blend_shape_maps.get(&instance.mesh) else {
            continue;
        };
        morphs.insert(
            instance.node,
            MorphTargets {
                source_count: scene.mesh(instance.mesh)?.blend_shapes.len(),
                remap: remap.clone(),
            },
        );
    }
    Ok(morphs)
}

fn interpolation_name(interpolation: Interpolation) -> &'static str {
    match interpolation {
        Interpolation::Linear => "LINEAR",
        Interpolation::Step => "STEP",
        Interpolation::CubicSpline => "CUBICSPLINE",
    }
}

/// Mirror keyframe values element by element
fn convert_values(path: &PropertyPath, values: &[f32], axis: Axis) -> Vec<f32> {
    match path {
        PropertyPath::Translation => values
            .chunks_exact(3)
            .flat_map(|v| axis.invert_vec3(Vec3::new(v[0], v[1], v[2])).to_array())
            .collect(),
        PropertyPath::Rotation => values
            .chunks_exact(4)
            .flat_map(|q| axis.invert_quat(Quat::new(q[0], q[1], q[2], q[3])).to_array())
            .collect(),
        PropertyPath::Scale => values
            .chunks_exact(3)
            .flat_map(|s| axis.invert_scale(Vec3::new(s[0], s[1], s[2])).to_array())
            .collect(),
        PropertyPath::Weights | PropertyPath::Other(_) => values.to_vec(),
    }
}

/// Output elements per key: CUBICSPLINE stores in-tangent, value, out-tangent
fn keyframe_parts(interpolation: Interpolation) -> usize {
    match interpolation {
        Interpolation::CubicSpline => 3,
        Interpolation::Linear | Interpolation::Step => 1,
    }
}

fn check_keyframes(clip: &AnimationClip, curve: &AnimationCurve, outputs: usize) -> GltfResult<()> {
    let expected = curve.times.len() * keyframe_parts(curve.interpolation);
    if outputs != expected {
        return Err(GltfExportError::KeyframeCountMismatch {
            clip: clip.name.clone(),
            path: curve.path.to_string(),
            keys: curve.times.len(),
            outputs,
            expected,
        });
    }
    Ok(())
}

fn write_sampler(
    writer: &mut BufferWriter,
    times: &[f32],
    values: &[f32],
    shape: AccessorType,
    arity: usize,
    interpolation: Interpolation,
) -> GltfResult<AnimationSampler> {
    let input = writer.push_accessor_with_bounds(times, BufferTarget::None)?;
    let output = writer.push_accessor(values, BufferTarget::None)?;
    writer.reshape_accessor(output, shape, values.len() / arity)?;

    Ok(AnimationSampler {
        input,
        output,
        interpolation: interpolation_name(interpolation).to_string(),
    })
}

fn export_curve(
    clip: &AnimationClip,
    curve: &AnimationCurve,
    writer: &mut BufferWriter,
    axis: Axis,
) -> GltfResult<AnimationSampler> {
    let unsupported = || GltfExportError::UnsupportedAnimationPath {
        clip: clip.name.clone(),
        path: curve.path.to_string(),
    };
    let arity = curve.path.arity().ok_or_else(unsupported)?;
    let shape = AccessorType::from_arity(arity).ok_or_else(unsupported)?;

    if curve.values.len() % arity != 0 {
        return Err(GltfExportError::InvalidSampleCount {
            clip: clip.name.clone(),
            path: curve.path.to_string(),
            values: curve.values.len(),
            arity,
        });
    }
    check_keyframes(clip, curve, curve.values.len() / arity)?;

    let values = convert_values(&curve.path, &curve.values, axis);
    write_sampler(writer, &curve.times, &values, shape, arity, curve.interpolation)
}

/// One node's weights curves folded into a single keyed weights run
struct PackedWeights<'a> {
    times: &'a [f32],
    values: Vec<f32>,
    interpolation: Interpolation,
}

fn pack_weights<'a>(
    clip: &AnimationClip,
    node: NodeId,
    curves: &[&'a AnimationCurve],
    morphs: &MorphTargetIndex,
) -> GltfResult<Option<PackedWeights<'a>>> {
    let invalid = |reason: String| GltfExportError::WeightsChannel {
        clip: clip.name.clone(),
        node: node.to_string(),
        reason,
    };
    let targets = morphs
        .get(&node)
        .filter(|targets| targets.source_count > 0)
        .ok_or_else(|| invalid("target a node without a blend-shape mesh".to_string()))?;
    let count = targets.count();

    let per_shape: Option<Vec<(usize, &AnimationCurve)>> = curves
        .iter()
        .map(|&curve| curve.blend_shape.map(|shape| (shape, curve)))
        .collect();

    // Values already hold one weight per exported target
    let Some(per_shape) = per_shape else {
        let &[curve] = curves else {
            return Err(invalid("mix packed and per-shape curves".to_string()));
        };
        if count == 0 {
            warn!(clip = %clip.name, node = %node, "Mesh exports no morph targets, skipping weights");
            return Ok(None);
        }
        if curve.values.len() % count != 0 {
            return Err(GltfExportError::InvalidSampleCount {
                clip: clip.name.clone(),
                path: curve.path.to_string(),
                values: curve.values.len(),
                arity: count,
            });
        }
        check_keyframes(clip, curve, curve.values.len() / count)?;
        return Ok(Some(PackedWeights {
            times: &curve.times,
            values: curve.values.clone(),
            interpolation: curve.interpolation,
        }));
    };

    let mut slots: Vec<(usize, &AnimationCurve)> = Vec::with_capacity(per_shape.len());
    for (shape, curve) in per_shape {
        if shape >= targets.source_count {
            return Err(invalid(format!(
                "animate blend shape {shape}, the mesh has {}",
                targets.source_count
            )));
        }
        let Some(&slot) = targets.remap.get(&shape) else {
            warn!(clip = %clip.name, node = %node, blend_shape = shape, "Blend shape was not exported, skipping its weights");
            continue;
        };
        if slots.iter().any(|&(taken, _)| taken == slot) {
            return Err(invalid(format!("animate blend shape {shape} twice")));
        }
        check_keyframes(clip, curve, curve.values.len())?;
        slots.push((slot, curve));
    }

    let Some(&(_, first)) = slots.first() else {
        return Ok(None);
    };
    if slots
        .iter()
        .any(|(_, curve)| curve.times != first.times || curve.interpolation != first.interpolation)
    {
        return Err(invalid("use different keyframes per blend shape".to_string()));
    }

    let mut values = vec![0.0; first.values.len() * count];
    for &(slot, curve) in &slots {
        for (element, &value) in curve.values.iter().enumerate() {
            values[element * count + slot] = value;
        }
    }

    Ok(Some(PackedWeights {
        times: &first.times,
        values,
        interpolation: first.interpolation,
    }))
}

fn push_channel(animation: &mut Animation, sampler: AnimationSampler, node: usize, path: &PropertyPath) {
    animation.channels.push(Channel {
        sampler: animation.samplers.len(),
        target: ChannelTarget {
            node,
            path: path.to_string(),
        },
    });
    animation.samplers.push(sampler);
}

/// Encode one clip; `None` when nothing in it can be exported
pub fn export_clip(
    clip: &AnimationClip,
    index: &NodeIndex,
    morphs: &MorphTargetIndex,
    writer: &mut BufferWriter,
    axis: Axis,
) -> GltfResult<Option<Animation>> {
    let mut animation = Animation {
        name: Some(clip.name.clone()),
        ..Default::default()
    };
    let mut weights: Vec<(NodeId, usize, Vec<&AnimationCurve>)> = Vec::new();

    for curve in &clip.curves {
        if curve.times.is_empty() || curve.values.is_empty() {
            warn!(clip = %clip.name, path = %curve.path, "Curve has no keyframes, skipping");
            continue;
        }
        let Some(node) = index.get(curve.target) else {
            warn!(clip = %clip.name, target = %curve.target, "Curve targets a node that is not exported, skipping");
            continue;
        };

        if curve.path == PropertyPath::Weights {
            match weights.iter_mut().find(|(target, _, _)| *target == curve.target) {
                Some((_, _, curves)) => curves.push(curve),
                None => weights.push((curve.target, node, vec![curve])),
            }
            continue;
        }

        let sampler = export_curve(clip, curve, writer, axis)?;
        push_channel(&mut animation, sampler, node, &curve.path);
    }

    for (target, node, curves) in &weights {
        let Some(packed) = pack_weights(clip, *target, curves, morphs)? else {
            continue;
        };
        let sampler = write_sampler(
            writer,
            packed.times,
            &packed.values,
            AccessorType::Scalar,
            1,
            packed.interpolation,
        )?;
        push_channel(&mut animation, sampler, *node, &PropertyPath::Weights);
    }

    if animation.channels.is_empty() {
        warn!(clip = %clip.name, "Clip has no exportable curves");
        return Ok(None);
    }
    debug!(clip = %clip.name, channels = animation.channels.len(), "Clip encoded");
    Ok(Some(animation))
}

/// Encode every clip in order
pub fn export_animations(
    scene: &Scene,
    clips: &[ClipId],
    index: &NodeIndex,
    morphs: &MorphTargetIndex,
    writer: &mut BufferWriter,
    axis: Axis,
) -> GltfResult<Vec<Animation>> {
    let mut animations = Vec::new();
    for &id in clips {
        if let Some(animation) = export_clip(scene.clip(id)?, index, morphs, writer, axis)? {
            animations.push(animation);
        }
    }
    Ok(animations)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> NodeIndex {
        NodeIndex::new(&[NodeId(1), NodeId(2)])
    }

    /// Node 1 draws a mesh with three blend shapes; the first was dropped
    fn face_targets() -> MorphTargetIndex {
        MorphTargetIndex::from([(
            NodeId(1),
            MorphTargets {
                source_count: 3,
                remap: BTreeMap::from([(1, 0), (2, 1)]),
            },
        )])
    }

    fn output_floats(writer: BufferWriter, accessor: usize) -> Vec<f32> {
        let view = writer.accessors()[accessor].buffer_view.unwrap();
        let range = writer.buffer_views()[view].range();
        let (data, _, _) = writer.finish();
        data[range].chunks_exact(4).map(bytemuck::pod_read_unaligned).collect()
    }

    fn keys(n: usize) -> Vec<f32> {
        (0..n).map(|i| i as f32 * 0.1).collect()
    }

    #[test]
    fn test_output_count_divided_by_arity() {
        let mut clip = AnimationClip::new("spin");
        clip.curves.push(AnimationCurve::new(
            NodeId(2),
            PropertyPath::Rotation,
            vec![0.0, 1.0, 2.0],
            vec![0.0, 0.0, 0.0, 1.0].repeat(3),
        ));
        let mut writer = BufferWriter::default();
        let animation = export_clip(&clip, &index(), &MorphTargetIndex::new(), &mut writer, Axis::Z)
            .unwrap()
            .unwrap();

        assert_eq!(animation.name.as_deref(), Some("spin"));
        assert_eq!(animation.channels[0].target.node, 1);
        assert_eq!(animation.channels[0].target.path, "rotation");
        let input = &writer.accessors()[animation.samplers[0].input];
        assert_eq!(input.count, 3);
        assert_eq!(input.max.as_deref(), Some(&[2.0][..]));
        let output = &writer.accessors()[animation.samplers[0].output];
        assert_eq!(output.count, 3);
        assert_eq!(output.accessor_type, AccessorType::Vec4);
    }

    #[test]
    fn test_linear_keyframe_count_mismatch() {
        let mut clip = AnimationClip::new("move");
        clip.curves.push(AnimationCurve::new(NodeId(1), PropertyPath::Translation, keys(3), vec![0.0; 6]));
        let mut writer = BufferWriter::default();
        let err = export_clip(&clip, &index(), &MorphTargetIndex::new(), &mut writer, Axis::None).unwrap_err();

        assert!(matches!(
            err,
            GltfExportError::KeyframeCountMismatch { keys: 3, outputs: 2, expected: 3, .. }
        ));
        assert!(writer.accessors().is_empty());
    }

    #[test]
    fn test_cubic_spline_keyframe_counts() {
        let mut curve = AnimationCurve::new(NodeId(1), PropertyPath::Translation, keys(2), vec![1.0; 18]);
        curve.interpolation = Interpolation::CubicSpline;
        let mut clip = AnimationClip::new("ease");
        clip.curves.push(curve.clone());

        let mut writer = BufferWriter::default();
        let animation = export_clip(&clip, &index(), &MorphTargetIndex::new(), &mut writer, Axis::None)
            .unwrap()
            .unwrap();
        assert_eq!(animation.samplers[0].interpolation, "CUBICSPLINE");
        assert_eq!(writer.accessors()[animation.samplers[0].input].count, 2);
        assert_eq!(writer.accessors()[animation.samplers[0].output].count, 6);

        // One VEC3 per key is only enough for LINEAR
        clip.curves[0].values = vec![1.0; 6];
        let mut writer = BufferWriter::default();
        let err = export_clip(&clip, &index(), &MorphTargetIndex::new(), &mut writer, Axis::None).unwrap_err();
        assert!(matches!(
            err,
            GltfExportError::KeyframeCountMismatch { keys: 2, outputs: 2, expected: 6, .. }
        ));
        assert!(writer.accessors().is_empty());
    }

    #[test]
    fn test_weight_curve_packed_per_target() {
        let mut clip = AnimationClip::new("blink");
        let values: Vec<f32> = (0..10).map(|i| i as f32 / 10.0).collect();
        clip.curves.push(AnimationCurve::blend_shape_weight(NodeId(1), 2, keys(10), values.clone()));
        let mut writer = BufferWriter::default();
        let animation = export_clip(&clip, &index(), &face_targets(), &mut writer, Axis::Z)
            .unwrap()
            .unwrap();

        assert_eq!(animation.channels[0].target.path, "weights");
        assert_eq!(writer.accessors()[animation.samplers[0].input].count, 10);
        let output = animation.samplers[0].output;
        assert_eq!(writer.accessors()[output].count, 20);
        assert_eq!(writer.accessors()[output].accessor_type, AccessorType::Scalar);

        let packed = output_floats(writer, output);
        for (key, pair) in packed.chunks_exact(2).enumerate() {
            assert_eq!(pair, [0.0, values[key]]);
        }
    }

    #[test]
    fn test_weight_curves_of_one_node_merged() {
        let mut clip = AnimationClip::new("talk");
        clip.curves.push(AnimationCurve::blend_shape_weight(NodeId(1), 1, keys(2), vec![0.25, 0.5]));
        clip.curves.push(AnimationCurve::blend_shape_weight(NodeId(1), 2, keys(2), vec![1.0, 0.75]));
        let mut writer = BufferWriter::default();
        let animation = export_clip(&clip, &index(), &face_targets(), &mut writer, Axis::None)
            .unwrap()
            .unwrap();

        assert_eq!(animation.channels.len(), 1);
        let output = animation.samplers[0].output;
        assert_eq!(output_floats(writer, output), vec![0.25, 1.0, 0.5, 0.75]);
    }

    #[test]
    fn test_packed_weights_checked_against_target_count() {
        let mut clip = AnimationClip::new("blink");
        clip.curves.push(AnimationCurve::new(NodeId(1), PropertyPath::Weights, keys(3), vec![0.5; 6]));
        let mut writer = BufferWriter::default();
        let animation = export_clip(&clip, &index(), &face_targets(), &mut writer, Axis::None)
            .unwrap()
            .unwrap();
        assert_eq!(writer.accessors()[animation.samplers[0].output].count, 6);

        clip.curves[0].values = vec![0.5; 4];
        let err = export_clip(&clip, &index(), &face_targets(), &mut BufferWriter::default(), Axis::None)
            .unwrap_err();
        assert!(matches!(
            err,
            GltfExportError::KeyframeCountMismatch { keys: 3, outputs: 2, expected: 3, .. }
        ));
    }

    #[test]
    fn test_weights_need_a_blend_shape_mesh() {
        let mut clip = AnimationClip::new("blink");
        clip.curves.push(AnimationCurve::blend_shape_weight(NodeId(2), 0, keys(2), vec![0.0, 1.0]));
        let err = export_clip(&clip, &index(), &face_targets(), &mut BufferWriter::default(), Axis::None)
            .unwrap_err();
        assert!(err.is_unsupported_shape());
        assert!(matches!(err, GltfExportError::WeightsChannel { ref node, .. } if node == "2"));

        clip.curves[0] = AnimationCurve::blend_shape_weight(NodeId(1), 3, keys(2), vec![0.0, 1.0]);
        let err = export_clip(&clip, &index(), &face_targets(), &mut BufferWriter::default(), Axis::None)
            .unwrap_err();
        assert!(err.to_string().contains("blend shape 3"));
    }

    #[test]
    fn test_weights_on_dropped_shape_skipped() {
        let mut clip = AnimationClip::new("neutral");
        clip.curves.push(AnimationCurve::blend_shape_weight(NodeId(1), 0, keys(2), vec![0.0, 1.0]));
        let mut writer = BufferWriter::default();
        assert!(export_clip(&clip, &index(), &face_targets(), &mut writer, Axis::None)
            .unwrap()
            .is_none());
        assert!(writer.accessors().is_empty());
    }

    #[test]
    fn test_translation_mirrored() {
        let converted = convert_values(&PropertyPath::Translation, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], Axis::Z);
        assert_eq!(converted, vec![1.0, 2.0, -3.0, 4.0, 5.0, -6.0]);
        let scale = convert_values(&PropertyPath::Scale, &[1.0, 2.0, 3.0], Axis::X);
        assert_eq!(scale, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_unknown_path_rejected() {
        let mut clip = AnimationClip::new("tint");
        clip.curves.push(AnimationCurve::new(
            NodeId(1),
            PropertyPath::Other("material.color".into()),
            vec![0.0],
            vec![1.0, 0.0],
        ));
        let err = export_clip(&clip, &index(), &MorphTargetIndex::new(), &mut BufferWriter::default(), Axis::None)
            .unwrap_err();
        assert!(matches!(err, GltfExportError::UnsupportedAnimationPath { ref path, .. } if path == "material.color"));
    }

    #[test]
    fn test_ragged_values_rejected() {
        let mut clip = AnimationClip::new("move");
        clip.curves.push(AnimationCurve::new(NodeId(1), PropertyPath::Translation, vec![0.0], vec![1.0, 2.0]));
        let err = export_clip(&clip, &index(), &MorphTargetIndex::new(), &mut BufferWriter::default(), Axis::None)
            .unwrap_err();
        assert!(matches!(err, GltfExportError::InvalidSampleCount { values: 2, arity: 3, .. }));
    }

    #[test]
    fn test_unexported_targets_and_empty_clips_skipped() {
        let mut clip = AnimationClip::new("root-motion");
        clip.curves.push(AnimationCurve::new(NodeId(0), PropertyPath::Translation, vec![0.0], vec![0.0; 3]));
        clip.curves.push(AnimationCurve::new(NodeId(1), PropertyPath::Scale, vec![], vec![]));
        let mut writer = BufferWriter::default();
        assert!(export_clip(&clip, &index(), &MorphTargetIndex::new(), &mut writer, Axis::Z)
            .unwrap()
            .is_none());
        assert!(writer.accessors().is_empty());
    }
}
