//! Animation clips sampled into flat keyframe runs

use serde::{Deserialize, Serialize};

use crate::ids::NodeId;

/// Animated node property
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PropertyPath {
    Translation,
    Rotation,
    Scale,
    /// Blend-shape weights, one shape per curve or every shape packed per key
    Weights,
    /// Anything the host reports that has no glTF channel
    Other(String),
}

impl PropertyPath {
    /// Components per keyframe value, `None` for unrecognized paths
    pub fn arity(&self) -> Option<usize> {
        match self {
            PropertyPath::Translation | PropertyPath::Scale => Some(3),
            PropertyPath::Rotation => Some(4),
            PropertyPath::Weights => Some(1),
            PropertyPath::Other(_) => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PropertyPath::Translation => "translation",
            PropertyPath::Rotation => "rotation",
            PropertyPath::Scale => "scale",
            PropertyPath::Weights => "weights",
            PropertyPath::Other(path) => path,
        }
    }
}

impl From<String> for PropertyPath {
    fn from(value: String) -> Self {
        match value.as_str() {
            "translation" => PropertyPath::Translation,
            "rotation" => PropertyPath::Rotation,
            "scale" => PropertyPath::Scale,
            "weights" => PropertyPath::Weights,
            _ => PropertyPath::Other(value),
        }
    }
}

impl From<PropertyPath> for String {
    fn from(value: PropertyPath) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keyframe interpolation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Interpolation {
    #[default]
    Linear,
    Step,
    #[serde(rename = "CUBICSPLINE")]
    CubicSpline,
}

/// One animated property of one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationCurve {
    pub target: NodeId,
    pub path: PropertyPath,
    #[serde(default)]
    pub interpolation: Interpolation,
    /// Keyframe times in seconds
    pub times: Vec<f32>,
    /// Keyframe values packed as a flat scalar run
    pub values: Vec<f32>,
    /// Source blend shape driven by a weights curve
    ///
    /// `None` on a weights curve means the values already hold one weight
    /// per exported morph target for every key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blend_shape: Option<usize>,
}

impl AnimationCurve {
    pub fn new(target: NodeId, path: PropertyPath, times: Vec<f32>, values: Vec<f32>) -> Self {
        Self {
            target,
            path,
            interpolation: Interpolation::Linear,
            times,
            values,
            blend_shape: None,
        }
    }

    /// Weight curve for one blend shape of the target's mesh
    pub fn blend_shape_weight(target: NodeId, blend_shape: usize, times: Vec<f32>, values: Vec<f32>) -> Self {
        Self {
            blend_shape: Some(blend_shape),
            ..Self::new(target, PropertyPath::Weights, times, values)
        }
    }
}

/// A named animation clip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationClip {
    pub name: String,
    #[serde(default)]
    pub curves: Vec<AnimationCurve>,
}

impl AnimationClip {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            curves: Vec::new(),
        }
    }

    /// Clip length in seconds
    pub fn duration(&self) -> f32 {
        self.curves
            .iter()
            .filter_map(|c| c.times.last().copied())
            .fold(0.0, f32::max)
    }
}
