//! glTF export errors

use thiserror::Error;

/// Errors that abort an export
#[derive(Debug, Error)]
pub enum GltfExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid scene: {0}")]
    Scene(#[from] sceneport_core::Error),

    /// A reference could not be resolved against the exported set
    #[error("Consistency error: {0}")]
    Consistency(String),

    /// Node renderer matched no deduplicated mesh
    #[error("Mesh not found for node '{node}'")]
    MeshNotFound { node: String },

    #[error("Buffer capacity exceeded: {requested} bytes requested, capacity is {capacity}")]
    Capacity { requested: usize, capacity: usize },

    #[error("Unsupported animation path '{path}' in clip '{clip}'")]
    UnsupportedAnimationPath { clip: String, path: String },

    #[error("Clip '{clip}': {values} values for '{path}' are not a multiple of {arity}")]
    InvalidSampleCount {
        clip: String,
        path: String,
        values: usize,
        arity: usize,
    },

    /// Sampler input and output would disagree on the number of keys
    #[error("Clip '{clip}': '{path}' has {keys} keyframe times but {outputs} output elements, expected {expected}")]
    KeyframeCountMismatch {
        clip: String,
        path: String,
        keys: usize,
        outputs: usize,
        expected: usize,
    },

    /// A weights channel that cannot be mapped onto the node's morph targets
    #[error("Clip '{clip}': weights on node {node} {reason}")]
    WeightsChannel {
        clip: String,
        node: String,
        reason: String,
    },

    #[error("Export root '{name}' carries renderable geometry")]
    RootHasGeometry { name: String },

    #[error("Texture {texture} registered after the texture registry was closed")]
    TextureRegistryClosed { texture: usize },

    #[error("Texture '{name}': {message}")]
    Texture { name: String, message: String },
}

pub type GltfResult<T> = Result<T, GltfExportError>;

impl GltfExportError {
    pub fn consistency(message: impl Into<String>) -> Self {
        GltfExportError::Consistency(message.into())
    }

    /// Reference resolution failures, including broken scene references
    pub fn is_consistency_error(&self) -> bool {
        match self {
            GltfExportError::Consistency(_) | GltfExportError::MeshNotFound { .. } => true,
            GltfExportError::Scene(e) => e.is_reference_error(),
            _ => false,
        }
    }

    pub fn is_capacity_error(&self) -> bool {
        matches!(self, GltfExportError::Capacity { .. })
    }

    /// Input the exporter refuses to represent
    pub fn is_unsupported_shape(&self) -> bool {
        matches!(
            self,
            GltfExportError::UnsupportedAnimationPath { .. }
                | GltfExportError::InvalidSampleCount { .. }
                | GltfExportError::KeyframeCountMismatch { .. }
                | GltfExportError::WeightsChannel { .. }
                | GltfExportError::RootHasGeometry { .. }
        )
    }
}
