//! Error types for the deformation pipeline.

use flexfold_mesh::MeshError;
use thiserror::Error;

use crate::engine::EngineState;

/// Errors raised while building transformations or running the engine.
///
/// Every variant names the transformation or layer it concerns so a caller
/// can point at the failing node.
#[derive(Error, Debug)]
pub enum DeformError {
    /// The transformation's polygon, baseline or angle is unusable.
    #[error("{name}: invalid geometry: {reason}")]
    InvalidGeometry {
        /// Transformation name.
        name: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The project document names a transformation type we do not know.
    #[error("{name}: unknown transformation type '{kind}'")]
    UnknownTransformationType {
        /// Transformation name.
        name: String,
        /// The unrecognized `type` value.
        kind: String,
    },

    /// A spiral was given all of diameter, length and turns.
    #[error("{name}: spiral is overdefined, give exactly two of diameter, length and turns/angle")]
    OverdefinedSpiral {
        /// Transformation name.
        name: String,
    },

    /// A spiral was given fewer than two of diameter, length and turns.
    #[error("{name}: spiral is underdefined, give exactly two of diameter, length and turns/angle")]
    UnderdefinedSpiral {
        /// Transformation name.
        name: String,
    },

    /// Bend direction is not one of the four axis directions.
    #[error("{name}: unknown bend direction '{direction}'")]
    UnknownBendDirection {
        /// Transformation name.
        name: String,
        /// The unrecognized direction.
        direction: String,
    },

    /// No refinement target for a layer, neither on the layer nor globally.
    #[error("layer {layer}: no {key} given for the layer or the project")]
    MissingMel {
        /// Layer name.
        layer: String,
        /// Which of `mel`, `mel_trans`, `mel_residual` is missing.
        key: &'static str,
    },

    /// A refinement target is zero, negative or not finite.
    #[error("layer {layer}: {key} must be positive, got {value}")]
    InvalidMel {
        /// Layer name.
        layer: String,
        /// Which target is invalid.
        key: &'static str,
        /// The offending value.
        value: f64,
    },

    /// A layer mesh has dangling indices or non-finite coordinates.
    #[error("layer {layer}: invalid mesh: {source}")]
    InvalidMesh {
        /// Layer name.
        layer: String,
        /// What the mesh check found.
        #[source]
        source: MeshError,
    },

    /// The number of layer meshes supplied differs from the project's
    /// layer list.
    #[error("project lists {expected} layers but {got} meshes were supplied")]
    LayerCountMismatch {
        /// Layers in the project.
        expected: usize,
        /// Meshes supplied.
        got: usize,
    },

    /// An engine operation was called out of order.
    #[error("cannot {operation} while the engine is {state}")]
    InvalidState {
        /// The attempted operation.
        operation: &'static str,
        /// State the engine was in.
        state: EngineState,
    },

    /// Refining a sub-mesh before bending failed.
    #[error("{name}: refinement failed: {source}")]
    Refinement {
        /// Transformation name, or layer name for a fixed remainder.
        name: String,
        /// Underlying mesh error.
        #[source]
        source: MeshError,
    },

    /// The project document is not valid JSON or has the wrong shape.
    #[error("invalid project document: {0}")]
    Json(#[from] serde_json::Error),

    /// The project document could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DeformError {
    /// Shorthand for [`DeformError::InvalidGeometry`].
    pub fn geometry(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for deformation operations.
pub type Result<T> = std::result::Result<T, DeformError>;
