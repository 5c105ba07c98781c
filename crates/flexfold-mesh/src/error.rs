//! Error types for mesh operations.

use thiserror::Error;

/// Errors that can occur while building or refining meshes.
#[derive(Error, Debug)]
pub enum MeshError {
    /// Maximum edge length must be positive and finite.
    #[error("invalid maximum edge length: {0}")]
    InvalidEdgeLength(f64),

    /// A generator parameter is out of range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A triangle references a vertex that does not exist.
    #[error("triangle {triangle} references vertex {index}, mesh has {vertex_count} vertices")]
    IndexOutOfRange {
        /// Triangle index.
        triangle: usize,
        /// Offending vertex index.
        index: u32,
        /// Number of vertices in the mesh.
        vertex_count: usize,
    },

    /// A vertex has a NaN or infinite coordinate.
    #[error("vertex {0} has a non-finite coordinate")]
    NonFiniteVertex(usize),
}

/// Result type for mesh operations.
pub type MeshResult<T> = std::result::Result<T, MeshError>;
