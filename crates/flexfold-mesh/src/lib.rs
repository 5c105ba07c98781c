#![warn(missing_docs)]

//! Triangle meshes for the flexfold deformation engine.
//!
//! Provides the indexed [`TriangleMesh`] the engine cuts and bends, the
//! per-layer [`LayerMesh`] wrapper carrying refinement targets, long-edge
//! refinement, connected components, vertex welding and a generator for
//! rectangular test strips.

pub mod error;
pub mod refine;
pub mod strip;
pub mod topology;

pub use error::{MeshError, MeshResult};
pub use refine::refine_to_max_edge;
pub use strip::strip;

use flexfold_math::{Bounds3, Point3};
use serde::{Deserialize, Serialize};

/// Indexed triangle mesh in double precision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriangleMesh {
    /// Vertex positions.
    pub vertices: Vec<Point3>,
    /// Triangles as counter-clockwise vertex index triples.
    pub triangles: Vec<[u32; 3]>,
}

impl TriangleMesh {
    /// Create an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mesh from vertices and triangles.
    pub fn from_parts(vertices: Vec<Point3>, triangles: Vec<[u32; 3]>) -> Self {
        Self {
            vertices,
            triangles,
        }
    }

    /// Number of triangles.
    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    /// Number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// A mesh without triangles is empty, whatever its vertex buffer holds.
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Corner positions of triangle `i`.
    pub fn triangle(&self, i: usize) -> [Point3; 3] {
        let [a, b, c] = self.triangles[i];
        [
            self.vertices[a as usize],
            self.vertices[b as usize],
            self.vertices[c as usize],
        ]
    }

    /// Merge another mesh into this one.
    pub fn merge(&mut self, other: &TriangleMesh) {
        let offset = self.num_vertices() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.triangles.extend(
            other
                .triangles
                .iter()
                .map(|t| [t[0] + offset, t[1] + offset, t[2] + offset]),
        );
    }

    /// Bounding box of the referenced and unreferenced vertices alike.
    pub fn bounds(&self) -> Option<Bounds3> {
        Bounds3::from_points(&self.vertices)
    }

    /// Length of the longest triangle edge, 0 for an empty mesh.
    pub fn max_edge_length(&self) -> f64 {
        self.triangles
            .iter()
            .flat_map(|t| {
                [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])]
                    .map(|(a, b)| (self.vertices[a as usize] - self.vertices[b as usize]).norm())
            })
            .fold(0.0, f64::max)
    }

    /// Check that indices are in range and coordinates are finite.
    pub fn validate(&self) -> MeshResult<()> {
        if let Some(i) = self
            .vertices
            .iter()
            .position(|v| !(v.x.is_finite() && v.y.is_finite() && v.z.is_finite()))
        {
            return Err(MeshError::NonFiniteVertex(i));
        }
        let vertex_count = self.vertices.len();
        for (triangle, t) in self.triangles.iter().enumerate() {
            if let Some(&index) = t.iter().find(|&&i| i as usize >= vertex_count) {
                return Err(MeshError::IndexOutOfRange {
                    triangle,
                    index,
                    vertex_count,
                });
            }
        }
        Ok(())
    }
}

/// RGBA color in `[0, 1]`, serialized as a four-element array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rgba(pub [f32; 4]);

impl Default for Rgba {
    fn default() -> Self {
        Self([0.8, 0.6, 0.2, 1.0])
    }
}

/// One layer of the board stack: a mesh plus its refinement targets.
///
/// `mel` applies before bending, `mel_trans` to pieces inside a bend and
/// `mel_residual` to pieces carried rigidly by a residual.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerMesh {
    /// Position in the stack; layer 0 is the substrate.
    pub id: usize,
    /// Human-readable layer name.
    pub name: String,
    /// Display color.
    pub color: Rgba,
    /// Layer geometry.
    pub mesh: TriangleMesh,
    /// Maximum edge length of the flat mesh.
    pub mel: f64,
    /// Maximum edge length inside bends.
    pub mel_trans: f64,
    /// Maximum edge length of residual pieces.
    pub mel_residual: f64,
}

impl LayerMesh {
    /// Create a layer with all refinement targets set to `mel`.
    pub fn new(id: usize, name: impl Into<String>, mesh: TriangleMesh, mel: f64) -> Self {
        Self {
            id,
            name: name.into(),
            color: Rgba::default(),
            mesh,
            mel,
            mel_trans: mel,
            mel_residual: mel,
        }
    }

    /// Set the three refinement targets.
    pub fn with_mel(mut self, mel: f64, mel_trans: f64, mel_residual: f64) -> Self {
        self.mel = mel;
        self.mel_trans = mel_trans;
        self.mel_residual = mel_residual;
        self
    }

    /// Set the display color.
    pub fn with_color(mut self, color: Rgba) -> Self {
        self.color = color;
        self
    }
}
