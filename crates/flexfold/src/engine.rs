//! The deformation pipeline driver.
//!
//! The engine owns the layer stack and the ordered transformation list.
//! [`DeformationEngine::assign`] carves every layer into per-transformation
//! pieces and [`DeformationEngine::render`] bends those pieces in place.
//!
//! ```text
//!   empty -- add_layer --> layered -- add_transformation --> primed
//!   primed -- assign --> assigned -- render --> rendered
//! ```

use std::fmt;
use std::mem;

use flexfold_math::{Bounds3, Point3};
use flexfold_mesh::{LayerMesh, Rgba, TriangleMesh};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{DeformError, Result};
use crate::footprint::Footprint;
use crate::partition::{partition, Classifier};
use crate::progress::ProgressSink;
use crate::region::Region;
use crate::transform::{refine, Transformation};

/// Lifecycle of an engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    /// Nothing ingested.
    #[default]
    Empty,
    /// At least one layer, no transformation yet.
    Layered,
    /// Layers and transformations ingested.
    Primed,
    /// Meshes partitioned onto transformations.
    Assigned,
    /// Pieces deformed; outputs are final.
    Rendered,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Empty => "empty",
            Self::Layered => "layered",
            Self::Primed => "primed",
            Self::Assigned => "assigned",
            Self::Rendered => "rendered",
        };
        f.write_str(s)
    }
}

/// Engine tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Stop after the substrate layer (for quick previews).
    pub only_baselayer: bool,
    /// Points mapped between two progress reports.
    pub batch_size: usize,
    /// Padding added around the engine bounds for residual scopes (mm).
    pub residual_margin: f64,
    /// Refinement passes allowed per piece.
    pub max_refine_passes: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            only_baselayer: false,
            batch_size: 4096,
            residual_margin: 1.0,
            max_refine_passes: 24,
        }
    }
}

/// Recoverable conditions met while running.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EngineWarning {
    /// A transformation consumed all of the substrate's fixed remainder.
    EmptyFixedMesh {
        /// The transformation that consumed it.
        transformation: String,
        /// The substrate layer name.
        layer: String,
    },
}

impl fmt::Display for EngineWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyFixedMesh {
                transformation,
                layer,
            } => write!(
                f,
                "{transformation}: no fixed mesh left on substrate layer {layer}"
            ),
        }
    }
}

/// A sub-mesh of one layer assigned to one transformation.
#[derive(Debug, Clone, PartialEq)]
pub struct Piece {
    /// Index of the layer it was cut from.
    pub layer: usize,
    /// The geometry.
    pub mesh: TriangleMesh,
    /// Maximum edge length to refine to before bending.
    pub mel: f64,
}

/// Pieces per transformation, in transformation-list order.
#[derive(Debug, Clone, Default)]
pub struct SliceAssignment {
    pieces: Vec<Vec<Piece>>,
}

impl SliceAssignment {
    fn new(transformations: usize) -> Self {
        Self {
            pieces: vec![Vec::new(); transformations],
        }
    }

    fn push(&mut self, transformation: usize, piece: Piece) {
        if !piece.mesh.is_empty() {
            self.pieces[transformation].push(piece);
        }
    }

    /// All pieces of a transformation.
    pub fn pieces(&self, transformation: usize) -> &[Piece] {
        self.pieces.get(transformation).map_or(&[], Vec::as_slice)
    }

    /// Pieces of a transformation cut from `layer`.
    pub fn for_layer(&self, transformation: usize, layer: usize) -> impl Iterator<Item = &Piece> {
        self.pieces(transformation)
            .iter()
            .filter(move |p| p.layer == layer)
    }

    /// Triangles over every piece.
    pub fn num_triangles(&self) -> usize {
        self.pieces
            .iter()
            .flatten()
            .map(|p| p.mesh.num_triangles())
            .sum()
    }
}

/// A transformation's piece of one layer, by name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedPiece {
    /// Transformation name.
    pub transformation: String,
    /// Layer index.
    pub layer: usize,
    /// The geometry.
    pub mesh: TriangleMesh,
}

/// One layer of the result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerResult {
    /// Layer id as supplied.
    pub id: usize,
    /// Layer name.
    pub name: String,
    /// Layer color.
    pub color: Rgba,
    /// The fixed remainder plus every piece, fused.
    pub mesh: TriangleMesh,
    /// The part no transformation touched.
    pub fixed: TriangleMesh,
    /// Per-transformation pieces.
    pub pieces: Vec<NamedPiece>,
}

/// The fused output and its per-layer decomposition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeformedResult {
    /// Every layer fused into one mesh.
    pub mesh: TriangleMesh,
    /// Per-layer results, in stack order.
    pub layers: Vec<LayerResult>,
}

/// Rendering data for one transformation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransformationOutline {
    /// Transformation name.
    pub name: String,
    /// Project-file type name.
    pub kind: String,
    /// Advisory priority.
    pub priority: i32,
    /// Closed outline polyline at `z = 0`.
    pub outline: Vec<Point3>,
    /// Hinge segment, if any.
    pub hinge: Option<[Point3; 2]>,
    /// Display color.
    pub color: Option<Rgba>,
}

/// Drives partitioning and application of a transformation list over a
/// layer stack.
///
/// Layer 0 is the substrate. Vertex buffers are moved into the engine at
/// [`DeformationEngine::assign`] and rewritten in place by
/// [`DeformationEngine::render`]; clone layers beforehand to keep the flat
/// geometry.
#[derive(Debug, Default)]
pub struct DeformationEngine {
    config: EngineConfig,
    state: EngineState,
    layers: Vec<LayerMesh>,
    transformations: Vec<Transformation>,
    bounds: Option<Bounds3>,
    assignment: SliceAssignment,
    fixed_meshes: Vec<TriangleMesh>,
    fixed_scope: Option<Footprint>,
    warnings: Vec<EngineWarning>,
}

impl DeformationEngine {
    /// Create an empty engine.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Configuration in use.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Ingested layers. After assignment their meshes are empty.
    pub fn layers(&self) -> &[LayerMesh] {
        &self.layers
    }

    /// Transformations with residuals interleaved.
    pub fn transformations(&self) -> &[Transformation] {
        &self.transformations
    }

    /// Union of the ingested layer bounds.
    pub fn bounds(&self) -> Option<Bounds3> {
        self.bounds
    }

    /// Pieces per transformation.
    pub fn assignment(&self) -> &SliceAssignment {
        &self.assignment
    }

    /// Warnings collected so far.
    pub fn warnings(&self) -> &[EngineWarning] {
        &self.warnings
    }

    /// Planar footprint of the substrate's fixed remainder.
    pub fn fixed_scope(&self) -> Option<&Footprint> {
        self.fixed_scope.as_ref()
    }

    /// Outline of [`DeformationEngine::fixed_scope`].
    pub fn fixed_scope_outline(&self) -> Option<&Region> {
        self.fixed_scope.as_ref().and_then(Footprint::outline)
    }

    /// Untouched remainder of a layer, once assigned.
    pub fn fixed_mesh(&self, layer: usize) -> Option<&TriangleMesh> {
        self.fixed_meshes.get(layer)
    }

    /// Append a layer; the first one is the substrate.
    pub fn add_layer(&mut self, layer: LayerMesh) -> Result<()> {
        self.expect_state("add a layer", &[EngineState::Empty, EngineState::Layered])?;
        for (key, value) in [
            ("mel", layer.mel),
            ("mel_trans", layer.mel_trans),
            ("mel_residual", layer.mel_residual),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(DeformError::InvalidMel {
                    layer: layer.name.clone(),
                    key,
                    value,
                });
            }
        }
        layer
            .mesh
            .validate()
            .map_err(|source| DeformError::InvalidMesh {
                layer: layer.name.clone(),
                source,
            })?;
        if let Some(b) = layer.mesh.bounds() {
            self.bounds = Some(self.bounds.map_or(b, |acc| acc.union(&b)));
        }
        debug!(
            layer = %layer.name,
            vertices = layer.mesh.num_vertices(),
            triangles = layer.mesh.num_triangles(),
            "Added layer"
        );
        self.layers.push(layer);
        self.state = EngineState::Layered;
        Ok(())
    }

    /// Append a transformation, followed by its residual if it emits one.
    pub fn add_transformation(&mut self, transformation: impl Into<Transformation>) -> Result<()> {
        self.expect_state(
            "add a transformation",
            &[EngineState::Layered, EngineState::Primed],
        )?;
        let transformation = transformation.into();
        let bounds = self.bounds.unwrap_or_else(|| {
            let pts = transformation.outline();
            Bounds3::from_points(&pts).unwrap_or(Bounds3::from_point(&Point3::origin()))
        });
        let residual = transformation.residual(&bounds, self.config.residual_margin)?;
        debug!(
            name = transformation.name(),
            kind = transformation.kind(),
            residual = residual.is_some(),
            "Added transformation"
        );
        self.transformations.push(transformation);
        if let Some(residual) = residual {
            self.transformations.push(residual.into());
        }
        self.state = EngineState::Primed;
        Ok(())
    }

    /// Partition every layer against every transformation.
    ///
    /// The substrate is walked first: each transformation cuts its piece
    /// from the substrate's remaining mesh, the detached cut-off goes to the
    /// following residual, and what stays attached to the hinge becomes the
    /// new remainder. The final remainder defines the fixed scope the other
    /// layers are classified against.
    pub fn assign(&mut self, sink: &mut dyn ProgressSink) -> Result<()> {
        self.expect_state("assign", &[EngineState::Primed])?;
        let layer_count = if self.config.only_baselayer {
            self.layers.len().min(1)
        } else {
            self.layers.len()
        };
        let total = layer_count * self.transformations.len();
        let mut done = 0;

        self.assignment = SliceAssignment::new(self.transformations.len());
        self.fixed_meshes.clear();
        for li in 0..layer_count {
            let layer = &mut self.layers[li];
            sink.status(&format!("Assigning layer {}", layer.name));
            let mut remaining = mem::take(&mut layer.mesh);

            let mut tr = 0;
            while tr < self.transformations.len() {
                let t = &self.transformations[tr];
                let paired = t.emits_residual()
                    && matches!(
                        self.transformations.get(tr + 1),
                        Some(Transformation::Residual(_))
                    );
                let classifier = if li == 0 {
                    Classifier::Hinge(t.borderline())
                } else {
                    Classifier::FixedScope(self.fixed_scope.as_ref())
                };

                let had_fixed = !remaining.is_empty();
                let part = partition(&remaining, t.scope(), &classifier);
                debug!(
                    transformation = t.name(),
                    layer = %layer.name,
                    transformed = part.transformed.num_triangles(),
                    fixed = part.fixed.num_triangles(),
                    residual = part.residual.num_triangles(),
                    cut_vertices = part.cut_vertices,
                    "Partitioned"
                );

                self.assignment.push(
                    tr,
                    Piece {
                        layer: li,
                        mesh: part.transformed,
                        mel: layer.mel_trans,
                    },
                );
                remaining = part.fixed;
                if paired {
                    self.assignment.push(
                        tr + 1,
                        Piece {
                            layer: li,
                            mesh: part.residual,
                            mel: layer.mel_residual,
                        },
                    );
                } else {
                    remaining.merge(&part.residual);
                }

                if li == 0 && had_fixed && remaining.is_empty() {
                    let warning = EngineWarning::EmptyFixedMesh {
                        transformation: t.name().to_string(),
                        layer: layer.name.clone(),
                    };
                    warn!("{warning}");
                    sink.status(&warning.to_string());
                    self.warnings.push(warning);
                }

                let step = if paired { 2 } else { 1 };
                tr += step;
                done += step;
                sink.progress(done, total);
            }

            if li == 0 {
                self.fixed_scope = Some(Footprint::from_mesh(&remaining));
            }
            self.fixed_meshes.push(remaining);
        }

        info!(
            layers = layer_count,
            transformations = self.transformations.len(),
            assigned_triangles = self.assignment.num_triangles(),
            "Assigned layers"
        );
        self.state = EngineState::Assigned;
        Ok(())
    }

    /// Apply every transformation to its pieces, in list order.
    ///
    /// The untouched remainder of each layer is refined to the layer's flat
    /// `mel`. Frame-rotated transformations map their pieces whole. The
    /// others are refined to the piece's edge length target and mapped point
    /// by point in batches of [`EngineConfig::batch_size`], one progress
    /// report per batch.
    pub fn render(&mut self, sink: &mut dyn ProgressSink) -> Result<()> {
        self.expect_state("render", &[EngineState::Assigned])?;
        let passes = self.config.max_refine_passes;
        let batch = self.config.batch_size.max(1);

        sink.status("Refining fixed meshes");
        for (fixed, layer) in self.fixed_meshes.iter_mut().zip(&self.layers) {
            *fixed = refine(&layer.name, fixed, layer.mel, passes)?;
        }

        sink.status("Refining pieces");
        let whole_total: usize = self
            .transformations
            .iter()
            .enumerate()
            .filter(|(_, t)| t.transform_whole_mesh())
            .map(|(i, _)| self.assignment.pieces(i).len())
            .sum();
        let mut whole_done = 0;
        for (tr, t) in self.transformations.iter().enumerate() {
            for piece in &mut self.assignment.pieces[tr] {
                match t.transform_mesh(&piece.mesh, piece.mel, passes)? {
                    Some(mapped) => {
                        piece.mesh = mapped;
                        whole_done += 1;
                        sink.progress(whole_done, whole_total);
                    }
                    None => piece.mesh = refine(t.name(), &piece.mesh, piece.mel, passes)?,
                }
            }
        }

        sink.status("Applying transformations");
        let total: usize = self
            .transformations
            .iter()
            .enumerate()
            .filter(|(_, t)| !t.transform_whole_mesh())
            .flat_map(|(i, _)| self.assignment.pieces(i))
            .map(|p| p.mesh.num_vertices())
            .sum();
        let mut done = 0;
        for (tr, t) in self.transformations.iter().enumerate() {
            if t.transform_whole_mesh() {
                continue;
            }
            for piece in &mut self.assignment.pieces[tr] {
                for chunk in piece.mesh.vertices.chunks_mut(batch) {
                    chunk.par_iter_mut().for_each(|v| *v = t.apply_point(v));
                    done += chunk.len();
                    sink.progress(done, total);
                }
            }
        }

        info!(
            transformations = self.transformations.len(),
            points = total,
            whole_pieces = whole_total,
            "Rendered"
        );
        self.state = EngineState::Rendered;
        Ok(())
    }

    /// Fused mesh plus per-layer decomposition.
    ///
    /// Available once assigned; before rendering the pieces are still flat.
    pub fn result(&self) -> Result<DeformedResult> {
        self.expect_state("build a result", &[EngineState::Assigned, EngineState::Rendered])?;
        let mut fused = TriangleMesh::new();
        let mut layers = Vec::with_capacity(self.fixed_meshes.len());
        for (li, fixed) in self.fixed_meshes.iter().enumerate() {
            let layer = &self.layers[li];
            let mut mesh = fixed.clone();
            let mut pieces = Vec::new();
            for (tr, t) in self.transformations.iter().enumerate() {
                for piece in self.assignment.for_layer(tr, li) {
                    mesh.merge(&piece.mesh);
                    pieces.push(NamedPiece {
                        transformation: t.name().to_string(),
                        layer: li,
                        mesh: piece.mesh.clone(),
                    });
                }
            }
            fused.merge(&mesh);
            layers.push(LayerResult {
                id: layer.id,
                name: layer.name.clone(),
                color: layer.color,
                mesh,
                fixed: fixed.clone(),
                pieces,
            });
        }
        Ok(DeformedResult {
            mesh: fused,
            layers,
        })
    }

    /// Outline and hinge of every transformation, residuals included.
    pub fn outlines(&self) -> Vec<TransformationOutline> {
        self.transformations
            .iter()
            .map(|t| TransformationOutline {
                name: t.name().to_string(),
                kind: t.kind().to_string(),
                priority: t.priority(),
                outline: t.outline(),
                hinge: t.borderline(),
                color: t.color(),
            })
            .collect()
    }

    fn expect_state(&self, operation: &'static str, allowed: &[EngineState]) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(DeformError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }
}
