//! JSON project documents.
//!
//! A project lists the layer stack (mesh files plus refinement targets) and
//! the transformations, each selected by its `type`:
//!
//! ```json
//! {
//!   "mel": 2.0, "mel_trans": 0.5, "mel_residual": 2.0,
//!   "layers": [{ "name": "substrate", "file": "substrate.stl" }],
//!   "transformations": [
//!     { "type": "ZBend", "name": "fold", "priority": 0, "dir": "POSX",
//!       "xmin": -20, "xmax": 20, "ymin": -10, "ymax": 10, "angle": 90 }
//!   ]
//! }
//! ```
//!
//! Angles are given in degrees. Layer paths are relative to the project
//! file.

use std::fs;
use std::path::{Path, PathBuf};

use flexfold_math::{Bounds2, Point2, Transform};
use flexfold_mesh::{LayerMesh, Rgba, TriangleMesh};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::engine::{DeformationEngine, EngineConfig};
use crate::error::{DeformError, Result};
use crate::transform::{
    AxisBend, BendDirection, DirectionalBend, Linear, Spiral, SpiralParams, TransformMeta,
    Transformation,
};

/// A parsed project document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Default maximum edge length of the flat meshes.
    pub mel: Option<f64>,
    /// Default maximum edge length inside bends.
    pub mel_trans: Option<f64>,
    /// Default maximum edge length of residual pieces.
    pub mel_residual: Option<f64>,
    /// Vertices closer than this to a bend baseline do not count towards
    /// its length.
    #[serde(default)]
    pub baseline_epsilon: f64,
    /// Engine tuning.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Layer stack, substrate first.
    pub layers: Vec<LayerSpec>,
    /// Transformations in document order; decoded on demand.
    #[serde(default)]
    pub transformations: Vec<Value>,
}

/// One entry of the layer stack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerSpec {
    /// Layer name.
    pub name: String,
    /// Mesh file, relative to the project file.
    pub file: PathBuf,
    /// Display color.
    #[serde(default)]
    pub color: Option<Rgba>,
    /// Overrides the project `mel`.
    #[serde(default)]
    pub mel: Option<f64>,
    /// Overrides the project `mel_trans`.
    #[serde(default)]
    pub mel_trans: Option<f64>,
    /// Overrides the project `mel_residual`.
    #[serde(default)]
    pub mel_residual: Option<f64>,
}

#[derive(Deserialize)]
struct Common {
    name: String,
    #[serde(default)]
    priority: i32,
    #[serde(default)]
    color: Option<Rgba>,
    #[serde(default)]
    residual: Option<bool>,
}

#[derive(Deserialize)]
struct XY {
    x: f64,
    y: f64,
}

#[derive(Deserialize)]
struct ZBendDoc {
    xmin: f64,
    xmax: f64,
    ymin: f64,
    ymax: f64,
    angle: f64,
    dir: String,
}

#[derive(Deserialize)]
struct DirBendDoc {
    points: Vec<XY>,
    angle: f64,
}

#[derive(Deserialize)]
struct SpiralDoc {
    points: Vec<XY>,
    #[serde(default)]
    dir: Value,
    diameter: Option<f64>,
    length: Option<f64>,
    turns: Option<f64>,
    angle: Option<f64>,
}

#[derive(Deserialize)]
struct LinearDoc {
    matrix: [[f64; 4]; 4],
    xmin: f64,
    xmax: f64,
    ymin: f64,
    ymax: f64,
}

impl Project {
    /// Read and parse a project file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        let project = Self::from_json_str(&text)?;
        debug!(
            path = %path.as_ref().display(),
            layers = project.layers.len(),
            transformations = project.transformations.len(),
            "Loaded project"
        );
        Ok(project)
    }

    /// Parse a project from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Resolve the three refinement targets of layer `index`.
    pub fn layer_mel(&self, index: usize) -> Result<(f64, f64, f64)> {
        let spec = &self.layers[index];
        let pick = |own: Option<f64>, global: Option<f64>, key: &'static str| {
            own.or(global).ok_or_else(|| DeformError::MissingMel {
                layer: spec.name.clone(),
                key,
            })
        };
        Ok((
            pick(spec.mel, self.mel, "mel")?,
            pick(spec.mel_trans, self.mel_trans, "mel_trans")?,
            pick(spec.mel_residual, self.mel_residual, "mel_residual")?,
        ))
    }

    /// Mesh file of layer `index`, resolved against `project_dir`.
    pub fn layer_path(&self, index: usize, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.layers[index].file)
    }

    /// Build layer `index` around an already loaded mesh.
    pub fn layer(&self, index: usize, mesh: TriangleMesh) -> Result<LayerMesh> {
        let (mel, mel_trans, mel_residual) = self.layer_mel(index)?;
        let spec = &self.layers[index];
        Ok(LayerMesh::new(index, spec.name.clone(), mesh, mel)
            .with_mel(mel, mel_trans, mel_residual)
            .with_color(spec.color.unwrap_or_default()))
    }

    /// Decode the transformations in document order.
    pub fn transformations(&self) -> Result<Vec<Transformation>> {
        self.transformations
            .iter()
            .map(|v| parse_transformation(v, self.baseline_epsilon))
            .collect()
    }

    /// Decode the transformations and stable-sort them by priority.
    pub fn transformations_by_priority(&self) -> Result<Vec<Transformation>> {
        let mut list = self.transformations()?;
        list.sort_by_key(Transformation::priority);
        Ok(list)
    }

    /// Create an engine holding every layer (meshes in stack order) and
    /// every transformation, sorted by priority.
    ///
    /// Exactly one mesh per listed layer is required.
    pub fn build_engine(&self, meshes: Vec<TriangleMesh>) -> Result<DeformationEngine> {
        if meshes.len() != self.layers.len() {
            return Err(DeformError::LayerCountMismatch {
                expected: self.layers.len(),
                got: meshes.len(),
            });
        }
        let mut engine = DeformationEngine::new(self.engine.clone());
        for (index, mesh) in meshes.into_iter().enumerate() {
            engine.add_layer(self.layer(index, mesh)?)?;
        }
        for t in self.transformations_by_priority()? {
            engine.add_transformation(t)?;
        }
        Ok(engine)
    }
}

/// Decode one transformation object.
pub fn parse_transformation(value: &Value, baseline_epsilon: f64) -> Result<Transformation> {
    let common: Common = serde_json::from_value(value.clone())?;
    let kind = value.get("type").and_then(Value::as_str).unwrap_or_default();
    let mut meta = TransformMeta::new(common.name.clone())
        .with_priority(common.priority)
        .with_color(common.color);
    if let Some(residual) = common.residual {
        meta = meta.with_residual(residual);
    }
    let name = common.name;

    let t = match kind {
        "ZBend" => {
            let doc: ZBendDoc = serde_json::from_value(value.clone())?;
            let direction = BendDirection::parse(&name, &doc.dir)?;
            AxisBend::new(
                meta,
                Bounds2::new(doc.xmin, doc.ymin, doc.xmax, doc.ymax),
                direction,
                doc.angle.to_radians(),
            )?
            .into()
        }
        "DirBend" => {
            let doc: DirBendDoc = serde_json::from_value(value.clone())?;
            let points = doc.points.iter().map(|p| Point2::new(p.x, p.y)).collect();
            DirectionalBend::with_baseline_epsilon(
                meta,
                points,
                doc.angle.to_radians(),
                baseline_epsilon,
            )?
            .into()
        }
        "Spiral" => {
            let doc: SpiralDoc = serde_json::from_value(value.clone())?;
            if doc.points.len() != 2 {
                return Err(DeformError::geometry(
                    &name,
                    format!("spiral needs 2 anchor points, got {}", doc.points.len()),
                ));
            }
            let anchors = [
                Point2::new(doc.points[0].x, doc.points[0].y),
                Point2::new(doc.points[1].x, doc.points[1].y),
            ];
            let direction = match &doc.dir {
                Value::String(s) => BendDirection::parse(&name, s)?.angle(),
                Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
                other => {
                    return Err(DeformError::UnknownBendDirection {
                        name,
                        direction: other.to_string(),
                    })
                }
            };
            let params = SpiralParams {
                diameter: doc.diameter,
                length: doc.length,
                turns: doc.turns,
                angle: doc.angle.map(f64::to_radians),
            };
            Spiral::new(meta, anchors, direction, params)?.into()
        }
        "Linear" => {
            let doc: LinearDoc = serde_json::from_value(value.clone())?;
            Linear::new(
                meta,
                Bounds2::new(doc.xmin, doc.ymin, doc.xmax, doc.ymax),
                Transform::from_rows(&doc.matrix),
            )?
            .into()
        }
        other => {
            return Err(DeformError::UnknownTransformationType {
                name,
                kind: other.to_string(),
            })
        }
    };
    Ok(t)
}
