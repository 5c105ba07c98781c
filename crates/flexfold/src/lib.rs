#![warn(missing_docs)]

//! Flex-PCB deformation engine.
//!
//! Takes flat layer meshes of a flexible circuit board and bends, folds and
//! winds them into 3D. A [`DeformationEngine`] holds the layer stack and an
//! ordered list of [`Transformation`]s; [`DeformationEngine::assign`] cuts
//! every layer along each transformation's outline and
//! [`DeformationEngine::render`] maps the cut pieces into their final shape.
//!
//! # Example
//!
//! ```
//! use flexfold::{AxisBend, BendDirection, DeformationEngine, NullProgress, TransformMeta};
//! use flexfold_math::Bounds2;
//! use flexfold_mesh::{strip, LayerMesh};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut engine = DeformationEngine::default();
//! engine.add_layer(LayerMesh::new(0, "substrate", strip(120.0, 20.0, 0.1, 2.0)?, 2.0))?;
//! engine.add_transformation(AxisBend::new(
//!     TransformMeta::new("fold"),
//!     Bounds2::new(0.0, -10.0, 20.0, 10.0),
//!     BendDirection::PosX,
//!     std::f64::consts::FRAC_PI_2,
//! )?)?;
//!
//! engine.assign(&mut NullProgress)?;
//! engine.render(&mut NullProgress)?;
//! let result = engine.result()?;
//! let top = result.mesh.bounds().map_or(0.0, |b| b.max.z);
//! assert!(top > 10.0);
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod error;
pub mod footprint;
pub mod partition;
pub mod progress;
pub mod project;
pub mod region;
pub mod transform;

pub use engine::{
    DeformationEngine, DeformedResult, EngineConfig, EngineState, EngineWarning, LayerResult,
    NamedPiece, Piece, SliceAssignment, TransformationOutline,
};
pub use error::{DeformError, Result};
pub use footprint::Footprint;
pub use partition::{partition, split_by_outline, Classifier, CutMesh, Partition};
pub use progress::{CallbackProgress, NullProgress, ProgressSink, TracingProgress};
pub use project::{LayerSpec, Project};
pub use region::{Line2, Region, RegionError};
pub use transform::{
    AxisBend, BendDirection, DirectionalBend, Linear, Residual, ResidualFrame, Spiral,
    SpiralParams, TransformMeta, Transformation,
};
