//! The transformation family.
//!
//! Every transformation maps a planar scope of the flat sheet to a
//! point-wise affine field. Outside its scope a transformation is the
//! identity. Bends additionally synthesize a rigid [`Residual`] that carries
//! the rest of the sheet along with the bent end.

pub mod axis_bend;
pub mod dir_bend;
pub mod linear;
pub mod residual;
pub mod spiral;

pub use axis_bend::AxisBend;
pub use dir_bend::DirectionalBend;
pub use linear::Linear;
pub use residual::{Residual, ResidualFrame};
pub use spiral::{Spiral, SpiralParams};

use std::f64::consts::{FRAC_PI_2, PI};

use flexfold_math::{apply_affine, Affine, Bounds3, Point2, Point3};
use flexfold_mesh::{Rgba, TriangleMesh};
use serde::{Deserialize, Serialize};

use crate::error::{DeformError, Result};
use crate::region::Region;

/// Attributes shared by every transformation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformMeta {
    /// Unique name; residuals are named `"<name>-Res"`.
    pub name: String,
    /// Advisory ordering key, lower first.
    pub priority: i32,
    /// Display color passed through to outputs.
    pub color: Option<Rgba>,
    /// Whether the engine enqueues a residual right after this one.
    pub emits_residual: bool,
}

impl TransformMeta {
    /// Metadata with priority 0, no color and a residual requested.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            priority: 0,
            color: None,
            emits_residual: true,
        }
    }

    /// Set the priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set the display color.
    pub fn with_color(mut self, color: Option<Rgba>) -> Self {
        self.color = color;
        self
    }

    /// Request or suppress the residual.
    pub fn with_residual(mut self, emits_residual: bool) -> Self {
        self.emits_residual = emits_residual;
        self
    }

    /// Metadata of the residual synthesized from this transformation.
    pub fn residual(&self) -> Self {
        Self {
            name: format!("{}-Res", self.name),
            priority: self.priority,
            color: self.color,
            emits_residual: false,
        }
    }
}

/// Axis-aligned bend direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BendDirection {
    /// Towards +X, hinge at `xmin`.
    PosX,
    /// Towards -X, hinge at `xmax`.
    NegX,
    /// Towards +Y, hinge at `ymin`.
    PosY,
    /// Towards -Y, hinge at `ymax`.
    NegY,
}

impl BendDirection {
    /// Parse `POSX`/`+X` style names (case-insensitive).
    ///
    /// `name` is the transformation the direction belongs to, for the error.
    pub fn parse(name: &str, direction: &str) -> Result<Self> {
        match direction.trim().to_ascii_uppercase().as_str() {
            "POSX" | "+X" | "X" => Ok(Self::PosX),
            "NEGX" | "-X" => Ok(Self::NegX),
            "POSY" | "+Y" | "Y" => Ok(Self::PosY),
            "NEGY" | "-Y" => Ok(Self::NegY),
            _ => Err(DeformError::UnknownBendDirection {
                name: name.to_string(),
                direction: direction.to_string(),
            }),
        }
    }

    /// Compass angle of the direction in radians.
    pub fn angle(self) -> f64 {
        match self {
            Self::PosX => 0.0,
            Self::PosY => FRAC_PI_2,
            Self::NegX => PI,
            Self::NegY => 3.0 * FRAC_PI_2,
        }
    }

    /// Index of the coordinate the bend runs along.
    pub(crate) fn axis(self) -> usize {
        match self {
            Self::PosX | Self::NegX => 0,
            Self::PosY | Self::NegY => 1,
        }
    }

    /// `+1` when the bend runs towards increasing coordinates.
    pub(crate) fn sign(self) -> f64 {
        match self {
            Self::PosX | Self::PosY => 1.0,
            Self::NegX | Self::NegY => -1.0,
        }
    }
}

/// A deformation primitive or a synthesized residual.
#[derive(Debug, Clone)]
pub enum Transformation {
    /// Bend over an axis-aligned rectangle.
    AxisBend(AxisBend),
    /// Bend over an arbitrary quadrilateral.
    DirectionalBend(DirectionalBend),
    /// Multi-turn bend built from two anchors.
    Spiral(Spiral),
    /// Arbitrary affine matrix inside a rectangle.
    Linear(Linear),
    /// Rigid continuation of a primary.
    Residual(Residual),
}

impl Transformation {
    /// Shared attributes.
    pub fn meta(&self) -> &TransformMeta {
        match self {
            Self::AxisBend(t) => &t.meta,
            Self::DirectionalBend(t) => &t.meta,
            Self::Spiral(t) => t.meta(),
            Self::Linear(t) => &t.meta,
            Self::Residual(t) => &t.meta,
        }
    }

    /// Transformation name.
    pub fn name(&self) -> &str {
        &self.meta().name
    }

    /// Advisory priority.
    pub fn priority(&self) -> i32 {
        self.meta().priority
    }

    /// Display color.
    pub fn color(&self) -> Option<Rgba> {
        self.meta().color
    }

    /// Does the engine enqueue a residual after this transformation?
    pub fn emits_residual(&self) -> bool {
        match self {
            Self::Linear(_) | Self::Residual(_) => false,
            _ => self.meta().emits_residual,
        }
    }

    /// Project-file type name.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AxisBend(_) => "ZBend",
            Self::DirectionalBend(_) => "DirBend",
            Self::Spiral(_) => "Spiral",
            Self::Linear(_) => "Linear",
            Self::Residual(_) => "Residual",
        }
    }

    /// Planar footprint within which the transformation is active.
    pub fn scope(&self) -> &Region {
        match self {
            Self::AxisBend(t) => t.scope(),
            Self::DirectionalBend(t) => t.scope(),
            Self::Spiral(t) => t.bend().scope(),
            Self::Linear(t) => t.scope(),
            Self::Residual(t) => t.scope(),
        }
    }

    /// Closed counter-clockwise outline at `z = 0`; the first point is
    /// repeated at the end.
    pub fn outline(&self) -> Vec<Point3> {
        let mut pts = self.scope().outline_pts();
        if let Some(first) = pts.first().copied() {
            pts.push(first);
        }
        pts
    }

    /// Hinge segment, if the transformation has one.
    pub fn borderline(&self) -> Option<[Point3; 2]> {
        match self {
            Self::AxisBend(t) => Some(t.borderline()),
            Self::DirectionalBend(t) => Some(t.borderline()),
            Self::Spiral(t) => Some(t.bend().borderline()),
            Self::Linear(_) | Self::Residual(_) => None,
        }
    }

    /// Affine map at `p`; the identity outside the scope.
    pub fn matrix_at(&self, p: &Point3) -> Affine {
        match self {
            Self::AxisBend(t) => t.matrix_at(p),
            Self::DirectionalBend(t) => t.matrix_at(p),
            Self::Spiral(t) => t.bend().matrix_at(p),
            Self::Linear(t) => t.matrix_at(p),
            Self::Residual(t) => t.matrix_at(p),
        }
    }

    /// Image of `p` under [`Transformation::matrix_at`].
    pub fn apply_point(&self, p: &Point3) -> Point3 {
        apply_affine(&self.matrix_at(p), p)
    }

    /// Synthesize the rigid continuation.
    ///
    /// `bounds` are the engine-wide bounds the residual scope must reach;
    /// `margin` pads them. Returns `None` when no residual is emitted.
    pub fn residual(&self, bounds: &Bounds3, margin: f64) -> Result<Option<Residual>> {
        if !self.emits_residual() {
            return Ok(None);
        }
        let residual = match self {
            Self::AxisBend(t) => t.residual(bounds, margin)?,
            Self::DirectionalBend(t) => t.residual(bounds, margin)?,
            Self::Spiral(t) => t.bend().residual(bounds, margin)?,
            Self::Linear(_) | Self::Residual(_) => return Ok(None),
        };
        Ok(Some(residual))
    }

    /// Whether the transformation maps whole meshes itself instead of
    /// exposing a field for the engine to evaluate per point.
    pub fn transform_whole_mesh(&self) -> bool {
        match self {
            Self::DirectionalBend(_) | Self::Spiral(_) => true,
            Self::Residual(t) => t.frame().is_some(),
            Self::AxisBend(_) | Self::Linear(_) => false,
        }
    }

    /// Refine `mesh` to `mel` and map it whole.
    ///
    /// Frame-rotated variants rotate the mesh so the hinge runs along Y,
    /// bend it like an axis bend and rotate it back. Returns `None` for the
    /// variants the caller evaluates per point with
    /// [`Transformation::apply_point`].
    pub fn transform_mesh(
        &self,
        mesh: &TriangleMesh,
        mel: f64,
        max_passes: usize,
    ) -> Result<Option<TriangleMesh>> {
        let mapped = match self {
            Self::DirectionalBend(t) => t.transform_mesh(mesh, mel, max_passes)?,
            Self::Spiral(t) => t.bend().transform_mesh(mesh, mel, max_passes)?,
            Self::Residual(t) if t.frame().is_some() => {
                t.transform_mesh(mesh, mel, max_passes)?
            }
            Self::AxisBend(_) | Self::Linear(_) | Self::Residual(_) => return Ok(None),
        };
        Ok(Some(mapped))
    }
}

impl From<AxisBend> for Transformation {
    fn from(t: AxisBend) -> Self {
        Self::AxisBend(t)
    }
}

impl From<DirectionalBend> for Transformation {
    fn from(t: DirectionalBend) -> Self {
        Self::DirectionalBend(t)
    }
}

impl From<Spiral> for Transformation {
    fn from(t: Spiral) -> Self {
        Self::Spiral(t)
    }
}

impl From<Linear> for Transformation {
    fn from(t: Linear) -> Self {
        Self::Linear(t)
    }
}

impl From<Residual> for Transformation {
    fn from(t: Residual) -> Self {
        Self::Residual(t)
    }
}

/// Refine a piece before mapping it, tagging failures with `name`.
pub(crate) fn refine(
    name: &str,
    mesh: &TriangleMesh,
    mel: f64,
    max_passes: usize,
) -> Result<TriangleMesh> {
    flexfold_mesh::refine_to_max_edge(mesh, mel, max_passes).map_err(|source| {
        DeformError::Refinement {
            name: name.to_string(),
            source,
        }
    })
}

/// Reject zero and non-finite bend angles.
pub(crate) fn check_angle(name: &str, angle: f64) -> Result<()> {
    if angle.is_finite() && angle != 0.0 {
        Ok(())
    } else {
        Err(DeformError::geometry(
            name,
            format!("bend angle must be finite and non-zero, got {angle}"),
        ))
    }
}

/// Convert a region construction failure into a geometry error.
pub(crate) fn polygon_region(name: &str, points: Vec<Point2>) -> Result<Region> {
    Region::new(points).map_err(|e| DeformError::geometry(name, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flexfold_math::Bounds2;

    #[test]
    fn test_parse_directions() {
        assert_eq!(BendDirection::parse("z", "POSX").unwrap(), BendDirection::PosX);
        assert_eq!(BendDirection::parse("z", "-y").unwrap(), BendDirection::NegY);
        assert_eq!(BendDirection::parse("z", " negx ").unwrap(), BendDirection::NegX);
        let err = BendDirection::parse("z", "UP").unwrap_err();
        assert!(matches!(err, DeformError::UnknownBendDirection { .. }));
        assert!((BendDirection::NegY.angle() - 1.5 * PI).abs() < 1e-15);
    }

    #[test]
    fn test_residual_meta() {
        let meta = TransformMeta::new("fold").with_priority(3);
        let res = meta.residual();
        assert_eq!(res.name, "fold-Res");
        assert_eq!(res.priority, 3);
        assert!(!res.emits_residual);
    }

    #[test]
    fn test_outline_is_closed_and_ccw() {
        let bend = AxisBend::new(
            TransformMeta::new("z"),
            Bounds2::new(-20.0, -10.0, 20.0, 10.0),
            BendDirection::PosX,
            FRAC_PI_2,
        )
        .unwrap();
        let t = Transformation::from(bend);
        let outline = t.outline();
        assert_eq!(outline.len(), 5);
        assert_eq!(outline.first(), outline.last());
        assert_eq!(t.kind(), "ZBend");
        assert!(!t.transform_whole_mesh());
    }

    #[test]
    fn test_linear_never_emits_residual() {
        let linear = Linear::new(
            TransformMeta::new("tilt"),
            Bounds2::new(0.0, 0.0, 1.0, 1.0),
            flexfold_math::Transform::rotation_y(0.3),
        )
        .unwrap();
        let t = Transformation::from(linear);
        assert!(!t.emits_residual());
        assert!(t.borderline().is_none());
        let bounds = Bounds3::from_point(&Point3::origin());
        assert!(t.residual(&bounds, 1.0).unwrap().is_none());
    }

    #[test]
    fn test_only_frame_rotated_variants_map_whole_meshes() {
        let mesh = TriangleMesh::from_parts(
            vec![
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(3.0, 1.0, 0.0),
                Point3::new(1.0, 3.0, 0.0),
            ],
            vec![[0, 1, 2]],
        );
        let bend = AxisBend::new(
            TransformMeta::new("z"),
            Bounds2::new(0.0, 0.0, 10.0, 10.0),
            BendDirection::PosX,
            FRAC_PI_2,
        )
        .unwrap();
        let t = Transformation::from(bend);
        assert!(t.transform_mesh(&mesh, 1.0, 4).unwrap().is_none());

        let quad = vec![
            Point2::new(0.0, 0.0),
            Point2::new(0.0, 10.0),
            Point2::new(-10.0, 10.0),
            Point2::new(-10.0, 0.0),
        ];
        let dir = DirectionalBend::new(TransformMeta::new("d"), quad, FRAC_PI_2).unwrap();
        let t = Transformation::from(dir);
        assert!(t.transform_whole_mesh());
        let mapped = t.transform_mesh(&mesh, 1.0, 4).unwrap().unwrap();
        assert!(mapped.num_vertices() >= mesh.num_vertices());
    }
}
