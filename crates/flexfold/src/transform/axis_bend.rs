//! Axis-aligned bends.
//!
//! A bend over a rectangle of length `L` along its direction wraps the
//! rectangle onto a circular arc of radius `r = L / angle`. Material further
//! from the hinge than `L` follows the bent end rigidly.

use flexfold_math::{affine_identity, Affine, Bounds2, Bounds3, Point2, Point3};

use super::{check_angle, BendDirection, Residual, TransformMeta};
use crate::error::{DeformError, Result};
use crate::region::Region;

/// Bend of a rectangle towards one of the four axis directions.
#[derive(Debug, Clone)]
pub struct AxisBend {
    pub(crate) meta: TransformMeta,
    rect: Bounds2,
    scope: Region,
    direction: BendDirection,
    angle: f64,
}

impl AxisBend {
    /// Bend `rect` by `angle` radians towards `direction`.
    ///
    /// Positive angles lift the far edge towards +Z.
    pub fn new(
        meta: TransformMeta,
        rect: Bounds2,
        direction: BendDirection,
        angle: f64,
    ) -> Result<Self> {
        check_angle(&meta.name, angle)?;
        if !(rect.width() > 0.0 && rect.height() > 0.0) {
            return Err(DeformError::geometry(
                &meta.name,
                format!(
                    "bend rectangle must have positive extent, got {} x {}",
                    rect.width(),
                    rect.height()
                ),
            ));
        }
        let scope = Region::rectangle(&rect)
            .map_err(|e| DeformError::geometry(&meta.name, e.to_string()))?;
        Ok(Self {
            meta,
            rect,
            scope,
            direction,
            angle,
        })
    }

    /// Planar scope.
    pub fn scope(&self) -> &Region {
        &self.scope
    }

    /// Bend rectangle.
    pub fn rect(&self) -> &Bounds2 {
        &self.rect
    }

    /// Bend direction.
    pub fn direction(&self) -> BendDirection {
        self.direction
    }

    /// Total bend angle in radians.
    pub fn angle(&self) -> f64 {
        self.angle
    }

    /// Coordinate of the hinge along the bend axis.
    pub fn hinge(&self) -> f64 {
        match self.direction {
            BendDirection::PosX => self.rect.xmin,
            BendDirection::NegX => self.rect.xmax,
            BendDirection::PosY => self.rect.ymin,
            BendDirection::NegY => self.rect.ymax,
        }
    }

    /// Extent of the rectangle along the bend axis.
    pub fn length(&self) -> f64 {
        match self.direction.axis() {
            0 => self.rect.width(),
            _ => self.rect.height(),
        }
    }

    /// Bend radius, negative for downward bends.
    pub fn radius(&self) -> f64 {
        self.length() / self.angle
    }

    /// Hinge edge of the rectangle.
    pub fn borderline(&self) -> [Point3; 2] {
        let r = &self.rect;
        let (a, b) = match self.direction {
            BendDirection::PosX => ((r.xmin, r.ymin), (r.xmin, r.ymax)),
            BendDirection::NegX => ((r.xmax, r.ymin), (r.xmax, r.ymax)),
            BendDirection::PosY => ((r.xmin, r.ymin), (r.xmax, r.ymin)),
            BendDirection::NegY => ((r.xmin, r.ymax), (r.xmax, r.ymax)),
        };
        [Point3::new(a.0, a.1, 0.0), Point3::new(b.0, b.1, 0.0)]
    }

    /// Affine map at `p`; identity outside the rectangle.
    pub fn matrix_at(&self, p: &Point3) -> Affine {
        if !self.scope.contains(&Point2::new(p.x, p.y)) {
            return affine_identity();
        }
        let (axis, sign, hinge, length) = self.frame();
        let s = (sign * (p[axis] - hinge)).clamp(0.0, length);
        arc_matrix(axis, sign, hinge, self.radius(), self.angle * s / length)
    }

    /// Rigid end state continued past the far edge.
    pub fn end_matrix(&self) -> Affine {
        let (axis, sign, hinge, length) = self.frame();
        continuation_matrix(axis, sign, hinge, length, self.angle)
    }

    /// Residual reaching from the far edge to `bounds` plus `margin`, across
    /// the whole orthogonal span.
    pub fn residual(&self, bounds: &Bounds3, margin: f64) -> Result<Residual> {
        let b = bounds.xy();
        let (_, sign, hinge, length) = self.frame();
        let far = hinge + sign * length;
        let rect = match self.direction {
            BendDirection::PosX => Bounds2::new(
                far,
                b.ymin - margin,
                b.xmax.max(far) + margin,
                b.ymax + margin,
            ),
            BendDirection::NegX => Bounds2::new(
                b.xmin.min(far) - margin,
                b.ymin - margin,
                far,
                b.ymax + margin,
            ),
            BendDirection::PosY => Bounds2::new(
                b.xmin - margin,
                far,
                b.xmax + margin,
                b.ymax.max(far) + margin,
            ),
            BendDirection::NegY => Bounds2::new(
                b.xmin - margin,
                b.ymin.min(far) - margin,
                b.xmax + margin,
                far,
            ),
        };
        let scope = Region::rectangle(&rect)
            .map_err(|e| DeformError::geometry(&self.meta.name, format!("residual scope: {e}")))?;
        Ok(Residual::new(self.meta.residual(), scope, self.end_matrix()))
    }

    fn frame(&self) -> (usize, f64, f64, f64) {
        (
            self.direction.axis(),
            self.direction.sign(),
            self.hinge(),
            self.length(),
        )
    }
}

/// Map of a bend along `axis` hinged at coordinate `hinge`, evaluated at arc
/// angle `theta`.
///
/// The bend coordinate itself drops out: it is encoded in `theta`. The
/// material normal (Z) turns with the arc.
pub(crate) fn arc_matrix(axis: usize, sign: f64, hinge: f64, radius: f64, theta: f64) -> Affine {
    let (s, c) = theta.sin_cos();
    let other = 1 - axis;
    let mut m = Affine::zeros();
    m[(other, other)] = 1.0;
    m[(axis, 2)] = -sign * s;
    m[(axis, 3)] = hinge + sign * radius * s;
    m[(2, 2)] = c;
    m[(2, 3)] = radius * (1.0 - c);
    m
}

/// Rigid motion that continues a bend of `length` and `angle` past its far
/// edge; agrees with [`arc_matrix`] at `theta = angle` on the far edge.
pub(crate) fn continuation_matrix(
    axis: usize,
    sign: f64,
    hinge: f64,
    length: f64,
    angle: f64,
) -> Affine {
    let radius = length / angle;
    let (s, c) = angle.sin_cos();
    let other = 1 - axis;
    let mut m = Affine::zeros();
    m[(other, other)] = 1.0;
    m[(axis, axis)] = c;
    m[(axis, 2)] = -sign * s;
    m[(axis, 3)] = hinge + sign * radius * s - c * hinge - sign * length * c;
    m[(2, axis)] = sign * s;
    m[(2, 2)] = c;
    m[(2, 3)] = radius * (1.0 - c) - sign * s * hinge - s * length;
    m
}
