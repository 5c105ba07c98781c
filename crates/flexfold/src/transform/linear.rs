//! Arbitrary affine maps over a rectangle.

use flexfold_math::{affine_identity, Affine, Bounds2, Point2, Point3, Transform};

use super::TransformMeta;
use crate::error::{DeformError, Result};
use crate::region::Region;

/// Applies a fixed 4x4 transform to everything inside a rectangle.
///
/// Has no hinge and never emits a residual.
#[derive(Debug, Clone)]
pub struct Linear {
    pub(crate) meta: TransformMeta,
    rect: Bounds2,
    scope: Region,
    transform: Transform,
}

impl Linear {
    /// Apply `transform` inside `rect`.
    pub fn new(meta: TransformMeta, rect: Bounds2, transform: Transform) -> Result<Self> {
        let scope = Region::rectangle(&rect)
            .map_err(|e| DeformError::geometry(&meta.name, e.to_string()))?;
        if transform.matrix.iter().any(|v| !v.is_finite()) {
            return Err(DeformError::geometry(&meta.name, "matrix is not finite"));
        }
        Ok(Self {
            meta: meta.with_residual(false),
            rect,
            scope,
            transform,
        })
    }

    /// Planar scope.
    pub fn scope(&self) -> &Region {
        &self.scope
    }

    /// Scope rectangle.
    pub fn rect(&self) -> &Bounds2 {
        &self.rect
    }

    /// The applied transform.
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// The transform's 3x4 block inside the rectangle, identity outside.
    pub fn matrix_at(&self, p: &Point3) -> Affine {
        if self.scope.contains(&Point2::new(p.x, p.y)) {
            self.transform.to_affine()
        } else {
            affine_identity()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use flexfold_math::apply_affine;

    #[test]
    fn test_rotation_inside_identity_outside() {
        let t = Linear::new(
            TransformMeta::new("tilt"),
            Bounds2::new(-60.0, -10.0, 60.0, 10.0),
            Transform::rotation_y(-30f64.to_radians()),
        )
        .unwrap();
        let p = Point3::new(10.0, 2.0, 0.0);
        let q = apply_affine(&t.matrix_at(&p), &p);
        assert_abs_diff_eq!(q.x, 10.0 * 30f64.to_radians().cos(), epsilon = 1e-12);
        assert_abs_diff_eq!(q.z, 10.0 * 30f64.to_radians().sin(), epsilon = 1e-12);
        assert_abs_diff_eq!(q.y, 2.0);

        let outside = Point3::new(70.0, 0.0, 0.0);
        assert_eq!(apply_affine(&t.matrix_at(&outside), &outside), outside);
    }

    #[test]
    fn test_rejects_empty_rect() {
        let err = Linear::new(
            TransformMeta::new("tilt"),
            Bounds2::new(0.0, 0.0, 0.0, 1.0),
            Transform::identity(),
        );
        assert!(err.is_err());
    }
}
