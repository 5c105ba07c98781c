#![warn(missing_docs)]

//! Math types for the flexfold deformation engine.
//!
//! Thin wrappers around nalgebra providing domain-specific types
//! for flat-sheet deformation: points, vectors, 4x4 transforms,
//! 3x4 affine fields, bounding boxes and tolerance constants.

use nalgebra::{Matrix3x4, Matrix4, Vector2, Vector3, Vector4};
use serde::{Deserialize, Serialize};

/// A point in 3D space.
pub type Point3 = nalgebra::Point3<f64>;

/// A vector in 3D space.
pub type Vec3 = Vector3<f64>;

/// A point in the flat XY plane.
pub type Point2 = nalgebra::Point2<f64>;

/// A vector in the flat XY plane.
pub type Vec2 = Vector2<f64>;

/// A 3x4 affine map `[A | b]` acting on homogeneous points `(x, y, z, 1)`.
pub type Affine = Matrix3x4<f64>;

/// The identity affine map `[I | 0]`.
pub fn affine_identity() -> Affine {
    Affine::identity()
}

/// Apply a 3x4 affine map to a point padded to `(x, y, z, 1)`.
pub fn apply_affine(m: &Affine, p: &Point3) -> Point3 {
    let v = m * Vector4::new(p.x, p.y, p.z, 1.0);
    Point3::new(v.x, v.y, v.z)
}

/// A 4x4 affine transformation matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// The underlying 4x4 matrix.
    pub matrix: Matrix4<f64>,
}

impl Transform {
    /// Identity transform.
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Translation by `(dx, dy, dz)`.
    pub fn translation(dx: f64, dy: f64, dz: f64) -> Self {
        let mut m = Matrix4::identity();
        m[(0, 3)] = dx;
        m[(1, 3)] = dy;
        m[(2, 3)] = dz;
        Self { matrix: m }
    }

    /// Rotation about the Y axis by `angle` radians.
    pub fn rotation_y(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let mut m = Matrix4::identity();
        m[(0, 0)] = c;
        m[(0, 2)] = s;
        m[(2, 0)] = -s;
        m[(2, 2)] = c;
        Self { matrix: m }
    }

    /// Rotation about the Z axis by `angle` radians.
    pub fn rotation_z(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let mut m = Matrix4::identity();
        m[(0, 0)] = c;
        m[(0, 1)] = -s;
        m[(1, 0)] = s;
        m[(1, 1)] = c;
        Self { matrix: m }
    }

    /// Rotation by `angle` radians about the vertical axis through `pivot`.
    pub fn rotation_z_about(pivot: &Point3, angle: f64) -> Self {
        Self::translation(pivot.x, pivot.y, 0.0)
            .then(&Self::rotation_z(angle))
            .then(&Self::translation(-pivot.x, -pivot.y, 0.0))
    }

    /// Build a transform from the rows of a 4x4 matrix.
    pub fn from_rows(rows: &[[f64; 4]; 4]) -> Self {
        let mut m = Matrix4::zeros();
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                m[(r, c)] = *value;
            }
        }
        Self { matrix: m }
    }

    /// Lift a 3x4 affine map to a 4x4 transform with `[0 0 0 1]` as last row.
    pub fn from_affine(a: &Affine) -> Self {
        let mut m = Matrix4::identity();
        m.fixed_view_mut::<3, 4>(0, 0).copy_from(a);
        Self { matrix: m }
    }

    /// The upper 3x4 block of this transform.
    pub fn to_affine(&self) -> Affine {
        self.matrix.fixed_view::<3, 4>(0, 0).into_owned()
    }

    /// Compose: `self` then `other` (self * other).
    pub fn then(&self, other: &Transform) -> Self {
        Self {
            matrix: self.matrix * other.matrix,
        }
    }

    /// Transform a point.
    pub fn apply_point(&self, p: &Point3) -> Point3 {
        let v = self.matrix * Vector4::new(p.x, p.y, p.z, 1.0);
        Point3::new(v.x, v.y, v.z)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Conjugate a 3x4 field by a rigid frame: `outer * lift(m) * inner`.
///
/// Used to express a map defined in a rotated working frame in world
/// coordinates.
pub fn conjugate_affine(outer: &Transform, m: &Affine, inner: &Transform) -> Affine {
    outer
        .then(&Transform::from_affine(m))
        .then(inner)
        .to_affine()
}

/// Axis-aligned rectangle in the XY plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds2 {
    /// Minimum X.
    pub xmin: f64,
    /// Minimum Y.
    pub ymin: f64,
    /// Maximum X.
    pub xmax: f64,
    /// Maximum Y.
    pub ymax: f64,
}

impl Bounds2 {
    /// Create a rectangle from its extremes.
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    /// Smallest rectangle containing every point, `None` if empty.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point2>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut b = Self::new(first.x, first.y, first.x, first.y);
        for p in iter {
            b.xmin = b.xmin.min(p.x);
            b.ymin = b.ymin.min(p.y);
            b.xmax = b.xmax.max(p.x);
            b.ymax = b.ymax.max(p.y);
        }
        Some(b)
    }

    /// Width along X.
    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    /// Height along Y.
    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    /// Does the closed rectangle contain `p` (within `tol`)?
    pub fn contains(&self, p: &Point2, tol: f64) -> bool {
        p.x >= self.xmin - tol
            && p.x <= self.xmax + tol
            && p.y >= self.ymin - tol
            && p.y <= self.ymax + tol
    }

    /// Corners in CCW order starting at `(xmin, ymin)`.
    pub fn corners(&self) -> [Point2; 4] {
        [
            Point2::new(self.xmin, self.ymin),
            Point2::new(self.xmax, self.ymin),
            Point2::new(self.xmax, self.ymax),
            Point2::new(self.xmin, self.ymax),
        ]
    }
}

/// Axis-aligned box in 3D.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds3 {
    /// Minimum corner.
    pub min: Point3,
    /// Maximum corner.
    pub max: Point3,
}

impl Bounds3 {
    /// Box spanning a single point.
    pub fn from_point(p: &Point3) -> Self {
        Self { min: *p, max: *p }
    }

    /// Smallest box containing every point, `None` if empty.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3>) -> Option<Self> {
        let mut iter = points.into_iter();
        let mut b = Self::from_point(iter.next()?);
        for p in iter {
            b.include(p);
        }
        Some(b)
    }

    /// Grow the box to contain `p`.
    pub fn include(&mut self, p: &Point3) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    /// Smallest box containing both.
    pub fn union(&self, other: &Bounds3) -> Self {
        Self {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Projection onto the XY plane.
    pub fn xy(&self) -> Bounds2 {
        Bounds2::new(self.min.x, self.min.y, self.max.x, self.max.y)
    }
}

/// Tolerance for geometric comparisons on the flat sheet.
#[derive(Debug, Clone, Copy)]
pub struct Tolerance {
    /// Linear distance tolerance in mm.
    pub linear: f64,
}

impl Tolerance {
    /// Default tolerance (1e-6 mm).
    pub const DEFAULT: Self = Self { linear: 1e-6 };
}
