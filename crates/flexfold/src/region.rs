//! Planar regions: the footprints transformations act on.

use flexfold_math::{Bounds2, Point2, Point3, Tolerance, Transform};
use serde::Serialize;
use thiserror::Error;

/// Reasons a point sequence is not a usable region.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegionError {
    /// Fewer than three distinct vertices.
    #[error("region needs at least 3 distinct vertices, got {0}")]
    TooFewVertices(usize),

    /// Vertices are collinear or the polygon folds onto itself.
    #[error("region has zero area")]
    ZeroArea,

    /// A coordinate is NaN or infinite.
    #[error("region has a non-finite coordinate")]
    NonFinite,
}

/// A simple closed polygon in the XY plane.
///
/// Vertices are stored counter-clockwise without a duplicated closing
/// vertex. Regions are immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Region {
    points: Vec<Point2>,
}

impl Region {
    /// Build a region, dropping repeated and closing vertices and
    /// normalizing the winding to counter-clockwise.
    pub fn new(points: Vec<Point2>) -> Result<Self, RegionError> {
        if points.iter().any(|p| !(p.x.is_finite() && p.y.is_finite())) {
            return Err(RegionError::NonFinite);
        }
        let mut pts: Vec<Point2> = Vec::with_capacity(points.len());
        for p in points {
            if pts.last() != Some(&p) {
                pts.push(p);
            }
        }
        while pts.len() > 1 && pts.first() == pts.last() {
            pts.pop();
        }
        if pts.len() < 3 {
            return Err(RegionError::TooFewVertices(pts.len()));
        }
        let area = signed_area(&pts);
        if area == 0.0 {
            return Err(RegionError::ZeroArea);
        }
        if area < 0.0 {
            pts.reverse();
        }
        Ok(Self { points: pts })
    }

    /// Axis-aligned rectangle.
    pub fn rectangle(bounds: &Bounds2) -> Result<Self, RegionError> {
        Self::new(bounds.corners().to_vec())
    }

    /// Vertices, counter-clockwise, without closing duplicate.
    pub fn exterior_coords(&self) -> &[Point2] {
        &self.points
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Regions always hold at least three vertices.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Signed area; positive because regions are stored counter-clockwise.
    pub fn signed_area(&self) -> f64 {
        signed_area(&self.points)
    }

    /// Counter-clockwise copy.
    pub fn oriented(&self) -> Region {
        self.clone()
    }

    /// Counter-clockwise vertices lifted to `z = 0`.
    pub fn outline_pts(&self) -> Vec<Point3> {
        self.points.iter().map(|p| Point3::new(p.x, p.y, 0.0)).collect()
    }

    /// Axis-aligned bounding rectangle.
    pub fn bounds(&self) -> Bounds2 {
        // A region always has vertices.
        Bounds2::from_points(&self.points).unwrap_or(Bounds2::new(0.0, 0.0, 0.0, 0.0))
    }

    /// Edges as `(start, end)` pairs, closing edge included.
    pub fn edges(&self) -> impl Iterator<Item = (Point2, Point2)> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| (self.points[i], self.points[(i + 1) % n]))
    }

    /// Is `p` inside or on the boundary?
    ///
    /// Points within [`Tolerance::DEFAULT`] of the boundary count as inside.
    pub fn contains(&self, p: &Point2) -> bool {
        self.contains_with_tol(p, Tolerance::DEFAULT.linear)
    }

    /// Like [`Region::contains`] with an explicit boundary tolerance.
    pub fn contains_with_tol(&self, p: &Point2, tol: f64) -> bool {
        if !self.bounds().contains(p, tol) {
            return false;
        }
        if self.distance_to_boundary(p) <= tol {
            return true;
        }
        // Crossing number.
        let mut inside = false;
        for (a, b) in self.edges() {
            if (a.y > p.y) != (b.y > p.y) {
                let x = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
                if p.x < x {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// Distance from `p` to the closest point of the boundary.
    pub fn distance_to_boundary(&self, p: &Point2) -> f64 {
        self.edges()
            .map(|(a, b)| distance_to_segment(p, &a, &b))
            .fold(f64::INFINITY, f64::min)
    }

    /// Copy rotated by `angle` radians about `pivot`.
    pub fn rotated_about(&self, pivot: &Point2, angle: f64) -> Region {
        let t = Transform::rotation_z_about(&Point3::new(pivot.x, pivot.y, 0.0), angle);
        let points = self
            .points
            .iter()
            .map(|p| {
                let q = t.apply_point(&Point3::new(p.x, p.y, 0.0));
                Point2::new(q.x, q.y)
            })
            .collect();
        // Rotation keeps winding and area.
        Region { points }
    }

    /// Closest point to `q` on the infinite `line`.
    pub fn nearest_point_on_line(line: &Line2, q: &Point2) -> Point2 {
        line.nearest_point(q)
    }

    /// Distance from `q` to the infinite `line`.
    pub fn distance_to_line(line: &Line2, q: &Point2) -> f64 {
        line.distance(q)
    }
}

/// Infinite line through two distinct points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Line2 {
    /// First point on the line.
    pub a: Point2,
    /// Second point on the line.
    pub b: Point2,
}

impl Line2 {
    /// Line through `a` and `b`.
    pub fn new(a: Point2, b: Point2) -> Self {
        Self { a, b }
    }

    /// Signed distance, positive on the left of `a -> b`.
    pub fn signed_distance(&self, q: &Point2) -> f64 {
        let d = self.b - self.a;
        let len = d.norm();
        if len == 0.0 {
            return (q - self.a).norm();
        }
        (d.x * (q.y - self.a.y) - d.y * (q.x - self.a.x)) / len
    }

    /// Unsigned distance from `q`.
    pub fn distance(&self, q: &Point2) -> f64 {
        self.signed_distance(q).abs()
    }

    /// Orthogonal projection of `q` onto the line.
    pub fn nearest_point(&self, q: &Point2) -> Point2 {
        let d = self.b - self.a;
        let len2 = d.norm_squared();
        if len2 == 0.0 {
            return self.a;
        }
        let t = (q - self.a).dot(&d) / len2;
        self.a + d * t
    }

    /// Portion of the infinite line inside `bounds`, `None` if it misses.
    ///
    /// Vertical and horizontal lines are handled by the slab test directly.
    pub fn clip_to_bounds(&self, bounds: &Bounds2) -> Option<(Point2, Point2)> {
        let d = self.b - self.a;
        let mut t0 = f64::NEG_INFINITY;
        let mut t1 = f64::INFINITY;
        for (origin, dir, lo, hi) in [
            (self.a.x, d.x, bounds.xmin, bounds.xmax),
            (self.a.y, d.y, bounds.ymin, bounds.ymax),
        ] {
            if dir == 0.0 {
                if origin < lo || origin > hi {
                    return None;
                }
                continue;
            }
            let (mut ta, mut tb) = ((lo - origin) / dir, (hi - origin) / dir);
            if ta > tb {
                std::mem::swap(&mut ta, &mut tb);
            }
            t0 = t0.max(ta);
            t1 = t1.min(tb);
        }
        if !(t0.is_finite() && t1.is_finite()) || t0 > t1 {
            return None;
        }
        Some((self.a + d * t0, self.a + d * t1))
    }
}

/// Distance from `p` to the segment `a`-`b`.
pub fn distance_to_segment(p: &Point2, a: &Point2, b: &Point2) -> f64 {
    let d = b - a;
    let len2 = d.norm_squared();
    if len2 == 0.0 {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&d) / len2).clamp(0.0, 1.0);
    (p - (a + d * t)).norm()
}

/// Shoelace area, positive for counter-clockwise input.
pub fn signed_area(points: &[Point2]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        area += points[i].x * points[j].y;
        area -= points[j].x * points[i].y;
    }
    area / 2.0
}
