//! Bends hinged on an arbitrary baseline.
//!
//! The polygon's first two vertices form the baseline. Rotating the sheet
//! by `-z_angle` about the first vertex (the pivot) turns the baseline
//! parallel to Y with the polygon on its +X side, where the bend is an
//! ordinary +X axis bend hinged at `pivot.x`.

use flexfold_math::{
    affine_identity, apply_affine, conjugate_affine, Affine, Bounds2, Bounds3, Point2, Point3,
    Transform,
};
use flexfold_mesh::TriangleMesh;
use rayon::prelude::*;

use super::axis_bend::{arc_matrix, continuation_matrix};
use super::{check_angle, polygon_region, refine, Residual, ResidualFrame, TransformMeta};
use crate::error::{DeformError, Result};
use crate::region::{signed_area, Line2, Region};

/// Bend over a polygon of at least four vertices.
#[derive(Debug, Clone)]
pub struct DirectionalBend {
    pub(crate) meta: TransformMeta,
    polygon: Region,
    angle: f64,
    pivot: Point3,
    z_angle: f64,
    extended_line: (Point2, Point2),
    length: f64,
    scope_rot: Region,
    to_frame: Transform,
    from_frame: Transform,
}

impl DirectionalBend {
    /// Bend `points` by `angle` radians about the baseline `points[0]`,
    /// `points[1]`.
    pub fn new(meta: TransformMeta, points: Vec<Point2>, angle: f64) -> Result<Self> {
        Self::with_baseline_epsilon(meta, points, angle, 0.0)
    }

    /// Like [`DirectionalBend::new`], ignoring vertices closer than
    /// `baseline_epsilon` to the baseline when measuring the bend length.
    pub fn with_baseline_epsilon(
        meta: TransformMeta,
        mut points: Vec<Point2>,
        angle: f64,
        baseline_epsilon: f64,
    ) -> Result<Self> {
        let name = meta.name.clone();
        check_angle(&name, angle)?;
        if points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        if points.len() < 4 {
            return Err(DeformError::geometry(
                &name,
                format!("polygon needs at least 4 vertices, got {}", points.len()),
            ));
        }
        if points[0] == points[1] {
            return Err(DeformError::geometry(&name, "baseline is degenerate"));
        }

        // Keep the baseline first while turning the polygon counter-clockwise,
        // so the interior lies on the left of the baseline.
        let area = signed_area(&points);
        if area == 0.0 {
            return Err(DeformError::geometry(&name, "polygon has zero area"));
        }
        if area < 0.0 {
            let mut ccw = vec![points[1], points[0]];
            ccw.extend(points[2..].iter().rev());
            points = ccw;
        }

        let (a, b) = (points[0], points[1]);
        let pivot = Point3::new(a.x, a.y, 0.0);
        let z_angle = (b.x - a.x).atan2(a.y - b.y);
        let polygon = polygon_region(&name, points)?;

        let line = Line2::new(a, b);
        let extended_line = line.clip_to_bounds(&polygon.bounds()).unwrap_or((a, b));
        let length = polygon
            .exterior_coords()
            .iter()
            .map(|p| line.distance(p))
            .filter(|&d| d > baseline_epsilon)
            .fold(f64::INFINITY, f64::min);
        if !length.is_finite() {
            return Err(DeformError::geometry(
                &name,
                "every vertex lies on the baseline",
            ));
        }

        let scope_rot = polygon.rotated_about(&a, -z_angle);
        Ok(Self {
            meta,
            polygon,
            angle,
            pivot,
            z_angle,
            extended_line,
            length,
            scope_rot,
            to_frame: Transform::rotation_z_about(&pivot, -z_angle),
            from_frame: Transform::rotation_z_about(&pivot, z_angle),
        })
    }

    /// Planar scope (counter-clockwise, baseline first).
    pub fn scope(&self) -> &Region {
        &self.polygon
    }

    /// Total bend angle in radians.
    pub fn angle(&self) -> f64 {
        self.angle
    }

    /// First baseline vertex, lifted to `z = 0`.
    pub fn pivot(&self) -> Point3 {
        self.pivot
    }

    /// Rotation about Z that sends the bend direction onto +X when negated.
    pub fn z_angle(&self) -> f64 {
        self.z_angle
    }

    /// Bend length: distance from the baseline to the nearest vertex off it.
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Baseline line clipped to the polygon bounds.
    pub fn extended_line(&self) -> (Point2, Point2) {
        self.extended_line
    }

    /// Scope rotated into the working frame.
    pub fn scope_rot(&self) -> &Region {
        &self.scope_rot
    }

    /// Hinge segment: the clipped baseline.
    pub fn borderline(&self) -> [Point3; 2] {
        let (a, b) = self.extended_line;
        [Point3::new(a.x, a.y, 0.0), Point3::new(b.x, b.y, 0.0)]
    }

    /// Field of the +X axis bend in the working frame.
    ///
    /// Points behind the hinge are left alone and points past the bend
    /// length get the rigid end state.
    pub fn frame_matrix(&self, p: &Point3) -> Affine {
        let s = p.x - self.pivot.x;
        if s <= 0.0 {
            affine_identity()
        } else if s >= self.length {
            self.local_end_matrix()
        } else {
            arc_matrix(
                0,
                1.0,
                self.pivot.x,
                self.length / self.angle,
                self.angle * s / self.length,
            )
        }
    }

    /// World-frame map at `p`; identity outside the polygon.
    pub fn matrix_at(&self, p: &Point3) -> Affine {
        let local = self.to_frame.apply_point(p);
        if !self.scope_rot.contains(&Point2::new(local.x, local.y)) {
            return affine_identity();
        }
        conjugate_affine(&self.from_frame, &self.frame_matrix(&local), &self.to_frame)
    }

    /// Refine `mesh` to `mel`, then bend it in the working frame.
    pub fn transform_mesh(
        &self,
        mesh: &TriangleMesh,
        mel: f64,
        max_passes: usize,
    ) -> Result<TriangleMesh> {
        let mut out = refine(&self.meta.name, mesh, mel, max_passes)?;
        out.vertices.par_iter_mut().for_each(|v| {
            let local = self.to_frame.apply_point(v);
            let bent = apply_affine(&self.frame_matrix(&local), &local);
            *v = self.from_frame.apply_point(&bent);
        });
        Ok(out)
    }

    /// Rigid continuation beyond `pivot.x + length` in the working frame,
    /// reaching past the rotated `bounds` by `margin`.
    pub fn residual(&self, bounds: &Bounds3, margin: f64) -> Result<Residual> {
        let pivot2 = Point2::new(self.pivot.x, self.pivot.y);
        let world = bounds.xy();
        let mut rotated: Vec<Point2> = world
            .corners()
            .iter()
            .map(|c| {
                let q = self.to_frame.apply_point(&Point3::new(c.x, c.y, 0.0));
                Point2::new(q.x, q.y)
            })
            .collect();
        rotated.extend_from_slice(self.scope_rot.exterior_coords());
        let span = Bounds2::from_points(&rotated).unwrap_or(world);

        let start = self.pivot.x + self.length;
        let local_rect = Bounds2::new(
            start,
            span.ymin - margin,
            span.xmax.max(start) + margin,
            span.ymax + margin,
        );
        let scope = Region::rectangle(&local_rect)
            .map_err(|e| DeformError::geometry(&self.meta.name, format!("residual scope: {e}")))?
            .rotated_about(&pivot2, self.z_angle);

        let local = self.local_end_matrix();
        let matrix = conjugate_affine(&self.from_frame, &local, &self.to_frame);
        let frame = ResidualFrame {
            pivot: self.pivot,
            z_angle: self.z_angle,
            local,
        };
        Ok(Residual::with_frame(
            self.meta.residual(),
            scope,
            matrix,
            frame,
        ))
    }

    fn local_end_matrix(&self) -> Affine {
        continuation_matrix(0, 1.0, self.pivot.x, self.length, self.angle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

    fn skewed() -> DirectionalBend {
        DirectionalBend::new(
            TransformMeta::new("dir"),
            vec![
                Point2::new(-20.0, 10.0),
                Point2::new(0.0, -10.0),
                Point2::new(60.0, -10.0),
                Point2::new(60.0, 10.0),
            ],
            FRAC_PI_2,
        )
        .unwrap()
    }

    fn strip_bounds() -> Bounds3 {
        Bounds3::from_points(&[Point3::new(-60.0, -10.0, 0.0), Point3::new(60.0, 10.0, 0.1)])
            .unwrap()
    }

    #[test]
    fn test_derived_quantities() {
        let t = skewed();
        assert_eq!(t.pivot(), Point3::new(-20.0, 10.0, 0.0));
        assert_abs_diff_eq!(t.z_angle(), FRAC_PI_4, epsilon = 1e-12);
        // Baseline x + y = -10; nearest far vertex is (60, -10).
        assert_abs_diff_eq!(t.length(), 60.0 / 2.0f64.sqrt(), epsilon = 1e-12);
        let (a, b) = t.extended_line();
        assert_abs_diff_eq!(a.x.min(b.x), -20.0, epsilon = 1e-12);
        assert_abs_diff_eq!(a.x.max(b.x), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_axis_aligned_baseline_matches_axis_bend() {
        // Baseline running down the line x = -20 bends towards +X.
        let t = DirectionalBend::new(
            TransformMeta::new("dir"),
            vec![
                Point2::new(-20.0, 10.0),
                Point2::new(-20.0, -10.0),
                Point2::new(20.0, -10.0),
                Point2::new(20.0, 10.0),
            ],
            FRAC_PI_2,
        )
        .unwrap();
        assert_abs_diff_eq!(t.z_angle(), 0.0, epsilon = 1e-15);
        let r = 40.0 / FRAC_PI_2;
        let p = Point3::new(20.0, 0.0, 0.0);
        let q = apply_affine(&t.matrix_at(&p), &p);
        assert_abs_diff_eq!(q.x, -20.0 + r, epsilon = 1e-9);
        assert_abs_diff_eq!(q.z, r, epsilon = 1e-9);
    }

    #[test]
    fn test_clockwise_polygon_keeps_bend_side() {
        let ccw = skewed();
        let cw = DirectionalBend::new(
            TransformMeta::new("dir"),
            vec![
                Point2::new(0.0, -10.0),
                Point2::new(-20.0, 10.0),
                Point2::new(60.0, 10.0),
                Point2::new(60.0, -10.0),
            ],
            FRAC_PI_2,
        )
        .unwrap();
        assert_abs_diff_eq!(cw.z_angle(), ccw.z_angle(), epsilon = 1e-12);
        assert_eq!(cw.pivot(), ccw.pivot());
        assert_abs_diff_eq!(cw.length(), ccw.length(), epsilon = 1e-12);
    }

    #[test]
    fn test_frame_mode_equals_direct_mode() {
        let t = skewed();
        let mesh = TriangleMesh::from_parts(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(30.0, 5.0, 0.1),
                Point3::new(55.0, -9.0, 0.05),
            ],
            vec![[0, 1, 2]],
        );
        let bent = t.transform_mesh(&mesh, 1e3, 4).unwrap();
        for (before, after) in mesh.vertices.iter().zip(&bent.vertices) {
            let direct = apply_affine(&t.matrix_at(before), before);
            assert!((direct - after).norm() < 1e-9);
        }
    }

    #[test]
    fn test_identity_on_hinge_and_continuous_residual() {
        let t = skewed();
        let hinge = Point3::new(-10.0, 0.0, 0.1);
        assert!((apply_affine(&t.matrix_at(&hinge), &hinge) - hinge).norm() < 1e-9);

        let res = t.residual(&strip_bounds(), 1.0).unwrap();
        assert!(res.frame().is_some());
        // A point exactly one bend length from the baseline.
        let d = t.length() / 2.0f64.sqrt();
        let far = Point3::new(-10.0 + d, 0.0 + d, 0.05);
        let bent = {
            let local = t.to_frame.apply_point(&far);
            t.from_frame
                .apply_point(&apply_affine(&t.frame_matrix(&local), &local))
        };
        let rigid = apply_affine(&res.matrix_at(&far), &far);
        assert!((bent - rigid).norm() < 1e-9);
    }

    #[test]
    fn test_rejects_bad_polygons() {
        let meta = TransformMeta::new("dir");
        let tri = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.0, 1.0),
        ];
        assert!(DirectionalBend::new(meta.clone(), tri, 1.0).is_err());

        let degenerate = vec![
            Point2::new(0.0, 0.0),
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ];
        assert!(DirectionalBend::new(meta.clone(), degenerate, 1.0).is_err());

        let flat = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(3.0, 0.0),
        ];
        let err = DirectionalBend::new(meta, flat, 1.0).unwrap_err();
        assert!(format!("{err}").starts_with("dir: invalid geometry"));
    }

    #[test]
    fn test_baseline_epsilon_skips_near_vertices() {
        let points = vec![
            Point2::new(0.0, 10.0),
            Point2::new(0.0, -10.0),
            Point2::new(0.001, -10.0),
            Point2::new(30.0, 10.0),
        ];
        let strict = DirectionalBend::new(TransformMeta::new("d"), points.clone(), 1.0).unwrap();
        assert_abs_diff_eq!(strict.length(), 0.001, epsilon = 1e-12);
        let relaxed =
            DirectionalBend::with_baseline_epsilon(TransformMeta::new("d"), points, 1.0, 0.01)
                .unwrap();
        assert_abs_diff_eq!(relaxed.length(), 30.0, epsilon = 1e-12);
    }
}
