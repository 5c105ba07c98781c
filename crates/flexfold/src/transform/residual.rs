//! Rigid continuation of a primary transformation.

use flexfold_math::{affine_identity, apply_affine, Affine, Point2, Point3, Transform};
use flexfold_mesh::TriangleMesh;
use rayon::prelude::*;
use serde::Serialize;

use super::{refine, TransformMeta};
use crate::error::Result;
use crate::region::Region;

/// Working frame inherited from a frame-rotated primary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResidualFrame {
    /// Rotation pivot.
    pub pivot: Point3,
    /// Rotation about Z aligning the primary's bend direction with +X.
    pub z_angle: f64,
    /// The rigid map expressed in the working frame.
    pub local: Affine,
}

/// A rigid affine map active inside its region.
#[derive(Debug, Clone)]
pub struct Residual {
    pub(crate) meta: TransformMeta,
    scope: Region,
    matrix: Affine,
    frame: Option<ResidualFrame>,
}

impl Residual {
    /// Residual applying `matrix` inside `scope`.
    pub fn new(meta: TransformMeta, scope: Region, matrix: Affine) -> Self {
        Self {
            meta: meta.with_residual(false),
            scope,
            matrix,
            frame: None,
        }
    }

    /// Residual that maps whole meshes through `frame`.
    ///
    /// `matrix` must equal `frame.local` conjugated into world coordinates.
    pub fn with_frame(
        meta: TransformMeta,
        scope: Region,
        matrix: Affine,
        frame: ResidualFrame,
    ) -> Self {
        Self {
            frame: Some(frame),
            ..Self::new(meta, scope, matrix)
        }
    }

    /// Region the residual covers.
    pub fn scope(&self) -> &Region {
        &self.scope
    }

    /// World-frame rigid map.
    pub fn matrix(&self) -> &Affine {
        &self.matrix
    }

    /// Inherited working frame, if any.
    pub fn frame(&self) -> Option<&ResidualFrame> {
        self.frame.as_ref()
    }

    /// The stored map inside the scope, identity outside.
    pub fn matrix_at(&self, p: &Point3) -> Affine {
        if self.scope.contains(&Point2::new(p.x, p.y)) {
            self.matrix
        } else {
            affine_identity()
        }
    }

    /// Refine `mesh` to `mel` and carry every vertex along.
    ///
    /// The whole piece moves regardless of the scope: through the frame when
    /// there is one, by the world matrix otherwise.
    pub fn transform_mesh(
        &self,
        mesh: &TriangleMesh,
        mel: f64,
        max_passes: usize,
    ) -> Result<TriangleMesh> {
        let mut out = refine(&self.meta.name, mesh, mel, max_passes)?;
        match &self.frame {
            Some(frame) => {
                let to = Transform::rotation_z_about(&frame.pivot, -frame.z_angle);
                let from = Transform::rotation_z_about(&frame.pivot, frame.z_angle);
                out.vertices.par_iter_mut().for_each(|v| {
                    let local = apply_affine(&frame.local, &to.apply_point(v));
                    *v = from.apply_point(&local);
                });
            }
            None => {
                let matrix = self.matrix;
                out.vertices
                    .par_iter_mut()
                    .for_each(|v| *v = apply_affine(&matrix, v));
            }
        }
        Ok(out)
    }
}
