//! Rectangular test strip generator.

use flexfold_math::Point3;

use crate::error::{MeshError, MeshResult};
use crate::TriangleMesh;

/// Build a closed box-shaped strip, centred on the origin in XY with its
/// bottom face at `z = 0`.
///
/// Top and bottom faces are regular grids with cells no larger than
/// `resolution`; the side walls reuse the grid border vertices so the result
/// is a watertight indexed mesh.
///
/// # Errors
///
/// Returns [`MeshError::InvalidParameter`] if any dimension is not positive.
pub fn strip(length: f64, width: f64, thickness: f64, resolution: f64) -> MeshResult<TriangleMesh> {
    for (name, value) in [
        ("length", length),
        ("width", width),
        ("thickness", thickness),
        ("resolution", resolution),
    ] {
        if !(value.is_finite() && value > 0.0) {
            return Err(MeshError::InvalidParameter(format!(
                "{name} must be positive, got {value}"
            )));
        }
    }

    let nx = (length / resolution).ceil().max(1.0) as usize;
    let ny = (width / resolution).ceil().max(1.0) as usize;
    let (x0, y0) = (-length / 2.0, -width / 2.0);
    let grid = (nx + 1) * (ny + 1);
    let index = |i: usize, j: usize| (j * (nx + 1) + i) as u32;

    let mut mesh = TriangleMesh::new();
    for z in [thickness, 0.0] {
        for j in 0..=ny {
            for i in 0..=nx {
                mesh.vertices.push(Point3::new(
                    x0 + length * i as f64 / nx as f64,
                    y0 + width * j as f64 / ny as f64,
                    z,
                ));
            }
        }
    }

    let bottom = grid as u32;
    for j in 0..ny {
        for i in 0..nx {
            let (a, b, c, d) = (
                index(i, j),
                index(i + 1, j),
                index(i + 1, j + 1),
                index(i, j + 1),
            );
            // Top faces up, bottom faces down.
            mesh.triangles.push([a, b, c]);
            mesh.triangles.push([a, c, d]);
            mesh.triangles.push([bottom + a, bottom + c, bottom + b]);
            mesh.triangles.push([bottom + a, bottom + d, bottom + c]);
        }
    }

    // Border loop, counter-clockwise seen from above.
    let mut ring: Vec<u32> = Vec::with_capacity(2 * (nx + ny));
    ring.extend((0..nx).map(|i| index(i, 0)));
    ring.extend((0..ny).map(|j| index(nx, j)));
    ring.extend((1..=nx).rev().map(|i| index(i, ny)));
    ring.extend((1..=ny).rev().map(|j| index(0, j)));
    for k in 0..ring.len() {
        let (ti, tj) = (ring[k], ring[(k + 1) % ring.len()]);
        let (bi, bj) = (bottom + ti, bottom + tj);
        mesh.triangles.push([bi, bj, tj]);
        mesh.triangles.push([bi, tj, ti]);
    }

    Ok(mesh)
}
