//! Long-edge refinement towards a maximum edge length.
//!
//! Every pass marks the edges longer than the target, inserts one shared
//! midpoint per marked edge and re-splits the affected triangles into 2, 3
//! or 4 children. Short edges are never touched, and because midpoints are
//! shared through an edge map the result stays conforming.

use std::collections::HashMap;

use flexfold_math::Point3;
use tracing::{debug, warn};

use crate::error::{MeshError, MeshResult};
use crate::TriangleMesh;

/// Refine `mesh` until no edge is longer than `max_edge`.
///
/// Stops after `max_passes` passes even if long edges remain; each pass
/// at least halves every marked edge.
///
/// # Errors
///
/// Returns [`MeshError::InvalidEdgeLength`] if `max_edge` is not a positive
/// finite number.
pub fn refine_to_max_edge(
    mesh: &TriangleMesh,
    max_edge: f64,
    max_passes: usize,
) -> MeshResult<TriangleMesh> {
    if !(max_edge.is_finite() && max_edge > 0.0) {
        return Err(MeshError::InvalidEdgeLength(max_edge));
    }

    let original_faces = mesh.num_triangles();
    let mut current = mesh.clone();
    for pass in 0..max_passes {
        let midpoints = mark_long_edges(&mut current, max_edge);
        if midpoints.is_empty() {
            debug!(
                original_faces,
                final_faces = current.num_triangles(),
                passes = pass,
                "Refined mesh"
            );
            return Ok(current);
        }
        current.triangles = split_marked(&current, &midpoints);
    }

    if current.max_edge_length() > max_edge {
        warn!(
            max_edge,
            max_passes,
            longest = current.max_edge_length(),
            "Refinement stopped before reaching target edge length"
        );
    }
    Ok(current)
}

/// Insert a midpoint vertex for every edge longer than `max_edge`.
fn mark_long_edges(mesh: &mut TriangleMesh, max_edge: f64) -> HashMap<(u32, u32), u32> {
    let mut midpoints: HashMap<(u32, u32), u32> = HashMap::new();
    for ti in 0..mesh.triangles.len() {
        let t = mesh.triangles[ti];
        for (a, b) in [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])] {
            let edge = normalize_edge(a, b);
            if midpoints.contains_key(&edge) {
                continue;
            }
            let p0 = mesh.vertices[edge.0 as usize];
            let p1 = mesh.vertices[edge.1 as usize];
            if (p1 - p0).norm() > max_edge {
                mesh.vertices.push(Point3::from((p0.coords + p1.coords) * 0.5));
                midpoints.insert(edge, (mesh.vertices.len() - 1) as u32);
            }
        }
    }
    midpoints
}

/// Re-triangulate every triangle according to which of its edges carry a
/// midpoint.
fn split_marked(mesh: &TriangleMesh, midpoints: &HashMap<(u32, u32), u32>) -> Vec<[u32; 3]> {
    let mut out = Vec::with_capacity(mesh.triangles.len() * 2);
    for t in &mesh.triangles {
        // mids[i] belongs to edge (t[i], t[i+1]).
        let mids = [0usize, 1, 2].map(|i| {
            midpoints
                .get(&normalize_edge(t[i], t[(i + 1) % 3]))
                .copied()
        });
        let marked = mids.iter().filter(|m| m.is_some()).count();

        match marked {
            0 => out.push(*t),
            1 => {
                let k = mids.iter().position(|m| m.is_some()).unwrap_or(0);
                let (a, b, c) = rotated(t, k);
                let m0 = mids[k].unwrap_or(a);
                out.push([a, m0, c]);
                out.push([m0, b, c]);
            }
            2 => {
                // Rotate so the unmarked edge is (c, a).
                let u = mids.iter().position(|m| m.is_none()).unwrap_or(2);
                let k = (u + 1) % 3;
                let (a, b, c) = rotated(t, k);
                let m0 = mids[k].unwrap_or(a);
                let m1 = mids[(k + 1) % 3].unwrap_or(b);
                out.push([m0, b, m1]);
                // Quad a-m0-m1-c: cut along its shorter diagonal.
                let d_am1 = distance(mesh, a, m1);
                let d_m0c = distance(mesh, m0, c);
                if d_am1 <= d_m0c {
                    out.push([a, m0, m1]);
                    out.push([a, m1, c]);
                } else {
                    out.push([a, m0, c]);
                    out.push([m0, m1, c]);
                }
            }
            _ => {
                let (a, b, c) = (t[0], t[1], t[2]);
                let (m0, m1, m2) = (
                    mids[0].unwrap_or(a),
                    mids[1].unwrap_or(b),
                    mids[2].unwrap_or(c),
                );
                out.push([a, m0, m2]);
                out.push([m0, b, m1]);
                out.push([m2, m1, c]);
                out.push([m0, m1, m2]);
            }
        }
    }
    out
}

fn rotated(t: &[u32; 3], k: usize) -> (u32, u32, u32) {
    (t[k], t[(k + 1) % 3], t[(k + 2) % 3])
}

fn distance(mesh: &TriangleMesh, a: u32, b: u32) -> f64 {
    (mesh.vertices[a as usize] - mesh.vertices[b as usize]).norm()
}

/// Normalize edge so smaller vertex index comes first.
const fn normalize_edge(v0: u32, v1: u32) -> (u32, u32) {
    if v0 <= v1 {
        (v0, v1)
    } else {
        (v1, v0)
    }
}
