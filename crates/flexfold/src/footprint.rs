//! Planar footprint of a mesh, used as the fixed scope of upper layers.

use std::collections::{HashMap, HashSet};

use flexfold_math::{Bounds2, Point2, Tolerance};
use flexfold_mesh::TriangleMesh;

use crate::region::Region;

/// Projection of a mesh onto the XY plane.
///
/// Containment is answered against the projected triangles themselves, so
/// holes and disjoint islands of the substrate are respected. Triangles
/// whose projection has no area (side walls) are dropped.
#[derive(Debug, Clone, Default)]
pub struct Footprint {
    triangles: Vec<[Point2; 3]>,
    boxes: Vec<Bounds2>,
    outline: Option<Region>,
}

impl Footprint {
    /// Project `mesh` onto XY.
    pub fn from_mesh(mesh: &TriangleMesh) -> Self {
        let mut triangles = Vec::with_capacity(mesh.num_triangles());
        let mut boxes = Vec::with_capacity(mesh.num_triangles());
        for i in 0..mesh.num_triangles() {
            let [a, b, c] = mesh.triangle(i).map(|p| Point2::new(p.x, p.y));
            if cross(&a, &b, &c).abs() <= f64::EPSILON {
                continue;
            }
            if let Some(bounds) = Bounds2::from_points(&[a, b, c]) {
                boxes.push(bounds);
                triangles.push([a, b, c]);
            }
        }
        let outline = outline_of(mesh);
        Self {
            triangles,
            boxes,
            outline,
        }
    }

    /// True when no triangle with planar area remains.
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Is `p` on any projected triangle (boundary inclusive)?
    pub fn contains(&self, p: &Point2) -> bool {
        let tol = Tolerance::DEFAULT.linear;
        self.triangles
            .iter()
            .zip(&self.boxes)
            .any(|(t, b)| b.contains(p, tol) && triangle_contains(t, p, tol))
    }

    /// Outer boundary of the up-facing surface, if it forms a closed loop.
    ///
    /// When the footprint splits into several islands, the largest loop is
    /// returned.
    pub fn outline(&self) -> Option<&Region> {
        self.outline.as_ref()
    }
}

fn cross(a: &Point2, b: &Point2, c: &Point2) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Edge-function test that accepts points up to `tol` outside any edge,
/// independent of the triangle's winding.
fn triangle_contains(t: &[Point2; 3], p: &Point2, tol: f64) -> bool {
    let sign = cross(&t[0], &t[1], &t[2]).signum();
    (0..3).all(|i| {
        let (a, b) = (t[i], t[(i + 1) % 3]);
        let len = (b - a).norm();
        len == 0.0 || sign * cross(&a, &b, p) / len >= -tol
    })
}

/// Chain the boundary of the up-facing triangles into closed loops and
/// keep the one enclosing the largest area.
fn outline_of(mesh: &TriangleMesh) -> Option<Region> {
    let up: Vec<usize> = (0..mesh.num_triangles())
        .filter(|&i| {
            let [a, b, c] = mesh.triangle(i);
            (b - a).cross(&(c - a)).z > 0.0
        })
        .collect();
    if up.is_empty() {
        return None;
    }
    let top = mesh.submesh(&up);

    let mut next: HashMap<u32, u32> = HashMap::new();
    for (a, b) in top.boundary_edges() {
        next.entry(a).or_insert(b);
    }

    let mut starts: Vec<u32> = next.keys().copied().collect();
    starts.sort_unstable();
    let mut visited: HashSet<u32> = HashSet::new();
    let mut best: Option<Region> = None;
    for start in starts {
        if visited.contains(&start) {
            continue;
        }
        let mut ring = Vec::new();
        let mut v = start;
        let closed = loop {
            if !visited.insert(v) {
                break v == start;
            }
            let p = top.vertices[v as usize];
            ring.push(Point2::new(p.x, p.y));
            match next.get(&v) {
                Some(&n) => v = n,
                None => break false,
            }
        };
        if !closed {
            continue;
        }
        if let Ok(region) = Region::new(ring) {
            let larger = best
                .as_ref()
                .map_or(true, |b| region.signed_area() > b.signed_area());
            if larger {
                best = Some(region);
            }
        }
    }
    best
}
