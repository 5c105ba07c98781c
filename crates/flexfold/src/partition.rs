//! Splitting layer meshes against a transformation's outline.
//!
//! The cut works on the XY projection: every triangle is split along the
//! supporting line of each outline edge, so each fragment ends up wholly
//! inside or wholly outside the outline prism. The outside part is then
//! sorted, per connected component, into the piece that stays put and the
//! piece carried by the residual.

use std::collections::HashMap;

use flexfold_math::{Point2, Point3, Tolerance};
use flexfold_mesh::TriangleMesh;

use crate::footprint::Footprint;
use crate::region::{distance_to_segment, Line2, Region};

/// How cut-off components are told apart.
#[derive(Debug, Clone, Copy)]
pub enum Classifier<'a> {
    /// Substrate rule: components touching the hinge segment stay fixed.
    /// Without a hinge every component stays fixed.
    Hinge(Option<[Point3; 2]>),
    /// Upper-layer rule: components with a vertex over the substrate's
    /// fixed footprint stay fixed. Without a footprint nothing does.
    FixedScope(Option<&'a Footprint>),
}

/// A mesh whose triangles no longer straddle the outline.
#[derive(Debug, Clone)]
pub struct CutMesh {
    /// Original vertices followed by the cut vertices.
    pub mesh: TriangleMesh,
    /// Per triangle: does it lie inside the outline?
    pub inside: Vec<bool>,
    /// Per triangle: index of the input triangle it descends from.
    pub origin: Vec<usize>,
    /// Number of vertices introduced on cut lines.
    pub cut_vertices: usize,
}

/// The three pieces of a partitioned mesh.
#[derive(Debug, Clone, Default)]
pub struct Partition {
    /// Inside the outline.
    pub transformed: TriangleMesh,
    /// Outside and attached to what stays put.
    pub fixed: TriangleMesh,
    /// Outside and detached, carried by the residual.
    pub residual: TriangleMesh,
    /// Vertices introduced on cut lines.
    pub cut_vertices: usize,
}

impl Partition {
    /// Triangles over all three pieces.
    pub fn num_triangles(&self) -> usize {
        self.transformed.num_triangles() + self.fixed.num_triangles() + self.residual.num_triangles()
    }
}

/// Split `mesh` so no triangle crosses an edge line of `outline`, and
/// mark which fragments lie inside it.
///
/// Cut vertices are created once per (edge line, mesh edge) pair and shared
/// by both neighbors, so a conforming input stays conforming.
pub fn split_by_outline(mesh: &TriangleMesh, outline: &Region) -> CutMesh {
    let eps = Tolerance::DEFAULT.linear;
    let mut vertices = mesh.vertices.clone();
    let mut tris: Vec<([u32; 3], usize)> = mesh
        .triangles
        .iter()
        .enumerate()
        .map(|(i, t)| (*t, i))
        .collect();

    let mut children = Vec::with_capacity(3);
    for (a, b) in outline.edges() {
        let line = Line2::new(a, b);
        let mut cuts: HashMap<(u32, u32), u32> = HashMap::new();
        let mut next = Vec::with_capacity(tris.len());
        for (t, origin) in tris {
            let d = t.map(|i| {
                let p = vertices[i as usize];
                let s = line.signed_distance(&Point2::new(p.x, p.y));
                if s.abs() <= eps {
                    0.0
                } else {
                    s
                }
            });
            let straddles = d.iter().any(|&s| s > 0.0) && d.iter().any(|&s| s < 0.0);
            if !straddles {
                next.push((t, origin));
                continue;
            }
            children.clear();
            split_triangle(&t, &d, &mut vertices, &mut cuts, &mut children);
            next.extend(children.iter().map(|c| (*c, origin)));
        }
        tris = next;
    }

    let cut_vertices = vertices.len() - mesh.vertices.len();
    let mut out = TriangleMesh::from_parts(vertices, Vec::with_capacity(tris.len()));
    let mut inside = Vec::with_capacity(tris.len());
    let mut origin = Vec::with_capacity(tris.len());
    for (t, o) in tris {
        let [p, q, r] = t.map(|i| out.vertices[i as usize]);
        let centroid = Point2::new((p.x + q.x + r.x) / 3.0, (p.y + q.y + r.y) / 3.0);
        inside.push(outline.contains(&centroid));
        origin.push(o);
        out.triangles.push(t);
    }
    CutMesh {
        mesh: out,
        inside,
        origin,
        cut_vertices,
    }
}

/// Split one straddling triangle along a line, given the signed distances
/// `d` of its corners (zeroed within tolerance). Winding is preserved.
fn split_triangle(
    t: &[u32; 3],
    d: &[f64; 3],
    vertices: &mut Vec<Point3>,
    cuts: &mut HashMap<(u32, u32), u32>,
    out: &mut Vec<[u32; 3]>,
) {
    if let Some(k) = d.iter().position(|&s| s == 0.0) {
        // One corner on the line, the other two on opposite sides.
        let (a, b, c) = (t[k], t[(k + 1) % 3], t[(k + 2) % 3]);
        let m = cut_vertex(b, c, d[(k + 1) % 3], d[(k + 2) % 3], vertices, cuts);
        out.push([a, b, m]);
        out.push([a, m, c]);
        return;
    }
    // The lone corner is the one whose side differs from both others.
    let k = (0..3)
        .find(|&i| (d[i] > 0.0) != (d[(i + 1) % 3] > 0.0) && (d[i] > 0.0) != (d[(i + 2) % 3] > 0.0))
        .unwrap_or(0);
    let (ia, ib, ic) = (k, (k + 1) % 3, (k + 2) % 3);
    let (a, b, c) = (t[ia], t[ib], t[ic]);
    let m_ab = cut_vertex(a, b, d[ia], d[ib], vertices, cuts);
    let m_ca = cut_vertex(c, a, d[ic], d[ia], vertices, cuts);
    out.push([a, m_ab, m_ca]);
    out.push([m_ab, b, c]);
    out.push([m_ab, c, m_ca]);
}

/// Shared vertex where the line crosses edge `i`-`j`.
fn cut_vertex(
    i: u32,
    j: u32,
    di: f64,
    dj: f64,
    vertices: &mut Vec<Point3>,
    cuts: &mut HashMap<(u32, u32), u32>,
) -> u32 {
    let key = if i <= j { (i, j) } else { (j, i) };
    *cuts.entry(key).or_insert_with(|| {
        let (pi, pj) = (vertices[i as usize], vertices[j as usize]);
        let t = di / (di - dj);
        vertices.push(pi + (pj - pi) * t);
        (vertices.len() - 1) as u32
    })
}

/// Split `mesh` into transformed, fixed and residual pieces.
///
/// When nothing falls inside the outline under the hinge rule, the whole
/// mesh is returned as fixed: a bend that misses the sheet must not carry
/// it away.
pub fn partition(mesh: &TriangleMesh, outline: &Region, classifier: &Classifier<'_>) -> Partition {
    let cut = split_by_outline(mesh, outline);
    let (inside, outside): (Vec<usize>, Vec<usize>) =
        (0..cut.mesh.num_triangles()).partition(|&i| cut.inside[i]);
    let transformed = cut.mesh.submesh(&inside);
    let cutoff = cut.mesh.submesh(&outside);

    let tol = Tolerance::DEFAULT.linear;
    let mut fixed_ids = Vec::new();
    let mut residual_ids = Vec::new();
    for component in cutoff.connected_components() {
        let mut vertices = component
            .iter()
            .flat_map(|&t| cutoff.triangles[t])
            .map(|v| cutoff.vertices[v as usize]);
        let fixed = match classifier {
            Classifier::Hinge(None) => true,
            Classifier::Hinge(Some(_)) if transformed.is_empty() => true,
            Classifier::Hinge(Some([h0, h1])) => {
                let (a, b) = (Point2::new(h0.x, h0.y), Point2::new(h1.x, h1.y));
                vertices.any(|p| distance_to_segment(&Point2::new(p.x, p.y), &a, &b) <= tol)
            }
            Classifier::FixedScope(None) => false,
            Classifier::FixedScope(Some(footprint)) => {
                vertices.any(|p| footprint.contains(&Point2::new(p.x, p.y)))
            }
        };
        if fixed {
            fixed_ids.extend(component);
        } else {
            residual_ids.extend(component);
        }
    }
    fixed_ids.sort_unstable();
    residual_ids.sort_unstable();

    Partition {
        transformed,
        fixed: cutoff.submesh(&fixed_ids),
        residual: cutoff.submesh(&residual_ids),
        cut_vertices: cut.cut_vertices,
    }
}
