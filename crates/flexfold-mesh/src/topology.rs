//! Connectivity helpers: components, compaction, welding, boundary edges.

use std::collections::HashMap;

use flexfold_math::Point3;

use crate::TriangleMesh;

/// Disjoint-set forest over vertex indices.
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[rb] = ra;
        }
    }
}

impl TriangleMesh {
    /// Group triangles into connected components.
    ///
    /// Two triangles are connected when they share a vertex index.
    /// Components are returned in order of their first triangle.
    pub fn connected_components(&self) -> Vec<Vec<usize>> {
        let mut uf = UnionFind::new(self.vertices.len());
        for t in &self.triangles {
            uf.union(t[0] as usize, t[1] as usize);
            uf.union(t[0] as usize, t[2] as usize);
        }

        let mut slot_of_root: HashMap<usize, usize> = HashMap::new();
        let mut components: Vec<Vec<usize>> = Vec::new();
        for (ti, t) in self.triangles.iter().enumerate() {
            let root = uf.find(t[0] as usize);
            let slot = *slot_of_root.entry(root).or_insert_with(|| {
                components.push(Vec::new());
                components.len() - 1
            });
            components[slot].push(ti);
        }
        components
    }

    /// Extract the given triangles into a new mesh holding only the
    /// vertices they reference.
    pub fn submesh(&self, triangles: &[usize]) -> TriangleMesh {
        let mut remap: HashMap<u32, u32> = HashMap::new();
        let mut out = TriangleMesh::new();
        for &ti in triangles {
            let t = self.triangles[ti];
            let mut mapped = [0u32; 3];
            for (slot, &v) in mapped.iter_mut().zip(t.iter()) {
                *slot = *remap.entry(v).or_insert_with(|| {
                    out.vertices.push(self.vertices[v as usize]);
                    (out.vertices.len() - 1) as u32
                });
            }
            out.triangles.push(mapped);
        }
        out
    }

    /// Drop vertices no triangle references.
    pub fn compacted(&self) -> TriangleMesh {
        let all: Vec<usize> = (0..self.triangles.len()).collect();
        self.submesh(&all)
    }

    /// Merge vertices that fall in the same `tolerance`-sized grid cell and
    /// drop triangles that collapse as a result.
    ///
    /// STL files store every triangle with its own corners; welding restores
    /// the shared-vertex connectivity the partitioner relies on.
    pub fn weld(&self, tolerance: f64) -> TriangleMesh {
        let inv = 1.0 / tolerance.max(f64::MIN_POSITIVE);
        let key = |p: &Point3| {
            (
                (p.x * inv).round() as i64,
                (p.y * inv).round() as i64,
                (p.z * inv).round() as i64,
            )
        };

        let mut cells: HashMap<(i64, i64, i64), u32> = HashMap::new();
        let mut vertices = Vec::new();
        let remap: Vec<u32> = self
            .vertices
            .iter()
            .map(|p| {
                *cells.entry(key(p)).or_insert_with(|| {
                    vertices.push(*p);
                    (vertices.len() - 1) as u32
                })
            })
            .collect();

        let triangles = self
            .triangles
            .iter()
            .map(|t| t.map(|i| remap[i as usize]))
            .filter(|t| t[0] != t[1] && t[1] != t[2] && t[2] != t[0])
            .collect();

        TriangleMesh::from_parts(vertices, triangles).compacted()
    }

    /// Directed edges that have no opposite half-edge.
    pub fn boundary_edges(&self) -> Vec<(u32, u32)> {
        let mut count: HashMap<(u32, u32), usize> = HashMap::new();
        for t in &self.triangles {
            for (a, b) in [(t[0], t[1]), (t[1], t[2]), (t[2], t[0])] {
                *count.entry((a, b)).or_insert(0) += 1;
            }
        }
        let mut edges: Vec<(u32, u32)> = count
            .keys()
            .filter(|&&(a, b)| !count.contains_key(&(b, a)))
            .copied()
            .collect();
        edges.sort_unstable();
        edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f64) -> TriangleMesh {
        TriangleMesh::from_parts(
            vec![
                Point3::new(x0, 0.0, 0.0),
                Point3::new(x0 + 1.0, 0.0, 0.0),
                Point3::new(x0 + 1.0, 1.0, 0.0),
                Point3::new(x0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
    }

    #[test]
    fn test_components_of_disjoint_squares() {
        let mut mesh = square(0.0);
        mesh.merge(&square(5.0));
        let comps = mesh.connected_components();
        assert_eq!(comps, vec![vec![0, 1], vec![2, 3]]);
    }

    #[test]
    fn test_submesh_compacts_vertices() {
        let mut mesh = square(0.0);
        mesh.merge(&square(5.0));
        let sub = mesh.submesh(&[2, 3]);
        assert_eq!(sub.num_vertices(), 4);
        assert_eq!(sub.num_triangles(), 2);
        assert_eq!(sub.vertices[0], Point3::new(5.0, 0.0, 0.0));
    }

    #[test]
    fn test_weld_joins_duplicate_corners() {
        // Unindexed: each triangle owns its corners.
        let soup = TriangleMesh::from_parts(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 1.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            vec![[0, 1, 2], [3, 4, 5]],
        );
        assert_eq!(soup.connected_components().len(), 2);
        let welded = soup.weld(1e-6);
        assert_eq!(welded.num_vertices(), 4);
        assert_eq!(welded.connected_components().len(), 1);
    }

    #[test]
    fn test_boundary_edges_of_square() {
        let edges = square(0.0).boundary_edges();
        // Diagonal 0-2 is shared, the four sides are not.
        assert_eq!(edges.len(), 4);
        assert!(!edges.contains(&(0, 2)));
        assert!(!edges.contains(&(2, 0)));
    }
}
