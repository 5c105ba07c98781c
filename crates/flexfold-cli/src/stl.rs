//! STL reading and writing for layer meshes.
//!
//! Both ASCII and binary files are read. A file is taken as binary when its
//! size matches the triangle count in its header, otherwise as ASCII if it
//! starts with `solid`. Output is always binary.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use flexfold_math::Point3;
use flexfold_mesh::TriangleMesh;

/// STL binary header size in bytes.
const HEADER_SIZE: usize = 80;

/// Size of one triangle in binary STL (normal + 3 vertices + attribute).
const TRIANGLE_SIZE: usize = 50;

/// Vertices closer than this are merged after reading.
const WELD_TOLERANCE: f64 = 1e-5;

/// Load an STL file and weld its triangle soup into an indexed mesh.
pub fn load_stl(path: &Path) -> Result<TriangleMesh> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let soup = parse_stl(&bytes).with_context(|| format!("parsing {}", path.display()))?;
    Ok(soup.weld(WELD_TOLERANCE))
}

/// Write `mesh` as binary STL.
pub fn write_stl(mesh: &TriangleMesh, path: &Path) -> Result<()> {
    fs::write(path, stl_bytes(mesh)).with_context(|| format!("writing {}", path.display()))
}

/// Parse STL bytes into an unwelded triangle soup.
pub fn parse_stl(bytes: &[u8]) -> Result<TriangleMesh> {
    if bytes.len() >= HEADER_SIZE + 4 {
        let count = u32::from_le_bytes([
            bytes[HEADER_SIZE],
            bytes[HEADER_SIZE + 1],
            bytes[HEADER_SIZE + 2],
            bytes[HEADER_SIZE + 3],
        ]) as usize;
        if bytes.len() == HEADER_SIZE + 4 + count * TRIANGLE_SIZE {
            return Ok(parse_binary(&bytes[HEADER_SIZE + 4..], count));
        }
    }
    let text = String::from_utf8_lossy(bytes);
    if text.trim_start().starts_with("solid") {
        return parse_ascii(&text);
    }
    bail!("not an STL file: size does not match a binary STL and no 'solid' header")
}

fn parse_binary(body: &[u8], count: usize) -> TriangleMesh {
    let mut mesh = TriangleMesh::new();
    mesh.vertices.reserve(count * 3);
    mesh.triangles.reserve(count);
    for tri in body.chunks_exact(TRIANGLE_SIZE).take(count) {
        // Skip the normal (12 bytes), read 3 vertices.
        let base = mesh.vertices.len() as u32;
        for offset in [12, 24, 36] {
            mesh.vertices.push(read_vertex(&tri[offset..offset + 12]));
        }
        mesh.triangles.push([base, base + 1, base + 2]);
    }
    mesh
}

/// Read a vertex from 12 bytes (3 f32s).
fn read_vertex(buf: &[u8]) -> Point3 {
    let f = |i: usize| f32::from_le_bytes([buf[i], buf[i + 1], buf[i + 2], buf[i + 3]]);
    Point3::new(f64::from(f(0)), f64::from(f(4)), f64::from(f(8)))
}

fn parse_ascii(text: &str) -> Result<TriangleMesh> {
    let mut mesh = TriangleMesh::new();
    let mut facet: Vec<Point3> = Vec::with_capacity(3);
    for (lineno, line) in text.lines().enumerate() {
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("vertex") => {
                let coords: Vec<f64> = parts
                    .map(str::parse)
                    .collect::<std::result::Result<_, _>>()
                    .with_context(|| format!("line {}: bad vertex", lineno + 1))?;
                if coords.len() != 3 {
                    bail!("line {}: vertex needs 3 coordinates", lineno + 1);
                }
                facet.push(Point3::new(coords[0], coords[1], coords[2]));
            }
            Some("endloop") => {
                if facet.len() != 3 {
                    bail!(
                        "line {}: facet has {} vertices, expected 3",
                        lineno + 1,
                        facet.len()
                    );
                }
                let base = mesh.vertices.len() as u32;
                mesh.vertices.append(&mut facet);
                mesh.triangles.push([base, base + 1, base + 2]);
            }
            _ => {}
        }
    }
    Ok(mesh)
}

/// Encode `mesh` as binary STL.
pub fn stl_bytes(mesh: &TriangleMesh) -> Vec<u8> {
    let num_triangles = mesh.num_triangles();
    let mut data = Vec::with_capacity(HEADER_SIZE + 4 + num_triangles * TRIANGLE_SIZE);

    let mut header = [b' '; HEADER_SIZE];
    let tag = b"flexfold STL export";
    header[..tag.len()].copy_from_slice(tag);
    data.extend_from_slice(&header);
    data.extend_from_slice(&(num_triangles as u32).to_le_bytes());

    for i in 0..num_triangles {
        let [a, b, c] = mesh.triangle(i);
        let n = (b - a).cross(&(c - a));
        let len = n.norm();
        let n = if len > 1e-12 { n / len } else { n * 0.0 };

        for value in [n.x, n.y, n.z] {
            data.extend_from_slice(&(value as f32).to_le_bytes());
        }
        for v in [a, b, c] {
            for value in [v.x, v.y, v.z] {
                data.extend_from_slice(&(value as f32).to_le_bytes());
            }
        }
        data.extend_from_slice(&0u16.to_le_bytes());
    }
    data
}
