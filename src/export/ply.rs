//! Binary PLY mesh export.
//!
//! Every exported shape is one little-endian PLY file holding positions,
//! normals and (when the mesh has them) texture coordinates. Polygons are
//! written as-is; the renderer triangulates on load.

use crate::error::{Result, ShapeError};
use crate::host::{HostMesh, HostPolygon};
use glam::DVec3;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// A vertex of the output mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlyVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl PlyVertex {
    /// Bit pattern used to merge identical corners.
    fn key(&self) -> [u32; 8] {
        [
            self.position[0].to_bits(),
            self.position[1].to_bits(),
            self.position[2].to_bits(),
            self.normal[0].to_bits(),
            self.normal[1].to_bits(),
            self.normal[2].to_bits(),
            self.uv[0].to_bits(),
            self.uv[1].to_bits(),
        ]
    }
}

/// A polygon mesh ready to be written.
#[derive(Debug, Clone, Default)]
pub struct PlyMesh {
    pub vertices: Vec<PlyVertex>,
    /// Vertex indices of each face, at most 255 per face.
    pub faces: Vec<Vec<u32>>,
    /// Whether `s`/`t` properties are written.
    pub has_uv: bool,
}

impl PlyMesh {
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Build the mesh of all polygons of `mesh` accepted by `keep`.
    ///
    /// Corners sharing position, normal and uv are merged into one vertex.
    /// Smooth polygons use the per-vertex normals of the host mesh (if it has
    /// any), flat ones the polygon normal.
    pub fn from_host(
        mesh: &HostMesh,
        keep: impl Fn(&HostPolygon) -> bool,
    ) -> std::result::Result<Self, ShapeError> {
        validate(mesh)?;

        let mut out = PlyMesh {
            has_uv: mesh.loop_uvs.is_some(),
            ..Default::default()
        };
        let mut index: HashMap<[u32; 8], u32> = HashMap::new();
        let mut loop_start = 0;

        for polygon in &mesh.polygons {
            let first_loop = loop_start;
            loop_start += polygon.vertices.len();
            if !keep(polygon) {
                continue;
            }

            let points: Vec<DVec3> = polygon
                .vertices
                .iter()
                .map(|&v| DVec3::from_array(mesh.vertices[v as usize]))
                .collect();
            let face_normal = newell_normal(&points);

            let mut face = Vec::with_capacity(points.len());
            for (corner, &v) in polygon.vertices.iter().enumerate() {
                let normal = match (&mesh.normals, polygon.smooth) {
                    (Some(normals), true) => normals
                        .get(v as usize)
                        .map(|n| DVec3::from_array(*n))
                        .unwrap_or(face_normal),
                    _ => face_normal,
                };
                let uv = mesh
                    .loop_uvs
                    .as_ref()
                    .map(|uvs| uvs[first_loop + corner])
                    .unwrap_or([0.0, 0.0]);

                let vertex = PlyVertex {
                    position: points[corner].as_vec3().to_array(),
                    normal: normal.as_vec3().to_array(),
                    uv: [uv[0] as f32, uv[1] as f32],
                };
                let next = out.vertices.len() as u32;
                let id = *index.entry(vertex.key()).or_insert_with(|| {
                    out.vertices.push(vertex);
                    next
                });
                face.push(id);
            }
            out.faces.push(face);
        }

        Ok(out)
    }
}

/// Check the structural soundness of a host mesh.
pub fn validate(mesh: &HostMesh) -> std::result::Result<(), ShapeError> {
    let mut loops = 0;
    for (i, polygon) in mesh.polygons.iter().enumerate() {
        let count = polygon.vertices.len();
        if count < 3 {
            return Err(ShapeError::DegeneratePolygon {
                mesh: mesh.name.clone(),
                polygon: i,
                count,
            });
        }
        if count > u8::MAX as usize {
            return Err(ShapeError::PolygonTooLarge {
                mesh: mesh.name.clone(),
                polygon: i,
            });
        }
        if let Some(&index) = polygon
            .vertices
            .iter()
            .find(|&&v| v as usize >= mesh.vertices.len())
        {
            return Err(ShapeError::IndexOutOfRange {
                mesh: mesh.name.clone(),
                polygon: i,
                index,
                vertex_count: mesh.vertices.len(),
            });
        }
        loops += count;
    }

    if let Some(uvs) = &mesh.loop_uvs {
        if uvs.len() < loops {
            return Err(ShapeError::UvCount {
                mesh: mesh.name.clone(),
                uvs: uvs.len(),
                loops,
            });
        }
    }
    Ok(())
}

/// Polygon normal by Newell's method, robust for non-planar polygons.
pub fn newell_normal(points: &[DVec3]) -> DVec3 {
    let mut normal = DVec3::ZERO;
    for (i, a) in points.iter().enumerate() {
        let b = points[(i + 1) % points.len()];
        normal.x += (a.y - b.y) * (a.z + b.z);
        normal.y += (a.z - b.z) * (a.x + b.x);
        normal.z += (a.x - b.x) * (a.y + b.y);
    }
    normal.normalize_or_zero()
}

/// Write `mesh` as binary little-endian PLY.
pub fn write_ply<W: Write>(mesh: &PlyMesh, mut writer: W) -> io::Result<()> {
    writeln!(writer, "ply")?;
    writeln!(writer, "format binary_little_endian 1.0")?;
    writeln!(writer, "comment Created by ignis-exporter {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(writer, "element vertex {}", mesh.vertices.len())?;
    for property in ["x", "y", "z", "nx", "ny", "nz"] {
        writeln!(writer, "property float {}", property)?;
    }
    if mesh.has_uv {
        writeln!(writer, "property float s")?;
        writeln!(writer, "property float t")?;
    }
    writeln!(writer, "element face {}", mesh.faces.len())?;
    writeln!(writer, "property list uchar uint vertex_indices")?;
    writeln!(writer, "end_header")?;

    let stride = if mesh.has_uv { 32 } else { 24 };
    let mut buffer = Vec::with_capacity(mesh.vertices.len() * stride);
    for vertex in &mesh.vertices {
        for v in vertex.position.iter().chain(&vertex.normal) {
            buffer.extend_from_slice(&v.to_le_bytes());
        }
        if mesh.has_uv {
            buffer.extend_from_slice(&vertex.uv[0].to_le_bytes());
            buffer.extend_from_slice(&vertex.uv[1].to_le_bytes());
        }
    }
    for face in &mesh.faces {
        buffer.push(face.len() as u8);
        for index in face {
            buffer.extend_from_slice(&index.to_le_bytes());
        }
    }
    writer.write_all(&buffer)?;
    writer.flush()
}

/// Write `mesh` to `path`, creating the parent directory if needed.
pub fn write_ply_file(mesh: &PlyMesh, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    write_ply(mesh, BufWriter::new(file))?;
    log::debug!(
        "Wrote {} ({} vertices, {} faces)",
        path.display(),
        mesh.vertex_count(),
        mesh.face_count()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> HostMesh {
        HostMesh {
            name: "Plane".to_string(),
            vertices: vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
            ],
            polygons: vec![HostPolygon::new(vec![0, 1, 2, 3])],
            ..Default::default()
        }
    }

    fn header_end(bytes: &[u8]) -> usize {
        let marker = b"end_header\n";
        bytes
            .windows(marker.len())
            .position(|w| w == marker)
            .unwrap()
            + marker.len()
    }

    #[test]
    fn test_newell_normal() {
        let points = [
            DVec3::new(0.0, 0.0, 0.0),
            DVec3::new(1.0, 0.0, 0.0),
            DVec3::new(1.0, 1.0, 0.0),
            DVec3::new(0.0, 1.0, 0.0),
        ];
        assert_eq!(newell_normal(&points), DVec3::Z);
        assert_eq!(newell_normal(&[DVec3::ZERO; 3]), DVec3::ZERO);
    }

    #[test]
    fn test_flat_quad() {
        let mesh = PlyMesh::from_host(&quad(), |_| true).unwrap();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.faces, vec![vec![0, 1, 2, 3]]);
        assert!(mesh.vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
        assert!(!mesh.has_uv);
    }

    #[test]
    fn test_corners_are_merged() {
        let mut host = quad();
        host.polygons = vec![
            HostPolygon::new(vec![0, 1, 2]),
            HostPolygon::new(vec![0, 2, 3]),
        ];
        let mesh = PlyMesh::from_host(&host, |_| true).unwrap();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.faces, vec![vec![0, 1, 2], vec![0, 2, 3]]);

        // Corner 0 agrees on its uv and merges, corner 2 does not
        host.loop_uvs = Some(vec![
            [0.0, 0.0],
            [1.0, 0.0],
            [1.0, 1.0],
            [0.0, 0.0],
            [0.5, 0.5],
            [0.0, 1.0],
        ]);
        let mesh = PlyMesh::from_host(&host, |_| true).unwrap();
        assert_eq!(mesh.vertex_count(), 5);
        assert!(mesh.has_uv);
    }

    #[test]
    fn test_smooth_uses_vertex_normals() {
        let mut host = quad();
        host.normals = Some(vec![[0.0, 1.0, 0.0]; 4]);
        let flat = PlyMesh::from_host(&host, |_| true).unwrap();
        assert_eq!(flat.vertices[0].normal, [0.0, 0.0, 1.0]);

        host.polygons[0].smooth = true;
        let smooth = PlyMesh::from_host(&host, |_| true).unwrap();
        assert_eq!(smooth.vertices[0].normal, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_polygon_filter() {
        let mut host = quad();
        host.polygons = vec![
            HostPolygon::new(vec![0, 1, 2]),
            HostPolygon {
                material_index: 1,
                ..HostPolygon::new(vec![0, 2, 3])
            },
        ];
        host.loop_uvs = Some(vec![[0.0, 0.0]; 6]);
        let mesh = PlyMesh::from_host(&host, |p| p.material_index == 1).unwrap();
        assert_eq!(mesh.face_count(), 1);
        assert_eq!(mesh.vertex_count(), 3);
    }

    #[test]
    fn test_structural_errors() {
        let mut host = quad();
        host.polygons = vec![HostPolygon::new(vec![0, 1])];
        assert!(matches!(
            PlyMesh::from_host(&host, |_| true),
            Err(ShapeError::DegeneratePolygon { count: 2, .. })
        ));

        host.polygons = vec![HostPolygon::new(vec![0, 1, 7])];
        assert!(matches!(
            validate(&host),
            Err(ShapeError::IndexOutOfRange { index: 7, vertex_count: 4, .. })
        ));

        let mut host = quad();
        host.loop_uvs = Some(vec![[0.0, 0.0]; 2]);
        assert!(matches!(validate(&host), Err(ShapeError::UvCount { loops: 4, .. })));
    }

    #[test]
    fn test_binary_layout() {
        let mut host = quad();
        host.loop_uvs = Some(vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]);
        let mesh = PlyMesh::from_host(&host, |_| true).unwrap();

        let mut bytes = Vec::new();
        write_ply(&mesh, &mut bytes).unwrap();
        let body = header_end(&bytes);
        let header = std::str::from_utf8(&bytes[..body]).unwrap();
        assert!(header.starts_with("ply\nformat binary_little_endian 1.0\n"));
        assert!(header.contains("element vertex 4\n"));
        assert!(header.contains("property float t\n"));
        assert!(header.contains("element face 1\nproperty list uchar uint vertex_indices\n"));

        // 4 vertices * 8 floats, then one face: count byte + 4 indices
        assert_eq!(bytes.len() - body, 4 * 32 + 1 + 4 * 4);
        let second_x = f32::from_le_bytes(bytes[body + 32..body + 36].try_into().unwrap());
        assert_eq!(second_x, 1.0);
        assert_eq!(bytes[body + 128], 4);
        let last = u32::from_le_bytes(bytes[bytes.len() - 4..].try_into().unwrap());
        assert_eq!(last, 3);
    }

    #[test]
    fn test_write_file_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Meshes").join("Plane.ply");
        let mesh = PlyMesh::from_host(&quad(), |_| true).unwrap();
        write_ply_file(&mesh, &path).unwrap();
        let bytes = fs::read(&path).unwrap();
        assert_eq!(bytes.len() - header_end(&bytes), 4 * 24 + 1 + 4 * 4);
    }
}
