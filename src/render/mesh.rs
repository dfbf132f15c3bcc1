//! Terrain mesh construction from height maps
//!
//! The streamer only relies on the [`MeshBuilder`] contract: given a chunk's
//! height map and an LOD, produce geometry. [`TerrainMeshBuilder`] is the
//! stock implementation, a regular grid sampled every `lod_stride(lod)`
//! height samples.

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

use crate::core::height_map::HeightMap;
use crate::utils::settings::MeshSettings;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Lowest and highest vertex height
    pub fn height_range(&self) -> Option<(f32, f32)> {
        self.vertices.iter().fold(None, |acc, v| {
            let h = v.position[1];
            match acc {
                None => Some((h, h)),
                Some((lo, hi)) => Some((lo.min(h), hi.max(h))),
            }
        })
    }
}

/// Geometry producer invoked once per (chunk, LOD) request, on a worker thread
pub trait MeshBuilder: Send + Sync {
    fn build_mesh(&self, height_map: &HeightMap, settings: &MeshSettings, lod: usize) -> MeshData;
}

/// Height-sample step used at a given LOD
pub fn lod_stride(lod: usize) -> usize {
    if lod == 0 { 1 } else { lod * 2 }
}

/// Interior sample indices visited at `stride`; the last interior index is always kept
/// so neighbouring chunks share their edge vertices.
fn sample_indices(num_verts_per_line: usize, stride: usize) -> Vec<usize> {
    if num_verts_per_line < 3 {
        return Vec::new();
    }
    let last = num_verts_per_line - 2;
    let mut indices: Vec<usize> = (1..=last).step_by(stride.max(1)).collect();
    if indices.last() != Some(&last) {
        indices.push(last);
    }
    indices
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TerrainMeshBuilder;

impl TerrainMeshBuilder {
    fn surface_normal(height_map: &HeightMap, x: usize, y: usize, mesh_scale: f32) -> Vec3 {
        let max_x = height_map.width() - 1;
        let max_y = height_map.height() - 1;
        let left = height_map.get(x.saturating_sub(1), y);
        let right = height_map.get((x + 1).min(max_x), y);
        let up = height_map.get(x, y.saturating_sub(1));
        let down = height_map.get(x, (y + 1).min(max_y));

        // Sample rows run towards -Z
        let dh_dx = (right - left) / (2.0 * mesh_scale);
        let dh_dz = (down - up) / (-2.0 * mesh_scale);
        Vec3::new(-dh_dx, 1.0, -dh_dz).normalize()
    }
}

impl MeshBuilder for TerrainMeshBuilder {
    fn build_mesh(&self, height_map: &HeightMap, settings: &MeshSettings, lod: usize) -> MeshData {
        let num_verts_per_line = height_map.width().min(height_map.height());
        let samples = sample_indices(num_verts_per_line, lod_stride(lod));
        let row_len = samples.len();
        if row_len < 2 {
            return MeshData::default();
        }

        let mesh_world_size = (num_verts_per_line - 3) as f32 * settings.mesh_scale;
        let interior_span = (num_verts_per_line - 3) as f32;

        let mut vertices = Vec::with_capacity(row_len * row_len);
        for &sy in &samples {
            for &sx in &samples {
                let percent = Vec2::new((sx - 1) as f32, (sy - 1) as f32) / interior_span;
                let position = Vec3::new(
                    (percent.x - 0.5) * mesh_world_size,
                    height_map.get(sx, sy),
                    (0.5 - percent.y) * mesh_world_size,
                );
                let normal = Self::surface_normal(height_map, sx, sy, settings.mesh_scale);
                vertices.push(Vertex {
                    position: position.to_array(),
                    normal: normal.to_array(),
                    uv: percent.to_array(),
                });
            }
        }

        let mut indices = Vec::with_capacity((row_len - 1) * (row_len - 1) * 6);
        for row in 0..row_len - 1 {
            for col in 0..row_len - 1 {
                let a = (row * row_len + col) as u32;
                let b = a + 1;
                let c = a + row_len as u32;
                let d = c + 1;
                indices.extend_from_slice(&[a, d, c, d, a, b]);
            }
        }

        let mesh = MeshData { vertices, indices };
        if settings.use_flat_shading {
            flat_shade(&mesh)
        } else {
            mesh
        }
    }
}

/// Give every triangle its own vertices with the face normal
pub fn flat_shade(mesh: &MeshData) -> MeshData {
    let mut vertices = Vec::with_capacity(mesh.indices.len());
    let mut indices = Vec::with_capacity(mesh.indices.len());

    for tri in mesh.indices.chunks_exact(3) {
        let corners = [
            mesh.vertices[tri[0] as usize],
            mesh.vertices[tri[1] as usize],
            mesh.vertices[tri[2] as usize],
        ];
        let p0 = Vec3::from_array(corners[0].position);
        let p1 = Vec3::from_array(corners[1].position);
        let p2 = Vec3::from_array(corners[2].position);
        let normal = (p1 - p0).cross(p2 - p0).normalize_or_zero();
        // Keep face normals pointing up out of the terrain
        let normal = if normal.y < 0.0 { -normal } else { normal };

        for corner in corners {
            indices.push(vertices.len() as u32);
            vertices.push(Vertex {
                normal: normal.to_array(),
                ..corner
            });
        }
    }

    MeshData { vertices, indices }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::height_map::NoiseMap;

    fn height_map(size: usize, f: impl Fn(usize, usize) -> f32) -> HeightMap {
        let mut values = NoiseMap::new(size, size);
        for y in 0..size {
            for x in 0..size {
                values.set(x, y, f(x, y));
            }
        }
        let (min, max) = values.range().unwrap();
        HeightMap::new(values, min, max)
    }

    #[test]
    fn stride_grows_with_lod() {
        assert_eq!(lod_stride(0), 1);
        assert_eq!(lod_stride(1), 2);
        assert_eq!(lod_stride(4), 8);
    }

    #[test]
    fn sampling_keeps_chunk_edges() {
        assert_eq!(sample_indices(9, 1), vec![1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(sample_indices(9, 4), vec![1, 5, 7]);
        assert!(sample_indices(2, 1).is_empty());
    }

    #[test]
    fn lod0_mesh_covers_interior_grid() {
        let settings = MeshSettings::default();
        let map = height_map(49, |_, _| 0.0);
        let mesh = TerrainMeshBuilder.build_mesh(&map, &settings, 0);
        assert_eq!(mesh.vertices.len(), 47 * 47);
        assert_eq!(mesh.triangle_count(), 46 * 46 * 2);
        let half = settings.mesh_world_size() / 2.0;
        assert_eq!(mesh.vertices[0].position, [-half, 0.0, half]);
        assert_eq!(mesh.vertices.last().unwrap().position, [half, 0.0, -half]);
    }

    #[test]
    fn higher_lod_uses_fewer_vertices() {
        let settings = MeshSettings::default();
        let map = height_map(49, |x, y| (x + y) as f32);
        let lod0 = TerrainMeshBuilder.build_mesh(&map, &settings, 0);
        let lod2 = TerrainMeshBuilder.build_mesh(&map, &settings, 2);
        assert!(lod2.vertices.len() < lod0.vertices.len());
        assert_eq!(lod0.height_range(), lod2.height_range());
    }

    #[test]
    fn flat_ground_normals_point_up() {
        let settings = MeshSettings::default();
        let map = height_map(49, |_, _| 3.0);
        let mesh = TerrainMeshBuilder.build_mesh(&map, &settings, 1);
        assert!(mesh.vertices.iter().all(|v| v.normal == [0.0, 1.0, 0.0]));
    }

    #[test]
    fn flat_shading_duplicates_vertices_per_triangle() {
        let settings = MeshSettings {
            use_flat_shading: true,
            ..MeshSettings::default()
        };
        let map = height_map(49, |x, _| x as f32 * 0.5);
        let mesh = TerrainMeshBuilder.build_mesh(&map, &settings, 4);
        assert_eq!(mesh.vertices.len(), mesh.indices.len());
        assert!(mesh.vertices.iter().all(|v| v.normal[1] > 0.0));
    }

    #[test]
    fn byte_views_match_buffer_sizes() {
        let map = height_map(9, |_, _| 1.0);
        let mesh = TerrainMeshBuilder.build_mesh(&map, &MeshSettings::default(), 0);
        assert_eq!(mesh.vertex_bytes().len(), mesh.vertices.len() * std::mem::size_of::<Vertex>());
        assert_eq!(mesh.index_bytes().len(), mesh.indices.len() * 4);
    }
}
