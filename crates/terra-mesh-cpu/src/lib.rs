//! CPU meshing of bordered height fields into tile geometry.
#![forbid(unsafe_code)]

mod build;
mod normals;

pub use build::build_terrain_mesh;
pub use terra_world::MeshSettings;

use terra_geom::{Vec2, Vec3};

/// Renderable geometry of one tile at one LOD.
///
/// `normals` is `None` for flat-shaded meshes; those carry one vertex per
/// triangle corner and take their normals from [`TileMesh::resolved_normals`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TileMesh {
    pub vertices: Vec<Vec3>,
    pub uvs: Vec<Vec2>,
    pub normals: Option<Vec<Vec3>>,
    pub indices: Vec<u32>,
}

impl TileMesh {
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    #[inline]
    pub fn is_flat_shaded(&self) -> bool {
        self.normals.is_none()
    }

    /// Per-vertex normals: the stored smooth normals, or one face normal per
    /// triangle corner when flat-shaded.
    pub fn resolved_normals(&self) -> Vec<Vec3> {
        if let Some(n) = &self.normals {
            return n.clone();
        }
        let mut out = vec![Vec3::UP; self.vertices.len()];
        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let n = normals::face_normal(self.vertices[a], self.vertices[b], self.vertices[c]);
            out[a] = n;
            out[b] = n;
            out[c] = n;
        }
        out
    }
}
