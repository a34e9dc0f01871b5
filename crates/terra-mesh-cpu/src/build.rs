use terra_geom::{Vec2, Vec3};
use terra_world::{
    BORDER, HeightField, MAX_LOD, MeshSettings, TerrainError, simplification_step,
};

use crate::TileMesh;
use crate::normals;

/// Grid positions visited along one axis of a `size`-sample bordered field:
/// the border at `0`, the visible samples `1, 1 + step, ..., size - 2`, and the
/// border at `size - 1`.
fn axis_positions(size: usize, step: usize) -> Vec<usize> {
    let mut out = Vec::with_capacity((size - 3) / step + 3);
    out.push(0);
    out.extend((BORDER..=size - 1 - BORDER).step_by(step));
    out.push(size - 1);
    out
}

/// Triangulates a bordered, square height field at the given LOD.
///
/// The outermost ring of samples only feeds normals. Edge vertices are shaded
/// from the full-resolution samples around them, so the edge normals agree
/// with the tile on the other side whatever LOD it was built at. Positions are centered on
/// the tile: `x` grows with the column, `z` shrinks with the row.
pub fn build_terrain_mesh(
    field: &HeightField,
    settings: &MeshSettings,
    lod: u32,
) -> Result<TileMesh, TerrainError> {
    if lod > MAX_LOD {
        return Err(TerrainError::InvalidLod(format!(
            "LOD {lod} exceeds the maximum of {MAX_LOD}"
        )));
    }
    let size = field.width();
    if field.height() != size {
        return Err(TerrainError::InvalidDimensions(format!(
            "height field must be square, got {}x{}",
            field.width(),
            field.height()
        )));
    }
    if size < 4 {
        return Err(TerrainError::InvalidDimensions(format!(
            "bordered field of {size} samples has no visible quad"
        )));
    }
    let step = simplification_step(lod);
    if (size - 3) % step != 0 {
        return Err(TerrainError::InvalidDimensions(format!(
            "step {step} of LOD {lod} does not divide a {size}-sample bordered field"
        )));
    }

    let axis = axis_positions(size, step);
    let n = axis.len();
    let resolution = size - 2 * BORDER;
    let span = (resolution - 1) as f32;
    let half = span / 2.0;
    let curve = settings.height_curve.as_ref();

    let interior = n - 2;
    let mut vertices = Vec::with_capacity(interior * interior);
    let mut uvs = Vec::with_capacity(interior * interior);
    let mut border = Vec::with_capacity(4 * (n - 1));
    let mut ids = vec![0i32; n * n];
    let mut next_mesh = 0i32;
    let mut next_border = -1i32;

    for (j, &gy) in axis.iter().enumerate() {
        for (i, &gx) in axis.iter().enumerate() {
            let pos = Vec3::new(
                gx as f32 - BORDER as f32 - half,
                curve.evaluate(field.get(gx, gy)) * settings.height_multiplier,
                half - (gy as f32 - BORDER as f32),
            );
            let on_border = i == 0 || j == 0 || i == n - 1 || j == n - 1;
            if on_border {
                ids[j * n + i] = next_border;
                next_border -= 1;
                border.push(pos);
            } else {
                ids[j * n + i] = next_mesh;
                next_mesh += 1;
                vertices.push(pos);
                uvs.push(Vec2::new(
                    (gx - BORDER) as f32 / span,
                    (gy - BORDER) as f32 / span,
                ));
            }
        }
    }

    let quads = (n - 1) * (n - 1);
    let mut triangles = Vec::with_capacity((interior - 1) * (interior - 1) * 2);
    let mut border_triangles = Vec::with_capacity((quads - (interior - 1) * (interior - 1)) * 2);
    for j in 0..n - 1 {
        for i in 0..n - 1 {
            let a = ids[j * n + i];
            let b = ids[j * n + i + 1];
            let c = ids[(j + 1) * n + i];
            let d = ids[(j + 1) * n + i + 1];
            for tri in [[a, d, c], [d, a, b]] {
                if tri.iter().any(|&id| id < 0) {
                    border_triangles.push(tri);
                } else {
                    triangles.push(tri);
                }
            }
        }
    }

    let mesh = if settings.flat_shaded {
        flat_shaded(&vertices, &uvs, &triangles)
    } else {
        let mut normals =
            normals::smooth_normals(&vertices, &border, &triangles, &border_triangles);
        // The outer visible ring takes its normals from full-resolution samples
        // so neighbours at any LOD agree on their shared edge.
        let height = |x: usize, y: usize| {
            curve.evaluate(field.get(x, y)) * settings.height_multiplier
        };
        for j in 1..n - 1 {
            for i in 1..n - 1 {
                if i == 1 || j == 1 || i == n - 2 || j == n - 2 {
                    let id = ids[j * n + i] as usize;
                    normals[id] = normals::grid_normal(axis[i], axis[j], &height);
                }
            }
        }
        TileMesh {
            vertices,
            uvs,
            normals: Some(normals),
            indices: triangles
                .iter()
                .flat_map(|t| t.iter().map(|&id| id as u32))
                .collect(),
        }
    };

    log::trace!(
        "built LOD {} tile mesh: {} vertices, {} triangles ({} border triangles)",
        lod,
        mesh.vertex_count(),
        mesh.triangle_count(),
        border_triangles.len()
    );
    Ok(mesh)
}

/// One vertex per triangle corner, indices `0..n`.
fn flat_shaded(vertices: &[Vec3], uvs: &[Vec2], triangles: &[[i32; 3]]) -> TileMesh {
    let corners = triangles.len() * 3;
    let mut out_v = Vec::with_capacity(corners);
    let mut out_uv = Vec::with_capacity(corners);
    for tri in triangles {
        for &id in tri {
            out_v.push(vertices[id as usize]);
            out_uv.push(uvs[id as usize]);
        }
    }
    TileMesh {
        vertices: out_v,
        uvs: out_uv,
        normals: None,
        indices: (0..corners as u32).collect(),
    }
}
