use terra_geom::Vec3;

/// Unit normal of triangle `(a, b, c)`, `(b - a) x (c - a)`.
#[inline]
pub(crate) fn face_normal(a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    (b - a).cross(c - a).normalized()
}

/// Vertex lookup across the two id spaces: `id >= 0` addresses the mesh
/// vertices, `id <= -1` the border ring (`-1` is the first border vertex).
#[inline]
pub(crate) fn position(id: i32, vertices: &[Vec3], border: &[Vec3]) -> Vec3 {
    if id >= 0 {
        vertices[id as usize]
    } else {
        border[(-id - 1) as usize]
    }
}

/// Normal of grid sample `(gx, gy)` from the full-resolution triangles around
/// it. Reads only the sample and its eight neighbours, which both tiles sharing
/// an edge hold, so the result does not depend on the LOD either tile uses.
pub(crate) fn grid_normal(
    gx: usize,
    gy: usize,
    height: impl Fn(usize, usize) -> f32,
) -> Vec3 {
    let p = |(x, y): (usize, usize)| {
        Vec3::new(x as f32 - gx as f32, height(x, y), gy as f32 - y as f32)
    };
    let mut acc = Vec3::ZERO;
    for y in gy - 1..=gy {
        for x in gx - 1..=gx {
            let (a, b, c, d) = ((x, y), (x + 1, y), (x, y + 1), (x + 1, y + 1));
            for tri in [[a, d, c], [d, a, b]] {
                if tri.contains(&(gx, gy)) {
                    acc += face_normal(p(tri[0]), p(tri[1]), p(tri[2]));
                }
            }
        }
    }
    acc.normalized()
}

/// Smooth normals for the mesh vertices. Border triangles contribute to the
/// mesh vertices they touch so edge normals match the neighbouring tile.
pub(crate) fn smooth_normals(
    vertices: &[Vec3],
    border: &[Vec3],
    triangles: &[[i32; 3]],
    border_triangles: &[[i32; 3]],
) -> Vec<Vec3> {
    let mut acc = vec![Vec3::ZERO; vertices.len()];
    for tri in triangles.iter().chain(border_triangles) {
        let n = face_normal(
            position(tri[0], vertices, border),
            position(tri[1], vertices, border),
            position(tri[2], vertices, border),
        );
        for &id in tri {
            if id >= 0 {
                acc[id as usize] += n;
            }
        }
    }
    for n in &mut acc {
        *n = n.normalized();
    }
    acc
}
