use std::sync::Arc;

use proptest::prelude::*;
use terra_mesh_cpu::{MeshSettings, TileMesh, build_terrain_mesh};
use terra_world::{CurveKey, HeightCurve, HeightField, MAX_LOD, TerrainError, simplification_step};

fn smooth() -> MeshSettings {
    MeshSettings {
        height_multiplier: 20.0,
        ..MeshSettings::default()
    }
}

fn flat() -> MeshSettings {
    MeshSettings {
        flat_shaded: true,
        ..smooth()
    }
}

// (lod, bordered field) where the LOD step divides the visible span.
fn arb_case() -> impl Strategy<Value = (u32, HeightField)> {
    (0u32..=MAX_LOD, 1usize..=5).prop_flat_map(|(lod, k)| {
        let resolution = simplification_step(lod) * k + 1;
        let size = resolution + 2;
        prop::collection::vec(0.0f32..1.0, size * size).prop_map(move |values| {
            (lod, HeightField::from_values(size, size, values).unwrap())
        })
    })
}

fn visible_per_edge(field: &HeightField, lod: u32) -> usize {
    (field.width() - 3) / simplification_step(lod) + 1
}

fn unit(v: terra_geom::Vec3) -> bool {
    (v.length() - 1.0).abs() < 1e-4
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn smooth_counts_follow_lod((lod, field) in arb_case()) {
        let mesh = build_terrain_mesh(&field, &smooth(), lod).unwrap();
        let v = visible_per_edge(&field, lod);
        prop_assert_eq!(mesh.vertex_count(), v * v);
        prop_assert_eq!(mesh.triangle_count(), (v - 1) * (v - 1) * 2);
        prop_assert_eq!(mesh.uvs.len(), mesh.vertex_count());
        prop_assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertex_count()));
        let normals = mesh.normals.as_ref().unwrap();
        prop_assert_eq!(normals.len(), mesh.vertex_count());
        // A height field never folds over, so every normal points up.
        prop_assert!(normals.iter().all(|&n| unit(n) && n.y > 0.0));
    }

    #[test]
    fn flat_has_one_vertex_per_corner((lod, field) in arb_case()) {
        let mesh = build_terrain_mesh(&field, &flat(), lod).unwrap();
        prop_assert!(mesh.is_flat_shaded());
        prop_assert_eq!(mesh.vertex_count(), 3 * mesh.triangle_count());
        prop_assert!(mesh.indices.iter().enumerate().all(|(k, &i)| i as usize == k));
        prop_assert!(mesh.resolved_normals().iter().all(|&n| unit(n) && n.y > 0.0));
    }

    #[test]
    fn uvs_stay_in_unit_square((lod, field) in arb_case()) {
        let mesh = build_terrain_mesh(&field, &smooth(), lod).unwrap();
        prop_assert!(mesh.uvs.iter().all(|uv| (0.0..=1.0).contains(&uv.x) && (0.0..=1.0).contains(&uv.y)));
    }

    // Every LOD covers the same footprint.
    #[test]
    fn footprint_is_lod_independent((lod, field) in arb_case()) {
        let mesh = build_terrain_mesh(&field, &smooth(), lod).unwrap();
        let half = (field.width() - 3) as f32 / 2.0;
        let (mut min_x, mut max_x) = (f32::INFINITY, f32::NEG_INFINITY);
        let (mut min_z, mut max_z) = (f32::INFINITY, f32::NEG_INFINITY);
        for v in &mesh.vertices {
            min_x = min_x.min(v.x);
            max_x = max_x.max(v.x);
            min_z = min_z.min(v.z);
            max_z = max_z.max(v.z);
        }
        prop_assert_eq!((min_x, max_x), (-half, half));
        prop_assert_eq!((min_z, max_z), (-half, half));
    }
}

fn ramp(size: usize) -> HeightField {
    let values = (0..size * size)
        .map(|i| (i % size) as f32 / (size - 1) as f32)
        .collect();
    HeightField::from_values(size, size, values).unwrap()
}

#[test]
fn full_detail_tile_counts() {
    let field = ramp(243);
    let mesh = build_terrain_mesh(&field, &smooth(), 0).unwrap();
    assert_eq!(mesh.vertex_count(), 241 * 241);
    assert_eq!(mesh.triangle_count(), 240 * 240 * 2);
}

#[test]
fn corners_and_uvs() {
    let field = ramp(243);
    let mesh = build_terrain_mesh(&field, &smooth(), 2).unwrap();
    let first = mesh.vertices[0];
    let last = mesh.vertices[mesh.vertex_count() - 1];
    assert_eq!((first.x, first.z), (-120.0, 120.0));
    assert_eq!((last.x, last.z), (120.0, -120.0));
    assert_eq!((mesh.uvs[0].x, mesh.uvs[0].y), (0.0, 0.0));
    let uv = mesh.uvs[mesh.vertex_count() - 1];
    assert_eq!((uv.x, uv.y), (1.0, 1.0));
}

#[test]
fn curve_and_multiplier_shape_heights() {
    let field = HeightField::from_values(4, 4, vec![0.5; 16]).unwrap();
    let settings = MeshSettings {
        height_multiplier: 10.0,
        height_curve: Arc::new(HeightCurve::new(vec![
            CurveKey::new(0.0, 0.0),
            CurveKey::new(1.0, 0.2),
        ])),
        flat_shaded: false,
    };
    let mesh = build_terrain_mesh(&field, &settings, 0).unwrap();
    assert!(mesh.vertices.iter().all(|v| (v.y - 1.0).abs() < 1e-6));
    assert!(mesh.normals.unwrap().iter().all(|n| (n.y - 1.0).abs() < 1e-6));
}

#[test]
fn rejects_bad_inputs() {
    let square = ramp(243);
    assert!(matches!(
        build_terrain_mesh(&square, &smooth(), MAX_LOD + 1),
        Err(TerrainError::InvalidLod(_))
    ));
    let odd = ramp(244);
    assert!(matches!(
        build_terrain_mesh(&odd, &smooth(), 1),
        Err(TerrainError::InvalidDimensions(_))
    ));
    let wide = HeightField::from_values(5, 4, vec![0.0; 20]).unwrap();
    assert!(matches!(
        build_terrain_mesh(&wide, &smooth(), 0),
        Err(TerrainError::InvalidDimensions(_))
    ));
    let tiny = HeightField::from_values(3, 3, vec![0.0; 9]).unwrap();
    assert!(matches!(
        build_terrain_mesh(&tiny, &smooth(), 0),
        Err(TerrainError::InvalidDimensions(_))
    ));
}

#[test]
fn default_mesh_is_empty() {
    let mesh = TileMesh::default();
    assert_eq!(mesh.triangle_count(), 0);
    assert!(mesh.resolved_normals().is_empty());
}
