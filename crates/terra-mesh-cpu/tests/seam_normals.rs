use terra_geom::Vec3;
use terra_mesh_cpu::{MeshSettings, TileMesh, build_terrain_mesh};
use terra_world::{
    HeightField, MAX_LOD, NoiseParams, TileCoord, generate_height_field, simplification_step,
};

const RES: usize = 241;
const SIZE: usize = RES + 2;
const TILE: f32 = (RES - 1) as f32;

fn tile_field(coord: TileCoord, params: &NoiseParams) -> HeightField {
    generate_height_field(SIZE, SIZE, params, coord.world_position(TILE)).unwrap()
}

fn tile_mesh(field: &HeightField, lod: u32) -> TileMesh {
    let settings = MeshSettings {
        height_multiplier: 40.0,
        ..MeshSettings::default()
    };
    build_terrain_mesh(field, &settings, lod).unwrap()
}

fn close(a: Vec3, b: Vec3) -> bool {
    (a - b).length() < 1e-5
}

fn params() -> NoiseParams {
    NoiseParams {
        seed: 1234,
        scale: 37.0,
        octaves: 5,
        ..NoiseParams::default()
    }
}

/// Vertices per row of a mesh built at `lod`.
fn row_len(lod: u32) -> usize {
    (RES - 1) / simplification_step(lod) + 1
}

#[test]
fn edge_normals_match_across_x() {
    let p = params();
    let fa = tile_field(TileCoord::new(3, -2), &p);
    let fb = tile_field(TileCoord::new(4, -2), &p);
    for lod in 0..=MAX_LOD {
        let (a, b) = (tile_mesh(&fa, lod), tile_mesh(&fb, lod));
        let (na, nb) = (a.normals.unwrap(), b.normals.unwrap());
        let m = row_len(lod);
        for row in 0..m {
            let ia = row * m + m - 1;
            let ib = row * m;
            assert_eq!(a.vertices[ia].y, b.vertices[ib].y, "lod {lod} height row {row}");
            assert!(close(na[ia], nb[ib]), "lod {lod} row {row}: {:?} vs {:?}", na[ia], nb[ib]);
        }
    }
}

#[test]
fn edge_normals_match_across_z() {
    let p = params();
    let fa = tile_field(TileCoord::new(-1, 5), &p);
    let fb = tile_field(TileCoord::new(-1, 6), &p);
    for lod in 0..=MAX_LOD {
        let (a, b) = (tile_mesh(&fa, lod), tile_mesh(&fb, lod));
        let (na, nb) = (a.normals.unwrap(), b.normals.unwrap());
        let m = row_len(lod);
        // First row of `a` sits at its +Z edge, which is the last row of `b`.
        for col in 0..m {
            let ia = col;
            let ib = (m - 1) * m + col;
            assert_eq!(a.vertices[ia].y, b.vertices[ib].y, "lod {lod} height col {col}");
            assert!(close(na[ia], nb[ib]), "lod {lod} col {col}: {:?} vs {:?}", na[ia], nb[ib]);
        }
    }
}

#[test]
fn neighbours_at_different_lods_share_edge_normals() {
    let p = params();
    let fine = tile_mesh(&tile_field(TileCoord::new(7, 1), &p), 1);
    let coarse = tile_mesh(&tile_field(TileCoord::new(8, 1), &p), 4);
    let (nf, nc) = (fine.normals.unwrap(), coarse.normals.unwrap());
    let (mf, mc) = (row_len(1), row_len(4));
    let ratio = (mf - 1) / (mc - 1);
    // Every coarse edge vertex has a fine counterpart on the same sample.
    for row in 0..mc {
        let ifine = row * ratio * mf + mf - 1;
        let icoarse = row * mc;
        assert!(close(nf[ifine], nc[icoarse]), "row {row}: {:?} vs {:?}", nf[ifine], nc[icoarse]);
    }
}

#[test]
fn corner_normal_matches_diagonal_neighbour() {
    let p = params();
    let fa = tile_field(TileCoord::new(0, 0), &p);
    let fb = tile_field(TileCoord::new(1, 1), &p);
    for lod in [0, 2, MAX_LOD] {
        let (a, b) = (tile_mesh(&fa, lod), tile_mesh(&fb, lod));
        let m = row_len(lod);
        // +X/+Z corner of `a` is the -X/-Z corner of `b`.
        let ia = m - 1;
        let ib = (m - 1) * m;
        assert!(close(a.normals.unwrap()[ia], b.normals.unwrap()[ib]), "lod {lod}");
    }
}
