use criterion::{Criterion, black_box, criterion_group, criterion_main};
use terra_geom::Vec2;
use terra_mesh_cpu::{MeshSettings, build_terrain_mesh};
use terra_world::{NoiseParams, generate_height_field};

fn bench_build_terrain_mesh(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_terrain_mesh");
    let field = generate_height_field(243, 243, &NoiseParams::default(), Vec2::ZERO).unwrap();
    let smooth = MeshSettings::default();
    let flat = MeshSettings {
        flat_shaded: true,
        ..MeshSettings::default()
    };
    for lod in [0u32, 2, 6] {
        group.bench_function(format!("smooth_lod{lod}"), |b| {
            b.iter(|| black_box(build_terrain_mesh(&field, &smooth, lod).unwrap()))
        });
    }
    group.bench_function("flat_lod0", |b| {
        b.iter(|| black_box(build_terrain_mesh(&field, &flat, 0).unwrap()))
    });
    group.finish();
}

fn bench_generate_height_field(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate_height_field");
    let params = NoiseParams::default();
    group.bench_function("243x243_4_octaves", |b| {
        b.iter(|| black_box(generate_height_field(243, 243, &params, Vec2::new(240.0, 0.0)).unwrap()))
    });
    group.finish();
}

criterion_group!(benches, bench_build_terrain_mesh, bench_generate_height_field);
criterion_main!(benches);
