use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use terra::{RecordingSink, StreamingController, TileState};
use terra_geom::Vec3;
use terra_mesh_cpu::build_terrain_mesh;
use terra_world::{
    NormalizeMode, TerrainConfig, TerrainSettings, TileCoord, generate_height_field,
    load_config_from_path,
};

#[derive(Parser, Debug)]
#[command(name = "terra", about = "Streaming procedural terrain")]
struct Args {
    /// Terrain config (TOML). Defaults are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sample and mesh a single tile, then print its statistics.
    Sample {
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        tx: i32,
        #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
        tz: i32,
        #[arg(long, default_value_t = 0)]
        lod: u32,
        /// Normalize by the tile's own extrema instead of the global bound.
        #[arg(long)]
        local: bool,
        #[arg(long, allow_hyphen_values = true)]
        seed: Option<i32>,
    },
    /// Fly a viewpoint across the terrain headlessly and report what streamed in.
    Stream {
        #[arg(long, default_value_t = 120)]
        ticks: u32,
        /// World units moved per tick.
        #[arg(long, default_value_t = 20.0)]
        speed: f32,
        /// Direction of travel in degrees from +X toward +Z.
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        heading: f32,
        #[arg(long, default_value_t = 16)]
        frame_ms: u64,
    },
}

fn load_settings(
    args: &Args,
    tweak: impl FnOnce(&mut TerrainConfig),
) -> Result<TerrainSettings, Box<dyn std::error::Error>> {
    let mut cfg = match &args.config {
        Some(path) => {
            let cfg = load_config_from_path(path)?;
            log::info!("loaded terrain config from {}", path.display());
            cfg
        }
        None => TerrainConfig::default(),
    };
    tweak(&mut cfg);
    Ok(cfg.validate()?)
}

fn run_sample(
    args: &Args,
    coord: TileCoord,
    lod: u32,
    local: bool,
    seed: Option<i32>,
) -> Result<(), Box<dyn std::error::Error>> {
    let settings = load_settings(args, |cfg| {
        if let Some(seed) = seed {
            cfg.noise.seed = seed;
        }
        if local {
            cfg.noise.normalize_mode = NormalizeMode::Local;
        }
    })?;

    let size = settings.bordered_size();
    let t0 = Instant::now();
    let center = coord.world_position(settings.tile_size());
    let field = generate_height_field(size, size, &settings.noise, center)?;
    let sample_ms = t0.elapsed().as_secs_f64() * 1000.0;

    let (min, max) = field.min_max();
    let values = field.values();
    let mean = values.iter().map(|&v| f64::from(v)).sum::<f64>() / values.len() as f64;
    log::info!(
        "tile {} {}x{} samples: min={:.4} max={:.4} mean={:.4} in {:.2}ms",
        coord,
        size,
        size,
        min,
        max,
        mean,
        sample_ms
    );

    let t1 = Instant::now();
    let mesh = build_terrain_mesh(&field, &settings.mesh, lod)?;
    let mesh_ms = t1.elapsed().as_secs_f64() * 1000.0;
    log::info!(
        "lod {}: {} vertices, {} triangles{} in {:.2}ms",
        lod,
        mesh.vertex_count(),
        mesh.triangle_count(),
        if mesh.is_flat_shaded() { " (flat)" } else { "" },
        mesh_ms
    );
    Ok(())
}

fn run_stream(
    args: &Args,
    ticks: u32,
    speed: f32,
    heading: f32,
    frame_ms: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let settings = Arc::new(load_settings(args, |_| {})?);
    log::info!(
        "streaming: tile={} ring={} workers={} threshold={}",
        settings.tile_size(),
        settings.ring_radius(),
        settings.workers,
        settings.movement_threshold
    );

    let mut streamer = StreamingController::new(Arc::clone(&settings));
    let mut sink = RecordingSink::new();
    let (sin, cos) = heading.to_radians().sin_cos();
    let step = Vec3::new(cos * speed, 0.0, sin * speed);
    let mut viewpoint = Vec3::ZERO;
    let frame = Duration::from_millis(frame_ms);

    let t0 = Instant::now();
    let mut updates = 0usize;
    for _ in 0..ticks {
        let report = streamer.tick(viewpoint, &mut sink);
        if report.updated {
            updates += 1;
        }
        viewpoint += step;
        std::thread::sleep(frame);
    }

    // Let outstanding jobs land without moving.
    let settle = Duration::from_millis(frame_ms.max(1));
    loop {
        let idle = streamer.store().runtime().is_idle();
        let report = streamer.tick(viewpoint, &mut sink);
        if idle && report.results == 0 {
            break;
        }
        std::thread::sleep(settle);
    }

    let store = streamer.store();
    let active = store.tiles().filter(|t| t.state() == TileState::Active).count();
    let (q_data, inflight_data, q_mesh, inflight_mesh) = store.runtime().queue_debug_counts();
    log::info!(
        "done in {:.2}s: {} updates, {} tiles, {} visible, {} active, {} meshes pushed ({} held), {} colliders",
        t0.elapsed().as_secs_f64(),
        updates,
        store.len(),
        streamer.visible_tiles().len(),
        active,
        sink.mesh_pushes,
        sink.meshes.len(),
        sink.colliders.len()
    );
    log::info!(
        "queues: data {}/{} mesh {}/{}",
        q_data,
        inflight_data,
        q_mesh,
        inflight_mesh
    );
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();
    match args.cmd {
        Command::Sample {
            tx,
            tz,
            lod,
            local,
            seed,
        } => run_sample(&args, TileCoord::new(tx, tz), lod, local, seed),
        Command::Stream {
            ticks,
            speed,
            heading,
            frame_ms,
        } => run_stream(&args, ticks, speed, heading, frame_ms),
    }
}
