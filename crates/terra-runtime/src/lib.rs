//! Runtime job queues and worker orchestration for tile generation.
#![forbid(unsafe_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, TryRecvError, select, unbounded};
use rayon::{ThreadPool, ThreadPoolBuilder};
use terra_mesh_cpu::{TileMesh, build_terrain_mesh};
use terra_world::{
    HeightField, ImageBuffer, TerrainError, TerrainSettings, TileCoord, generate_height_field,
};

/// Sample a tile's height field and color it.
#[derive(Clone, Debug)]
pub struct DataJob {
    pub coord: TileCoord,
}

/// Triangulate an already sampled height field at one LOD.
#[derive(Clone, Debug)]
pub struct MeshJob {
    pub coord: TileCoord,
    pub lod_slot: usize,
    pub lod: u32,
    pub field: Arc<HeightField>,
}

#[derive(Clone, Debug)]
pub struct TileData {
    pub field: Arc<HeightField>,
    pub texture: ImageBuffer,
}

#[derive(Debug)]
pub enum JobPayload {
    Data(Result<TileData, TerrainError>),
    Mesh {
        lod_slot: usize,
        lod: u32,
        result: Result<Arc<TileMesh>, TerrainError>,
    },
}

#[derive(Debug)]
pub struct JobOut {
    pub coord: TileCoord,
    pub t_ms: u32,
    pub payload: JobPayload,
}

#[derive(Default)]
struct QueueCounters {
    q_data: AtomicUsize,
    inflight_data: AtomicUsize,
    q_mesh: AtomicUsize,
    inflight_mesh: AtomicUsize,
}

#[inline]
fn elapsed_ms(t0: Instant) -> u32 {
    t0.elapsed().as_millis().min(u128::from(u32::MAX)) as u32
}

fn process_data_job(job: DataJob, settings: &TerrainSettings, tx: &Sender<JobOut>) {
    let t0 = Instant::now();
    let size = settings.bordered_size();
    let center = job.coord.world_position(settings.tile_size());
    let result = generate_height_field(size, size, &settings.noise, center).map(|field| {
        let texture = ImageBuffer::from_bands(&field, &settings.colors);
        TileData {
            field: Arc::new(field),
            texture,
        }
    });
    let t_ms = elapsed_ms(t0);
    log::info!(target: "perf", "ms={} tile_data coord={} size={}", t_ms, job.coord, size);
    let _ = tx.send(JobOut {
        coord: job.coord,
        t_ms,
        payload: JobPayload::Data(result),
    });
}

fn process_mesh_job(job: MeshJob, settings: &TerrainSettings, tx: &Sender<JobOut>) {
    let t0 = Instant::now();
    let result = build_terrain_mesh(&job.field, &settings.mesh, job.lod).map(Arc::new);
    let t_ms = elapsed_ms(t0);
    log::info!(target: "perf", "ms={} tile_mesh coord={} lod={}", t_ms, job.coord, job.lod);
    let _ = tx.send(JobOut {
        coord: job.coord,
        t_ms,
        payload: JobPayload::Mesh {
            lod_slot: job.lod_slot,
            lod: job.lod,
            result,
        },
    });
}

struct Worker {
    data_rx: Receiver<DataJob>,
    mesh_rx: Receiver<MeshJob>,
    tx: Sender<JobOut>,
    settings: Arc<TerrainSettings>,
    counters: Arc<QueueCounters>,
}

impl Worker {
    fn run_data(&self, job: DataJob) {
        let c = &self.counters;
        c.q_data.fetch_sub(1, Ordering::Relaxed);
        c.inflight_data.fetch_add(1, Ordering::Relaxed);
        process_data_job(job, &self.settings, &self.tx);
        c.inflight_data.fetch_sub(1, Ordering::Relaxed);
    }

    fn run_mesh(&self, job: MeshJob) {
        let c = &self.counters;
        c.q_mesh.fetch_sub(1, Ordering::Relaxed);
        c.inflight_mesh.fetch_add(1, Ordering::Relaxed);
        process_mesh_job(job, &self.settings, &self.tx);
        c.inflight_mesh.fetch_sub(1, Ordering::Relaxed);
    }

    // Mesh jobs go first: their tiles already have data and are waiting to show.
    fn run(self) {
        loop {
            match self.mesh_rx.try_recv() {
                Ok(job) => {
                    self.run_mesh(job);
                    continue;
                }
                Err(TryRecvError::Disconnected) => {
                    while let Ok(job) = self.data_rx.recv() {
                        self.run_data(job);
                    }
                    break;
                }
                Err(TryRecvError::Empty) => {}
            }

            select! {
                recv(self.mesh_rx) -> res => match res {
                    Ok(job) => self.run_mesh(job),
                    Err(_) => {
                        while let Ok(job) = self.data_rx.recv() {
                            self.run_data(job);
                        }
                        break;
                    }
                },
                recv(self.data_rx) -> res => match res {
                    Ok(job) => self.run_data(job),
                    Err(_) => {
                        while let Ok(job) = self.mesh_rx.recv() {
                            self.run_mesh(job);
                        }
                        break;
                    }
                },
            }
        }
    }
}

/// Bounded worker pool. Results are collected on the owning thread with
/// [`Runtime::drain_worker_results`]; workers never call back into the owner.
pub struct Runtime {
    data_tx: Sender<DataJob>,
    mesh_tx: Sender<MeshJob>,
    res_rx: Receiver<JobOut>,
    _pool: Arc<ThreadPool>,
    counters: Arc<QueueCounters>,
    pub workers: usize,
}

impl Runtime {
    pub fn new(settings: Arc<TerrainSettings>, workers: usize) -> Self {
        let workers = workers.max(1);
        let (data_tx, data_rx) = unbounded::<DataJob>();
        let (mesh_tx, mesh_rx) = unbounded::<MeshJob>();
        let (res_tx, res_rx) = unbounded::<JobOut>();
        let counters = Arc::new(QueueCounters::default());

        let pool = Arc::new(
            ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|i| format!("terra-gen-{i}"))
                .build()
                .expect("terrain worker pool"),
        );
        for _ in 0..workers {
            let worker = Worker {
                data_rx: data_rx.clone(),
                mesh_rx: mesh_rx.clone(),
                tx: res_tx.clone(),
                settings: settings.clone(),
                counters: counters.clone(),
            };
            pool.spawn(move || worker.run());
        }
        log::info!("terrain runtime started with {} worker(s)", workers);

        Self {
            data_tx,
            mesh_tx,
            res_rx,
            _pool: pool,
            counters,
            workers,
        }
    }

    pub fn submit_data_job(&self, job: DataJob) {
        self.counters.q_data.fetch_add(1, Ordering::Relaxed);
        if self.data_tx.send(job).is_err() {
            self.counters.q_data.fetch_sub(1, Ordering::Relaxed);
        }
    }

    pub fn submit_mesh_job(&self, job: MeshJob) {
        self.counters.q_mesh.fetch_add(1, Ordering::Relaxed);
        if self.mesh_tx.send(job).is_err() {
            self.counters.q_mesh.fetch_sub(1, Ordering::Relaxed);
        }
    }

    /// Every completion received so far, in arrival order. Never blocks.
    pub fn drain_worker_results(&self) -> Vec<JobOut> {
        self.res_rx.try_iter().collect()
    }

    /// `(queued data, in-flight data, queued mesh, in-flight mesh)`.
    pub fn queue_debug_counts(&self) -> (usize, usize, usize, usize) {
        let c = &self.counters;
        (
            c.q_data.load(Ordering::Relaxed),
            c.inflight_data.load(Ordering::Relaxed),
            c.q_mesh.load(Ordering::Relaxed),
            c.inflight_mesh.load(Ordering::Relaxed),
        )
    }

    pub fn is_idle(&self) -> bool {
        self.queue_debug_counts() == (0, 0, 0, 0)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use terra_world::TerrainConfig;

    use super::*;

    fn settings() -> Arc<TerrainSettings> {
        let cfg = TerrainConfig::from_toml_str("[tile]\nresolution = 33\n").unwrap();
        Arc::new(cfg.validate().unwrap())
    }

    fn wait_for(rt: &Runtime, n: usize) -> Vec<JobOut> {
        let mut out = Vec::new();
        for _ in 0..1000 {
            out.extend(rt.drain_worker_results());
            if out.len() >= n {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        out
    }

    #[test]
    fn data_then_mesh_round_trip() {
        let rt = Runtime::new(settings(), 2);
        let coord = TileCoord::new(2, -1);
        rt.submit_data_job(DataJob { coord });
        let out = wait_for(&rt, 1);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].coord, coord);
        let data = match &out[0].payload {
            JobPayload::Data(Ok(data)) => data.clone(),
            other => panic!("unexpected payload {other:?}"),
        };
        assert_eq!(data.field.width(), 35);
        assert_eq!((data.texture.width, data.texture.height), (33, 33));

        rt.submit_mesh_job(MeshJob {
            coord,
            lod_slot: 1,
            lod: 2,
            field: data.field.clone(),
        });
        let out = wait_for(&rt, 1);
        match &out[0].payload {
            JobPayload::Mesh {
                lod_slot: 1,
                lod: 2,
                result: Ok(mesh),
            } => assert_eq!(mesh.vertex_count(), 17 * 17),
            other => panic!("unexpected payload {other:?}"),
        }
        // Counters settle just after the result is sent.
        for _ in 0..1000 {
            if rt.is_idle() {
                break;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        assert!(rt.is_idle());
    }

    #[test]
    fn failures_come_back_as_values() {
        let rt = Runtime::new(settings(), 1);
        let field = Arc::new(HeightField::from_values(4, 4, vec![0.0; 16]).unwrap());
        rt.submit_mesh_job(MeshJob {
            coord: TileCoord::new(0, 0),
            lod_slot: 0,
            lod: 99,
            field,
        });
        let out = wait_for(&rt, 1);
        assert!(matches!(
            out[0].payload,
            JobPayload::Mesh {
                result: Err(TerrainError::InvalidLod(_)),
                ..
            }
        ));
    }

    #[test]
    fn every_submitted_job_completes_once() {
        let rt = Runtime::new(settings(), 3);
        for tx in -2..=2 {
            for tz in -2..=2 {
                rt.submit_data_job(DataJob {
                    coord: TileCoord::new(tx, tz),
                });
            }
        }
        let out = wait_for(&rt, 25);
        assert_eq!(out.len(), 25);
        let mut coords: Vec<TileCoord> = out.iter().map(|o| o.coord).collect();
        coords.sort();
        coords.dedup();
        assert_eq!(coords.len(), 25);
    }
}
