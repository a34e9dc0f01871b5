//! Tile ownership and per-tile generation state.
//!
//! Every tile lives in one [`ChunkStore`] keyed by its coordinate. Jobs are
//! issued from here and their completions come back through
//! [`ChunkStore::apply_result`]; the per-slot state guarantees at most one
//! in-flight job per (tile, LOD slot).

use std::sync::Arc;

use hashbrown::HashMap;
use terra_geom::{Bounds2, Vec2};
use terra_mesh_cpu::TileMesh;
use terra_runtime::{DataJob, JobOut, JobPayload, MeshJob, Runtime};
use terra_world::{HeightField, ImageBuffer, TerrainError, TerrainSettings, TileCoord};

use crate::sink::TileSink;

#[derive(Clone, Debug, Default)]
pub enum MeshSlot {
    #[default]
    Idle,
    Requested,
    Ready(Arc<TileMesh>),
    Failed,
}

impl MeshSlot {
    pub fn mesh(&self) -> Option<&Arc<TileMesh>> {
        match self {
            MeshSlot::Ready(mesh) => Some(mesh),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
enum DataSlot {
    Requested,
    Ready(Arc<HeightField>),
    Failed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TileState {
    AwaitingData,
    DataReady,
    Active,
}

/// Result of placing one tile against a viewpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    /// No height field yet; the tile was left untouched.
    Pending,
    Hidden,
    Visible { lod_slot: usize },
}

pub struct Tile {
    coord: TileCoord,
    data: DataSlot,
    texture: Option<ImageBuffer>,
    meshes: Vec<MeshSlot>,
    visible: bool,
    active_slot: Option<usize>,
    desired_slot: Option<usize>,
    wants_collider: bool,
    collider_applied: bool,
}

impl Tile {
    fn new(coord: TileCoord, lod_slots: usize) -> Self {
        Self {
            coord,
            data: DataSlot::Requested,
            texture: None,
            meshes: vec![MeshSlot::Idle; lod_slots],
            visible: false,
            active_slot: None,
            desired_slot: None,
            wants_collider: false,
            collider_applied: false,
        }
    }

    #[inline]
    pub fn coord(&self) -> TileCoord {
        self.coord
    }

    pub fn state(&self) -> TileState {
        match self.data {
            DataSlot::Ready(_) if self.meshes.iter().any(|m| m.mesh().is_some()) => {
                TileState::Active
            }
            DataSlot::Ready(_) => TileState::DataReady,
            DataSlot::Requested | DataSlot::Failed => TileState::AwaitingData,
        }
    }

    pub fn field(&self) -> Option<&Arc<HeightField>> {
        match &self.data {
            DataSlot::Ready(field) => Some(field),
            _ => None,
        }
    }

    pub fn texture(&self) -> Option<&ImageBuffer> {
        self.texture.as_ref()
    }

    pub fn data_failed(&self) -> bool {
        matches!(self.data, DataSlot::Failed)
    }

    #[inline]
    pub fn is_visible(&self) -> bool {
        self.visible
    }

    #[inline]
    pub fn active_slot(&self) -> Option<usize> {
        self.active_slot
    }

    #[inline]
    pub fn desired_slot(&self) -> Option<usize> {
        self.desired_slot
    }

    pub fn mesh_slot(&self, lod_slot: usize) -> Option<&MeshSlot> {
        self.meshes.get(lod_slot)
    }

    pub fn active_mesh(&self) -> Option<&Arc<TileMesh>> {
        self.active_slot
            .and_then(|slot| self.meshes.get(slot))
            .and_then(MeshSlot::mesh)
    }

    #[inline]
    pub fn has_collider(&self) -> bool {
        self.collider_applied
    }

    pub fn bounds(&self, tile_size: f32) -> Bounds2 {
        Bounds2::from_center_size(self.coord.world_position(tile_size), tile_size)
    }

    fn set_visible(&mut self, visible: bool, sink: &mut dyn TileSink) {
        if self.visible != visible {
            self.visible = visible;
            sink.set_visible(self.coord, visible);
        }
    }

    /// Makes a cached slot the rendered mesh. False when the slot has no mesh yet.
    fn activate(&mut self, lod_slot: usize, sink: &mut dyn TileSink) -> bool {
        if self.active_slot == Some(lod_slot) {
            return true;
        }
        match self.meshes.get(lod_slot) {
            Some(MeshSlot::Ready(mesh)) => {
                sink.apply_mesh(self.coord, mesh);
                self.active_slot = Some(lod_slot);
                true
            }
            _ => false,
        }
    }

    fn apply_collider(&mut self, lod_slot: usize, sink: &mut dyn TileSink) -> bool {
        if self.collider_applied {
            return true;
        }
        match self.meshes.get(lod_slot) {
            Some(MeshSlot::Ready(mesh)) => {
                sink.apply_collision_mesh(self.coord, mesh);
                self.collider_applied = true;
                true
            }
            _ => false,
        }
    }
}

/// Issues a mesh job for an idle slot of a tile that has data.
fn issue_mesh(
    runtime: &Runtime,
    settings: &TerrainSettings,
    tile: &mut Tile,
    lod_slot: usize,
) -> Result<bool, TerrainError> {
    let level = settings.lods.get(lod_slot).ok_or_else(|| {
        TerrainError::InvalidLod(format!(
            "LOD slot {} outside a table of {}",
            lod_slot,
            settings.lods.len()
        ))
    })?;
    let field = match &tile.data {
        DataSlot::Ready(field) => Arc::clone(field),
        _ => return Ok(false),
    };
    if !matches!(tile.meshes[lod_slot], MeshSlot::Idle) {
        return Ok(false);
    }
    tile.meshes[lod_slot] = MeshSlot::Requested;
    runtime.submit_mesh_job(MeshJob {
        coord: tile.coord,
        lod_slot,
        lod: level.lod,
        field,
    });
    log::debug!("tile {} requested LOD {} (slot {})", tile.coord, level.lod, lod_slot);
    Ok(true)
}

pub struct ChunkStore {
    tiles: HashMap<TileCoord, Tile>,
    runtime: Runtime,
    settings: Arc<TerrainSettings>,
}

impl ChunkStore {
    pub fn new(settings: Arc<TerrainSettings>) -> Self {
        let runtime = Runtime::new(Arc::clone(&settings), settings.workers);
        Self::with_runtime(settings, runtime)
    }

    pub fn with_runtime(settings: Arc<TerrainSettings>, runtime: Runtime) -> Self {
        Self {
            tiles: HashMap::new(),
            runtime,
            settings,
        }
    }

    #[inline]
    pub fn settings(&self) -> &Arc<TerrainSettings> {
        &self.settings
    }

    #[inline]
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    #[inline]
    pub fn contains(&self, coord: TileCoord) -> bool {
        self.tiles.contains_key(&coord)
    }

    pub fn get(&self, coord: TileCoord) -> Option<&Tile> {
        self.tiles.get(&coord)
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.values()
    }

    /// Returns the tile at `coord`, creating it and issuing its data job on first access.
    pub fn get_or_create(&mut self, coord: TileCoord) -> &mut Tile {
        let runtime = &self.runtime;
        let lod_slots = self.settings.lods.len();
        self.tiles.entry(coord).or_insert_with(|| {
            log::debug!("tile {} created; requesting data", coord);
            runtime.submit_data_job(DataJob { coord });
            Tile::new(coord, lod_slots)
        })
    }

    /// Re-issues the data job of a tile whose previous one failed.
    pub fn request_data(&mut self, coord: TileCoord) -> bool {
        let Some(tile) = self.tiles.get_mut(&coord) else {
            return false;
        };
        if !matches!(tile.data, DataSlot::Failed) {
            return false;
        }
        tile.data = DataSlot::Requested;
        self.runtime.submit_data_job(DataJob { coord });
        log::debug!("tile {} re-requested data", coord);
        true
    }

    /// Issues a mesh job for `lod_slot` unless one is cached, in flight or failed.
    pub fn request_mesh(&mut self, coord: TileCoord, lod_slot: usize) -> Result<bool, TerrainError> {
        let Some(tile) = self.tiles.get_mut(&coord) else {
            return Ok(false);
        };
        issue_mesh(&self.runtime, &self.settings, tile, lod_slot)
    }

    /// Applies one drained completion. Returns the tile it touched, or `None`
    /// when the tile has been evicted since the job was issued.
    pub fn apply_result(&mut self, out: JobOut, sink: &mut dyn TileSink) -> Option<TileCoord> {
        let coord = out.coord;
        let Some(tile) = self.tiles.get_mut(&coord) else {
            log::debug!("dropping late result for evicted tile {}", coord);
            return None;
        };
        match out.payload {
            JobPayload::Data(Ok(data)) => {
                log::debug!("tile {} data ready in {}ms", coord, out.t_ms);
                sink.apply_texture(coord, &data.texture);
                tile.data = DataSlot::Ready(data.field);
                tile.texture = Some(data.texture);
            }
            JobPayload::Data(Err(err)) => {
                log::warn!("tile {} data job failed: {}", coord, err);
                tile.data = DataSlot::Failed;
            }
            JobPayload::Mesh {
                lod_slot,
                lod,
                result,
            } => {
                let Some(slot) = tile.meshes.get_mut(lod_slot) else {
                    log::warn!("tile {} got a mesh for unknown slot {}", coord, lod_slot);
                    return Some(coord);
                };
                match result {
                    Ok(mesh) => {
                        log::debug!(
                            "tile {} LOD {} ready in {}ms ({} triangles)",
                            coord,
                            lod,
                            out.t_ms,
                            mesh.triangle_count()
                        );
                        *slot = MeshSlot::Ready(mesh);
                        if tile.desired_slot == Some(lod_slot) {
                            tile.activate(lod_slot, sink);
                        }
                        if tile.wants_collider && self.settings.lods.collision_slot() == Some(lod_slot)
                        {
                            tile.apply_collider(lod_slot, sink);
                        }
                    }
                    Err(err) => {
                        log::warn!("tile {} LOD {} mesh job failed: {}", coord, lod, err);
                        *slot = MeshSlot::Failed;
                    }
                }
            }
        }
        Some(coord)
    }

    /// Picks the tile's LOD for `viewpoint`, swaps in cached meshes or requests
    /// missing ones, and sets its visibility. Tiles without data are skipped.
    pub fn update_tile(
        &mut self,
        coord: TileCoord,
        viewpoint: Vec2,
        sink: &mut dyn TileSink,
    ) -> Placement {
        let Self {
            tiles,
            runtime,
            settings,
        } = self;
        let Some(tile) = tiles.get_mut(&coord) else {
            return Placement::Pending;
        };
        if tile.field().is_none() {
            return Placement::Pending;
        }
        let distance = tile.bounds(settings.tile_size()).distance(viewpoint);
        let Some(lod_slot) = settings.lods.select(distance) else {
            tile.set_visible(false, sink);
            return Placement::Hidden;
        };

        tile.desired_slot = Some(lod_slot);
        // Until the new mesh lands the previous one stays on screen.
        if !tile.activate(lod_slot, sink) {
            if let Err(err) = issue_mesh(runtime, settings, tile, lod_slot) {
                log::warn!("tile {}: {}", coord, err);
            }
        }
        if lod_slot == 0 {
            if let Some(collision_slot) = settings.lods.collision_slot() {
                tile.wants_collider = true;
                if !tile.apply_collider(collision_slot, sink) {
                    if let Err(err) = issue_mesh(runtime, settings, tile, collision_slot) {
                        log::warn!("tile {}: {}", coord, err);
                    }
                }
            }
        }
        tile.set_visible(true, sink);
        Placement::Visible { lod_slot }
    }

    pub fn hide(&mut self, coord: TileCoord, sink: &mut dyn TileSink) {
        if let Some(tile) = self.tiles.get_mut(&coord) {
            tile.set_visible(false, sink);
        }
    }

    /// Clears failed data/mesh state of a tile and issues its jobs again.
    pub fn retrigger(&mut self, coord: TileCoord) -> bool {
        let Self {
            tiles,
            runtime,
            settings,
        } = self;
        let Some(tile) = tiles.get_mut(&coord) else {
            return false;
        };
        let mut issued = false;
        if matches!(tile.data, DataSlot::Failed) {
            tile.data = DataSlot::Requested;
            runtime.submit_data_job(DataJob { coord });
            issued = true;
        }
        for lod_slot in 0..tile.meshes.len() {
            if matches!(tile.meshes[lod_slot], MeshSlot::Failed) {
                tile.meshes[lod_slot] = MeshSlot::Idle;
                issued |= issue_mesh(runtime, settings, tile, lod_slot).unwrap_or(false);
            }
        }
        if issued {
            log::info!("retriggered generation of tile {}", coord);
        }
        issued
    }

    /// Drops every tile farther than `radius` tiles (Chebyshev) from `center`.
    pub fn evict_outside(
        &mut self,
        center: TileCoord,
        radius: u32,
        sink: &mut dyn TileSink,
    ) -> usize {
        let before = self.tiles.len();
        self.tiles.retain(|&coord, tile| {
            let keep = coord.chebyshev_distance(center) <= radius;
            if !keep {
                tile.set_visible(false, sink);
                log::debug!("evicting tile {}", coord);
            }
            keep
        });
        before - self.tiles.len()
    }
}
