//! Viewpoint-driven streaming of tiles.

use std::sync::Arc;

use hashbrown::HashSet;
use terra_geom::{Vec2, Vec3};
use terra_world::{TerrainSettings, TileCoord};

use crate::sink::TileSink;
use crate::store::{ChunkStore, Placement};

/// What one [`StreamingController::tick`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Worker completions drained and applied.
    pub results: usize,
    /// Whether the visible set was recomputed.
    pub updated: bool,
    pub evicted: usize,
}

pub struct StreamingController {
    store: ChunkStore,
    last_update: Option<Vec2>,
    center: Option<TileCoord>,
    visible: HashSet<TileCoord>,
    tick: u64,
}

impl StreamingController {
    pub fn new(settings: Arc<TerrainSettings>) -> Self {
        Self::with_store(ChunkStore::new(settings))
    }

    pub fn with_store(store: ChunkStore) -> Self {
        Self {
            store,
            last_update: None,
            center: None,
            visible: HashSet::new(),
            tick: 0,
        }
    }

    #[inline]
    pub fn store(&self) -> &ChunkStore {
        &self.store
    }

    #[inline]
    pub fn store_mut(&mut self) -> &mut ChunkStore {
        &mut self.store
    }

    /// Tiles shown after the last update.
    #[inline]
    pub fn visible_tiles(&self) -> &HashSet<TileCoord> {
        &self.visible
    }

    #[inline]
    pub fn center(&self) -> Option<TileCoord> {
        self.center
    }

    /// Ground position (world units divided by the world scale) of the last update.
    #[inline]
    pub fn last_update_position(&self) -> Option<Vec2> {
        self.last_update
    }

    /// One frame: apply finished jobs, then recompute the visible set if the
    /// viewpoint moved past the movement threshold (always on the first call).
    pub fn tick(&mut self, viewpoint: Vec3, sink: &mut dyn TileSink) -> TickReport {
        self.tick += 1;
        let settings = Arc::clone(self.store.settings());
        let mut report = TickReport::default();

        let results = self.store.runtime().drain_worker_results();
        report.results = results.len();
        let mut touched = Vec::with_capacity(results.len());
        for out in results {
            touched.extend(self.store.apply_result(out, sink));
        }
        if let Some(last) = self.last_update {
            touched.sort_unstable();
            touched.dedup();
            for coord in touched {
                self.place(coord, last, sink);
            }
        }

        let pos = viewpoint.xz() / settings.world_scale;
        let threshold = settings.movement_threshold;
        let moved = match self.last_update {
            None => true,
            Some(last) => (pos - last).length_sq() > threshold * threshold,
        };
        if moved {
            self.update_visible(pos, &settings, sink);
            report.updated = true;
            if let (Some(radius), Some(center)) = (settings.evict_radius, self.center) {
                report.evicted = self.store.evict_outside(center, radius, sink);
                let store = &self.store;
                self.visible.retain(|c| store.contains(*c));
            }
        }
        report
    }

    fn place(&mut self, coord: TileCoord, pos: Vec2, sink: &mut dyn TileSink) {
        match self.store.update_tile(coord, pos, sink) {
            Placement::Visible { .. } => {
                self.visible.insert(coord);
            }
            Placement::Hidden => {
                self.visible.remove(&coord);
            }
            Placement::Pending => {}
        }
    }

    fn update_visible(&mut self, pos: Vec2, settings: &TerrainSettings, sink: &mut dyn TileSink) {
        self.last_update = Some(pos);
        let center = TileCoord::from_world(pos, settings.tile_size());
        let radius = settings.ring_radius();
        if self.center != Some(center) {
            log::info!(target: "events", "[tick {}] ViewCenterChanged {}", self.tick, center);
            self.center = Some(center);
        }

        let previous = std::mem::take(&mut self.visible);
        for dz in -radius..=radius {
            for dx in -radius..=radius {
                let coord = center.offset(dx, dz);
                self.store.get_or_create(coord);
                self.place(coord, pos, sink);
            }
        }
        for coord in previous {
            if !self.visible.contains(&coord) {
                self.store.hide(coord, sink);
            }
        }
        log::debug!(
            target: "events",
            "[tick {}] VisibleSetUpdated center={} visible={} tiles={}",
            self.tick,
            center,
            self.visible.len(),
            self.store.len()
        );
    }
}
