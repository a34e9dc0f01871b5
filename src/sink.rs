//! Renderer seam. The streamer pushes tile changes through a [`TileSink`]
//! synchronously on the control thread.

use std::sync::Arc;

use hashbrown::{HashMap, HashSet};
use terra_mesh_cpu::TileMesh;
use terra_world::{ImageBuffer, TileCoord};

pub trait TileSink {
    fn apply_mesh(&mut self, coord: TileCoord, mesh: &Arc<TileMesh>);
    fn apply_collision_mesh(&mut self, coord: TileCoord, mesh: &Arc<TileMesh>);
    fn apply_texture(&mut self, coord: TileCoord, texture: &ImageBuffer);
    fn set_visible(&mut self, coord: TileCoord, visible: bool);
}

/// Discards every push.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl TileSink for NullSink {
    fn apply_mesh(&mut self, _coord: TileCoord, _mesh: &Arc<TileMesh>) {}
    fn apply_collision_mesh(&mut self, _coord: TileCoord, _mesh: &Arc<TileMesh>) {}
    fn apply_texture(&mut self, _coord: TileCoord, _texture: &ImageBuffer) {}
    fn set_visible(&mut self, _coord: TileCoord, _visible: bool) {}
}

/// Mirrors what a renderer would hold, for headless runs and tests.
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    pub meshes: HashMap<TileCoord, Arc<TileMesh>>,
    pub colliders: HashMap<TileCoord, Arc<TileMesh>>,
    pub textured: HashSet<TileCoord>,
    pub visible: HashSet<TileCoord>,
    pub mesh_pushes: usize,
    pub visibility_pushes: usize,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_visible(&self, coord: TileCoord) -> bool {
        self.visible.contains(&coord)
    }
}

impl TileSink for RecordingSink {
    fn apply_mesh(&mut self, coord: TileCoord, mesh: &Arc<TileMesh>) {
        self.mesh_pushes += 1;
        self.meshes.insert(coord, Arc::clone(mesh));
    }

    fn apply_collision_mesh(&mut self, coord: TileCoord, mesh: &Arc<TileMesh>) {
        self.colliders.insert(coord, Arc::clone(mesh));
    }

    fn apply_texture(&mut self, coord: TileCoord, _texture: &ImageBuffer) {
        self.textured.insert(coord);
    }

    fn set_visible(&mut self, coord: TileCoord, visible: bool) {
        self.visibility_pushes += 1;
        if visible {
            self.visible.insert(coord);
        } else {
            self.visible.remove(&coord);
        }
    }
}
