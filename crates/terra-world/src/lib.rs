//! Tile addressing, height sampling, LOD tables and terrain parameters.
#![forbid(unsafe_code)]

pub mod color;
pub mod config;
pub mod curve;
pub mod error;
pub mod lod;
pub mod noise;

pub use color::{ColorBand, ColorBands, ImageBuffer};
pub use config::{ConfigError, MeshSettings, TerrainConfig, TerrainSettings, load_config_from_path};
pub use curve::{CurveKey, HeightCurve};
pub use error::TerrainError;
pub use lod::{LodLevel, LodTable, MAX_LOD, simplification_step};
pub use noise::{HeightField, NoiseParams, NormalizeMode, generate_height_field};

use serde::{Deserialize, Serialize};
use terra_geom::Vec2;

/// Cells added on each side of a tile's visible samples, used only for edge normals.
pub const BORDER: usize = 1;

/// Integer address of a tile on the ground plane. `tz` runs along world Z.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    pub tx: i32,
    pub tz: i32,
}

impl TileCoord {
    #[inline]
    pub const fn new(tx: i32, tz: i32) -> Self {
        Self { tx, tz }
    }

    #[inline]
    pub fn offset(self, dx: i32, dz: i32) -> Self {
        Self {
            tx: self.tx.saturating_add(dx),
            tz: self.tz.saturating_add(dz),
        }
    }

    /// Tile containing `pos`, rounding to the nearest tile center per axis.
    /// Positions beyond the `i32` grid clamp to its outermost tile.
    #[inline]
    pub fn from_world(pos: Vec2, tile_size: f32) -> Self {
        Self {
            tx: (pos.x / tile_size).round() as i32,
            tz: (pos.y / tile_size).round() as i32,
        }
    }

    /// World-space center of the tile.
    #[inline]
    pub fn world_position(self, tile_size: f32) -> Vec2 {
        Vec2::new(self.tx as f32 * tile_size, self.tz as f32 * tile_size)
    }

    #[inline]
    pub fn chebyshev_distance(self, other: TileCoord) -> u32 {
        self.tx.abs_diff(other.tx).max(self.tz.abs_diff(other.tz))
    }
}

impl From<(i32, i32)> for TileCoord {
    fn from(value: (i32, i32)) -> Self {
        Self::new(value.0, value.1)
    }
}

impl From<TileCoord> for (i32, i32) {
    fn from(value: TileCoord) -> Self {
        (value.tx, value.tz)
    }
}

impl std::fmt::Display for TileCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.tx, self.tz)
    }
}
