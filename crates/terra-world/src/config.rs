//! TOML terrain configuration.
//!
//! Every section and field is optional; missing values fall back to the
//! defaults below. [`TerrainConfig::validate`] turns the raw file into the
//! checked [`TerrainSettings`] used by the generators and the streamer.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use terra_geom::Vec2;
use thiserror::Error;

use crate::color::{ColorBand, ColorBands, default_bands};
use crate::curve::HeightCurve;
use crate::error::TerrainError;
use crate::lod::{LodLevel, LodTable};
use crate::noise::{NoiseParams, NormalizeMode};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error(transparent)]
    Terrain(#[from] TerrainError),
}

#[derive(Clone, Debug, Deserialize)]
pub struct TerrainConfig {
    #[serde(default)]
    pub tile: TileConfig,
    #[serde(default)]
    pub noise: NoiseConfig,
    #[serde(default)]
    pub mesh: MeshConfig,
    #[serde(default = "default_lods")]
    pub lod: Vec<LodLevel>,
    #[serde(default)]
    pub streaming: StreamingConfig,
    #[serde(default = "default_bands")]
    pub colors: Vec<ColorBand>,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            tile: TileConfig::default(),
            noise: NoiseConfig::default(),
            mesh: MeshConfig::default(),
            lod: default_lods(),
            streaming: StreamingConfig::default(),
            colors: default_bands(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct TileConfig {
    /// Visible samples per tile edge. Odd, so the tile spans `resolution - 1` units.
    #[serde(default = "default_resolution")]
    pub resolution: usize,
}
fn default_resolution() -> usize {
    241
}
impl Default for TileConfig {
    fn default() -> Self {
        Self {
            resolution: default_resolution(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct NoiseConfig {
    #[serde(default)]
    pub seed: i32,
    #[serde(default = "default_scale")]
    pub scale: f32,
    #[serde(default = "default_octaves")]
    pub octaves: u32,
    #[serde(default = "default_persistence")]
    pub persistence: f32,
    #[serde(default = "default_lacunarity")]
    pub lacunarity: f32,
    #[serde(default)]
    pub offset: [f32; 2],
    #[serde(default)]
    pub normalize_mode: NormalizeMode,
}
fn default_scale() -> f32 {
    50.0
}
fn default_octaves() -> u32 {
    4
}
fn default_persistence() -> f32 {
    0.5
}
fn default_lacunarity() -> f32 {
    2.0
}
impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            scale: default_scale(),
            octaves: default_octaves(),
            persistence: default_persistence(),
            lacunarity: default_lacunarity(),
            offset: [0.0, 0.0],
            normalize_mode: NormalizeMode::default(),
        }
    }
}
impl NoiseConfig {
    pub fn to_params(&self) -> NoiseParams {
        NoiseParams {
            seed: self.seed,
            scale: self.scale,
            octaves: self.octaves,
            persistence: self.persistence,
            lacunarity: self.lacunarity,
            offset: Vec2::new(self.offset[0], self.offset[1]),
            normalize_mode: self.normalize_mode,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct MeshConfig {
    #[serde(default = "default_height_multiplier")]
    pub height_multiplier: f32,
    #[serde(default)]
    pub height_curve: HeightCurve,
    #[serde(default)]
    pub flat_shading: bool,
}
fn default_height_multiplier() -> f32 {
    36.0
}
impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            height_multiplier: default_height_multiplier(),
            height_curve: HeightCurve::default(),
            flat_shading: false,
        }
    }
}

fn default_lods() -> Vec<LodLevel> {
    vec![
        LodLevel::new(0, 200.0).with_collision(),
        LodLevel::new(2, 400.0),
        LodLevel::new(4, 600.0),
    ]
}

#[derive(Clone, Debug, Deserialize)]
pub struct StreamingConfig {
    /// Distance the viewpoint must travel before the visible set is recomputed.
    #[serde(default = "default_movement_threshold")]
    pub movement_threshold: f32,
    #[serde(default = "default_world_scale")]
    pub world_scale: f32,
    /// Worker threads; defaults to the available parallelism.
    #[serde(default)]
    pub workers: Option<usize>,
    /// Chebyshev distance in tiles beyond which tiles are dropped. Unset keeps every tile.
    #[serde(default)]
    pub evict_radius: Option<u32>,
}
fn default_movement_threshold() -> f32 {
    25.0
}
fn default_world_scale() -> f32 {
    1.0
}
impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            movement_threshold: default_movement_threshold(),
            world_scale: default_world_scale(),
            workers: None,
            evict_radius: None,
        }
    }
}

/// Height shaping shared by every mesh job.
#[derive(Clone, Debug)]
pub struct MeshSettings {
    pub height_multiplier: f32,
    pub height_curve: Arc<HeightCurve>,
    pub flat_shaded: bool,
}

impl Default for MeshSettings {
    fn default() -> Self {
        Self {
            height_multiplier: default_height_multiplier(),
            height_curve: Arc::new(HeightCurve::default()),
            flat_shaded: false,
        }
    }
}

/// Checked configuration.
#[derive(Clone, Debug)]
pub struct TerrainSettings {
    pub resolution: usize,
    pub noise: NoiseParams,
    pub mesh: MeshSettings,
    pub lods: LodTable,
    pub colors: ColorBands,
    pub movement_threshold: f32,
    pub world_scale: f32,
    pub workers: usize,
    pub evict_radius: Option<u32>,
}

impl TerrainSettings {
    /// World units spanned by one tile.
    #[inline]
    pub fn tile_size(&self) -> f32 {
        (self.resolution - 1) as f32
    }

    /// Samples per edge of a tile's height field, border included.
    #[inline]
    pub fn bordered_size(&self) -> usize {
        self.resolution + 2 * crate::BORDER
    }

    /// Tiles kept around the center tile so the farthest LOD threshold is covered.
    #[inline]
    pub fn ring_radius(&self) -> i32 {
        ring_radius(self.lods.max_view_distance(), self.tile_size())
    }
}

fn ring_radius(max_view_distance: f32, tile_size: f32) -> i32 {
    (max_view_distance / tile_size).ceil() as i32
}

impl TerrainConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn validate(&self) -> Result<TerrainSettings, ConfigError> {
        let resolution = self.tile.resolution;
        if resolution < 3 || resolution % 2 == 0 {
            return Err(ConfigError::Invalid(format!(
                "tile resolution must be odd and at least 3, got {resolution}"
            )));
        }
        let noise = self.noise.to_params();
        noise.validate()?;
        let lods = LodTable::new(self.lod.clone())?;
        lods.check_resolution(resolution)?;
        let colors = ColorBands::new(self.colors.clone())?;

        let mesh = &self.mesh;
        if !mesh.height_multiplier.is_finite() {
            return Err(ConfigError::Invalid("height_multiplier must be finite".into()));
        }
        let s = &self.streaming;
        if !(s.movement_threshold.is_finite() && s.movement_threshold >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "movement_threshold must be non-negative, got {}",
                s.movement_threshold
            )));
        }
        if !(s.world_scale.is_finite() && s.world_scale > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "world_scale must be positive, got {}",
                s.world_scale
            )));
        }
        if let Some(r) = s.evict_radius {
            let ring = ring_radius(lods.max_view_distance(), (resolution - 1) as f32);
            if i64::from(r) <= i64::from(ring) {
                return Err(ConfigError::Invalid(format!(
                    "evict_radius {r} must exceed the view ring radius {ring}"
                )));
            }
        }
        let workers = match s.workers {
            Some(0) => return Err(ConfigError::Invalid("workers must be at least 1".into())),
            Some(n) => n,
            None => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
        };

        Ok(TerrainSettings {
            resolution,
            noise,
            mesh: MeshSettings {
                height_multiplier: mesh.height_multiplier,
                height_curve: Arc::new(mesh.height_curve.clone()),
                flat_shaded: mesh.flat_shading,
            },
            lods,
            colors,
            movement_threshold: s.movement_threshold,
            world_scale: s.world_scale,
            workers,
            evict_radius: s.evict_radius,
        })
    }
}

pub fn load_config_from_path(path: &Path) -> Result<TerrainConfig, ConfigError> {
    let s = fs::read_to_string(path)?;
    TerrainConfig::from_toml_str(&s)
}
