//! Fractal Perlin height sampling.
//!
//! Every octave samples at the absolute ground position of the cell, so two
//! tiles generated with centers one tile apart agree on the samples they share
//! as long as [`NormalizeMode::Global`] is used.

use fastnoise_lite::{FastNoiseLite, NoiseType};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use terra_geom::Vec2;

use crate::error::TerrainError;

/// Per-octave offsets are drawn from `[-OCTAVE_OFFSET_RANGE, OCTAVE_OFFSET_RANGE)`.
const OCTAVE_OFFSET_RANGE: i32 = 100_000;
/// Empirical headroom applied to the estimated maximum in global mode.
const GLOBAL_HEIGHT_DIVISOR: f32 = 1.25;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizeMode {
    /// Rescale by the extrema of the sampled grid. Single maps only.
    Local,
    /// Rescale by the a-priori amplitude bound. Seam-safe across tiles.
    #[default]
    Global,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NoiseParams {
    pub seed: i32,
    pub scale: f32,
    pub octaves: u32,
    pub persistence: f32,
    pub lacunarity: f32,
    pub offset: Vec2,
    pub normalize_mode: NormalizeMode,
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            seed: 0,
            scale: 50.0,
            octaves: 4,
            persistence: 0.5,
            lacunarity: 2.0,
            offset: Vec2::ZERO,
            normalize_mode: NormalizeMode::Global,
        }
    }
}

impl NoiseParams {
    pub fn validate(&self) -> Result<(), TerrainError> {
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(TerrainError::InvalidNoiseParams(format!(
                "scale must be positive, got {}",
                self.scale
            )));
        }
        if self.octaves == 0 {
            return Err(TerrainError::InvalidNoiseParams(
                "octaves must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.persistence) {
            return Err(TerrainError::InvalidNoiseParams(format!(
                "persistence must lie in [0, 1], got {}",
                self.persistence
            )));
        }
        if !(self.lacunarity.is_finite() && self.lacunarity >= 1.0) {
            return Err(TerrainError::InvalidNoiseParams(format!(
                "lacunarity must be >= 1, got {}",
                self.lacunarity
            )));
        }
        if !(self.offset.x.is_finite() && self.offset.y.is_finite()) {
            return Err(TerrainError::InvalidNoiseParams("offset must be finite".into()));
        }
        Ok(())
    }

    /// Upper bound of the raw octave sum: `Σ persistence^i`.
    pub fn max_possible_height(&self) -> f32 {
        let mut amplitude = 1.0f32;
        let mut total = 0.0f32;
        for _ in 0..self.octaves {
            total += amplitude;
            amplitude *= self.persistence;
        }
        total
    }
}

/// Immutable row-major grid of normalized heights.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightField {
    width: usize,
    height: usize,
    values: Vec<f32>,
}

impl HeightField {
    pub fn from_values(width: usize, height: usize, values: Vec<f32>) -> Result<Self, TerrainError> {
        if width == 0 || height == 0 || values.len() != width * height {
            return Err(TerrainError::InvalidDimensions(format!(
                "{} values cannot form a {}x{} field",
                values.len(),
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            values,
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn idx(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.values[self.idx(x, y)]
    }

    #[inline]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn min_max(&self) -> (f32, f32) {
        self.values
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            })
    }
}

fn octave_offsets(params: &NoiseParams) -> Vec<Vec2> {
    let mut rng = ChaCha8Rng::seed_from_u64(u64::from(params.seed as u32));
    (0..params.octaves)
        .map(|_| {
            let x = rng.random_range(-OCTAVE_OFFSET_RANGE..OCTAVE_OFFSET_RANGE) as f32;
            let y = rng.random_range(-OCTAVE_OFFSET_RANGE..OCTAVE_OFFSET_RANGE) as f32;
            Vec2::new(x, y)
        })
        .collect()
}

fn perlin() -> FastNoiseLite {
    let mut noise = FastNoiseLite::new();
    noise.set_noise_type(Some(NoiseType::Perlin));
    noise.set_frequency(Some(1.0));
    noise
}

#[inline]
fn perlin01(noise: &FastNoiseLite, x: f32, y: f32) -> f32 {
    ((noise.get_noise_2d(x, y) + 1.0) * 0.5).clamp(0.0, 1.0)
}

/// Samples a `width x height` grid centered on `center` (world X/Z of the tile).
///
/// Row `y` grows toward world `-Z`, which matches the vertex layout produced by
/// the mesh builder.
pub fn generate_height_field(
    width: usize,
    height: usize,
    params: &NoiseParams,
    center: Vec2,
) -> Result<HeightField, TerrainError> {
    params.validate()?;
    if width == 0 || height == 0 {
        return Err(TerrainError::InvalidDimensions(format!(
            "cannot sample an empty {width}x{height} field"
        )));
    }

    let offsets = octave_offsets(params);
    let noise = perlin();
    let half_w = width as f32 / 2.0;
    let half_h = height as f32 / 2.0;

    let mut values = Vec::with_capacity(width * height);
    let mut lo = f32::INFINITY;
    let mut hi = f32::NEG_INFINITY;
    for y in 0..height {
        // Tile centers are whole multiples of the tile size, so adding them to the
        // half-cell local position is exact and neighbours see identical inputs.
        let py = ((y as f32 - half_h) - center.y) - params.offset.y;
        for x in 0..width {
            let px = ((x as f32 - half_w) + center.x) + params.offset.x;
            let mut amplitude = 1.0f32;
            let mut frequency = 1.0f32;
            let mut raw = 0.0f32;
            for off in &offsets {
                let sx = px / params.scale * frequency + off.x;
                let sy = py / params.scale * frequency + off.y;
                raw += (perlin01(&noise, sx, sy) * 2.0 - 1.0) * amplitude;
                amplitude *= params.persistence;
                frequency *= params.lacunarity;
            }
            lo = lo.min(raw);
            hi = hi.max(raw);
            values.push(raw);
        }
    }

    match params.normalize_mode {
        NormalizeMode::Local => {
            let span = hi - lo;
            for v in &mut values {
                *v = if span > 0.0 { (*v - lo) / span } else { 0.0 };
            }
        }
        NormalizeMode::Global => {
            let denom = 2.0 * params.max_possible_height() / GLOBAL_HEIGHT_DIVISOR;
            for v in &mut values {
                *v = ((*v + 1.0) / denom).max(0.0);
            }
        }
    }

    log::trace!(
        "sampled {}x{} height field at ({}, {}) raw range [{}, {}]",
        width,
        height,
        center.x,
        center.y,
        lo,
        hi
    );

    Ok(HeightField {
        width,
        height,
        values,
    })
}
