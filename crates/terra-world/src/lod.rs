//! Distance-driven level of detail.
//!
//! A LOD index `i` samples every `simplification_step(i)` cells: LOD 0 keeps
//! every sample, LOD `i > 0` keeps one in `2 * i`. The table maps viewer
//! distance to the entry to render; the last threshold is the view distance.

use serde::Deserialize;

use crate::error::TerrainError;

/// Coarsest supported index (step 12).
pub const MAX_LOD: u32 = 6;

#[inline]
pub fn simplification_step(lod: u32) -> usize {
    if lod == 0 { 1 } else { 2 * lod as usize }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct LodLevel {
    pub lod: u32,
    pub visibility_threshold: f32,
    #[serde(default)]
    pub used_for_collision: bool,
}

impl LodLevel {
    #[inline]
    pub const fn new(lod: u32, visibility_threshold: f32) -> Self {
        Self {
            lod,
            visibility_threshold,
            used_for_collision: false,
        }
    }

    #[inline]
    pub const fn with_collision(mut self) -> Self {
        self.used_for_collision = true;
        self
    }

    #[inline]
    pub fn simplification_step(&self) -> usize {
        simplification_step(self.lod)
    }
}

/// Validated LOD entries, ascending by visibility threshold.
///
/// Entries are addressed by their position in the table ("slot").
#[derive(Clone, Debug, PartialEq)]
pub struct LodTable {
    levels: Vec<LodLevel>,
    collision_slot: Option<usize>,
}

impl LodTable {
    pub fn new(levels: Vec<LodLevel>) -> Result<Self, TerrainError> {
        if levels.is_empty() {
            return Err(TerrainError::InvalidLod("LOD table is empty".into()));
        }
        for level in &levels {
            if level.lod > MAX_LOD {
                return Err(TerrainError::InvalidLod(format!(
                    "LOD {} exceeds the maximum of {}",
                    level.lod, MAX_LOD
                )));
            }
            if !(level.visibility_threshold.is_finite() && level.visibility_threshold > 0.0) {
                return Err(TerrainError::InvalidLod(format!(
                    "threshold {} of LOD {} must be positive",
                    level.visibility_threshold, level.lod
                )));
            }
        }
        if let Some(w) = levels
            .windows(2)
            .find(|w| w[1].visibility_threshold < w[0].visibility_threshold)
        {
            return Err(TerrainError::InvalidLod(format!(
                "thresholds must ascend: {} follows {}",
                w[1].visibility_threshold, w[0].visibility_threshold
            )));
        }
        // Later flagged entries win, matching a top-to-bottom assignment.
        let collision_slot = levels.iter().rposition(|l| l.used_for_collision);
        Ok(Self {
            levels,
            collision_slot,
        })
    }

    #[inline]
    pub fn levels(&self) -> &[LodLevel] {
        &self.levels
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    #[inline]
    pub fn get(&self, slot: usize) -> Option<&LodLevel> {
        self.levels.get(slot)
    }

    #[inline]
    pub fn collision_slot(&self) -> Option<usize> {
        self.collision_slot
    }

    /// Distance beyond which tiles are hidden.
    #[inline]
    pub fn max_view_distance(&self) -> f32 {
        self.levels
            .last()
            .map(|l| l.visibility_threshold)
            .unwrap_or(0.0)
    }

    /// Smallest slot whose threshold covers `distance`, or `None` when out of view.
    pub fn select(&self, distance: f32) -> Option<usize> {
        self.levels
            .iter()
            .position(|l| distance <= l.visibility_threshold)
    }

    /// Checks that every step divides the visible span of a tile.
    pub fn check_resolution(&self, resolution: usize) -> Result<(), TerrainError> {
        if resolution < 2 {
            return Err(TerrainError::InvalidDimensions(format!(
                "tile resolution {resolution} is too small"
            )));
        }
        for level in &self.levels {
            let step = level.simplification_step();
            if (resolution - 1) % step != 0 {
                return Err(TerrainError::InvalidLod(format!(
                    "step {} of LOD {} does not divide tile span {}",
                    step,
                    level.lod,
                    resolution - 1
                )));
            }
        }
        Ok(())
    }
}
