//! Height-band coloring of height fields.

use serde::Deserialize;

use crate::BORDER;
use crate::config::ConfigError;
use crate::noise::HeightField;

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ColorBand {
    #[serde(default)]
    pub name: String,
    pub max_height: f32,
    pub color: [u8; 3],
}

impl ColorBand {
    pub fn new(name: &str, max_height: f32, color: [u8; 3]) -> Self {
        Self {
            name: name.to_string(),
            max_height,
            color,
        }
    }
}

/// Region table, ascending by `max_height`. A sample takes the color of the
/// first band whose `max_height` is not below it; samples above every band
/// take the last band's color.
#[derive(Clone, Debug, PartialEq)]
pub struct ColorBands {
    bands: Vec<ColorBand>,
}

impl Default for ColorBands {
    fn default() -> Self {
        Self {
            bands: default_bands(),
        }
    }
}

pub fn default_bands() -> Vec<ColorBand> {
    vec![
        ColorBand::new("deep water", 0.3, [50, 99, 195]),
        ColorBand::new("shallow water", 0.4, [54, 103, 199]),
        ColorBand::new("sand", 0.45, [210, 208, 125]),
        ColorBand::new("grass", 0.55, [86, 152, 23]),
        ColorBand::new("forest", 0.6, [62, 107, 18]),
        ColorBand::new("rock", 0.7, [90, 69, 60]),
        ColorBand::new("high rock", 0.9, [75, 60, 53]),
        ColorBand::new("snow", 1.0, [255, 255, 255]),
    ]
}

impl ColorBands {
    pub fn new(bands: Vec<ColorBand>) -> Result<Self, ConfigError> {
        if bands.is_empty() {
            return Err(ConfigError::Invalid("color band table is empty".into()));
        }
        if bands
            .windows(2)
            .any(|w| w[1].max_height < w[0].max_height)
        {
            return Err(ConfigError::Invalid(
                "color bands must ascend by max_height".into(),
            ));
        }
        Ok(Self { bands })
    }

    pub fn bands(&self) -> &[ColorBand] {
        &self.bands
    }

    pub fn color_for(&self, height: f32) -> [u8; 3] {
        self.bands
            .iter()
            .find(|b| height <= b.max_height)
            .or(self.bands.last())
            .map(|b| b.color)
            .unwrap_or([0, 0, 0])
    }
}

/// Row-major RGB8 image handed to the renderer.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageBuffer {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl ImageBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height * 3],
        }
    }

    #[inline]
    pub fn put_pixel(&mut self, x: usize, y: usize, rgb: [u8; 3]) {
        let idx = (y * self.width + x) * 3;
        self.data[idx..idx + 3].copy_from_slice(&rgb);
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let idx = (y * self.width + x) * 3;
        [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
    }

    /// Colors the visible samples of a bordered tile field.
    pub fn from_bands(field: &HeightField, bands: &ColorBands) -> Self {
        let width = field.width().saturating_sub(2 * BORDER);
        let height = field.height().saturating_sub(2 * BORDER);
        let mut img = Self::new(width, height);
        for y in 0..height {
            for x in 0..width {
                img.put_pixel(x, y, bands.color_for(field.get(x + BORDER, y + BORDER)));
            }
        }
        img
    }

    /// Black to white preview of every sample, clamped to `[0, 1]`.
    pub fn grayscale(field: &HeightField) -> Self {
        let mut img = Self::new(field.width(), field.height());
        for y in 0..field.height() {
            for x in 0..field.width() {
                let v = (field.get(x, y).clamp(0.0, 1.0) * 255.0).round() as u8;
                img.put_pixel(x, y, [v, v, v]);
            }
        }
        img
    }
}
