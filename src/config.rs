use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{RenderError, Result};
use crate::renderer::PixelDepth;
use crate::sky::sky_scroll_span;
use crate::surface_cache::surface_cache_for_res;

pub const DEFAULT_COLOR_BITS: u32 = 6;
pub const DEFAULT_SKY_SPEED: i32 = 8;
pub const DEFAULT_SKY_SPEED2: i32 = 2;

// Settings for one video mode and level. Loaded from JSON, every field optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: u32,                  // Screen width, used to size the surface cache
    pub height: u32,                 // Screen height, used to size the surface cache
    pub surf_cache_kb: Option<usize>, // Explicit surface cache size in KiB
    pub pixel_depth: PixelDepth,     // 8 or 16 bits per pixel
    pub color_bits: u32,             // log2 of the number of colormap light grades
    pub fullbright: bool,            // Skip lightmaps, draw everything at full brightness
    pub sky_speed: i32,              // Scroll speed of the cloud layer
    pub sky_speed2: i32,             // Scroll speed of the second sky layer
    pub ambient_light: i32,          // Scene ambient light, 0..=255
    pub light_styles: Vec<String>,   // Light style animations, one letter per tenth of a second
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            width: 320,
            height: 200,
            surf_cache_kb: None,
            pixel_depth: PixelDepth::Eight,
            color_bits: DEFAULT_COLOR_BITS,
            fullbright: false,
            sky_speed: DEFAULT_SKY_SPEED,
            sky_speed2: DEFAULT_SKY_SPEED2,
            ambient_light: 0,
            light_styles: vec!["m".to_string()],
        }
    }
}

impl RenderConfig {
    pub fn from_json(text: &str) -> Result<RenderConfig> {
        let config: RenderConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<RenderConfig> {
        let text = fs::read_to_string(path)?;
        RenderConfig::from_json(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(RenderError::Config(format!(
                "resolution {}x{} is empty",
                self.width, self.height
            )));
        }

        if !(1..=8).contains(&self.color_bits) {
            return Err(RenderError::Config(format!(
                "color_bits must be 1..=8, got {}",
                self.color_bits
            )));
        }

        if sky_scroll_span(self.sky_speed, self.sky_speed2).is_none() {
            return Err(RenderError::Config(format!(
                "sky speeds must be positive and small enough to scroll, got {} and {}",
                self.sky_speed, self.sky_speed2
            )));
        }

        if !(0..=255).contains(&self.ambient_light) {
            return Err(RenderError::Config(format!(
                "ambient_light must be 0..=255, got {}",
                self.ambient_light
            )));
        }

        Ok(())
    }

    // Size of the surface cache in bytes for this mode
    pub fn surface_cache_size(&self) -> usize {
        surface_cache_for_res(self.width as usize, self.height as usize, self.surf_cache_kb)
            * self.pixel_depth.bytes()
    }

    // Number of light grades in the colormap
    pub fn grades(&self) -> usize {
        1 << self.color_bits
    }
}
