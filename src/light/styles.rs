use regex::Regex;

use crate::error::{RenderError, Result};
use crate::world::MAXLIGHTMAPS;

pub const MAX_LIGHTSTYLES: usize = 64;

// A style letter step: 'a' is dark, 'm' is normal, 'z' is double bright
const STYLE_STEP: i32 = 22;

// 1.0 in 8.8 fixed point, the value of a style without animation
const UNANIMATED: i32 = 256;

// Light style animations. Every style is a string of letters played back at
// ten letters a second; the current letter of each style gives its scale.
#[derive(Debug)]
pub struct LightStyles {
    patterns: Vec<String>, // Up to MAX_LIGHTSTYLES animation strings
    values: [i32; 256],    // Current 8.8 scale by style id
    valid: Regex,          // Letters a style may use
}

impl LightStyles {
    pub fn new(patterns: &[String]) -> Result<LightStyles> {
        let valid = Regex::new("^[a-z]*$")
            .map_err(|err| RenderError::Config(format!("light style pattern: {}", err)))?;

        let mut styles = LightStyles {
            patterns: Vec::with_capacity(MAX_LIGHTSTYLES),
            values: [UNANIMATED; 256],
            valid,
        };

        for (index, pattern) in patterns.iter().enumerate() {
            styles.set(index, pattern)?;
        }

        Ok(styles)
    }

    // Replace the animation of one style
    pub fn set(&mut self, index: usize, pattern: &str) -> Result<()> {
        if index >= MAX_LIGHTSTYLES || !self.valid.is_match(pattern) {
            return Err(RenderError::InvalidLightStyle {
                index,
                pattern: pattern.to_string(),
            });
        }

        if self.patterns.len() <= index {
            self.patterns.resize(index + 1, String::new());
        }
        self.patterns[index] = pattern.to_string();

        Ok(())
    }

    // Move every style to the letter for the given time in seconds
    pub fn animate(&mut self, time: f32) {
        let tenths = (time * 10.0) as i32;

        for (value, pattern) in self.values.iter_mut().zip(&self.patterns) {
            let map = pattern.as_bytes();
            if map.is_empty() {
                *value = UNANIMATED;
                continue;
            }

            let k = tenths.rem_euclid(map.len() as i32) as usize;
            *value = (map[k] - b'a') as i32 * STYLE_STEP;
        }
    }

    pub fn value(&self, style: u8) -> i32 {
        self.values[style as usize]
    }

    // The scales of a surface's four style slots
    pub fn light_adjust(&self, styles: &[u8; MAXLIGHTMAPS]) -> [i32; MAXLIGHTMAPS] {
        styles.map(|style| self.value(style))
    }
}
