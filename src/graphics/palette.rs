use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{RenderError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Rgb {
        Rgb { r, g, b }
    }

    // Pack into a 5-6-5 16-bit pixel
    pub fn to_565(self) -> u16 {
        ((self.r as u16 >> 3) << 11) | ((self.g as u16 >> 2) << 5) | (self.b as u16 >> 3)
    }

    fn scale(self, factor: f32) -> Rgb {
        let channel = |c: u8| (c as f32 * factor).min(255.0) as u8;
        Rgb::new(channel(self.r), channel(self.g), channel(self.b))
    }

    fn distance(self, other: Rgb) -> i32 {
        let dr = self.r as i32 - other.r as i32;
        let dg = self.g as i32 - other.g as i32;
        let db = self.b as i32 - other.b as i32;
        dr * dr + dg * dg + db * db
    }
}

// The 256 color display palette
#[derive(Clone)]
pub struct Palette {
    pub colors: [Rgb; 256],
}

impl Palette {
    // Read 768 bytes of 8-bit R, G, B values
    pub fn new(data: &[u8]) -> Result<Palette> {
        if data.len() < 768 {
            return Err(RenderError::Config(format!(
                "palette needs 768 bytes, got {}",
                data.len()
            )));
        }

        let mut colors = [Rgb::default(); 256];
        for (i, color) in colors.iter_mut().enumerate() {
            *color = Rgb::new(data[i * 3], data[i * 3 + 1], data[i * 3 + 2]);
        }

        Ok(Palette { colors })
    }

    // A ramp from black to white, handy when no palette lump is available
    pub fn grayscale() -> Palette {
        let mut colors = [Rgb::default(); 256];
        for (i, color) in colors.iter_mut().enumerate() {
            *color = Rgb::new(i as u8, i as u8, i as u8);
        }

        Palette { colors }
    }

    // Index of the closest palette entry
    pub fn nearest(&self, color: Rgb) -> u8 {
        let mut best = 0;
        let mut best_distance = i32::MAX;

        for (i, candidate) in self.colors.iter().enumerate() {
            let distance = candidate.distance(color);
            if distance < best_distance {
                best = i;
                best_distance = distance;
                if distance == 0 {
                    break;
                }
            }
        }

        best as u8
    }
}

impl fmt::Debug for Palette {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Palette: {:?} .. {:?}", self.colors[0], self.colors[255])
    }
}

// Maps (light grade, palette index) to a display color. Rows are 256 entries
// wide, row 0 is the brightest, the last row the darkest. Lookups index it
// with (light & 0xFF00) + texel where light is 8.8 fixed point.
pub struct Colormap {
    grades: usize,           // Number of rows
    table: Vec<u8>,          // 8-bit colors, 256 * grades
    table16: Vec<u16>,       // 16-bit colors, 256 * grades
    table_8to16: [u16; 256], // Palette index to 16-bit color
}

impl Colormap {
    // Wrap a precomputed table, e.g. from a colormap lump
    pub fn new(table: Vec<u8>, palette: &Palette) -> Result<Colormap> {
        let grades = table.len() / 256;
        if grades == 0 || !grades.is_power_of_two() || table.len() != grades * 256 {
            return Err(RenderError::Config(format!(
                "colormap of {} bytes is not a power of two number of 256-entry rows",
                table.len()
            )));
        }

        let mut table_8to16 = [0u16; 256];
        for (i, color) in palette.colors.iter().enumerate() {
            table_8to16[i] = color.to_565();
        }

        let table16 = table.iter().map(|&c| table_8to16[c as usize]).collect();

        Ok(Colormap {
            grades,
            table,
            table16,
            table_8to16,
        })
    }

    // Build the table by scaling every palette color. The middle row is the
    // unmodified palette, rows above it overbright up to 2x, rows below fade
    // to black.
    pub fn from_palette(palette: &Palette, color_bits: u32) -> Colormap {
        let grades = 1usize << color_bits.clamp(1, 8);
        let half = (grades / 2) as f32;

        let mut table = vec![0u8; grades * 256];
        for row in 0..grades {
            let factor = (grades - row) as f32 / half;
            for (i, color) in palette.colors.iter().enumerate() {
                table[row * 256 + i] = palette.nearest(color.scale(factor));
            }
        }

        let mut table_8to16 = [0u16; 256];
        for (i, color) in palette.colors.iter().enumerate() {
            table_8to16[i] = color.to_565();
        }

        let table16 = table.iter().map(|&c| table_8to16[c as usize]).collect();

        Colormap {
            grades,
            table,
            table16,
            table_8to16,
        }
    }

    pub fn grades(&self) -> usize {
        self.grades
    }

    #[inline]
    fn row(&self, light: i32) -> usize {
        ((light.max(0) & 0xFF00) as usize).min((self.grades - 1) << 8)
    }

    #[inline]
    pub fn lookup(&self, light: i32, texel: u8) -> u8 {
        self.table[self.row(light) + texel as usize]
    }

    #[inline]
    pub fn lookup16(&self, light: i32, texel: u8) -> u16 {
        self.table16[self.row(light) + texel as usize]
    }

    pub fn table_8to16(&self) -> &[u16; 256] {
        &self.table_8to16
    }
}

impl fmt::Debug for Colormap {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Colormap: {} grades", self.grades)
    }
}
