use serde::{Deserialize, Serialize};

use crate::graphics::Palette;

// Display pixel format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PixelDepth {
    #[default]
    Eight, // Palette indexes
    Sixteen, // RGB565, little endian
}

impl PixelDepth {
    pub fn bytes(self) -> usize {
        match self {
            PixelDepth::Eight => 1,
            PixelDepth::Sixteen => 2,
        }
    }
}

// The view buffer the sky and the span walker draw into
pub struct Pixels {
    pub width: usize,
    pub height: usize,
    pub depth: PixelDepth,
    pub pixels: Vec<u8>, // height rows of width * depth bytes
}

impl Pixels {
    pub fn new(width: usize, height: usize, depth: PixelDepth) -> Pixels {
        Pixels {
            width,
            height,
            depth,
            pixels: vec![0; width * height * depth.bytes()],
        }
    }

    pub fn row_bytes(&self) -> usize {
        self.width * self.depth.bytes()
    }

    pub fn clear(&mut self) {
        self.pixels.iter_mut().for_each(|x| *x = 0);
    }

    // Set a single 8-bit pixel
    pub fn set(&mut self, x: usize, y: usize, color: u8) {
        if x >= self.width || y >= self.height {
            return;
        }

        self.pixels[y * self.width + x] = color;
    }

    // Set a single 16-bit pixel
    pub fn set16(&mut self, x: usize, y: usize, color: u16) {
        if x >= self.width || y >= self.height {
            return;
        }

        let offset = 2 * (y * self.width + x);
        self.pixels[offset..offset + 2].copy_from_slice(&color.to_le_bytes());
    }

    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.pixels[y * self.row_bytes() + x * self.depth.bytes()]
    }

    pub fn get16(&self, x: usize, y: usize) -> u16 {
        let offset = y * self.row_bytes() + 2 * x;
        u16::from_le_bytes([self.pixels[offset], self.pixels[offset + 1]])
    }

    // Expand to 24-bit RGB, for presenting the frame in a window
    pub fn to_rgb24(&self, palette: &Palette) -> Vec<u8> {
        let mut rgb = Vec::with_capacity(self.width * self.height * 3);

        for y in 0..self.height {
            for x in 0..self.width {
                match self.depth {
                    PixelDepth::Eight => {
                        let color = palette.colors[self.get(x, y) as usize];
                        rgb.extend([color.r, color.g, color.b]);
                    }
                    PixelDepth::Sixteen => {
                        let color = self.get16(x, y);
                        rgb.push(((color >> 11) << 3) as u8);
                        rgb.push((((color >> 5) & 0x3f) << 2) as u8);
                        rgb.push(((color & 0x1f) << 3) as u8);
                    }
                }
            }
        }

        rgb
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_writes_are_dropped() {
        let mut pixels = Pixels::new(4, 2, PixelDepth::Eight);
        pixels.set(4, 0, 9);
        pixels.set(0, 2, 9);
        pixels.set(3, 1, 7);
        assert_eq!(pixels.pixels, vec![0, 0, 0, 0, 0, 0, 0, 7]);
    }

    #[test]
    fn sixteen_bit_pixels_expand_to_rgb() {
        let mut pixels = Pixels::new(2, 1, PixelDepth::Sixteen);
        pixels.set16(1, 0, 0xF800);
        assert_eq!(pixels.get16(1, 0), 0xF800);
        assert_eq!(pixels.row_bytes(), 4);
        assert_eq!(pixels.to_rgb24(&Palette::grayscale()), vec![0, 0, 0, 248, 0, 0]);
    }
}
