use std::f32::consts::PI;

use crate::error::{RenderError, Result};
use crate::graphics::MipTexture;

pub const TILE_SIZE: usize = 128;

const CYCLE: usize = 128; // Sine table entries per wave
const AMP: i32 = 8 << 16; // Wave height in 16.16 texels
const SPEED: f32 = 20.0; // Table entries the wave moves per second

// Liquid textures are 64x64
const TURB_SIZE: usize = 64;

// Warp table for liquid surfaces
pub struct TurbTable {
    sintable: Vec<i32>, // Two cycles so a shifted window never runs off the end
}

impl TurbTable {
    pub fn new() -> TurbTable {
        let sintable = (0..CYCLE * 2)
            .map(|i| AMP + ((i as f32 * PI * 2.0 / CYCLE as f32).sin() * AMP as f32) as i32)
            .collect();

        TurbTable { sintable }
    }

    fn turb(&self, time: f32) -> &[i32] {
        let start = ((time * SPEED) as i32 & (CYCLE as i32 - 1)) as usize;
        &self.sintable[start..start + CYCLE]
    }

    // Warp a 64x64 texture into a 128x128 tile of palette indexes
    pub fn gen_turb_tile(&self, texture: &MipTexture, time: f32, dest: &mut [u8]) -> Result<()> {
        self.gen(texture, time, dest, 1, |dest, texel| dest[0] = texel)
    }

    // Same, through the 8 to 16-bit color table
    pub fn gen_turb_tile16(
        &self,
        texture: &MipTexture,
        time: f32,
        table_8to16: &[u16; 256],
        dest: &mut [u8],
    ) -> Result<()> {
        self.gen(texture, time, dest, 2, |dest, texel| {
            dest[..2].copy_from_slice(&table_8to16[texel as usize].to_le_bytes())
        })
    }

    fn gen(
        &self,
        texture: &MipTexture,
        time: f32,
        dest: &mut [u8],
        pixel_bytes: usize,
        put: impl Fn(&mut [u8], u8),
    ) -> Result<()> {
        let source = texture.mip(0);
        if source.len() < TURB_SIZE * TURB_SIZE {
            return Err(RenderError::InvalidTexture {
                name: texture.name.clone(),
                reason: "liquid textures need 64x64 texels".to_string(),
            });
        }

        if dest.len() < TILE_SIZE * TILE_SIZE * pixel_bytes {
            return Err(RenderError::BadCacheSize(dest.len()));
        }

        let turb = self.turb(time);
        let mask = CYCLE - 1;

        for i in 0..TILE_SIZE {
            for j in 0..TILE_SIZE {
                let s = ((((j as i32) << 16) + turb[i & mask]) >> 16) & 63;
                let t = ((((i as i32) << 16) + turb[j & mask]) >> 16) & 63;
                let texel = source[((t as usize) << 6) + s as usize];
                put(&mut dest[(i * TILE_SIZE + j) * pixel_bytes..], texel);
            }
        }

        Ok(())
    }
}

impl Default for TurbTable {
    fn default() -> Self {
        TurbTable::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker() -> MipTexture {
        let pixels = (0..TURB_SIZE * TURB_SIZE)
            .map(|i| ((i % TURB_SIZE) + (i / TURB_SIZE)) as u8)
            .collect();
        MipTexture::from_pixels("*water", 64, 64, pixels).expect("texture")
    }

    #[test]
    fn table_swings_around_amp() {
        let table = TurbTable::new();
        assert_eq!(table.sintable.len(), 256);
        assert_eq!(table.sintable[0], AMP);
        assert!((table.sintable[32] - 2 * AMP).abs() <= 1);
        assert!(table.sintable[96].abs() <= 1);
    }

    #[test]
    fn tile_is_the_texture_shifted_by_the_wave() {
        let table = TurbTable::new();
        let texture = checker();
        let mut tile = vec![0u8; TILE_SIZE * TILE_SIZE];
        table.gen_turb_tile(&texture, 0.0, &mut tile).expect("tile");

        // At row 0 and column 0 the wave is exactly AMP, 8 texels
        assert_eq!(tile[0], texture.mip(0)[8 * 64 + 8]);
        // Tiles repeat the 64 texel texture
        let turb = table.turb(0.0);
        let s = ((64 << 16) + turb[0]) >> 16 & 63;
        let t = turb[64] >> 16 & 63;
        assert_eq!(tile[64], texture.mip(0)[(t as usize) * 64 + s as usize]);
    }

    #[test]
    fn small_textures_are_rejected() {
        let table = TurbTable::new();
        let texture = MipTexture::from_pixels("*tiny", 16, 16, vec![0; 256]).expect("texture");
        let mut tile = vec![0u8; TILE_SIZE * TILE_SIZE];
        assert!(table.gen_turb_tile(&texture, 0.0, &mut tile).is_err());
    }

    #[test]
    fn sixteen_bit_tiles_use_the_color_table() {
        let table = TurbTable::new();
        let texture = MipTexture::from_pixels("*lava", 64, 64, vec![3; 4096]).expect("texture");
        let mut colors = [0u16; 256];
        colors[3] = 0xBEEF;
        let mut tile = vec![0u8; TILE_SIZE * TILE_SIZE * 2];
        table
            .gen_turb_tile16(&texture, 1.5, &colors, &mut tile)
            .expect("tile");
        assert!(tile.chunks(2).all(|pixel| pixel == [0xEF, 0xBE]));
    }
}
