use tracing::debug;

use crate::error::{RenderError, Result};
use crate::graphics::MipTexture;
use crate::renderer::{PixelDepth, Pixels};
use crate::world::{normalize, Vec3};

pub const SKY_SIZE: usize = 128;
const SKY_MASK: i32 = SKY_SIZE as i32 - 1;

// Bottom layer rows carry three spare texels
const BOTTOM_WIDTH: usize = 131;

const SKY_SPAN_SHIFT: i32 = 5;
const SKY_SPAN_MAX: i32 = 1 << SKY_SPAN_SHIFT;

const SKY_TMASK: i32 = 0x7F0000;
const SKY_SMASK: i32 = 0x7F0000;

// A horizontal run of sky pixels on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub u: i32,     // First column
    pub v: i32,     // Row
    pub count: i32, // Pixels in the run
}

// The camera as far as the sky cares
#[derive(Debug, Clone)]
pub struct SkyView {
    pub forward: Vec3,      // View direction
    pub right: Vec3,        // Screen right in world space
    pub up: Vec3,           // Screen up in world space
    pub vrect_width: i32,   // Size of the 3D view
    pub vrect_height: i32,
    pub screen_width: i32,  // Size of the whole screen
    pub screen_height: i32,
}

impl SkyView {
    // Looking down +x with z up
    pub fn new(screen_width: i32, screen_height: i32) -> SkyView {
        SkyView {
            forward: [1.0, 0.0, 0.0],
            right: [0.0, -1.0, 0.0],
            up: [0.0, 0.0, 1.0],
            vrect_width: screen_width,
            vrect_height: screen_height,
            screen_width,
            screen_height,
        }
    }
}

// Largest scroll, in texels, whose 16.16 texture coordinates still fit an i32
const MAX_SKY_SCROLL: i64 = (i32::MAX as i64 >> 16) - 6 * (SKY_SIZE as i64 / 2 - 1);

// Texels the clouds scroll before the sky time wraps, None if the speeds are
// not positive or scroll further than the texture coordinates can reach
pub fn sky_scroll_span(speed: i32, speed2: i32) -> Option<i64> {
    if speed <= 0 || speed2 <= 0 {
        return None;
    }

    let g = greatest_common_divisor(speed, speed2);
    let scroll = [speed / g, speed2 / g, speed]
        .iter()
        .try_fold(SKY_SIZE as i64, |acc, &n| acc.checked_mul(n as i64))?;

    (scroll <= MAX_SKY_SCROLL).then_some(scroll)
}

fn greatest_common_divisor(a: i32, b: i32) -> i32 {
    if b == 0 {
        a
    } else {
        greatest_common_divisor(b, a % b)
    }
}

// A two layer sky. The right half of the source texture is the distant
// layer, the left half the scrolling clouds whose zero texels are holes.
pub struct Sky {
    bottom: Vec<u8>,         // Cloud layer, 128 rows of BOTTOM_WIDTH
    bottom_mask: Vec<u8>,    // 0xff where the cloud layer is transparent
    new_sky: Vec<u8>,        // 128 rows of 256: composite on the left, distant layer on the right
    speed: i32,              // Scroll speed of the clouds
    speed2: i32,             // Scroll speed of the second layer, only used for the time wrap
    sky_time: f32,           // Time since the last wrap
    last_shift: Option<i32>, // Scroll offset new_sky was composed for
    composes: usize,         // Times new_sky was recomputed
}

impl Sky {
    pub fn new(texture: &MipTexture, speed: i32, speed2: i32) -> Result<Sky> {
        if texture.width != 2 * SKY_SIZE || texture.height != SKY_SIZE {
            return Err(RenderError::InvalidSkyTexture(format!(
                "{} is {}x{}, not 256x128",
                texture.name, texture.width, texture.height
            )));
        }

        if sky_scroll_span(speed, speed2).is_none() {
            return Err(RenderError::InvalidSkyTexture(format!(
                "{} scroll speeds {} and {} are out of range",
                texture.name, speed, speed2
            )));
        }

        let src = texture.mip(0);
        let mut new_sky = vec![0u8; SKY_SIZE * 2 * SKY_SIZE];
        let mut bottom = vec![0u8; SKY_SIZE * BOTTOM_WIDTH];
        let mut bottom_mask = vec![0u8; SKY_SIZE * BOTTOM_WIDTH];

        for i in 0..SKY_SIZE {
            let row = &src[i * 256..(i + 1) * 256];
            new_sky[i * 256 + 128..(i + 1) * 256].copy_from_slice(&row[128..]);

            for j in 0..BOTTOM_WIDTH {
                let texel = row[j & 0x7F];
                if texel != 0 {
                    bottom[i * BOTTOM_WIDTH + j] = texel;
                } else {
                    bottom_mask[i * BOTTOM_WIDTH + j] = 0xff;
                }
            }
        }

        debug!("sky {} loaded", texture.name);

        Ok(Sky {
            bottom,
            bottom_mask,
            new_sky,
            speed,
            speed2,
            sky_time: 0.0,
            last_shift: None,
            composes: 0,
        })
    }

    // Keep the sky time small by wrapping it when both layers line up again
    pub fn set_sky_frame(&mut self, time: f32) {
        let g = greatest_common_divisor(self.speed, self.speed2);
        let s1 = self.speed / g;
        let s2 = self.speed2 / g;
        let period = (SKY_SIZE as i32 * s1 * s2) as f32;

        self.sky_time = time - ((time / period) as i32) as f32 * period;
    }

    pub fn sky_time(&self) -> f32 {
        self.sky_time
    }

    fn shift(&self) -> i32 {
        (self.sky_time * self.speed as f32) as i32
    }

    // Recompose new_sky if the clouds moved a whole texel, returns whether it did
    pub fn compose(&mut self) -> bool {
        let shift = self.shift();
        if self.last_shift == Some(shift) {
            return false;
        }
        self.last_shift = Some(shift);

        for y in 0..SKY_SIZE {
            let base = ((y as i32 + shift) & SKY_MASK) as usize * BOTTOM_WIDTH;
            for x in 0..SKY_SIZE {
                let ofs = base + ((x as i32 + shift) & SKY_MASK) as usize;
                let row = y * 256;
                self.new_sky[row + x] =
                    (self.new_sky[row + x + 128] & self.bottom_mask[ofs]) | self.bottom[ofs];
            }
        }

        self.composes += 1;
        true
    }

    pub fn compose_frame(&mut self, time: f32) -> bool {
        self.set_sky_frame(time);
        self.compose()
    }

    // Times compose did any work
    pub fn compose_count(&self) -> usize {
        self.composes
    }

    // The composite the span drawer samples, 256 texels per row
    pub fn new_sky(&self) -> &[u8] {
        &self.new_sky
    }

    fn tile(&self, mut put: impl FnMut(usize, u8)) {
        let shift = self.shift();

        for y in 0..SKY_SIZE {
            let base = ((y as i32 + shift) & SKY_MASK) as usize * BOTTOM_WIDTH;
            for x in 0..SKY_SIZE {
                let ofs = base + ((x as i32 + shift) & SKY_MASK) as usize;
                let texel = (self.new_sky[y * 256 + x + 128] & self.bottom_mask[ofs]) | self.bottom[ofs];
                put(y * SKY_SIZE + x, texel);
            }
        }
    }

    // The current composite as a 128x128 tile of palette indexes
    pub fn gen_tile(&self, dest: &mut [u8]) -> Result<()> {
        if dest.len() < SKY_SIZE * SKY_SIZE {
            return Err(RenderError::BadCacheSize(dest.len()));
        }

        self.tile(|i, texel| dest[i] = texel);
        Ok(())
    }

    pub fn gen_tile16(&self, table_8to16: &[u16; 256], dest: &mut [u8]) -> Result<()> {
        if dest.len() < SKY_SIZE * SKY_SIZE * 2 {
            return Err(RenderError::BadCacheSize(dest.len()));
        }

        self.tile(|i, texel| {
            dest[2 * i..2 * i + 2].copy_from_slice(&table_8to16[texel as usize].to_le_bytes())
        });
        Ok(())
    }

    // Sky texture coordinates in 16.16 for a screen position
    fn uv_to_st(&self, view: &SkyView, u: i32, v: i32) -> (i32, i32) {
        let temp = view.vrect_width.max(view.vrect_height) as f32;

        let wu = 8192.0 * (u - (view.screen_width >> 1)) as f32 / temp;
        let wv = 8192.0 * ((view.screen_height >> 1) - v) as f32 / temp;

        let mut end = [0.0; 3];
        for i in 0..3 {
            end[i] = 4096.0 * view.forward[i] + wu * view.right[i] + wv * view.up[i];
        }
        end[2] *= 3.0;
        normalize(&mut end);

        let temp = self.sky_time * self.speed as f32;
        let reach = (6 * (SKY_SIZE as i32 / 2 - 1)) as f32;
        let s = ((temp + reach * end[0]) * 65536.0) as i32;
        let t = ((temp + reach * end[1]) * 65536.0) as i32;

        (s, t)
    }

    // Fill screen spans with the sky, stepping the texture coordinates
    // linearly over runs of up to 32 pixels
    pub fn draw_scans(&self, view: &SkyView, spans: &[Span], pixels: &mut Pixels, table_8to16: &[u16; 256]) {
        for span in spans {
            let mut count = span.count;
            let mut u = span.u;
            let v = span.v;
            let mut x = span.u;

            let (mut s, mut t) = self.uv_to_st(view, u, v);
            let (mut sstep, mut tstep) = (0, 0);

            while count > 0 {
                let mut spancount = count.min(SKY_SPAN_MAX);
                count -= spancount;

                let (mut snext, mut tnext) = (s, t);
                if count > 0 {
                    // Far end of the run, steps by shifting
                    u += spancount;
                    (snext, tnext) = self.uv_to_st(view, u, v);
                    sstep = (snext - s) >> SKY_SPAN_SHIFT;
                    tstep = (tnext - t) >> SKY_SPAN_SHIFT;
                } else {
                    // Last pixel of the span, steps by division
                    let spancount_minus1 = spancount - 1;
                    if spancount_minus1 > 0 {
                        u += spancount_minus1;
                        (snext, tnext) = self.uv_to_st(view, u, v);
                        sstep = (snext - s) / spancount_minus1;
                        tstep = (tnext - t) / spancount_minus1;
                    }
                }

                while spancount > 0 {
                    let index = (((t & SKY_TMASK) >> 8) + ((s & SKY_SMASK) >> 16)) as usize;
                    let texel = self.new_sky[index];

                    if x >= 0 && v >= 0 {
                        match pixels.depth {
                            PixelDepth::Eight => pixels.set(x as usize, v as usize, texel),
                            PixelDepth::Sixteen => {
                                pixels.set16(x as usize, v as usize, table_8to16[texel as usize])
                            }
                        }
                    }

                    s = s.wrapping_add(sstep);
                    t = t.wrapping_add(tstep);
                    x += 1;
                    spancount -= 1;
                }

                s = snext;
                t = tnext;
            }
        }
    }
}
