use super::blocks::{draw_block_column, BlockColumn, BlockPixel, Pixel16, Pixel8};
use super::pixels::PixelDepth;
use crate::graphics::{Colormap, MipTexture};
use crate::light::LightGrid;
use crate::world::{Surface, MAXLIGHTMAPS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MipLevel {
    Mip0, // 16x16 texel blocks
    Mip1, // 8x8
    Mip2, // 4x4
    Mip3, // 2x2
}

impl MipLevel {
    pub const ALL: [MipLevel; 4] = [MipLevel::Mip0, MipLevel::Mip1, MipLevel::Mip2, MipLevel::Mip3];

    pub fn from_level(level: usize) -> MipLevel {
        match level {
            0 => MipLevel::Mip0,
            1 => MipLevel::Mip1,
            2 => MipLevel::Mip2,
            _ => MipLevel::Mip3,
        }
    }

    pub fn level(self) -> usize {
        self as usize
    }

    pub fn block_shift(self) -> u32 {
        log2(self.block_size() as i32) as u32
    }

    pub fn block_size(self) -> usize {
        16 >> self.level()
    }

    pub fn scale(self) -> f32 {
        1.0 / (1 << self.level()) as f32
    }
}

// Wrap mask for a power of two size up to 128, 255 for anything else
pub fn mask_for_num(num: i32) -> i32 {
    match num {
        128 => 127,
        64 => 63,
        32 => 31,
        16 => 15,
        _ => 255,
    }
}

// Position of the highest set bit, 0 for anything below 2
pub fn log2(num: i32) -> i32 {
    let mut log = 0;
    let mut num = num;

    while num > 1 {
        num >>= 1;
        log += 1;
    }

    log
}

// Tile a texel coordinate into a texture dimension, masking when the size allows
fn wrap_texel(coord: i32, size: i32) -> usize {
    let mask = mask_for_num(size);
    if mask + 1 == size {
        (coord & mask) as usize
    } else {
        coord.rem_euclid(size) as usize
    }
}

// What one cache fill draws
pub struct DrawSurface<'a> {
    pub surface: &'a Surface,
    pub texture: &'a MipTexture, // Frame picked by the animation
    pub mip: MipLevel,
    pub width: usize,     // Texels across at this mip
    pub height: usize,    // Texels down at this mip
    pub row_bytes: usize, // Destination stride
    pub light_adjust: [i32; MAXLIGHTMAPS],
}

impl<'a> DrawSurface<'a> {
    pub fn new(
        surface: &'a Surface,
        texture: &'a MipTexture,
        mip: MipLevel,
        depth: PixelDepth,
        light_adjust: [i32; MAXLIGHTMAPS],
    ) -> DrawSurface<'a> {
        let width = (surface.extents[0] >> mip.level()).max(0) as usize;
        let height = (surface.extents[1] >> mip.level()).max(0) as usize;

        DrawSurface {
            surface,
            texture,
            mip,
            width,
            height,
            row_bytes: width * depth.bytes(),
            light_adjust,
        }
    }
}

// Texture and light the surface into dest, one column of blocks at a time
pub fn draw_surface(
    draw: &DrawSurface,
    grid: &LightGrid,
    colormap: &Colormap,
    depth: PixelDepth,
    dest: &mut [u8],
) {
    match (depth, draw.mip) {
        (PixelDepth::Eight, MipLevel::Mip0) => draw_columns::<Pixel8, 4>(draw, grid, colormap, dest),
        (PixelDepth::Eight, MipLevel::Mip1) => draw_columns::<Pixel8, 3>(draw, grid, colormap, dest),
        (PixelDepth::Eight, MipLevel::Mip2) => draw_columns::<Pixel8, 2>(draw, grid, colormap, dest),
        (PixelDepth::Eight, MipLevel::Mip3) => draw_columns::<Pixel8, 1>(draw, grid, colormap, dest),
        (PixelDepth::Sixteen, MipLevel::Mip0) => draw_columns::<Pixel16, 4>(draw, grid, colormap, dest),
        (PixelDepth::Sixteen, MipLevel::Mip1) => draw_columns::<Pixel16, 3>(draw, grid, colormap, dest),
        (PixelDepth::Sixteen, MipLevel::Mip2) => draw_columns::<Pixel16, 2>(draw, grid, colormap, dest),
        (PixelDepth::Sixteen, MipLevel::Mip3) => draw_columns::<Pixel16, 1>(draw, grid, colormap, dest),
    }
}

fn draw_columns<P: BlockPixel, const SHIFT: u32>(
    draw: &DrawSurface,
    grid: &LightGrid,
    colormap: &Colormap,
    dest: &mut [u8],
) {
    let mip = draw.mip.level();
    let block_size = 1usize << SHIFT;
    let source = draw.texture.mip(mip);
    let texture_width = draw.texture.mip_width(mip) as i32;
    let texture_height = draw.texture.mip_height(mip) as i32;

    let hblocks = draw.width >> SHIFT;
    let vblocks = draw.height >> SHIFT;

    // Texture coordinates of the surface's top left corner, tiled into the texture
    let mut soffset = wrap_texel(draw.surface.texturemins[0] >> mip, texture_width);
    let base_t = wrap_texel(draw.surface.texturemins[1] >> mip, texture_height) * texture_width as usize;

    for u in 0..hblocks {
        let column = BlockColumn {
            source,
            source_start: base_t + soffset,
            texture_width: texture_width as usize,
            lights: &grid.cells()[u..],
            light_width: grid.width,
            vblocks,
            row_bytes: draw.row_bytes,
        };

        draw_block_column::<P, SHIFT>(&column, colormap, &mut dest[u * block_size * P::BYTES..]);

        soffset += block_size;
        if soffset >= texture_width as usize {
            soffset = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::Palette;
    use crate::light::{build_light_map, LightSettings};
    use crate::world::{Plane, TexInfo, World};
    use crate::graphics::TextureId;

    #[test]
    fn masks_and_logs() {
        assert_eq!(mask_for_num(128), 127);
        assert_eq!(mask_for_num(16), 15);
        assert_eq!(mask_for_num(100), 255);
        assert_eq!(mask_for_num(256), 255);

        assert_eq!(log2(1), 0);
        assert_eq!(log2(16), 4);
        assert_eq!(log2(17), 4);
        assert_eq!(MipLevel::Mip3.block_shift(), 1);
    }

    #[test]
    fn texel_wrap_matches_tiling() {
        for size in [8, 16, 24, 64, 128, 256] {
            for coord in [-300, -17, -1, 0, 5, 16, 127, 128, 1000] {
                assert_eq!(wrap_texel(coord, size), coord.rem_euclid(size) as usize);
            }
        }
    }

    fn world(extents: [i32; 2], texturemins: [i32; 2]) -> World {
        let texinfo = TexInfo::new([[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0]], TextureId(0));
        World::new(
            vec![Plane::new([0.0, 0.0, 1.0], 0.0)],
            vec![],
            vec![Surface::new(0, 0, texturemins, extents)],
            vec![texinfo],
            None,
        )
    }

    // Texel value is its column in a 16x16 texture
    fn columns() -> MipTexture {
        let pixels = (0..256).map(|i| (i % 16) as u8).collect();
        MipTexture::from_pixels("columns", 16, 16, pixels).expect("texture")
    }

    fn draw(world: &World, texture: &MipTexture, mip: MipLevel, depth: PixelDepth) -> Vec<u8> {
        let surface = &world.surfaces[0];
        let grid = build_light_map(world, 0, &[256; 4], &[], 0, &LightSettings::default()).expect("grid");
        let colormap = Colormap::from_palette(&Palette::grayscale(), 6);
        let draw = DrawSurface::new(surface, texture, mip, depth, [256; 4]);
        let mut dest = vec![0u8; draw.row_bytes * draw.height];
        draw_surface(&draw, &grid, &colormap, depth, &mut dest);
        dest
    }

    #[test]
    fn unlit_surface_tiles_the_texture() {
        // Unlit levels are drawn at row 0 which doubles the grayscale
        let world = world([32, 16], [0, 0]);
        let texture = columns();
        let dest = draw(&world, &texture, MipLevel::Mip0, PixelDepth::Eight);

        assert_eq!(dest.len(), 32 * 16);
        assert_eq!(dest[3], 6);
        assert_eq!(dest[16 + 3], 6);
        assert_eq!(dest[5 * 32 + 15], 30);
    }

    #[test]
    fn texture_offset_wraps_into_the_texture() {
        let world = world([16, 16], [-16, 32]);
        let texture = columns();
        let dest = draw(&world, &texture, MipLevel::Mip0, PixelDepth::Eight);
        assert_eq!(dest[7], 14);
    }

    #[test]
    fn mip_levels_shrink_the_surface() {
        let world = world([32, 32], [0, 0]);
        let texture = columns();
        let dest = draw(&world, &texture, MipLevel::Mip2, PixelDepth::Eight);

        assert_eq!(dest.len(), 8 * 8);
        // Mip 2 keeps every fourth column: 0, 4, 8, 12
        assert_eq!(&dest[..4], &[0, 8, 16, 24]);
        assert_eq!(&dest[4..8], &[0, 8, 16, 24]);
    }

    #[test]
    fn sixteen_bit_surface_has_double_stride() {
        let world = world([16, 16], [0, 0]);
        let texture = columns();
        let dest = draw(&world, &texture, MipLevel::Mip1, PixelDepth::Sixteen);

        assert_eq!(dest.len(), 8 * 8 * 2);
        let colormap = Colormap::from_palette(&Palette::grayscale(), 6);
        assert_eq!(
            u16::from_le_bytes([dest[2], dest[3]]),
            colormap.lookup16(0, 2)
        );
    }

    #[test]
    fn block_sizes_follow_the_mip() {
        assert_eq!(MipLevel::Mip0.block_size(), 16);
        assert_eq!(MipLevel::Mip3.block_size(), 2);
        assert_eq!(MipLevel::Mip2.block_shift(), 2);
        assert_eq!(MipLevel::from_level(9), MipLevel::Mip3);
        assert_eq!(MipLevel::Mip1.scale(), 0.5);
    }
}
