use crate::graphics::Colormap;

// How a block drawer stores one lit texel
pub trait BlockPixel {
    const BYTES: usize;

    fn put(dest: &mut [u8], colormap: &Colormap, light: i32, texel: u8);
}

pub struct Pixel8;

impl BlockPixel for Pixel8 {
    const BYTES: usize = 1;

    #[inline]
    fn put(dest: &mut [u8], colormap: &Colormap, light: i32, texel: u8) {
        dest[0] = colormap.lookup(light, texel);
    }
}

pub struct Pixel16;

impl BlockPixel for Pixel16 {
    const BYTES: usize = 2;

    #[inline]
    fn put(dest: &mut [u8], colormap: &Colormap, light: i32, texel: u8) {
        dest[..2].copy_from_slice(&colormap.lookup16(light, texel).to_le_bytes());
    }
}

// One column of blocks of a surface, top to bottom
pub struct BlockColumn<'a> {
    pub source: &'a [u8],     // Texels of the mip level
    pub source_start: usize,  // Texel at the top left of the column
    pub texture_width: usize, // Texels per source row
    pub lights: &'a [i32],    // Light grid from the column's top left corner on
    pub light_width: usize,   // Light grid cells per row
    pub vblocks: usize,       // Blocks in the column
    pub row_bytes: usize,     // Destination stride
}

// Light and texture 2^SHIFT square blocks. Light is interpolated down both
// edges of a block and then across each row, right to left.
pub fn draw_block_column<P: BlockPixel, const SHIFT: u32>(
    column: &BlockColumn,
    colormap: &Colormap,
    dest: &mut [u8],
) {
    let size = 1usize << SHIFT;
    let mut source = column.source_start;
    let mut row = 0;
    let mut light_index = 0;

    for _ in 0..column.vblocks {
        let mut left = column.lights[light_index];
        let mut right = column.lights[light_index + 1];
        light_index += column.light_width;
        let left_step = (column.lights[light_index] - left) >> SHIFT;
        let right_step = (column.lights[light_index + 1] - right) >> SHIFT;

        for _ in 0..size {
            let step = (left - right) >> SHIFT;
            let mut light = right;

            for b in (0..size).rev() {
                let texel = column.source[source + b];
                P::put(&mut dest[row + b * P::BYTES..], colormap, light, texel);
                light += step;
            }

            source += column.texture_width;
            right += right_step;
            left += left_step;
            row += column.row_bytes;
        }

        // Wrap back to the top of the texture
        if source >= column.source.len() {
            source -= column.source.len();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::Palette;

    // Identity palette with a 4 grade map where row r adds r to the index
    fn colormap() -> Colormap {
        let mut table = vec![0u8; 4 * 256];
        for row in 0..4 {
            for i in 0..256 {
                table[row * 256 + i] = (i + row) as u8;
            }
        }
        Colormap::new(table, &Palette::grayscale()).expect("colormap")
    }

    #[test]
    fn flat_light_copies_texels_through_the_colormap() {
        let source: Vec<u8> = (0..4).collect();
        // 2x2 texture, one 2x2 block, light row 1 everywhere
        let lights = [0x100; 4];
        let column = BlockColumn {
            source: &source,
            source_start: 0,
            texture_width: 2,
            lights: &lights,
            light_width: 2,
            vblocks: 1,
            row_bytes: 2,
        };

        let mut dest = vec![0u8; 4];
        draw_block_column::<Pixel8, 1>(&column, &colormap(), &mut dest);
        assert_eq!(dest, vec![1, 2, 3, 4]);
    }

    #[test]
    fn light_steps_from_the_right_edge() {
        let source = vec![0u8; 4];
        // Left corners at row 2, right corners at row 0
        let lights = [0x200, 0, 0x200, 0];
        let column = BlockColumn {
            source: &source,
            source_start: 0,
            texture_width: 2,
            lights: &lights,
            light_width: 2,
            vblocks: 1,
            row_bytes: 2,
        };

        let mut dest = vec![0u8; 4];
        draw_block_column::<Pixel8, 1>(&column, &colormap(), &mut dest);
        // Right pixel at 0, left pixel one step of 0x100 further
        assert_eq!(dest, vec![1, 0, 1, 0]);
    }

    #[test]
    fn sixteen_bit_blocks_write_little_endian() {
        let source = vec![255u8; 4];
        let lights = [0; 4];
        let column = BlockColumn {
            source: &source,
            source_start: 0,
            texture_width: 2,
            lights: &lights,
            light_width: 2,
            vblocks: 1,
            row_bytes: 4,
        };

        let mut dest = vec![0u8; 8];
        draw_block_column::<Pixel16, 1>(&column, &colormap(), &mut dest);
        assert_eq!(dest, vec![0xFF; 8]);
    }
}
