use super::{dot_product, Vec3};
use crate::graphics::TextureId;

pub const MAXLIGHTMAPS: usize = 4;

// Style id that ends a surface's style list
pub const STYLE_NONE: u8 = 255;

pub const SURF_PLANEBACK: u32 = 2;
pub const SURF_DRAWSKY: u32 = 4;
pub const SURF_DRAWTURB: u32 = 0x10;
pub const SURF_DRAWTILED: u32 = 0x20;

// Projection of world space onto a texture's s and t axes
#[derive(Debug, Clone)]
pub struct TexInfo {
    pub vecs: [[f32; 4]; 2], // s and t axes, fourth component is the offset
    pub texture: TextureId,  // Base texture, before animation
    pub flags: u32,
}

impl TexInfo {
    pub fn new(vecs: [[f32; 4]; 2], texture: TextureId) -> TexInfo {
        TexInfo {
            vecs,
            texture,
            flags: 0,
        }
    }

    // Texture-space coordinate of a point along axis 0 (s) or 1 (t)
    pub fn project(&self, point: &Vec3, axis: usize) -> f32 {
        let v = &self.vecs[axis];
        dot_product(point, &[v[0], v[1], v[2]]) + v[3]
    }
}

#[derive(Debug, Clone)]
pub struct Surface {
    pub plane: usize,                 // Index into World::planes
    pub flags: u32,                   // SURF_* bits
    pub texinfo: usize,               // Index into World::texinfos
    pub texturemins: [i32; 2],        // Smallest s and t, multiples of 16
    pub extents: [i32; 2],            // Size in texels at mip 0
    pub styles: [u8; MAXLIGHTMAPS],   // Light styles, STYLE_NONE terminated
    pub samples: Option<usize>,       // Offset of the lightmaps in World::lightdata
}

impl Surface {
    pub fn new(plane: usize, texinfo: usize, texturemins: [i32; 2], extents: [i32; 2]) -> Surface {
        Surface {
            plane,
            flags: 0,
            texinfo,
            texturemins,
            extents,
            styles: [0, STYLE_NONE, STYLE_NONE, STYLE_NONE],
            samples: None,
        }
    }

    // Lightmap dimensions: one sample every 16 texels, inclusive of both edges
    pub fn light_width(&self) -> usize {
        ((self.extents[0] >> 4) + 1) as usize
    }

    pub fn light_height(&self) -> usize {
        ((self.extents[1] >> 4) + 1) as usize
    }

    pub fn lightmap_size(&self) -> usize {
        self.light_width() * self.light_height()
    }

    // Number of styles before the terminator
    pub fn style_count(&self) -> usize {
        self.styles
            .iter()
            .take_while(|&&style| style != STYLE_NONE)
            .count()
    }

    pub fn is_tiled(&self) -> bool {
        self.flags & SURF_DRAWTILED != 0
    }
}
