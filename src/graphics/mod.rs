mod palette;
mod textures;

pub use palette::{Colormap, Palette, Rgb};
pub use textures::{MipTexture, TextureId, Textures, ANIM_CYCLE, MIPLEVELS};
