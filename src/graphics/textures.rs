use std::fmt;

use crate::error::{RenderError, Result};

pub const MIPLEVELS: usize = 4;

// Tenths of a second each frame of a linked animation is shown
pub const ANIM_CYCLE: i32 = 2;

// Longest chain walk before the animation is considered cyclic garbage
const MAX_ANIMATION_STEPS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub usize);

// A texture with its four mip levels. Animated textures form a circular list
// through anim_next, each frame owning the [anim_min, anim_max) window of an
// anim_total tenths long cycle.
#[derive(Clone)]
pub struct MipTexture {
    pub name: String,
    pub width: usize,                     // Width at mip 0, a multiple of 16
    pub height: usize,                    // Height at mip 0, a multiple of 16
    pub anim_total: i32,                  // Total tenths in the sequence, 0 = not animated
    pub anim_min: i32,                    // First tenth this frame is shown
    pub anim_max: i32,                    // First tenth this frame is no longer shown
    pub anim_next: Option<TextureId>,     // Next frame in the sequence
    pub alternate_anims: Option<TextureId>, // Sequence used by brush entities in frame 1
    mips: [Vec<u8>; MIPLEVELS],           // Palette indexes per mip level
}

impl MipTexture {
    pub fn new(name: &str, width: usize, height: usize, mips: [Vec<u8>; MIPLEVELS]) -> Result<MipTexture> {
        let invalid = |reason: String| RenderError::InvalidTexture {
            name: name.to_string(),
            reason,
        };

        if width == 0 || height == 0 || width % 16 != 0 || height % 16 != 0 {
            return Err(invalid(format!(
                "size {}x{} is not a multiple of 16",
                width, height
            )));
        }

        for (level, mip) in mips.iter().enumerate() {
            let expected = (width >> level) * (height >> level);
            if mip.len() != expected {
                return Err(invalid(format!(
                    "mip {} has {} texels, expected {}",
                    level,
                    mip.len(),
                    expected
                )));
            }
        }

        Ok(MipTexture {
            name: name.to_string(),
            width,
            height,
            anim_total: 0,
            anim_min: 0,
            anim_max: 0,
            anim_next: None,
            alternate_anims: None,
            mips,
        })
    }

    // Build the smaller mips by point sampling the full size texels
    pub fn from_pixels(name: &str, width: usize, height: usize, pixels: Vec<u8>) -> Result<MipTexture> {
        if pixels.len() != width * height {
            return Err(RenderError::InvalidTexture {
                name: name.to_string(),
                reason: format!("{} texels for a {}x{} texture", pixels.len(), width, height),
            });
        }

        let sample = |level: usize| -> Vec<u8> {
            let step = 1 << level;
            let mut mip = Vec::with_capacity((width >> level) * (height >> level));
            for y in (0..height).step_by(step) {
                for x in (0..width).step_by(step) {
                    mip.push(pixels[y * width + x]);
                }
            }
            mip
        };

        let mips = [sample(0), sample(1), sample(2), sample(3)];
        MipTexture::new(name, width, height, mips)
    }

    pub fn mip(&self, level: usize) -> &[u8] {
        &self.mips[level.min(MIPLEVELS - 1)]
    }

    pub fn mip_width(&self, level: usize) -> usize {
        self.width >> level
    }

    pub fn mip_height(&self, level: usize) -> usize {
        self.height >> level
    }
}

impl fmt::Debug for MipTexture {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "MipTexture: {} {}x{} anim {}..{}/{}",
            self.name, self.width, self.height, self.anim_min, self.anim_max, self.anim_total
        )
    }
}

// All textures of the level, addressed by TextureId
#[derive(Debug, Default)]
pub struct Textures {
    textures: Vec<MipTexture>,
}

impl Textures {
    pub fn new() -> Textures {
        Textures {
            textures: Vec::new(),
        }
    }

    pub fn add(&mut self, texture: MipTexture) -> TextureId {
        self.textures.push(texture);
        TextureId(self.textures.len() - 1)
    }

    pub fn get(&self, id: TextureId) -> &MipTexture {
        &self.textures[id.0]
    }

    pub fn get_mut(&mut self, id: TextureId) -> &mut MipTexture {
        &mut self.textures[id.0]
    }

    pub fn find(&self, name: &str) -> Option<TextureId> {
        self.textures
            .iter()
            .position(|texture| texture.name.eq_ignore_ascii_case(name))
            .map(TextureId)
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    // Chain frames into a loop, each shown for ANIM_CYCLE tenths
    pub fn link_animation(&mut self, frames: &[TextureId]) {
        let total = frames.len() as i32 * ANIM_CYCLE;

        for (i, &id) in frames.iter().enumerate() {
            let texture = &mut self.textures[id.0];
            texture.anim_total = total;
            texture.anim_min = i as i32 * ANIM_CYCLE;
            texture.anim_max = (i as i32 + 1) * ANIM_CYCLE;
            texture.anim_next = Some(frames[(i + 1) % frames.len()]);
        }
    }

    // Point every frame of a sequence at the alternate sequence
    pub fn set_alternate(&mut self, frames: &[TextureId], alternate: TextureId) {
        for &id in frames {
            self.textures[id.0].alternate_anims = Some(alternate);
        }
    }

    // The texture to draw for a base texture at a given time
    pub fn animate(&self, base: TextureId, entity_frame: i32, time: f32) -> Result<TextureId> {
        self.animate_tenths(base, entity_frame, (time * 10.0) as i32)
    }

    pub fn animate_tenths(&self, base: TextureId, entity_frame: i32, tenths: i32) -> Result<TextureId> {
        let mut id = base;
        let mut texture = self.get(id);

        if entity_frame != 0 {
            if let Some(alternate) = texture.alternate_anims {
                id = alternate;
                texture = self.get(id);
            }
        }

        if texture.anim_total == 0 {
            return Ok(id);
        }

        let relative = tenths.rem_euclid(texture.anim_total);

        let mut count = 0;
        while texture.anim_min > relative || texture.anim_max <= relative {
            id = texture
                .anim_next
                .ok_or_else(|| RenderError::BrokenAnimationCycle(texture.name.clone()))?;
            texture = self.get(id);

            count += 1;
            if count > MAX_ANIMATION_STEPS {
                return Err(RenderError::InfiniteAnimationCycle(texture.name.clone()));
            }
        }

        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(name: &str, value: u8) -> MipTexture {
        MipTexture::from_pixels(name, 16, 16, vec![value; 256]).expect("valid texture")
    }

    // Three frames with uneven windows [0,3), [3,7), [7,10)
    fn uneven_chain() -> (Textures, [TextureId; 3]) {
        let mut textures = Textures::new();
        let ids = [
            textures.add(solid("+0slime", 1)),
            textures.add(solid("+1slime", 2)),
            textures.add(solid("+2slime", 3)),
        ];
        let windows = [(0, 3), (3, 7), (7, 10)];
        for (i, &(min, max)) in windows.iter().enumerate() {
            let texture = textures.get_mut(ids[i]);
            texture.anim_total = 10;
            texture.anim_min = min;
            texture.anim_max = max;
            texture.anim_next = Some(ids[(i + 1) % 3]);
        }
        (textures, ids)
    }

    #[test]
    fn resolves_frame_by_window() {
        let (textures, ids) = uneven_chain();
        // 34 % 10 = 4 falls in [3, 7)
        let id = textures.animate_tenths(ids[0], 0, 34).expect("chain resolves");
        assert_eq!(id, ids[1]);
        let id = textures.animate_tenths(ids[2], 0, 9).expect("chain resolves");
        assert_eq!(id, ids[2]);
        let id = textures.animate(ids[1], 0, 3.4).expect("chain resolves");
        assert_eq!(id, ids[1]);
    }

    #[test]
    fn unanimated_texture_is_returned_as_is() {
        let mut textures = Textures::new();
        let id = textures.add(solid("wall", 5));
        assert_eq!(textures.animate_tenths(id, 0, 1234).expect("static"), id);
    }

    #[test]
    fn entity_frame_selects_alternate_chain() {
        let mut textures = Textures::new();
        let off = [textures.add(solid("+0button", 1)), textures.add(solid("+1button", 2))];
        let on = textures.add(solid("+abutton", 3));
        textures.link_animation(&off);
        textures.set_alternate(&off, on);

        assert_eq!(textures.animate_tenths(off[0], 0, 2).expect("chain"), off[1]);
        assert_eq!(textures.animate_tenths(off[0], 1, 2).expect("alternate"), on);
    }

    #[test]
    fn linked_animation_uses_two_tenth_windows() {
        let mut textures = Textures::new();
        let frames = [
            textures.add(solid("+0a", 1)),
            textures.add(solid("+1a", 2)),
            textures.add(solid("+2a", 3)),
        ];
        textures.link_animation(&frames);

        assert_eq!(textures.get(frames[2]).anim_total, 6);
        assert_eq!(textures.animate_tenths(frames[0], 0, 5).expect("chain"), frames[2]);
        assert_eq!(textures.animate_tenths(frames[0], 0, 6).expect("chain"), frames[0]);
    }

    #[test]
    fn missing_link_is_a_broken_cycle() {
        let (mut textures, ids) = uneven_chain();
        textures.get_mut(ids[1]).anim_next = None;
        let result = textures.animate_tenths(ids[0], 0, 8);
        assert!(matches!(result, Err(RenderError::BrokenAnimationCycle(_))));
    }

    #[test]
    fn window_gap_is_an_infinite_cycle() {
        let (mut textures, ids) = uneven_chain();
        // Nobody owns tenth 5 any more
        textures.get_mut(ids[1]).anim_max = 5;
        let result = textures.animate_tenths(ids[0], 0, 5);
        assert!(matches!(result, Err(RenderError::InfiniteAnimationCycle(_))));
    }

    #[test]
    fn rejects_sizes_that_are_not_block_aligned() {
        assert!(MipTexture::from_pixels("odd", 20, 16, vec![0; 320]).is_err());
        assert!(MipTexture::from_pixels("short", 16, 16, vec![0; 10]).is_err());
    }

    #[test]
    fn mips_are_point_sampled() {
        let pixels: Vec<u8> = (0..=255).collect();
        let texture = MipTexture::from_pixels("ramp", 16, 16, pixels).expect("valid");
        assert_eq!(texture.mip(1).len(), 64);
        assert_eq!(texture.mip(1)[1], 2);
        assert_eq!(texture.mip(1)[8], 32);
        assert_eq!(texture.mip(3), &[0, 8, 128, 136]);
        assert_eq!(texture.mip_width(2), 4);
    }
}
