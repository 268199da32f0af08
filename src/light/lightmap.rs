use super::dlights::{DynamicLight, MAX_DLIGHTS};
use crate::error::{RenderError, Result};
use crate::world::{dot_product, Surface, World, MAXLIGHTMAPS};

// Largest lightmap a surface may have in either direction
pub const MAX_LIGHT_GRID: usize = 18;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSettings {
    pub ambient_light: i32, // Light added everywhere, 0..=255
    pub fullbright: bool,   // Ignore lightmaps altogether
    pub color_bits: u32,    // log2 of the colormap light grades
}

impl Default for LightSettings {
    fn default() -> Self {
        LightSettings {
            ambient_light: 0,
            fullbright: false,
            color_bits: 6,
        }
    }
}

// One light value per 16x16 texel block corner of a surface. While being
// built the cells hold 8.8 brightness, once finished they hold colormap
// offsets where smaller means brighter.
#[derive(Clone)]
pub struct LightGrid {
    pub width: usize,
    pub height: usize,
    cells: [i32; MAX_LIGHT_GRID * MAX_LIGHT_GRID],
}

impl LightGrid {
    fn new(width: usize, height: usize, value: i32) -> LightGrid {
        let mut cells = [0; MAX_LIGHT_GRID * MAX_LIGHT_GRID];
        cells[..width * height].fill(value);

        LightGrid {
            width,
            height,
            cells,
        }
    }

    pub fn cells(&self) -> &[i32] {
        &self.cells[..self.width * self.height]
    }

    pub fn get(&self, s: usize, t: usize) -> i32 {
        self.cells[t * self.width + s]
    }

    fn cells_mut(&mut self) -> &mut [i32] {
        &mut self.cells[..self.width * self.height]
    }
}

impl std::fmt::Debug for LightGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "LightGrid: {}x{} {:?}", self.width, self.height, self.cells())
    }
}

// Combine the static lightmaps of a surface and the dynamic lights touching
// it into the finished light grid
pub fn build_light_map(
    world: &World,
    surface_index: usize,
    light_adjust: &[i32; MAXLIGHTMAPS],
    dlights: &[DynamicLight],
    dlight_bits: u32,
    settings: &LightSettings,
) -> Result<LightGrid> {
    let surface = world
        .surfaces
        .get(surface_index)
        .ok_or(RenderError::UnknownSurface(surface_index))?;

    let width = surface.light_width();
    let height = surface.light_height();
    if width > MAX_LIGHT_GRID || height > MAX_LIGHT_GRID || surface.extents[0] < 0 || surface.extents[1] < 0 {
        return Err(RenderError::BadSurfaceExtents {
            surface: surface_index,
            extents: surface.extents,
        });
    }

    if settings.fullbright || !world.has_lightdata() {
        return Ok(LightGrid::new(width, height, 0));
    }

    let mut grid = LightGrid::new(width, height, settings.ambient_light << 8);

    if let Some(samples) = world.samples(surface) {
        let size = width * height;
        for (layer, lightmap) in samples.chunks_exact(size).enumerate() {
            let scale = light_adjust[layer];
            for (cell, &sample) in grid.cells_mut().iter_mut().zip(lightmap) {
                *cell += sample as i32 * scale;
            }
        }
    }

    if dlight_bits != 0 {
        add_dynamic_lights(&mut grid, world, surface, dlights, dlight_bits);
    }

    // Bound, invert and shift
    let shift = 8 - settings.color_bits.min(8);
    let floor = 1 << settings.color_bits;
    for cell in grid.cells_mut() {
        *cell = ((255 * 256 - *cell) >> shift).max(floor);
    }

    Ok(grid)
}

// Brighten the cells near each light whose bit is set. Distance on the
// surface is approximated as max + min / 2 of the texel space offsets.
pub fn add_dynamic_lights(
    grid: &mut LightGrid,
    world: &World,
    surface: &Surface,
    dlights: &[DynamicLight],
    dlight_bits: u32,
) {
    let plane = &world.planes[surface.plane];
    let texinfo = &world.texinfos[surface.texinfo];

    for (lnum, light) in dlights.iter().enumerate().take(MAX_DLIGHTS) {
        if dlight_bits & (1 << lnum) == 0 {
            continue;
        }

        let dist = dot_product(&light.origin, &plane.normal) - plane.dist;
        let rad = light.radius - dist.abs();
        if rad < light.minlight {
            continue;
        }
        let minlight = rad - light.minlight;

        let impact = [
            light.origin[0] - plane.normal[0] * dist,
            light.origin[1] - plane.normal[1] * dist,
            light.origin[2] - plane.normal[2] * dist,
        ];

        let local = [
            texinfo.project(&impact, 0) - surface.texturemins[0] as f32,
            texinfo.project(&impact, 1) - surface.texturemins[1] as f32,
        ];

        for t in 0..grid.height {
            let td = ((local[1] - (t * 16) as f32) as i32).abs();
            for s in 0..grid.width {
                let sd = ((local[0] - (s * 16) as f32) as i32).abs();
                let dist = if sd > td { sd + (td >> 1) } else { td + (sd >> 1) };
                let dist = dist as f32;
                if dist < minlight {
                    grid.cells[t * grid.width + s] += ((rad - dist) * 256.0) as i32;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::TextureId;
    use crate::world::{Plane, TexInfo, STYLE_NONE};

    // A single 32x16 surface on the z = 0 plane with a 3x2 lightmap
    fn lit_world(samples: Vec<u8>, styles: [u8; 4]) -> World {
        let texinfo = TexInfo::new([[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0]], TextureId(0));
        let mut surface = Surface::new(0, 0, [0, 0], [32, 16]);
        surface.styles = styles;
        surface.samples = Some(0);
        World::new(
            vec![Plane::new([0.0, 0.0, 1.0], 0.0)],
            vec![],
            vec![surface],
            vec![texinfo],
            Some(samples),
        )
    }

    fn settings(ambient_light: i32) -> LightSettings {
        LightSettings {
            ambient_light,
            ..LightSettings::default()
        }
    }

    #[test]
    fn ambient_and_one_style() {
        let world = lit_world(vec![200; 6], [0, STYLE_NONE, STYLE_NONE, STYLE_NONE]);
        let grid = build_light_map(&world, 0, &[256; 4], &[], 0, &settings(32)).expect("grid");
        assert_eq!(grid.width, 3);
        assert_eq!(grid.height, 2);

        // Raw accumulator 32 * 256 + 200 * 256, inverted and shifted by 8 - 6
        let raw = 32 * 256 + 200 * 256;
        assert_eq!(raw, 59392);
        assert!(grid.cells().iter().all(|&cell| cell == (255 * 256 - raw) >> 2));
        assert_eq!(grid.get(2, 1), 1472);
    }

    #[test]
    fn styles_add_with_their_scale() {
        let mut samples = vec![10; 6];
        samples.extend([20; 6]);
        let world = lit_world(samples, [0, 5, STYLE_NONE, 7]);
        let grid = build_light_map(&world, 0, &[256, 512, 0, 0], &[], 0, &settings(0)).expect("grid");
        // 10 * 256 + 20 * 512 = 12800
        assert_eq!(grid.get(0, 0), (255 * 256 - 12800) >> 2);
    }

    #[test]
    fn bright_cells_are_floored() {
        let world = lit_world(vec![255; 6], [0, STYLE_NONE, STYLE_NONE, STYLE_NONE]);
        let grid = build_light_map(&world, 0, &[512; 4], &[], 0, &settings(255)).expect("grid");
        assert!(grid.cells().iter().all(|&cell| cell == 64));
    }

    #[test]
    fn brighter_samples_never_store_more() {
        let mut last = i32::MAX;
        for sample in (0..=255u8).step_by(5) {
            let world = lit_world(vec![sample; 6], [0, STYLE_NONE, STYLE_NONE, STYLE_NONE]);
            let cell = build_light_map(&world, 0, &[256; 4], &[], 0, &settings(16))
                .expect("grid")
                .get(1, 1);
            assert!(cell <= last);
            assert!(cell >= 64);
            last = cell;
        }
    }

    #[test]
    fn fullbright_and_unlit_levels_are_zero() {
        let world = lit_world(vec![100; 6], [0, STYLE_NONE, STYLE_NONE, STYLE_NONE]);
        let fullbright = LightSettings {
            fullbright: true,
            ..settings(40)
        };
        let grid = build_light_map(&world, 0, &[256; 4], &[], 0, &fullbright).expect("grid");
        assert!(grid.cells().iter().all(|&cell| cell == 0));

        let mut unlit = lit_world(vec![], [0, STYLE_NONE, STYLE_NONE, STYLE_NONE]);
        unlit.lightdata = None;
        let grid = build_light_map(&unlit, 0, &[256; 4], &[], 0, &settings(40)).expect("grid");
        assert!(grid.cells().iter().all(|&cell| cell == 0));
    }

    #[test]
    fn dynamic_light_brightens_nearby_cells() {
        let world = lit_world(vec![0; 6], [0, STYLE_NONE, STYLE_NONE, STYLE_NONE]);
        let light = DynamicLight::new([0.0, 0.0, 10.0], 40.0, 100.0);

        let dark = build_light_map(&world, 0, &[256; 4], &[], 0, &settings(0)).expect("grid");
        let lit = build_light_map(&world, 0, &[256; 4], &[light.clone()], 1, &settings(0)).expect("grid");

        // rad = 30 at the corner right under the light
        assert_eq!(lit.get(0, 0), (255 * 256 - 30 * 256) >> 2);
        // (16, 0) is 16 away, 30 - 16 = 14
        assert_eq!(lit.get(1, 0), (255 * 256 - 14 * 256) >> 2);
        // (32, 16) is 32 + 8 = 40 away, out of reach
        assert_eq!(lit.get(2, 1), dark.get(2, 1));

        // The bit has to be set for the light to count
        let unmarked = build_light_map(&world, 0, &[256; 4], &[light], 2, &settings(0)).expect("grid");
        assert_eq!(unmarked.cells(), dark.cells());
    }

    #[test]
    fn oversized_surfaces_are_rejected() {
        let mut world = lit_world(vec![0; 6], [0, STYLE_NONE, STYLE_NONE, STYLE_NONE]);
        world.surfaces[0].extents = [512, 16];
        let result = build_light_map(&world, 0, &[256; 4], &[], 0, &settings(0));
        assert!(matches!(result, Err(RenderError::BadSurfaceExtents { .. })));
    }
}
