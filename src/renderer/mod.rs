mod blocks;
mod pixels;
mod surface;
mod turb;

use tracing::{debug, info};

use crate::config::RenderConfig;
use crate::error::{RenderError, Result};
use crate::graphics::{Colormap, TextureId, Textures};
use crate::light::{
    build_light_map, light_point, push_dlights, DlightMarks, DynamicLight, LightSettings, LightStyles,
    MAX_DLIGHTS,
};
use crate::sky::{Sky, SkyView, Span};
use crate::surface_cache::{BlockId, CacheOwner, SurfaceCache};
use crate::world::{Vec3, World, SURF_DRAWSKY, SURF_DRAWTURB};

pub use pixels::{PixelDepth, Pixels};
pub use surface::{draw_surface, log2, mask_for_num, DrawSurface, MipLevel};
pub use turb::{TurbTable, TILE_SIZE};

// Everything the surface pipeline needs for one level and video mode: the
// world it draws, the surface cache it draws into, and the per-frame light
// state.
pub struct Renderer {
    config: RenderConfig,
    world: World,
    textures: Textures,
    colormap: Colormap,
    cache: SurfaceCache,
    styles: LightStyles,
    dlights: Vec<DynamicLight>, // This frame's dynamic lights
    marks: DlightMarks,         // Which dynamic lights touch which surface
    sky: Option<Sky>,
    turb: TurbTable,
    time: f32,                  // Client time in seconds
    entity_frame: i32,          // Frame of the brush entity being drawn, 0 for the world
    surfaces_drawn: usize,      // Cache fills that had to rasterize
}

impl Renderer {
    pub fn new(config: RenderConfig, world: World, textures: Textures, colormap: Colormap) -> Result<Renderer> {
        config.validate()?;
        check_colormap(&config, &colormap)?;

        let cache = SurfaceCache::new(config.surface_cache_size(), config.pixel_depth.bytes())?;
        let mut styles = LightStyles::new(&config.light_styles)?;
        styles.animate(0.0);
        let marks = DlightMarks::new(world.surfaces.len());

        debug!(
            "renderer with {} surfaces, {} textures",
            world.surfaces.len(),
            textures.len()
        );

        Ok(Renderer {
            config,
            world,
            textures,
            colormap,
            cache,
            styles,
            dlights: Vec::new(),
            marks,
            sky: None,
            turb: TurbTable::new(),
            time: 0.0,
            entity_frame: 0,
            surfaces_drawn: 0,
        })
    }

    // Switch to a new video mode. Every cached surface is lost.
    pub fn set_mode(&mut self, config: RenderConfig) -> Result<()> {
        config.validate()?;
        check_colormap(&config, &self.colormap)?;

        self.cache = SurfaceCache::new(config.surface_cache_size(), config.pixel_depth.bytes())?;
        self.styles = LightStyles::new(&config.light_styles)?;
        self.styles.animate(self.time);

        info!(
            "mode {}x{} {:?}",
            config.width, config.height, config.pixel_depth
        );
        self.config = config;

        Ok(())
    }

    // Advance to a new frame: animate the light styles, mark the dynamic
    // lights, scroll the sky
    pub fn begin_frame(&mut self, time: f32, dlights: &[DynamicLight]) {
        self.time = time;
        self.styles.animate(time);

        self.dlights = dlights.iter().take(MAX_DLIGHTS).cloned().collect();
        push_dlights(&self.world, &self.dlights, time, &mut self.marks);

        self.cache.begin_frame();
        self.set_sky_frame(time);
        self.compose_sky();
    }

    // Light mask for a surface computed by an outside traversal
    pub fn set_dlight_bits(&mut self, surface: usize, bits: u32) {
        self.marks.set(surface, bits);
    }

    pub fn set_entity_frame(&mut self, frame: i32) {
        self.entity_frame = frame;
    }

    fn light_settings(&self) -> LightSettings {
        LightSettings {
            ambient_light: self.config.ambient_light,
            fullbright: self.config.fullbright,
            color_bits: self.config.color_bits,
        }
    }

    // Find or build the cached composite of a surface at a mip level
    pub fn fill_cache(&mut self, surface_index: usize, mip: MipLevel) -> Result<BlockId> {
        let settings = self.light_settings();
        let surface = self
            .world
            .surfaces
            .get(surface_index)
            .ok_or(RenderError::UnknownSurface(surface_index))?;

        let base = self.world.texinfos[surface.texinfo].texture;
        let texture_id = self.textures.animate(base, self.entity_frame, self.time)?;
        let light_adjust = self.styles.light_adjust(&surface.styles);
        let dlit = self.marks.is_marked(surface_index);
        let owner = CacheOwner {
            surface: surface_index,
            mip: mip.level(),
        };

        let cached = self.cache.spot(owner);
        if let Some(id) = cached {
            let reusable = self.cache.block(id).map_or(false, |block| {
                !block.dlight
                    && !dlit
                    && block.texture == Some(texture_id)
                    && block.light_adjust == light_adjust
            });
            if reusable {
                return Ok(id);
            }
        }

        // Nothing in the cache changes until the surface is known to be drawable
        let grid = build_light_map(
            &self.world,
            surface_index,
            &light_adjust,
            &self.dlights,
            self.marks.bits(surface_index),
            &settings,
        )?;

        let texture = self.textures.get(texture_id);
        let draw = DrawSurface::new(surface, texture, mip, self.config.pixel_depth, light_adjust);

        // A texture that just animated keeps its block
        let id = match cached {
            Some(id) => id,
            None => {
                let id = self.cache.allocate(draw.width, draw.width * draw.height)?;
                self.cache.claim(id, owner)?;
                id
            }
        };

        if let Some(block) = self.cache.block_info_mut(id) {
            block.mip_scale = mip.scale();
            block.dlight = dlit;
            block.texture = Some(texture_id);
            block.light_adjust = light_adjust;
        }

        draw_surface(&draw, &grid, &self.colormap, self.config.pixel_depth, self.cache.data_mut(id));
        self.surfaces_drawn += 1;

        Ok(id)
    }

    // Light level for a model standing at point
    pub fn light_point(&self, point: &Vec3) -> i32 {
        light_point(&self.world, &self.styles, point, self.config.ambient_light)
    }

    pub fn load_sky(&mut self, texture: TextureId) -> Result<()> {
        let mut sky = Sky::new(
            self.textures.get(texture),
            self.config.sky_speed,
            self.config.sky_speed2,
        )?;
        sky.compose_frame(self.time);
        self.sky = Some(sky);

        Ok(())
    }

    pub fn set_sky_frame(&mut self, time: f32) {
        if let Some(sky) = &mut self.sky {
            sky.set_sky_frame(time);
        }
    }

    pub fn compose_sky(&mut self) -> bool {
        match &mut self.sky {
            Some(sky) => sky.compose(),
            None => false,
        }
    }

    pub fn draw_sky_scans(&self, view: &SkyView, spans: &[Span], pixels: &mut Pixels) {
        if let Some(sky) = &self.sky {
            sky.draw_scans(view, spans, pixels, self.colormap.table_8to16());
        }
    }

    // Build the 128x128 tile of a liquid or sky surface
    pub fn gen_tile(&self, surface_index: usize, dest: &mut [u8]) -> Result<()> {
        let surface = self
            .world
            .surfaces
            .get(surface_index)
            .ok_or(RenderError::UnknownSurface(surface_index))?;
        let depth = self.config.pixel_depth;

        if surface.flags & SURF_DRAWTURB != 0 {
            let texture = self.textures.get(self.world.texinfos[surface.texinfo].texture);
            match depth {
                PixelDepth::Eight => self.turb.gen_turb_tile(texture, self.time, dest),
                PixelDepth::Sixteen => {
                    self.turb
                        .gen_turb_tile16(texture, self.time, self.colormap.table_8to16(), dest)
                }
            }
        } else if surface.flags & SURF_DRAWSKY != 0 {
            let sky = self
                .sky
                .as_ref()
                .ok_or_else(|| RenderError::InvalidSkyTexture("no sky loaded".to_string()))?;
            match depth {
                PixelDepth::Eight => sky.gen_tile(dest),
                PixelDepth::Sixteen => sky.gen_tile16(self.colormap.table_8to16(), dest),
            }
        } else {
            Err(RenderError::UnknownTileType(surface_index))
        }
    }

    pub fn flush(&mut self) {
        self.cache.flush();
    }

    pub fn is_thrashing(&self) -> bool {
        self.cache.is_thrashing()
    }

    pub fn cache(&self) -> &SurfaceCache {
        &self.cache
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn textures(&self) -> &Textures {
        &self.textures
    }

    pub fn colormap(&self) -> &Colormap {
        &self.colormap
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn sky(&self) -> Option<&Sky> {
        self.sky.as_ref()
    }

    pub fn surfaces_drawn(&self) -> usize {
        self.surfaces_drawn
    }
}

fn check_colormap(config: &RenderConfig, colormap: &Colormap) -> Result<()> {
    if colormap.grades() < config.grades() {
        return Err(RenderError::Config(format!(
            "colormap has {} grades, {} color bits need {}",
            colormap.grades(),
            config.color_bits,
            config.grades()
        )));
    }

    Ok(())
}
