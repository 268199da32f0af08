mod scene;
#[cfg(feature = "viewer")]
mod viewer;

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use surfcache_renderer::graphics::Colormap;
use surfcache_renderer::light::DynamicLight;
use surfcache_renderer::renderer::TILE_SIZE;
use surfcache_renderer::sky::{SkyView, Span};
use surfcache_renderer::world::{SURF_DRAWSKY, SURF_DRAWTURB};
use surfcache_renderer::{MipLevel, PixelDepth, Pixels, RenderConfig, Renderer, Result};

use crate::scene::{dlights, Scene, LIGHT_STYLES};

// Frames per second of simulated time
pub const FRAME_RATE: f32 = 20.0;

#[derive(Parser, Debug)]
#[command(version, about = "Render a demo room through the software surface cache")]
struct Args {
    /// JSON render settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Frames to render
    #[arg(long, default_value_t = 60)]
    frames: u32,

    /// Surface cache size in KiB, overrides the size picked for the resolution
    #[arg(long)]
    surf_cache_kb: Option<usize>,

    /// Draw without lightmaps
    #[arg(long)]
    fullbright: bool,

    /// Use a 16-bit display
    #[arg(long)]
    sixteen_bit: bool,

    /// Log every cache block after the last frame
    #[arg(long)]
    dump_cache: bool,

    /// Show the frames in a window
    #[arg(long)]
    view: bool,
}

fn load_config(args: &Args) -> Result<RenderConfig> {
    let mut config = match &args.config {
        Some(path) => RenderConfig::load(path)?,
        None => RenderConfig::default(),
    };

    if args.surf_cache_kb.is_some() {
        config.surf_cache_kb = args.surf_cache_kb;
    }
    if args.fullbright {
        config.fullbright = true;
    }
    if args.sixteen_bit {
        config.pixel_depth = PixelDepth::Sixteen;
    }

    // The room needs its flicker and pulse styles
    for style in LIGHT_STYLES.iter().skip(config.light_styles.len()) {
        config.light_styles.push(style.to_string());
    }

    config.validate()?;
    Ok(config)
}

// Draw one frame: every lit surface at every mip, the tiles, the sky on the
// top half of the view and the floor below it
pub fn render_frame(renderer: &mut Renderer, pixels: &mut Pixels, time: f32, dlights: &[DynamicLight]) -> Result<()> {
    renderer.begin_frame(time, dlights);

    let mut tile = vec![0u8; TILE_SIZE * TILE_SIZE * pixels.depth.bytes()];
    let surface_count = renderer.world().surfaces.len();

    for surface in 0..surface_count {
        let flags = renderer.world().surfaces[surface].flags;
        if flags & (SURF_DRAWSKY | SURF_DRAWTURB) != 0 {
            renderer.gen_tile(surface, &mut tile)?;
            continue;
        }

        for mip in MipLevel::ALL {
            renderer.fill_cache(surface, mip)?;
        }
    }

    let view = SkyView::new(pixels.width as i32, pixels.height as i32);
    let spans: Vec<Span> = (0..pixels.height as i32 / 2)
        .map(|v| Span {
            u: 0,
            v,
            count: pixels.width as i32,
        })
        .collect();
    renderer.draw_sky_scans(&view, &spans, pixels);

    let floor = renderer.fill_cache(0, MipLevel::Mip1)?;
    blit(renderer, floor, pixels);

    Ok(())
}

// Copy a cached surface into the lower half of the view
fn blit(renderer: &Renderer, block: surfcache_renderer::BlockId, pixels: &mut Pixels) {
    let cache = renderer.cache();
    let Some(info) = cache.block(block) else {
        return;
    };

    let bytes = pixels.depth.bytes();
    let data = cache.data(block);
    let row_bytes = pixels.row_bytes();
    let width = info.width.min(pixels.width) * bytes;
    let top = pixels.height / 2;

    for y in 0..info.height.min(pixels.height - top) {
        let src = &data[y * info.width * bytes..y * info.width * bytes + width];
        let dst = (top + y) * row_bytes;
        pixels.pixels[dst..dst + width].copy_from_slice(src);
    }
}

fn run(args: &Args) -> Result<()> {
    let config = load_config(args)?;
    let scene = Scene::new()?;
    let palette = scene.palette.clone();
    let colormap = Colormap::from_palette(&palette, config.color_bits);

    let mut pixels = Pixels::new(
        config.width as usize,
        config.height as usize,
        config.pixel_depth,
    );

    let sky = scene.sky;
    let mut renderer = Renderer::new(config, scene.world, scene.textures, colormap)?;
    renderer.load_sky(sky)?;

    if args.view {
        #[cfg(feature = "viewer")]
        return viewer::main_loop(&mut renderer, &mut pixels, &palette);

        #[cfg(not(feature = "viewer"))]
        warn!("built without the viewer feature, rendering offscreen");
    }

    let mut thrashing_frames = 0;
    for frame in 0..args.frames {
        let time = frame as f32 / FRAME_RATE;
        render_frame(&mut renderer, &mut pixels, time, &dlights(time))?;

        if renderer.is_thrashing() {
            thrashing_frames += 1;
        }

        debug!(
            "frame {} light at the center {}",
            frame,
            renderer.light_point(&[128.0, 128.0, 40.0])
        );
    }

    info!(
        "{} frames, {} surfaces rasterized, {} thrashing",
        args.frames,
        renderer.surfaces_drawn(),
        thrashing_frames
    );

    if args.dump_cache {
        renderer.cache().dump();
    }

    Ok(())
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
