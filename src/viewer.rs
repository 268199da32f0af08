use sdl2::event::Event;
use sdl2::keyboard::Keycode;
use sdl2::pixels::PixelFormatEnum;
use std::time::Instant;
use tracing::info;

use surfcache_renderer::graphics::Palette;
use surfcache_renderer::{Pixels, RenderError, Renderer, Result};

use crate::render_frame;
use crate::scene::dlights;

const TITLE: &str = "Surface cache viewer";
const SCALE: u32 = 3;

fn sdl_error(err: impl ToString) -> RenderError {
    RenderError::Config(format!("sdl: {}", err.to_string()))
}

// Render and present frames until the window is closed or Escape or Q is pressed.
// F flushes the surface cache.
pub fn main_loop(renderer: &mut Renderer, pixels: &mut Pixels, palette: &Palette) -> Result<()> {
    let width = pixels.width as u32;
    let height = pixels.height as u32;

    let sdl_context = sdl2::init().map_err(sdl_error)?;
    let video_subsystem = sdl_context.video().map_err(sdl_error)?;

    let window = video_subsystem
        .window(TITLE, width * SCALE, height * SCALE)
        .position_centered()
        .build()
        .map_err(sdl_error)?;

    let mut canvas = window
        .into_canvas()
        .software()
        .present_vsync()
        .build()
        .map_err(sdl_error)?;

    let texture_creator = canvas.texture_creator();
    let mut texture = texture_creator
        .create_texture_streaming(PixelFormatEnum::RGB24, width, height)
        .map_err(sdl_error)?;

    let mut event_pump = sdl_context.event_pump().map_err(sdl_error)?;
    let start = Instant::now();
    let mut frames = 0u32;

    'running: loop {
        let time = start.elapsed().as_secs_f32();
        render_frame(renderer, pixels, time, &dlights(time))?;

        let rgb = pixels.to_rgb24(palette);
        texture
            .update(None, &rgb, width as usize * 3)
            .map_err(sdl_error)?;
        canvas.copy(&texture, None, None).map_err(sdl_error)?;
        canvas.present();
        frames += 1;

        for event in event_pump.poll_iter() {
            match event {
                Event::Quit { .. }
                | Event::KeyDown {
                    keycode: Some(Keycode::Escape),
                    ..
                }
                | Event::KeyDown {
                    keycode: Some(Keycode::Q),
                    ..
                } => break 'running,

                Event::KeyDown {
                    keycode: Some(Keycode::F),
                    ..
                } => {
                    renderer.flush();
                }

                _ => {}
            }
        }
    }

    info!(
        "{} frames in {:.1}s, {} surfaces rasterized",
        frames,
        start.elapsed().as_secs_f32(),
        renderer.surfaces_drawn()
    );

    Ok(())
}
