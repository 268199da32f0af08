pub mod config;
pub mod error;
pub mod graphics;
pub mod light;
pub mod renderer;
pub mod sky;
pub mod surface_cache;
pub mod world;

pub use config::RenderConfig;
pub use error::{RenderError, Result};
pub use renderer::{MipLevel, PixelDepth, Pixels, Renderer};
pub use surface_cache::{surface_cache_for_res, BlockId, CacheOwner, SurfaceCache};
