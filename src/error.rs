use thiserror::Error;

// Everything in here is fatal for the frame being rendered: it means corrupted
// content or a broken invariant. The host decides how to abort.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("bad cache width {0}")]
    BadCacheWidth(usize),

    #[error("bad cache size {0}")]
    BadCacheSize(usize),

    #[error("cache request of {requested} bytes exceeds cache size {capacity}")]
    CacheTooSmall { requested: usize, capacity: usize },

    #[error("hit the end of the surface cache while collecting {requested} bytes")]
    CacheExhausted { requested: usize },

    #[error("surface cache guard bytes were overwritten")]
    GuardCorrupted,

    #[error("no surface cache block at offset {0}")]
    MissingBlock(usize),

    #[error("broken texture animation cycle at texture {0}")]
    BrokenAnimationCycle(String),

    #[error("infinite texture animation cycle at texture {0}")]
    InfiniteAnimationCycle(String),

    #[error("surface {surface} extents {extents:?} exceed the light grid")]
    BadSurfaceExtents { surface: usize, extents: [i32; 2] },

    #[error("invalid texture {name}: {reason}")]
    InvalidTexture { name: String, reason: String },

    #[error("invalid sky texture {0}")]
    InvalidSkyTexture(String),

    #[error("invalid light style {index}: {pattern:?}")]
    InvalidLightStyle { index: usize, pattern: String },

    #[error("no surface {0} in the world")]
    UnknownSurface(usize),

    #[error("unknown tile type for surface {0}")]
    UnknownTileType(usize),

    #[error("invalid config: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RenderError>;
