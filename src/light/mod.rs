mod dlights;
mod light_point;
mod lightmap;
mod styles;

pub use dlights::{mark_lights, push_dlights, DlightMarks, DynamicLight, MAX_DLIGHTS};
pub use light_point::light_point;
pub use lightmap::{add_dynamic_lights, build_light_map, LightGrid, LightSettings, MAX_LIGHT_GRID};
pub use styles::{LightStyles, MAX_LIGHTSTYLES};
