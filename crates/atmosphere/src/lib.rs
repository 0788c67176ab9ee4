pub mod camera;
mod error;
pub mod fog;
pub mod lighting;
pub mod raster;
pub mod surface;

pub use camera::{world_to_screen, Camera2D, Trackable, Vec2, Viewport};
pub use error::SurfaceError;
pub use fog::{FogConfig, FogLayers, FogOfWar, DEFAULT_FOG_MOVEMENT_THRESHOLD};
pub use lighting::{
    GradientCacheStats, LightId, LightKind, LightOptions, LightSource, LightingConfig,
    LightingEngine, LightsSnapshot, OverlayLayers, QualityMode, RecomputeTimings,
};
pub use raster::{unpack_rgb, BlendMode, Canvas, PixelRect};
pub use surface::{BufferId, SoftwareSurface, Surface, SurfaceStats};
