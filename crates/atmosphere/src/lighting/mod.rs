mod config;
mod engine;
mod gradient;
mod perf;
mod registry;
mod scheduler;

pub use config::{
    LightingConfig, QualityMode, DEFAULT_AMBIENT_DARKNESS, DEFAULT_DYNAMIC_LIGHT_COLOR,
    DEFAULT_FLICKER_AMOUNT, DEFAULT_LIGHT_COLOR, DEFAULT_LIGHT_RADIUS, DEFAULT_UPDATE_FREQUENCY,
};
pub use engine::{LightingEngine, OverlayLayers};
pub use gradient::{
    render_gradient, GradientCache, GradientCacheStats, GradientKey, MAX_SPRITE_RADIUS,
};
pub use perf::RecomputeTimings;
pub use registry::{LightId, LightKind, LightOptions, LightRegistry, LightSource, LightsSnapshot};
pub use scheduler::{
    RecomputeReason, SkipReason, UpdateDecision, UpdateScheduler, DEFAULT_CAMERA_MOTION_THRESHOLD,
};
