use std::time::Instant;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, trace};

use crate::camera::{world_to_screen, Camera2D, Vec2, Viewport};
use crate::raster::{BlendMode, PixelRect};
use crate::surface::{BufferId, Surface};

use super::config::{clamp_unit, LightingConfig};
use super::gradient::{GradientCache, GradientCacheStats};
use super::perf::{RecomputeStats, RecomputeTimings};
use super::registry::{
    LightDefaults, LightId, LightKind, LightOptions, LightRegistry, LightSource, LightsSnapshot,
};
use super::scheduler::{UpdateDecision, UpdateScheduler};

const DARKNESS_COLOR: u32 = 0x000000;

/// Buffers owned by the engine while created. The host composites
/// `darkness` with normal blending and `light` additively on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayLayers {
    pub darkness: BufferId,
    pub light: BufferId,
    pub viewport: Viewport,
}

/// Per-scene lighting renderer.
///
/// Lifecycle: [`LightingEngine::create`] once, [`LightingEngine::update`]
/// every rendered frame, [`LightingEngine::destroy`] on teardown. Every
/// public call is infallible; calls made before `create` or after `destroy`
/// only touch the registry.
#[derive(Debug)]
pub struct LightingEngine {
    config: LightingConfig,
    registry: LightRegistry,
    cache: GradientCache,
    scheduler: UpdateScheduler,
    layers: Option<OverlayLayers>,
    enabled: bool,
    layers_cleared_while_disabled: bool,
    rng: SmallRng,
    stats: RecomputeStats,
}

impl LightingEngine {
    pub fn new(config: LightingConfig) -> Self {
        let seed = config.flicker_seed.unwrap_or_else(rand::random);
        Self::with_rng(config, SmallRng::seed_from_u64(seed))
    }

    pub fn with_rng(config: LightingConfig, rng: SmallRng) -> Self {
        let config = config.sanitized();
        Self {
            registry: LightRegistry::new(),
            cache: GradientCache::new(config.quality_mode),
            scheduler: UpdateScheduler::new(
                config.update_frequency,
                config.camera_motion_threshold,
            ),
            layers: None,
            enabled: true,
            layers_cleared_while_disabled: false,
            rng,
            stats: RecomputeStats::default(),
            config,
        }
    }

    pub fn config(&self) -> &LightingConfig {
        &self.config
    }

    pub fn create(&mut self, surface: &mut dyn Surface, viewport: Viewport) {
        if let Some(layers) = self.layers.take() {
            release_layers(surface, layers);
        }
        self.layers = Some(allocate_layers(surface, viewport));
        self.scheduler.reset();
        self.stats.reset();
        info!(
            width = viewport.width,
            height = viewport.height,
            quality_mode = ?self.config.quality_mode,
            ambient_darkness = self.config.ambient_darkness,
            update_frequency = self.config.update_frequency,
            flicker = self.config.enable_flicker,
            lights = self.registry.len(),
            "lighting_engine_created"
        );
    }

    /// Runs the scheduler and, when it allows, repaints both overlay layers.
    /// Returns whether a recompute happened.
    pub fn update(&mut self, surface: &mut dyn Surface, camera: &Camera2D) -> bool {
        let Some(mut layers) = self.layers else {
            return false;
        };

        if !self.enabled {
            self.scheduler.tick();
            if !self.layers_cleared_while_disabled {
                surface.clear(layers.darkness);
                surface.clear(layers.light);
                self.layers_cleared_while_disabled = true;
            }
            return false;
        }

        let decision = if camera.viewport != layers.viewport {
            release_layers(surface, layers);
            layers = allocate_layers(surface, camera.viewport);
            self.layers = Some(layers);
            debug!(
                width = camera.viewport.width,
                height = camera.viewport.height,
                "lighting_layers_resized"
            );
            self.scheduler.poll_resized(camera.scroll)
        } else {
            self.scheduler.poll(camera.scroll, self.registry.has_dynamic())
        };

        let reason = match decision {
            UpdateDecision::Recompute(reason) => reason,
            UpdateDecision::Skip(reason) => {
                self.stats.record_skip();
                trace!(reason = ?reason, "lighting_update_skipped");
                return false;
            }
        };

        let started = Instant::now();
        self.recompute(surface, camera, layers);
        self.stats.record_recompute(started.elapsed());
        trace!(reason = ?reason, lights = self.registry.len(), "lighting_recomputed");
        self.maybe_log_perf();
        true
    }

    pub fn destroy(&mut self, surface: &mut dyn Surface) {
        let sprites_removed = self.cache.clear(surface);
        let had_layers = self.layers.is_some();
        if let Some(layers) = self.layers.take() {
            release_layers(surface, layers);
        }
        let lights_dropped = self.registry.len();
        self.registry.clear();
        self.scheduler.reset();
        info!(
            sprites_removed,
            lights_dropped, had_layers, "lighting_engine_destroyed"
        );
    }

    pub fn add_static_light(
        &mut self,
        x: f32,
        y: f32,
        radius: f32,
        options: LightOptions,
    ) -> LightId {
        self.add_light(LightKind::Static, x, y, radius, options)
    }

    pub fn add_dynamic_light(
        &mut self,
        x: f32,
        y: f32,
        radius: f32,
        options: LightOptions,
    ) -> LightId {
        self.add_light(LightKind::Dynamic, x, y, radius, options)
    }

    /// Unknown handles are ignored.
    pub fn remove_light(&mut self, id: LightId) -> bool {
        let removed = self.registry.remove(id);
        if removed {
            self.scheduler.force();
        }
        removed
    }

    pub fn move_light(&mut self, id: LightId, x: f32, y: f32) -> bool {
        let Some(light) = self.registry.get_mut(id) else {
            return false;
        };
        if light.x != x || light.y != y {
            light.x = x;
            light.y = y;
            self.scheduler.force();
        }
        true
    }

    pub fn clear_static_lights(&mut self) {
        if self.registry.clear_static() > 0 {
            self.scheduler.force();
        }
    }

    pub fn clear_dynamic_lights(&mut self) {
        if self.registry.clear_dynamic() > 0 {
            self.scheduler.force();
        }
    }

    /// Creates the player light on first call; afterwards moves it in place.
    /// `None` keeps the current radius (or the configured default on creation).
    pub fn set_player_light(&mut self, x: f32, y: f32, radius: Option<f32>) {
        let config = &self.config;
        let changed = self.registry.set_player(x, y, radius, || {
            LightSource::from_options(
                x,
                y,
                config.default_light_radius,
                LightOptions::default(),
                LightDefaults::for_player(config),
            )
        });
        if changed {
            self.scheduler.force();
        }
    }

    pub fn set_player_light_radius(&mut self, radius: f32) {
        if self.registry.set_player_radius(radius) {
            self.scheduler.force();
        }
    }

    pub fn remove_player_light(&mut self) {
        if self.registry.remove_player() {
            self.scheduler.force();
        }
    }

    /// Out-of-range values are clamped into `[0, 1]`.
    pub fn set_ambient_darkness(&mut self, value: f32) {
        let clamped = clamp_unit(value);
        if clamped != self.config.ambient_darkness {
            self.config.ambient_darkness = clamped;
            self.scheduler.force();
        }
    }

    pub fn ambient_darkness(&self) -> f32 {
        self.config.ambient_darkness
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled == self.enabled {
            return;
        }
        self.enabled = enabled;
        if enabled {
            self.scheduler.force();
        } else {
            self.layers_cleared_while_disabled = false;
        }
        debug!(enabled, "lighting_enabled_changed");
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn lights(&self) -> LightsSnapshot {
        self.registry.snapshot()
    }

    pub fn layers(&self) -> Option<OverlayLayers> {
        self.layers
    }

    pub fn cache_stats(&self) -> GradientCacheStats {
        self.cache.stats()
    }

    pub fn timings(&self) -> RecomputeTimings {
        self.stats.snapshot()
    }

    pub fn frame_counter(&self) -> u64 {
        self.scheduler.frame_counter()
    }

    /// Composites darkness then light onto `target`. Does nothing while
    /// disabled or before `create`.
    pub fn present(&self, surface: &mut dyn Surface, target: BufferId) -> bool {
        let Some(layers) = self.layers.filter(|_| self.enabled) else {
            return false;
        };
        surface.composite(target, layers.darkness, (0, 0), BlendMode::Normal)
            && surface.composite(target, layers.light, (0, 0), BlendMode::Additive)
    }

    fn add_light(
        &mut self,
        kind: LightKind,
        x: f32,
        y: f32,
        radius: f32,
        options: LightOptions,
    ) -> LightId {
        let light = LightSource::from_options(
            x,
            y,
            radius,
            options,
            LightDefaults::for_kind(&self.config, kind),
        );
        let id = self.registry.add(kind, light);
        self.scheduler.force();
        trace!(?id, ?kind, x, y, radius = light.radius, "light_added");
        id
    }

    fn recompute(&mut self, surface: &mut dyn Surface, camera: &Camera2D, layers: OverlayLayers) {
        surface.clear(layers.darkness);
        surface.clear(layers.light);
        paint_darkness(surface, layers, self.config.ambient_darkness);

        let flicker_enabled = self.config.enable_flicker;
        for light in self.registry.iter() {
            draw_light(
                surface,
                &mut self.cache,
                &mut self.rng,
                flicker_enabled,
                layers,
                camera,
                light,
            );
        }
    }

    fn maybe_log_perf(&self) {
        let interval = u64::from(self.config.perf_log_interval_recomputes);
        if interval == 0 || self.stats.recomputes() % interval != 0 {
            return;
        }
        let timings = self.stats.snapshot();
        let cache = self.cache.stats();
        debug!(
            last_ms = timings.last_ms,
            avg_ms = timings.avg_ms,
            max_ms = timings.max_ms,
            recomputes = timings.recomputes,
            skipped = timings.skipped,
            cache_entries = cache.entries,
            cache_hits = cache.hits,
            cache_misses = cache.misses,
            lights = self.registry.len(),
            "lighting_perf_snapshot"
        );
    }
}

fn allocate_layers(surface: &mut dyn Surface, viewport: Viewport) -> OverlayLayers {
    OverlayLayers {
        darkness: surface.create_buffer(viewport.width, viewport.height),
        light: surface.create_buffer(viewport.width, viewport.height),
        viewport,
    }
}

fn release_layers(surface: &mut dyn Surface, layers: OverlayLayers) {
    surface.release_buffer(layers.darkness);
    surface.release_buffer(layers.light);
}

fn paint_darkness(surface: &mut dyn Surface, layers: OverlayLayers, ambient_darkness: f32) {
    let rect = PixelRect::from_size(layers.viewport.width, layers.viewport.height);
    surface.fill_rect(layers.darkness, rect, DARKNESS_COLOR, ambient_darkness);
}

/// Jitter bound in whole pixels, never above `flicker_amount`.
fn flicker_bound(flicker_amount: f32) -> i32 {
    if flicker_amount.is_finite() {
        flicker_amount.floor().max(0.0) as i32
    } else {
        0
    }
}

/// Radius actually drawn this frame. The stored descriptor is never touched.
fn realized_radius(rng: &mut SmallRng, flicker_enabled: bool, light: &LightSource) -> u32 {
    let mut radius = light.radius;
    if flicker_enabled && light.flicker {
        let bound = flicker_bound(light.flicker_amount);
        if bound > 0 {
            radius += rng.random_range(-bound..=bound) as f32;
        }
    }
    if radius.is_finite() {
        radius.round().max(0.0) as u32
    } else {
        0
    }
}

fn draw_light(
    surface: &mut dyn Surface,
    cache: &mut GradientCache,
    rng: &mut SmallRng,
    flicker_enabled: bool,
    layers: OverlayLayers,
    camera: &Camera2D,
    light: &LightSource,
) {
    let radius = realized_radius(rng, flicker_enabled, light);
    if radius == 0 {
        return;
    }
    let (screen_x, screen_y) = world_to_screen(Vec2::new(light.x, light.y), camera);
    if !circle_touches_viewport(screen_x, screen_y, radius, layers.viewport) {
        return;
    }
    if let Some(sprite) = cache.resolve(surface, radius, light.color, light.intensity) {
        surface.blit_sprite(layers.light, sprite, (screen_x, screen_y), BlendMode::Additive);
    }
}

fn circle_touches_viewport(x: i32, y: i32, radius: u32, viewport: Viewport) -> bool {
    let radius = i64::from(radius);
    let (x, y) = (i64::from(x), i64::from(y));
    x + radius >= 0
        && y + radius >= 0
        && x - radius < i64::from(viewport.width)
        && y - radius < i64::from(viewport.height)
}
