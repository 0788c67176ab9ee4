//! Dual-buffer fog of war.
//!
//! The transient buffer is refilled with a translucent tint on every executed
//! update and only shows the current sight radius. The persistent buffer is
//! filled opaque once at creation and is only ever punched, so it records
//! every explored position for the lifetime of the engine.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::camera::{Camera2D, Trackable, Vec2};
use crate::raster::{BlendMode, Canvas, PixelRect};
use crate::surface::{BufferId, Surface};

pub const DEFAULT_FOG_MOVEMENT_THRESHOLD: f32 = 10.0;
pub const DEFAULT_REVEAL_RADIUS: f32 = 120.0;
pub const DEFAULT_TRANSIENT_ALPHA: f32 = 0.55;
const DEFAULT_WORLD_SIZE: u32 = 2048;
const STENCIL_NAME_PREFIX: &str = "fog_stencil";
const OPAQUE: f32 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FogConfig {
    pub world_width: u32,
    pub world_height: u32,
    pub reveal_radius: f32,
    pub movement_threshold: f32,
    pub transient_alpha: f32,
    pub tint_color: u32,
}

impl Default for FogConfig {
    fn default() -> Self {
        Self {
            world_width: DEFAULT_WORLD_SIZE,
            world_height: DEFAULT_WORLD_SIZE,
            reveal_radius: DEFAULT_REVEAL_RADIUS,
            movement_threshold: DEFAULT_FOG_MOVEMENT_THRESHOLD,
            transient_alpha: DEFAULT_TRANSIENT_ALPHA,
            tint_color: 0x000000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FogLayers {
    pub transient: BufferId,
    pub persistent: BufferId,
}

#[derive(Debug)]
pub struct FogOfWar {
    config: FogConfig,
    layers: Option<FogLayers>,
    stencil: Option<String>,
    stencil_counter: u64,
    last_player: Option<Vec2>,
    updates_applied: u64,
}

impl FogOfWar {
    pub fn new(config: FogConfig) -> Self {
        Self {
            config,
            layers: None,
            stencil: None,
            stencil_counter: 0,
            last_player: None,
            updates_applied: 0,
        }
    }

    pub fn config(&self) -> &FogConfig {
        &self.config
    }

    /// Allocates both world-sized buffers and bakes the reveal stencil.
    /// A second call is ignored so the explored record is never refilled.
    pub fn create_fog(&mut self, surface: &mut dyn Surface) {
        if self.layers.is_some() {
            debug!("fog_create_ignored_already_created");
            return;
        }
        let (width, height) = (self.config.world_width, self.config.world_height);
        let layers = FogLayers {
            transient: surface.create_buffer(width, height),
            persistent: surface.create_buffer(width, height),
        };
        surface.fill_rect(
            layers.persistent,
            PixelRect::from_size(width, height),
            self.config.tint_color,
            OPAQUE,
        );
        self.layers = Some(layers);
        self.stencil = self.bake_stencil(surface);
        self.last_player = None;
        info!(
            world_width = width,
            world_height = height,
            reveal_radius = self.config.reveal_radius,
            movement_threshold = self.config.movement_threshold,
            "fog_created"
        );
    }

    /// Refreshes the mask when the player moved at least the movement
    /// threshold since the last executed update. Returns whether buffers
    /// were touched. Safe to call before [`FogOfWar::create_fog`].
    pub fn update_fog(&mut self, surface: &mut dyn Surface, player: &dyn Trackable) -> bool {
        let Some(layers) = self.layers else {
            return false;
        };
        let position = player.position();
        if let Some(last) = self.last_player {
            if last.distance(position) < self.config.movement_threshold {
                return false;
            }
        }

        let (width, height) = (self.config.world_width, self.config.world_height);
        surface.clear(layers.transient);
        surface.fill_rect(
            layers.transient,
            PixelRect::from_size(width, height),
            self.config.tint_color,
            self.config.transient_alpha,
        );
        if let Some(stencil) = self.stencil.as_deref() {
            let center = (position.x.round() as i32, position.y.round() as i32);
            surface.erase(layers.transient, stencil, center);
            surface.erase(layers.persistent, stencil, center);
        }

        self.last_player = Some(position);
        self.updates_applied += 1;
        trace!(x = position.x, y = position.y, "fog_updated");
        true
    }

    /// Composites the part of both buffers under the camera onto `target`.
    pub fn present(&self, surface: &mut dyn Surface, target: BufferId, camera: &Camera2D) -> bool {
        let Some(layers) = self.layers else {
            return false;
        };
        let offset = (
            -(camera.scroll.x.round() as i32),
            -(camera.scroll.y.round() as i32),
        );
        surface.composite(target, layers.transient, offset, BlendMode::Normal)
            && surface.composite(target, layers.persistent, offset, BlendMode::Normal)
    }

    pub fn destroy(&mut self, surface: &mut dyn Surface) {
        let had_layers = self.layers.is_some();
        if let Some(layers) = self.layers.take() {
            surface.release_buffer(layers.transient);
            surface.release_buffer(layers.persistent);
        }
        if let Some(stencil) = self.stencil.take() {
            surface.remove_sprite(&stencil);
        }
        self.last_player = None;
        info!(had_layers, updates_applied = self.updates_applied, "fog_destroyed");
    }

    /// True once any reveal has reached `(x, y)` in the persistent buffer.
    pub fn is_explored(&self, surface: &dyn Surface, x: i32, y: i32) -> bool {
        self.persistent_alpha_at(surface, x, y)
            .is_some_and(|alpha| alpha < u8::MAX)
    }

    pub fn persistent_alpha_at(&self, surface: &dyn Surface, x: i32, y: i32) -> Option<u8> {
        let layers = self.layers?;
        surface.read_buffer(layers.persistent)?.alpha_at(x, y)
    }

    pub fn visible_alpha_at(&self, surface: &dyn Surface, x: i32, y: i32) -> Option<u8> {
        let layers = self.layers?;
        surface.read_buffer(layers.transient)?.alpha_at(x, y)
    }

    pub fn layers(&self) -> Option<FogLayers> {
        self.layers
    }

    pub fn is_created(&self) -> bool {
        self.layers.is_some()
    }

    pub fn last_player_position(&self) -> Option<Vec2> {
        self.last_player
    }

    pub fn updates_applied(&self) -> u64 {
        self.updates_applied
    }

    fn bake_stencil(&mut self, surface: &mut dyn Surface) -> Option<String> {
        let radius = self.config.reveal_radius;
        if !(radius.is_finite() && radius >= 0.5) {
            warn!(reveal_radius = radius, "fog_stencil_skipped_zero_radius");
            return None;
        }
        let half = radius.round() as u32;
        let side = half * 2;
        let mut canvas = Canvas::new(side, side);
        canvas.fill_circle(half as f32, half as f32, radius, [255, 255, 255], OPAQUE);

        let name = loop {
            let candidate = format!("{STENCIL_NAME_PREFIX}_{}", self.stencil_counter);
            self.stencil_counter += 1;
            if !surface.has_sprite(&candidate) {
                break candidate;
            }
        };
        match surface.bake_sprite(&name, canvas) {
            Ok(()) => Some(name),
            Err(error) => {
                warn!(sprite = name.as_str(), error = %error, "fog_stencil_bake_failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Viewport;
    use crate::surface::SoftwareSurface;

    fn small_config() -> FogConfig {
        FogConfig {
            world_width: 400,
            world_height: 300,
            reveal_radius: 30.0,
            ..FogConfig::default()
        }
    }

    fn created() -> (FogOfWar, SoftwareSurface) {
        let mut surface = SoftwareSurface::new();
        let mut fog = FogOfWar::new(small_config());
        fog.create_fog(&mut surface);
        (fog, surface)
    }

    #[test]
    fn update_before_create_is_a_no_op() {
        let mut surface = SoftwareSurface::new();
        let mut fog = FogOfWar::new(small_config());
        assert!(!fog.update_fog(&mut surface, &Vec2::new(10.0, 10.0)));
        assert_eq!(surface.stats().buffer_mutations(), 0);
        assert!(fog.last_player_position().is_none());
    }

    #[test]
    fn persistent_buffer_starts_opaque_and_transient_empty() {
        let (fog, surface) = created();
        assert_eq!(fog.persistent_alpha_at(&surface, 0, 0), Some(255));
        assert_eq!(fog.persistent_alpha_at(&surface, 399, 299), Some(255));
        assert_eq!(fog.visible_alpha_at(&surface, 0, 0), Some(0));
        assert!(!fog.is_explored(&surface, 200, 150));
    }

    #[test]
    fn first_update_reveals_around_player() {
        let (mut fog, mut surface) = created();
        assert!(fog.update_fog(&mut surface, &Vec2::new(200.0, 150.0)));
        assert!(fog.is_explored(&surface, 200, 150));
        assert_eq!(fog.visible_alpha_at(&surface, 200, 150), Some(0));
        assert_eq!(fog.visible_alpha_at(&surface, 0, 0), Some(140));
        assert!(!fog.is_explored(&surface, 0, 0));
    }

    #[test]
    fn small_moves_touch_nothing() {
        let (mut fog, mut surface) = created();
        fog.update_fog(&mut surface, &Vec2::new(100.0, 150.0));
        let before = surface.stats();
        assert!(!fog.update_fog(&mut surface, &Vec2::new(102.0, 151.0)));
        assert_eq!(surface.stats(), before);
        assert_eq!(surface.stats().erases, 2);
        assert_eq!(fog.last_player_position(), Some(Vec2::new(100.0, 150.0)));
    }

    #[test]
    fn threshold_move_runs_exactly_one_pass() {
        let (mut fog, mut surface) = created();
        fog.update_fog(&mut surface, &Vec2::new(100.0, 150.0));
        surface.reset_stats();
        assert!(fog.update_fog(&mut surface, &Vec2::new(110.0, 150.0)));
        let stats = surface.stats();
        assert_eq!(stats.clears, 1);
        assert_eq!(stats.fills, 1);
        assert_eq!(stats.erases, 2);
        assert_eq!(fog.updates_applied(), 2);
    }

    #[test]
    fn explored_area_is_never_re_darkened() {
        let (mut fog, mut surface) = created();
        let path = [
            Vec2::new(60.0, 60.0),
            Vec2::new(200.0, 60.0),
            Vec2::new(340.0, 240.0),
            Vec2::new(60.0, 60.0),
            Vec2::new(200.0, 200.0),
        ];
        let mut previous = surface
            .read_buffer(fog.layers().expect("layers").persistent)
            .expect("persistent")
            .clone();
        for position in path {
            fog.update_fog(&mut surface, &position);
            let current = surface
                .read_buffer(fog.layers().expect("layers").persistent)
                .expect("persistent")
                .clone();
            for (now, before) in current.rgba().chunks_exact(4).zip(previous.rgba().chunks_exact(4)) {
                assert!(now[3] <= before[3]);
            }
            previous = current;
        }
        assert!(fog.is_explored(&surface, 60, 60));
        assert!(fog.is_explored(&surface, 340, 240));
        assert_eq!(fog.visible_alpha_at(&surface, 60, 60), Some(140));
    }

    #[test]
    fn second_create_does_not_refill_explored_record() {
        let (mut fog, mut surface) = created();
        fog.update_fog(&mut surface, &Vec2::new(200.0, 150.0));
        fog.create_fog(&mut surface);
        assert!(fog.is_explored(&surface, 200, 150));
        assert_eq!(surface.buffer_count(), 2);
    }

    #[test]
    fn positions_outside_the_world_are_harmless() {
        let (mut fog, mut surface) = created();
        assert!(fog.update_fog(&mut surface, &Vec2::new(-500.0, -500.0)));
        assert!(fog.update_fog(&mut surface, &Vec2::new(5000.0, 5000.0)));
        assert!(!fog.is_explored(&surface, 0, 0));
    }

    #[test]
    fn present_composites_the_camera_window() {
        let (mut fog, mut surface) = created();
        fog.update_fog(&mut surface, &Vec2::new(150.0, 150.0));
        let camera = Camera2D::new(Vec2::new(100.0, 100.0), Viewport::new(100, 100));
        let target = surface.create_buffer(100, 100);
        assert!(fog.present(&mut surface, target, &camera));
        let frame = surface.read_buffer(target).expect("target");
        assert_eq!(frame.alpha_at(50, 50), Some(0));
        assert_eq!(frame.alpha_at(0, 0), Some(255));
    }

    #[test]
    fn destroy_releases_buffers_and_stencil() {
        let (mut fog, mut surface) = created();
        fog.update_fog(&mut surface, &Vec2::new(10.0, 10.0));
        fog.destroy(&mut surface);
        assert_eq!(surface.buffer_count(), 0);
        assert_eq!(surface.sprite_count(), 0);
        assert!(!fog.update_fog(&mut surface, &Vec2::new(100.0, 100.0)));

        let mut never_created = FogOfWar::new(small_config());
        never_created.destroy(&mut surface);
    }

    #[test]
    fn zero_reveal_radius_still_tints_without_erasing() {
        let mut surface = SoftwareSurface::new();
        let mut fog = FogOfWar::new(FogConfig {
            reveal_radius: 0.0,
            ..small_config()
        });
        fog.create_fog(&mut surface);
        assert!(fog.update_fog(&mut surface, &Vec2::new(50.0, 50.0)));
        assert_eq!(surface.stats().erases, 0);
        assert!(!fog.is_explored(&surface, 50, 50));
    }
}
