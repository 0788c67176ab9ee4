use std::f32::consts::TAU;

use atmosphere::{
    BufferId, Camera2D, Canvas, FogOfWar, LightId, LightOptions, LightingEngine, PixelRect,
    SoftwareSurface, Surface, Vec2, Viewport,
};
use tracing::{debug, info};

use super::config::{DemoConfig, SceneConfig};
use super::input::{ActionStates, InputAction};

const GROUND_COLOR_A: u32 = 0x3A4A2E;
const GROUND_COLOR_B: u32 = 0x34432A;
const PATH_COLOR: u32 = 0x6B5A45;
const PLAYER_COLOR: u32 = 0xE8E0D0;
const PLAYER_HALF_SIZE_PX: i32 = 6;
const PATH_EVERY_TILES: i64 = 8;
const AMBIENT_CHANGE_PER_SECOND: f32 = 0.5;
const LANTERN_COLOR: u32 = 0x88BBFF;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct SceneWork {
    pub(crate) lighting_recomputed: bool,
    pub(crate) fog_updated: bool,
}

/// Host scene for the demo: owns the surface, both engines and a walking
/// player, and drives them once per rendered frame.
pub(crate) struct DemoScene {
    config: SceneConfig,
    world_size: (u32, u32),
    surface: SoftwareSurface,
    lighting: LightingEngine,
    fog: FogOfWar,
    camera: Camera2D,
    player: Vec2,
    lantern: Option<LightId>,
    lantern_phase: f32,
    frame: Option<BufferId>,
}

impl DemoScene {
    pub(crate) fn new(config: &DemoConfig, viewport: Viewport) -> Self {
        let world_size = (config.fog.world_width, config.fog.world_height);
        let player = Vec2::new(world_size.0 as f32 * 0.5, world_size.1 as f32 * 0.5);
        let mut camera = Camera2D::new(Vec2::ZERO, viewport);
        camera.follow(player, world_size);
        Self {
            config: config.scene.clone(),
            world_size,
            surface: SoftwareSurface::new(),
            lighting: LightingEngine::new(config.lighting.clone()),
            fog: FogOfWar::new(config.fog.clone()),
            camera,
            player,
            lantern: None,
            lantern_phase: 0.0,
            frame: None,
        }
    }

    pub(crate) fn load(&mut self) {
        let viewport = self.camera.viewport;
        self.frame = Some(self.surface.create_buffer(viewport.width, viewport.height));
        self.lighting.create(&mut self.surface, viewport);
        self.fog.create_fog(&mut self.surface);

        let spacing = self.config.torch_spacing_px.max(1.0);
        let mut torch_count = 0usize;
        let mut y = spacing * 0.5;
        while y < self.world_size.1 as f32 {
            let mut x = spacing * 0.5;
            while x < self.world_size.0 as f32 {
                self.lighting.add_static_light(
                    x,
                    y,
                    self.config.torch_radius,
                    LightOptions::default(),
                );
                torch_count += 1;
                x += spacing;
            }
            y += spacing;
        }

        self.lantern = Some(self.lighting.add_dynamic_light(
            self.player.x + self.config.lantern_orbit_radius,
            self.player.y,
            self.config.lantern_radius,
            LightOptions::default().with_color(LANTERN_COLOR),
        ));
        self.lighting
            .set_player_light(self.player.x, self.player.y, None);

        info!(
            torches = torch_count,
            world_width = self.world_size.0,
            world_height = self.world_size.1,
            "demo_scene_loaded"
        );
    }

    pub(crate) fn update(&mut self, dt_seconds: f32, actions: ActionStates) -> SceneWork {
        let dt_seconds = if dt_seconds.is_finite() {
            dt_seconds.max(0.0)
        } else {
            0.0
        };
        self.move_player(dt_seconds, actions);
        self.camera.follow(self.player, self.world_size);
        self.orbit_lantern(dt_seconds);
        self.adjust_ambient(dt_seconds, actions);

        self.lighting
            .set_player_light(self.player.x, self.player.y, None);
        SceneWork {
            lighting_recomputed: self.lighting.update(&mut self.surface, &self.camera),
            fog_updated: self.fog.update_fog(&mut self.surface, &self.player),
        }
    }

    pub(crate) fn toggle_lighting(&mut self) {
        let enabled = !self.lighting.is_enabled();
        self.lighting.set_enabled(enabled);
        info!(enabled, "demo_lighting_toggled");
    }

    pub(crate) fn resize(&mut self, viewport: Viewport) {
        if viewport.width == 0 || viewport.height == 0 {
            return;
        }
        if let Some(frame) = self.frame.take() {
            self.surface.release_buffer(frame);
        }
        self.frame = Some(self.surface.create_buffer(viewport.width, viewport.height));
        self.camera.viewport = viewport;
        self.camera.follow(self.player, self.world_size);
        debug!(width = viewport.width, height = viewport.height, "demo_scene_resized");
    }

    /// Composes ground, player, lighting and fog into the frame buffer.
    pub(crate) fn render(&mut self) -> Option<&Canvas> {
        let frame = self.frame?;
        self.surface.clear(frame);
        self.draw_ground(frame);
        self.draw_player(frame);
        self.lighting.present(&mut self.surface, frame);
        self.fog.present(&mut self.surface, frame, &self.camera);
        self.surface.read_buffer(frame)
    }

    pub(crate) fn shutdown(&mut self) {
        self.lighting.destroy(&mut self.surface);
        self.fog.destroy(&mut self.surface);
        if let Some(frame) = self.frame.take() {
            self.surface.release_buffer(frame);
        }
    }

    pub(crate) fn lighting(&self) -> &LightingEngine {
        &self.lighting
    }

    #[cfg(test)]
    pub(crate) fn fog(&self) -> &FogOfWar {
        &self.fog
    }

    #[cfg(test)]
    pub(crate) fn surface(&self) -> &SoftwareSurface {
        &self.surface
    }

    #[cfg(test)]
    pub(crate) fn player(&self) -> Vec2 {
        self.player
    }

    fn move_player(&mut self, dt_seconds: f32, actions: ActionStates) {
        let mut direction = Vec2::ZERO;
        if actions.is_down(InputAction::MoveUp) {
            direction.y -= 1.0;
        }
        if actions.is_down(InputAction::MoveDown) {
            direction.y += 1.0;
        }
        if actions.is_down(InputAction::MoveLeft) {
            direction.x -= 1.0;
        }
        if actions.is_down(InputAction::MoveRight) {
            direction.x += 1.0;
        }
        let length = direction.distance(Vec2::ZERO);
        if length <= f32::EPSILON {
            return;
        }
        let step = self.config.player_speed_px_per_second * dt_seconds / length;
        self.player.x = (self.player.x + direction.x * step).clamp(0.0, self.world_size.0 as f32);
        self.player.y = (self.player.y + direction.y * step).clamp(0.0, self.world_size.1 as f32);
    }

    fn orbit_lantern(&mut self, dt_seconds: f32) {
        let Some(lantern) = self.lantern else {
            return;
        };
        let period = self.config.lantern_orbit_seconds.max(0.1);
        self.lantern_phase = (self.lantern_phase + dt_seconds / period * TAU) % TAU;
        let orbit = self.config.lantern_orbit_radius;
        self.lighting.move_light(
            lantern,
            self.player.x + orbit * self.lantern_phase.cos(),
            self.player.y + orbit * self.lantern_phase.sin(),
        );
    }

    fn adjust_ambient(&mut self, dt_seconds: f32, actions: ActionStates) {
        let mut delta = 0.0;
        if actions.is_down(InputAction::DarkenAmbient) {
            delta += AMBIENT_CHANGE_PER_SECOND * dt_seconds;
        }
        if actions.is_down(InputAction::BrightenAmbient) {
            delta -= AMBIENT_CHANGE_PER_SECOND * dt_seconds;
        }
        if delta != 0.0 {
            let current = self.lighting.ambient_darkness();
            self.lighting.set_ambient_darkness(current + delta);
        }
    }

    fn draw_ground(&mut self, frame: BufferId) {
        let tile = i64::from(self.config.tile_size_px.max(1));
        let scroll_x = self.camera.scroll.x.round() as i64;
        let scroll_y = self.camera.scroll.y.round() as i64;
        let first_tx = scroll_x.div_euclid(tile);
        let first_ty = scroll_y.div_euclid(tile);
        let last_tx = (scroll_x + i64::from(self.camera.viewport.width)).div_euclid(tile);
        let last_ty = (scroll_y + i64::from(self.camera.viewport.height)).div_euclid(tile);
        let max_tx = i64::from(self.world_size.0) / tile;
        let max_ty = i64::from(self.world_size.1) / tile;

        for ty in first_ty.max(0)..=last_ty.min(max_ty) {
            for tx in first_tx.max(0)..=last_tx.min(max_tx) {
                let color = if tx % PATH_EVERY_TILES == 0 || ty % PATH_EVERY_TILES == 0 {
                    PATH_COLOR
                } else if (tx + ty) % 2 == 0 {
                    GROUND_COLOR_A
                } else {
                    GROUND_COLOR_B
                };
                let rect = PixelRect::new(
                    (tx * tile - scroll_x) as i32,
                    (ty * tile - scroll_y) as i32,
                    tile as u32,
                    tile as u32,
                );
                self.surface.fill_rect(frame, rect, color, 1.0);
            }
        }
    }

    fn draw_player(&mut self, frame: BufferId) {
        let x = (self.player.x - self.camera.scroll.x).round() as i32;
        let y = (self.player.y - self.camera.scroll.y).round() as i32;
        let side = (PLAYER_HALF_SIZE_PX * 2 + 1) as u32;
        let rect = PixelRect::new(x - PLAYER_HALF_SIZE_PX, y - PLAYER_HALF_SIZE_PX, side, side);
        self.surface.fill_rect(frame, rect, PLAYER_COLOR, 1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atmosphere::{FogConfig, LightingConfig};

    const VIEWPORT: Viewport = Viewport::new(320, 240);

    fn demo_config() -> DemoConfig {
        DemoConfig {
            lighting: LightingConfig {
                flicker_seed: Some(11),
                enable_flicker: false,
                ..LightingConfig::default()
            },
            fog: FogConfig {
                world_width: 1024,
                world_height: 768,
                reveal_radius: 64.0,
                ..FogConfig::default()
            },
            ..DemoConfig::default()
        }
    }

    fn loaded() -> DemoScene {
        let mut scene = DemoScene::new(&demo_config(), VIEWPORT);
        scene.load();
        scene
    }

    #[test]
    fn load_registers_torches_lantern_and_player_light() {
        let scene = loaded();
        let lights = scene.lighting().lights();
        assert_eq!(lights.static_lights.len(), 4 * 3);
        assert_eq!(lights.dynamic_lights.len(), 1);
        assert!(lights.player.is_some());
        assert!(scene.fog().is_created());
    }

    #[test]
    fn movement_reveals_fog_along_the_path() {
        let mut scene = loaded();
        let start = scene.player();
        let work = scene.update(0.0, ActionStates::default());
        assert!(work.lighting_recomputed);
        assert!(work.fog_updated);
        assert!(scene.fog().is_explored(scene.surface(), start.x as i32, start.y as i32));

        let right = ActionStates::default().with_down(InputAction::MoveRight);
        for _ in 0..60 {
            scene.update(1.0 / 60.0, right);
        }
        let end = scene.player();
        assert!(end.x > start.x + 150.0);
        assert!(scene.fog().is_explored(scene.surface(), end.x as i32, end.y as i32));
        assert!(scene.fog().is_explored(scene.surface(), start.x as i32, start.y as i32));
    }

    #[test]
    fn player_is_clamped_to_world() {
        let mut scene = loaded();
        let up_left = ActionStates::default()
            .with_down(InputAction::MoveUp)
            .with_down(InputAction::MoveLeft);
        for _ in 0..600 {
            scene.update(0.1, up_left);
        }
        assert_eq!(scene.player(), Vec2::ZERO);
    }

    #[test]
    fn render_produces_a_full_frame() {
        let mut scene = loaded();
        scene.update(1.0 / 60.0, ActionStates::default());
        let frame = scene.render().expect("frame").clone();
        assert_eq!((frame.width(), frame.height()), (320, 240));
        assert!(frame.rgba().chunks_exact(4).all(|pixel| pixel[3] == 255));
    }

    #[test]
    fn torches_lantern_and_player_bake_at_most_three_sprites() {
        let mut scene = loaded();
        for _ in 0..120 {
            scene.update(1.0 / 60.0, ActionStates::default());
        }
        // torch, lantern and player light differ in colour or radius
        assert!(scene.lighting().cache_stats().entries <= 3);
    }

    #[test]
    fn ambient_keys_change_darkness_within_bounds() {
        let mut scene = loaded();
        let darken = ActionStates::default().with_down(InputAction::DarkenAmbient);
        for _ in 0..100 {
            scene.update(0.1, darken);
        }
        assert_eq!(scene.lighting().ambient_darkness(), 1.0);
    }

    #[test]
    fn shutdown_releases_everything() {
        let mut scene = loaded();
        scene.update(1.0 / 60.0, ActionStates::default());
        scene.render();
        scene.shutdown();
        assert_eq!(scene.surface().buffer_count(), 0);
        assert_eq!(scene.surface().sprite_count(), 0);
        assert!(scene.render().is_none());
    }

    #[test]
    fn resize_reallocates_frame() {
        let mut scene = loaded();
        scene.resize(Viewport::new(200, 100));
        scene.update(1.0 / 60.0, ActionStates::default());
        let frame = scene.render().expect("frame");
        assert_eq!((frame.width(), frame.height()), (200, 100));
    }
}
