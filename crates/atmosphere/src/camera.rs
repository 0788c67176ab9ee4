use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Self) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Read-only view of the host camera: the world-space scroll offset of the
/// top-left screen corner and the output size in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Camera2D {
    pub scroll: Vec2,
    pub viewport: Viewport,
}

impl Camera2D {
    pub fn new(scroll: Vec2, viewport: Viewport) -> Self {
        Self { scroll, viewport }
    }

    /// Centres the camera on `target`, keeping the view inside
    /// `world_size` when the world is larger than the viewport.
    pub fn follow(&mut self, target: Vec2, world_size: (u32, u32)) {
        let half_w = self.viewport.width as f32 * 0.5;
        let half_h = self.viewport.height as f32 * 0.5;
        let max_x = (world_size.0 as f32 - self.viewport.width as f32).max(0.0);
        let max_y = (world_size.1 as f32 - self.viewport.height as f32).max(0.0);
        self.scroll = Vec2 {
            x: (target.x - half_w).clamp(0.0, max_x),
            y: (target.y - half_h).clamp(0.0, max_y),
        };
    }
}

pub fn world_to_screen(world: Vec2, camera: &Camera2D) -> (i32, i32) {
    let x = world.x - camera.scroll.x;
    let y = world.y - camera.scroll.y;
    (x.round() as i32, y.round() as i32)
}

/// Anything with a world position that can be polled once per update.
pub trait Trackable {
    fn position(&self) -> Vec2;
}

impl Trackable for Vec2 {
    fn position(&self) -> Vec2 {
        *self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scroll_offset_shifts_screen_position() {
        let camera = Camera2D::new(Vec2::new(100.0, 40.0), Viewport::new(320, 240));
        assert_eq!(world_to_screen(Vec2::new(110.0, 50.0), &camera), (10, 10));
        assert_eq!(world_to_screen(Vec2::new(-20.0, 0.0), &camera), (-120, -40));
    }

    #[test]
    fn follow_clamps_to_world_bounds() {
        let mut camera = Camera2D::new(Vec2::ZERO, Viewport::new(200, 100));
        camera.follow(Vec2::new(10.0, 10.0), (1000, 1000));
        assert_eq!(camera.scroll, Vec2::ZERO);

        camera.follow(Vec2::new(500.0, 500.0), (1000, 1000));
        assert_eq!(camera.scroll, Vec2::new(400.0, 450.0));

        camera.follow(Vec2::new(990.0, 990.0), (1000, 1000));
        assert_eq!(camera.scroll, Vec2::new(800.0, 900.0));
    }

    #[test]
    fn distance_is_euclidean() {
        assert_eq!(Vec2::new(0.0, 0.0).distance(Vec2::new(3.0, 4.0)), 5.0);
    }
}
