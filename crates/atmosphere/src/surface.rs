use std::collections::HashMap;

use tracing::trace;

use crate::error::SurfaceError;
use crate::raster::{unpack_rgb, BlendMode, Canvas, PixelRect};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(u32);

/// Drawable-surface factory provided by the host renderer.
///
/// Offscreen buffers are addressed by [`BufferId`]; baked sprites are
/// addressed by string name and stay resident until removed.
pub trait Surface {
    fn create_buffer(&mut self, width: u32, height: u32) -> BufferId;
    fn release_buffer(&mut self, buffer: BufferId) -> bool;
    fn buffer_size(&self, buffer: BufferId) -> Option<(u32, u32)>;
    fn clear(&mut self, buffer: BufferId);
    fn fill_rect(&mut self, buffer: BufferId, rect: PixelRect, color: u32, alpha: f32);
    fn blit_sprite(
        &mut self,
        buffer: BufferId,
        sprite: &str,
        center: (i32, i32),
        blend: BlendMode,
    ) -> bool;
    /// Draws `src` onto `dst` with the source's top-left corner at `offset`.
    fn composite(
        &mut self,
        dst: BufferId,
        src: BufferId,
        offset: (i32, i32),
        blend: BlendMode,
    ) -> bool;
    /// Punches the named stencil sprite into `buffer`, centred on `center`.
    fn erase(&mut self, buffer: BufferId, stencil: &str, center: (i32, i32)) -> bool;
    fn bake_sprite(&mut self, name: &str, canvas: Canvas) -> Result<(), SurfaceError>;
    fn has_sprite(&self, name: &str) -> bool;
    fn remove_sprite(&mut self, name: &str) -> bool;
    fn read_buffer(&self, buffer: BufferId) -> Option<&Canvas>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SurfaceStats {
    pub buffers_created: u64,
    pub buffers_released: u64,
    pub clears: u64,
    pub fills: u64,
    pub last_fill_alpha: Option<f32>,
    pub blits: u64,
    pub composites: u64,
    pub erases: u64,
    pub sprites_baked: u64,
    pub sprites_removed: u64,
}

impl SurfaceStats {
    /// Number of operations that changed buffer contents.
    pub fn buffer_mutations(&self) -> u64 {
        self.clears + self.fills + self.blits + self.composites + self.erases
    }
}

/// CPU implementation of [`Surface`] backed by [`Canvas`] buffers.
#[derive(Debug, Default)]
pub struct SoftwareSurface {
    buffers: HashMap<BufferId, Canvas>,
    sprites: HashMap<String, Canvas>,
    next_buffer_id: u32,
    stats: SurfaceStats,
}

impl SoftwareSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> SurfaceStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = SurfaceStats::default();
    }

    pub fn sprite_count(&self) -> usize {
        self.sprites.len()
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn sprite(&self, name: &str) -> Option<&Canvas> {
        self.sprites.get(name)
    }

    pub fn sprite_names(&self) -> impl Iterator<Item = &str> {
        self.sprites.keys().map(String::as_str)
    }
}

impl Surface for SoftwareSurface {
    fn create_buffer(&mut self, width: u32, height: u32) -> BufferId {
        let id = BufferId(self.next_buffer_id);
        self.next_buffer_id = self.next_buffer_id.wrapping_add(1);
        self.buffers.insert(id, Canvas::new(width, height));
        self.stats.buffers_created += 1;
        trace!(buffer = id.0, width, height, "surface_buffer_created");
        id
    }

    fn release_buffer(&mut self, buffer: BufferId) -> bool {
        let released = self.buffers.remove(&buffer).is_some();
        if released {
            self.stats.buffers_released += 1;
        }
        released
    }

    fn buffer_size(&self, buffer: BufferId) -> Option<(u32, u32)> {
        self.buffers
            .get(&buffer)
            .map(|canvas| (canvas.width(), canvas.height()))
    }

    fn clear(&mut self, buffer: BufferId) {
        if let Some(canvas) = self.buffers.get_mut(&buffer) {
            canvas.clear();
            self.stats.clears += 1;
        }
    }

    fn fill_rect(&mut self, buffer: BufferId, rect: PixelRect, color: u32, alpha: f32) {
        if let Some(canvas) = self.buffers.get_mut(&buffer) {
            canvas.fill_rect(rect, unpack_rgb(color), alpha);
            self.stats.fills += 1;
            self.stats.last_fill_alpha = Some(alpha);
        }
    }

    fn blit_sprite(
        &mut self,
        buffer: BufferId,
        sprite: &str,
        center: (i32, i32),
        blend: BlendMode,
    ) -> bool {
        let (Some(canvas), Some(sprite)) = (self.buffers.get_mut(&buffer), self.sprites.get(sprite))
        else {
            return false;
        };
        canvas.blit_centered(sprite, center.0, center.1, blend);
        self.stats.blits += 1;
        true
    }

    fn composite(
        &mut self,
        dst: BufferId,
        src: BufferId,
        offset: (i32, i32),
        blend: BlendMode,
    ) -> bool {
        if dst == src || !self.buffers.contains_key(&dst) {
            return false;
        }
        let Some(source) = self.buffers.remove(&src) else {
            return false;
        };
        if let Some(target) = self.buffers.get_mut(&dst) {
            target.composite_at(&source, offset.0, offset.1, blend);
        }
        self.buffers.insert(src, source);
        self.stats.composites += 1;
        true
    }

    fn erase(&mut self, buffer: BufferId, stencil: &str, center: (i32, i32)) -> bool {
        let (Some(canvas), Some(stencil)) = (self.buffers.get_mut(&buffer), self.sprites.get(stencil))
        else {
            return false;
        };
        canvas.erase_centered(stencil, center.0, center.1);
        self.stats.erases += 1;
        true
    }

    fn bake_sprite(&mut self, name: &str, canvas: Canvas) -> Result<(), SurfaceError> {
        if canvas.is_empty() {
            return Err(SurfaceError::EmptySprite {
                name: name.to_string(),
            });
        }
        if self.sprites.contains_key(name) {
            return Err(SurfaceError::SpriteNameTaken {
                name: name.to_string(),
            });
        }
        self.sprites.insert(name.to_string(), canvas);
        self.stats.sprites_baked += 1;
        trace!(sprite = name, "surface_sprite_baked");
        Ok(())
    }

    fn has_sprite(&self, name: &str) -> bool {
        self.sprites.contains_key(name)
    }

    fn remove_sprite(&mut self, name: &str) -> bool {
        let removed = self.sprites.remove(name).is_some();
        if removed {
            self.stats.sprites_removed += 1;
        }
        removed
    }

    fn read_buffer(&self, buffer: BufferId) -> Option<&Canvas> {
        self.buffers.get(&buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_sprite(size: u32) -> Canvas {
        let mut canvas = Canvas::new(size, size);
        canvas.fill([255, 255, 255], 1.0);
        canvas
    }

    #[test]
    fn buffer_ids_are_unique() {
        let mut surface = SoftwareSurface::new();
        let a = surface.create_buffer(4, 4);
        let b = surface.create_buffer(4, 4);
        assert_ne!(a, b);
        assert_eq!(surface.buffer_size(a), Some((4, 4)));
        assert!(surface.release_buffer(a));
        assert!(!surface.release_buffer(a));
        assert_eq!(surface.buffer_count(), 1);
    }

    #[test]
    fn bake_rejects_duplicate_and_empty_sprites() {
        let mut surface = SoftwareSurface::new();
        surface.bake_sprite("glow", solid_sprite(2)).expect("first bake");
        assert_eq!(
            surface.bake_sprite("glow", solid_sprite(2)),
            Err(SurfaceError::SpriteNameTaken {
                name: "glow".to_string()
            })
        );
        assert_eq!(
            surface.bake_sprite("empty", Canvas::new(0, 0)),
            Err(SurfaceError::EmptySprite {
                name: "empty".to_string()
            })
        );
        assert_eq!(surface.stats().sprites_baked, 1);
    }

    #[test]
    fn blit_of_missing_sprite_reports_false() {
        let mut surface = SoftwareSurface::new();
        let buffer = surface.create_buffer(4, 4);
        assert!(!surface.blit_sprite(buffer, "missing", (2, 2), BlendMode::Normal));
        assert_eq!(surface.stats().blits, 0);
    }

    #[test]
    fn composite_onto_self_is_rejected() {
        let mut surface = SoftwareSurface::new();
        let buffer = surface.create_buffer(4, 4);
        assert!(!surface.composite(buffer, buffer, (0, 0), BlendMode::Normal));
    }

    #[test]
    fn composite_keeps_source_buffer_alive() {
        let mut surface = SoftwareSurface::new();
        let dst = surface.create_buffer(4, 4);
        let src = surface.create_buffer(2, 2);
        surface.fill_rect(src, PixelRect::from_size(2, 2), 0xFFFFFF, 1.0);
        assert!(surface.composite(dst, src, (1, 1), BlendMode::Normal));
        assert!(surface.read_buffer(src).is_some());
        let target = surface.read_buffer(dst).expect("dst");
        assert_eq!(target.alpha_at(1, 1), Some(255));
        assert_eq!(target.alpha_at(0, 0), Some(0));
    }

    #[test]
    fn erase_with_stencil_counts_operations() {
        let mut surface = SoftwareSurface::new();
        let buffer = surface.create_buffer(8, 8);
        surface.fill_rect(buffer, PixelRect::from_size(8, 8), 0x000000, 1.0);
        surface.bake_sprite("hole", solid_sprite(2)).expect("bake");
        assert!(surface.erase(buffer, "hole", (4, 4)));
        assert_eq!(surface.stats().erases, 1);
        let canvas = surface.read_buffer(buffer).expect("buffer");
        assert_eq!(canvas.alpha_at(4, 4), Some(0));
        assert_eq!(canvas.alpha_at(0, 0), Some(255));
    }

    #[test]
    fn fill_records_requested_alpha() {
        let mut surface = SoftwareSurface::new();
        let buffer = surface.create_buffer(2, 2);
        surface.fill_rect(buffer, PixelRect::from_size(2, 2), 0x000000, 0.25);
        assert_eq!(surface.stats().last_fill_alpha, Some(0.25));
    }
}
