use std::collections::HashMap;

use tracing::{debug, warn};

use crate::raster::{unpack_rgb, Canvas};
use crate::surface::Surface;

use super::config::QualityMode;

const SMOOTH_RING_COUNT: u32 = 10;
const INTENSITY_STEPS_PER_UNIT: f32 = 1000.0;
const SPRITE_NAME_PREFIX: &str = "light_gradient";
/// Larger radii are skipped rather than baked; a sprite of side `2 * r`
/// past this size would cost hundreds of megabytes.
pub const MAX_SPRITE_RADIUS: u32 = 2048;

/// Structural cache key. Intensity is quantized to thousandths so the key
/// stays hashable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GradientKey {
    pub mode: QualityMode,
    pub radius: u32,
    pub color: u32,
    pub intensity_milli: u32,
}

impl GradientKey {
    pub fn new(mode: QualityMode, radius: u32, color: u32, intensity: f32) -> Self {
        let intensity_milli = if intensity.is_finite() {
            (intensity.max(0.0) * INTENSITY_STEPS_PER_UNIT).round() as u32
        } else {
            0
        };
        Self {
            mode,
            radius,
            color: color & 0xFF_FFFF,
            intensity_milli,
        }
    }

    pub fn intensity(&self) -> f32 {
        self.intensity_milli as f32 / INTENSITY_STEPS_PER_UNIT
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GradientCacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub regenerations: u64,
    pub oversized_skips: u64,
}

/// Memoizes baked light sprites by [`GradientKey`]. Entries live until
/// [`GradientCache::clear`].
#[derive(Debug)]
pub struct GradientCache {
    mode: QualityMode,
    entries: HashMap<GradientKey, String>,
    name_counter: u64,
    hits: u64,
    misses: u64,
    regenerations: u64,
    oversized_skips: u64,
}

impl GradientCache {
    pub fn new(mode: QualityMode) -> Self {
        Self {
            mode,
            entries: HashMap::new(),
            name_counter: 0,
            hits: 0,
            misses: 0,
            regenerations: 0,
            oversized_skips: 0,
        }
    }

    pub fn mode(&self) -> QualityMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &GradientKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn stats(&self) -> GradientCacheStats {
        GradientCacheStats {
            entries: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
            regenerations: self.regenerations,
            oversized_skips: self.oversized_skips,
        }
    }

    /// Returns the sprite name for the given parameters, baking it on a miss.
    /// A stored name the surface no longer knows is treated as a miss.
    /// Zero radius and radii above [`MAX_SPRITE_RADIUS`] yield `None`.
    pub fn resolve(
        &mut self,
        surface: &mut dyn Surface,
        radius: u32,
        color: u32,
        intensity: f32,
    ) -> Option<&str> {
        if radius == 0 {
            return None;
        }
        if radius > MAX_SPRITE_RADIUS {
            if self.oversized_skips == 0 {
                warn!(
                    radius,
                    max_radius = MAX_SPRITE_RADIUS,
                    "gradient_radius_too_large_skipping"
                );
            }
            self.oversized_skips += 1;
            return None;
        }
        let key = GradientKey::new(self.mode, radius, color, intensity);

        let resident = match self.entries.get(&key) {
            Some(name) if surface.has_sprite(name) => true,
            Some(name) => {
                warn!(
                    sprite = name.as_str(),
                    radius, color, "gradient_cache_sprite_evicted_regenerating"
                );
                self.regenerations += 1;
                false
            }
            None => false,
        };
        if resident {
            self.hits += 1;
            return self.entries.get(&key).map(String::as_str);
        }

        self.misses += 1;
        let name = self.next_free_name(surface);
        let canvas = render_gradient(key.mode, key.radius, key.color, key.intensity());
        if let Err(error) = surface.bake_sprite(&name, canvas) {
            warn!(sprite = name.as_str(), error = %error, "gradient_bake_failed");
            self.entries.remove(&key);
            return None;
        }
        debug!(
            sprite = name.as_str(),
            mode = ?key.mode,
            radius,
            color,
            intensity_milli = key.intensity_milli,
            "gradient_baked"
        );
        self.entries.insert(key, name);
        self.entries.get(&key).map(String::as_str)
    }

    /// Removes every baked sprite from the surface and empties the cache.
    pub fn clear(&mut self, surface: &mut dyn Surface) -> usize {
        let mut removed = 0;
        for (_, name) in self.entries.drain() {
            if surface.remove_sprite(&name) {
                removed += 1;
            }
        }
        removed
    }

    fn next_free_name(&mut self, surface: &dyn Surface) -> String {
        loop {
            let name = format!("{SPRITE_NAME_PREFIX}_{}", self.name_counter);
            self.name_counter += 1;
            if !surface.has_sprite(&name) {
                return name;
            }
            warn!(sprite = name.as_str(), "gradient_sprite_name_taken_skipping");
        }
    }
}

/// Renders a light sprite of side `2 * radius` centred in the canvas.
pub fn render_gradient(mode: QualityMode, radius: u32, color: u32, intensity: f32) -> Canvas {
    let side = radius.saturating_mul(2);
    let mut canvas = Canvas::new(side, side);
    if radius == 0 {
        return canvas;
    }
    let rgb = unpack_rgb(color);
    let center = radius as f32;
    match mode {
        QualityMode::Smooth => {
            for (ratio, alpha) in smooth_rings(intensity) {
                canvas.fill_circle(center, center, radius as f32 * ratio, rgb, alpha);
            }
        }
        QualityMode::Simple => {
            canvas.fill_circle(center, center, radius as f32, rgb, intensity);
        }
    }
    canvas
}

/// `(radius ratio, alpha)` per ring, outermost first: quadratic falloff,
/// so the full-radius ring is transparent and the innermost is densest.
fn smooth_rings(intensity: f32) -> impl Iterator<Item = (f32, f32)> {
    (1..=SMOOTH_RING_COUNT).rev().map(move |step| {
        let ratio = step as f32 / SMOOTH_RING_COUNT as f32;
        let falloff = 1.0 - ratio;
        (ratio, intensity * falloff * falloff)
    })
}
