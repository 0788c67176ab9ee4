use super::config::LightingConfig;

const DEFAULT_INTENSITY: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LightId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightKind {
    Static,
    Dynamic,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSource {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    /// Packed `0xRRGGBB`.
    pub color: u32,
    pub intensity: f32,
    pub flicker: bool,
    pub flicker_amount: f32,
}

/// Per-light overrides; unset fields fall back to engine defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LightOptions {
    pub color: Option<u32>,
    pub intensity: Option<f32>,
    pub flicker: Option<bool>,
    pub flicker_amount: Option<f32>,
}

impl LightOptions {
    pub fn with_color(mut self, color: u32) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_intensity(mut self, intensity: f32) -> Self {
        self.intensity = Some(intensity);
        self
    }

    pub fn with_flicker(mut self, flicker: bool) -> Self {
        self.flicker = Some(flicker);
        self
    }

    pub fn with_flicker_amount(mut self, flicker_amount: f32) -> Self {
        self.flicker_amount = Some(flicker_amount);
        self
    }
}

/// Defaults applied to a new descriptor. Static and dynamic lights differ
/// only here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct LightDefaults {
    pub color: u32,
    pub flicker: bool,
    pub flicker_amount: f32,
}

impl LightDefaults {
    pub(crate) fn for_kind(config: &LightingConfig, kind: LightKind) -> Self {
        match kind {
            LightKind::Static => Self {
                color: config.light_color,
                flicker: config.enable_flicker,
                flicker_amount: config.flicker_amount,
            },
            LightKind::Dynamic => Self {
                color: config.dynamic_light_color,
                flicker: false,
                flicker_amount: config.flicker_amount,
            },
        }
    }

    pub(crate) fn for_player(config: &LightingConfig) -> Self {
        Self {
            color: config.light_color,
            flicker: config.enable_flicker,
            flicker_amount: config.flicker_amount,
        }
    }
}

impl LightSource {
    pub(crate) fn from_options(
        x: f32,
        y: f32,
        radius: f32,
        options: LightOptions,
        defaults: LightDefaults,
    ) -> Self {
        let intensity = options
            .intensity
            .filter(|value| value.is_finite() && *value > 0.0)
            .unwrap_or(DEFAULT_INTENSITY);
        let flicker_amount = options
            .flicker_amount
            .filter(|value| value.is_finite())
            .unwrap_or(defaults.flicker_amount)
            .max(0.0);
        Self {
            x,
            y,
            radius: sanitize_radius(radius),
            color: options.color.unwrap_or(defaults.color) & 0xFF_FFFF,
            intensity,
            flicker: options.flicker.unwrap_or(defaults.flicker),
            flicker_amount,
        }
    }
}

pub(crate) fn sanitize_radius(radius: f32) -> f32 {
    if radius.is_finite() {
        radius.max(0.0)
    } else {
        0.0
    }
}

/// Read-only copy of every registered light.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LightsSnapshot {
    pub player: Option<LightSource>,
    pub static_lights: Vec<(LightId, LightSource)>,
    pub dynamic_lights: Vec<(LightId, LightSource)>,
}

impl LightsSnapshot {
    pub fn total(&self) -> usize {
        usize::from(self.player.is_some()) + self.static_lights.len() + self.dynamic_lights.len()
    }
}

#[derive(Debug, Default)]
pub struct LightRegistry {
    player: Option<LightSource>,
    static_lights: Vec<(LightId, LightSource)>,
    dynamic_lights: Vec<(LightId, LightSource)>,
    next_id: u64,
}

impl LightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, kind: LightKind, light: LightSource) -> LightId {
        let id = LightId(self.next_id);
        self.next_id += 1;
        match kind {
            LightKind::Static => self.static_lights.push((id, light)),
            LightKind::Dynamic => self.dynamic_lights.push((id, light)),
        }
        id
    }

    /// Removes the first light with `id` from either collection.
    pub fn remove(&mut self, id: LightId) -> bool {
        for lights in [&mut self.static_lights, &mut self.dynamic_lights] {
            if let Some(index) = lights.iter().position(|(light_id, _)| *light_id == id) {
                lights.swap_remove(index);
                return true;
            }
        }
        false
    }

    pub fn get_mut(&mut self, id: LightId) -> Option<&mut LightSource> {
        self.static_lights
            .iter_mut()
            .chain(self.dynamic_lights.iter_mut())
            .find(|(light_id, _)| *light_id == id)
            .map(|(_, light)| light)
    }

    pub fn clear_static(&mut self) -> usize {
        let removed = self.static_lights.len();
        self.static_lights.clear();
        removed
    }

    pub fn clear_dynamic(&mut self) -> usize {
        let removed = self.dynamic_lights.len();
        self.dynamic_lights.clear();
        removed
    }

    /// Creates the player light on first call and mutates it in place
    /// afterwards. `None` keeps the previous radius.
    pub(crate) fn set_player(
        &mut self,
        x: f32,
        y: f32,
        radius: Option<f32>,
        create: impl FnOnce() -> LightSource,
    ) -> bool {
        match self.player.as_mut() {
            Some(player) => {
                let radius = radius.map(sanitize_radius).unwrap_or(player.radius);
                let changed = player.x != x || player.y != y || player.radius != radius;
                player.x = x;
                player.y = y;
                player.radius = radius;
                changed
            }
            None => {
                let mut light = create();
                light.x = x;
                light.y = y;
                if let Some(radius) = radius {
                    light.radius = sanitize_radius(radius);
                }
                self.player = Some(light);
                true
            }
        }
    }

    pub fn set_player_radius(&mut self, radius: f32) -> bool {
        let Some(player) = self.player.as_mut() else {
            return false;
        };
        player.radius = sanitize_radius(radius);
        true
    }

    pub fn remove_player(&mut self) -> bool {
        self.player.take().is_some()
    }

    pub fn player(&self) -> Option<&LightSource> {
        self.player.as_ref()
    }

    pub fn static_lights(&self) -> impl Iterator<Item = &(LightId, LightSource)> {
        self.static_lights.iter()
    }

    pub fn dynamic_lights(&self) -> impl Iterator<Item = &(LightId, LightSource)> {
        self.dynamic_lights.iter()
    }

    pub fn has_dynamic(&self) -> bool {
        !self.dynamic_lights.is_empty()
    }

    pub fn len(&self) -> usize {
        usize::from(self.player.is_some()) + self.static_lights.len() + self.dynamic_lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Draw order: static, dynamic, then the player light on top.
    pub fn iter(&self) -> impl Iterator<Item = &LightSource> {
        self.static_lights
            .iter()
            .chain(self.dynamic_lights.iter())
            .map(|(_, light)| light)
            .chain(self.player.iter())
    }

    pub fn snapshot(&self) -> LightsSnapshot {
        LightsSnapshot {
            player: self.player,
            static_lights: self.static_lights.clone(),
            dynamic_lights: self.dynamic_lights.clone(),
        }
    }

    pub fn clear(&mut self) {
        self.player = None;
        self.static_lights.clear();
        self.dynamic_lights.clear();
    }
}
