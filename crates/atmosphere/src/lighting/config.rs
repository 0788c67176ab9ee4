use serde::{Deserialize, Serialize};

use super::scheduler::DEFAULT_CAMERA_MOTION_THRESHOLD;

pub const DEFAULT_AMBIENT_DARKNESS: f32 = 0.7;
pub const DEFAULT_LIGHT_RADIUS: f32 = 100.0;
pub const DEFAULT_FLICKER_AMOUNT: f32 = 3.0;
pub const DEFAULT_LIGHT_COLOR: u32 = 0xFFAA55;
pub const DEFAULT_DYNAMIC_LIGHT_COLOR: u32 = 0xFFFFFF;
pub const DEFAULT_UPDATE_FREQUENCY: u32 = 2;
pub const DEFAULT_PERF_LOG_INTERVAL_RECOMPUTES: u32 = 300;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityMode {
    /// Ten concentric rings with quadratic alpha falloff.
    #[default]
    Smooth,
    /// One flat circle at full intensity.
    Simple,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    pub ambient_darkness: f32,
    pub default_light_radius: f32,
    pub enable_flicker: bool,
    pub flicker_amount: f32,
    pub light_color: u32,
    pub dynamic_light_color: u32,
    pub quality_mode: QualityMode,
    pub update_frequency: u32,
    pub camera_motion_threshold: f32,
    pub flicker_seed: Option<u64>,
    pub perf_log_interval_recomputes: u32,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            ambient_darkness: DEFAULT_AMBIENT_DARKNESS,
            default_light_radius: DEFAULT_LIGHT_RADIUS,
            enable_flicker: true,
            flicker_amount: DEFAULT_FLICKER_AMOUNT,
            light_color: DEFAULT_LIGHT_COLOR,
            dynamic_light_color: DEFAULT_DYNAMIC_LIGHT_COLOR,
            quality_mode: QualityMode::Smooth,
            update_frequency: DEFAULT_UPDATE_FREQUENCY,
            camera_motion_threshold: DEFAULT_CAMERA_MOTION_THRESHOLD,
            flicker_seed: None,
            perf_log_interval_recomputes: DEFAULT_PERF_LOG_INTERVAL_RECOMPUTES,
        }
    }
}

impl LightingConfig {
    /// Brings every field into its valid range without rejecting anything.
    pub fn sanitized(mut self) -> Self {
        self.ambient_darkness = clamp_unit(self.ambient_darkness);
        self.update_frequency = self.update_frequency.max(1);
        self.default_light_radius = non_negative_or(self.default_light_radius, DEFAULT_LIGHT_RADIUS);
        self.flicker_amount = non_negative_or(self.flicker_amount, 0.0);
        self.camera_motion_threshold =
            non_negative_or(self.camera_motion_threshold, DEFAULT_CAMERA_MOTION_THRESHOLD);
        self.light_color &= 0xFF_FFFF;
        self.dynamic_light_color &= 0xFF_FFFF;
        self
    }
}

pub(crate) fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

fn non_negative_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_clamps_out_of_range_values() {
        let config = LightingConfig {
            ambient_darkness: 1.5,
            update_frequency: 0,
            flicker_amount: -2.0,
            default_light_radius: f32::INFINITY,
            light_color: 0x12FF_AA55,
            ..LightingConfig::default()
        }
        .sanitized();

        assert_eq!(config.ambient_darkness, 1.0);
        assert_eq!(config.update_frequency, 1);
        assert_eq!(config.flicker_amount, 0.0);
        assert_eq!(config.default_light_radius, DEFAULT_LIGHT_RADIUS);
        assert_eq!(config.light_color, 0xFFAA55);
    }

    #[test]
    fn clamp_unit_maps_nan_to_zero() {
        assert_eq!(clamp_unit(f32::NAN), 0.0);
        assert_eq!(clamp_unit(-0.5), 0.0);
        assert_eq!(clamp_unit(0.25), 0.25);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: LightingConfig =
            serde_json::from_str(r#"{ "quality_mode": "simple", "update_frequency": 4 }"#)
                .expect("parse config");
        assert_eq!(config.quality_mode, QualityMode::Simple);
        assert_eq!(config.update_frequency, 4);
        assert_eq!(config.ambient_darkness, DEFAULT_AMBIENT_DARKNESS);
        assert!(config.enable_flicker);
    }
}
