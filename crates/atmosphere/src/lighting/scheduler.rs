use crate::camera::Vec2;

pub const DEFAULT_CAMERA_MOTION_THRESHOLD: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecomputeReason {
    Initial,
    Forced,
    Resized,
    CameraMoved,
    DynamicLights,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Cadence,
    NoMotion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateDecision {
    Recompute(RecomputeReason),
    Skip(SkipReason),
}

impl UpdateDecision {
    pub fn is_recompute(self) -> bool {
        matches!(self, Self::Recompute(_))
    }
}

/// Frame-cadence and camera-motion gates for the lighting recompute.
///
/// Every [`UpdateScheduler::poll`] advances the frame counter. A recompute is
/// granted when the cadence gate has elapsed and either the camera moved far
/// enough, a dynamic light exists, or a recompute was forced.
#[derive(Debug, Clone)]
pub struct UpdateScheduler {
    update_frequency: u64,
    motion_threshold: f32,
    frame_counter: u64,
    last_recompute_frame: Option<u64>,
    last_camera: Option<Vec2>,
    forced: bool,
}

impl UpdateScheduler {
    pub fn new(update_frequency: u32, motion_threshold: f32) -> Self {
        Self {
            update_frequency: u64::from(update_frequency.max(1)),
            motion_threshold: motion_threshold.max(0.0),
            frame_counter: 0,
            last_recompute_frame: None,
            last_camera: None,
            forced: false,
        }
    }

    pub fn poll(&mut self, camera_scroll: Vec2, has_dynamic_lights: bool) -> UpdateDecision {
        self.frame_counter += 1;

        if let Some(last) = self.last_recompute_frame {
            if self.frame_counter - last < self.update_frequency {
                return UpdateDecision::Skip(SkipReason::Cadence);
            }
        }

        let reason = match self.last_camera {
            None => RecomputeReason::Initial,
            Some(_) if self.forced => RecomputeReason::Forced,
            Some(last) if last.distance(camera_scroll) >= self.motion_threshold => {
                RecomputeReason::CameraMoved
            }
            Some(_) if has_dynamic_lights => RecomputeReason::DynamicLights,
            Some(_) => return UpdateDecision::Skip(SkipReason::NoMotion),
        };

        self.grant(camera_scroll, reason)
    }

    /// Grants a recompute on this frame regardless of both gates. Used when
    /// the overlay buffers were just reallocated and hold nothing.
    pub fn poll_resized(&mut self, camera_scroll: Vec2) -> UpdateDecision {
        self.frame_counter += 1;
        self.grant(camera_scroll, RecomputeReason::Resized)
    }

    /// Advances the frame counter for a frame on which nothing is evaluated.
    pub fn tick(&mut self) {
        self.frame_counter += 1;
    }

    /// Bypasses the motion gate on the next poll that passes the cadence gate.
    pub fn force(&mut self) {
        self.forced = true;
    }

    pub fn is_forced(&self) -> bool {
        self.forced
    }

    pub fn frame_counter(&self) -> u64 {
        self.frame_counter
    }

    pub fn last_recompute_frame(&self) -> Option<u64> {
        self.last_recompute_frame
    }

    pub fn reset(&mut self) {
        self.frame_counter = 0;
        self.last_recompute_frame = None;
        self.last_camera = None;
        self.forced = false;
    }

    fn grant(&mut self, camera_scroll: Vec2, reason: RecomputeReason) -> UpdateDecision {
        self.last_camera = Some(camera_scroll);
        self.last_recompute_frame = Some(self.frame_counter);
        self.forced = false;
        UpdateDecision::Recompute(reason)
    }
}
