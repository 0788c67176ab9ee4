use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct FrameMetricsSnapshot {
    pub(crate) fps: f32,
    pub(crate) frame_time_ms: f32,
    pub(crate) lighting_recomputes: u32,
    pub(crate) fog_updates: u32,
}

#[derive(Debug)]
pub(crate) struct FrameMetricsAccumulator {
    interval_start: Instant,
    interval: Duration,
    frames: u32,
    lighting_recomputes: u32,
    fog_updates: u32,
    frame_time_sum: Duration,
}

impl FrameMetricsAccumulator {
    pub(crate) fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval_start: now,
            interval,
            frames: 0,
            lighting_recomputes: 0,
            fog_updates: 0,
            frame_time_sum: Duration::ZERO,
        }
    }

    pub(crate) fn record_frame(&mut self, frame_dt: Duration) {
        self.frames = self.frames.saturating_add(1);
        self.frame_time_sum = self.frame_time_sum.saturating_add(frame_dt);
    }

    pub(crate) fn record_scene_work(&mut self, lighting_recomputed: bool, fog_updated: bool) {
        self.lighting_recomputes = self
            .lighting_recomputes
            .saturating_add(u32::from(lighting_recomputed));
        self.fog_updates = self.fog_updates.saturating_add(u32::from(fog_updated));
    }

    pub(crate) fn maybe_snapshot(&mut self, now: Instant) -> Option<FrameMetricsSnapshot> {
        let elapsed = now.saturating_duration_since(self.interval_start);
        if elapsed < self.interval {
            return None;
        }

        let elapsed_seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let frame_time_ms = if self.frames == 0 {
            0.0
        } else {
            (self.frame_time_sum.as_secs_f32() / self.frames as f32) * 1000.0
        };

        let snapshot = FrameMetricsSnapshot {
            fps: self.frames as f32 / elapsed_seconds,
            frame_time_ms,
            lighting_recomputes: self.lighting_recomputes,
            fog_updates: self.fog_updates,
        };

        self.interval_start = now;
        self.frames = 0;
        self.lighting_recomputes = 0;
        self.fog_updates = 0;
        self.frame_time_sum = Duration::ZERO;

        Some(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_computes_expected_values() {
        let base = Instant::now();
        let mut accumulator = FrameMetricsAccumulator::new(Duration::from_secs(1), base);

        accumulator.record_frame(Duration::from_millis(16));
        accumulator.record_frame(Duration::from_millis(16));
        accumulator.record_scene_work(true, false);
        accumulator.record_scene_work(false, true);
        accumulator.record_scene_work(true, true);

        let snapshot = accumulator
            .maybe_snapshot(base + Duration::from_secs(1))
            .expect("snapshot should be emitted");

        assert!((snapshot.fps - 2.0).abs() < 0.05);
        assert!((snapshot.frame_time_ms - 16.0).abs() < 0.001);
        assert_eq!(snapshot.lighting_recomputes, 2);
        assert_eq!(snapshot.fog_updates, 2);
    }

    #[test]
    fn snapshot_not_emitted_before_interval() {
        let base = Instant::now();
        let mut accumulator = FrameMetricsAccumulator::new(Duration::from_secs(1), base);
        accumulator.record_frame(Duration::from_millis(16));

        assert!(accumulator
            .maybe_snapshot(base + Duration::from_millis(500))
            .is_none());
    }

    #[test]
    fn counters_reset_after_snapshot() {
        let base = Instant::now();
        let mut accumulator = FrameMetricsAccumulator::new(Duration::from_secs(1), base);
        accumulator.record_frame(Duration::from_millis(10));
        accumulator.record_scene_work(true, true);
        accumulator.maybe_snapshot(base + Duration::from_secs(1));

        let snapshot = accumulator
            .maybe_snapshot(base + Duration::from_secs(2))
            .expect("second snapshot");
        assert_eq!(snapshot.fps, 0.0);
        assert_eq!(snapshot.frame_time_ms, 0.0);
        assert_eq!(snapshot.lighting_recomputes, 0);
    }
}
