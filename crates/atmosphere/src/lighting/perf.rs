use std::time::Duration;

pub(crate) const PERF_WINDOW_LEN: usize = 120;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RecomputeTimings {
    pub last_ms: f32,
    pub avg_ms: f32,
    pub max_ms: f32,
    pub recomputes: u64,
    pub skipped: u64,
}

/// Rolling window of recompute durations; advisory only.
#[derive(Debug)]
pub(crate) struct RecomputeStats {
    samples_ms: [f32; PERF_WINDOW_LEN],
    head: usize,
    count: usize,
    sum_ms: f32,
    last_ms: f32,
    recomputes: u64,
    skipped: u64,
}

impl Default for RecomputeStats {
    fn default() -> Self {
        Self {
            samples_ms: [0.0; PERF_WINDOW_LEN],
            head: 0,
            count: 0,
            sum_ms: 0.0,
            last_ms: 0.0,
            recomputes: 0,
            skipped: 0,
        }
    }
}

impl RecomputeStats {
    pub(crate) fn record_recompute(&mut self, duration: Duration) {
        let value_ms = duration_to_ms(duration);
        self.last_ms = value_ms;
        self.recomputes += 1;

        if self.count < PERF_WINDOW_LEN {
            self.samples_ms[self.head] = value_ms;
            self.head = (self.head + 1) % PERF_WINDOW_LEN;
            self.count += 1;
            self.sum_ms += value_ms;
            return;
        }

        let evicted = self.samples_ms[self.head];
        self.samples_ms[self.head] = value_ms;
        self.head = (self.head + 1) % PERF_WINDOW_LEN;
        self.sum_ms += value_ms - evicted;
    }

    pub(crate) fn record_skip(&mut self) {
        self.skipped += 1;
    }

    pub(crate) fn recomputes(&self) -> u64 {
        self.recomputes
    }

    pub(crate) fn snapshot(&self) -> RecomputeTimings {
        if self.count == 0 {
            return RecomputeTimings {
                skipped: self.skipped,
                ..RecomputeTimings::default()
            };
        }

        let max_ms = self.samples_ms[..self.count]
            .iter()
            .copied()
            .fold(f32::MIN, f32::max);

        RecomputeTimings {
            last_ms: self.last_ms,
            avg_ms: self.sum_ms / self.count as f32,
            max_ms,
            recomputes: self.recomputes,
            skipped: self.skipped,
        }
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}

fn duration_to_ms(duration: Duration) -> f32 {
    duration.as_secs_f32() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stats_report_only_skips() {
        let mut stats = RecomputeStats::default();
        stats.record_skip();
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.skipped, 1);
        assert_eq!(snapshot.recomputes, 0);
        assert_eq!(snapshot.max_ms, 0.0);
    }

    #[test]
    fn partial_window_average_uses_sample_count() {
        let mut stats = RecomputeStats::default();
        stats.record_recompute(Duration::from_millis(1));
        stats.record_recompute(Duration::from_millis(3));
        let snapshot = stats.snapshot();
        assert!((snapshot.avg_ms - 2.0).abs() < 0.001);
        assert!((snapshot.max_ms - 3.0).abs() < 0.001);
        assert_eq!(snapshot.recomputes, 2);
    }

    #[test]
    fn evicted_max_is_forgotten() {
        let mut stats = RecomputeStats::default();
        stats.record_recompute(Duration::from_millis(100));
        for _ in 1..PERF_WINDOW_LEN {
            stats.record_recompute(Duration::from_millis(10));
        }
        stats.record_recompute(Duration::from_millis(20));
        let snapshot = stats.snapshot();
        assert!((snapshot.max_ms - 20.0).abs() < 0.001);
        assert!((snapshot.last_ms - 20.0).abs() < 0.001);
    }
}
