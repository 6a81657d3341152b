use std::time::Instant;

/// Turns a cumulative byte counter into a bytes/second rate.
///
/// The first update after construction or [`reset`](Self::reset) has no
/// baseline and yields `0.0`. A counter that goes backwards (device
/// replugged, interface removed) also yields `0.0` and becomes the new
/// baseline.
#[derive(Debug, Clone, Default)]
pub struct RateCounter {
    last: Option<(u64, Instant)>,
}

impl RateCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.last = None;
    }

    pub fn update(&mut self, cumulative: u64, now: Instant) -> f64 {
        let rate = match self.last {
            Some((prev, at)) => {
                let dt = now.saturating_duration_since(at).as_secs_f64();
                if dt > 0.0 && cumulative >= prev {
                    (cumulative - prev) as f64 / dt
                } else {
                    0.0
                }
            }
            None => 0.0,
        };
        self.last = Some((cumulative, now));
        rate
    }
}

/// A pair of counters sampled together (read/write, sent/received).
#[derive(Debug, Clone, Default)]
pub struct DualRate {
    pub first:  RateCounter,
    pub second: RateCounter,
}

impl DualRate {
    pub fn reset(&mut self) {
        self.first.reset();
        self.second.reset();
    }

    pub fn update(&mut self, first: u64, second: u64, now: Instant) -> (f64, f64) {
        (self.first.update(first, now), self.second.update(second, now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn first_update_reports_zero() {
        let mut c = RateCounter::new();
        assert_eq!(c.update(123_456, Instant::now()), 0.0);
    }

    #[test]
    fn counter_reset_clamps_to_zero() {
        let t0 = Instant::now();
        let mut c = RateCounter::new();
        let rates: Vec<f64> = [1000, 1500, 1200, 1800]
            .iter()
            .enumerate()
            .map(|(i, &bytes)| c.update(bytes, t0 + Duration::from_secs(i as u64)))
            .collect();
        assert_eq!(rates, vec![0.0, 500.0, 0.0, 600.0]);
    }

    #[test]
    fn rate_scales_with_elapsed_time() {
        let t0 = Instant::now();
        let mut c = RateCounter::new();
        c.update(0, t0);
        assert_eq!(c.update(1000, t0 + Duration::from_millis(500)), 2000.0);
    }

    #[test]
    fn zero_elapsed_reports_zero() {
        let t0 = Instant::now();
        let mut c = RateCounter::new();
        c.update(100, t0);
        assert_eq!(c.update(200, t0), 0.0);
    }

    #[test]
    fn reset_drops_baseline() {
        let t0 = Instant::now();
        let mut c = RateCounter::new();
        c.update(100, t0);
        c.reset();
        assert_eq!(c.update(900, t0 + Duration::from_secs(1)), 0.0);
    }

    #[test]
    fn dual_rate_tracks_both_counters() {
        let t0 = Instant::now();
        let mut d = DualRate::default();
        d.update(10, 20, t0);
        assert_eq!(d.update(110, 20, t0 + Duration::from_secs(1)), (100.0, 0.0));
    }
}
