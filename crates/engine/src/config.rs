use hostmon_config::SamplingConfig;
use hostmon_core::{DEFAULT_DURATION_BUDGET, DEFAULT_INTERVAL};
use std::time::Duration;

const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(900);

/// Timing parameters for one sampling engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub interval:        Duration,
    pub duration_budget: Duration,
    /// Upper bound for one probe call; never longer than `interval`.
    pub probe_timeout:   Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(DEFAULT_INTERVAL, DEFAULT_DURATION_BUDGET)
    }
}

impl EngineConfig {
    pub fn new(interval: Duration, duration_budget: Duration) -> Self {
        Self {
            interval,
            duration_budget,
            probe_timeout: DEFAULT_PROBE_TIMEOUT.min(interval),
        }
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout.min(self.interval);
        self
    }

    pub fn from_sampling(sampling: &SamplingConfig) -> Self {
        Self::new(sampling.interval(), sampling.duration_budget())
            .with_probe_timeout(sampling.probe_timeout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_timeout_never_exceeds_interval() {
        let cfg = EngineConfig::new(Duration::from_millis(200), Duration::from_secs(1));
        assert_eq!(cfg.probe_timeout, Duration::from_millis(200));
        let cfg = cfg.with_probe_timeout(Duration::from_secs(5));
        assert_eq!(cfg.probe_timeout, Duration::from_millis(200));
    }

    #[test]
    fn built_from_sampling_section() {
        let cfg = EngineConfig::from_sampling(&SamplingConfig::default());
        assert_eq!(cfg, EngineConfig::default());
    }
}
