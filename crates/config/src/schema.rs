use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure parsed from `hostmon.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MonitorConfig {
    /// Tick interval, window length and probe timeout.
    pub sampling: SamplingConfig,
    /// Which optional probes to run and how.
    pub probes: ProbesConfig,
    /// Where and how the finished run is exported.
    pub report: ReportConfig,
}

/// Sampling cadence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Seconds between ticks.
    pub interval_secs: u64,
    /// Length of one observation window in seconds.
    pub duration_secs: u64,
    /// Upper bound for a single probe call, in milliseconds.
    pub probe_timeout_ms: u64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            interval_secs:    1,
            duration_secs:    60,
            probe_timeout_ms: 900,
        }
    }
}

impl SamplingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn duration_budget(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

/// Optional probe settings. CPU, memory, disk and network always run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbesConfig {
    /// Query hardware temperature sensors.
    pub temperature: bool,
    /// Query the GPU statistics tool.
    pub gpu: bool,
    /// Executable used for GPU statistics.
    pub gpu_command: String,
}

impl Default for ProbesConfig {
    fn default() -> Self {
        Self {
            temperature: true,
            gpu:         true,
            gpu_command: "nvidia-smi".to_string(),
        }
    }
}

/// Report export settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Directory the report file is written to.
    pub output_dir: PathBuf,
    /// Write a JSON report after each completed run.
    pub json: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            json:       true,
        }
    }
}
