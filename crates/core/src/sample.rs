use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// The six sensor categories sampled on every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    Cpu,
    Memory,
    Disk,
    Network,
    Temperature,
    Gpu,
}

impl ProbeKind {
    pub const ALL: [ProbeKind; 6] = [
        ProbeKind::Cpu,
        ProbeKind::Memory,
        ProbeKind::Disk,
        ProbeKind::Network,
        ProbeKind::Temperature,
        ProbeKind::Gpu,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ProbeKind::Cpu         => "cpu",
            ProbeKind::Memory      => "memory",
            ProbeKind::Disk        => "disk",
            ProbeKind::Network     => "network",
            ProbeKind::Temperature => "temperature",
            ProbeKind::Gpu         => "gpu",
        }
    }
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What one probe produces on one tick.
#[derive(Debug, Clone, PartialEq)]
pub enum Reading {
    Cpu {
        total:         f64,
        per_core:      Vec<f64>,
        frequency_mhz: Option<f64>,
    },
    Memory {
        memory_percent: f64,
        swap_percent:   f64,
    },
    Disk {
        read_rate:     f64,
        write_rate:    f64,
        usage_percent: Option<f64>,
    },
    Network {
        sent_rate: f64,
        recv_rate: f64,
    },
    Temperature {
        celsius: f64,
    },
    Gpu {
        utilization_percent: f64,
        temperature_celsius: f64,
        memory_used_mib:     Option<f64>,
    },
}

impl Reading {
    pub fn kind(&self) -> ProbeKind {
        match self {
            Reading::Cpu { .. }         => ProbeKind::Cpu,
            Reading::Memory { .. }      => ProbeKind::Memory,
            Reading::Disk { .. }        => ProbeKind::Disk,
            Reading::Network { .. }     => ProbeKind::Network,
            Reading::Temperature { .. } => ProbeKind::Temperature,
            Reading::Gpu { .. }         => ProbeKind::Gpu,
        }
    }
}

/// One observation at one tick.
///
/// Every metric is optional: a probe that failed, timed out or is
/// unavailable for the run leaves its fields as `None` for that tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Offset from the start of the run; strictly increasing.
    pub timestamp: Duration,
    /// Wall-clock time of the tick (display only).
    pub captured_at: DateTime<Local>,

    // ── CPU ──────────────────────────────────────────────────────────────────
    pub cpu_percent_total: Option<f64>,
    /// One entry per core, length fixed for the run. Empty if the CPU
    /// probe produced nothing this tick.
    pub cpu_percent_per_core: Vec<f64>,
    pub cpu_frequency_mhz: Option<f64>,

    // ── Memory ───────────────────────────────────────────────────────────────
    pub memory_percent: Option<f64>,
    pub swap_percent: Option<f64>,

    // ── Disk (bytes/sec) ─────────────────────────────────────────────────────
    pub disk_read_rate: Option<f64>,
    pub disk_write_rate: Option<f64>,
    /// Root filesystem usage.
    pub disk_usage_percent: Option<f64>,

    // ── Network (bytes/sec) ──────────────────────────────────────────────────
    pub net_sent_rate: Option<f64>,
    pub net_recv_rate: Option<f64>,

    // ── Sensors ──────────────────────────────────────────────────────────────
    pub temperature_celsius: Option<f64>,
    pub gpu_utilization_percent: Option<f64>,
    pub gpu_temperature_celsius: Option<f64>,
    pub gpu_memory_used_mib: Option<f64>,
}

impl Sample {
    /// A sample with every metric absent.
    pub fn empty(timestamp: Duration, captured_at: DateTime<Local>) -> Self {
        Self {
            timestamp,
            captured_at,
            cpu_percent_total:       None,
            cpu_percent_per_core:    Vec::new(),
            cpu_frequency_mhz:       None,
            memory_percent:          None,
            swap_percent:            None,
            disk_read_rate:          None,
            disk_write_rate:         None,
            disk_usage_percent:      None,
            net_sent_rate:           None,
            net_recv_rate:           None,
            temperature_celsius:     None,
            gpu_utilization_percent: None,
            gpu_temperature_celsius: None,
            gpu_memory_used_mib:     None,
        }
    }

    /// Fold one probe reading into this sample.
    pub fn apply(&mut self, reading: Reading) {
        match reading {
            Reading::Cpu { total, per_core, frequency_mhz } => {
                self.cpu_percent_total    = Some(total);
                self.cpu_percent_per_core = per_core;
                self.cpu_frequency_mhz    = frequency_mhz;
            }
            Reading::Memory { memory_percent, swap_percent } => {
                self.memory_percent = Some(memory_percent);
                self.swap_percent   = Some(swap_percent);
            }
            Reading::Disk { read_rate, write_rate, usage_percent } => {
                self.disk_read_rate     = Some(read_rate);
                self.disk_write_rate    = Some(write_rate);
                self.disk_usage_percent = usage_percent;
            }
            Reading::Network { sent_rate, recv_rate } => {
                self.net_sent_rate = Some(sent_rate);
                self.net_recv_rate = Some(recv_rate);
            }
            Reading::Temperature { celsius } => {
                self.temperature_celsius = Some(celsius);
            }
            Reading::Gpu { utilization_percent, temperature_celsius, memory_used_mib } => {
                self.gpu_utilization_percent = Some(utilization_percent);
                self.gpu_temperature_celsius = Some(temperature_celsius);
                self.gpu_memory_used_mib     = memory_used_mib;
            }
        }
    }
}

/// Assembles a [`Sample`] from the readings collected during one tick.
#[derive(Debug)]
pub struct SampleBuilder {
    sample:     Sample,
    core_count: usize,
}

impl SampleBuilder {
    /// `core_count` is the per-core length fixed at run start; CPU readings
    /// are padded or truncated to it.
    pub fn new(timestamp: Duration, captured_at: DateTime<Local>, core_count: usize) -> Self {
        Self {
            sample: Sample::empty(timestamp, captured_at),
            core_count,
        }
    }

    pub fn reading(&mut self, reading: Reading) -> &mut Self {
        let reading = match reading {
            Reading::Cpu { total, mut per_core, frequency_mhz } => {
                per_core.resize(self.core_count, 0.0);
                Reading::Cpu { total, per_core, frequency_mhz }
            }
            other => other,
        };
        self.sample.apply(reading);
        self
    }

    pub fn build(self) -> Sample {
        self.sample
    }
}
