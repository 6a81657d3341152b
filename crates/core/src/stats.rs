//! On-demand summary statistics over a closed set of samples.

use crate::sample::Sample;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A summarised metric column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    CpuTotal,
    CpuFrequency,
    Memory,
    Swap,
    DiskRead,
    DiskWrite,
    DiskUsage,
    NetSent,
    NetRecv,
    Temperature,
    GpuUtilization,
    GpuTemperature,
    GpuMemory,
}

impl Metric {
    pub const ALL: [Metric; 13] = [
        Metric::CpuTotal,
        Metric::CpuFrequency,
        Metric::Memory,
        Metric::Swap,
        Metric::DiskRead,
        Metric::DiskWrite,
        Metric::DiskUsage,
        Metric::NetSent,
        Metric::NetRecv,
        Metric::Temperature,
        Metric::GpuUtilization,
        Metric::GpuTemperature,
        Metric::GpuMemory,
    ];

    /// Extract this metric from a sample, `None` when absent.
    pub fn value(self, sample: &Sample) -> Option<f64> {
        match self {
            Metric::CpuTotal       => sample.cpu_percent_total,
            Metric::CpuFrequency   => sample.cpu_frequency_mhz,
            Metric::Memory         => sample.memory_percent,
            Metric::Swap           => sample.swap_percent,
            Metric::DiskRead       => sample.disk_read_rate,
            Metric::DiskWrite      => sample.disk_write_rate,
            Metric::DiskUsage      => sample.disk_usage_percent,
            Metric::NetSent        => sample.net_sent_rate,
            Metric::NetRecv        => sample.net_recv_rate,
            Metric::Temperature    => sample.temperature_celsius,
            Metric::GpuUtilization => sample.gpu_utilization_percent,
            Metric::GpuTemperature => sample.gpu_temperature_celsius,
            Metric::GpuMemory      => sample.gpu_memory_used_mib,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Metric::CpuTotal       => "CPU usage",
            Metric::CpuFrequency   => "CPU frequency",
            Metric::Memory         => "Memory usage",
            Metric::Swap           => "Swap usage",
            Metric::DiskRead       => "Disk read",
            Metric::DiskWrite      => "Disk write",
            Metric::DiskUsage      => "Disk usage (/)",
            Metric::NetSent        => "Network sent",
            Metric::NetRecv        => "Network received",
            Metric::Temperature    => "Temperature",
            Metric::GpuUtilization => "GPU usage",
            Metric::GpuTemperature => "GPU temperature",
            Metric::GpuMemory      => "GPU memory",
        }
    }

    pub fn unit(self) -> Unit {
        match self {
            Metric::CpuTotal
            | Metric::Memory
            | Metric::Swap
            | Metric::DiskUsage
            | Metric::GpuUtilization => Unit::Percent,
            Metric::CpuFrequency => Unit::Megahertz,
            Metric::DiskRead | Metric::DiskWrite | Metric::NetSent | Metric::NetRecv => {
                Unit::BytesPerSecond
            }
            Metric::Temperature | Metric::GpuTemperature => Unit::Celsius,
            Metric::GpuMemory => Unit::Mebibytes,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Percent,
    Megahertz,
    BytesPerSecond,
    Celsius,
    Mebibytes,
}

impl Unit {
    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Percent        => "%",
            Unit::Megahertz      => "MHz",
            Unit::BytesPerSecond => "B/s",
            Unit::Celsius        => "°C",
            Unit::Mebibytes      => "MiB",
        }
    }
}

/// Summary of one metric over the samples where it was present.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub mean:    f64,
    pub min:     f64,
    pub max:     f64,
    /// Population standard deviation (divides by N).
    pub std_dev: f64,
    pub count:   usize,
}

impl Summary {
    /// Summarise `values`, or `None` if there are none.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        Some(Self {
            mean,
            min,
            max,
            std_dev: variance.sqrt(),
            count: values.len(),
        })
    }
}

/// Per-metric result: a summary, or `Unavailable` when no sample had the
/// metric. Never a fabricated zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MetricStats {
    Available(Summary),
    Unavailable,
}

impl MetricStats {
    pub fn summary(&self) -> Option<&Summary> {
        match self {
            MetricStats::Available(s) => Some(s),
            MetricStats::Unavailable  => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, MetricStats::Available(_))
    }
}

/// Statistics for every [`Metric`] over a set of samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    sample_count: usize,
    metrics:      Vec<(Metric, MetricStats)>,
}

impl Statistics {
    pub fn compute(samples: &[Sample]) -> Self {
        let metrics = Metric::ALL
            .iter()
            .map(|&metric| {
                let values: Vec<f64> = samples
                    .iter()
                    .filter_map(|s| metric.value(s))
                    .filter(|v| v.is_finite())
                    .collect();
                let stats = match Summary::from_values(&values) {
                    Some(summary) => MetricStats::Available(summary),
                    None          => MetricStats::Unavailable,
                };
                (metric, stats)
            })
            .collect();

        Self {
            sample_count: samples.len(),
            metrics,
        }
    }

    /// Number of samples the statistics were computed over.
    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn get(&self, metric: Metric) -> &MetricStats {
        self.metrics
            .iter()
            .find(|(m, _)| *m == metric)
            .map(|(_, s)| s)
            .unwrap_or(&MetricStats::Unavailable)
    }

    /// Iterate in [`Metric::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (Metric, &MetricStats)> {
        self.metrics.iter().map(|(m, s)| (*m, s))
    }
}
