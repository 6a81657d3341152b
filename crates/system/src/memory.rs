use crate::cpu::clamp_percent;
use crate::Probe;
use hostmon_core::{ProbeError, ProbeKind, Reading};
use sysinfo::System;

/// RAM and swap utilisation.
pub struct MemoryProbe {
    sys: System,
}

impl MemoryProbe {
    pub fn new() -> Self {
        Self { sys: System::new() }
    }
}

impl Default for MemoryProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl Probe for MemoryProbe {
    fn kind(&self) -> ProbeKind {
        ProbeKind::Memory
    }

    fn sample(&mut self) -> Result<Reading, ProbeError> {
        self.sys.refresh_memory();

        if self.sys.total_memory() == 0 {
            return Err(ProbeError::Failed("total memory reported as 0".into()));
        }

        Ok(Reading::Memory {
            memory_percent: percent(self.sys.used_memory(), self.sys.total_memory()),
            // No swap configured reads as 0%.
            swap_percent:   percent(self.sys.used_swap(), self.sys.total_swap()),
        })
    }
}

/// `used / total` as a percentage in `[0, 100]`; `0.0` when `total` is 0.
pub fn percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    clamp_percent(used as f64 / total as f64 * 100.0)
}

/// Format a byte count as a human-readable string (e.g. `"7.3 GiB"`).
pub fn format_bytes(bytes: u64) -> String {
    const GIB: u64 = 1 << 30;
    const MIB: u64 = 1 << 20;
    const KIB: u64 = 1 << 10;

    if bytes >= GIB {
        format!("{:.1} GiB", bytes as f64 / GIB as f64)
    } else if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// Format a bytes/second rate, e.g. `"1.5 MiB/s"`.
pub fn format_rate(bytes_per_sec: f64) -> String {
    format!("{}/s", format_bytes(bytes_per_sec.max(0.0).round() as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_bytes_gib() {
        assert_eq!(format_bytes(8 * 1024 * 1024 * 1024), "8.0 GiB");
    }

    #[test]
    fn format_bytes_mib() {
        assert_eq!(format_bytes(512 * 1024 * 1024), "512.0 MiB");
    }

    #[test]
    fn format_bytes_zero() {
        assert_eq!(format_bytes(0), "0 B");
    }

    #[test]
    fn format_rate_rounds_and_suffixes() {
        assert_eq!(format_rate(1536.4), "1.5 KiB/s");
        assert_eq!(format_rate(-3.0), "0 B/s");
    }

    #[test]
    fn percent_without_total_is_zero() {
        assert_eq!(percent(10, 0), 0.0);
        assert_eq!(percent(1, 4), 25.0);
    }

    #[test]
    fn live_probe_reads_memory() {
        let mut probe = MemoryProbe::new();
        let Reading::Memory { memory_percent, swap_percent } = probe.sample().unwrap() else {
            panic!("wrong variant");
        };
        assert!(memory_percent > 0.0 && memory_percent <= 100.0);
        assert!((0.0..=100.0).contains(&swap_percent));
    }
}
