use crate::memory::percent;
use crate::rate::DualRate;
use crate::Probe;
use hostmon_core::{ProbeError, ProbeKind, Reading};
use std::collections::HashSet;
use std::path::Path;
use std::time::Instant;
use sysinfo::Disks;

/// Disk read/write throughput derived from cumulative I/O counters, plus
/// root filesystem usage.
pub struct DiskProbe {
    disks: Disks,
    rates: DualRate,
}

impl DiskProbe {
    pub fn new() -> Self {
        Self {
            disks: Disks::new_with_refreshed_list(),
            rates: DualRate::default(),
        }
    }
}

impl Default for DiskProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl Probe for DiskProbe {
    fn kind(&self) -> ProbeKind {
        ProbeKind::Disk
    }

    fn prime(&mut self) {
        self.rates.reset();
    }

    fn sample(&mut self) -> Result<Reading, ProbeError> {
        self.disks.refresh(true);
        let now = Instant::now();

        if self.disks.is_empty() {
            return Err(ProbeError::Failed("no disks listed".into()));
        }

        // Several mounts can share one block device; count each device once.
        let (read, written) = sum_counters(self.disks.iter().map(|d| {
            let usage = d.usage();
            (d.name().to_string_lossy().into_owned(), usage.total_read_bytes, usage.total_written_bytes)
        }));
        let (read_rate, write_rate) = self.rates.update(read, written, now);

        let usage_percent = self
            .disks
            .iter()
            .find(|d| d.mount_point() == Path::new("/"))
            .or_else(|| self.disks.first())
            .map(|d| percent(d.total_space().saturating_sub(d.available_space()), d.total_space()));

        Ok(Reading::Disk {
            read_rate,
            write_rate,
            usage_percent,
        })
    }
}

/// Sum `(device, read, written)` triples, counting each device name once.
fn sum_counters(devices: impl Iterator<Item = (String, u64, u64)>) -> (u64, u64) {
    let mut seen = HashSet::new();
    devices
        .filter(|(name, _, _)| seen.insert(name.clone()))
        .fold((0u64, 0u64), |(r, w), (_, dr, dw)| {
            (r.saturating_add(dr), w.saturating_add(dw))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_devices_counted_once() {
        let devices = vec![
            ("/dev/sda1".to_string(), 100, 10),
            ("/dev/sda1".to_string(), 100, 10),
            ("/dev/nvme0n1p2".to_string(), 50, 5),
        ];
        assert_eq!(sum_counters(devices.into_iter()), (150, 15));
    }

    #[test]
    fn first_tick_after_prime_is_zero() {
        let mut probe = DiskProbe::new();
        probe.prime();
        match probe.sample() {
            Ok(Reading::Disk { read_rate, write_rate, .. }) => {
                assert_eq!(read_rate, 0.0);
                assert_eq!(write_rate, 0.0);
            }
            // Containers without mounted block devices.
            Err(ProbeError::Failed(_)) => {}
            other => panic!("unexpected: {other:?}"),
        }
    }
}
