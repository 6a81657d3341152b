use crate::Probe;
use hostmon_core::{ProbeError, ProbeKind, Reading};
use std::collections::HashMap;
use std::time::Instant;
use sysinfo::Networks;

/// Network send/receive throughput across all interfaces.
pub struct NetworkProbe {
    networks: Networks,
    rates:    InterfaceRates,
}

impl NetworkProbe {
    pub fn new() -> Self {
        Self {
            networks: Networks::new_with_refreshed_list(),
            rates:    InterfaceRates::default(),
        }
    }
}

impl Default for NetworkProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl Probe for NetworkProbe {
    fn kind(&self) -> ProbeKind {
        ProbeKind::Network
    }

    fn prime(&mut self) {
        self.rates.reset();
    }

    fn sample(&mut self) -> Result<Reading, ProbeError> {
        // true = drop interfaces that disappeared.
        self.networks.refresh(true);
        let now = Instant::now();

        // `total_*` are cumulative since boot, unlike `received()` /
        // `transmitted()` which are deltas since the last refresh.
        let counters = self
            .networks
            .iter()
            .map(|(name, d)| (name.clone(), (d.total_transmitted(), d.total_received())))
            .collect();
        let (sent_rate, recv_rate) = self.rates.update(counters, now);

        Ok(Reading::Network {
            sent_rate,
            recv_rate,
        })
    }
}

/// Per-interface `(sent, received)` counters turned into aggregate rates.
///
/// Only interfaces seen on the previous update contribute, so a newly
/// appearing interface never adds its whole since-boot total in one tick.
/// A counter that went backwards contributes 0 for that interface.
#[derive(Debug, Default)]
pub struct InterfaceRates {
    last: Option<(HashMap<String, (u64, u64)>, Instant)>,
}

impl InterfaceRates {
    pub fn reset(&mut self) {
        self.last = None;
    }

    pub fn update(&mut self, counters: HashMap<String, (u64, u64)>, now: Instant) -> (f64, f64) {
        let rates = match &self.last {
            Some((prev, at)) => {
                let dt = now.saturating_duration_since(*at).as_secs_f64();
                let (sent, recv) = counters
                    .iter()
                    .filter_map(|(name, &(s, r))| {
                        let &(ps, pr) = prev.get(name)?;
                        Some((s.saturating_sub(ps), r.saturating_sub(pr)))
                    })
                    .fold((0u64, 0u64), |(ts, tr), (s, r)| {
                        (ts.saturating_add(s), tr.saturating_add(r))
                    });
                if dt > 0.0 {
                    (sent as f64 / dt, recv as f64 / dt)
                } else {
                    (0.0, 0.0)
                }
            }
            None => (0.0, 0.0),
        };
        self.last = Some((counters, now));
        rates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn counters(entries: &[(&str, u64, u64)]) -> HashMap<String, (u64, u64)> {
        entries.iter().map(|&(n, s, r)| (n.to_string(), (s, r))).collect()
    }

    #[test]
    fn new_interface_does_not_spike() {
        let t0 = Instant::now();
        let mut rates = InterfaceRates::default();
        rates.update(counters(&[("eth0", 1000, 2000)]), t0);

        let second = counters(&[("eth0", 1100, 2200), ("wg0", 9_000_000, 9_000_000)]);
        assert_eq!(rates.update(second, t0 + Duration::from_secs(1)), (100.0, 200.0));

        let third = counters(&[("eth0", 1100, 2200), ("wg0", 9_000_500, 9_000_000)]);
        assert_eq!(rates.update(third, t0 + Duration::from_secs(2)), (500.0, 0.0));
    }

    #[test]
    fn one_interface_reset_leaves_others_counted() {
        let t0 = Instant::now();
        let mut rates = InterfaceRates::default();
        rates.update(counters(&[("eth0", 5000, 5000), ("usb0", 800, 800)]), t0);
        let after = counters(&[("eth0", 5400, 5000), ("usb0", 10, 10)]);
        assert_eq!(rates.update(after, t0 + Duration::from_secs(2)), (200.0, 0.0));
    }

    #[test]
    fn removed_interface_is_not_negative() {
        let t0 = Instant::now();
        let mut rates = InterfaceRates::default();
        rates.update(counters(&[("eth0", 100, 100), ("wlan0", 7000, 7000)]), t0);
        let after = counters(&[("eth0", 150, 100)]);
        assert_eq!(rates.update(after, t0 + Duration::from_secs(1)), (50.0, 0.0));
    }

    #[test]
    fn first_update_and_reset_report_zero() {
        let t0 = Instant::now();
        let mut rates = InterfaceRates::default();
        assert_eq!(rates.update(counters(&[("eth0", 10, 10)]), t0), (0.0, 0.0));
        rates.reset();
        let later = counters(&[("eth0", 9999, 9999)]);
        assert_eq!(rates.update(later, t0 + Duration::from_secs(1)), (0.0, 0.0));
    }

    #[test]
    fn rates_are_never_negative() {
        let mut probe = NetworkProbe::new();
        probe.prime();
        for _ in 0..3 {
            let Reading::Network { sent_rate, recv_rate } = probe.sample().unwrap() else {
                panic!("wrong variant");
            };
            assert!(sent_rate >= 0.0);
            assert!(recv_rate >= 0.0);
        }
    }

    #[test]
    fn first_tick_after_prime_is_zero() {
        let mut probe = NetworkProbe::new();
        probe.prime();
        assert_eq!(
            probe.sample().unwrap(),
            Reading::Network { sent_rate: 0.0, recv_rate: 0.0 }
        );
    }
}
