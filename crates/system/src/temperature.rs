use crate::{Availability, Probe};
use hostmon_core::{ProbeError, ProbeKind, Reading};
use sysinfo::Components;

/// Mean temperature over every hardware sensor the host exposes.
///
/// The sensor list is built on the first attempt. If it yields no usable
/// reading the probe reports `Unavailable` for the rest of its life without
/// touching the sensors again.
pub struct TemperatureProbe {
    components:   Option<Components>,
    availability: Availability,
}

impl TemperatureProbe {
    pub fn new() -> Self {
        Self {
            components:   None,
            availability: Availability::default(),
        }
    }

    fn read(&mut self) -> Result<Reading, ProbeError> {
        let components = match self.components.take() {
            Some(mut c) => {
                c.refresh(false);
                c
            }
            None => Components::new_with_refreshed_list(),
        };
        let components = self.components.insert(components);

        if components.is_empty() {
            return Err(ProbeError::Unavailable("no temperature sensors exposed".into()));
        }

        mean_celsius(components.iter().map(|c| c.temperature()))
            .map(|celsius| Reading::Temperature { celsius })
            .ok_or_else(|| ProbeError::Failed("no sensor reported a temperature".into()))
    }
}

impl Default for TemperatureProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl Probe for TemperatureProbe {
    fn kind(&self) -> ProbeKind {
        ProbeKind::Temperature
    }

    fn optional(&self) -> bool {
        true
    }

    fn sample(&mut self) -> Result<Reading, ProbeError> {
        self.availability.check()?;
        let result = self.read();
        self.availability.resolve(ProbeKind::Temperature, result)
    }
}

/// Average of the finite, positive readings; `None` if there are none.
fn mean_celsius(readings: impl Iterator<Item = Option<f32>>) -> Option<f64> {
    let (sum, n) = readings
        .flatten()
        .filter(|t| t.is_finite() && *t > 0.0)
        .fold((0.0f64, 0usize), |(sum, n), t| (sum + t as f64, n + 1));
    (n > 0).then(|| sum / n as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_skips_missing_and_bogus_sensors() {
        let readings = vec![Some(40.0), None, Some(f32::NAN), Some(0.0), Some(60.0)];
        assert_eq!(mean_celsius(readings.into_iter()), Some(50.0));
    }

    #[test]
    fn no_readings_means_no_mean() {
        assert_eq!(mean_celsius(vec![None, Some(0.0)].into_iter()), None);
    }

    #[test]
    fn verdict_is_sticky_for_the_sensor() {
        let mut probe = TemperatureProbe::new();
        match probe.sample() {
            Ok(_) => assert_eq!(probe.availability, Availability::Available),
            Err(first) => {
                assert!(first.is_permanent());
                assert_eq!(probe.sample(), Err(first));
            }
        }
    }
}
