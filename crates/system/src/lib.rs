//! Probe adapters: one per sensor category, each turning a host query into
//! a [`Reading`] or a [`ProbeError`].

pub mod cpu;
pub mod disk;
pub mod gpu;
pub mod memory;
pub mod network;
pub mod rate;
pub mod temperature;

pub use cpu::CpuProbe;
pub use disk::DiskProbe;
pub use gpu::GpuProbe;
pub use memory::MemoryProbe;
pub use network::NetworkProbe;
pub use temperature::TemperatureProbe;

use hostmon_config::{ProbesConfig, SamplingConfig};
use hostmon_core::{ProbeError, ProbeKind, Reading};
use tracing::debug;

/// Uniform "sample now" capability shared by all sensor categories.
///
/// `sample` may block (sysinfo refreshes, subprocesses); the engine runs it
/// on the blocking pool under a timeout.
pub trait Probe: Send {
    fn kind(&self) -> ProbeKind;

    /// Optional probes (temperature, GPU) are switched off for the rest of
    /// the run when their first attempt fails.
    fn optional(&self) -> bool {
        false
    }

    /// Reset per-run state. Called once before the first tick.
    fn prime(&mut self) {}

    /// Logical core count, for the probe that knows it.
    fn core_count(&self) -> Option<usize> {
        None
    }

    fn sample(&mut self) -> Result<Reading, ProbeError>;
}

/// Build the host's probe set. Call once per run: availability verdicts live
/// inside the probes, so a fresh set re-probes the hardware.
pub fn host_probes(probes: &ProbesConfig, sampling: &SamplingConfig) -> Vec<Box<dyn Probe>> {
    let mut set: Vec<Box<dyn Probe>> = vec![
        Box::new(CpuProbe::new()),
        Box::new(MemoryProbe::new()),
        Box::new(DiskProbe::new()),
        Box::new(NetworkProbe::new()),
    ];
    if probes.temperature {
        set.push(Box::new(TemperatureProbe::new()));
    }
    if probes.gpu {
        set.push(Box::new(GpuProbe::new(
            probes.gpu_command.clone(),
            sampling.probe_timeout(),
        )));
    }
    set
}

/// Cached "does this sensor exist" verdict for an optional probe.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Availability {
    #[default]
    Untested,
    Available,
    Unavailable(String),
}

impl Availability {
    /// Short-circuit when a previous attempt already found the sensor missing.
    pub fn check(&self) -> Result<(), ProbeError> {
        match self {
            Availability::Unavailable(why) => Err(ProbeError::Unavailable(why.clone())),
            _ => Ok(()),
        }
    }

    /// Record the outcome of an attempt. A failure on the very first
    /// attempt becomes a permanent `Unavailable`; later failures stay
    /// one-off. `Timeout` and `Busy` never settle the verdict.
    pub fn resolve(
        &mut self,
        kind: ProbeKind,
        result: Result<Reading, ProbeError>,
    ) -> Result<Reading, ProbeError> {
        let first_attempt = *self == Availability::Untested;
        match result {
            Err(e @ (ProbeError::Timeout(_) | ProbeError::Busy)) => Err(e),
            Ok(reading) => {
                *self = Availability::Available;
                Ok(reading)
            }
            Err(e) if first_attempt => {
                let why = match e {
                    ProbeError::Unavailable(why) | ProbeError::Failed(why) => why,
                    other => other.to_string(),
                };
                debug!("{kind} probe unavailable: {why}");
                *self = Availability::Unavailable(why.clone());
                Err(ProbeError::Unavailable(why))
            }
            Err(e) => Err(e),
        }
    }

    pub fn reset(&mut self) {
        *self = Availability::Untested;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp(c: f64) -> Result<Reading, ProbeError> {
        Ok(Reading::Temperature { celsius: c })
    }

    #[test]
    fn first_failure_is_permanent() {
        let mut a = Availability::default();
        let r = a.resolve(ProbeKind::Gpu, Err(ProbeError::Failed("exit status 9".into())));
        assert_eq!(r, Err(ProbeError::Unavailable("exit status 9".into())));
        assert!(a.check().is_err());
    }

    #[test]
    fn later_failure_is_transient() {
        let mut a = Availability::default();
        a.resolve(ProbeKind::Temperature, temp(40.0)).unwrap();
        let r = a.resolve(ProbeKind::Temperature, Err(ProbeError::Failed("flaky".into())));
        assert_eq!(r, Err(ProbeError::Failed("flaky".into())));
        assert!(a.check().is_ok());
    }

    #[test]
    fn slow_first_attempt_stays_untested() {
        let mut a = Availability::default();
        let timeout = ProbeError::Timeout(std::time::Duration::from_millis(900));
        assert_eq!(a.resolve(ProbeKind::Gpu, Err(timeout.clone())), Err(timeout));
        assert_eq!(a.resolve(ProbeKind::Gpu, Err(ProbeError::Busy)), Err(ProbeError::Busy));
        assert_eq!(a, Availability::Untested);

        let r = a.resolve(ProbeKind::Gpu, Err(ProbeError::Failed("exit status 9".into())));
        assert!(matches!(r, Err(ProbeError::Unavailable(_))));
    }

    #[test]
    fn default_set_respects_optional_switches() {
        let probes = ProbesConfig {
            temperature: false,
            gpu:         false,
            ..ProbesConfig::default()
        };
        let set = host_probes(&probes, &SamplingConfig::default());
        let kinds: Vec<ProbeKind> = set.iter().map(|p| p.kind()).collect();
        assert_eq!(
            kinds,
            vec![ProbeKind::Cpu, ProbeKind::Memory, ProbeKind::Disk, ProbeKind::Network]
        );
        assert!(set.iter().all(|p| !p.optional()));
    }
}
