use crate::Probe;
use hostmon_core::{ProbeError, ProbeKind, Reading};
use sysinfo::{System, MINIMUM_CPU_UPDATE_INTERVAL};

/// Total and per-core CPU usage plus the current clock frequency.
///
/// sysinfo computes usage as a delta between two refreshes, so [`prime`]
/// takes the baseline refresh and then waits out sysinfo's minimum update
/// interval, making the first tick's reading cover a real window.
///
/// [`prime`]: Probe::prime
pub struct CpuProbe {
    sys:        System,
    /// Per-core length, fixed at the first successful read of the run.
    core_count: Option<usize>,
}

impl CpuProbe {
    pub fn new() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu_all();
        let core_count = Some(sys.cpus().len()).filter(|&n| n > 0);
        Self { sys, core_count }
    }
}

impl Default for CpuProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl Probe for CpuProbe {
    fn kind(&self) -> ProbeKind {
        ProbeKind::Cpu
    }

    fn prime(&mut self) {
        self.sys.refresh_cpu_all();
        std::thread::sleep(MINIMUM_CPU_UPDATE_INTERVAL);
    }

    fn core_count(&self) -> Option<usize> {
        self.core_count
    }

    fn sample(&mut self) -> Result<Reading, ProbeError> {
        self.sys.refresh_cpu_all();

        let per_core: Vec<f64> = self.sys.cpus().iter().map(|c| c.cpu_usage() as f64).collect();
        let frequency = self.sys.cpus().first().map(|c| c.frequency()).unwrap_or(0);
        let total = self.sys.global_cpu_usage() as f64;

        cpu_reading(total, per_core, frequency, &mut self.core_count)
    }
}

/// Normalise raw CPU figures into a [`Reading`].
///
/// Percentages are clamped to `[0, 100]`, the per-core vector is held at the
/// length seen on the first successful read and a zero frequency (not
/// exposed by the platform) becomes `None`.
fn cpu_reading(
    total: f64,
    mut per_core: Vec<f64>,
    frequency_mhz: u64,
    core_count: &mut Option<usize>,
) -> Result<Reading, ProbeError> {
    if per_core.is_empty() {
        return Err(ProbeError::Failed("no CPUs reported".into()));
    }
    let len = *core_count.get_or_insert(per_core.len());
    per_core.resize(len, 0.0);
    for v in &mut per_core {
        *v = clamp_percent(*v);
    }

    Ok(Reading::Cpu {
        total: clamp_percent(total),
        per_core,
        frequency_mhz: (frequency_mhz > 0).then_some(frequency_mhz as f64),
    })
}

pub(crate) fn clamp_percent(v: f64) -> f64 {
    if v.is_finite() {
        v.clamp(0.0, 100.0)
    } else {
        0.0
    }
}
