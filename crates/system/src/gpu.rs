use crate::cpu::clamp_percent;
use crate::{Availability, Probe};
use hostmon_core::{ProbeError, ProbeKind, Reading};
use std::io::{ErrorKind, Read};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// Arguments understood by `nvidia-smi`; one CSV line per GPU.
const QUERY_ARGS: [&str; 2] = [
    "--query-gpu=utilization.gpu,temperature.gpu,memory.used",
    "--format=csv,noheader,nounits",
];

const POLL_STEP: Duration = Duration::from_millis(10);

/// GPU utilisation, temperature and memory from an external stats tool.
///
/// A missing tool, a non-zero exit or unparseable output on the first call
/// marks the probe unavailable for the run. The subprocess is killed if it
/// outlives `deadline`.
pub struct GpuProbe {
    command:      String,
    deadline:     Duration,
    availability: Availability,
}

impl GpuProbe {
    pub fn new(command: impl Into<String>, deadline: Duration) -> Self {
        Self {
            command: command.into(),
            deadline,
            availability: Availability::default(),
        }
    }

    fn query(&self) -> Result<String, ProbeError> {
        let mut command = Command::new(&self.command);
        command.args(QUERY_ARGS);
        run_with_deadline(&mut command, self.deadline).map_err(|e| match e {
            ProbeError::Unavailable(_) => {
                ProbeError::Unavailable(format!("'{}' not found", self.command))
            }
            ProbeError::Failed(why) => ProbeError::Failed(format!("'{}': {why}", self.command)),
            other => other,
        })
    }
}

/// Run `command` to completion and return its stdout, killing it once
/// `deadline` passes.
///
/// Stdout is drained on a helper thread while the child runs, so output
/// larger than the pipe buffer cannot stall the child.
fn run_with_deadline(command: &mut Command, deadline: Duration) -> Result<String, ProbeError> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound => ProbeError::Unavailable("not found".into()),
            _ => ProbeError::Failed(format!("cannot run: {e}")),
        })?;

    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| ProbeError::Failed("stdout not captured".into()))?;
    let reader = thread::spawn(move || {
        let mut buf = Vec::new();
        stdout.read_to_end(&mut buf).map(|_| buf)
    });

    let started = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if started.elapsed() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ProbeError::Timeout(deadline));
            }
            Ok(None) => thread::sleep(POLL_STEP),
            Err(e) => return Err(ProbeError::Failed(format!("wait: {e}"))),
        }
    };

    let stdout = reader
        .join()
        .map_err(|_| ProbeError::Failed("output reader panicked".into()))?
        .map_err(|e| ProbeError::Failed(format!("read output: {e}")))?;
    if !status.success() {
        return Err(ProbeError::Failed(format!("exited with {status}")));
    }
    Ok(String::from_utf8_lossy(&stdout).into_owned())
}

impl Probe for GpuProbe {
    fn kind(&self) -> ProbeKind {
        ProbeKind::Gpu
    }

    fn optional(&self) -> bool {
        true
    }

    fn sample(&mut self) -> Result<Reading, ProbeError> {
        self.availability.check()?;
        let result = self.query().and_then(|stdout| parse_query_output(&stdout));
        self.availability.resolve(ProbeKind::Gpu, result)
    }
}

/// Parse the first line of `nvidia-smi` CSV output:
/// `utilization, temperature, memory_used` (e.g. `"45, 61, 3120"`).
///
/// Memory may be reported as `[N/A]` on some boards and is then absent;
/// utilisation and temperature are required.
pub fn parse_query_output(stdout: &str) -> Result<Reading, ProbeError> {
    let line = stdout
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or_else(|| ProbeError::Failed("empty GPU tool output".into()))?;

    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    let [util, temp, rest @ ..] = fields.as_slice() else {
        return Err(ProbeError::Failed(format!("malformed GPU line: '{line}'")));
    };

    let number = |s: &str| -> Result<f64, ProbeError> {
        s.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| ProbeError::Failed(format!("not a number: '{s}' in '{line}'")))
    };

    Ok(Reading::Gpu {
        utilization_percent: clamp_percent(number(*util)?),
        temperature_celsius: number(*temp)?,
        memory_used_mib:     rest.first().and_then(|m| m.parse::<f64>().ok()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_typical_line() {
        let reading = parse_query_output("45, 61, 3120\n").unwrap();
        assert_eq!(
            reading,
            Reading::Gpu {
                utilization_percent: 45.0,
                temperature_celsius: 61.0,
                memory_used_mib:     Some(3120.0),
            }
        );
    }

    #[test]
    fn parse_uses_first_gpu_only() {
        let reading = parse_query_output("\n10, 40, 100\n90, 80, 200\n").unwrap();
        assert!(matches!(reading, Reading::Gpu { utilization_percent, .. } if utilization_percent == 10.0));
    }

    #[test]
    fn parse_tolerates_missing_memory() {
        let reading = parse_query_output("12, 50, [N/A]").unwrap();
        assert!(matches!(reading, Reading::Gpu { memory_used_mib: None, .. }));
    }

    #[test]
    fn parse_rejects_na_utilization() {
        assert!(parse_query_output("[N/A], 61, 3120").is_err());
    }

    #[test]
    fn parse_rejects_short_and_empty_output() {
        assert!(parse_query_output("45").is_err());
        assert!(parse_query_output("   \n").is_err());
        assert!(parse_query_output("NVIDIA-SMI has failed").is_err());
    }

    #[test]
    fn missing_tool_is_permanently_unavailable() {
        let mut probe = GpuProbe::new("hostmon-no-such-gpu-tool", Duration::from_millis(500));
        let first = probe.sample().unwrap_err();
        assert!(first.is_permanent());
        assert_eq!(probe.sample().unwrap_err(), first);
    }

    #[cfg(unix)]
    #[test]
    fn output_larger_than_pipe_buffer_is_read() {
        let mut command = Command::new("sh");
        command.args(["-c", "head -c 262144 /dev/zero | tr '\\0' 'x'"]);
        let out = run_with_deadline(&mut command, Duration::from_secs(5)).unwrap();
        assert_eq!(out.len(), 262_144);
        assert!(out.bytes().all(|b| b == b'x'));
    }

    #[cfg(unix)]
    #[test]
    fn hung_tool_is_killed_at_deadline() {
        let mut command = Command::new("sleep");
        command.arg("5");
        let started = Instant::now();
        let err = run_with_deadline(&mut command, Duration::from_millis(100)).unwrap_err();
        assert_eq!(err, ProbeError::Timeout(Duration::from_millis(100)));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[cfg(unix)]
    #[test]
    fn failing_tool_is_unavailable_not_a_crash() {
        // `false` ignores its arguments and exits 1.
        let mut probe = GpuProbe::new("false", Duration::from_millis(500));
        assert!(matches!(probe.sample(), Err(ProbeError::Unavailable(_))));
    }
}
