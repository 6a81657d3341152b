pub mod schema;

pub use schema::{MonitorConfig, ProbesConfig, ReportConfig, SamplingConfig};

use hostmon_core::{MonitorError, Result, MAX_CAPACITY};
use std::path::{Path, PathBuf};

/// Load configuration from a TOML file.  Returns `MonitorConfig::default()`
/// if the file doesn't exist so a run always has sensible defaults.
pub fn load(path: impl AsRef<Path>) -> Result<MonitorConfig> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::warn!(
            "Config file not found at '{}'; using defaults.",
            path.display()
        );
        return Ok(MonitorConfig::default());
    }

    let raw = std::fs::read_to_string(path)
        .map_err(|e| MonitorError::Config(format!("cannot read '{}': {e}", path.display())))?;

    parse(&raw)
}

/// Parse and validate a TOML document.
pub fn parse(raw: &str) -> Result<MonitorConfig> {
    let config: MonitorConfig =
        toml::from_str(raw).map_err(|e| MonitorError::Config(format!("TOML parse error: {e}")))?;
    validate(&config)?;
    Ok(config)
}

/// Reject settings the sampling engine cannot honour.
pub fn validate(config: &MonitorConfig) -> Result<()> {
    let s = &config.sampling;
    if s.interval_secs == 0 {
        return Err(MonitorError::Config(
            "sampling.interval_secs must be at least 1 (sub-second sampling is not supported)".into(),
        ));
    }
    if s.duration_secs < s.interval_secs {
        return Err(MonitorError::Config(format!(
            "sampling.duration_secs ({}) must be >= interval_secs ({})",
            s.duration_secs, s.interval_secs
        )));
    }
    let samples = s.duration_secs / s.interval_secs;
    if samples > MAX_CAPACITY as u64 {
        return Err(MonitorError::Config(format!(
            "sampling window holds {samples} samples; at most {MAX_CAPACITY} are supported"
        )));
    }
    if s.probe_timeout_ms == 0 {
        return Err(MonitorError::Config("sampling.probe_timeout_ms must be > 0".into()));
    }
    if config.probes.gpu && config.probes.gpu_command.trim().is_empty() {
        return Err(MonitorError::Config("probes.gpu_command is empty".into()));
    }
    Ok(())
}

/// Return the default config path, honouring `$XDG_CONFIG_HOME`.
pub fn default_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("hostmon").join("hostmon.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn defaults_describe_one_minute_at_one_hertz() {
        let cfg = MonitorConfig::default();
        assert_eq!(cfg.sampling.interval(), Duration::from_secs(1));
        assert_eq!(cfg.sampling.duration_budget(), Duration::from_secs(60));
        assert!(cfg.probes.gpu);
        assert_eq!(cfg.probes.gpu_command, "nvidia-smi");
        validate(&cfg).unwrap();
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let cfg = parse("[sampling]\nduration_secs = 5\n").unwrap();
        assert_eq!(cfg.sampling.duration_secs, 5);
        assert_eq!(cfg.sampling.interval_secs, 1);
        assert!(cfg.probes.temperature);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = parse("[sampling]\ninterval_secs = 0\n").unwrap_err();
        assert!(matches!(err, MonitorError::Config(_)));
    }

    #[test]
    fn duration_shorter_than_interval_is_rejected() {
        assert!(parse("[sampling]\ninterval_secs = 10\nduration_secs = 5\n").is_err());
    }

    #[test]
    fn oversized_window_is_rejected() {
        let err = parse("[sampling]\nduration_secs = 18446744073709551615\n").unwrap_err();
        assert!(matches!(err, MonitorError::Config(_)));
        let err = parse("[sampling]\nduration_secs = 9223372036854775807\n").unwrap_err();
        assert!(matches!(err, MonitorError::Config(msg) if msg.contains("at most")));

        let week = format!("[sampling]\nduration_secs = {MAX_CAPACITY}\n");
        assert!(parse(&week).is_ok());
        let week_and_a_bit = format!("[sampling]\nduration_secs = {}\n", MAX_CAPACITY + 1);
        assert!(parse(&week_and_a_bit).is_err());
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        assert!(matches!(parse("[sampling"), Err(MonitorError::Config(_))));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg, MonitorConfig::default());
    }

    #[test]
    fn load_reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hostmon.toml");
        std::fs::write(&path, "[probes]\ngpu = false\n\n[report]\njson = false\n").unwrap();
        let cfg = load(&path).unwrap();
        assert!(!cfg.probes.gpu);
        assert!(!cfg.report.json);
    }
}
