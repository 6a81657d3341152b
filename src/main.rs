//! hostmon — samples host CPU, memory, disk, network, temperature and GPU
//! over a bounded window, then prints run statistics and writes a JSON report.
//!
//! Run with:  `RUST_LOG=info hostmon [path/to/hostmon.toml]`

use anyhow::{Context, Result};
use hostmon_core::{RunObserver, RunWindow, Sample, Statistics};
use hostmon_engine::{EngineConfig, ProbeFactory, SamplingEngine};
use hostmon_system::memory::format_rate;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Logs one line per tick with the time left in the window.
struct ConsoleObserver;

impl RunObserver for ConsoleObserver {
    fn on_sample(&self, sample: &Sample, window: &RunWindow, _stats: &Statistics) {
        let pct = |v: Option<f64>| v.map_or_else(|| "-".to_string(), |v| format!("{v:.1}%"));
        let rate = |v: Option<f64>| v.map_or_else(|| "-".to_string(), format_rate);
        let temp = sample
            .temperature_celsius
            .map_or_else(|| "-".to_string(), |c| format!("{c:.0}°C"));

        tracing::info!(
            "[{:>3}/{}] cpu {} mem {} disk r/w {} / {} net tx/rx {} / {} temp {} | {}s left",
            window.len(),
            window.capacity(),
            pct(sample.cpu_percent_total),
            pct(sample.memory_percent),
            rate(sample.disk_read_rate),
            rate(sample.disk_write_rate),
            rate(sample.net_sent_rate),
            rate(sample.net_recv_rate),
            temp,
            window.remaining().as_secs(),
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Structured logging: RUST_LOG controls verbosity (default: info).
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("hostmon v{} starting", env!("CARGO_PKG_VERSION"));

    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(hostmon_config::default_path);
    let config = hostmon_config::load(&path)
        .with_context(|| format!("loading config from '{}'", path.display()))?;

    let probes = config.probes.clone();
    let sampling = config.sampling.clone();
    let factory: ProbeFactory =
        Arc::new(move || hostmon_system::host_probes(&probes, &sampling));

    let engine = SamplingEngine::new(EngineConfig::from_sampling(&config.sampling), factory);
    engine.subscribe(Arc::new(ConsoleObserver));

    let run = engine.start()?.wait();
    tokio::pin!(run);

    let window = tokio::select! {
        window = &mut run => window?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted; stopping at the next tick");
            engine.stop();
            run.await?
        }
    };

    let stats = window.statistics_all();
    println!("\n{}", hostmon_report::render_text(&window, &stats));

    if config.report.json {
        hostmon_report::write_json(&config.report.output_dir, &window, &stats)
            .context("writing JSON report")?;
    }
    Ok(())
}
