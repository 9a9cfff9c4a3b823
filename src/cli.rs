use std::{
    path::PathBuf,
    time::{Duration, Instant},
};

use clap::Parser;

use crate::{
    audio::{engine::AudioEngine, host::StreamHost},
    commands::{
        monitor_commands::{clear_log, read_log, read_monitor, read_timings},
        script_commands::{compile, get_output},
    },
    config::HostConfig,
    scripting::output_log::LogKind,
    state::AppState,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Lua script to run once per sample; recompiled whenever the file changes
    script: PathBuf,

    /// JSON host configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Extra directory searched by `require` (overrides the config file)
    #[arg(long)]
    package_path: Option<String>,

    /// Output device name (overrides the config file)
    #[arg(long)]
    device: Option<String>,

    /// Stop after this many seconds instead of running until killed
    #[arg(long)]
    seconds: Option<u64>,
}

pub fn run() -> Result<(), String> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => HostConfig::load(path)?,
        None => HostConfig::default(),
    };
    if cli.package_path.is_some() {
        config.package_path = cli.package_path;
    }
    if cli.device.is_some() {
        config.device_name = cli.device;
    }

    let engine = AudioEngine::new()?;
    if let Some(dir) = &config.package_path {
        engine.set_package_path(dir)?;
    }
    let state = AppState::new(engine.shared()).with_assets_dir(&config.assets_dir);

    let mut watcher = ScriptWatcher::new(cli.script);
    if let Some(source) = watcher.poll()? {
        compile(&state, source)?;
    }

    let host = StreamHost::start(engine, config.device_name.as_deref())?;
    log::info!(
        "Running {} at {} Hz ({} channels)",
        watcher.path.display(),
        host.sample_rate,
        host.channels
    );

    let poll_interval = Duration::from_millis(config.poll_interval_ms.max(1));
    let report_interval = Duration::from_millis(config.report_interval_ms.max(1));
    let deadline = cli.seconds.map(|s| Instant::now() + Duration::from_secs(s));
    let mut last_report = Instant::now();

    loop {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }
        std::thread::sleep(poll_interval);

        match watcher.poll() {
            Ok(Some(source)) => {
                log::info!("Script changed, recompiling");
                compile(&state, source)?;
            }
            Ok(None) => {}
            Err(e) => log::warn!("{e}"),
        }

        if last_report.elapsed() >= report_interval {
            report(&state)?;
            last_report = Instant::now();
        }
    }

    report(&state)?;
    drop(host);
    Ok(())
}

/// Write telemetry and any new script output to the log, then clear the
/// output log so the next report only shows new lines.
///
/// Best-effort: the clear is applied by the audio thread on its next write,
/// and that write lands after the clear. Entries written between the read
/// and the `clear_log` call are dropped unreported; the log is a monitor,
/// not a transcript.
fn report(state: &AppState) -> Result<(), String> {
    let timings = read_timings(state)?;
    let monitor = read_monitor(state)?;
    log::info!(
        "output {:+.4} | monitor {:+.4} | compile {:.6}s | block {:.6}s",
        get_output(state)?,
        monitor.last().copied().unwrap_or(0.0),
        timings.last_compile_seconds,
        timings.last_block_seconds
    );

    let messages = read_log(state)?;
    for message in &messages {
        match message.kind {
            LogKind::Text => log::info!("[script] {}", message.text),
            LogKind::Error => log::warn!("[script] {}", message.text),
        }
    }
    if !messages.is_empty() {
        clear_log(state)?;
    }
    Ok(())
}

/// Re-reads the script file and reports when its contents change.
struct ScriptWatcher {
    path: PathBuf,
    last_source: Option<String>,
}

impl ScriptWatcher {
    fn new(path: PathBuf) -> Self {
        Self { path, last_source: None }
    }

    fn poll(&mut self) -> Result<Option<String>, String> {
        let source = std::fs::read_to_string(&self.path)
            .map_err(|e| format!("Failed to read {}: {e}", self.path.display()))?;
        if self.last_source.as_deref() == Some(source.as_str()) {
            return Ok(None);
        }
        self.last_source = Some(source.clone());
        Ok(Some(source))
    }
}
