//! `rfscope` worker binary
//!
//!   RUST_LOG=rfscope_lib=debug rfscope --output-dir /tmp/rf sweep --start 50e6 --end 1e9
//!   rfscope --device rtlsdr live --center 100.3e6
//!
//! The exit status tells the supervisor how the run ended.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};

use rfscope_lib::domain::{DeviceKind, GainMode, ScanError, ScanResult, SweepConfig, WorkerProfile};
use rfscope_lib::worker::{self, ANTENNA_SWEEP, SPECTRUM_SWEEP};

#[derive(Parser)]
#[command(name = "rfscope", version, about = "SDR sweep and live spectrum worker")]
struct Cli {
    /// JSON worker profile; flags override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory the artifacts are published into
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    #[arg(long, value_enum, global = true)]
    device: Option<Device>,

    #[arg(long, global = true)]
    device_index: Option<u32>,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Clone, Copy, ValueEnum)]
enum Device {
    Simulated,
    Rtlsdr,
}

impl From<Device> for DeviceKind {
    fn from(device: Device) -> Self {
        match device {
            Device::Simulated => DeviceKind::Simulated,
            Device::Rtlsdr => DeviceKind::RtlSdr,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum SweepRole {
    AntennaSweep,
    SpectrumSweep,
}

impl SweepRole {
    fn name(self) -> &'static str {
        match self {
            SweepRole::AntennaSweep => ANTENNA_SWEEP,
            SweepRole::SpectrumSweep => SPECTRUM_SWEEP,
        }
    }
}

#[derive(Subcommand)]
enum Mode {
    /// Step through a frequency range and look for resonances
    Sweep(SweepArgs),
    /// Stream a live spectrum and waterfall at one frequency
    Live(LiveArgs),
}

#[derive(Args)]
struct SweepArgs {
    #[arg(long, value_enum, default_value = "antenna-sweep")]
    role: SweepRole,

    /// Start frequency in Hz
    #[arg(long)]
    start: Option<f64>,

    /// End frequency in Hz
    #[arg(long)]
    end: Option<f64>,

    /// Step in Hz
    #[arg(long)]
    step: Option<f64>,

    /// IQ samples per ladder point
    #[arg(long)]
    samples: Option<usize>,

    /// Dense sweep of `--span` Hz around this frequency instead of start/end/step
    #[arg(long, conflicts_with_all = ["start", "end", "step"])]
    targeted: Option<f64>,

    /// Span in Hz for a targeted sweep
    #[arg(long, default_value_t = 4e6)]
    span: f64,

    /// `auto` or gain in tenths of dB
    #[arg(long)]
    gain: Option<GainMode>,

    #[arg(long)]
    settle_ms: Option<u64>,
}

#[derive(Args)]
struct LiveArgs {
    /// Center frequency in Hz
    #[arg(long)]
    center: Option<f64>,

    #[arg(long)]
    fft_size: Option<usize>,

    #[arg(long)]
    averages: Option<usize>,

    /// Waterfall history rows
    #[arg(long)]
    rows: Option<usize>,

    #[arg(long)]
    gain: Option<GainMode>,

    /// Stop after this many cycles
    #[arg(long)]
    max_cycles: Option<u64>,
}

fn load_profile(cli: &Cli) -> ScanResult<WorkerProfile> {
    let mut profile = match &cli.config {
        Some(path) => WorkerProfile::load(path)?,
        None => WorkerProfile::default(),
    };
    if let Some(dir) = &cli.output_dir {
        profile.output_dir = dir.clone();
    }
    if let Some(device) = cli.device {
        profile.device = device.into();
    }
    if let Some(index) = cli.device_index {
        profile.device_index = index;
    }
    Ok(profile)
}

fn apply_sweep_args(profile: &mut WorkerProfile, args: &SweepArgs) {
    if let Some(center) = args.targeted {
        let base = profile.sweep.clone();
        profile.sweep = SweepConfig {
            gain: base.gain,
            sample_rate: base.sample_rate,
            settle_ms: base.settle_ms,
            segments: base.segments,
            ..SweepConfig::targeted(center, args.span)
        };
    }
    let sweep = &mut profile.sweep;
    if let Some(v) = args.start {
        sweep.start_hz = v;
    }
    if let Some(v) = args.end {
        sweep.end_hz = v;
    }
    if let Some(v) = args.step {
        sweep.step_hz = v;
    }
    if let Some(v) = args.samples {
        sweep.samples_per_point = v;
    }
    if let Some(v) = args.gain {
        sweep.gain = v;
    }
    if let Some(v) = args.settle_ms {
        sweep.settle_ms = v;
    }
}

fn apply_live_args(profile: &mut WorkerProfile, args: &LiveArgs) {
    let live = &mut profile.live;
    if let Some(v) = args.center {
        live.center_hz = v;
    }
    if let Some(v) = args.fft_size {
        live.fft_size = v;
    }
    if let Some(v) = args.averages {
        live.averages = v;
    }
    if let Some(v) = args.rows {
        live.waterfall_rows = v;
    }
    if let Some(v) = args.gain {
        live.gain = v;
    }
    if args.max_cycles.is_some() {
        live.max_cycles = args.max_cycles;
    }
}

/// Stop flag raised by SIGTERM (supervisor) or SIGINT (Ctrl+C)
fn stop_flag() -> ScanResult<Arc<AtomicBool>> {
    let stop = Arc::new(AtomicBool::new(false));
    for signal in [signal_hook::consts::SIGTERM, signal_hook::consts::SIGINT] {
        signal_hook::flag::register(signal, Arc::clone(&stop))
            .map_err(|e| ScanError::Config(format!("Failed to register signal handler: {e}")))?;
    }
    Ok(stop)
}

fn run(cli: Cli) -> ScanResult<i32> {
    let mut profile = load_profile(&cli)?;
    let stop = stop_flag()?;
    let driver = worker::driver_for(profile.device);

    match &cli.mode {
        Mode::Sweep(args) => {
            apply_sweep_args(&mut profile, args);
            let outcome = worker::run_sweep(&profile, args.role.name(), driver.as_ref(), stop)?;
            if let Some(reason) = &outcome.abort_reason {
                log::warn!("Sweep aborted: {reason}");
            }
            for r in &outcome.resonances {
                log::info!(
                    "Resonance {:.3} MHz, Q {:.1}, prominence {:.1} dB{}",
                    r.frequency_hz / 1e6,
                    r.q_factor,
                    r.prominence_db,
                    r.harmonic_number
                        .map(|n| format!(", harmonic {n}"))
                        .unwrap_or_default()
                );
            }
            Ok(outcome.exit_code())
        }
        Mode::Live(args) => {
            apply_live_args(&mut profile, args);
            worker::run_live(&profile, driver.as_ref(), stop)?;
            Ok(0)
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("rfscope_lib=info"))
        .init();

    let cli = Cli::parse();
    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{e}");
            e.exit_code()
        }
    };
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
