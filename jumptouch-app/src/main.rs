mod app;
mod dry_run;
mod session;

use anyhow::{Context, Result, bail};
use app::App;
use clap::Parser;
use dry_run::DryRunOptions;
use jumptouch_timing::HighPrecisionTimer;
use jumptouch_trial::{CalibrationData, DesignSpec, TrialConfig, check_calibration};
use session::{ResultSink, TrialQueue};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Serial flash/jump touch trials. Results go to stdout, one JSON object
/// per trial; logs go to stderr.
#[derive(Parser, Debug)]
#[command(name = "jumptouch", version)]
struct Cli {
    /// JSON file with one trial configuration or a list of them
    #[arg(long, value_name = "PATH", conflicts_with = "design")]
    config: Option<PathBuf>,

    /// JSON design file; the built-in design runs when neither this nor
    /// --config is given
    #[arg(long, value_name = "PATH")]
    design: Option<PathBuf>,

    /// Seed for the design generator, random when omitted
    #[arg(long)]
    seed: Option<u64>,

    /// Overrides the design's repetition count
    #[arg(long)]
    repetitions: Option<usize>,

    /// Run headless with a scripted participant instead of opening a window
    #[arg(long)]
    dry_run: bool,

    /// Dry-run viewport width in pixels
    #[arg(long, default_value_t = 1280, requires = "dry_run")]
    width: u32,

    /// Dry-run viewport height in pixels
    #[arg(long, default_value_t = 720, requires = "dry_run")]
    height: u32,

    /// Dry-run frame rate
    #[arg(long, default_value_t = 60.0, requires = "dry_run")]
    refresh_hz: f64,

    /// Dry-run milliseconds between scripted touches
    #[arg(long, default_value_t = 150.0, requires = "dry_run")]
    tap_interval: f64,

    /// Calibrated window width in degrees of visual angle
    #[arg(long, requires = "view_dist_mm")]
    win_width_deg: Option<f32>,

    /// Calibrated viewing distance in millimetres
    #[arg(long, requires = "win_width_deg")]
    view_dist_mm: Option<f32>,
}

impl Cli {
    fn queue(&self) -> Result<TrialQueue> {
        if let Some(path) = &self.config {
            return TrialQueue::from_config_file(path);
        }

        let mut spec = match &self.design {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                serde_json::from_str::<DesignSpec>(&text)
                    .with_context(|| format!("parsing {}", path.display()))?
            }
            None => DesignSpec::default(),
        };
        if let Some(n) = self.repetitions {
            spec.repetitions = n;
        }
        let seed = self.seed.unwrap_or_else(rand::random);
        TrialQueue::from_design(&spec, &TrialConfig::default(), seed)
    }

    /// Refuses to start when a supplied calibration is out of range.
    fn verify_calibration(&self) -> Result<()> {
        let (Some(win_width_deg), Some(view_dist_mm)) = (self.win_width_deg, self.view_dist_mm)
        else {
            return Ok(());
        };
        let data = CalibrationData {
            win_width_deg,
            view_dist_mm,
        };
        if !check_calibration(&data) {
            bail!(
                "calibration out of range: {win_width_deg} dva at {view_dist_mm} mm, \
                 need at least 17 dva at 200-600 mm"
            );
        }
        info!(win_width_deg, view_dist_mm, "calibration_accepted");
        Ok(())
    }

    fn dry_run_options(&self) -> DryRunOptions {
        DryRunOptions {
            width: self.width,
            height: self.height,
            refresh_hz: self.refresh_hz,
            tap_interval: self.tap_interval,
            ..DryRunOptions::default()
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    cli.verify_calibration()?;
    let queue = cli.queue()?;
    if queue.is_empty() {
        warn!("no trials to run");
        return Ok(());
    }
    info!(trials = queue.len(), dry_run = cli.dry_run, "session_loaded");

    let mut sink = ResultSink::new(std::io::stdout());
    if cli.dry_run {
        let mut timer = HighPrecisionTimer::new();
        dry_run::run(queue, &mut sink, &mut timer, &cli.dry_run_options())?;
    } else {
        App::new(queue, sink).run()?;
    }
    Ok(())
}
