use anyhow::{Context, Result};
use jumptouch_core::{Environment, TrialResult};
use jumptouch_trial::{DesignSpec, Trial, TrialConfig, build_design};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Deserialize;
use std::collections::VecDeque;
use std::io::Write;
use std::path::Path;
use tracing::info;

#[derive(Deserialize)]
#[serde(untagged)]
enum ConfigFile {
    Many(Vec<TrialConfig>),
    One(Box<TrialConfig>),
}

/// Trials waiting to run, first in first out.
pub struct TrialQueue {
    pending: VecDeque<TrialConfig>,
    total: usize,
}

impl TrialQueue {
    /// Every configuration is validated up front so a bad entry fails the
    /// session before the first trial is shown.
    pub fn new(configs: Vec<TrialConfig>) -> Result<Self> {
        for (i, config) in configs.iter().enumerate() {
            config
                .validate()
                .with_context(|| format!("trial {i} is invalid"))?;
        }
        Ok(Self {
            total: configs.len(),
            pending: configs.into(),
        })
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let configs = match serde_json::from_str(text).context("parsing trial configuration")? {
            ConfigFile::Many(configs) => configs,
            ConfigFile::One(config) => vec![*config],
        };
        Self::new(configs)
    }

    pub fn from_config_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("loading {}", path.display()))
    }

    /// Generates the trials of `spec`; fields the design doesn't set come
    /// from `base`.
    pub fn from_design(spec: &DesignSpec, base: &TrialConfig, seed: u64) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        let trials = build_design(spec, &mut rng)?;
        info!(seed, trials = trials.len(), "design_built");
        Self::new(trials.iter().map(|t| t.to_config(base)).collect())
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Builds the next trial for `env` and starts it at `now`.
    pub fn start_next(&mut self, env: Environment, now: f64) -> Result<Option<Trial>> {
        let Some(config) = self.pending.pop_front() else {
            return Ok(None);
        };
        let mut trial = Trial::new(config, env)?;
        trial.start(now);
        info!(
            index = self.total - self.pending.len(),
            total = self.total,
            "trial_loaded"
        );
        Ok(Some(trial))
    }
}

/// Writes one JSON object per line for every completed trial.
pub struct ResultSink<W: Write> {
    out: W,
    written: usize,
}

impl<W: Write> ResultSink<W> {
    pub fn new(out: W) -> Self {
        Self { out, written: 0 }
    }

    pub fn write(&mut self, result: &TrialResult) -> Result<()> {
        serde_json::to_writer(&mut self.out, result)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> usize {
        self.written
    }
}

/// Display snapshot stamped with this build and host.
pub fn host_environment(width: u32, height: u32) -> Environment {
    Environment {
        viewport_width: width,
        viewport_height: height,
        user_agent: format!("jumptouch/{}", env!("CARGO_PKG_VERSION")),
        platform: format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH),
    }
}
