use crate::session::{ResultSink, TrialQueue, host_environment};
use anyhow::{Result, bail};
use jumptouch_core::TrialResult;
use jumptouch_render::SkiaSurface;
use jumptouch_timing::Timer;
use jumptouch_trial::{Trial, TrialEvent};
use std::io::Write;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct DryRunOptions {
    pub width: u32,
    pub height: u32,
    pub refresh_hz: f64,
    /// Milliseconds between scripted touches.
    pub tap_interval: f64,
    /// How long each scripted touch is held, ms.
    pub hold: f64,
}

impl Default for DryRunOptions {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            refresh_hz: 60.0,
            tap_interval: 150.0,
            hold: 40.0,
        }
    }
}

/// Touches the first live target, in serial order, every `interval` ms
/// once the trial is running.
struct ScriptedParticipant {
    interval: f64,
    hold: f64,
    next_tap: Option<f64>,
    release_at: Option<f64>,
}

impl ScriptedParticipant {
    fn new(interval: f64, hold: f64) -> Self {
        Self {
            interval,
            hold,
            next_tap: None,
            release_at: None,
        }
    }

    fn act(&mut self, trial: &mut Trial, now: f64) {
        if self.release_at.is_some_and(|t| now >= t) {
            trial.on_touch_end(now);
            self.release_at = None;
        }
        if !trial.phase().is_running() {
            return;
        }
        let due = *self.next_tap.get_or_insert(now + self.interval);
        if now < due || self.release_at.is_some() {
            return;
        }
        let Some(at) = trial.live_targets().next().map(|t| t.position()) else {
            return;
        };
        trial.on_touch_start(at.x, at.y, now);
        self.release_at = Some(now + self.hold);
        self.next_tap = Some(now + self.interval);
    }

    fn next_action(&self) -> Option<f64> {
        match (self.next_tap, self.release_at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

/// Runs every queued trial headless against `timer`, writing each result to
/// `sink`. Returns the number of trials completed.
pub fn run<T: Timer, W: Write>(
    mut queue: TrialQueue,
    sink: &mut ResultSink<W>,
    timer: &mut T,
    opts: &DryRunOptions,
) -> Result<usize> {
    let env = host_environment(opts.width, opts.height);
    let mut surface = SkiaSurface::new(opts.width, opts.height)?;
    let mut frame_buffer = vec![0u8; surface.data().len()];
    let frame_ms = 1e3 / opts.refresh_hz.max(1.0);

    info!(
        trials = queue.len(),
        width = opts.width,
        height = opts.height,
        refresh_hz = opts.refresh_hz,
        "dry_run_started"
    );

    while let Some(mut trial) = queue.start_next(env.clone(), timer.now())? {
        let mut participant = ScriptedParticipant::new(opts.tap_interval, opts.hold);
        let result = run_trial(
            &mut trial,
            &mut participant,
            &mut surface,
            &mut frame_buffer,
            timer,
            frame_ms,
        )?;
        sink.write(&result)?;
    }

    let stats = timer.calibration_stats();
    info!(
        completed = sink.written(),
        frames = stats.samples,
        avg_frame_ms = stats.average_frame_time_ms,
        jitter_ms = stats.jitter_ms,
        "dry_run_finished"
    );
    Ok(sink.written())
}

fn run_trial<T: Timer>(
    trial: &mut Trial,
    participant: &mut ScriptedParticipant,
    surface: &mut SkiaSurface,
    frame_buffer: &mut [u8],
    timer: &mut T,
    frame_ms: f64,
) -> Result<TrialResult> {
    let mut next_frame = timer.now();
    loop {
        let now = timer.now();
        participant.act(trial, now);

        let mut events = trial.poll_timers(now);
        if trial.wants_frame() && now >= next_frame {
            surface.render_frame(|s| events.extend(trial.on_frame(now, s)), frame_buffer, timer)?;
            next_frame = now + frame_ms;
        }

        for event in events {
            match event {
                TrialEvent::Running { at } => debug!(at, "dry_run_running"),
                TrialEvent::Ended { at, .. } => debug!(at, "dry_run_ended"),
                TrialEvent::Completed(result) => return Ok(*result),
            }
        }

        let wake = [
            trial.wants_frame().then_some(next_frame),
            trial.next_deadline(),
            participant.next_action(),
        ]
        .into_iter()
        .flatten()
        .fold(f64::INFINITY, f64::min);
        if wake.is_infinite() {
            bail!("trial stalled with no frame or timer pending");
        }

        let wait = wake - timer.now();
        if wait > 0.0 {
            timer.sleep(Duration::from_nanos((wait * 1e6).ceil() as u64));
        }
    }
}
