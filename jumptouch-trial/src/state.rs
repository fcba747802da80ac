use crate::config::{ConfigError, TrialConfig};
use crate::flash::{FlashScheduler, FlashState};
use crate::interaction::InteractionTracker;
use crate::outcome::ResponseChecks;
use crate::schedule::{Scheduler, Task};
use crate::targets::{Target, TargetRegistry};
use jumptouch_core::{DrawSurface, Environment, Point, Shape, TrialPhase, TrialResult};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub enum TrialEvent {
    /// Pre-roll finished, running frames start now.
    Running { at: f64 },
    /// Termination transition ran; the result is assembled.
    Ended { at: f64, result: Box<TrialResult> },
    /// Post-trial delay elapsed; the host takes the result and moves on.
    Completed(Box<TrialResult>),
}

/// One serial flash/jump touch trial.
///
/// The host drives it from a single thread: frames through [`Trial::on_frame`]
/// whenever [`Trial::wants_frame`] is set, delayed work through
/// [`Trial::poll_timers`], input through the touch callbacks. Nothing runs
/// between those calls, so a touch becomes visible to hit-testing on the
/// next frame.
pub struct Trial {
    phase: TrialPhase,
    config: TrialConfig,
    env: Environment,
    flash: FlashScheduler,
    targets: TargetRegistry,
    input: InteractionTracker,
    background: Shape,
    scheduler: Scheduler,
    last_state: Option<FlashState>,
    primed_frames: u32,
    started: bool,
    frame_timestamps: Vec<f64>,
    end_time: Option<f64>,
    result: Option<TrialResult>,
    handed_off: bool,
}

impl Trial {
    /// Fails before any frame runs when the configuration is malformed.
    pub fn new(config: TrialConfig, env: Environment) -> Result<Self, ConfigError> {
        config.validate()?;

        let flash = FlashScheduler::new(
            config.change_onset.clone(),
            config.flash_duration,
            config.flash_color,
            config.background_color,
        );
        let targets = TargetRegistry::new(
            &config.screen_positions(&env),
            config.circle_radius_px(),
            config.circle_color,
            config.touch_tolerance_px(),
        );
        let background = Shape::rectangle(
            Point::default(),
            env.viewport_width as f32,
            env.viewport_height as f32,
            config.background_color,
        );

        Ok(Self {
            phase: TrialPhase::Priming,
            config,
            env,
            flash,
            targets,
            input: InteractionTracker::new(),
            background,
            scheduler: Scheduler::new(),
            last_state: None,
            primed_frames: 0,
            started: false,
            frame_timestamps: Vec::new(),
            end_time: None,
            result: None,
            handed_off: false,
        })
    }

    /// Attaches input and schedules the pre-roll. Later calls do nothing.
    pub fn start(&mut self, now: f64) {
        if self.started || self.phase.is_terminal() {
            return;
        }
        self.started = true;
        self.input.attach();
        if self.config.priming_frames == 0 {
            self.scheduler
                .set_timeout(now + self.config.priming_delay, Task::BeginRunning);
        } else {
            self.scheduler.request_frame(Task::Prime);
        }
        info!(
            targets = self.targets.initial_count(),
            flashes = self.config.change_onset.len(),
            trial_duration = self.config.trial_duration,
            "trial_started"
        );
    }

    pub fn on_touch_start(&mut self, x: f32, y: f32, timestamp: f64) -> bool {
        self.input.on_touch_start(x, y, timestamp)
    }

    pub fn on_touch_end(&mut self, timestamp: f64) -> bool {
        self.input.on_touch_end(timestamp)
    }

    pub fn wants_frame(&self) -> bool {
        self.scheduler.frame_pending()
    }

    pub fn next_deadline(&self) -> Option<f64> {
        self.scheduler.next_deadline()
    }

    /// Runs the requested frame callback, if any, drawing into `surface`.
    pub fn on_frame(&mut self, timestamp: f64, surface: &mut dyn DrawSurface) -> Vec<TrialEvent> {
        let mut events = Vec::new();
        match self.scheduler.take_frame() {
            Some(Task::Prime) => self.prime(timestamp, surface),
            Some(Task::Animate) => self.animate(timestamp, surface, &mut events),
            Some(other) => debug!(task = ?other, "unexpected_frame_task"),
            None => {}
        }
        events
    }

    /// Fires every delayed task due at `now`.
    pub fn poll_timers(&mut self, now: f64) -> Vec<TrialEvent> {
        let mut events = Vec::new();
        for task in self.scheduler.take_due(now) {
            match task {
                Task::BeginRunning if self.phase == TrialPhase::Priming => {
                    self.phase = TrialPhase::Running;
                    self.scheduler.request_frame(Task::Animate);
                    debug!(at = now, "trial_running");
                    events.push(TrialEvent::Running { at: now });
                }
                Task::HandOff if !self.handed_off => {
                    if let Some(result) = &self.result {
                        self.handed_off = true;
                        info!(success = result.success, "trial_handed_off");
                        events.push(TrialEvent::Completed(Box::new(result.clone())));
                    }
                }
                _ => {}
            }
        }
        events
    }

    fn prime(&mut self, timestamp: f64, surface: &mut dyn DrawSurface) {
        surface.clear();
        self.primed_frames += 1;
        if self.primed_frames < self.config.priming_frames {
            self.scheduler.request_frame(Task::Prime);
        } else {
            self.scheduler
                .set_timeout(timestamp + self.config.priming_delay, Task::BeginRunning);
        }
    }

    fn animate(&mut self, timestamp: f64, surface: &mut dyn DrawSurface, events: &mut Vec<TrialEvent>) {
        self.scheduler.request_frame(Task::Animate);

        // The trial clock starts with the first touch.
        let elapsed = self.input.start_time().map(|start| timestamp - start);
        let state = match elapsed {
            Some(e) => self.flash.evaluate(e),
            None => self.flash.idle(),
        };
        self.last_state = Some(state);

        self.targets
            .apply_shift_and_hit_test(state.shift_active, self.input.pending_mut());
        self.background.recolor(state.color);

        surface.clear();
        self.background.draw(surface);
        self.targets.draw(surface);
        self.frame_timestamps.push(timestamp);

        let timed_out = elapsed.is_some_and(|e| e >= self.config.trial_duration);
        if (timed_out || self.targets.all_consumed()) && self.end(timestamp) {
            // The screen stays blank through the post-trial delay.
            surface.clear();
            if let Some(result) = &self.result {
                events.push(TrialEvent::Ended {
                    at: timestamp,
                    result: Box::new(result.clone()),
                });
            }
        }
    }

    /// Termination transition: stops frames and timers, detaches input,
    /// assembles the result and schedules the hand-off.
    ///
    /// Returns false, changing nothing, when the trial had already ended.
    pub fn end(&mut self, timestamp: f64) -> bool {
        if self.phase.is_terminal() {
            return false;
        }
        self.phase = TrialPhase::Ended;
        self.end_time = Some(timestamp);

        self.scheduler.stop();
        self.input.detach();

        let result = self.assemble_result();
        info!(
            choices = ?result.choice_order,
            late = result.late_response,
            in_order = result.order_response,
            success = result.success,
            "trial_ended"
        );
        self.result = Some(result);
        self.scheduler
            .set_timeout(timestamp + self.config.wait_after, Task::HandOff);
        true
    }

    fn assemble_result(&self) -> TrialResult {
        let cfg = &self.config;
        let checks = ResponseChecks::evaluate(
            self.targets.choice_order(),
            self.targets.initial_count(),
            self.input.touch_count(),
            &self.env,
        );
        let (position_x, position_y) = cfg.positions_px();
        let (shifted_position_x, shifted_position_y) = cfg.shifted_positions_px();

        TrialResult {
            start_time: self.input.start_time(),
            end_time: self.end_time,
            flash_on_times: self.flash.on_times().to_vec(),
            flash_off_times: self.flash.off_times().to_vec(),
            touch_on: self.input.touch_on_times(),
            touch_off: self.input.touch_off_times(),
            scheduled_change_onset: cfg.change_onset.clone(),
            flash_duration: cfg.flash_duration,
            change_onset: self.flash.first_onset(),
            trial_duration: cfg.trial_duration,
            animation_timestamps: self.frame_timestamps.clone(),
            touch_x: self.input.touch_xs(),
            touch_y: self.input.touch_ys(),
            choice_order: self.targets.choice_order().to_vec(),
            position_x,
            position_y,
            shifted_position_x,
            shifted_position_y,
            late_response: checks.late_response,
            order_response: checks.order_response,
            too_many_touches: checks.too_many_touches,
            screen_in_landscape: checks.screen_in_landscape,
            success: checks.success,
            window_width: self.env.viewport_width,
            window_height: self.env.viewport_height,
            user_info: self.env.user_agent.clone(),
            platform: self.env.platform.clone(),
        }
    }

    pub fn phase(&self) -> TrialPhase {
        self.phase
    }

    pub fn config(&self) -> &TrialConfig {
        &self.config
    }

    /// Flash state computed by the latest running frame.
    pub fn last_flash_state(&self) -> Option<FlashState> {
        self.last_state
    }

    pub fn live_targets(&self) -> impl Iterator<Item = &Target> {
        self.targets.live()
    }

    pub fn choice_order(&self) -> &[usize] {
        self.targets.choice_order()
    }

    pub fn interaction(&self) -> &InteractionTracker {
        &self.input
    }

    pub fn frame_timestamps(&self) -> &[f64] {
        &self.frame_timestamps
    }

    pub fn result(&self) -> Option<&TrialResult> {
        self.result.as_ref()
    }

    /// The result has been handed to the host; the trial can be dropped.
    pub fn is_finished(&self) -> bool {
        self.handed_off
    }
}
