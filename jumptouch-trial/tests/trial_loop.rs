use jumptouch_core::{DrawSurface, Environment, Point, Rgba, TrialPhase, TrialResult};
use jumptouch_trial::{ConfigError, Trial, TrialConfig, TrialEvent};

const FRAME_MS: f64 = 16.0;

#[derive(Debug, Clone, PartialEq)]
enum Op {
    Clear,
    Rect(Rgba),
    Circle(Point),
}

#[derive(Default)]
struct RecordingSurface {
    frames: Vec<Vec<Op>>,
}

impl RecordingSurface {
    fn current(&mut self) -> &mut Vec<Op> {
        if self.frames.is_empty() {
            self.frames.push(Vec::new());
        }
        self.frames.last_mut().unwrap()
    }

    fn last_background(&self) -> Option<Rgba> {
        self.frames.last()?.iter().find_map(|op| match op {
            Op::Rect(c) => Some(*c),
            _ => None,
        })
    }

    fn last_circles(&self) -> Vec<Point> {
        self.frames.last().map(|f| circles(f)).unwrap_or_default()
    }
}

fn circles(frame: &[Op]) -> Vec<Point> {
    frame
        .iter()
        .filter_map(|op| match op {
            Op::Circle(p) => Some(*p),
            _ => None,
        })
        .collect()
}

impl DrawSurface for RecordingSurface {
    fn clear(&mut self) {
        self.frames.push(vec![Op::Clear]);
    }
    fn fill_rect(&mut self, _origin: Point, _w: f32, _h: f32, color: Rgba) {
        self.current().push(Op::Rect(color));
    }
    fn fill_circle(&mut self, center: Point, _radius: f32, _color: Rgba) {
        self.current().push(Op::Circle(center));
    }
}

struct Harness {
    trial: Trial,
    surface: RecordingSurface,
    now: f64,
    events: Vec<TrialEvent>,
}

impl Harness {
    fn new(config: TrialConfig) -> Self {
        let env = Environment {
            viewport_width: 1280,
            viewport_height: 720,
            user_agent: "test-agent".into(),
            platform: "test-platform".into(),
        };
        let mut trial = Trial::new(config, env).expect("valid config");
        trial.start(0.0);
        Self {
            trial,
            surface: RecordingSurface::default(),
            now: 0.0,
            events: Vec::new(),
        }
    }

    /// Advances the clock by one frame interval, firing timers and the frame.
    fn step(&mut self) {
        self.now += FRAME_MS;
        let timers = self.trial.poll_timers(self.now);
        self.events.extend(timers);
        if self.trial.wants_frame() {
            let frame = self.trial.on_frame(self.now, &mut self.surface);
            self.events.extend(frame);
        }
    }

    /// Steps until the first running frame has been drawn.
    fn run_until_running(&mut self) {
        for _ in 0..100 {
            if !self.trial.frame_timestamps().is_empty() {
                return;
            }
            self.step();
        }
        panic!("trial never started running");
    }

    fn target_position(&self, id: usize) -> Point {
        self.trial
            .live_targets()
            .find(|t| t.id == id)
            .map(|t| t.position())
            .expect("target still live")
    }

    /// Touches target `id` where it is drawn now and releases a bit later.
    fn tap_target(&mut self, id: usize) {
        let p = self.target_position(id);
        self.trial.on_touch_start(p.x + 2.0, p.y - 2.0, self.now + 1.0);
        self.trial.on_touch_end(self.now + 5.0);
        self.step();
    }

    fn completed(&self) -> Vec<&TrialResult> {
        self.events
            .iter()
            .filter_map(|e| match e {
                TrialEvent::Completed(r) => Some(r.as_ref()),
                _ => None,
            })
            .collect()
    }

    fn run_until_completed(&mut self) -> TrialResult {
        for _ in 0..1000 {
            if let Some(r) = self.completed().first() {
                return (*r).clone();
            }
            self.step();
        }
        panic!("trial never completed");
    }
}

fn line_config(n: usize) -> TrialConfig {
    let pre: Vec<(f32, f32)> = (0..n).map(|i| (-6.0 + 4.0 * i as f32, 0.0)).collect();
    let post: Vec<(f32, f32)> = pre.iter().map(|&(x, y)| (x, y + 3.0)).collect();
    TrialConfig::with_targets(&pre, &post)
}

#[test]
fn touching_targets_in_order_succeeds() {
    let mut h = Harness::new(line_config(4));
    h.run_until_running();
    for id in 0..4 {
        h.tap_target(id);
    }
    assert_eq!(h.trial.phase(), TrialPhase::Ended);

    let r = h.run_until_completed();
    assert_eq!(r.choice_order, vec![0, 1, 2, 3]);
    assert!(r.success);
    assert!(!r.late_response);
    assert!(r.order_response);
    assert!(!r.too_many_touches);
    assert!(r.screen_in_landscape);
    assert_eq!(r.touch_on.len(), 4);
    assert_eq!(r.touch_off.len(), 4);
    assert_eq!(r.user_info, "test-agent");
    assert_eq!(r.platform, "test-platform");
    assert_eq!(r.window_width, 1280);
}

#[test]
fn reversed_order_is_recorded_and_fails() {
    let mut h = Harness::new(line_config(2));
    h.run_until_running();
    h.tap_target(1);
    h.tap_target(0);

    let r = h.run_until_completed();
    assert_eq!(r.choice_order, vec![1, 0]);
    assert!(!r.order_response);
    assert!(!r.success);
    assert!(!r.late_response);
}

#[test]
fn mismatched_positions_fail_before_any_frame() {
    let mut cfg = line_config(4);
    cfg.shifted_target_pos_x.truncate(3);
    cfg.shifted_target_pos_y.truncate(3);
    let err = Trial::new(cfg, Environment::new(1280, 720)).err();
    assert!(matches!(err, Some(ConfigError::PositionMismatch { .. })));
}

#[test]
fn priming_draws_blank_frames_then_waits() {
    let mut h = Harness::new(line_config(2));
    for _ in 0..10 {
        h.step();
    }
    assert_eq!(h.trial.phase(), TrialPhase::Priming);
    assert_eq!(h.surface.frames.len(), 10);
    assert!(h.surface.frames.iter().all(|f| f == &vec![Op::Clear]));
    assert!(!h.trial.wants_frame());
    assert_eq!(h.trial.next_deadline(), Some(160.0 + 100.0));

    h.run_until_running();
    assert!(h
        .events
        .iter()
        .any(|e| matches!(e, TrialEvent::Running { at } if *at >= 260.0)));
    assert_eq!(h.surface.last_circles().len(), 2);
    assert_eq!(h.surface.last_background(), Some(Rgba::GREY));
}

#[test]
fn zero_priming_frames_go_straight_to_the_delay() {
    let mut cfg = line_config(2);
    cfg.priming_frames = 0;
    let mut h = Harness::new(cfg);
    assert!(!h.trial.wants_frame());
    assert_eq!(h.trial.next_deadline(), Some(100.0));

    h.run_until_running();
    let running_at = h
        .events
        .iter()
        .find_map(|e| match e {
            TrialEvent::Running { at } => Some(*at),
            _ => None,
        })
        .expect("running");
    assert!(running_at >= 100.0 && running_at < 100.0 + FRAME_MS);
    assert_eq!(h.trial.frame_timestamps(), &[running_at]);
    // The only frame drawn is the first running one.
    assert_eq!(h.surface.frames.len(), 1);
    assert_eq!(h.surface.last_circles().len(), 2);
}

#[test]
fn display_is_blank_after_the_last_target() {
    let mut h = Harness::new(line_config(2));
    h.run_until_running();
    h.tap_target(0);
    assert_eq!(h.surface.last_circles().len(), 1);

    h.tap_target(1);
    assert_eq!(h.trial.phase(), TrialPhase::Ended);
    let frames = h.surface.frames.len();
    assert_eq!(h.surface.frames.last(), Some(&vec![Op::Clear]));

    h.run_until_completed();
    assert_eq!(h.surface.frames.len(), frames);
}

#[test]
fn timeout_leaves_a_blank_display() {
    let mut h = Harness::new(line_config(2));
    h.run_until_running();
    h.trial.on_touch_start(5.0, 5.0, h.now);
    h.run_until_completed();
    assert_eq!(h.surface.frames.last(), Some(&vec![Op::Clear]));
}

#[test]
fn clock_waits_for_first_touch() {
    let mut h = Harness::new(line_config(2));
    h.run_until_running();
    for _ in 0..200 {
        h.step();
    }
    // No touch yet: no flash, no shift, no timeout.
    assert_eq!(h.trial.phase(), TrialPhase::Running);
    assert!(h.trial.interaction().start_time().is_none());
    assert_eq!(h.surface.last_background(), Some(Rgba::GREY));
}

#[test]
fn flash_and_shift_follow_elapsed_time() {
    let mut cfg = line_config(2);
    cfg.change_onset = vec![200.0];
    cfg.flash_duration = 40.0;
    cfg.trial_duration = 2000.0;
    let mut h = Harness::new(cfg);
    h.run_until_running();
    let pre = h.surface.last_circles();

    // A touch in an empty corner starts the clock without hitting anything.
    h.trial.on_touch_start(5.0, 5.0, h.now);
    let start = h.now;
    while h.now - start < 200.0 {
        h.step();
    }
    let state = h.trial.last_flash_state().unwrap();
    assert!(state.flash_on && state.shift_active);
    assert_eq!(h.surface.last_background(), Some(Rgba::WHITE));
    let post = h.surface.last_circles();
    assert_ne!(pre, post);
    assert!(post.iter().zip(&pre).all(|(a, b)| a.x == b.x && a.y > b.y));

    while h.now - start < 260.0 {
        h.step();
    }
    let state = h.trial.last_flash_state().unwrap();
    assert!(!state.flash_on && state.shift_active);
    assert_eq!(h.surface.last_background(), Some(Rgba::GREY));

    h.trial.end(h.now);
    let r = h.run_until_completed();
    assert_eq!(r.flash_on_times.len(), 1);
    assert_eq!(r.flash_off_times.len(), 1);
    assert!(r.flash_on_times[0] >= 200.0);
    assert_eq!(r.change_onset, Some(200.0));
    assert_eq!(r.scheduled_change_onset, vec![200.0]);
}

#[test]
fn flash_free_trial_never_shifts() {
    let mut cfg = line_config(2);
    cfg.change_onset.clear();
    let mut h = Harness::new(cfg);
    h.run_until_running();
    let pre = h.surface.last_circles();
    h.trial.on_touch_start(5.0, 5.0, h.now);
    let r = h.run_until_completed();
    let drawn: Vec<Vec<Point>> = h
        .surface
        .frames
        .iter()
        .map(|f| circles(f))
        .filter(|c| !c.is_empty())
        .collect();
    assert!(drawn.iter().all(|c| c == &pre));
    assert!(r.flash_on_times.is_empty());
    assert_eq!(r.change_onset, None);
    assert!(r.late_response);
}

#[test]
fn timeout_ends_incomplete_trial_as_late() {
    let mut h = Harness::new(line_config(3));
    h.run_until_running();
    h.tap_target(0);
    let r = h.run_until_completed();

    assert!(r.late_response);
    assert!(!r.success);
    assert_eq!(r.choice_order, vec![0]);
    let start = r.start_time.unwrap();
    let end = r.end_time.unwrap();
    assert!(end - start >= 1000.0);
    assert!(end - start < 1000.0 + FRAME_MS);
    assert_eq!(r.animation_timestamps.last(), Some(&end));
}

#[test]
fn only_latest_pending_touch_is_tested() {
    let mut h = Harness::new(line_config(2));
    h.run_until_running();
    let p0 = h.target_position(0);
    let p1 = h.target_position(1);
    h.trial.on_touch_start(p0.x, p0.y, h.now);
    h.trial.on_touch_start(p1.x, p1.y, h.now + 1.0);
    h.step();
    assert_eq!(h.trial.choice_order(), &[1]);

    h.tap_target(0);
    let r = h.run_until_completed();
    assert_eq!(r.touch_on.len(), 3);
    assert_eq!(r.touch_x, vec![p0.x, p1.x, p0.x + 2.0]);
    assert!(r.too_many_touches);
    assert!(!r.success);
}

#[test]
fn touch_during_priming_starts_clock() {
    let mut h = Harness::new(line_config(1));
    h.step();
    assert!(h.trial.on_touch_start(0.0, 0.0, h.now));
    assert_eq!(h.trial.interaction().start_time(), Some(h.now));
}

#[test]
fn zero_targets_end_on_first_running_frame() {
    let mut h = Harness::new(line_config(0));
    h.run_until_running();
    assert_eq!(h.trial.phase(), TrialPhase::Ended);
    let r = h.run_until_completed();
    assert!(r.choice_order.is_empty());
    assert!(!r.late_response);
    assert_eq!(r.animation_timestamps.len(), 1);
}

#[test]
fn termination_is_idempotent() {
    let mut h = Harness::new(line_config(2));
    h.run_until_running();
    assert!(h.trial.end(h.now));
    let first = h.trial.result().cloned();
    assert!(!h.trial.end(h.now + 50.0));
    assert_eq!(h.trial.result().cloned(), first);

    for _ in 0..200 {
        h.step();
    }
    assert_eq!(h.completed().len(), 1);
    assert!(h.trial.is_finished());
    assert_eq!(h.trial.result().unwrap().end_time, first.unwrap().end_time);
}

#[test]
fn nothing_runs_after_end() {
    let mut h = Harness::new(line_config(2));
    h.run_until_running();
    h.trial.end(h.now);
    let frames = h.trial.frame_timestamps().len();
    assert!(!h.trial.wants_frame());

    let mut scratch = RecordingSurface::default();
    assert!(h.trial.on_frame(h.now + 1.0, &mut scratch).is_empty());
    assert!(scratch.frames.is_empty());
    assert!(!h.trial.on_touch_start(1.0, 1.0, h.now + 2.0));
    assert!(!h.trial.on_touch_end(h.now + 3.0));
    assert_eq!(h.trial.frame_timestamps().len(), frames);
    assert!(h.trial.interaction().log().is_empty());
}

#[test]
fn hand_off_waits_for_post_trial_delay() {
    let mut cfg = line_config(1);
    cfg.wait_after = 300.0;
    let mut h = Harness::new(cfg);
    h.run_until_running();
    h.tap_target(0);
    let ended_at = h
        .events
        .iter()
        .find_map(|e| match e {
            TrialEvent::Ended { at, .. } => Some(*at),
            _ => None,
        })
        .expect("ended");
    assert_eq!(h.trial.next_deadline(), Some(ended_at + 300.0));
    assert!(h.trial.poll_timers(ended_at + 299.0).is_empty());
    let fired = h.trial.poll_timers(ended_at + 300.0);
    assert!(matches!(fired.as_slice(), [TrialEvent::Completed(r)] if r.success));
}

#[test]
fn result_round_trips_through_json() {
    let mut h = Harness::new(line_config(2));
    h.run_until_running();
    h.tap_target(0);
    h.tap_target(1);
    let r = h.run_until_completed();

    let json = serde_json::to_value(&r).unwrap();
    assert_eq!(json["choice_order"], serde_json::json!([0, 1]));
    assert_eq!(json["success"], serde_json::json!(true));
    assert_eq!(json["scheduled_change_onset"], serde_json::json!([500.0]));
    let back: TrialResult = serde_json::from_value(json).unwrap();
    assert_eq!(back, r);
}
