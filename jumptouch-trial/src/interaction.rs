use jumptouch_core::Point;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchPhase {
    Start,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchEvent {
    pub phase: TouchPhase,
    /// Contact location; releases carry none.
    pub at: Option<Point>,
    pub timestamp: f64,
}

/// Append-only log of touches plus the single pending touch slot.
///
/// Only the latest unmatched touch start is kept pending; an earlier one is
/// overwritten even if no frame hit-tested it.
#[derive(Debug, Clone, Default)]
pub struct InteractionTracker {
    log: Vec<TouchEvent>,
    pending: Option<Point>,
    start_time: Option<f64>,
    listening: bool,
}

impl InteractionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self) {
        self.listening = true;
    }

    /// Stops accepting input. Safe to call repeatedly or before `attach`.
    pub fn detach(&mut self) {
        self.listening = false;
    }

    /// Returns false when the event was dropped because input is detached.
    pub fn on_touch_start(&mut self, x: f32, y: f32, timestamp: f64) -> bool {
        if !self.listening {
            return false;
        }
        if self.start_time.is_none() {
            self.start_time = Some(timestamp);
        }
        let at = Point::new(x, y);
        self.pending = Some(at);
        self.log.push(TouchEvent {
            phase: TouchPhase::Start,
            at: Some(at),
            timestamp,
        });
        trace!(x, y, timestamp, "touch_start");
        true
    }

    pub fn on_touch_end(&mut self, timestamp: f64) -> bool {
        if !self.listening {
            return false;
        }
        self.log.push(TouchEvent {
            phase: TouchPhase::End,
            at: None,
            timestamp,
        });
        trace!(timestamp, "touch_end");
        true
    }

    /// Timestamp of the first touch of the trial; the trial clock starts here.
    pub fn start_time(&self) -> Option<f64> {
        self.start_time
    }

    pub fn pending(&self) -> Option<Point> {
        self.pending
    }

    pub fn pending_mut(&mut self) -> &mut Option<Point> {
        &mut self.pending
    }

    pub fn log(&self) -> &[TouchEvent] {
        &self.log
    }

    fn starts(&self) -> impl Iterator<Item = &TouchEvent> {
        self.log.iter().filter(|e| e.phase == TouchPhase::Start)
    }

    pub fn touch_count(&self) -> usize {
        self.starts().count()
    }

    pub fn touch_on_times(&self) -> Vec<f64> {
        self.starts().map(|e| e.timestamp).collect()
    }

    pub fn touch_off_times(&self) -> Vec<f64> {
        self.log
            .iter()
            .filter(|e| e.phase == TouchPhase::End)
            .map(|e| e.timestamp)
            .collect()
    }

    pub fn touch_xs(&self) -> Vec<f32> {
        self.starts().filter_map(|e| e.at).map(|p| p.x).collect()
    }

    pub fn touch_ys(&self) -> Vec<f32> {
        self.starts().filter_map(|e| e.at).map(|p| p.y).collect()
    }
}
