/// Work the trial asks its host to run later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    /// Draw one blank pre-roll frame.
    Prime,
    /// Leave the pre-roll and request the first running frame.
    BeginRunning,
    /// Evaluate and draw one running frame.
    Animate,
    /// Deliver the finished result to the host.
    HandOff,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Timeout {
    due: f64,
    task: Task,
}

/// Explicit replacement for animation-frame and timeout callbacks.
///
/// Holds at most one frame request; a new request replaces the previous
/// one. Timeouts fire in due order, ties in insertion order. After `stop`
/// nothing previously scheduled can fire.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    frame: Option<Task>,
    timeouts: Vec<Timeout>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_frame(&mut self, task: Task) {
        self.frame = Some(task);
    }

    pub fn frame_pending(&self) -> bool {
        self.frame.is_some()
    }

    pub fn take_frame(&mut self) -> Option<Task> {
        self.frame.take()
    }

    pub fn cancel_frame(&mut self) {
        self.frame = None;
    }

    pub fn set_timeout(&mut self, due: f64, task: Task) {
        let idx = self.timeouts.partition_point(|t| t.due <= due);
        self.timeouts.insert(idx, Timeout { due, task });
    }

    pub fn clear_timeouts(&mut self) {
        self.timeouts.clear();
    }

    pub fn next_deadline(&self) -> Option<f64> {
        self.timeouts.first().map(|t| t.due)
    }

    /// Removes and returns every timeout due at or before `now`.
    pub fn take_due(&mut self, now: f64) -> Vec<Task> {
        let n = self.timeouts.partition_point(|t| t.due <= now);
        self.timeouts.drain(..n).map(|t| t.task).collect()
    }

    pub fn stop(&mut self) {
        self.cancel_frame();
        self.clear_timeouts();
    }

    pub fn is_idle(&self) -> bool {
        self.frame.is_none() && self.timeouts.is_empty()
    }
}
