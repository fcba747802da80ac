use jumptouch_core::Rgba;
use tracing::debug;

/// What the current frame should show.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlashState {
    /// Targets sit at their post-shift positions.
    pub shift_active: bool,
    pub flash_on: bool,
    pub color: Rgba,
}

/// Tracks scheduled flashes against the elapsed trial time.
///
/// Onsets are consumed strictly in order. A flash turns on on the first
/// evaluation at or past the next onset and stays on for `duration`
/// milliseconds measured from that evaluation; the evaluation that sees the
/// duration elapsed turns it off and moves on to the following onset. The
/// position shift latches on with the first onset and never reverts.
#[derive(Debug, Clone)]
pub struct FlashScheduler {
    onsets: Vec<f64>,
    next_index: usize,
    duration: f64,
    active_start: Option<f64>,
    flash_color: Rgba,
    background_color: Rgba,
    on_times: Vec<f64>,
    off_times: Vec<f64>,
}

impl FlashScheduler {
    pub fn new(onsets: Vec<f64>, duration: f64, flash_color: Rgba, background_color: Rgba) -> Self {
        Self {
            onsets,
            next_index: 0,
            duration,
            active_start: None,
            flash_color,
            background_color,
            on_times: Vec::new(),
            off_times: Vec::new(),
        }
    }

    pub fn first_onset(&self) -> Option<f64> {
        self.onsets.first().copied()
    }

    pub fn next_onset(&self) -> Option<f64> {
        self.onsets.get(self.next_index).copied()
    }

    /// Index of the onset currently waited for; equals the onset count once exhausted.
    pub fn next_index(&self) -> usize {
        self.next_index
    }

    pub fn is_exhausted(&self) -> bool {
        self.next_index >= self.onsets.len()
    }

    pub fn is_flash_active(&self) -> bool {
        self.active_start.is_some()
    }

    pub fn on_times(&self) -> &[f64] {
        &self.on_times
    }

    pub fn off_times(&self) -> &[f64] {
        &self.off_times
    }

    /// State used while the trial clock has not started yet.
    pub fn idle(&self) -> FlashState {
        FlashState {
            shift_active: false,
            flash_on: false,
            color: self.background_color,
        }
    }

    pub fn evaluate(&mut self, elapsed: f64) -> FlashState {
        let shift_active = self.first_onset().is_some_and(|o| elapsed >= o);
        let due = self.next_onset().is_some_and(|o| elapsed >= o);
        let before_off = self
            .active_start
            .is_none_or(|start| elapsed < start + self.duration);
        let flash_on = due && before_off;

        if due && self.active_start.is_none() {
            debug!(onset = self.next_index, elapsed, "flash_on");
            self.active_start = Some(elapsed);
            self.on_times.push(elapsed);
        }
        if !before_off {
            debug!(onset = self.next_index, elapsed, "flash_off");
            self.off_times.push(elapsed);
            self.active_start = None;
            self.next_index += 1;
        }

        FlashState {
            shift_active,
            flash_on,
            color: if flash_on {
                self.flash_color
            } else {
                self.background_color
            },
        }
    }
}
