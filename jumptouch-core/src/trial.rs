use serde::{Deserialize, Serialize};

/// Snapshot of the display the trial ran on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub user_agent: String,
    pub platform: String,
}

impl Environment {
    pub fn new(viewport_width: u32, viewport_height: u32) -> Self {
        Self {
            viewport_width,
            viewport_height,
            user_agent: String::new(),
            platform: String::new(),
        }
    }

    pub fn is_landscape(&self) -> bool {
        self.viewport_height < self.viewport_width
    }
}

/// Recorded result of one trial. All times are milliseconds; flash times are
/// relative to the trial start, everything else is on the host clock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialResult {
    pub start_time: Option<f64>,
    pub end_time: Option<f64>,
    pub flash_on_times: Vec<f64>,
    pub flash_off_times: Vec<f64>,
    pub touch_on: Vec<f64>,
    pub touch_off: Vec<f64>,
    pub scheduled_change_onset: Vec<f64>,

    pub flash_duration: f64,
    /// First scheduled onset, `None` for flash-free trials.
    pub change_onset: Option<f64>,
    pub trial_duration: f64,
    pub animation_timestamps: Vec<f64>,

    pub touch_x: Vec<f32>,
    pub touch_y: Vec<f32>,
    pub choice_order: Vec<usize>,
    pub position_x: Vec<f32>,
    pub position_y: Vec<f32>,
    pub shifted_position_x: Vec<f32>,
    pub shifted_position_y: Vec<f32>,

    pub late_response: bool,
    pub order_response: bool,
    pub too_many_touches: bool,
    pub screen_in_landscape: bool,
    pub success: bool,

    pub window_width: u32,
    pub window_height: u32,
    pub user_info: String,
    pub platform: String,
}
