use jumptouch_core::{Environment, Point, Rgba};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Longest accepted duration or delay, one hour.
pub const MAX_DURATION_MS: f64 = 3_600_000.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error(
        "target position arrays differ in length: x={x}, y={y}, shifted x={shifted_x}, shifted y={shifted_y}"
    )]
    PositionMismatch {
        x: usize,
        y: usize,
        shifted_x: usize,
        shifted_y: usize,
    },
    #[error("flash onsets must be ascending, {next} follows {prev}")]
    OnsetsNotAscending { prev: f64, next: f64 },
    #[error("`{field}` must lie in 0..={max} ms, got {value}", max = MAX_DURATION_MS)]
    BadDuration { field: &'static str, value: f64 },
    #[error("pixel_per_degree must be finite and positive, got {0}")]
    BadPixelScale(f32),
    #[error("`{field}` must be finite and non-negative, got {value}")]
    BadExtent { field: &'static str, value: f32 },
}

/// Parameters of one serial touch trial.
///
/// Positions, radius and touch tolerance are in degrees of visual angle and
/// converted with `pixel_per_degree`; positions are offsets from the
/// viewport centre. Times are milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialConfig {
    #[serde(default = "default_flash_color")]
    pub flash_color: Rgba,
    #[serde(default = "default_background_color")]
    pub background_color: Rgba,
    #[serde(default = "default_circle_color")]
    pub circle_color: Rgba,
    #[serde(default = "default_circle_radius")]
    pub circle_radius: f32,

    pub target_pos_x: Vec<f32>,
    pub target_pos_y: Vec<f32>,
    pub shifted_target_pos_x: Vec<f32>,
    pub shifted_target_pos_y: Vec<f32>,

    #[serde(default = "default_flash_duration")]
    pub flash_duration: f64,
    #[serde(
        default = "default_change_onset",
        deserialize_with = "one_or_many"
    )]
    pub change_onset: Vec<f64>,
    #[serde(default = "default_trial_duration")]
    pub trial_duration: f64,
    #[serde(default = "default_wait_after")]
    pub wait_after: f64,

    #[serde(default = "default_pixel_per_degree")]
    pub pixel_per_degree: f32,
    #[serde(default = "default_accepted_touch_distance")]
    pub accepted_touch_distance: f32,

    #[serde(default = "default_priming_frames")]
    pub priming_frames: u32,
    #[serde(default = "default_priming_delay")]
    pub priming_delay: f64,
}

fn default_flash_color() -> Rgba {
    Rgba::WHITE
}
fn default_background_color() -> Rgba {
    Rgba::GREY
}
fn default_circle_color() -> Rgba {
    Rgba::BLACK
}
fn default_circle_radius() -> f32 {
    0.5
}
fn default_flash_duration() -> f64 {
    30.0
}
fn default_change_onset() -> Vec<f64> {
    vec![500.0]
}
fn default_trial_duration() -> f64 {
    1000.0
}
fn default_wait_after() -> f64 {
    500.0
}
fn default_pixel_per_degree() -> f32 {
    std::f32::consts::PI * 10.0
}
fn default_accepted_touch_distance() -> f32 {
    1.5
}
fn default_priming_frames() -> u32 {
    10
}
fn default_priming_delay() -> f64 {
    100.0
}

/// Accepts either a single onset or a list of onsets.
fn one_or_many<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<f64>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(f64),
        Many(Vec<f64>),
    }
    Ok(match OneOrMany::deserialize(d)? {
        OneOrMany::One(v) => vec![v],
        OneOrMany::Many(v) => v,
    })
}

impl Default for TrialConfig {
    fn default() -> Self {
        Self {
            flash_color: default_flash_color(),
            background_color: default_background_color(),
            circle_color: default_circle_color(),
            circle_radius: default_circle_radius(),
            target_pos_x: Vec::new(),
            target_pos_y: Vec::new(),
            shifted_target_pos_x: Vec::new(),
            shifted_target_pos_y: Vec::new(),
            flash_duration: default_flash_duration(),
            change_onset: default_change_onset(),
            trial_duration: default_trial_duration(),
            wait_after: default_wait_after(),
            pixel_per_degree: default_pixel_per_degree(),
            accepted_touch_distance: default_accepted_touch_distance(),
            priming_frames: default_priming_frames(),
            priming_delay: default_priming_delay(),
        }
    }
}

impl TrialConfig {
    /// Configuration with targets at `pre` that jump to `post` on the first flash.
    pub fn with_targets(pre: &[(f32, f32)], post: &[(f32, f32)]) -> Self {
        Self {
            target_pos_x: pre.iter().map(|p| p.0).collect(),
            target_pos_y: pre.iter().map(|p| p.1).collect(),
            shifted_target_pos_x: post.iter().map(|p| p.0).collect(),
            shifted_target_pos_y: post.iter().map(|p| p.1).collect(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let lens = [
            self.target_pos_x.len(),
            self.target_pos_y.len(),
            self.shifted_target_pos_x.len(),
            self.shifted_target_pos_y.len(),
        ];
        if lens.iter().any(|&l| l != lens[0]) {
            return Err(ConfigError::PositionMismatch {
                x: lens[0],
                y: lens[1],
                shifted_x: lens[2],
                shifted_y: lens[3],
            });
        }

        if !self.pixel_per_degree.is_finite() || self.pixel_per_degree <= 0.0 {
            return Err(ConfigError::BadPixelScale(self.pixel_per_degree));
        }

        for (field, value) in [
            ("flash_duration", self.flash_duration),
            ("trial_duration", self.trial_duration),
            ("wait_after", self.wait_after),
            ("priming_delay", self.priming_delay),
        ] {
            if !(0.0..=MAX_DURATION_MS).contains(&value) {
                return Err(ConfigError::BadDuration { field, value });
            }
        }

        for (field, value) in [
            ("circle_radius", self.circle_radius),
            ("accepted_touch_distance", self.accepted_touch_distance),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::BadExtent { field, value });
            }
        }

        for onset in &self.change_onset {
            if !onset.is_finite() {
                return Err(ConfigError::BadDuration {
                    field: "change_onset",
                    value: *onset,
                });
            }
        }
        if let Some(w) = self.change_onset.windows(2).find(|w| w[1] < w[0]) {
            return Err(ConfigError::OnsetsNotAscending {
                prev: w[0],
                next: w[1],
            });
        }
        Ok(())
    }

    pub fn target_count(&self) -> usize {
        self.target_pos_x.len()
    }

    pub fn circle_radius_px(&self) -> f32 {
        self.circle_radius * self.pixel_per_degree
    }

    pub fn touch_tolerance_px(&self) -> f32 {
        self.accepted_touch_distance * self.pixel_per_degree
    }

    fn scaled(&self, values: &[f32]) -> Vec<f32> {
        values.iter().map(|v| v * self.pixel_per_degree).collect()
    }

    /// Pre-shift positions in pixels relative to the viewport centre.
    pub fn positions_px(&self) -> (Vec<f32>, Vec<f32>) {
        (self.scaled(&self.target_pos_x), self.scaled(&self.target_pos_y))
    }

    /// Post-shift positions in pixels relative to the viewport centre.
    pub fn shifted_positions_px(&self) -> (Vec<f32>, Vec<f32>) {
        (
            self.scaled(&self.shifted_target_pos_x),
            self.scaled(&self.shifted_target_pos_y),
        )
    }

    /// `(pre, post)` screen positions of every target, in registration order.
    pub fn screen_positions(&self, env: &Environment) -> Vec<(Point, Point)> {
        let cx = env.viewport_width as f32 / 2.0;
        let cy = env.viewport_height as f32 / 2.0;
        let (x, y) = self.positions_px();
        let (sx, sy) = self.shifted_positions_px();
        x.iter()
            .zip(&y)
            .zip(sx.iter().zip(&sy))
            .map(|((x, y), (sx, sy))| (Point::new(x + cx, y + cy), Point::new(sx + cx, sy + cy)))
            .collect()
    }
}
