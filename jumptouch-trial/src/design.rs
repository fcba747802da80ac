use crate::config::TrialConfig;
use jumptouch_core::Rgba;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Most onset windows a design may span.
pub const MAX_WINDOWS: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DesignError {
    #[error("time window size must be positive, got {0}")]
    BadWindow(f64),
    #[error("max_flash_time must be finite, got {0}")]
    BadMaxFlashTime(f64),
    #[error("design spans {0} onset windows, at most {max} allowed", max = MAX_WINDOWS)]
    TooManyWindows(f64),
    #[error("at least one dot is required")]
    NoDots,
}

/// Factors of the serial touch design: repetitions × flash conditions ×
/// jump conditions × onset time windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesignSpec {
    pub repetitions: usize,
    pub flash_conditions: Vec<bool>,
    pub jump_conditions: Vec<bool>,
    /// Onset windows start at 0, `window_size`, ... below this bound (ms).
    pub max_flash_time: f64,
    pub window_size: f64,
    /// Range of base positions in dva, per axis.
    pub x_range: (f32, f32),
    pub y_range: (f32, f32),
    pub n_dots: usize,
    /// Maximum jitter around each base position, dva.
    pub random_pos_shift: f32,
    pub n_flashes: usize,
    pub flash_color: Rgba,
    pub background_color: Rgba,
}

impl Default for DesignSpec {
    fn default() -> Self {
        Self {
            repetitions: 1,
            flash_conditions: vec![true, false],
            jump_conditions: vec![true, false],
            max_flash_time: 600.0,
            window_size: 100.0,
            x_range: (-6.0, 6.0),
            y_range: (-2.0, 2.0),
            n_dots: 4,
            random_pos_shift: 0.5,
            n_flashes: 1,
            flash_color: Rgba::WHITE,
            background_color: Rgba::GREY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialSpec {
    pub trial_id: usize,
    pub flash_time: Vec<f64>,
    pub target_pos_x: Vec<f32>,
    pub target_pos_y: Vec<f32>,
    pub new_target_pos_x: Vec<f32>,
    pub new_target_pos_y: Vec<f32>,
    pub flash_shown: bool,
    pub stim_jumps: bool,
    pub flash_color: Rgba,
}

impl TrialSpec {
    /// Trial configuration with this trial's positions, onsets and flash
    /// color; everything else comes from `base`.
    pub fn to_config(&self, base: &TrialConfig) -> TrialConfig {
        TrialConfig {
            target_pos_x: self.target_pos_x.clone(),
            target_pos_y: self.target_pos_y.clone(),
            shifted_target_pos_x: self.new_target_pos_x.clone(),
            shifted_target_pos_y: self.new_target_pos_y.clone(),
            change_onset: self.flash_time.clone(),
            flash_color: self.flash_color,
            ..base.clone()
        }
    }
}

/// `n` evenly spaced values from `start` to `stop` inclusive.
pub fn equal_distance(start: f32, stop: f32, n: usize) -> Vec<f32> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f32;
            (0..n).map(|i| start + step * i as f32).collect()
        }
    }
}

fn jitter<R: Rng>(base: &[f32], amount: f32, rng: &mut R) -> Vec<f32> {
    base.iter()
        .map(|p| (rng.random::<f32>() * 2.0 - 1.0) * amount + p)
        .collect()
}

pub fn build_design<R: Rng>(spec: &DesignSpec, rng: &mut R) -> Result<Vec<TrialSpec>, DesignError> {
    if spec.window_size.is_nan() || spec.window_size <= 0.0 {
        return Err(DesignError::BadWindow(spec.window_size));
    }
    if !spec.max_flash_time.is_finite() {
        return Err(DesignError::BadMaxFlashTime(spec.max_flash_time));
    }
    let window_count = (spec.max_flash_time / spec.window_size).ceil();
    if window_count > MAX_WINDOWS as f64 {
        return Err(DesignError::TooManyWindows(window_count));
    }
    if spec.n_dots == 0 {
        return Err(DesignError::NoDots);
    }

    let base_x = equal_distance(spec.x_range.0, spec.x_range.1, spec.n_dots);
    let base_y = equal_distance(spec.y_range.0, spec.y_range.1, spec.n_dots);
    let windows: Vec<f64> = std::iter::successors(Some(0.0), |tw| Some(tw + spec.window_size))
        .take_while(|tw| *tw < spec.max_flash_time)
        .collect();

    let mut trials = Vec::new();
    for _ in 0..spec.repetitions {
        for &flash_shown in &spec.flash_conditions {
            for &stim_jumps in &spec.jump_conditions {
                for &tw in &windows {
                    let target_pos_x = jitter(&base_x, spec.random_pos_shift, rng);
                    let jumped_x = jitter(&base_x, spec.random_pos_shift, rng);
                    let target_pos_y = jitter(&base_y, spec.random_pos_shift, rng);
                    let jumped_y = jitter(&base_y, spec.random_pos_shift, rng);

                    let mut flash_time: Vec<f64> = (0..spec.n_flashes)
                        .map(|_| tw + rng.random::<f64>() * spec.window_size)
                        .collect();
                    flash_time.sort_by(f64::total_cmp);

                    let (new_target_pos_x, new_target_pos_y) = if stim_jumps {
                        (jumped_x, jumped_y)
                    } else {
                        (target_pos_x.clone(), target_pos_y.clone())
                    };

                    trials.push(TrialSpec {
                        trial_id: trials.len(),
                        flash_time,
                        target_pos_x,
                        target_pos_y,
                        new_target_pos_x,
                        new_target_pos_y,
                        flash_shown,
                        stim_jumps,
                        flash_color: if flash_shown {
                            spec.flash_color
                        } else {
                            spec.background_color
                        },
                    });
                }
            }
        }
    }
    Ok(trials)
}
