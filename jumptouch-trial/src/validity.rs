use serde::{Deserialize, Serialize};
use tracing::warn;

const APPLE_MOBILE_PLATFORMS: [&str; 6] = [
    "iPad Simulator",
    "iPhone Simulator",
    "iPod Simulator",
    "iPad",
    "iPhone",
    "iPod",
];

/// Device properties the participation check looks at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenInfo {
    pub screen_width: u32,
    pub screen_height: u32,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Primary pointer is a finger rather than a mouse.
    pub coarse_pointer: bool,
    pub platform: String,
    pub user_agent: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenReport {
    pub touchscreen: bool,
    pub width_ok: bool,
    pub height_ok: bool,
    pub landscape: bool,
    pub apple_mobile: bool,
    pub safari: bool,
}

impl ScreenReport {
    pub fn is_valid(&self) -> bool {
        self.touchscreen
            && self.width_ok
            && self.height_ok
            && self.landscape
            && !self.apple_mobile
            && !self.safari
    }
}

pub fn check_screen(info: &ScreenInfo) -> ScreenReport {
    let ua = info.user_agent.to_lowercase();
    let report = ScreenReport {
        touchscreen: info.coarse_pointer,
        width_ok: info.screen_width >= 490,
        height_ok: info.screen_height >= 300,
        landscape: info.viewport_width > info.viewport_height,
        apple_mobile: APPLE_MOBILE_PLATFORMS.contains(&info.platform.as_str()),
        safari: ua.contains("safari") && !ua.contains("chrome"),
    };
    if !report.is_valid() {
        warn!(?report, "screen_check_failed");
    }
    report
}

/// Output of the viewing-distance calibration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationData {
    /// Window width in degrees of visual angle.
    pub win_width_deg: f32,
    pub view_dist_mm: f32,
}

/// At least 17 dva of width and a viewing distance of 20-60 cm.
pub fn check_calibration(data: &CalibrationData) -> bool {
    let valid = data.win_width_deg >= 17.0 && (200.0..=600.0).contains(&data.view_dist_mm);
    if !valid {
        warn!(
            win_width_deg = data.win_width_deg,
            view_dist_mm = data.view_dist_mm,
            "calibration_check_failed"
        );
    }
    valid
}
