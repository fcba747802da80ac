pub mod config;
pub mod design;
pub mod flash;
pub mod interaction;
pub mod outcome;
pub mod schedule;
pub mod state;
pub mod targets;
pub mod validity;

pub use config::{ConfigError, TrialConfig};
pub use design::{DesignError, DesignSpec, TrialSpec, build_design};
pub use flash::{FlashScheduler, FlashState};
pub use interaction::{InteractionTracker, TouchEvent, TouchPhase};
pub use outcome::ResponseChecks;
pub use schedule::{Scheduler, Task};
pub use state::{Trial, TrialEvent};
pub use targets::{Target, TargetRegistry};
pub use validity::{CalibrationData, ScreenInfo, ScreenReport, check_calibration, check_screen};
