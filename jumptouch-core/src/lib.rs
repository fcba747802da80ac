pub mod color;
pub mod phase;
pub mod stimulus;
pub mod trial;

pub use color::{ColorParseError, Rgba};
pub use phase::TrialPhase;
pub use stimulus::{DrawSurface, Point, Shape};
pub use trial::{Environment, TrialResult};
