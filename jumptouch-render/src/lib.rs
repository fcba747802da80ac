pub mod render;

pub use render::{FrameStats, RenderError, SkiaSurface};
