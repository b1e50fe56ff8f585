pub mod timer;

pub use timer::{FrameReport, HighPrecisionTimer, Timer};
