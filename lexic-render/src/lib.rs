pub mod font;
pub mod render;

pub use ab_glyph::FontRef;
pub use font::load_system_font;
pub use render::{FrameStats, SkiaRenderer};
