use ab_glyph::FontRef;
use anyhow::{bail, Context, Result};

const CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Load a UI font at startup, from `LEXIC_FONT` if set, otherwise from the
/// usual system locations. The bytes are leaked once so the renderer can
/// hold a `FontRef<'static>` for the whole session.
pub fn load_system_font() -> Result<FontRef<'static>> {
    if let Ok(path) = std::env::var("LEXIC_FONT") {
        let bytes = std::fs::read(&path).with_context(|| format!("reading font {path}"))?;
        return parse_font(bytes);
    }

    for path in CANDIDATES {
        if let Ok(bytes) = std::fs::read(path) {
            return parse_font(bytes);
        }
    }

    bail!("no usable font found, set LEXIC_FONT to a .ttf path")
}

fn parse_font(bytes: Vec<u8>) -> Result<FontRef<'static>> {
    let leaked: &'static [u8] = Box::leak(bytes.into_boxed_slice());
    FontRef::try_from_slice(leaked).context("parsing font file")
}
