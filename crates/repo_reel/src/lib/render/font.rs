use std::path::{Path, PathBuf};

use fontdue::{Font, FontSettings};

use super::{
    canvas::{Canvas, GlyphMask},
    style::Rgba,
};

const FONT_DIRS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu",
    "/usr/share/fonts/truetype/liberation",
    "/usr/share/fonts/truetype/liberation2",
    "/usr/share/fonts/dejavu",
    "/usr/share/fonts/TTF",
    "/usr/share/fonts/liberation",
    "/Library/Fonts",
    "/System/Library/Fonts/Supplemental",
];

const REGULAR: &[&str] = &["DejaVuSans.ttf", "LiberationSans-Regular.ttf", "Arial.ttf"];
const BOLD: &[&str] = &["DejaVuSans-Bold.ttf", "LiberationSans-Bold.ttf", "Arial Bold.ttf"];
const MONO: &[&str] = &["DejaVuSansMono.ttf", "LiberationMono-Regular.ttf", "Courier New.ttf"];

/// A loaded TrueType face, or the built-in block face used when no font file
/// could be found. The block face draws every visible character as a filled
/// cell so that layout stays measurable.
pub enum Typeface {
    Loaded(Box<Font>),
    Block,
}

impl Typeface {
    const BLOCK_ADVANCE: f32 = 0.6;

    fn load(dirs: &[PathBuf], names: &[&str]) -> Option<Self> {
        dirs.iter()
            .flat_map(|dir| names.iter().map(move |name| dir.join(name)))
            .find_map(|path| Self::from_file(&path))
    }

    fn from_file(path: &Path) -> Option<Self> {
        let bytes = std::fs::read(path).ok()?;
        match Font::from_bytes(bytes, FontSettings::default()) {
            Ok(font) => {
                tracing::debug!(path = %path.display(), "Loaded font");
                Some(Typeface::Loaded(Box::new(font)))
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = e, "Unreadable font file");
                None
            }
        }
    }

    fn glyph(font: &Font, ch: char) -> char {
        if ch.is_whitespace() || font.lookup_glyph_index(ch) != 0 {
            ch
        } else {
            '?'
        }
    }

    pub fn advance(&self, ch: char, px: f32) -> f32 {
        match self {
            Typeface::Loaded(font) => font.metrics(Self::glyph(font, ch), px).advance_width,
            Typeface::Block => px * Self::BLOCK_ADVANCE,
        }
    }

    pub fn measure(&self, text: &str, px: f32) -> f32 {
        text.chars().map(|ch| self.advance(ch, px)).sum()
    }

    pub fn line_height(&self, px: f32) -> f32 {
        match self {
            Typeface::Loaded(font) => font
                .horizontal_line_metrics(px)
                .map(|m| m.new_line_size)
                .unwrap_or(px * 1.2),
            Typeface::Block => px * 1.2,
        }
    }

    /// Draws `text` with its top edge at `y` and returns the advance width
    pub fn draw(&self, canvas: &mut Canvas, x: f32, y: f32, text: &str, px: f32, color: Rgba) -> f32 {
        let mut pen = x;
        match self {
            Typeface::Loaded(font) => {
                let ascent = font
                    .horizontal_line_metrics(px)
                    .map(|m| m.ascent)
                    .unwrap_or(px * 0.8);
                let baseline = y + ascent;
                for ch in text.chars() {
                    let (metrics, bitmap) = font.rasterize(Self::glyph(font, ch), px);
                    if metrics.width > 0 && metrics.height > 0 {
                        canvas.blend_mask(
                            &GlyphMask {
                                x: (pen + metrics.xmin as f32).round() as i32,
                                y: (baseline - metrics.height as f32 - metrics.ymin as f32).round()
                                    as i32,
                                width: metrics.width,
                                height: metrics.height,
                                coverage: &bitmap,
                            },
                            color,
                        );
                    }
                    pen += metrics.advance_width;
                }
            }
            Typeface::Block => {
                let advance = px * Self::BLOCK_ADVANCE;
                for ch in text.chars() {
                    if !ch.is_whitespace() {
                        canvas.fill_rect(
                            (pen + advance * 0.1).round() as i32,
                            (y + px * 0.3).round() as i32,
                            (advance * 0.8).round() as u32,
                            (px * 0.7).round() as u32,
                            color,
                        );
                    }
                    pen += advance;
                }
            }
        }
        pen - x
    }
}

/// The three faces a frame is drawn with
pub struct Fonts {
    pub regular: Typeface,
    pub bold: Typeface,
    pub mono: Typeface,
}

impl Fonts {
    /// Looks in `font_dir` first, then the usual system locations.
    pub fn load(font_dir: Option<&Path>) -> Self {
        let dirs = font_dir
            .map(Path::to_path_buf)
            .into_iter()
            .chain(FONT_DIRS.iter().map(PathBuf::from))
            .collect::<Vec<_>>();

        let regular = Typeface::load(&dirs, REGULAR).unwrap_or_else(|| {
            tracing::warn!("No usable font found, falling back to block glyphs");
            Typeface::Block
        });
        let bold = Typeface::load(&dirs, BOLD)
            .or_else(|| Typeface::load(&dirs, REGULAR))
            .unwrap_or(Typeface::Block);
        let mono = Typeface::load(&dirs, MONO)
            .or_else(|| Typeface::load(&dirs, REGULAR))
            .unwrap_or(Typeface::Block);

        Fonts { regular, bold, mono }
    }

    pub fn block() -> Self {
        Fonts {
            regular: Typeface::Block,
            bold: Typeface::Block,
            mono: Typeface::Block,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::style::hex;

    #[test]
    fn test_missing_font_dir_still_yields_faces() {
        let fonts = Fonts::load(Some(Path::new("/definitely/not/here")));
        assert!(fonts.regular.measure("hello", 40.0) > 0.0);
    }

    #[test]
    fn test_block_face_measures_and_draws() {
        let face = Typeface::Block;
        assert!((face.measure("abcd", 10.0) - 24.0).abs() < 1e-3);

        let mut canvas = Canvas::new(100, 40, hex(0x000000));
        let width = face.draw(&mut canvas, 0.0, 0.0, "a b", 20.0, hex(0xffffff));
        assert!((width - 36.0).abs() < 1e-3);
        assert_eq!(canvas.pixel(6, 12), [255, 255, 255, 255]);
        // the space leaves its cell empty
        assert_eq!(canvas.pixel(18, 12), [0, 0, 0, 255]);
    }
}
