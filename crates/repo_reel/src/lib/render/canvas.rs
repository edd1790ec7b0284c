use std::path::Path;

use image::{ImageFormat, RgbaImage};

use super::style::Rgba;

/// An alpha mask positioned in frame coordinates
pub struct GlyphMask<'a> {
    pub x: i32,
    pub y: i32,
    pub width: usize,
    pub height: usize,
    pub coverage: &'a [u8],
}

/// Opaque RGBA frame all scenes are painted onto
pub struct Canvas {
    image: RgbaImage,
}

impl Canvas {
    pub fn new(width: u32, height: u32, background: Rgba) -> Self {
        Canvas {
            image: RgbaImage::from_pixel(width, height, image::Rgba(background)),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgba {
        self.image.get_pixel(x, y).0
    }

    pub fn blend_pixel(&mut self, x: i32, y: i32, src: Rgba) {
        if x < 0 || y < 0 || x >= self.width() as i32 || y >= self.height() as i32 {
            return;
        }
        let alpha = u16::from(src[3]);
        if alpha == 0 {
            return;
        }
        let inv_alpha = 255 - alpha;
        let dst = self.image.get_pixel_mut(x as u32, y as u32);
        for channel in 0..3 {
            let d = u16::from(dst.0[channel]);
            let s = u16::from(src[channel]);
            dst.0[channel] = ((s * alpha + d * inv_alpha + 127) / 255) as u8;
        }
        dst.0[3] = 255;
    }

    pub fn blend_mask(&mut self, mask: &GlyphMask<'_>, color: Rgba) {
        for row in 0..mask.height {
            for col in 0..mask.width {
                let coverage = mask.coverage[row * mask.width + col];
                if coverage == 0 {
                    continue;
                }
                let alpha = ((u16::from(coverage) * u16::from(color[3])) / 255) as u8;
                self.blend_pixel(
                    mask.x + col as i32,
                    mask.y + row as i32,
                    [color[0], color[1], color[2], alpha],
                );
            }
        }
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, w: u32, h: u32, color: Rgba) {
        let (x0, y0) = (x.max(0), y.max(0));
        let x1 = x.saturating_add(w as i32).min(self.width() as i32);
        let y1 = y.saturating_add(h as i32).min(self.height() as i32);
        for py in y0..y1 {
            for px in x0..x1 {
                self.blend_pixel(px, py, color);
            }
        }
    }

    pub fn fill_rounded_rect(&mut self, x: i32, y: i32, w: u32, h: u32, radius: u32, color: Rgba) {
        for py in 0..h as i32 {
            for px in 0..w as i32 {
                if rounded_rect_contains(px, py, w, h, radius) {
                    self.blend_pixel(x + px, y + py, color);
                }
            }
        }
    }

    /// Outline of `thickness` pixels drawn inside the rectangle
    #[allow(clippy::too_many_arguments)]
    pub fn stroke_rounded_rect(
        &mut self,
        x: i32,
        y: i32,
        w: u32,
        h: u32,
        radius: u32,
        thickness: u32,
        color: Rgba,
    ) {
        let t = thickness as i32;
        let inner_w = w.saturating_sub(thickness * 2);
        let inner_h = h.saturating_sub(thickness * 2);
        let inner_r = radius.saturating_sub(thickness);
        for py in 0..h as i32 {
            for px in 0..w as i32 {
                if !rounded_rect_contains(px, py, w, h, radius) {
                    continue;
                }
                let inside = px >= t
                    && py >= t
                    && rounded_rect_contains(px - t, py - t, inner_w, inner_h, inner_r);
                if !inside {
                    self.blend_pixel(x + px, y + py, color);
                }
            }
        }
    }

    pub fn fill_circle(&mut self, cx: i32, cy: i32, radius: u32, color: Rgba) {
        let r = radius as i32;
        for dy in -r..=r {
            for dx in -r..=r {
                if dx * dx + dy * dy <= r * r {
                    self.blend_pixel(cx + dx, cy + dy, color);
                }
            }
        }
    }

    /// Downward arrow from `(x, y0)` to `(x, y1)`, used between flowchart bands
    pub fn arrow_down(&mut self, x: i32, y0: i32, y1: i32, thickness: u32, color: Rgba) {
        let head = (thickness as i32 * 3).max(6);
        let shaft_end = (y1 - head).max(y0);
        self.fill_rect(
            x - thickness as i32 / 2,
            y0,
            thickness,
            (shaft_end - y0).max(0) as u32,
            color,
        );
        for row in 0..head {
            let half = head - row;
            for dx in -half..=half {
                self.blend_pixel(x + dx, shaft_end + row, color);
            }
        }
    }

    pub fn save_png(&self, path: &Path) -> Result<(), image::ImageError> {
        self.image.save_with_format(path, ImageFormat::Png)
    }
}

fn rounded_rect_contains(px: i32, py: i32, w: u32, h: u32, radius: u32) -> bool {
    let (w, h) = (w as i32, h as i32);
    if px < 0 || py < 0 || px >= w || py >= h {
        return false;
    }
    let r = (radius as i32).min(w / 2).min(h / 2);
    if r == 0 {
        return true;
    }
    let cx = if px < r {
        r
    } else if px >= w - r {
        w - r - 1
    } else {
        return true;
    };
    let cy = if py < r {
        r
    } else if py >= h - r {
        h - r - 1
    } else {
        return true;
    };
    let (dx, dy) = (px - cx, py - cy);
    dx * dx + dy * dy <= r * r
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::style::hex;

    #[test]
    fn test_blend_pixel_mixes_and_stays_opaque() {
        let mut canvas = Canvas::new(2, 2, hex(0x000000));
        canvas.blend_pixel(0, 0, [255, 255, 255, 128]);
        assert_eq!(canvas.pixel(0, 0), [128, 128, 128, 255]);

        // out of bounds is ignored
        canvas.blend_pixel(-1, 5, [255, 0, 0, 255]);
        assert_eq!(canvas.pixel(1, 1), [0, 0, 0, 255]);
    }

    #[test]
    fn test_rounded_rect_clips_corners() {
        assert!(!rounded_rect_contains(0, 0, 40, 40, 10));
        assert!(rounded_rect_contains(10, 0, 40, 40, 10));
        assert!(rounded_rect_contains(20, 20, 40, 40, 10));
        assert!(rounded_rect_contains(0, 0, 40, 40, 0));
        assert!(!rounded_rect_contains(40, 0, 40, 40, 0));
    }

    #[test]
    fn test_stroke_leaves_interior_untouched() {
        let mut canvas = Canvas::new(20, 20, hex(0x000000));
        canvas.stroke_rounded_rect(0, 0, 20, 20, 0, 2, hex(0xffffff));
        assert_eq!(canvas.pixel(1, 10), [255, 255, 255, 255]);
        assert_eq!(canvas.pixel(10, 10), [0, 0, 0, 255]);
    }
}
