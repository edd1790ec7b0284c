/// Straight (non-premultiplied) RGBA colour
pub type Rgba = [u8; 4];

pub const fn hex(rgb: u32) -> Rgba {
    [(rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8, 255]
}

pub const fn with_alpha(color: Rgba, alpha: u8) -> Rgba {
    [color[0], color[1], color[2], alpha]
}

/// Scales the RGB channels, `factor` 1.0 keeps the colour as is
pub fn shade(color: Rgba, factor: f32) -> Rgba {
    let f = |c: u8| ((c as f32) * factor).round().clamp(0.0, 255.0) as u8;
    [f(color[0]), f(color[1]), f(color[2]), color[3]]
}

/// Accent colours cycled through by scene index
pub const PALETTE: [Rgba; 8] = [
    hex(0x2563eb),
    hex(0x7c3aed),
    hex(0x059669),
    hex(0xdc2626),
    hex(0xea580c),
    hex(0x0891b2),
    hex(0x6366f1),
    hex(0x8b5cf6),
];

pub const BACKGROUND: Rgba = hex(0x111111);
pub const TEXT: Rgba = hex(0xffffff);
pub const MUTED_TEXT: Rgba = hex(0xcccccc);
pub const SHADOW: Rgba = with_alpha(hex(0x000000), 160);
pub const TABLE_ACCENT: Rgba = hex(0x4a90e2);
pub const TABLE_FRAME: Rgba = hex(0x1a1a1a);
pub const ROW_EVEN: Rgba = hex(0x2a2a2a);
pub const ROW_ODD: Rgba = hex(0x1f1f1f);

/// One Dark inspired editor colours
pub mod editor {
    use super::{hex, Rgba};

    pub const BACKGROUND: Rgba = hex(0x282c34);
    pub const TITLE_BAR: Rgba = hex(0x21252b);
    pub const BORDER: Rgba = hex(0x61dafb);
    pub const LINE_NUMBER: Rgba = hex(0x5c6370);
    pub const PLAIN: Rgba = hex(0xabb2bf);
    pub const KEYWORD: Rgba = hex(0xc678dd);
    pub const STRING: Rgba = hex(0x98c379);
    pub const COMMENT: Rgba = hex(0x5c6370);
    pub const NUMBER: Rgba = hex(0xd19a66);
}

/// Fixed geometry of every frame, scaled from a 1080p reference
#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    pub width: u32,
    pub height: u32,
    pub margin: u32,
    pub title_px: f32,
    pub heading_px: f32,
    pub body_px: f32,
    pub small_px: f32,
    pub code_px: f32,
    pub radius: u32,
}

impl Style {
    pub fn new(width: u32, height: u32) -> Self {
        let scale = height as f32 / 1080.0;
        let px = |v: f32| (v * scale).round().max(8.0);
        Style {
            width,
            height,
            margin: (80.0 * scale).round() as u32,
            title_px: px(96.0),
            heading_px: px(64.0),
            body_px: px(40.0),
            small_px: px(30.0),
            code_px: px(28.0),
            radius: (18.0 * scale).round() as u32,
        }
    }

    pub fn accent(&self, index: usize) -> Rgba {
        PALETTE[index % PALETTE.len()]
    }

    /// Length scaled from the 1080p reference
    pub fn scaled(&self, v: u32) -> u32 {
        ((v as f32) * self.height as f32 / 1080.0).round() as u32
    }

    pub fn content_width(&self) -> u32 {
        self.width.saturating_sub(self.margin * 2)
    }
}

impl Default for Style {
    fn default() -> Self {
        Style::new(1920, 1080)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex() {
        assert_eq!(hex(0x2563eb), [0x25, 0x63, 0xeb, 255]);
    }

    #[test]
    fn test_style_scales_with_height() {
        let full = Style::new(1920, 1080);
        let half = Style::new(960, 540);
        assert_eq!(full.margin, 80);
        assert_eq!(half.margin, 40);
        assert_eq!(half.heading_px, 32.0);
        assert_eq!(half.scaled(100), 50);
    }
}
