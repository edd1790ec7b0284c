use super::{
    canvas::Canvas,
    font::{Fonts, Typeface},
    highlight::highlight_line,
    layout::{truncate, wrap_lines},
    scene::{Layer, Scene},
    style::{self, editor, shade, with_alpha, Rgba, Style},
};

/// Paints scenes onto fresh canvases. Output depends only on the scene, the
/// index (for the accent colour) and the fixed style.
pub struct Painter<'a> {
    pub style: &'a Style,
    pub fonts: &'a Fonts,
}

impl Painter<'_> {
    pub fn paint(&self, scene: &Scene, index: usize) -> Canvas {
        let accent = self.style.accent(index);
        let mut canvas = Canvas::new(self.style.width, self.style.height, style::BACKGROUND);
        match scene {
            Scene::Title {
                name,
                subtitle,
                badges,
            } => self.title(&mut canvas, accent, name, subtitle, badges),
            Scene::FeatureTable { heading, rows } => self.feature_table(&mut canvas, accent, heading, rows),
            Scene::Flowchart { heading, layers } => self.flowchart(&mut canvas, accent, heading, layers),
            Scene::Code {
                heading,
                file_name,
                language,
                lines,
            } => self.code(&mut canvas, accent, heading, file_name, language, lines),
            Scene::Content { heading, bullets } => self.content(&mut canvas, accent, heading, bullets),
            Scene::Conclusion {
                heading,
                message,
                call_to_action,
            } => self.conclusion(&mut canvas, accent, heading, message, call_to_action),
        }
        canvas
    }

    /// Background and heading only
    pub fn fallback(&self, heading: &str, index: usize) -> Canvas {
        let mut canvas = Canvas::new(self.style.width, self.style.height, style::BACKGROUND);
        self.heading(&mut canvas, self.style.accent(index), heading);
        canvas
    }

    fn px(&self, v: u32) -> u32 {
        self.style.scaled(v)
    }

    #[allow(clippy::too_many_arguments)]
    fn shadowed(&self, canvas: &mut Canvas, face: &Typeface, x: f32, y: f32, text: &str, px: f32, color: Rgba) {
        let offset = self.px(2).max(1) as f32;
        face.draw(canvas, x + offset, y + offset, text, px, style::SHADOW);
        face.draw(canvas, x, y, text, px, color);
    }

    fn centered(&self, canvas: &mut Canvas, face: &Typeface, y: f32, text: &str, px: f32, color: Rgba) {
        let x = (self.style.width as f32 - face.measure(text, px)) / 2.0;
        self.shadowed(canvas, face, x.max(0.0), y, text, px, color);
    }

    /// Heading at the top left with an accent rule; returns the y below it
    fn heading(&self, canvas: &mut Canvas, accent: Rgba, heading: &str) -> f32 {
        let s = self.style;
        let face = &self.fonts.bold;
        let text = truncate(heading, s.content_width() as f32, |t| face.measure(t, s.heading_px));
        let y = s.margin as f32 * 0.75;
        self.shadowed(canvas, face, s.margin as f32, y, &text, s.heading_px, style::TEXT);

        let rule_y = y + face.line_height(s.heading_px) + self.px(8) as f32;
        canvas.fill_rect(s.margin as i32, rule_y as i32, self.px(160), self.px(6).max(2), accent);
        rule_y + self.px(40) as f32
    }

    fn title(&self, canvas: &mut Canvas, accent: Rgba, name: &str, subtitle: &str, badges: &[String]) {
        let s = self.style;
        let (w, h) = (s.width as f32, s.height as f32);

        canvas.fill_rect(0, 0, s.width, self.px(12).max(2), accent);
        canvas.fill_rect(0, (h as u32 - self.px(12).max(2)) as i32, s.width, self.px(12).max(2), accent);

        let bold = &self.fonts.bold;
        let name = truncate(name, s.content_width() as f32, |t| bold.measure(t, s.title_px));
        self.centered(canvas, bold, h * 0.30, &name, s.title_px, style::TEXT);

        let regular = &self.fonts.regular;
        let line_h = regular.line_height(s.body_px);
        let lines = wrap_lines(subtitle, w * 0.7, 2, |t| regular.measure(t, s.body_px));
        for (i, line) in lines.iter().enumerate() {
            self.centered(canvas, regular, h * 0.48 + i as f32 * line_h, line, s.body_px, style::MUTED_TEXT);
        }

        if badges.is_empty() {
            return;
        }
        let pad = self.px(24) as f32;
        let gap = self.px(20) as f32;
        let badge_h = s.small_px + pad;
        let widths = badges
            .iter()
            .map(|b| regular.measure(b, s.small_px) + pad * 2.0)
            .collect::<Vec<_>>();
        let total = widths.iter().sum::<f32>() + gap * (widths.len() - 1) as f32;
        let mut x = ((w - total) / 2.0).max(s.margin as f32);
        let y = h * 0.68;
        for (badge, bw) in badges.iter().zip(widths) {
            canvas.fill_rounded_rect(x as i32, y as i32, bw as u32, badge_h as u32, (badge_h / 2.0) as u32, accent);
            regular.draw(canvas, x + pad, y + pad / 2.0 - s.small_px * 0.1, badge, s.small_px, style::TEXT);
            x += bw + gap;
        }
    }

    fn feature_table(&self, canvas: &mut Canvas, accent: Rgba, heading: &str, rows: &[String]) {
        let s = self.style;
        let top = self.heading(canvas, accent, heading);
        let regular = &self.fonts.regular;
        let bold = &self.fonts.bold;

        let x = s.margin as i32;
        let width = s.content_width();
        let header_h = self.px(70);
        let row_h = self.px(90);
        let height = header_h + row_h * rows.len().max(1) as u32;
        let border = self.px(3).max(1);

        canvas.fill_rounded_rect(x, top as i32, width, height, s.radius, style::TABLE_FRAME);
        canvas.fill_rect(x, top as i32, width, header_h, style::TABLE_ACCENT);
        let header_text_y = top + (header_h as f32 - s.small_px) / 2.0 - s.small_px * 0.1;
        bold.draw(canvas, x as f32 + self.px(40) as f32, header_text_y, "#", s.small_px, style::TEXT);
        bold.draw(canvas, x as f32 + self.px(130) as f32, header_text_y, "Feature", s.small_px, style::TEXT);

        let text_x = x as f32 + self.px(130) as f32;
        let text_w = width as f32 - self.px(170) as f32;
        for (i, row) in rows.iter().enumerate() {
            let y = top as i32 + (header_h + row_h * i as u32) as i32;
            let fill = if i % 2 == 0 { style::ROW_EVEN } else { style::ROW_ODD };
            canvas.fill_rect(x, y, width, row_h, fill);

            let r = self.px(24);
            let (cx, cy) = (x + self.px(56) as i32, y + row_h as i32 / 2);
            canvas.fill_circle(cx, cy, r + border, style::TEXT);
            canvas.fill_circle(cx, cy, r, style::TABLE_ACCENT);
            let number = (i + 1).to_string();
            let nw = bold.measure(&number, s.small_px);
            bold.draw(canvas, cx as f32 - nw / 2.0, cy as f32 - s.small_px * 0.6, &number, s.small_px, style::TEXT);

            let text = truncate(row, text_w, |t| regular.measure(t, s.body_px));
            let ty = y as f32 + (row_h as f32 - s.body_px) / 2.0 - s.body_px * 0.1;
            regular.draw(canvas, text_x, ty, &text, s.body_px, style::TEXT);
        }

        canvas.stroke_rounded_rect(x, top as i32, width, height, s.radius, border, style::TABLE_ACCENT);
    }

    fn flowchart(&self, canvas: &mut Canvas, accent: Rgba, heading: &str, layers: &[Layer]) {
        let s = self.style;
        let top = self.heading(canvas, accent, heading);
        let regular = &self.fonts.regular;
        let bold = &self.fonts.bold;

        let x = s.margin as i32;
        let width = s.content_width();
        let gap = self.px(60) as f32;
        let available = s.height as f32 - top - s.margin as f32;
        let n = layers.len().max(1) as f32;
        let band_h = ((available - gap * (n - 1.0)) / n).min(self.px(200) as f32).max(s.body_px * 2.0);
        let label_w = self.px(420) as f32;
        let item_pad = self.px(28) as f32;
        let item_gap = self.px(24) as f32;

        for (i, layer) in layers.iter().enumerate() {
            let y = top + i as f32 * (band_h + gap);
            canvas.fill_rounded_rect(x, y as i32, width, band_h as u32, s.radius, shade(accent, 0.3));
            canvas.stroke_rounded_rect(x, y as i32, width, band_h as u32, s.radius, self.px(2).max(1), accent);

            let label_y = y + (band_h - s.body_px) / 2.0 - s.body_px * 0.1;
            bold.draw(canvas, x as f32 + item_pad, label_y, &layer.label, s.body_px, style::TEXT);

            let mut ix = x as f32 + label_w;
            let right = (x as u32 + width) as f32 - item_pad;
            let item_h = s.small_px * 2.0;
            let iy = y + (band_h - item_h) / 2.0;
            for item in &layer.items {
                let iw = regular.measure(item, s.small_px) + item_pad * 2.0;
                if ix + iw > right {
                    break;
                }
                canvas.fill_rounded_rect(ix as i32, iy as i32, iw as u32, item_h as u32, s.radius / 2, accent);
                regular.draw(canvas, ix + item_pad, iy + s.small_px * 0.4, item, s.small_px, style::TEXT);
                ix += iw + item_gap;
            }

            if i + 1 < layers.len() {
                let cx = x + width as i32 / 2;
                let from = (y + band_h) as i32 + self.px(6) as i32;
                let to = (y + band_h + gap) as i32 - self.px(6) as i32;
                canvas.arrow_down(cx, from, to, self.px(6).max(2), with_alpha(style::TEXT, 200));
            }
        }
    }

    fn code(
        &self,
        canvas: &mut Canvas,
        accent: Rgba,
        heading: &str,
        file_name: &str,
        language: &str,
        lines: &[String],
    ) {
        let s = self.style;
        let top = self.heading(canvas, accent, heading);
        let mono = &self.fonts.mono;

        let x = s.margin as i32;
        let width = s.content_width();
        let bar_h = self.px(56);
        let line_h = mono.line_height(s.code_px);
        let body_pad = self.px(24) as f32;
        let max_h = s.height as f32 - top - s.margin as f32 / 2.0;
        let height = (bar_h as f32 + body_pad * 2.0 + line_h * lines.len().max(1) as f32).min(max_h);

        canvas.fill_rounded_rect(x, top as i32, width, height as u32, s.radius, editor::BACKGROUND);
        canvas.fill_rounded_rect(x, top as i32, width, bar_h + s.radius, s.radius, editor::TITLE_BAR);
        canvas.fill_rect(x, (top as u32 + bar_h) as i32, width, s.radius, editor::BACKGROUND);

        let dot_r = self.px(9).max(2);
        for (i, color) in [style::hex(0xff5f56), style::hex(0xffbd2e), style::hex(0x27c93f)].into_iter().enumerate() {
            let cx = x + self.px(36) as i32 + i as i32 * self.px(32) as i32;
            canvas.fill_circle(cx, top as i32 + bar_h as i32 / 2, dot_r, color);
        }
        let title = format!("{file_name}  ·  {language}");
        let title_y = top + (bar_h as f32 - s.small_px) / 2.0 - s.small_px * 0.1;
        self.fonts.regular.draw(canvas, x as f32 + self.px(150) as f32, title_y, &title, s.small_px, editor::PLAIN);

        let gutter = mono.measure("000 ", s.code_px);
        let text_x = x as f32 + body_pad + gutter;
        let text_w = width as f32 - body_pad * 2.0 - gutter;
        let first_y = top + bar_h as f32 + body_pad;
        let visible = ((height - bar_h as f32 - body_pad * 2.0) / line_h).floor().max(0.0) as usize;

        for (i, line) in lines.iter().take(visible).enumerate() {
            let y = first_y + i as f32 * line_h;
            let number = format!("{:>3}", i + 1);
            mono.draw(canvas, x as f32 + body_pad, y, &number, s.code_px, editor::LINE_NUMBER);

            let line = truncate(line, text_w, |t| mono.measure(t, s.code_px));
            let mut pen = text_x;
            for (kind, token) in highlight_line(&line, language) {
                pen += mono.draw(canvas, pen, y, &token, s.code_px, kind.color());
            }
        }

        canvas.stroke_rounded_rect(x, top as i32, width, height as u32, s.radius, self.px(2).max(1), editor::BORDER);
    }

    fn content(&self, canvas: &mut Canvas, accent: Rgba, heading: &str, bullets: &[String]) {
        let s = self.style;
        let top = self.heading(canvas, accent, heading);
        let regular = &self.fonts.regular;

        let x = s.margin as i32;
        let width = s.content_width();
        let pad = self.px(40) as f32;
        let height = s.height as f32 - top - s.margin as f32;
        canvas.fill_rounded_rect(x, top as i32, width, height as u32, s.radius, shade(accent, 0.18));
        canvas.stroke_rounded_rect(x, top as i32, width, height as u32, s.radius, self.px(2).max(1), accent);

        let line_h = regular.line_height(s.body_px);
        let text_x = x as f32 + pad * 2.0;
        let text_w = width as f32 - pad * 3.0;
        let bottom = top + height - pad;
        let mut y = top + pad;

        for bullet in bullets {
            let lines = wrap_lines(bullet, text_w, 3, |t| regular.measure(t, s.body_px));
            if y + line_h * lines.len() as f32 > bottom {
                break;
            }
            canvas.fill_circle(
                x + pad as i32,
                (y + s.body_px * 0.55) as i32,
                self.px(9).max(2),
                accent,
            );
            for line in &lines {
                regular.draw(canvas, text_x, y, line, s.body_px, style::TEXT);
                y += line_h;
            }
            y += line_h * 0.5;
        }
    }

    fn conclusion(&self, canvas: &mut Canvas, accent: Rgba, heading: &str, message: &str, call_to_action: &str) {
        let s = self.style;
        let (w, h) = (s.width as f32, s.height as f32);
        let bold = &self.fonts.bold;
        let regular = &self.fonts.regular;

        canvas.fill_rect(0, 0, s.width, self.px(12).max(2), accent);

        let heading = truncate(heading, s.content_width() as f32, |t| bold.measure(t, s.title_px));
        self.centered(canvas, bold, h * 0.25, &heading, s.title_px, style::TEXT);

        let line_h = regular.line_height(s.body_px);
        let lines = wrap_lines(message, w * 0.75, 3, |t| regular.measure(t, s.body_px));
        for (i, line) in lines.iter().enumerate() {
            self.centered(canvas, regular, h * 0.45 + i as f32 * line_h, line, s.body_px, style::TEXT);
        }

        let band_h = self.px(110);
        let band_y = (h * 0.72) as i32;
        canvas.fill_rect(0, band_y, s.width, band_h, shade(accent, 0.4));
        let cta = truncate(call_to_action, s.content_width() as f32, |t| regular.measure(t, s.small_px));
        let cta_y = band_y as f32 + (band_h as f32 - s.small_px) / 2.0 - s.small_px * 0.1;
        self.centered(canvas, regular, cta_y, &cta, s.small_px, style::MUTED_TEXT);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn painter_parts() -> (Style, Fonts) {
        (Style::new(640, 360), Fonts::block())
    }

    fn all_scenes() -> Vec<Scene> {
        vec![
            Scene::Title {
                name: "Hello-World".into(),
                subtitle: "My first repository on GitHub!".into(),
                badges: vec!["Rust".into(), "Docker".into()],
            },
            Scene::FeatureTable {
                heading: "Key Features".into(),
                rows: vec!["Says hello".into(), "Says goodbye".into()],
            },
            Scene::Flowchart {
                heading: "Stack".into(),
                layers: vec![
                    Layer { label: "Languages".into(), items: vec!["Rust".into()] },
                    Layer { label: "Infrastructure & Data".into(), items: vec!["Redis".into()] },
                ],
            },
            Scene::Code {
                heading: "Code".into(),
                file_name: "src/main.rs".into(),
                language: "Rust".into(),
                lines: vec!["fn main() {".into(), "    println!(\"hi\");".into(), "}".into()],
            },
            Scene::Content {
                heading: "Overview".into(),
                bullets: vec!["One.".into(), "Two.".into()],
            },
            Scene::Conclusion {
                heading: "Thanks".into(),
                message: "Go explore.".into(),
                call_to_action: "https://github.com/octocat/Hello-World".into(),
            },
        ]
    }

    #[test]
    fn test_every_scene_paints_at_style_resolution() {
        let (style, fonts) = painter_parts();
        let painter = Painter { style: &style, fonts: &fonts };
        for (i, scene) in all_scenes().iter().enumerate() {
            let canvas = painter.paint(scene, i);
            assert_eq!((canvas.width(), canvas.height()), (640, 360));
        }
    }

    #[test]
    fn test_painting_is_deterministic() {
        let (style, fonts) = painter_parts();
        let painter = Painter { style: &style, fonts: &fonts };
        let scene = &all_scenes()[1];
        let a = painter.paint(scene, 1);
        let b = painter.paint(scene, 1);
        for (x, y) in [(0, 0), (100, 150), (320, 200), (639, 359)] {
            assert_eq!(a.pixel(x, y), b.pixel(x, y));
        }
    }

    #[test]
    fn test_overflowing_content_is_clipped_not_panicking() {
        let (style, fonts) = painter_parts();
        let painter = Painter { style: &style, fonts: &fonts };
        let long = "word ".repeat(400);
        painter.paint(
            &Scene::Content {
                heading: long.clone(),
                bullets: vec![long.clone(); 20],
            },
            3,
        );
        painter.paint(
            &Scene::Code {
                heading: "Code".into(),
                file_name: long.clone(),
                language: "Rust".into(),
                lines: vec![long; 200],
            },
            4,
        );
    }
}
