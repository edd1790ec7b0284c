pub mod canvas;
pub mod font;
pub mod highlight;
pub mod layout;
pub mod paint;
pub mod scene;
pub mod style;

use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    path::{Path, PathBuf},
    sync::Arc,
};

use rayon::prelude::*;

pub use scene::{plan, Layer, Scene};

use crate::{
    config::PipelineConfig,
    types::{Frame, ScriptSection},
};
use font::Fonts;
use paint::Painter;
use style::Style;

/// Rasterizes scenes into numbered PNG frames.
#[derive(Clone)]
pub struct SceneRenderer {
    style: Style,
    fonts: Arc<Fonts>,
}

impl SceneRenderer {
    pub fn new(style: Style, fonts: Fonts) -> Self {
        Self {
            style,
            fonts: Arc::new(fonts),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            Style::new(config.width, config.height),
            Fonts::load(config.font_dir.as_deref()),
        )
    }

    pub fn style(&self) -> &Style {
        &self.style
    }

    pub fn frame_path(dir: &Path, index: usize) -> PathBuf {
        dir.join(format!("frame_{index:03}.png"))
    }

    fn render_one(&self, scene: &Scene, section: &ScriptSection, dir: &Path) -> Option<Frame> {
        let painter = Painter {
            style: &self.style,
            fonts: &self.fonts,
        };
        let path = Self::frame_path(dir, section.index);

        let painted = catch_unwind(AssertUnwindSafe(|| painter.paint(scene, section.index)))
            .map_err(|_| "scene painter panicked".to_string())
            .and_then(|canvas| canvas.save_png(&path).map_err(|e| e.to_string()));

        if let Err(e) = painted {
            tracing::warn!(index = section.index, error = %e, "Scene failed to render, writing fallback frame");
            painter
                .fallback(scene.heading(), section.index)
                .save_png(&path)
                .inspect_err(|e| {
                    tracing::warn!(index = section.index, error = %e, "Fallback frame failed, skipping section")
                })
                .ok()?;
        }

        Some(Frame {
            index: section.index,
            path,
            duration_secs: section.duration_secs,
        })
    }

    /// Renders scene `i` for section `i` in parallel; the returned frames keep
    /// section order and omit sections whose frame could not be written at all.
    #[tracing::instrument(skip_all, fields(scenes = scenes.len(), dir = %dir.display()))]
    pub fn render(&self, scenes: &[Scene], sections: &[ScriptSection], dir: &Path) -> Vec<Frame> {
        let frames = scenes
            .par_iter()
            .zip(sections.par_iter())
            .map(|(scene, section)| self.render_one(scene, section, dir))
            .collect::<Vec<_>>();

        let frames = frames.into_iter().flatten().collect::<Vec<_>>();
        tracing::info!(frames = frames.len(), "Rendered frames");
        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SectionKind;

    fn section(index: usize, kind: SectionKind) -> ScriptSection {
        ScriptSection {
            index,
            kind,
            heading: format!("Section {index}"),
            text: "Some narration. More narration.".into(),
            duration_secs: 4.0 + index as f64,
        }
    }

    #[test]
    fn test_render_writes_one_frame_per_section_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = SceneRenderer::new(Style::new(320, 180), Fonts::block());
        let sections = (0..4).map(|i| section(i, SectionKind::Content)).collect::<Vec<_>>();
        let scenes = sections
            .iter()
            .map(|s| Scene::Content {
                heading: s.heading.clone(),
                bullets: vec![s.text.clone()],
            })
            .collect::<Vec<_>>();

        let frames = renderer.render(&scenes, &sections, dir.path());

        assert_eq!(frames.iter().map(|f| f.index).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
        for frame in &frames {
            assert!(frame.path.exists());
            assert_eq!(frame.duration_secs, 4.0 + frame.index as f64);
        }
        assert!(frames[2].path.ends_with("frame_002.png"));
        let img = image::open(&frames[0].path).unwrap();
        assert_eq!((img.width(), img.height()), (320, 180));
    }

    #[test]
    fn test_unwritable_dir_skips_frames() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        let renderer = SceneRenderer::new(Style::new(320, 180), Fonts::block());
        let sections = vec![section(0, SectionKind::Title)];
        let scenes = vec![Scene::Title {
            name: "x".into(),
            subtitle: String::new(),
            badges: vec![],
        }];

        assert!(renderer.render(&scenes, &sections, &missing).is_empty());
    }
}
