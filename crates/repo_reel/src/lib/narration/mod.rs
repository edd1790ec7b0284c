pub mod command;
pub mod wav;

use std::{
    future::Future,
    path::{Path, PathBuf},
    sync::LazyLock,
};

use futures::{stream, StreamExt};
use regex::Regex;

use crate::{
    error::SpeechError,
    types::{AudioClip, Frame, ScriptSection},
};

pub use command::CommandSpeech;

/// Sections synthesized at the same time
const CONCURRENT_CLIPS: usize = 2;

pub trait SpeechBackend: Send + Sync {
    fn id(&self) -> &str;

    fn synthesize(
        &self,
        text: &str,
        out: &Path,
    ) -> impl Future<Output = Result<(), SpeechError>> + Send;
}

/// Backend used when narration is switched off
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSpeech;

impl SpeechBackend for NoSpeech {
    fn id(&self) -> &str {
        "none"
    }

    async fn synthesize(&self, _text: &str, _out: &Path) -> Result<(), SpeechError> {
        Err(SpeechError::Unavailable("narration disabled".into()))
    }
}

impl<B: SpeechBackend> SpeechBackend for Option<B> {
    fn id(&self) -> &str {
        self.as_ref().map_or("none", |b| b.id())
    }

    async fn synthesize(&self, text: &str, out: &Path) -> Result<(), SpeechError> {
        match self {
            Some(backend) => backend.synthesize(text, out).await,
            None => NoSpeech.synthesize(text, out).await,
        }
    }
}

static MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[\d:.\s-]+\]").expect("Failed to compile regex"));
static BOLD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("Failed to compile regex"));
static ITALIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*(.*?)\*").expect("Failed to compile regex"));
static CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`(.*?)`").expect("Failed to compile regex"));

/// Strips timing markers and markdown so the engine reads plain prose
pub fn clean_tts_text(text: &str) -> String {
    let text = MARKER_RE.replace_all(text, "");
    let text = BOLD_RE.replace_all(&text, "$1");
    let text = ITALIC_RE.replace_all(&text, "$1");
    let text = CODE_RE.replace_all(&text, "$1");
    let mut text = text.split_whitespace().collect::<Vec<_>>().join(" ");

    if !text.is_empty() && !text.ends_with(['.', '!', '?']) {
        text.push('.');
    }
    text
}

/// Frames with their final durations and the clips to mux alongside them.
/// `clips` is empty when the video has no audio track.
#[derive(Debug, Clone, PartialEq)]
pub struct Narration {
    pub frames: Vec<Frame>,
    pub clips: Vec<AudioClip>,
}

impl Narration {
    pub fn silent(frames: Vec<Frame>) -> Self {
        Self {
            frames,
            clips: vec![],
        }
    }

    pub fn has_audio(&self) -> bool {
        !self.clips.is_empty()
    }
}

fn clip_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("clip_{index:03}.wav"))
}

enum ClipResult {
    Spoken(PathBuf, f64),
    Failed(PathBuf),
    Unavailable,
}

/// Turns section text into one clip per frame and lines up their durations.
pub struct NarrationSynthesizer<B> {
    backend: B,
}

impl<B: SpeechBackend> NarrationSynthesizer<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    async fn speak(&self, section: &ScriptSection, dir: &Path) -> ClipResult {
        let path = clip_path(dir, section.index);
        let text = clean_tts_text(&section.text);
        if text.is_empty() {
            return ClipResult::Failed(path);
        }

        match self.backend.synthesize(&text, &path).await {
            Ok(()) => match wav::duration_secs(&path) {
                Ok(secs) if secs > 0.0 => ClipResult::Spoken(path, secs),
                Ok(_) => ClipResult::Failed(path),
                Err(e) => {
                    tracing::warn!(index = section.index, error = %e, "Unreadable narration clip");
                    ClipResult::Failed(path)
                }
            },
            Err(SpeechError::Unavailable(reason)) => {
                tracing::warn!(backend = self.backend.id(), %reason, "Speech backend unavailable");
                ClipResult::Unavailable
            }
            Err(e) => {
                tracing::warn!(index = section.index, error = ?e, "Narration failed for section");
                ClipResult::Failed(path)
            }
        }
    }

    async fn speak_frame(&self, sections: &[ScriptSection], index: usize, dir: &Path) -> ClipResult {
        match sections.iter().find(|s| s.index == index) {
            Some(section) => self.speak(section, dir).await,
            None => ClipResult::Failed(clip_path(dir, index)),
        }
    }

    /// Narrates the section of every frame.
    ///
    /// An unavailable backend leaves the frames untouched and yields no audio.
    /// A failed section gets a silent clip as long as its frame. Otherwise a
    /// clip longer than its frame stretches the frame and a shorter clip is
    /// padded with silence.
    #[tracing::instrument(skip_all, fields(backend = self.backend.id(), frames = frames.len()))]
    pub async fn narrate(
        &self,
        sections: &[ScriptSection],
        frames: Vec<Frame>,
        dir: &Path,
    ) -> Result<Narration, std::io::Error> {
        let pending = frames
            .iter()
            .map(|frame| self.speak_frame(sections, frame.index, dir))
            .collect::<Vec<_>>();
        let results = stream::iter(pending)
            .buffered(CONCURRENT_CLIPS)
            .collect::<Vec<_>>()
            .await;

        if results.iter().any(|r| matches!(r, ClipResult::Unavailable)) {
            return Ok(Narration::silent(frames));
        }
        let spec = results.iter().find_map(|r| match r {
            ClipResult::Spoken(path, _) => wav::spec(path).ok(),
            _ => None,
        });
        let Some(spec) = spec else {
            tracing::warn!("No section could be narrated, continuing without audio");
            return Ok(Narration::silent(frames));
        };

        let mut narrated = Vec::with_capacity(frames.len());
        let mut clips = Vec::with_capacity(frames.len());
        for (mut frame, result) in frames.into_iter().zip(results) {
            let (path, duration_secs) = match result {
                ClipResult::Spoken(path, secs) if secs > frame.duration_secs => {
                    tracing::debug!(index = frame.index, from = frame.duration_secs, to = secs, "Extending frame to fit narration");
                    frame.duration_secs = secs;
                    (path, secs)
                }
                ClipResult::Spoken(path, _) => {
                    let secs = wav::pad_to(&path, frame.duration_secs).map_err(to_io)?;
                    (path, secs)
                }
                ClipResult::Failed(path) => {
                    wav::write_silence(&path, frame.duration_secs, spec).map_err(to_io)?;
                    (path, frame.duration_secs)
                }
                ClipResult::Unavailable => {
                    let path = clip_path(dir, frame.index);
                    wav::write_silence(&path, frame.duration_secs, spec).map_err(to_io)?;
                    (path, frame.duration_secs)
                }
            };
            clips.push(AudioClip {
                index: frame.index,
                path,
                duration_secs,
            });
            narrated.push(frame);
        }

        Ok(Narration {
            frames: narrated,
            clips,
        })
    }
}

fn to_io(e: hound::Error) -> std::io::Error {
    match e {
        hound::Error::IoError(e) => e,
        other => std::io::Error::other(other.to_string()),
    }
}
