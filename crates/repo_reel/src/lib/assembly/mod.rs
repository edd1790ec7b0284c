pub mod ffmpeg;

use std::{
    future::Future,
    path::{Path, PathBuf},
};

use crate::{
    error::{AssemblyError, EncodeError},
    types::{AudioClip, Frame},
};

pub use ffmpeg::FfmpegEncoder;

/// Encoder settings for one attempt
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeProfile {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub preset: &'static str,
    pub crf: u8,
    pub audio_bitrate: &'static str,
}

impl EncodeProfile {
    pub fn primary(width: u32, height: u32, fps: u32) -> Self {
        Self {
            width,
            height,
            fps,
            preset: "veryfast",
            crf: 23,
            audio_bitrate: "128k",
        }
    }

    /// Half resolution (kept even), fastest preset and lower bitrates
    pub fn simplified(&self) -> Self {
        let half = |v: u32| ((v / 2) & !1).max(2);
        Self {
            width: half(self.width),
            height: half(self.height),
            fps: self.fps,
            preset: "ultrafast",
            crf: 32,
            audio_bitrate: "64k",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EncodeRequest {
    pub frames: Vec<Frame>,
    /// Empty when the video has no audio track
    pub clips: Vec<AudioClip>,
    pub output: PathBuf,
    /// Scratch directory for list files
    pub workdir: PathBuf,
    pub profile: EncodeProfile,
}

impl EncodeRequest {
    pub fn total_secs(&self) -> f64 {
        self.frames.iter().map(|f| f.duration_secs).sum()
    }
}

pub trait VideoEncoder: Send + Sync {
    fn encode(&self, request: &EncodeRequest) -> impl Future<Output = Result<(), EncodeError>> + Send;

    fn probe_duration(&self, path: &Path) -> impl Future<Output = Result<f64, EncodeError>> + Send;
}

/// Runs the encoder with the primary profile and, if that attempt fails or
/// produces a bad file, once more with the simplified profile.
pub struct AssemblyEngine<E> {
    encoder: E,
    width: u32,
    height: u32,
    fps: u32,
}

impl<E: VideoEncoder> AssemblyEngine<E> {
    pub fn new(encoder: E, width: u32, height: u32, fps: u32) -> Self {
        Self {
            encoder,
            width,
            height,
            fps: fps.max(1),
        }
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    async fn attempt(&self, request: &EncodeRequest) -> Result<f64, EncodeError> {
        self.encoder.encode(request).await?;

        let size = tokio::fs::metadata(&request.output).await.map(|m| m.len()).unwrap_or(0);
        if size == 0 {
            return Err(EncodeError::Probe("encoder produced an empty file".into()));
        }

        let duration = self.encoder.probe_duration(&request.output).await?;
        let expected = request.total_secs();
        let tolerance = 1.0 / request.profile.fps.max(1) as f64 + 1e-6;
        if (duration - expected).abs() > tolerance {
            return Err(EncodeError::Probe(format!(
                "duration {duration:.3}s differs from expected {expected:.3}s"
            )));
        }
        Ok(duration)
    }

    #[tracing::instrument(skip_all, fields(frames = frames.len(), clips = clips.len()))]
    pub async fn assemble(
        &self,
        frames: &[Frame],
        clips: &[AudioClip],
        dir: &Path,
    ) -> Result<PathBuf, AssemblyError> {
        if frames.is_empty() {
            return Err(AssemblyError::NoFrames);
        }

        let primary = EncodeProfile::primary(self.width, self.height, self.fps);
        let profiles = [primary.clone(), primary.simplified()];
        let mut request = EncodeRequest {
            frames: frames.to_vec(),
            clips: clips.to_vec(),
            output: dir.join("video.mp4"),
            workdir: dir.to_path_buf(),
            profile: primary,
        };

        for profile in profiles {
            request.profile = profile;
            match self.attempt(&request).await {
                Ok(duration) => {
                    tracing::info!(
                        output = %request.output.display(),
                        duration,
                        preset = request.profile.preset,
                        "Video assembled"
                    );
                    return Ok(request.output);
                }
                Err(e) => {
                    tracing::warn!(error = %e, preset = request.profile.preset, "Encoding attempt failed");
                    let _ = tokio::fs::remove_file(&request.output).await;
                }
            }
        }

        tracing::error!("Both encoding profiles failed");
        Err(AssemblyError::EncodeFailed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Writes a dummy file and reports a fixed duration per profile preset
    struct FakeEncoder {
        fail_presets: Vec<&'static str>,
        probed: f64,
        seen: Arc<Mutex<Vec<EncodeProfile>>>,
    }

    impl VideoEncoder for FakeEncoder {
        async fn encode(&self, request: &EncodeRequest) -> Result<(), EncodeError> {
            self.seen.lock().unwrap().push(request.profile.clone());
            if self.fail_presets.contains(&request.profile.preset) {
                return Err(EncodeError::Exit {
                    status: 1,
                    stderr: "boom".into(),
                });
            }
            tokio::fs::write(&request.output, b"mp4").await?;
            Ok(())
        }

        async fn probe_duration(&self, _path: &Path) -> Result<f64, EncodeError> {
            Ok(self.probed)
        }
    }

    fn frames(dir: &Path) -> Vec<Frame> {
        (0..3)
            .map(|index| Frame {
                index,
                path: dir.join(format!("frame_{index:03}.png")),
                duration_secs: 10.0,
            })
            .collect()
    }

    fn engine(fail_presets: Vec<&'static str>, probed: f64) -> AssemblyEngine<FakeEncoder> {
        AssemblyEngine::new(
            FakeEncoder {
                fail_presets,
                probed,
                seen: Arc::default(),
            },
            1920,
            1080,
            25,
        )
    }

    #[test]
    fn test_simplified_profile() {
        let simplified = EncodeProfile::primary(1920, 1080, 25).simplified();
        assert_eq!((simplified.width, simplified.height), (960, 540));
        assert_eq!((simplified.preset, simplified.crf, simplified.audio_bitrate), ("ultrafast", 32, "64k"));
        assert_eq!(EncodeProfile::primary(1366, 770, 25).simplified().width % 2, 0);
    }

    #[tokio::test]
    async fn test_primary_success() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(vec![], 30.02);
        let out = engine.assemble(&frames(dir.path()), &[], dir.path()).await.unwrap();
        assert_eq!(out, dir.path().join("video.mp4"));
        assert_eq!(engine.encoder().seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_falls_back_to_simplified_profile() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(vec!["veryfast"], 30.0);
        engine.assemble(&frames(dir.path()), &[], dir.path()).await.unwrap();

        let seen = engine.encoder().seen.lock().unwrap().clone();
        assert_eq!(seen.iter().map(|p| p.preset).collect::<Vec<_>>(), vec!["veryfast", "ultrafast"]);
        assert_eq!(seen[1].width, 960);
    }

    #[tokio::test]
    async fn test_duration_mismatch_counts_as_failure() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(vec![], 25.0);
        let err = engine.assemble(&frames(dir.path()), &[], dir.path()).await.unwrap_err();
        assert!(matches!(err, AssemblyError::EncodeFailed));
        assert!(!dir.path().join("video.mp4").exists());
    }

    #[tokio::test]
    async fn test_no_frames() {
        let dir = tempfile::tempdir().unwrap();
        let err = engine(vec![], 0.0).assemble(&[], &[], dir.path()).await.unwrap_err();
        assert!(matches!(err, AssemblyError::NoFrames));
    }
}
