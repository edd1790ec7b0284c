use std::{
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use tokio::process::Command;

use super::{EncodeRequest, VideoEncoder};
use crate::error::EncodeError;

/// Encodes through the `ffmpeg` binary and measures results with `ffprobe`
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    timeout: Duration,
    probe_timeout: Duration,
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".into(),
            ffprobe: "ffprobe".into(),
            timeout: Duration::from_secs(600),
            probe_timeout: Duration::from_secs(30),
        }
    }
}

fn quote(path: &Path) -> String {
    format!("'{}'", path.display().to_string().replace('\'', r"'\''"))
}

/// Concat demuxer script: every frame with its duration, then the last frame
/// again so that its duration is honoured.
pub fn frame_list(request: &EncodeRequest) -> String {
    let mut list = String::from("ffconcat version 1.0\n");
    for frame in &request.frames {
        list.push_str(&format!("file {}\nduration {:.3}\n", quote(&frame.path), frame.duration_secs));
    }
    if let Some(last) = request.frames.last() {
        list.push_str(&format!("file {}\n", quote(&last.path)));
    }
    list
}

pub fn audio_list(request: &EncodeRequest) -> String {
    let mut list = String::from("ffconcat version 1.0\n");
    for clip in &request.clips {
        list.push_str(&format!("file {}\n", quote(&clip.path)));
    }
    list
}

impl FfmpegEncoder {
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn args(request: &EncodeRequest, frames_list: &Path, audio_list: Option<&Path>) -> Vec<String> {
        let p = &request.profile;
        let mut args = vec![
            "-y".to_string(),
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-f".into(),
            "concat".into(),
            "-safe".into(),
            "0".into(),
            "-i".into(),
            frames_list.display().to_string(),
        ];
        if let Some(audio) = audio_list {
            args.extend([
                "-f".into(),
                "concat".into(),
                "-safe".into(),
                "0".into(),
                "-i".into(),
                audio.display().to_string(),
            ]);
        }
        args.extend([
            "-vf".into(),
            format!(
                "scale={w}:{h}:force_original_aspect_ratio=decrease,pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,fps={fps}",
                w = p.width,
                h = p.height,
                fps = p.fps
            ),
            "-c:v".into(),
            "libx264".into(),
            "-preset".into(),
            p.preset.into(),
            "-crf".into(),
            p.crf.to_string(),
            "-pix_fmt".into(),
            "yuv420p".into(),
        ]);
        if audio_list.is_some() {
            args.extend([
                "-c:a".into(),
                "aac".into(),
                "-b:a".into(),
                p.audio_bitrate.into(),
            ]);
        }
        args.extend([
            "-t".into(),
            format!("{:.3}", request.total_secs()),
            "-movflags".into(),
            "+faststart".into(),
            request.output.display().to_string(),
        ]);
        args
    }

    async fn run(&self, program: &Path, args: &[String], limit: Duration) -> Result<Vec<u8>, EncodeError> {
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EncodeError::Spawn(format!("{}: {e}", program.display())))?;

        let output = tokio::time::timeout(limit, child.wait_with_output())
            .await
            .map_err(|_| EncodeError::Timeout(limit))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EncodeError::Exit {
                status: output.status.code().unwrap_or(-1),
                stderr: stderr.trim().chars().rev().take(500).collect::<Vec<_>>().into_iter().rev().collect(),
            });
        }
        Ok(output.stdout)
    }
}

impl VideoEncoder for FfmpegEncoder {
    async fn encode(&self, request: &EncodeRequest) -> Result<(), EncodeError> {
        let frames_path = request.workdir.join("frames.ffconcat");
        tokio::fs::write(&frames_path, frame_list(request)).await?;

        let audio_path = if request.clips.is_empty() {
            None
        } else {
            let path = request.workdir.join("audio.ffconcat");
            tokio::fs::write(&path, audio_list(request)).await?;
            Some(path)
        };

        let args = Self::args(request, &frames_path, audio_path.as_deref());
        tracing::debug!(?args, "Running ffmpeg");
        self.run(&self.ffmpeg, &args, self.timeout).await?;
        Ok(())
    }

    async fn probe_duration(&self, path: &Path) -> Result<f64, EncodeError> {
        let args = [
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ]
        .into_iter()
        .map(String::from)
        .chain(std::iter::once(path.display().to_string()))
        .collect::<Vec<_>>();

        let stdout = self.run(&self.ffprobe, &args, self.probe_timeout).await?;
        let text = String::from_utf8_lossy(&stdout);
        text.trim()
            .parse::<f64>()
            .map_err(|e| EncodeError::Probe(format!("unexpected ffprobe output '{}': {e}", text.trim())))
    }
}
