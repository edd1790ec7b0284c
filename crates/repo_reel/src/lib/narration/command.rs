use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use tokio::{io::AsyncWriteExt, process::Command};

use super::SpeechBackend;
use crate::error::SpeechError;

#[derive(Debug, Clone, PartialEq)]
pub enum Engine {
    Espeak {
        program: String,
        voice: String,
        words_per_minute: u32,
        amplitude: u32,
    },
    Piper {
        model: PathBuf,
    },
}

/// Text-to-speech through a locally installed `espeak-ng`, `espeak` or `piper`
#[derive(Debug, Clone)]
pub struct CommandSpeech {
    engine: Engine,
    timeout: Duration,
}

impl CommandSpeech {
    pub fn espeak(program: impl Into<String>) -> Self {
        Self {
            engine: Engine::Espeak {
                program: program.into(),
                voice: "en+m3".into(),
                words_per_minute: 160,
                amplitude: 80,
            },
            timeout: Duration::from_secs(60),
        }
    }

    pub fn piper(model: impl Into<PathBuf>) -> Self {
        Self {
            engine: Engine::Piper {
                model: model.into(),
            },
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Picks the first engine that answers `--version`: piper when a model is
    /// given, then `espeak-ng`, then `espeak`.
    pub async fn detect(piper_model: Option<&Path>) -> Option<Self> {
        if let Some(model) = piper_model {
            if responds("piper").await && model.exists() {
                return Some(Self::piper(model));
            }
            tracing::warn!(model = %model.display(), "piper unusable, trying espeak");
        }
        for program in ["espeak-ng", "espeak"] {
            if responds(program).await {
                return Some(Self::espeak(program));
            }
        }
        tracing::warn!("No speech engine found on PATH");
        None
    }

    fn command(&self, out: &Path) -> Command {
        let mut cmd = match &self.engine {
            Engine::Espeak {
                program,
                voice,
                words_per_minute,
                amplitude,
            } => {
                let mut cmd = Command::new(program);
                cmd.arg("-v")
                    .arg(voice)
                    .arg("-s")
                    .arg(words_per_minute.to_string())
                    .arg("-a")
                    .arg(amplitude.to_string())
                    .arg("-w")
                    .arg(out)
                    .arg("--stdin");
                cmd
            }
            Engine::Piper { model } => {
                let mut cmd = Command::new("piper");
                cmd.arg("--model").arg(model).arg("--output_file").arg(out);
                cmd
            }
        };
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    async fn run(&self, text: &str, out: &Path) -> Result<(), SpeechError> {
        let mut child = self.command(out).spawn().map_err(|e| match e.kind() {
            ErrorKind::NotFound => SpeechError::Unavailable(e.to_string()),
            _ => SpeechError::Failed(e.to_string()),
        })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .await
                .map_err(|e| SpeechError::Failed(e.to_string()))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| SpeechError::Failed(e.to_string()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SpeechError::Failed(format!(
                "exit status {}: {}",
                output.status,
                stderr.trim().chars().take(200).collect::<String>()
            )));
        }

        match tokio::fs::metadata(out).await {
            Ok(meta) if meta.len() > 44 => Ok(()),
            _ => Err(SpeechError::Failed("engine produced no audio".into())),
        }
    }
}

async fn responds(program: &str) -> bool {
    Command::new(program)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .status()
        .await
        .map(|status| status.success())
        .unwrap_or(false)
}

impl SpeechBackend for CommandSpeech {
    fn id(&self) -> &str {
        match &self.engine {
            Engine::Espeak { program, .. } => program,
            Engine::Piper { .. } => "piper",
        }
    }

    async fn synthesize(&self, text: &str, out: &Path) -> Result<(), SpeechError> {
        tokio::time::timeout(self.timeout, self.run(text, out))
            .await
            .map_err(|_| SpeechError::Failed(format!("timed out after {:?}", self.timeout)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_program_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let speech = CommandSpeech::espeak("definitely-not-a-speech-engine");
        let err = speech
            .synthesize("hello", &dir.path().join("x.wav"))
            .await
            .unwrap_err();
        assert!(matches!(err, SpeechError::Unavailable(_)));
    }

    #[test]
    fn test_espeak_arguments() {
        let speech = CommandSpeech::espeak("espeak-ng");
        let cmd = speech.command(Path::new("/tmp/out.wav"));
        let args = cmd
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect::<Vec<_>>();
        assert_eq!(
            args,
            ["-v", "en+m3", "-s", "160", "-a", "80", "-w", "/tmp/out.wav", "--stdin"]
        );
        assert_eq!(speech.id(), "espeak-ng");
    }
}
