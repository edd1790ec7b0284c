use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use hound::{SampleFormat, WavSpec, WavWriter};
use repo_reel::{SpeechBackend, SpeechError};

#[derive(Clone)]
pub struct MockSpeech {
    /// Length of every clip written
    pub clip_secs: f64,
    pub calls: Arc<Mutex<Vec<String>>>,
    pub fail_with: Option<String>,
}

impl MockSpeech {
    pub fn new(clip_secs: f64) -> Self {
        Self {
            clip_secs,
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_with: None,
        }
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            fail_with: Some(msg.to_string()),
            ..Self::new(0.0)
        }
    }
}

impl SpeechBackend for MockSpeech {
    fn id(&self) -> &str {
        "mock-speech"
    }

    async fn synthesize(&self, text: &str, out: &Path) -> Result<(), SpeechError> {
        self.calls.lock().unwrap().push(text.to_string());
        if let Some(ref msg) = self.fail_with {
            return Err(SpeechError::Failed(msg.clone()));
        }

        let spec = WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(out, spec).map_err(|e| SpeechError::Failed(e.to_string()))?;
        let samples = (self.clip_secs * spec.sample_rate as f64).round() as usize;
        for i in 0..samples {
            writer
                .write_sample(((i % 64) as i16 - 32) * 200)
                .map_err(|e| SpeechError::Failed(e.to_string()))?;
        }
        writer.finalize().map_err(|e| SpeechError::Failed(e.to_string()))
    }
}
