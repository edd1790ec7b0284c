use std::{path::PathBuf, time::Duration};

use crate::types::DurationBounds;

/// Knobs for one pipeline run. Built from the CLI/env in the binary,
/// `Default` gives the values the service ships with.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub bounds: DurationBounds,
    pub target_sections: usize,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub narration: bool,
    /// Voice model for piper; espeak is used when unset
    pub piper_model: Option<PathBuf>,
    pub font_dir: Option<PathBuf>,
    pub provider_timeout: Duration,
    pub generation_budget: Duration,
    pub speech_timeout: Duration,
    pub encode_timeout: Duration,
    pub ingest: IngestLimits,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            bounds: DurationBounds::default(),
            target_sections: 5,
            width: 1920,
            height: 1080,
            fps: 25,
            narration: true,
            piper_model: None,
            font_dir: None,
            provider_timeout: Duration::from_secs(60),
            generation_budget: Duration::from_secs(180),
            speech_timeout: Duration::from_secs(60),
            encode_timeout: Duration::from_secs(600),
            ingest: IngestLimits::default(),
        }
    }
}

impl PipelineConfig {
    /// Parses `WIDTHxHEIGHT`, e.g. `1280x720`
    pub fn with_resolution(mut self, resolution: &str) -> anyhow::Result<Self> {
        let (w, h) = resolution
            .split_once(['x', 'X'])
            .ok_or_else(|| anyhow::anyhow!("Invalid resolution '{resolution}', expected WxH"))?;
        let (width, height) = (w.trim().parse::<u32>()?, h.trim().parse::<u32>()?);
        if width < 320 || height < 180 || width % 2 != 0 || height % 2 != 0 {
            anyhow::bail!("Resolution must be even and at least 320x180, got {width}x{height}");
        }
        self.width = width;
        self.height = height;
        Ok(self)
    }

    /// Sets the total duration bounds, rejecting NaN, non-positive or
    /// inverted values
    pub fn with_bounds(mut self, min_secs: f64, max_secs: f64) -> anyhow::Result<Self> {
        let bounds = DurationBounds { min_secs, max_secs };
        if !bounds.is_valid() {
            anyhow::bail!("Invalid duration bounds {min_secs}..{max_secs} seconds");
        }
        self.bounds = bounds;
        Ok(self)
    }

    pub fn frame_interval_secs(&self) -> f64 {
        1.0 / self.fps.max(1) as f64
    }
}

/// Size limits applied while downloading and condensing a repository
#[derive(Debug, Clone)]
pub struct IngestLimits {
    pub max_archive_bytes: u64,
    /// Cap on everything unpacked from the archive
    pub max_extracted_bytes: u64,
    pub max_entries: usize,
    pub max_file_bytes: u64,
    pub max_files: usize,
    pub max_total_bytes: u64,
    pub request_timeout: Duration,
}

impl Default for IngestLimits {
    fn default() -> Self {
        IngestLimits {
            max_archive_bytes: 100 * 1024 * 1024,
            max_extracted_bytes: 512 * 1024 * 1024,
            max_entries: 50_000,
            max_file_bytes: 256 * 1024,
            max_files: 200,
            max_total_bytes: 2 * 1024 * 1024,
            request_timeout: Duration::from_secs(60),
        }
    }
}
