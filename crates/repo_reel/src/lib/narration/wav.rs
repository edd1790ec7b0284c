use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

/// Format of silent clips written when no synthesized clip gives us one
pub const DEFAULT_SPEC: WavSpec = WavSpec {
    channels: 1,
    sample_rate: 22050,
    bits_per_sample: 16,
    sample_format: SampleFormat::Int,
};

pub fn spec(path: &Path) -> Result<WavSpec, hound::Error> {
    Ok(WavReader::open(path)?.spec())
}

pub fn duration_secs(path: &Path) -> Result<f64, hound::Error> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let frames = reader.len() as f64 / spec.channels.max(1) as f64;
    Ok(frames / spec.sample_rate as f64)
}

fn sample_count(secs: f64, spec: &WavSpec) -> u64 {
    (secs.max(0.0) * spec.sample_rate as f64).round() as u64 * spec.channels as u64
}

pub fn write_silence(path: &Path, secs: f64, spec: WavSpec) -> Result<(), hound::Error> {
    let mut writer = WavWriter::create(path, spec)?;
    for _ in 0..sample_count(secs, &spec) {
        match spec.sample_format {
            SampleFormat::Float => writer.write_sample(0.0_f32)?,
            SampleFormat::Int => writer.write_sample(0_i32)?,
        }
    }
    writer.finalize()
}

/// Appends trailing silence so the clip lasts `target_secs`; returns the new
/// duration. Clips already at least that long are left untouched.
pub fn pad_to(path: &Path, target_secs: f64) -> Result<f64, hound::Error> {
    let current = duration_secs(path)?;
    if current >= target_secs {
        return Ok(current);
    }

    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();
    let padded = path.with_extension("padded.wav");
    {
        let mut writer = WavWriter::create(&padded, spec)?;
        match spec.sample_format {
            SampleFormat::Float => {
                for sample in reader.samples::<f32>() {
                    writer.write_sample(sample?)?;
                }
            }
            SampleFormat::Int => {
                for sample in reader.samples::<i32>() {
                    writer.write_sample(sample?)?;
                }
            }
        }
        let missing = sample_count(target_secs, &spec).saturating_sub(reader.len() as u64);
        for _ in 0..missing {
            match spec.sample_format {
                SampleFormat::Float => writer.write_sample(0.0_f32)?,
                SampleFormat::Int => writer.write_sample(0_i32)?,
            }
        }
        writer.finalize()?;
    }
    std::fs::rename(&padded, path)?;
    duration_secs(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(path: &Path, secs: f64) {
        let mut writer = WavWriter::create(path, DEFAULT_SPEC).unwrap();
        for i in 0..sample_count(secs, &DEFAULT_SPEC) {
            writer.write_sample(((i % 100) as i16 - 50) * 100).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_silence_has_requested_duration() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("silence.wav");
        write_silence(&path, 2.5, DEFAULT_SPEC).unwrap();
        assert!((duration_secs(&path).unwrap() - 2.5).abs() < 1e-3);
    }

    #[test]
    fn test_pad_extends_and_keeps_audio() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.wav");
        tone(&path, 1.0);

        let padded = pad_to(&path, 3.0).unwrap();
        assert!((padded - 3.0).abs() < 1e-3);

        let samples = WavReader::open(&path)
            .unwrap()
            .samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(samples[1], -4900);
        assert_eq!(*samples.last().unwrap(), 0);
        assert!(!path.with_extension("padded.wav").exists());
    }

    #[test]
    fn test_pad_leaves_longer_clip_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.wav");
        tone(&path, 2.0);
        assert!((pad_to(&path, 1.0).unwrap() - 2.0).abs() < 1e-3);
    }
}
