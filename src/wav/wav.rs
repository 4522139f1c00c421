use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::error::EngineError;

/// Reads a WAV file and returns mono `f32` samples scaled to `[-1, 1]`
/// alongside its native sample rate. Multi-channel input is downmixed by
/// averaging channels.
pub fn read_wav_samples(path: &Path) -> Result<(Vec<f32>, u32), EngineError> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();
    let channels = spec.channels as usize;
    if channels == 0 {
        return Err(EngineError::AudioLoad("WAV file has zero channels".into()));
    }

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Int => {
            let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max))
                .collect::<Result<_, _>>()?
        }
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()?,
    };

    let mono = downmix(&samples, channels);
    Ok((mono, spec.sample_rate))
}

fn downmix(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels == 1 {
        return samples.to_vec();
    }
    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Writes mono `f32` samples (`[-1, 1]`) to `path` as 16-bit PCM WAV.
pub fn write_wav_samples(path: &Path, samples: &[f32], sample_rate: u32) -> Result<(), EngineError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for &sample in samples {
        let clamped = sample.clamp(-1.0, 1.0);
        writer.write_sample((clamped * i16::MAX as f32) as i16)?;
    }
    writer.finalize()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trips_mono_samples() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let samples: Vec<f32> = (0..1000).map(|i| (i as f32 / 500.0).sin() * 0.5).collect();
        write_wav_samples(&path, &samples, 22050).unwrap();

        let (read_back, sr) = read_wav_samples(&path).unwrap();
        assert_eq!(sr, 22050);
        assert_eq!(read_back.len(), samples.len());
        for (a, b) in samples.iter().zip(read_back.iter()) {
            assert!((a - b).abs() < 0.01);
        }
    }

    #[test]
    fn rejects_missing_file() {
        let err = read_wav_samples(Path::new("/nonexistent/file.wav")).unwrap_err();
        assert!(matches!(err, EngineError::AudioLoad(_)));
    }
}
