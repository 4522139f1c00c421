use std::f32::consts::PI;
use std::sync::Arc;

use rustfft::num_complex::Complex32;
use rustfft::{Fft, FftPlanner};

use crate::config::Config;
use crate::error::EngineError;

/// Dense magnitude time-frequency matrix, `frames[t][f]`. Row `t` is one STFT
/// column (one hop's worth of samples), `F = n_fft / 2 + 1` bins wide.
///
/// Non-centered: frame `t` covers samples `[t*hop, t*hop + n_fft)` with the
/// final frame zero-padded, not librosa's default centered/reflect-padded
/// convention. Pinned this way because the frame-count formula in the
/// contract only holds for the non-centered form (see DESIGN.md).
pub struct Spectrogram {
    pub frames: Vec<Vec<f32>>,
}

impl Spectrogram {
    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn num_bins(&self) -> usize {
        self.frames.first().map_or(0, |row| row.len())
    }

    pub fn magnitude(&self, t: usize, f: usize) -> f32 {
        self.frames[t][f]
    }
}

fn periodic_hann(n: usize) -> Vec<f32> {
    (0..n)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / n as f32).cos())
        .collect()
}

/// Linearly resamples `samples` from `from_rate` to `to_rate`. The builder
/// tolerates any input sample rate; ingestion/transcoding is expected to
/// already hand it `cfg.sample_rate`-rate audio, but this keeps the contract
/// honest for arbitrary callers.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }
    let ratio = to_rate as f64 / from_rate as f64;
    let out_len = ((samples.len() as f64) * ratio).round().max(1.0) as usize;
    let mut out = Vec::with_capacity(out_len);
    for i in 0..out_len {
        let src_pos = i as f64 / ratio;
        let idx = src_pos.floor() as usize;
        let frac = (src_pos - idx as f64) as f32;
        let a = samples[idx.min(samples.len() - 1)];
        let b = samples[(idx + 1).min(samples.len() - 1)];
        out.push(a + (b - a) * frac);
    }
    out
}

/// Computes the STFT magnitude spectrogram of `samples` (mono PCM, any
/// sample rate). Resamples to `cfg.sample_rate` first if needed.
pub fn build_spectrogram(
    samples: &[f32],
    sample_rate: u32,
    cfg: &Config,
) -> Result<Spectrogram, EngineError> {
    if samples.is_empty() {
        return Err(EngineError::AudioLoad("empty sample stream".into()));
    }

    let samples = if sample_rate != cfg.sample_rate {
        resample(samples, sample_rate, cfg.sample_rate)
    } else {
        samples.to_vec()
    };

    let n_fft = cfg.n_fft;
    let hop = cfg.hop;
    let window = periodic_hann(n_fft);

    let mut planner = FftPlanner::<f32>::new();
    let fft: Arc<dyn Fft<f32>> = planner.plan_fft_forward(n_fft);

    let num_frames = if samples.len() <= n_fft {
        1
    } else {
        (samples.len() - n_fft).div_ceil(hop) + 1
    };

    let mut frames = Vec::with_capacity(num_frames);
    let mut scratch = vec![Complex32::new(0.0, 0.0); fft.get_inplace_scratch_len()];

    for t in 0..num_frames {
        let start = t * hop;
        let end = (start + n_fft).min(samples.len());

        let mut buf: Vec<Complex32> = Vec::with_capacity(n_fft);
        for i in 0..n_fft {
            let sample = if start + i < end {
                samples[start + i] * window[i]
            } else {
                0.0
            };
            buf.push(Complex32::new(sample, 0.0));
        }

        fft.process_with_scratch(&mut buf, &mut scratch);

        let num_bins = n_fft / 2 + 1;
        let row: Vec<f32> = buf[..num_bins].iter().map(|c| c.norm()).collect();
        frames.push(row);
    }

    Ok(Spectrogram { frames })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_input() {
        let cfg = Config::from_env();
        let err = build_spectrogram(&[], 22050, &cfg).unwrap_err();
        assert!(matches!(err, EngineError::AudioLoad(_)));
    }

    #[test]
    fn frame_count_matches_contract_formula() {
        let cfg = Config::from_env();
        let n = cfg.n_fft + cfg.hop * 3 + 17;
        let samples = vec![0.0f32; n];
        let spec = build_spectrogram(&samples, cfg.sample_rate, &cfg).unwrap();
        let expected = (n - cfg.n_fft).div_ceil(cfg.hop) + 1;
        assert_eq!(spec.num_frames(), expected);
        assert_eq!(spec.num_bins(), cfg.n_fft / 2 + 1);
    }

    #[test]
    fn short_signal_yields_one_frame() {
        let cfg = Config::from_env();
        let samples = vec![0.5f32; 100];
        let spec = build_spectrogram(&samples, cfg.sample_rate, &cfg).unwrap();
        assert_eq!(spec.num_frames(), 1);
    }

    #[test]
    fn resample_identity_is_noop() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(resample(&samples, 22050, 22050), samples);
    }

    #[test]
    fn sine_sweep_matches_known_bin() {
        // A pure tone at bin k of a single windowed frame should dominate
        // the magnitude spectrum near that bin.
        let cfg = Config::from_env();
        let k = 100;
        let freq = k as f32 * cfg.sample_rate as f32 / cfg.n_fft as f32;
        let samples: Vec<f32> = (0..cfg.n_fft * 2)
            .map(|n| (2.0 * PI * freq * n as f32 / cfg.sample_rate as f32).sin())
            .collect();
        let spec = build_spectrogram(&samples, cfg.sample_rate, &cfg).unwrap();
        let row = &spec.frames[0];
        let peak_bin = row
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        assert!((peak_bin as i64 - k as i64).abs() <= 1);
    }
}
