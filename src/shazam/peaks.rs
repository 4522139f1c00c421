use crate::config::Config;
use crate::shazam::spectrogram::Spectrogram;

/// A local maximum in the spectrogram, `f` = frequency bin, `t` = time frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Peak {
    pub f: usize,
    pub t: usize,
}

/// Extracts local maxima from `spec` above the `cfg.percentile`-th magnitude
/// percentile, within a `(2*radius+1) x (2*radius+1)` neighborhood where
/// `radius = cfg.neighborhood_radius`.
///
/// A bin is a peak when it equals the neighborhood maximum AND that maximum
/// is strictly greater than zero — an all-zero spectrogram (e.g. silence)
/// yields zero peaks rather than treating every bin as tied-for-max.
///
/// Emitted in `(t asc, f asc)` order, matching the order landmark hashing
/// expects its candidates sorted in.
pub fn pick_peaks(spec: &Spectrogram, cfg: &Config) -> Vec<Peak> {
    let t_len = spec.num_frames();
    let f_len = spec.num_bins();
    if t_len == 0 || f_len == 0 {
        return Vec::new();
    }

    let threshold = percentile(spec, cfg.percentile);
    let radius = cfg.neighborhood_radius;

    // Separable max filter: first slide the window across time for every
    // bin, then across frequency for every time, for O(F*T) total cost
    // instead of O(F*T*radius^2).
    let mut pass1 = vec![vec![0.0f32; t_len]; f_len];
    for f in 0..f_len {
        let row: Vec<f32> = (0..t_len).map(|t| spec.magnitude(t, f)).collect();
        let maxed = sliding_max(&row, radius);
        pass1[f] = maxed;
    }

    let mut neighborhood_max = vec![vec![0.0f32; f_len]; t_len];
    for t in 0..t_len {
        let col: Vec<f32> = (0..f_len).map(|f| pass1[f][t]).collect();
        let maxed = sliding_max(&col, radius);
        for f in 0..f_len {
            neighborhood_max[t][f] = maxed[f];
        }
    }

    let mut peaks = Vec::new();
    for t in 0..t_len {
        for f in 0..f_len {
            let mag = spec.magnitude(t, f);
            let nmax = neighborhood_max[t][f];
            if nmax > 0.0 && mag == nmax && mag as f64 >= threshold {
                peaks.push(Peak { f, t });
            }
        }
    }
    peaks
}

/// 1-D sliding window maximum with window radius `radius` (window width
/// `2*radius+1`), implemented with a monotonic deque so the whole pass is
/// O(n) rather than O(n*radius).
fn sliding_max(values: &[f32], radius: usize) -> Vec<f32> {
    let n = values.len();
    let mut out = vec![0.0f32; n];
    let mut deque: std::collections::VecDeque<usize> = std::collections::VecDeque::new();

    let window = 2 * radius + 1;
    // We need, for each output index i, the max over [i-radius, i+radius].
    // Process with a trailing window of width `window` ending at i+radius.
    for i in 0..n + radius {
        if i < n {
            while let Some(&back) = deque.back() {
                if values[back] <= values[i] {
                    deque.pop_back();
                } else {
                    break;
                }
            }
            deque.push_back(i);
        }
        if i >= window {
            if let Some(&front) = deque.front() {
                if front + window <= i {
                    deque.pop_front();
                }
            }
        }
        if i >= radius {
            let center = i - radius;
            if let Some(&front) = deque.front() {
                out[center] = values[front];
            }
        }
    }
    out
}

fn percentile(spec: &Spectrogram, pct: f64) -> f64 {
    let mut all: Vec<f64> = spec
        .frames
        .iter()
        .flat_map(|row| row.iter().map(|&v| v as f64))
        .collect();
    if all.is_empty() {
        return 0.0;
    }
    all.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let rank = (pct / 100.0) * (all.len() as f64 - 1.0);
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        all[lo]
    } else {
        let frac = rank - lo as f64;
        all[lo] + (all[hi] - all[lo]) * frac
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_spectrogram(t: usize, f: usize, value: f32) -> Spectrogram {
        Spectrogram {
            frames: vec![vec![value; f]; t],
        }
    }

    #[test]
    fn silent_spectrogram_yields_no_peaks() {
        let cfg = Config::from_env();
        let spec = flat_spectrogram(50, 50, 0.0);
        let peaks = pick_peaks(&spec, &cfg);
        assert!(peaks.is_empty());
    }

    #[test]
    fn single_spike_is_detected() {
        let cfg = Config::from_env();
        let mut spec = flat_spectrogram(50, 50, 0.1);
        spec.frames[25][25] = 10.0;
        let peaks = pick_peaks(&spec, &cfg);
        assert!(peaks.contains(&Peak { f: 25, t: 25 }));
    }

    #[test]
    fn peaks_are_ordered_by_time_then_frequency() {
        let cfg = Config::from_env();
        let mut spec = flat_spectrogram(60, 60, 0.1);
        spec.frames[10][40] = 10.0;
        spec.frames[10][5] = 9.0;
        spec.frames[30][20] = 8.0;
        let peaks = pick_peaks(&spec, &cfg);
        for w in peaks.windows(2) {
            assert!(
                w[0].t < w[1].t || (w[0].t == w[1].t && w[0].f <= w[1].f),
                "peaks not ordered: {:?} before {:?}",
                w[0],
                w[1]
            );
        }
    }

    #[test]
    fn two_equal_spikes_far_apart_both_survive() {
        let cfg = Config::from_env();
        let mut spec = flat_spectrogram(80, 80, 0.1);
        spec.frames[5][5] = 10.0;
        spec.frames[70][70] = 10.0;
        let peaks = pick_peaks(&spec, &cfg);
        assert!(peaks.contains(&Peak { f: 5, t: 5 }));
        assert!(peaks.contains(&Peak { f: 70, t: 70 }));
    }
}
