use sha1::{Digest, Sha1};

use crate::config::Config;
use crate::shazam::peaks::Peak;

/// One (hash, anchor_time) landmark emitted from a peak pair.
pub type Landmark = (String, i64);

/// Combines peaks into target-zone pairs and emits landmark hashes.
///
/// Peaks are taken in the order they are handed in (the peak picker already
/// emits `(t asc, f asc)`, which this relies on to form forward-looking
/// fan-out windows). For each anchor peak at index `i`, targets at indices
/// `i+1 ..= i+FAN_VALUE` are paired with it; a pair is accepted when
/// `MIN_DT <= Δt <= MAX_DT`.
pub fn hash_peaks(peaks: &[Peak], cfg: &Config) -> Vec<Landmark> {
    let mut landmarks = Vec::new();
    for i in 0..peaks.len() {
        let anchor = peaks[i];
        for j in (i + 1)..peaks.len().min(i + 1 + cfg.fan_value) {
            let target = peaks[j];
            let dt = target.t as i64 - anchor.t as i64;
            if dt < cfg.min_dt || dt > cfg.max_dt {
                continue;
            }
            let hash = landmark_hash(anchor.f, target.f, dt);
            landmarks.push((hash, anchor.t as i64));
        }
    }
    landmarks
}

/// `SHA-1("f1|f2|Δt")`, encoded as a 40-character lowercase hex string. Must
/// stay bit-exact across implementations: the index format is part of the
/// wire contract, not an implementation detail.
pub fn landmark_hash(f1: usize, f2: usize, dt: i64) -> String {
    let input = format!("{}|{}|{}", f1, f2, dt);
    let mut hasher = Sha1::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_contract_vector() {
        assert_eq!(
            landmark_hash(100, 200, 15),
            "37118623dbc1d6f1bd3e46ca7a2992e9d922bd82"
        );
    }

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(landmark_hash(42, 99, 7), landmark_hash(42, 99, 7));
    }

    #[test]
    fn rejects_dt_outside_window() {
        let cfg = Config::from_env();
        let peaks = vec![
            Peak { f: 10, t: 0 },
            Peak { f: 20, t: 1000 }, // far outside MAX_DT
        ];
        let landmarks = hash_peaks(&peaks, &cfg);
        assert!(landmarks.is_empty());
    }

    #[test]
    fn respects_fan_out_limit() {
        let cfg = Config::from_env();
        // One anchor plus more than FAN_VALUE targets within the dt window.
        let mut peaks = vec![Peak { f: 0, t: 0 }];
        for t in 1..=(cfg.fan_value + 5) {
            peaks.push(Peak { f: t, t });
        }
        let landmarks = hash_peaks(&peaks, &cfg);
        let from_first_anchor = landmarks
            .iter()
            .filter(|(_, anchor_time)| *anchor_time == 0)
            .count();
        assert_eq!(from_first_anchor, cfg.fan_value);
    }

    #[test]
    fn empty_peak_set_yields_no_landmarks() {
        let cfg = Config::from_env();
        assert!(hash_peaks(&[], &cfg).is_empty());
    }
}
