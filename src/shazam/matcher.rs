use std::collections::HashMap;

use crate::config::Config;
use crate::db::LandmarkIndex;
use crate::error::EngineError;
use crate::shazam::hasher::hash_peaks;
use crate::shazam::peaks::pick_peaks;
use crate::shazam::spectrogram::build_spectrogram;

/// Result of matching a query clip against the index. `song_id` is `None`
/// when nothing scored any votes; `score` is the winning vote count (zero on
/// no-match).
#[derive(Debug, Clone, PartialEq)]
pub struct Identification {
    pub song_id: Option<u64>,
    pub title: String,
    pub artist: String,
    pub score: u64,
    pub spotify_url: Option<String>,
    pub youtube_url: Option<String>,
}

impl Identification {
    fn no_match() -> Self {
        Identification {
            song_id: None,
            title: "No match".to_string(),
            artist: String::new(),
            score: 0,
            spotify_url: None,
            youtube_url: None,
        }
    }
}

/// Runs the full query pipeline (spectrogram -> peaks -> hashes), looks up
/// every hash in `index`, and returns the highest-voted song.
///
/// Votes are accumulated per `(song_id, delta)` where `delta = t_s - t_q`,
/// then summed across every delta bucket for a given song — not just its
/// best bucket — before taking the argmax. Ties break to the smallest
/// song_id.
pub fn identify(
    samples: &[f32],
    sample_rate: u32,
    index: &dyn LandmarkIndex,
    cfg: &Config,
) -> Result<Identification, EngineError> {
    let spectrogram = build_spectrogram(samples, sample_rate, cfg)?;
    let peaks = pick_peaks(&spectrogram, cfg);
    let query_hashes = hash_peaks(&peaks, cfg);

    if query_hashes.is_empty() {
        return Ok(Identification::no_match());
    }

    let mut votes: HashMap<(u64, i64), u64> = HashMap::new();
    for (hash, t_q) in &query_hashes {
        for (song_id, t_s) in index.lookup(hash)? {
            let delta = t_s - t_q;
            *votes.entry((song_id, delta)).or_insert(0) += 1;
        }
    }

    if votes.is_empty() {
        return Ok(Identification::no_match());
    }

    let mut per_song: HashMap<u64, u64> = HashMap::new();
    for ((song_id, _delta), count) in &votes {
        *per_song.entry(*song_id).or_insert(0) += count;
    }

    let best = per_song
        .into_iter()
        .fold(None, |best: Option<(u64, u64)>, (song_id, score)| match best {
            Some((best_id, best_score))
                if score < best_score || (score == best_score && song_id >= best_id) =>
            {
                Some((best_id, best_score))
            }
            _ => Some((song_id, score)),
        });

    let (song_id, score) = match best {
        Some(pair) => pair,
        None => return Ok(Identification::no_match()),
    };

    match index.get_song(song_id)? {
        Some(song) => Ok(Identification {
            song_id: Some(song.id),
            title: song.title,
            artist: song.artist,
            score,
            spotify_url: song.spotify_url,
            youtube_url: song.youtube_url,
        }),
        None => Ok(Identification::no_match()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteIndex;
    use crate::shazam::hasher::hash_peaks;
    use crate::shazam::peaks::pick_peaks;
    use crate::shazam::spectrogram::build_spectrogram;
    use tempfile::tempdir;

    fn open_test_index() -> (SqliteIndex, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        let index = SqliteIndex::open(&path, 1).unwrap();
        (index, dir)
    }

    fn tone(freq: f32, sample_rate: u32, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn silence_yields_no_match() {
        let cfg = Config::from_env();
        let (index, _dir) = open_test_index();
        let samples = vec![0.0f32; cfg.sample_rate as usize];
        let result = identify(&samples, cfg.sample_rate, &index, &cfg).unwrap();
        assert_eq!(result.song_id, None);
        assert_eq!(result.score, 0);
    }

    #[test]
    fn exact_clip_matches_ingested_song() {
        let cfg = Config::from_env();
        let (index, _dir) = open_test_index();
        let samples = tone(440.0, cfg.sample_rate, cfg.sample_rate as usize * 3);

        let spectrogram = build_spectrogram(&samples, cfg.sample_rate, &cfg).unwrap();
        let peaks = pick_peaks(&spectrogram, &cfg);
        let landmarks = hash_peaks(&peaks, &cfg);

        let song_id = index
            .create_song("Test Song", "Test Artist", "songs/test.wav", None, None)
            .unwrap();
        index.insert_landmarks(song_id, &landmarks).unwrap();

        let result = identify(&samples, cfg.sample_rate, &index, &cfg).unwrap();
        assert_eq!(result.song_id, Some(song_id));
        assert_eq!(result.title, "Test Song");
        assert!(result.score > 0);
    }

    #[test]
    fn query_against_empty_index_is_no_match() {
        let cfg = Config::from_env();
        let (index, _dir) = open_test_index();
        let samples = tone(880.0, cfg.sample_rate, cfg.sample_rate as usize * 2);
        let result = identify(&samples, cfg.sample_rate, &index, &cfg).unwrap();
        assert_eq!(result.song_id, None);
    }

    #[test]
    fn tie_breaks_to_smallest_song_id() {
        let cfg = Config::from_env();
        let (index, _dir) = open_test_index();
        let a = index
            .create_song("A", "Artist", "songs/a.wav", None, None)
            .unwrap();
        let b = index
            .create_song("B", "Artist", "songs/b.wav", None, None)
            .unwrap();
        // Identical vote weight at different deltas for both songs.
        index
            .insert_landmarks(a, &[("shared".to_string(), 0)])
            .unwrap();
        index
            .insert_landmarks(b, &[("shared".to_string(), 0)])
            .unwrap();

        let mut votes: HashMap<(u64, i64), u64> = HashMap::new();
        for (song_id, t_s) in index.lookup("shared").unwrap() {
            *votes.entry((song_id, t_s)).or_insert(0) += 1;
        }
        let mut per_song: HashMap<u64, u64> = HashMap::new();
        for ((song_id, _), count) in &votes {
            *per_song.entry(*song_id).or_insert(0) += count;
        }
        let winner = per_song
            .into_iter()
            .fold(None, |best: Option<(u64, u64)>, (song_id, score)| match best {
                Some((best_id, best_score))
                    if score < best_score || (score == best_score && song_id >= best_id) =>
                {
                    Some((best_id, best_score))
                }
                _ => Some((song_id, score)),
            })
            .unwrap();
        assert_eq!(winner.0, a.min(b));
    }
}
