use crate::config::Config;
use crate::db::LandmarkIndex;
use crate::error::EngineError;
use crate::shazam::hasher::hash_peaks;
use crate::shazam::peaks::pick_peaks;
use crate::shazam::spectrogram::build_spectrogram;

/// Runs the ingestion half of the data flow in §2: spectrogram -> peaks ->
/// landmarks -> index insert. Creates the Song Record and stores every
/// landmark in one transactional call; on `insert_landmarks` failure the
/// caller is left with a Song Record but no landmarks, matching the bulk
/// insert's own atomicity guarantee rather than rolling back `create_song`
/// (the index has no cross-table transaction to do so).
///
/// Returns the assigned `song_id` and the number of landmarks stored.
pub fn ingest_song(
    samples: &[f32],
    sample_rate: u32,
    title: &str,
    artist: &str,
    source_path: &str,
    spotify_url: Option<&str>,
    youtube_url: Option<&str>,
    index: &dyn LandmarkIndex,
    cfg: &Config,
) -> Result<(u64, usize), EngineError> {
    let spectrogram = build_spectrogram(samples, sample_rate, cfg)?;
    let peaks = pick_peaks(&spectrogram, cfg);
    let landmarks = hash_peaks(&peaks, cfg);

    let song_id = index.create_song(title, artist, source_path, spotify_url, youtube_url)?;
    index.insert_landmarks(song_id, &landmarks)?;
    Ok((song_id, landmarks.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteIndex;
    use tempfile::tempdir;

    fn tone(freq: f32, sample_rate: u32, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn ingest_then_lookup_round_trips() {
        let cfg = Config::from_env();
        let dir = tempdir().unwrap();
        let index = SqliteIndex::open(&dir.path().join("t.db"), 1).unwrap();
        let samples = tone(440.0, cfg.sample_rate, cfg.sample_rate as usize * 3);

        let (song_id, count) = ingest_song(
            &samples,
            cfg.sample_rate,
            "Title",
            "Artist",
            "songs/track.wav",
            None,
            None,
            &index,
            &cfg,
        )
        .unwrap();

        assert!(count > 0);
        let song = index.get_song(song_id).unwrap().unwrap();
        assert_eq!(song.title, "Title");
    }

    #[test]
    fn duplicate_source_path_fails_without_inserting_landmarks() {
        let cfg = Config::from_env();
        let dir = tempdir().unwrap();
        let index = SqliteIndex::open(&dir.path().join("t.db"), 1).unwrap();
        let samples = tone(220.0, cfg.sample_rate, cfg.sample_rate as usize * 3);

        ingest_song(
            &samples,
            cfg.sample_rate,
            "Title",
            "Artist",
            "songs/dup.wav",
            None,
            None,
            &index,
            &cfg,
        )
        .unwrap();

        let err = ingest_song(
            &samples,
            cfg.sample_rate,
            "Other",
            "Other",
            "songs/dup.wav",
            None,
            None,
            &index,
            &cfg,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::DuplicatePath(_)));
    }
}
