use std::fs;
use std::path::Path;
use std::process::Command;

use slog::{error, info};

use crate::config::Config;
use crate::db::LandmarkIndex;
use crate::download::spotify::{album_info, playlist_info, track_info};
use crate::download::utils::correct_filename;
use crate::download::youtube::get_youtube_id;
use crate::error::EngineError;
use crate::models::Track;
use crate::utils;
use crate::wav;

/// Result of resolving, downloading and ingesting a single Spotify track.
/// Returned to API callers that need more than a bare success count.
#[derive(Debug, Clone)]
pub struct DownloadedTrack {
    pub song_id: u64,
    pub title: String,
    pub artist: String,
    pub hashes: usize,
    pub wav_path: String,
    pub youtube_url: String,
}

/// Resolves a single Spotify track URL, downloads its audio, and ingests it.
/// Returns the full result; used by `/api/download` where song_id and paths
/// matter, not just a count.
pub fn dl_single_track_info(
    url: &str,
    save_path: &str,
    cfg: &Config,
    index: &dyn LandmarkIndex,
) -> Result<DownloadedTrack, EngineError> {
    let track = track_info(url)?;
    download_and_ingest(&track, save_path, cfg, index)
}

/// CLI-facing variant of [`dl_single_track_info`]: a track already present in
/// the index is not an error, just zero tracks downloaded.
pub fn dl_single_track(url: &str, save_path: &str, cfg: &Config, index: &dyn LandmarkIndex) -> Result<i32, EngineError> {
    match dl_single_track_info(url, save_path, cfg, index) {
        Ok(_) => Ok(1),
        Err(EngineError::DuplicatePath(_)) => Ok(0),
        Err(e) => Err(e),
    }
}

/// Resolves every track in a Spotify playlist and ingests each.
pub fn dl_playlist(url: &str, save_path: &str, cfg: &Config, index: &dyn LandmarkIndex) -> Result<i32, EngineError> {
    let tracks = playlist_info(url)?;
    dl_tracks(&tracks, save_path, cfg, index)
}

/// Resolves every track on a Spotify album and ingests each.
pub fn dl_album(url: &str, save_path: &str, cfg: &Config, index: &dyn LandmarkIndex) -> Result<i32, EngineError> {
    let tracks = album_info(url)?;
    dl_tracks(&tracks, save_path, cfg, index)
}

/// Downloads and ingests every track in `tracks`. A track already present in
/// the index surfaces as `DuplicatePath` from `create_song`; that case is
/// logged and skipped rather than treated as a failure of the batch.
fn dl_tracks(tracks: &[Track], path: &str, cfg: &Config, index: &dyn LandmarkIndex) -> Result<i32, EngineError> {
    let logger = utils::get_logger();
    let mut downloaded = 0;

    for track in tracks {
        match download_and_ingest(track, path, cfg, index) {
            Ok(d) => {
                info!(logger, "track ingested"; "title" => d.title.as_str(), "artist" => d.artist.as_str(), "song_id" => d.song_id, "hashes" => d.hashes as u64);
                downloaded += 1;
            }
            Err(EngineError::DuplicatePath(_)) => {
                info!(logger, "track already present, skipping"; "title" => track.title.as_str(), "artist" => track.artist.as_str());
            }
            Err(e) => {
                error!(logger, "failed to process and save track"; "title" => track.title.as_str(), "artist" => track.artist.as_str(), "error" => e.to_string());
            }
        }
    }

    Ok(downloaded)
}

/// Resolves `track`'s audio on YouTube, downloads, transcodes, fingerprints
/// and ingests it in one pass. Shared by the batch path (`dl_tracks`) and the
/// detail-returning single-track path the HTTP API uses.
fn download_and_ingest(track: &Track, path: &str, cfg: &Config, index: &dyn LandmarkIndex) -> Result<DownloadedTrack, EngineError> {
    let logger = utils::get_logger();
    let (title, artist) = correct_filename(&track.title, &track.artist);
    let file_stem = format!("{} - {}", title, artist);
    let m4a_path = Path::new(path).join(format!("{}.m4a", file_stem));

    let youtube_id = get_youtube_id(track)?;
    fetch_audio(&youtube_id, &m4a_path)?;
    let youtube_url = format!("https://youtube.com/watch?v={}", youtube_id);

    let result = process_and_save_song(
        m4a_path.to_string_lossy().as_ref(),
        &title,
        &artist,
        None,
        Some(&youtube_url),
        index,
        cfg,
    );
    let _ = utils::delete_file(&m4a_path.to_string_lossy());
    let (song_id, hashes, wav_path) = result?;

    if let Err(e) = add_tags(&wav_path, track) {
        error!(logger, "failed to tag wav file"; "path" => wav_path.as_str(), "error" => e.to_string());
    }

    Ok(DownloadedTrack {
        song_id,
        title,
        artist,
        hashes,
        wav_path,
        youtube_url,
    })
}

/// Retrieves the audio stream for `youtube_id` via `yt-dlp`, writing it to
/// `output_path`.
fn fetch_audio(youtube_id: &str, output_path: &Path) -> Result<(), EngineError> {
    let url = format!("https://youtube.com/watch?v={}", youtube_id);
    let status = Command::new("yt-dlp")
        .arg("-f")
        .arg("bestaudio")
        .arg("-o")
        .arg(output_path)
        .arg(&url)
        .status()
        .map_err(|e| EngineError::ExternalApi(format!("failed to spawn yt-dlp: {}", e)))?;

    if !status.success() {
        return Err(EngineError::ExternalApi(format!("yt-dlp exited with {}", status)));
    }
    if !output_path.exists() || fs::metadata(output_path)?.len() == 0 {
        return Err(EngineError::ExternalApi("yt-dlp produced no output".into()));
    }
    Ok(())
}

/// Stamps Spotify-resolved metadata onto the downloaded WAV via `ffmpeg`,
/// writing through a sibling temp file since ffmpeg cannot edit in place.
fn add_tags(file: &str, track: &Track) -> Result<(), EngineError> {
    let temp_file = match file.rfind(".wav") {
        Some(idx) => format!("{}.tagged.wav", &file[..idx]),
        None => return Err(EngineError::AudioLoad(format!("not a wav path: {}", file))),
    };

    let output = Command::new("ffmpeg")
        .args([
            "-y",
            "-i", file,
            "-c", "copy",
            "-metadata", &format!("album_artist={}", track.artist),
            "-metadata", &format!("title={}", track.title),
            "-metadata", &format!("artist={}", track.artist),
            "-metadata", &format!("album={}", track.album),
            &temp_file,
        ])
        .output()
        .map_err(|e| EngineError::AudioLoad(format!("failed to spawn ffmpeg: {}", e)))?;

    if !output.status.success() {
        return Err(EngineError::AudioLoad(format!(
            "ffmpeg exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr)
        )));
    }

    fs::rename(&temp_file, file)?;
    Ok(())
}

/// Transcodes `input_path` to WAV, fingerprints it, and stores the result in
/// `index`. Shared by the `download` and `save` command paths. Returns the
/// assigned song id, landmark count, and the canonical WAV path.
pub fn process_and_save_song(
    input_path: &str,
    title: &str,
    artist: &str,
    spotify_url: Option<&str>,
    youtube_url: Option<&str>,
    index: &dyn LandmarkIndex,
    cfg: &Config,
) -> Result<(u64, usize, String), EngineError> {
    let wav_path = wav::convert_to_wav(input_path, 1)?;
    let (samples, sample_rate) = wav::read_wav_samples(Path::new(&wav_path))?;
    let (song_id, hashes) = crate::shazam::ingest_song(
        &samples,
        sample_rate,
        title,
        artist,
        &wav_path,
        spotify_url,
        youtube_url,
        index,
        cfg,
    )?;
    Ok((song_id, hashes, wav_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteIndex;
    use tempfile::tempdir;

    #[test]
    fn dl_tracks_on_empty_list_downloads_nothing() {
        let cfg = Config::from_env();
        let dir = tempdir().unwrap();
        let index = SqliteIndex::open(&dir.path().join("t.db"), 1).unwrap();
        let total = dl_tracks(&[], dir.path().to_str().unwrap(), &cfg, &index).unwrap();
        assert_eq!(total, 0);
    }
}
