use std::fs;
use std::path::Path;
use std::process;

use colored::Colorize;
use slog::{error, info};
use walkdir::WalkDir;

use crate::config::Config;
use crate::db::{self, LandmarkIndex};
use crate::download;
use crate::error::EngineError;
use crate::shazam;
use crate::utils;
use crate::wav;

const SAVE_EXTENSIONS: [&str; 5] = ["wav", "mp3", "flac", "m4a", "ogg"];

/// `find <path>`: identifies a query clip against the index and prints the
/// prediction, or "No match found." when nothing clears the vote threshold.
pub fn find(path: &str, cfg: &Config) {
    let logger = utils::get_logger();

    if !Path::new(path).exists() {
        println!("{}", format!("Error: file '{}' does not exist", path).yellow());
        process::exit(1);
    }

    let index = match db::open_index(cfg) {
        Ok(i) => i,
        Err(e) => {
            error!(logger, "failed to open landmark index"; "error" => e.to_string());
            println!("{}", format!("Error: {}", e).yellow());
            process::exit(1);
        }
    };

    let (samples, sample_rate) = match wav::load_samples(path) {
        Ok(v) => v,
        Err(e) => {
            println!("{}", format!("Error reading audio: {}", e).yellow());
            process::exit(1);
        }
    };

    let start = std::time::Instant::now();
    let result = match shazam::identify(&samples, sample_rate, index.as_ref(), cfg) {
        Ok(r) => r,
        Err(e) => {
            error!(logger, "identification failed"; "error" => e.to_string());
            println!("{}", format!("Error: {}", e).yellow());
            process::exit(1);
        }
    };
    let elapsed = start.elapsed();

    match result.song_id {
        Some(song_id) => {
            println!(
                "Prediction: {} by {} (song_id: {}, score: {})",
                result.title, result.artist, song_id, result.score
            );
        }
        None => println!("No match found."),
    }
    println!("Search took: {:?}", elapsed);
}

/// `download <spotify_url>`: resolves a Spotify track/playlist/album url,
/// fetches matching audio via YouTube, transcodes and ingests each track.
pub fn download(spotify_url: &str, cfg: &Config) {
    let logger = utils::get_logger();

    let index = match db::open_index(cfg) {
        Ok(i) => i,
        Err(e) => {
            error!(logger, "failed to open landmark index"; "error" => e.to_string());
            println!("{}", format!("Error: {}", e).yellow());
            process::exit(1);
        }
    };

    let songs_dir = cfg.songs_dir.to_string_lossy().into_owned();
    if let Err(e) = utils::create_folder(&songs_dir) {
        error!(logger, "failed to create songs directory"; "path" => songs_dir.as_str(), "error" => e.to_string());
    }

    let result = if spotify_url.contains("album") {
        download::dl_album(spotify_url, &songs_dir, cfg, index.as_ref())
    } else if spotify_url.contains("playlist") {
        download::dl_playlist(spotify_url, &songs_dir, cfg, index.as_ref())
    } else if spotify_url.contains("track") {
        download::dl_single_track(spotify_url, &songs_dir, cfg, index.as_ref())
    } else {
        println!("{}", "Error: URL must reference a Spotify track, album, or playlist".yellow());
        process::exit(1);
    };

    match result {
        Ok(count) => println!("Downloaded and ingested {} track(s)", count),
        Err(e) => {
            println!("{}", format!("Error: {}", e).yellow());
            process::exit(1);
        }
    }
}

/// `save [-f|--force] <path_or_dir>`: fingerprints local audio file(s).
/// Directories are walked recursively; non-audio files are skipped.
///
/// Without `--force`, a `DuplicatePath` aborts the whole invocation
/// non-zero, matching §7's CLI policy. With `--force`, a duplicate within a
/// directory walk is logged and skipped so the rest of the batch proceeds.
pub fn save(path: &str, force: bool, cfg: &Config) {
    let logger = utils::get_logger();

    let index = match db::open_index(cfg) {
        Ok(i) => i,
        Err(e) => {
            error!(logger, "failed to open landmark index"; "error" => e.to_string());
            println!("{}", format!("Error: {}", e).yellow());
            process::exit(1);
        }
    };

    let metadata = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) => {
            println!("{}", format!("Error stating path '{}': {}", path, e).yellow());
            process::exit(1);
        }
    };

    let mut saved = 0;
    let mut failed = 0;

    if metadata.is_dir() {
        for entry in WalkDir::new(path).into_iter().filter_map(Result::ok) {
            if !entry.file_type().is_file() {
                continue;
            }
            let ext = entry
                .path()
                .extension()
                .and_then(|s| s.to_str())
                .unwrap_or("")
                .to_lowercase();
            if !SAVE_EXTENSIONS.contains(&ext.as_str()) {
                continue;
            }
            match save_one(entry.path(), cfg, index.as_ref()) {
                Ok(song_id) => {
                    println!("Saved {} (song_id: {})", entry.path().display(), song_id);
                    saved += 1;
                }
                Err(EngineError::DuplicatePath(p)) if force => {
                    info!(logger, "song already present, skipping"; "path" => p.as_str());
                }
                Err(e) => {
                    println!("{}", format!("Error saving {}: {}", entry.path().display(), e).yellow());
                    failed += 1;
                    if !force {
                        process::exit(1);
                    }
                }
            }
        }
        println!("Saved {} song(s), {} failed", saved, failed);
        if failed > 0 {
            process::exit(1);
        }
    } else {
        match save_one(Path::new(path), cfg, index.as_ref()) {
            Ok(song_id) => println!("Saved {} (song_id: {})", path, song_id),
            Err(e) => {
                println!("{}", format!("Error: {}", e).yellow());
                process::exit(1);
            }
        }
    }
}

fn save_one(file_path: &Path, cfg: &Config, index: &dyn LandmarkIndex) -> Result<u64, EngineError> {
    let input = file_path
        .to_str()
        .ok_or_else(|| EngineError::AudioLoad("path is not valid UTF-8".into()))?;

    let (probed_title, probed_artist) = wav::read_tags(input);
    let title = probed_title.unwrap_or_else(|| {
        file_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Unknown Title")
            .to_string()
    });
    let artist = probed_artist.unwrap_or_else(|| "Unknown Artist".to_string());

    let (song_id, _hashes, _wav_path) =
        download::process_and_save_song(input, &title, &artist, None, None, index, cfg)?;
    Ok(song_id)
}

/// `erase [db|all]`: deletes the landmark index; `all` also empties the
/// songs and recordings directories.
pub fn erase(scope: &str, cfg: &Config) {
    let logger = utils::get_logger();

    let index = match db::open_index(cfg) {
        Ok(i) => i,
        Err(e) => {
            error!(logger, "failed to open landmark index"; "error" => e.to_string());
            println!("{}", format!("Error: {}", e).yellow());
            process::exit(1);
        }
    };

    if let Err(e) = index.erase_all() {
        error!(logger, "failed to erase landmark index"; "error" => e.to_string());
        println!("{}", format!("Error: {}", e).yellow());
        process::exit(1);
    }
    info!(logger, "landmark index erased");

    if scope == "all" {
        for dir in [&cfg.songs_dir, &cfg.recordings_dir] {
            if let Err(e) = fs::remove_dir_all(dir) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    error!(logger, "failed to empty directory"; "path" => dir.display().to_string(), "error" => e.to_string());
                }
            }
            if let Err(e) = fs::create_dir_all(dir) {
                error!(logger, "failed to recreate directory"; "path" => dir.display().to_string(), "error" => e.to_string());
            }
        }
        info!(logger, "songs and recordings directories emptied");
    }

    println!("Erase complete");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn save_one_ingests_a_generated_tone() {
        let cfg = Config::from_env();
        let dir = tempdir().unwrap();
        let db_index = crate::db::SqliteIndex::open(&dir.path().join("t.db"), 1).unwrap();

        let samples: Vec<f32> = (0..cfg.sample_rate as usize * 3)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / cfg.sample_rate as f32).sin())
            .collect();
        let wav_path = dir.path().join("tone.wav");
        wav::write_wav_samples(&wav_path, &samples, cfg.sample_rate).unwrap();

        let song_id = save_one(&wav_path, &cfg, &db_index).unwrap();
        let song = db_index.get_song(song_id).unwrap().unwrap();
        assert_eq!(song.title, "tone");
    }
}
