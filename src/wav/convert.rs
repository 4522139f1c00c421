use std::fs;
use std::path::Path;
use std::process::Command;

use serde_json::Value;

use crate::error::EngineError;

/// Transcoder collaborator (§6): shells out to `ffmpeg` to decode an
/// arbitrary input file into a mono PCM WAV at `channels` channels. Out of
/// the engine's scope per §1 — this is glue, not part of the fingerprinting
/// core — but `save`/`find`/`download` all need a concrete implementation to
/// run end to end.
pub fn convert_to_wav(input_file_path: &str, channels: i32) -> Result<String, EngineError> {
    if !Path::new(input_file_path).exists() {
        return Err(EngineError::AudioLoad(format!(
            "input file does not exist: {}",
            input_file_path
        )));
    }
    let channels = if (1..=2).contains(&channels) { channels } else { 1 };

    let input_path = Path::new(input_file_path);
    let file_ext = input_path.extension().and_then(|s| s.to_str()).unwrap_or("");
    let output_file = format!(
        "{}.wav",
        input_file_path.trim_end_matches(&format!(".{}", file_ext))
    );
    let tmp_file = {
        let mut tmp = input_path.with_file_name(format!(
            "tmp_{}",
            input_path.file_name().unwrap().to_string_lossy()
        ));
        tmp.set_extension("wav");
        tmp
    };

    let ffmpeg_output = Command::new("ffmpeg")
        .args(["-y", "-i", input_file_path, "-c", "pcm_s16le", "-ar", "22050", "-ac"])
        .arg(channels.to_string())
        .arg(&tmp_file)
        .output()
        .map_err(|e| EngineError::AudioLoad(format!("failed to spawn ffmpeg: {}", e)))?;

    if !ffmpeg_output.status.success() {
        let _ = fs::remove_file(&tmp_file);
        return Err(EngineError::AudioLoad(format!(
            "ffmpeg exited with {}: {}",
            ffmpeg_output.status,
            String::from_utf8_lossy(&ffmpeg_output.stderr)
        )));
    }
    if !tmp_file.exists() || fs::metadata(&tmp_file)?.len() == 0 {
        return Err(EngineError::AudioLoad("ffmpeg produced no output".into()));
    }

    fs::rename(&tmp_file, &output_file)?;
    Ok(output_file)
}

/// Best-effort title/artist lookup via `ffprobe`'s embedded format tags.
/// Returns `(None, None)` rather than an error when ffprobe is missing or the
/// file carries no tags; this is metadata enrichment for `save`'s output, not
/// part of the ingestion contract.
pub fn read_tags(input_file_path: &str) -> (Option<String>, Option<String>) {
    let output = match Command::new("ffprobe")
        .args(["-v", "quiet", "-print_format", "json", "-show_format", input_file_path])
        .output()
    {
        Ok(o) if o.status.success() => o,
        _ => return (None, None),
    };
    let Ok(parsed) = serde_json::from_slice::<Value>(&output.stdout) else {
        return (None, None);
    };
    let tags = parsed.pointer("/format/tags");
    let get = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| tags.and_then(|t| t.get(k)).and_then(|v| v.as_str()))
            .map(str::to_string)
    };
    (get(&["title", "TITLE"]), get(&["artist", "ARTIST"]))
}
