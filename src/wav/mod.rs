mod convert;
mod wav;

use std::path::Path;

use crate::error::EngineError;

pub use convert::{convert_to_wav, read_tags};
pub use wav::{read_wav_samples, write_wav_samples};

/// Loads `path` as mono `f32` samples regardless of input container: WAV is
/// read directly, anything else goes through `convert_to_wav` first. Shared
/// by the CLI and HTTP entry points so neither has to special-case the
/// extension itself.
pub fn load_samples(path: &str) -> Result<(Vec<f32>, u32), EngineError> {
    let ext = Path::new(path)
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase();
    if ext == "wav" {
        read_wav_samples(Path::new(path))
    } else {
        let wav_path = convert_to_wav(path, 1)?;
        read_wav_samples(Path::new(&wav_path))
    }
}
