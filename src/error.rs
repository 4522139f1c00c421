use std::time::Duration;

use thiserror::Error;

/// Typed error taxonomy for the fingerprinting engine and its collaborators.
///
/// `EmptySpectrogram` and `LookupMiss` are deliberately absent: per the error
/// handling policy those are ordinary outcomes (an empty peak/vote set), never
/// an `Err`.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to load audio: {0}")]
    AudioLoad(String),

    #[error("decode timed out after {0:?}")]
    DecodeTimeout(Duration),

    #[error("duplicate source path: {0}")]
    DuplicatePath(String),

    #[error("landmark index error: {0}")]
    Index(String),

    #[error("external API error: {0}")]
    ExternalApi(String),

    #[error("operation cancelled")]
    Cancelled,
}

impl From<rusqlite::Error> for EngineError {
    fn from(e: rusqlite::Error) -> Self {
        EngineError::Index(e.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::AudioLoad(e.to_string())
    }
}

impl From<hound::Error> for EngineError {
    fn from(e: hound::Error) -> Self {
        EngineError::AudioLoad(e.to_string())
    }
}
