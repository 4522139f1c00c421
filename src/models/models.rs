use serde::{Deserialize, Serialize};

/// A Song Record: the persisted metadata row a set of Landmarks points back
/// to. `id` is assigned by the Landmark Index at `create_song` time and never
/// reused.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Song {
    pub id: u64,
    pub title: String,
    pub artist: String,
    pub source_path: String,
    pub spotify_url: Option<String>,
    pub youtube_url: Option<String>,
}

/// Track metadata resolved from a Spotify track URL. Used only by the
/// `download` command and `/api/download` route; never touched by the core
/// engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration_ms: i64,
}
