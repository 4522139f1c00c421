use crate::error::EngineError;
use crate::models::Song;

/// Persistent mapping `hash -> [(song_id, anchor_time)]`, plus a Song Record
/// table. Point lookup must be sublinear in corpus size; writes are
/// transactional per call, reads are safe concurrently with writes.
pub trait LandmarkIndex: Send + Sync {
    /// Inserts a Song Record and returns its assigned id. Fails with
    /// `DuplicatePath` if `source_path` is already present.
    fn create_song(
        &self,
        title: &str,
        artist: &str,
        source_path: &str,
        spotify_url: Option<&str>,
        youtube_url: Option<&str>,
    ) -> Result<u64, EngineError>;

    /// Bulk-inserts landmarks for `song_id`. Either all become visible to
    /// subsequent lookups or none do.
    fn insert_landmarks(&self, song_id: u64, landmarks: &[(String, i64)]) -> Result<(), EngineError>;

    /// Returns every stored occurrence of `hash`. Order is unspecified.
    fn lookup(&self, hash: &str) -> Result<Vec<(u64, i64)>, EngineError>;

    /// Returns the Song Record for `song_id`, or `None` if absent.
    fn get_song(&self, song_id: u64) -> Result<Option<Song>, EngineError>;

    /// Deletes the entire store (songs and landmarks).
    fn erase_all(&self) -> Result<(), EngineError>;
}
