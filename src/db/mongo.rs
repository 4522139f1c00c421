use mongodb::bson::{doc, Document};
use mongodb::sync::{Client, Collection};
use mongodb::options::IndexOptions;
use mongodb::IndexModel;

use crate::db::client::LandmarkIndex;
use crate::error::EngineError;
use crate::models::Song;

/// MongoDB-backed Landmark Index, feature-gated behind `mongodb`. Uses the
/// driver's synchronous API directly rather than spinning a Tokio runtime per
/// call, since `mongodb`'s `sync` feature gives a blocking client for free.
pub struct MongoIndex {
    client: Client,
    db_name: String,
}

impl MongoIndex {
    pub fn open(uri: &str, db_name: &str) -> Result<Self, EngineError> {
        let client = Client::with_uri_str(uri)
            .map_err(|e| EngineError::Index(format!("mongo connect: {}", e)))?;
        let index = MongoIndex {
            client,
            db_name: db_name.to_string(),
        };
        index.ensure_indexes()?;
        Ok(index)
    }

    fn songs(&self) -> Collection<Document> {
        self.client.database(&self.db_name).collection("songs")
    }

    fn landmarks(&self) -> Collection<Document> {
        self.client.database(&self.db_name).collection("landmarks")
    }

    fn ensure_indexes(&self) -> Result<(), EngineError> {
        let path_index = IndexModel::builder()
            .keys(doc! { "path": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.songs()
            .create_index(path_index)
            .run()
            .map_err(|e| EngineError::Index(format!("create path index: {}", e)))?;

        let hash_index = IndexModel::builder().keys(doc! { "hash": 1 }).build();
        self.landmarks()
            .create_index(hash_index)
            .run()
            .map_err(|e| EngineError::Index(format!("create hash index: {}", e)))?;
        Ok(())
    }
}

impl LandmarkIndex for MongoIndex {
    fn create_song(
        &self,
        title: &str,
        artist: &str,
        source_path: &str,
        spotify_url: Option<&str>,
        youtube_url: Option<&str>,
    ) -> Result<u64, EngineError> {
        let counters = self.client.database(&self.db_name).collection::<Document>("counters");
        let result = counters
            .find_one_and_update(
                doc! { "_id": "song_id" },
                doc! { "$inc": { "seq": 1i64 } },
            )
            .upsert(true)
            .return_document(mongodb::options::ReturnDocument::After)
            .run()
            .map_err(|e| EngineError::Index(format!("allocate song id: {}", e)))?;
        let song_id = result
            .and_then(|d| d.get_i64("seq").ok())
            .unwrap_or(1) as u64;

        let doc = doc! {
            "_id": song_id as i64,
            "title": title,
            "artist": artist,
            "path": source_path,
            "spotify_url": spotify_url,
            "youtube_url": youtube_url,
        };

        match self.songs().insert_one(doc).run() {
            Ok(_) => Ok(song_id),
            Err(e) => {
                if let mongodb::error::ErrorKind::Write(mongodb::error::WriteFailure::WriteError(ref w)) = *e.kind {
                    if w.code == 11000 {
                        return Err(EngineError::DuplicatePath(source_path.to_string()));
                    }
                }
                Err(EngineError::Index(format!("insert song: {}", e)))
            }
        }
    }

    fn insert_landmarks(&self, song_id: u64, landmarks: &[(String, i64)]) -> Result<(), EngineError> {
        if landmarks.is_empty() {
            return Ok(());
        }
        let docs: Vec<Document> = landmarks
            .iter()
            .map(|(hash, anchor_time)| {
                doc! {
                    "song_id": song_id as i64,
                    "hash": hash,
                    "anchor_time": anchor_time,
                }
            })
            .collect();
        self.landmarks()
            .insert_many(docs)
            .run()
            .map_err(|e| EngineError::Index(format!("insert landmarks: {}", e)))?;
        Ok(())
    }

    fn lookup(&self, hash: &str) -> Result<Vec<(u64, i64)>, EngineError> {
        let cursor = self
            .landmarks()
            .find(doc! { "hash": hash })
            .run()
            .map_err(|e| EngineError::Index(format!("lookup: {}", e)))?;
        let mut out = Vec::new();
        for doc in cursor {
            let doc = doc.map_err(|e| EngineError::Index(format!("lookup cursor: {}", e)))?;
            let song_id = doc.get_i64("song_id").unwrap_or(0) as u64;
            let anchor_time = doc.get_i64("anchor_time").unwrap_or(0);
            out.push((song_id, anchor_time));
        }
        Ok(out)
    }

    fn get_song(&self, song_id: u64) -> Result<Option<Song>, EngineError> {
        let result = self
            .songs()
            .find_one(doc! { "_id": song_id as i64 })
            .run()
            .map_err(|e| EngineError::Index(format!("get_song: {}", e)))?;
        Ok(result.map(|doc| Song {
            id: song_id,
            title: doc.get_str("title").unwrap_or_default().to_string(),
            artist: doc.get_str("artist").unwrap_or_default().to_string(),
            source_path: doc.get_str("path").unwrap_or_default().to_string(),
            spotify_url: doc.get_str("spotify_url").ok().map(str::to_string),
            youtube_url: doc.get_str("youtube_url").ok().map(str::to_string),
        }))
    }

    fn erase_all(&self) -> Result<(), EngineError> {
        self.landmarks()
            .delete_many(doc! {})
            .run()
            .map_err(|e| EngineError::Index(format!("erase landmarks: {}", e)))?;
        self.songs()
            .delete_many(doc! {})
            .run()
            .map_err(|e| EngineError::Index(format!("erase songs: {}", e)))?;
        Ok(())
    }
}
