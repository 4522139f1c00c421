use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};

use crate::db::client::LandmarkIndex;
use crate::error::EngineError;
use crate::models::Song;

/// Reference Landmark Index backend. A small fixed-size pool of SQLite
/// connections in WAL mode stands in for a proper connection pool crate (none
/// of the example ecosystem carries one); reads round-robin across the pool,
/// writes serialize at the SQLite file layer regardless of which connection
/// issues them.
pub struct SqliteIndex {
    pool: Vec<Mutex<Connection>>,
    next: AtomicUsize,
}

impl SqliteIndex {
    pub fn open(path: &Path, pool_size: usize) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let pool_size = pool_size.max(1);
        let mut pool = Vec::with_capacity(pool_size);
        for _ in 0..pool_size {
            let conn = Connection::open(path)?;
            conn.pragma_update(None, "journal_mode", "WAL")?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            pool.push(Mutex::new(conn));
        }

        {
            let conn = pool[0].lock().unwrap();
            create_tables(&conn)?;
        }

        Ok(SqliteIndex {
            pool,
            next: AtomicUsize::new(0),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        let i = self.next.fetch_add(1, Ordering::Relaxed) % self.pool.len();
        self.pool[i].lock().unwrap()
    }
}

fn create_tables(conn: &Connection) -> Result<(), EngineError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS songs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            artist TEXT NOT NULL,
            path TEXT NOT NULL UNIQUE,
            spotify_url TEXT,
            youtube_url TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS landmarks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            song_id INTEGER NOT NULL REFERENCES songs(id),
            hash TEXT NOT NULL,
            anchor_time INTEGER NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS landmarks_hash_idx ON landmarks(hash)",
        [],
    )?;
    Ok(())
}

impl LandmarkIndex for SqliteIndex {
    fn create_song(
        &self,
        title: &str,
        artist: &str,
        source_path: &str,
        spotify_url: Option<&str>,
        youtube_url: Option<&str>,
    ) -> Result<u64, EngineError> {
        let conn = self.conn();
        let res = conn.execute(
            "INSERT INTO songs (title, artist, path, spotify_url, youtube_url) VALUES (?, ?, ?, ?, ?)",
            params![title, artist, source_path, spotify_url, youtube_url],
        );
        match res {
            Ok(_) => Ok(conn.last_insert_rowid() as u64),
            Err(rusqlite::Error::SqliteFailure(ref e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(EngineError::DuplicatePath(source_path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn insert_landmarks(&self, song_id: u64, landmarks: &[(String, i64)]) -> Result<(), EngineError> {
        if landmarks.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO landmarks (song_id, hash, anchor_time) VALUES (?, ?, ?)",
            )?;
            for (hash, anchor_time) in landmarks {
                stmt.execute(params![song_id as i64, hash, anchor_time])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn lookup(&self, hash: &str) -> Result<Vec<(u64, i64)>, EngineError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT song_id, anchor_time FROM landmarks WHERE hash = ?",
        )?;
        let rows = stmt.query_map(params![hash], |row| {
            let song_id: i64 = row.get(0)?;
            let anchor_time: i64 = row.get(1)?;
            Ok((song_id as u64, anchor_time))
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn get_song(&self, song_id: u64) -> Result<Option<Song>, EngineError> {
        let conn = self.conn();
        conn.query_row(
            "SELECT id, title, artist, path, spotify_url, youtube_url FROM songs WHERE id = ?",
            params![song_id as i64],
            |row| {
                let id: i64 = row.get(0)?;
                Ok(Song {
                    id: id as u64,
                    title: row.get(1)?,
                    artist: row.get(2)?,
                    source_path: row.get(3)?,
                    spotify_url: row.get(4)?,
                    youtube_url: row.get(5)?,
                })
            },
        )
        .optional()
        .map_err(EngineError::from)
    }

    fn erase_all(&self) -> Result<(), EngineError> {
        let conn = self.conn();
        conn.execute("DELETE FROM landmarks", [])?;
        conn.execute("DELETE FROM songs", [])?;
        conn.execute("DELETE FROM sqlite_sequence WHERE name IN ('songs', 'landmarks')", [])
            .ok();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn open_test_index() -> (SqliteIndex, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        let index = SqliteIndex::open(&path, 2).unwrap();
        (index, dir)
    }

    #[test]
    fn create_and_fetch_song() {
        let (index, _dir) = open_test_index();
        let id = index
            .create_song("Title", "Artist", "songs/a.wav", None, None)
            .unwrap();
        let song = index.get_song(id).unwrap().unwrap();
        assert_eq!(song.title, "Title");
        assert_eq!(song.source_path, "songs/a.wav");
    }

    #[test]
    fn duplicate_path_is_rejected() {
        let (index, _dir) = open_test_index();
        index
            .create_song("Title", "Artist", "songs/a.wav", None, None)
            .unwrap();
        let err = index
            .create_song("Other", "Other", "songs/a.wav", None, None)
            .unwrap_err();
        assert!(matches!(err, EngineError::DuplicatePath(_)));
    }

    #[test]
    fn lookup_round_trips_landmarks() {
        let (index, _dir) = open_test_index();
        let id = index
            .create_song("Title", "Artist", "songs/a.wav", None, None)
            .unwrap();
        let landmarks = vec![("deadbeef".to_string(), 10), ("deadbeef".to_string(), 20)];
        index.insert_landmarks(id, &landmarks).unwrap();
        let hits = index.lookup("deadbeef").unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits.contains(&(id, 10)));
        assert!(hits.contains(&(id, 20)));
    }

    #[test]
    fn erase_all_clears_store() {
        let (index, _dir) = open_test_index();
        let id = index
            .create_song("Title", "Artist", "songs/a.wav", None, None)
            .unwrap();
        index
            .insert_landmarks(id, &[("abc".to_string(), 1)])
            .unwrap();
        index.erase_all().unwrap();
        assert!(index.lookup("abc").unwrap().is_empty());
        assert!(index.get_song(id).unwrap().is_none());
    }

    #[test]
    fn get_song_missing_returns_none() {
        let (index, _dir) = open_test_index();
        assert!(index.get_song(9999).unwrap().is_none());
    }
}
