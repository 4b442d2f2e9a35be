//! SQLite-backed track store implementation.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::{
    ErrorReason, NewPlaylist, NewTrack, Playlist, Track, TrackError, TrackStatus, TrackStore,
    UpdateOutcome,
};

const TRACK_COLUMNS: &str = "id, artist, name, source_url, status, progress, error, error_reason, cover_url, playlist_id, created_at, updated_at";

/// SQLite-backed track store.
pub struct SqliteTrackStore {
    conn: Mutex<Connection>,
}

impl SqliteTrackStore {
    /// Create a new SQLite track store, creating the database file and tables
    /// if needed.
    pub fn new(path: &Path) -> Result<Self, TrackError> {
        let conn = Connection::open(path).map_err(|e| TrackError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite track store (useful for testing).
    pub fn in_memory() -> Result<Self, TrackError> {
        let conn =
            Connection::open_in_memory().map_err(|e| TrackError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), TrackError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS playlists (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                cover_url TEXT,
                is_track INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS tracks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                artist TEXT NOT NULL,
                name TEXT NOT NULL,
                source_url TEXT,
                status TEXT NOT NULL,
                progress INTEGER,
                error TEXT,
                error_reason TEXT,
                cover_url TEXT,
                playlist_id INTEGER REFERENCES playlists(id),
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_tracks_playlist ON tracks(playlist_id);
            CREATE INDEX IF NOT EXISTS idx_tracks_status ON tracks(status);
            "#,
        )
        .map_err(|e| TrackError::Database(e.to_string()))?;

        Ok(())
    }

    fn row_to_track(row: &rusqlite::Row) -> rusqlite::Result<Track> {
        let status_str: String = row.get(4)?;
        let error_reason_str: Option<String> = row.get(7)?;
        let progress: Option<i64> = row.get(5)?;
        let created_at_str: String = row.get(10)?;
        let updated_at_str: String = row.get(11)?;

        Ok(Track {
            id: row.get(0)?,
            artist: row.get(1)?,
            name: row.get(2)?,
            source_url: row.get(3)?,
            status: TrackStatus::parse(&status_str).unwrap_or(TrackStatus::New),
            progress: progress.map(|p| p.clamp(0, 100) as u8),
            error: row.get(6)?,
            error_reason: error_reason_str.as_deref().and_then(ErrorReason::parse),
            cover_url: row.get(8)?,
            playlist_id: row.get(9)?,
            created_at: parse_timestamp(&created_at_str),
            updated_at: parse_timestamp(&updated_at_str),
        })
    }

    fn row_to_playlist(row: &rusqlite::Row) -> rusqlite::Result<Playlist> {
        Ok(Playlist {
            id: row.get(0)?,
            name: row.get(1)?,
            cover_url: row.get(2)?,
            is_track: row.get::<_, i64>(3)? != 0,
        })
    }

    fn write_track(conn: &Connection, id: i64, track: &Track, now: DateTime<Utc>) -> Result<usize, TrackError> {
        conn.execute(
            "UPDATE tracks SET artist = ?, name = ?, source_url = ?, status = ?, progress = ?, error = ?, error_reason = ?, cover_url = ?, updated_at = ? WHERE id = ?",
            params![
                track.artist,
                track.name,
                track.source_url,
                track.status.as_str(),
                track.progress.map(|p| p as i64),
                track.error,
                track.error_reason.map(|r| r.as_str()),
                track.cover_url,
                now.to_rfc3339(),
                id,
            ],
        )
        .map_err(|e| TrackError::Database(e.to_string()))
    }

    fn get_with_conn(conn: &Connection, id: i64) -> Result<Option<Track>, TrackError> {
        let sql = format!("SELECT {} FROM tracks WHERE id = ?", TRACK_COLUMNS);
        match conn.query_row(&sql, params![id], Self::row_to_track) {
            Ok(track) => Ok(Some(track)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(TrackError::Database(e.to_string())),
        }
    }
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

impl TrackStore for SqliteTrackStore {
    fn create(&self, request: NewTrack) -> Result<Track, TrackError> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO tracks (artist, name, status, cover_url, playlist_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                request.artist,
                request.name,
                TrackStatus::New.as_str(),
                request.cover_url,
                request.playlist_id,
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )
        .map_err(|e| TrackError::Database(e.to_string()))?;

        let id = conn.last_insert_rowid();

        Ok(Track {
            id,
            artist: request.artist,
            name: request.name,
            source_url: None,
            status: TrackStatus::New,
            progress: None,
            error: None,
            error_reason: None,
            cover_url: request.cover_url,
            playlist_id: request.playlist_id,
            created_at: now,
            updated_at: now,
        })
    }

    fn get(&self, id: i64) -> Result<Option<Track>, TrackError> {
        let conn = self.conn.lock().unwrap();
        Self::get_with_conn(&conn, id)
    }

    fn list(&self) -> Result<Vec<Track>, TrackError> {
        let conn = self.conn.lock().unwrap();
        let sql = format!("SELECT {} FROM tracks ORDER BY id ASC", TRACK_COLUMNS);
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| TrackError::Database(e.to_string()))?;
        let rows = stmt
            .query_map([], Self::row_to_track)
            .map_err(|e| TrackError::Database(e.to_string()))?;

        let mut tracks = Vec::new();
        for row in rows {
            tracks.push(row.map_err(|e| TrackError::Database(e.to_string()))?);
        }
        Ok(tracks)
    }

    fn list_by_playlist(&self, playlist_id: i64) -> Result<Vec<Track>, TrackError> {
        let conn = self.conn.lock().unwrap();
        let sql = format!(
            "SELECT {} FROM tracks WHERE playlist_id = ? ORDER BY id ASC",
            TRACK_COLUMNS
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| TrackError::Database(e.to_string()))?;
        let rows = stmt
            .query_map(params![playlist_id], Self::row_to_track)
            .map_err(|e| TrackError::Database(e.to_string()))?;

        let mut tracks = Vec::new();
        for row in rows {
            tracks.push(row.map_err(|e| TrackError::Database(e.to_string()))?);
        }
        Ok(tracks)
    }

    fn update(&self, id: i64, track: &Track) -> Result<Track, TrackError> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();

        let changed = Self::write_track(&conn, id, track, now)?;
        if changed == 0 {
            return Err(TrackError::NotFound(id));
        }

        Self::get_with_conn(&conn, id)?.ok_or(TrackError::NotFound(id))
    }

    fn update_unless_user_stopped(
        &self,
        id: i64,
        track: &Track,
    ) -> Result<UpdateOutcome, TrackError> {
        // The connection mutex is held for the whole read-check-write, so a
        // concurrent force-fail/stop cannot interleave between the check and
        // the write.
        let conn = self.conn.lock().unwrap();

        let current = match Self::get_with_conn(&conn, id)? {
            Some(t) => t,
            None => return Ok(UpdateOutcome::Gone),
        };

        if current.is_user_stopped() {
            return Ok(UpdateOutcome::Skipped);
        }

        let now = Utc::now();
        Self::write_track(&conn, id, track, now)?;
        let updated = Self::get_with_conn(&conn, id)?.ok_or(TrackError::NotFound(id))?;
        Ok(UpdateOutcome::Updated(updated))
    }

    fn delete(&self, id: i64) -> Result<bool, TrackError> {
        let conn = self.conn.lock().unwrap();
        let changed = conn
            .execute("DELETE FROM tracks WHERE id = ?", params![id])
            .map_err(|e| TrackError::Database(e.to_string()))?;
        Ok(changed > 0)
    }

    fn create_playlist(&self, request: NewPlaylist) -> Result<Playlist, TrackError> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();

        conn.execute(
            "INSERT INTO playlists (name, cover_url, is_track, created_at) VALUES (?, ?, ?, ?)",
            params![
                request.name,
                request.cover_url,
                request.is_track as i64,
                now.to_rfc3339(),
            ],
        )
        .map_err(|e| TrackError::Database(e.to_string()))?;

        Ok(Playlist {
            id: conn.last_insert_rowid(),
            name: request.name,
            cover_url: request.cover_url,
            is_track: request.is_track,
        })
    }

    fn get_playlist(&self, id: i64) -> Result<Option<Playlist>, TrackError> {
        let conn = self.conn.lock().unwrap();
        match conn.query_row(
            "SELECT id, name, cover_url, is_track FROM playlists WHERE id = ?",
            params![id],
            Self::row_to_playlist,
        ) {
            Ok(playlist) => Ok(Some(playlist)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(TrackError::Database(e.to_string())),
        }
    }

    fn list_playlists(&self) -> Result<Vec<Playlist>, TrackError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT id, name, cover_url, is_track FROM playlists ORDER BY id ASC")
            .map_err(|e| TrackError::Database(e.to_string()))?;
        let rows = stmt
            .query_map([], Self::row_to_playlist)
            .map_err(|e| TrackError::Database(e.to_string()))?;

        let mut playlists = Vec::new();
        for row in rows {
            playlists.push(row.map_err(|e| TrackError::Database(e.to_string()))?);
        }
        Ok(playlists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteTrackStore {
        SqliteTrackStore::in_memory().unwrap()
    }

    fn new_track(playlist_id: Option<i64>) -> NewTrack {
        NewTrack {
            artist: "The Kinks".to_string(),
            name: "Waterloo Sunset".to_string(),
            cover_url: None,
            playlist_id,
        }
    }

    #[test]
    fn test_create_and_get() {
        let store = store();
        let created = store.create(new_track(None)).unwrap();
        assert_eq!(created.status, TrackStatus::New);
        assert!(created.id > 0);

        let fetched = store.get(created.id).unwrap().unwrap();
        assert_eq!(fetched.artist, "The Kinks");
        assert_eq!(fetched.status, TrackStatus::New);
        assert!(fetched.progress.is_none());
    }

    #[test]
    fn test_get_missing_returns_none() {
        let store = store();
        assert!(store.get(999).unwrap().is_none());
    }

    #[test]
    fn test_update_round_trip() {
        let store = store();
        let mut track = store.create(new_track(None)).unwrap();
        track.status = TrackStatus::Downloading;
        track.progress = Some(37);
        track.source_url = Some("https://youtube.com/watch?v=abc".to_string());

        let updated = store.update(track.id, &track).unwrap();
        assert_eq!(updated.status, TrackStatus::Downloading);
        assert_eq!(updated.progress, Some(37));
        assert_eq!(
            updated.source_url.as_deref(),
            Some("https://youtube.com/watch?v=abc")
        );
    }

    #[test]
    fn test_update_missing_track_fails() {
        let store = store();
        let track = store.create(new_track(None)).unwrap();
        assert!(matches!(
            store.update(track.id + 1, &track),
            Err(TrackError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete() {
        let store = store();
        let track = store.create(new_track(None)).unwrap();
        assert!(store.delete(track.id).unwrap());
        assert!(store.get(track.id).unwrap().is_none());
        assert!(!store.delete(track.id).unwrap());
    }

    #[test]
    fn test_list_by_playlist() {
        let store = store();
        let playlist = store
            .create_playlist(NewPlaylist {
                name: "Mix".to_string(),
                cover_url: None,
                is_track: false,
            })
            .unwrap();
        store.create(new_track(Some(playlist.id))).unwrap();
        store.create(new_track(Some(playlist.id))).unwrap();
        store.create(new_track(None)).unwrap();

        assert_eq!(store.list_by_playlist(playlist.id).unwrap().len(), 2);
        assert_eq!(store.list().unwrap().len(), 3);
    }

    #[test]
    fn test_playlist_round_trip() {
        let store = store();
        let playlist = store
            .create_playlist(NewPlaylist {
                name: "Singles".to_string(),
                cover_url: Some("http://x/c.jpg".to_string()),
                is_track: true,
            })
            .unwrap();

        let fetched = store.get_playlist(playlist.id).unwrap().unwrap();
        assert_eq!(fetched.name, "Singles");
        assert!(fetched.is_track);
        assert_eq!(fetched.cover_url.as_deref(), Some("http://x/c.jpg"));
        assert_eq!(store.list_playlists().unwrap().len(), 1);
    }

    #[test]
    fn test_conditional_update_applies_when_active() {
        let store = store();
        let mut track = store.create(new_track(None)).unwrap();
        track.status = TrackStatus::Completed;
        track.progress = Some(100);

        match store.update_unless_user_stopped(track.id, &track).unwrap() {
            UpdateOutcome::Updated(updated) => {
                assert_eq!(updated.status, TrackStatus::Completed);
                assert_eq!(updated.progress, Some(100));
            }
            other => panic!("Expected Updated, got {:?}", other),
        }
    }

    #[test]
    fn test_conditional_update_skips_user_stopped() {
        let store = store();
        let mut track = store.create(new_track(None)).unwrap();

        // User forces the failure first.
        track.status = TrackStatus::Error;
        track.error = Some("Forced failure by user".to_string());
        track.error_reason = Some(ErrorReason::ForcedFailure);
        store.update(track.id, &track).unwrap();

        // A stale completion arrives afterwards.
        let mut stale = track.clone();
        stale.status = TrackStatus::Completed;
        stale.error = None;
        stale.error_reason = None;
        stale.progress = Some(100);

        assert_eq!(
            store.update_unless_user_stopped(track.id, &stale).unwrap(),
            UpdateOutcome::Skipped
        );

        let persisted = store.get(track.id).unwrap().unwrap();
        assert_eq!(persisted.status, TrackStatus::Error);
        assert_eq!(persisted.error_reason, Some(ErrorReason::ForcedFailure));
    }

    #[test]
    fn test_conditional_update_overwrites_stage_error() {
        let store = store();
        let mut track = store.create(new_track(None)).unwrap();

        track.status = TrackStatus::Error;
        track.error = Some("no results".to_string());
        track.error_reason = Some(ErrorReason::Stage);
        store.update(track.id, &track).unwrap();

        let mut retried = track.clone();
        retried.status = TrackStatus::Completed;
        retried.error = None;
        retried.error_reason = None;

        assert!(matches!(
            store
                .update_unless_user_stopped(track.id, &retried)
                .unwrap(),
            UpdateOutcome::Updated(_)
        ));
    }

    #[test]
    fn test_conditional_update_gone() {
        let store = store();
        let track = store.create(new_track(None)).unwrap();
        store.delete(track.id).unwrap();
        assert_eq!(
            store.update_unless_user_stopped(track.id, &track).unwrap(),
            UpdateOutcome::Gone
        );
    }

    #[test]
    fn test_file_backed_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spooty.db");
        let store = SqliteTrackStore::new(&path).unwrap();
        let track = store.create(new_track(None)).unwrap();
        drop(store);

        // Reopen and verify persistence.
        let store = SqliteTrackStore::new(&path).unwrap();
        assert!(store.get(track.id).unwrap().is_some());
    }
}
