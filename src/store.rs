//! Key/value persistence for playlist state.
//!
//! Serialized state lives in a single sqlite table under the legacy keys
//! (`playlist`, `videoTitles`, `favorites`, `history`). Values are JSON
//! blobs; a value that fails to parse is treated as absent.

use std::path::PathBuf;

use log::error;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};

pub const KEY_PLAYLIST: &str = "playlist";
pub const KEY_TITLES: &str = "videoTitles";
pub const KEY_FAVORITES: &str = "favorites";
pub const KEY_HISTORY: &str = "history";

pub struct StoreManager {
    conn: Connection,
}

impl StoreManager {
    pub fn new(path_override: Option<PathBuf>) -> Result<Self, rusqlite::Error> {
        let db_path = match path_override {
            Some(path) => path,
            None => {
                let data_dir = dirs::data_dir()
                    .expect("Could not find data directory")
                    .join("tubelist");
                if !data_dir.exists() {
                    std::fs::create_dir_all(&data_dir).expect("Could not create data directory");
                }
                data_dir.join("state.db")
            }
        };

        let conn = Connection::open(db_path)?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    pub fn new_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, rusqlite::Error> {
        let raw: Option<String> = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;

        let Some(raw) = raw else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                error!("StoreManager: discarding unreadable value for '{}': {}", key, err);
                Ok(None)
            }
        }
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), rusqlite::Error> {
        let raw = serde_json::to_string(value).expect("state serialization cannot fail");
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, raw],
        )?;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<(), rusqlite::Error> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    use crate::video_id::VideoId;

    #[test]
    fn round_trips_playlist_entries() {
        let store = StoreManager::new_in_memory().expect("in-memory store");
        let entries = vec![VideoId::new("aaaaaaaaaaa"), VideoId::new("bbbbbbbbbbb")];
        store.set(KEY_PLAYLIST, &entries).expect("set");

        let restored: Option<Vec<VideoId>> = store.get(KEY_PLAYLIST).expect("get");
        assert_eq!(restored, Some(entries));
    }

    #[test]
    fn round_trips_title_map_and_favorites() {
        let store = StoreManager::new_in_memory().expect("in-memory store");

        let mut titles = HashMap::new();
        titles.insert(VideoId::new("aaaaaaaaaaa"), "Some Title".to_string());
        store.set(KEY_TITLES, &titles).expect("set titles");

        let mut favorites = HashSet::new();
        favorites.insert(VideoId::new("aaaaaaaaaaa"));
        store.set(KEY_FAVORITES, &favorites).expect("set favorites");

        let restored_titles: Option<HashMap<VideoId, String>> =
            store.get(KEY_TITLES).expect("get titles");
        let restored_favorites: Option<HashSet<VideoId>> =
            store.get(KEY_FAVORITES).expect("get favorites");
        assert_eq!(restored_titles, Some(titles));
        assert_eq!(restored_favorites, Some(favorites));
    }

    #[test]
    fn missing_key_is_none() {
        let store = StoreManager::new_in_memory().expect("in-memory store");
        let value: Option<Vec<VideoId>> = store.get(KEY_HISTORY).expect("get");
        assert_eq!(value, None);
    }

    #[test]
    fn remove_deletes_the_value() {
        let store = StoreManager::new_in_memory().expect("in-memory store");
        store
            .set(KEY_PLAYLIST, &vec![VideoId::new("aaaaaaaaaaa")])
            .expect("set");
        store.remove(KEY_PLAYLIST).expect("remove");

        let value: Option<Vec<VideoId>> = store.get(KEY_PLAYLIST).expect("get");
        assert_eq!(value, None);
    }

    #[test]
    fn overwrite_keeps_last_value() {
        let store = StoreManager::new_in_memory().expect("in-memory store");
        store
            .set(KEY_HISTORY, &vec![VideoId::new("aaaaaaaaaaa")])
            .expect("set");
        store
            .set(
                KEY_HISTORY,
                &vec![VideoId::new("aaaaaaaaaaa"), VideoId::new("bbbbbbbbbbb")],
            )
            .expect("overwrite");

        let value: Option<Vec<VideoId>> = store.get(KEY_HISTORY).expect("get");
        assert_eq!(value.map(|v| v.len()), Some(2));
    }

    #[test]
    fn unreadable_value_reads_as_absent() {
        let store = StoreManager::new_in_memory().expect("in-memory store");
        store
            .conn
            .execute(
                "INSERT INTO kv (key, value) VALUES (?1, ?2)",
                params![KEY_PLAYLIST, "not json"],
            )
            .expect("raw insert");

        let value: Option<Vec<VideoId>> = store.get(KEY_PLAYLIST).expect("get");
        assert_eq!(value, None);
    }
}
