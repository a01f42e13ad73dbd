//! # redb-backed Record Storage
//!
//! A disk-backed `SocialStore` using the redb embedded database, providing:
//! - ACID transactions (both sides of a friendship land in one commit)
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! Records are encoded with postcard. Every multi-record mutation runs in a
//! single write transaction; an error before `commit` drops the transaction
//! and nothing is written.

use crate::catalog::{ContentFilter, sort_newest_first};
use crate::store::SocialStore;
use crate::{SocialError, Song, SongId, User, UserId};
use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Table for users: UserId -> serialized User bytes
const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");

/// Table for the handle index: normalized handle -> UserId
const HANDLES: TableDefinition<&str, &str> = TableDefinition::new("handles");

/// Table for songs: SongId -> serialized Song bytes
const SONGS: TableDefinition<&str, &[u8]> = TableDefinition::new("songs");

/// Table for the owner index: (owner, song_id) -> created_at (unix millis)
/// Keyed by owner first so one owner's songs are a contiguous range.
const OWNER_SONGS: TableDefinition<(&str, &str), i64> = TableDefinition::new("owner_songs");

fn storage(e: impl std::fmt::Display) -> SocialError {
    SocialError::Storage(e.to_string())
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, SocialError> {
    postcard::to_allocvec(value).map_err(|e| SocialError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, SocialError> {
    postcard::from_bytes(bytes).map_err(|e| SocialError::Serialization(e.to_string()))
}

/// A disk-backed record store using redb.
pub struct RedbStore {
    /// The redb database handle.
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a record database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SocialError> {
        let db = Database::create(path.as_ref()).map_err(storage)?;

        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(storage)?;
            let _ = write_txn.open_table(USERS).map_err(storage)?;
            let _ = write_txn.open_table(HANDLES).map_err(storage)?;
            let _ = write_txn.open_table(SONGS).map_err(storage)?;
            let _ = write_txn.open_table(OWNER_SONGS).map_err(storage)?;
            write_txn.commit().map_err(storage)?;
        }

        Ok(Self { db })
    }

    /// Compact the database file.
    pub fn compact(&mut self) -> Result<(), SocialError> {
        self.db.compact().map_err(storage)?;
        Ok(())
    }

    /// Write user records inside an open transaction, keeping the handle
    /// index in step. `require_existing` selects between update and insert.
    fn write_users(
        txn: &WriteTransaction,
        users: &[User],
        require_existing: bool,
    ) -> Result<(), SocialError> {
        let mut users_table = txn.open_table(USERS).map_err(storage)?;
        let mut handles_table = txn.open_table(HANDLES).map_err(storage)?;

        for user in users {
            let previous: Option<User> = match users_table.get(user.id.as_str()).map_err(storage)? {
                Some(bytes) => Some(decode(bytes.value())?),
                None => None,
            };

            match (&previous, require_existing) {
                (None, true) => return Err(SocialError::UserNotFound(user.id.clone())),
                (Some(_), false) => return Err(SocialError::AlreadyRegistered(user.id.clone())),
                _ => {}
            }

            let handle_owner = handles_table
                .get(user.handle.as_str())
                .map_err(storage)?
                .map(|owner| owner.value().to_string());
            if let Some(owner) = handle_owner {
                if owner != user.id.as_str() {
                    return Err(SocialError::HandleTaken(user.handle.clone()));
                }
            }

            if let Some(previous) = previous {
                if previous.handle != user.handle {
                    handles_table
                        .remove(previous.handle.as_str())
                        .map_err(storage)?;
                }
            }
            handles_table
                .insert(user.handle.as_str(), user.id.as_str())
                .map_err(storage)?;

            let bytes = encode(user)?;
            users_table
                .insert(user.id.as_str(), bytes.as_slice())
                .map_err(storage)?;
        }
        Ok(())
    }

    /// Collect the ids of every song owned by `owner`.
    fn owned_song_ids<T>(index: &T, owner: &UserId) -> Result<Vec<String>, SocialError>
    where
        T: ReadableTable<(&'static str, &'static str), i64>,
    {
        let mut ids = Vec::new();
        for entry in index.range((owner.as_str(), "")..).map_err(storage)? {
            let (key, _) = entry.map_err(storage)?;
            let (entry_owner, song_id) = key.value();
            if entry_owner != owner.as_str() {
                break;
            }
            ids.push(song_id.to_string());
        }
        Ok(ids)
    }
}

// =============================================================================
// SOCIALSTORE TRAIT IMPLEMENTATION
// =============================================================================

impl SocialStore for RedbStore {
    fn user(&self, id: &UserId) -> Result<Option<User>, SocialError> {
        let read_txn = self.db.begin_read().map_err(storage)?;
        let table = read_txn.open_table(USERS).map_err(storage)?;
        match table.get(id.as_str()).map_err(storage)? {
            Some(bytes) => Ok(Some(decode(bytes.value())?)),
            None => Ok(None),
        }
    }

    fn user_by_handle(&self, handle: &str) -> Result<Option<User>, SocialError> {
        let read_txn = self.db.begin_read().map_err(storage)?;
        let handles = read_txn.open_table(HANDLES).map_err(storage)?;
        let owner = handles
            .get(handle)
            .map_err(storage)?
            .map(|owner| owner.value().to_string());
        let Some(owner) = owner else {
            return Ok(None);
        };

        let users = read_txn.open_table(USERS).map_err(storage)?;
        match users.get(owner.as_str()).map_err(storage)? {
            Some(bytes) => Ok(Some(decode(bytes.value())?)),
            None => Ok(None),
        }
    }

    fn users(&self) -> Result<Vec<User>, SocialError> {
        let read_txn = self.db.begin_read().map_err(storage)?;
        let table = read_txn.open_table(USERS).map_err(storage)?;

        let mut users = Vec::new();
        for entry in table.iter().map_err(storage)? {
            let (_, value) = entry.map_err(storage)?;
            users.push(decode(value.value())?);
        }
        Ok(users)
    }

    fn insert_user(&mut self, user: &User) -> Result<(), SocialError> {
        let write_txn = self.db.begin_write().map_err(storage)?;
        Self::write_users(&write_txn, std::slice::from_ref(user), false)?;
        write_txn.commit().map_err(storage)?;
        Ok(())
    }

    fn put_users(&mut self, users: &[User]) -> Result<(), SocialError> {
        let write_txn = self.db.begin_write().map_err(storage)?;
        Self::write_users(&write_txn, users, true)?;
        write_txn.commit().map_err(storage)?;
        Ok(())
    }

    fn remove_user(&mut self, id: &UserId, neighbors: &[User]) -> Result<(), SocialError> {
        let write_txn = self.db.begin_write().map_err(storage)?;
        {
            let mut users_table = write_txn.open_table(USERS).map_err(storage)?;
            let removed = users_table
                .remove(id.as_str())
                .map_err(storage)?
                .map(|bytes| decode::<User>(bytes.value()));
            let removed = match removed {
                Some(user) => user?,
                None => return Err(SocialError::UserNotFound(id.clone())),
            };
            drop(users_table);

            let mut handles_table = write_txn.open_table(HANDLES).map_err(storage)?;
            handles_table
                .remove(removed.handle.as_str())
                .map_err(storage)?;
            drop(handles_table);

            let mut index = write_txn.open_table(OWNER_SONGS).map_err(storage)?;
            let song_ids = Self::owned_song_ids(&index, id)?;
            let mut songs_table = write_txn.open_table(SONGS).map_err(storage)?;
            for song_id in &song_ids {
                songs_table.remove(song_id.as_str()).map_err(storage)?;
                index
                    .remove((id.as_str(), song_id.as_str()))
                    .map_err(storage)?;
            }
        }
        Self::write_users(&write_txn, neighbors, true)?;
        write_txn.commit().map_err(storage)?;
        Ok(())
    }

    fn insert_song(&mut self, song: &Song) -> Result<(), SocialError> {
        let write_txn = self.db.begin_write().map_err(storage)?;
        {
            let users_table = write_txn.open_table(USERS).map_err(storage)?;
            if users_table
                .get(song.owner.as_str())
                .map_err(storage)?
                .is_none()
            {
                return Err(SocialError::UserNotFound(song.owner.clone()));
            }
            drop(users_table);

            let bytes = encode(song)?;
            let mut songs_table = write_txn.open_table(SONGS).map_err(storage)?;
            songs_table
                .insert(song.id.as_str(), bytes.as_slice())
                .map_err(storage)?;

            let mut index = write_txn.open_table(OWNER_SONGS).map_err(storage)?;
            index
                .insert(
                    (song.owner.as_str(), song.id.as_str()),
                    song.created_at.timestamp_millis(),
                )
                .map_err(storage)?;
        }
        write_txn.commit().map_err(storage)?;
        Ok(())
    }

    fn song(&self, id: &SongId) -> Result<Option<Song>, SocialError> {
        let read_txn = self.db.begin_read().map_err(storage)?;
        let table = read_txn.open_table(SONGS).map_err(storage)?;
        match table.get(id.as_str()).map_err(storage)? {
            Some(bytes) => Ok(Some(decode(bytes.value())?)),
            None => Ok(None),
        }
    }

    fn songs(&self, filter: &ContentFilter) -> Result<Vec<Song>, SocialError> {
        let owner = match filter {
            ContentFilter::Nothing => return Ok(Vec::new()),
            ContentFilter::Owner(owner) | ContentFilter::OwnerPublic(owner) => Some(owner),
            ContentFilter::Public => None,
        };

        let read_txn = self.db.begin_read().map_err(storage)?;
        let songs_table = read_txn.open_table(SONGS).map_err(storage)?;

        let mut songs = Vec::new();
        match owner {
            Some(owner) => {
                let index = read_txn.open_table(OWNER_SONGS).map_err(storage)?;
                for song_id in Self::owned_song_ids(&index, owner)? {
                    if let Some(bytes) = songs_table.get(song_id.as_str()).map_err(storage)? {
                        let song: Song = decode(bytes.value())?;
                        if filter.matches(&song) {
                            songs.push(song);
                        }
                    }
                }
            }
            None => {
                for entry in songs_table.iter().map_err(storage)? {
                    let (_, value) = entry.map_err(storage)?;
                    let song: Song = decode(value.value())?;
                    if filter.matches(&song) {
                        songs.push(song);
                    }
                }
            }
        }

        sort_newest_first(&mut songs);
        Ok(songs)
    }

    fn increment_play_count(&mut self, id: &SongId) -> Result<Option<u64>, SocialError> {
        let write_txn = self.db.begin_write().map_err(storage)?;
        let count = {
            let mut table = write_txn.open_table(SONGS).map_err(storage)?;
            let existing: Option<Song> = match table.get(id.as_str()).map_err(storage)? {
                Some(bytes) => Some(decode(bytes.value())?),
                None => None,
            };
            match existing {
                Some(mut song) => {
                    song.play_count = song.play_count.saturating_add(1);
                    let bytes = encode(&song)?;
                    table
                        .insert(id.as_str(), bytes.as_slice())
                        .map_err(storage)?;
                    Some(song.play_count)
                }
                None => None,
            }
        };
        write_txn.commit().map_err(storage)?;
        Ok(count)
    }

    fn user_count(&self) -> Result<usize, SocialError> {
        let read_txn = self.db.begin_read().map_err(storage)?;
        let table = read_txn.open_table(USERS).map_err(storage)?;
        Ok(table.len().map_err(storage)? as usize)
    }

    fn song_count(&self) -> Result<usize, SocialError> {
        let read_txn = self.db.begin_read().map_err(storage)?;
        let table = read_txn.open_table(SONGS).map_err(storage)?;
        Ok(table.len().map_err(storage)? as usize)
    }
}

// =============================================================================
// TESTS
// =============================================================================
