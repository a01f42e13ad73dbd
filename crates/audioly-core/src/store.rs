//! # Record Store
//!
//! The persisted user and song records are the only shared mutable state in
//! the core. This module defines the `SocialStore` trait every backend
//! implements, and `MemoryStore`, the in-memory arena backend.
//!
//! Users are addressed by id; each record carries its own edge sets, so there
//! is no pointer graph to keep consistent. Multi-record writes go through
//! `put_users`, which every backend must apply atomically.

use crate::catalog::{ContentFilter, sort_newest_first};
use crate::{SocialError, Song, SongId, User, UserId};
use std::collections::BTreeMap;

// =============================================================================
// SOCIALSTORE TRAIT
// =============================================================================

/// Storage operations over user and song records.
///
/// All fallible operations return `Result<T, SocialError>` so that in-memory
/// and persistent backends are used uniformly.
pub trait SocialStore {
    /// Lookup a user by id.
    fn user(&self, id: &UserId) -> Result<Option<User>, SocialError>;

    /// Lookup a user by normalized handle.
    fn user_by_handle(&self, handle: &str) -> Result<Option<User>, SocialError>;

    /// All users, ordered by id.
    fn users(&self) -> Result<Vec<User>, SocialError>;

    /// Insert a new user record.
    ///
    /// Fails with `AlreadyRegistered` if the id exists and with `HandleTaken`
    /// if the handle belongs to someone else.
    fn insert_user(&mut self, user: &User) -> Result<(), SocialError>;

    /// Overwrite existing user records in one atomic write.
    ///
    /// Either every record is written or none is. Fails with `UserNotFound`
    /// if any record does not exist yet, and with `HandleTaken` if a changed
    /// handle collides with another account.
    fn put_users(&mut self, users: &[User]) -> Result<(), SocialError>;

    /// Remove a user, their handle and all their songs, and overwrite the
    /// given neighbor records, in one atomic write.
    fn remove_user(&mut self, id: &UserId, neighbors: &[User]) -> Result<(), SocialError>;

    /// Insert a new song record.
    fn insert_song(&mut self, song: &Song) -> Result<(), SocialError>;

    /// Lookup a song by id.
    fn song(&self, id: &SongId) -> Result<Option<Song>, SocialError>;

    /// Songs matching the filter, newest first.
    ///
    /// `ContentFilter::Nothing` must return without reading any record.
    fn songs(&self, filter: &ContentFilter) -> Result<Vec<Song>, SocialError>;

    /// Number of songs matching the filter.
    fn count_songs(&self, filter: &ContentFilter) -> Result<usize, SocialError> {
        if filter.is_nothing() {
            return Ok(0);
        }
        Ok(self.songs(filter)?.len())
    }

    /// Increment the play count of a song. Returns the new count, or `None`
    /// if the song does not exist.
    fn increment_play_count(&mut self, id: &SongId) -> Result<Option<u64>, SocialError>;

    /// Total number of users.
    fn user_count(&self) -> Result<usize, SocialError>;

    /// Total number of songs.
    fn song_count(&self) -> Result<usize, SocialError>;
}

// =============================================================================
// IN-MEMORY IMPLEMENTATION
// =============================================================================

/// In-memory arena of user and song records.
///
/// Uses `BTreeMap` so that iteration order is stable.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    /// User records: UserId -> User
    users: BTreeMap<UserId, User>,

    /// Handle index: normalized handle -> UserId
    handles: BTreeMap<String, UserId>,

    /// Song records: SongId -> Song
    songs: BTreeMap<SongId, Song>,
}

impl MemoryStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check that `handle` is free or already owned by `id`.
    fn check_handle(&self, handle: &str, id: &UserId) -> Result<(), SocialError> {
        match self.handles.get(handle) {
            Some(owner) if owner != id => Err(SocialError::HandleTaken(handle.to_string())),
            _ => Ok(()),
        }
    }

    /// Write a record and keep the handle index in step with it.
    fn write_user(&mut self, user: &User) {
        if let Some(previous) = self.users.get(&user.id) {
            if previous.handle != user.handle {
                self.handles.remove(&previous.handle);
            }
        }
        self.handles.insert(user.handle.clone(), user.id.clone());
        self.users.insert(user.id.clone(), user.clone());
    }
}

impl SocialStore for MemoryStore {
    fn user(&self, id: &UserId) -> Result<Option<User>, SocialError> {
        Ok(self.users.get(id).cloned())
    }

    fn user_by_handle(&self, handle: &str) -> Result<Option<User>, SocialError> {
        Ok(self
            .handles
            .get(handle)
            .and_then(|id| self.users.get(id))
            .cloned())
    }

    fn users(&self) -> Result<Vec<User>, SocialError> {
        Ok(self.users.values().cloned().collect())
    }

    fn insert_user(&mut self, user: &User) -> Result<(), SocialError> {
        if self.users.contains_key(&user.id) {
            return Err(SocialError::AlreadyRegistered(user.id.clone()));
        }
        self.check_handle(&user.handle, &user.id)?;
        self.write_user(user);
        Ok(())
    }

    fn put_users(&mut self, users: &[User]) -> Result<(), SocialError> {
        // Validate everything before the first write.
        for user in users {
            if !self.users.contains_key(&user.id) {
                return Err(SocialError::UserNotFound(user.id.clone()));
            }
            self.check_handle(&user.handle, &user.id)?;
        }
        for user in users {
            self.write_user(user);
        }
        Ok(())
    }

    fn remove_user(&mut self, id: &UserId, neighbors: &[User]) -> Result<(), SocialError> {
        if !self.users.contains_key(id) {
            return Err(SocialError::UserNotFound(id.clone()));
        }
        for neighbor in neighbors {
            if !self.users.contains_key(&neighbor.id) {
                return Err(SocialError::UserNotFound(neighbor.id.clone()));
            }
        }

        if let Some(removed) = self.users.remove(id) {
            self.handles.remove(&removed.handle);
        }
        self.songs.retain(|_, song| &song.owner != id);
        for neighbor in neighbors {
            self.write_user(neighbor);
        }
        Ok(())
    }

    fn insert_song(&mut self, song: &Song) -> Result<(), SocialError> {
        if !self.users.contains_key(&song.owner) {
            return Err(SocialError::UserNotFound(song.owner.clone()));
        }
        self.songs.insert(song.id.clone(), song.clone());
        Ok(())
    }

    fn song(&self, id: &SongId) -> Result<Option<Song>, SocialError> {
        Ok(self.songs.get(id).cloned())
    }

    fn songs(&self, filter: &ContentFilter) -> Result<Vec<Song>, SocialError> {
        if filter.is_nothing() {
            return Ok(Vec::new());
        }
        let mut songs: Vec<Song> = self
            .songs
            .values()
            .filter(|song| filter.matches(song))
            .cloned()
            .collect();
        sort_newest_first(&mut songs);
        Ok(songs)
    }

    fn count_songs(&self, filter: &ContentFilter) -> Result<usize, SocialError> {
        Ok(self.songs.values().filter(|song| filter.matches(song)).count())
    }

    fn increment_play_count(&mut self, id: &SongId) -> Result<Option<u64>, SocialError> {
        Ok(self.songs.get_mut(id).map(|song| {
            song.play_count = song.play_count.saturating_add(1);
            song.play_count
        }))
    }

    fn user_count(&self) -> Result<usize, SocialError> {
        Ok(self.users.len())
    }

    fn song_count(&self) -> Result<usize, SocialError> {
        Ok(self.songs.len())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MediaRef;
    use chrono::{TimeZone, Utc};

    fn user(id: &str, handle: &str) -> User {
        User::new(UserId::new(id), id, handle, false, Utc::now())
    }

    fn song(id: &str, owner: &str, is_public: bool, minute: u32) -> Song {
        Song {
            id: SongId::new(id),
            owner: UserId::new(owner),
            title: id.to_string(),
            category: None,
            media: MediaRef::new(format!("https://media.test/{id}"), id),
            cover: None,
            is_public,
            play_count: 0,
            created_at: Utc
                .with_ymd_and_hms(2024, 1, 1, 12, minute, 0)
                .single()
                .expect("valid timestamp"),
        }
    }

    #[test]
    fn insert_and_lookup_user() {
        let mut store = MemoryStore::new();
        store.insert_user(&user("a", "ann")).expect("insert");

        assert!(store.user(&UserId::new("a")).expect("lookup").is_some());
        assert_eq!(
            store.user_by_handle("ann").expect("lookup").map(|u| u.id),
            Some(UserId::new("a"))
        );
        assert_eq!(store.user_count().expect("count"), 1);
    }

    #[test]
    fn duplicate_registration_rejected() {
        let mut store = MemoryStore::new();
        store.insert_user(&user("a", "ann")).expect("insert");

        let again = store.insert_user(&user("a", "other"));
        assert!(matches!(again, Err(SocialError::AlreadyRegistered(_))));

        let taken = store.insert_user(&user("b", "ann"));
        assert!(matches!(taken, Err(SocialError::HandleTaken(_))));
    }

    #[test]
    fn put_users_is_all_or_nothing() {
        let mut store = MemoryStore::new();
        store.insert_user(&user("a", "ann")).expect("insert");

        let mut a = store.user(&UserId::new("a")).expect("get").expect("exists");
        a.friends.insert(UserId::new("ghost"));
        let ghost = user("ghost", "ghost");

        let result = store.put_users(&[a, ghost]);
        assert!(matches!(result, Err(SocialError::UserNotFound(_))));

        let a = store.user(&UserId::new("a")).expect("get").expect("exists");
        assert!(a.friends.is_empty(), "first record must not be written");
    }

    #[test]
    fn handle_change_moves_index() {
        let mut store = MemoryStore::new();
        store.insert_user(&user("a", "ann")).expect("insert");

        let mut a = store.user(&UserId::new("a")).expect("get").expect("exists");
        a.handle = "annie".into();
        store.put_users(&[a]).expect("put");

        assert!(store.user_by_handle("ann").expect("lookup").is_none());
        assert!(store.user_by_handle("annie").expect("lookup").is_some());
    }

    #[test]
    fn songs_filtered_and_newest_first() {
        let mut store = MemoryStore::new();
        store.insert_user(&user("a", "ann")).expect("insert");
        store.insert_user(&user("b", "bob")).expect("insert");
        store.insert_song(&song("s1", "a", true, 1)).expect("song");
        store.insert_song(&song("s2", "a", false, 2)).expect("song");
        store.insert_song(&song("s3", "a", true, 3)).expect("song");
        store.insert_song(&song("s4", "b", true, 4)).expect("song");

        let owner = UserId::new("a");
        let all = store.songs(&ContentFilter::Owner(owner.clone())).expect("songs");
        let ids: Vec<_> = all.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["s3", "s2", "s1"]);

        let public = store
            .count_songs(&ContentFilter::OwnerPublic(owner))
            .expect("count");
        assert_eq!(public, 2);

        assert!(store.songs(&ContentFilter::Nothing).expect("songs").is_empty());
        assert_eq!(store.count_songs(&ContentFilter::Public).expect("count"), 3);
    }

    #[test]
    fn song_requires_existing_owner() {
        let mut store = MemoryStore::new();
        let result = store.insert_song(&song("s1", "nobody", true, 1));
        assert!(matches!(result, Err(SocialError::UserNotFound(_))));
    }

    #[test]
    fn remove_user_drops_songs_and_handle() {
        let mut store = MemoryStore::new();
        store.insert_user(&user("a", "ann")).expect("insert");
        store.insert_song(&song("s1", "a", true, 1)).expect("song");

        store.remove_user(&UserId::new("a"), &[]).expect("remove");

        assert_eq!(store.user_count().expect("count"), 0);
        assert_eq!(store.song_count().expect("count"), 0);
        assert!(store.user_by_handle("ann").expect("lookup").is_none());
    }

    #[test]
    fn play_count_increments() {
        let mut store = MemoryStore::new();
        store.insert_user(&user("a", "ann")).expect("insert");
        store.insert_song(&song("s1", "a", true, 1)).expect("song");

        let id = SongId::new("s1");
        assert_eq!(store.increment_play_count(&id).expect("play"), Some(1));
        assert_eq!(store.increment_play_count(&id).expect("play"), Some(2));
        assert_eq!(
            store.increment_play_count(&SongId::new("missing")).expect("play"),
            None
        );
    }
}
