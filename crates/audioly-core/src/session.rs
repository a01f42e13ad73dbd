//! # Session Module
//!
//! The explicitly constructed store handle every component operates on.
//!
//! A `Session` owns one storage backend and exposes the high-level social
//! operations over it. Callers that share a session across threads wrap it in
//! their own lock; the session itself is not synchronized.
//!
//! ## Storage Backends
//!
//! - `InMemory`: `MemoryStore` (fast, volatile)
//! - `Persistent`: `RedbStore` (disk-backed, ACID)
//!
//! ## Retry Policy
//!
//! A storage failure (`ErrorKind::Internal`) is retried exactly once for
//! reads and for the idempotent writes (accept, decline). `send_request`,
//! uploads and play counting are never retried. Domain errors (not found,
//! conflict, invalid operation) are returned as-is.

use crate::accounts::{Accounts, SettingsUpdate};
use crate::catalog::{Catalog, NewSong};
use crate::directory::{Directory, DirectoryEntry, FriendsOverview, ProfileView};
use crate::relationship::Relationships;
use crate::storage::RedbStore;
use crate::store::{MemoryStore, SocialStore};
use crate::visibility::classify;
use crate::{
    ConnectionStatus, ErrorKind, ListedSong, MediaRef, SocialError, Song, SongId, User, UserId,
};
use chrono::Utc;
use std::path::Path;

// =============================================================================
// ERROR LOGGING HELPERS
// =============================================================================

/// Run `op`, retrying once on a storage failure.
///
/// The first failure is written to stderr as a structured line before the
/// retry. The core carries no logging dependency; the app layer captures
/// stderr.
fn retry_once<T>(
    context: &str,
    mut op: impl FnMut() -> Result<T, SocialError>,
) -> Result<T, SocialError> {
    match op() {
        Err(e) if e.kind() == ErrorKind::Internal => {
            eprintln!(
                "{{\"level\":\"warn\",\"target\":\"audioly_core::session\",\"message\":\"retrying {} after storage error: {}\"}}",
                context, e
            );
            op()
        }
        other => other,
    }
}

/// Storage backend for a Session.
#[derive(Debug)]
pub enum StorageBackend {
    /// In-memory records (fast, volatile).
    InMemory(MemoryStore),
    /// Disk-backed records using redb (ACID, persistent).
    Persistent(RedbStore),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(MemoryStore::new())
    }
}

/// The store handle passed to every social operation.
#[derive(Debug, Default)]
pub struct Session {
    backend: StorageBackend,
}

impl Session {
    /// Create a new empty session with in-memory storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session over an existing in-memory store.
    #[must_use]
    pub fn with_memory(store: MemoryStore) -> Self {
        Self {
            backend: StorageBackend::InMemory(store),
        }
    }

    /// Create a session with persistent redb storage.
    ///
    /// Opens or creates a redb database at the given path.
    pub fn with_redb(path: impl AsRef<Path>) -> Result<Self, SocialError> {
        let redb = RedbStore::open(path)?;
        Ok(Self {
            backend: StorageBackend::Persistent(redb),
        })
    }

    /// Check if using persistent storage.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, StorageBackend::Persistent(_))
    }

    /// Get the storage backend.
    #[must_use]
    pub fn backend(&self) -> &StorageBackend {
        &self.backend
    }

    /// Read access to the underlying store.
    #[must_use]
    pub fn store(&self) -> &dyn SocialStore {
        match &self.backend {
            StorageBackend::InMemory(store) => store,
            StorageBackend::Persistent(store) => store,
        }
    }

    /// Write access to the underlying store.
    pub fn store_mut(&mut self) -> &mut dyn SocialStore {
        match &mut self.backend {
            StorageBackend::InMemory(store) => store,
            StorageBackend::Persistent(store) => store,
        }
    }

    /// Compact the database file. No-op for in-memory storage.
    pub fn compact(&mut self) -> Result<(), SocialError> {
        match &mut self.backend {
            StorageBackend::InMemory(_) => Ok(()),
            StorageBackend::Persistent(store) => store.compact(),
        }
    }

    // =========================================================================
    // ACCOUNTS
    // =========================================================================

    /// Lookup a user record.
    pub fn user(&self, id: &UserId) -> Result<Option<User>, SocialError> {
        retry_once("user", || self.store().user(id))
    }

    /// Create the profile record for a verified identity.
    pub fn register(
        &mut self,
        id: UserId,
        name: &str,
        handle: &str,
        is_private: bool,
    ) -> Result<User, SocialError> {
        Accounts::register(self.store_mut(), id, name, handle, is_private, Utc::now())
    }

    /// Update name, handle and privacy.
    pub fn update_settings(
        &mut self,
        id: &UserId,
        update: SettingsUpdate,
    ) -> Result<User, SocialError> {
        Accounts::update_settings(self.store_mut(), id, update)
    }

    /// Replace the profile image; returns the record and the replaced image.
    pub fn set_profile_image(
        &mut self,
        id: &UserId,
        image: MediaRef,
    ) -> Result<(User, Option<MediaRef>), SocialError> {
        Accounts::set_profile_image(self.store_mut(), id, image)
    }

    /// Update settings and, optionally, the profile image in one write.
    pub fn update_profile(
        &mut self,
        id: &UserId,
        update: SettingsUpdate,
        image: Option<MediaRef>,
    ) -> Result<(User, Option<MediaRef>), SocialError> {
        Accounts::update_profile(self.store_mut(), id, update, image)
    }

    /// Delete an account; returns media that no longer has an owner.
    pub fn delete_account(&mut self, id: &UserId) -> Result<Vec<MediaRef>, SocialError> {
        Accounts::delete_account(self.store_mut(), id)
    }

    // =========================================================================
    // RELATIONSHIPS
    // =========================================================================

    /// Send a friend request. Never retried.
    pub fn send_request(&mut self, requester: &UserId, target: &UserId) -> Result<(), SocialError> {
        Relationships::send_request(self.store_mut(), requester, target)
    }

    /// Accept a friend request.
    pub fn accept_request(&mut self, target: &UserId, requester: &UserId) -> Result<(), SocialError> {
        retry_once("accept_request", || {
            Relationships::accept_request(self.store_mut(), target, requester)
        })
    }

    /// Decline an incoming request or cancel an outgoing one.
    pub fn decline_or_cancel_request(
        &mut self,
        a: &UserId,
        b: &UserId,
    ) -> Result<(), SocialError> {
        retry_once("decline_or_cancel_request", || {
            Relationships::decline_or_cancel_request(self.store_mut(), a, b)
        })
    }

    pub fn is_friend(&self, a: &UserId, b: &UserId) -> Result<bool, SocialError> {
        retry_once("is_friend", || Relationships::is_friend(self.store(), a, b))
    }

    pub fn has_pending_request_from(&self, from: &UserId, to: &UserId) -> Result<bool, SocialError> {
        retry_once("has_pending_request_from", || {
            Relationships::has_pending_request_from(self.store(), from, to)
        })
    }

    pub fn friends_of(&self, id: &UserId) -> Result<Vec<UserId>, SocialError> {
        retry_once("friends_of", || Relationships::friends_of(self.store(), id))
    }

    pub fn pending_requests_of(&self, id: &UserId) -> Result<Vec<UserId>, SocialError> {
        retry_once("pending_requests_of", || {
            Relationships::pending_requests_of(self.store(), id)
        })
    }

    /// Relationship of `viewer` to `target`. An unknown viewer is anonymous.
    pub fn connection_status(
        &self,
        viewer: Option<&UserId>,
        target: &UserId,
    ) -> Result<ConnectionStatus, SocialError> {
        retry_once("connection_status", || {
            let store = self.store();
            let target = store
                .user(target)?
                .ok_or_else(|| SocialError::UserNotFound(target.clone()))?;
            let viewer = match viewer {
                Some(id) => store.user(id)?,
                None => None,
            };
            Ok(classify(viewer.as_ref(), &target))
        })
    }

    // =========================================================================
    // DIRECTORY
    // =========================================================================

    pub fn search(
        &self,
        caller: Option<&UserId>,
        query: Option<&str>,
    ) -> Result<Vec<DirectoryEntry>, SocialError> {
        retry_once("search", || Directory::search(self.store(), caller, query))
    }

    pub fn profile(
        &self,
        viewer: Option<&UserId>,
        target: &UserId,
    ) -> Result<ProfileView, SocialError> {
        retry_once("profile", || Directory::profile(self.store(), viewer, target))
    }

    pub fn friends_overview(&self, id: &UserId) -> Result<FriendsOverview, SocialError> {
        retry_once("friends_overview", || {
            Directory::friends_overview(self.store(), id)
        })
    }

    // =========================================================================
    // CATALOG
    // =========================================================================

    /// Create a song. Never retried.
    pub fn upload(&mut self, owner: &UserId, request: NewSong) -> Result<Song, SocialError> {
        Catalog::upload(self.store_mut(), owner, request, Utc::now())
    }

    pub fn mine(&self, owner: &UserId) -> Result<Vec<Song>, SocialError> {
        retry_once("mine", || Catalog::mine(self.store(), owner))
    }

    pub fn explore(&self, viewer: Option<&UserId>) -> Result<Vec<ListedSong>, SocialError> {
        retry_once("explore", || Catalog::explore(self.store(), viewer))
    }

    pub fn feed(&self, viewer: &UserId) -> Result<Vec<ListedSong>, SocialError> {
        retry_once("feed", || Catalog::feed(self.store(), viewer))
    }

    pub fn song(&self, viewer: Option<&UserId>, id: &SongId) -> Result<Song, SocialError> {
        retry_once("song", || Catalog::song(self.store(), viewer, id))
    }

    /// Count one play. Never retried.
    pub fn record_play(&mut self, viewer: Option<&UserId>, id: &SongId) -> Result<u64, SocialError> {
        Catalog::record_play(self.store_mut(), viewer, id)
    }
}

// =============================================================================
// TESTS
// =============================================================================
