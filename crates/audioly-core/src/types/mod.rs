//! # Core Type Definitions
//!
//! This module contains all core types for the Audioly social graph:
//! - Identifiers (`UserId`, `SongId`)
//! - Records (`User`, `Song`, `MediaRef`) and listing views (`UserSummary`, `ListedSong`)
//! - Derived relationship state (`ConnectionStatus`)
//! - Error types (`SocialError`, `ErrorKind`)
//!
//! ## Ordering Guarantees
//!
//! Edge sets are `BTreeSet`s so that every listing built from them comes out
//! in the same order on every backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Opaque identifier of a user account.
///
/// Issued by the external identity provider (the `sub` of a verified token).
/// The core compares and stores it but never generates one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Wrap an externally supplied identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a content record. Minted by the catalog on upload.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SongId(pub String);

impl SongId {
    /// Wrap an existing identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mint a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SongId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// MEDIA REFERENCE
// =============================================================================

/// Reference to a binary object held by the object store.
///
/// Both fields are opaque to the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRef {
    /// Public URL of the object.
    pub url: String,
    /// Store-specific identifier, used for later deletion.
    pub storage_id: String,
}

impl MediaRef {
    #[must_use]
    pub fn new(url: impl Into<String>, storage_id: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            storage_id: storage_id.into(),
        }
    }
}

// =============================================================================
// USER
// =============================================================================

/// A user record: profile attributes plus both edge sets.
///
/// - `friends` is symmetric across records: `b ∈ a.friends ⇔ a ∈ b.friends`.
/// - `friend_requests` holds *incoming* pending requests; the edge
///   requester → target lives on the target.
/// - Neither set ever contains the record's own id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    /// Trimmed, lowercased, unique across all users.
    pub handle: String,
    pub is_private: bool,
    pub friends: BTreeSet<UserId>,
    pub friend_requests: BTreeSet<UserId>,
    pub profile_image: Option<MediaRef>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a fresh user with no edges.
    #[must_use]
    pub fn new(
        id: UserId,
        name: impl Into<String>,
        handle: &str,
        is_private: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            handle: Self::normalize_handle(handle),
            is_private,
            friends: BTreeSet::new(),
            friend_requests: BTreeSet::new(),
            profile_image: None,
            created_at,
        }
    }

    /// Canonical form of a handle: trimmed and lowercased.
    #[must_use]
    pub fn normalize_handle(handle: &str) -> String {
        handle.trim().to_lowercase()
    }

    /// Check whether `other` is a confirmed friend.
    #[must_use]
    pub fn is_friend_with(&self, other: &UserId) -> bool {
        self.friends.contains(other)
    }

    /// Check whether `requester` has a pending request to this user.
    #[must_use]
    pub fn has_request_from(&self, requester: &UserId) -> bool {
        self.friend_requests.contains(requester)
    }
}

/// Public-facing summary of a user, as embedded in listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: UserId,
    pub name: String,
    #[serde(rename = "username")]
    pub handle: String,
    pub is_private: bool,
    pub profile_image: Option<MediaRef>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            handle: user.handle.clone(),
            is_private: user.is_private,
            profile_image: user.profile_image.clone(),
        }
    }
}

// =============================================================================
// SONG
// =============================================================================

/// A content record, exclusively owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    pub id: SongId,
    pub owner: UserId,
    pub title: String,
    pub category: Option<String>,
    pub media: MediaRef,
    pub cover: Option<MediaRef>,
    /// The only item-level visibility switch.
    pub is_public: bool,
    pub play_count: u64,
    pub created_at: DateTime<Utc>,
}

/// A song together with a summary of its owner (explore and feed entries).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListedSong {
    #[serde(flatten)]
    pub song: Song,
    pub owner_summary: UserSummary,
}

// =============================================================================
// CONNECTION STATUS
// =============================================================================

/// Relationship of a viewer to a target, derived at query time.
///
/// Never persisted; always recomputed from the current edge sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// The viewer is looking at their own account.
    #[serde(rename = "self")]
    Myself,
    /// Mutual, confirmed friendship.
    Friend,
    /// The viewer has a pending request to the target.
    Sent,
    /// The target has a pending request to the viewer.
    Received,
    /// No relationship, or an anonymous viewer.
    None,
}

impl ConnectionStatus {
    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Myself => "self",
            Self::Friend => "friend",
            Self::Sent => "sent",
            Self::Received => "received",
            Self::None => "none",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Coarse classification of a [`SocialError`], used for retry policy and
/// for mapping onto transport status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A referenced identity or content record does not exist.
    NotFound,
    /// The operation contradicts current edge or ownership state.
    Conflict,
    /// Malformed input or a self-referential target.
    InvalidOperation,
    /// No verified identity where one is required.
    Unauthorized,
    /// Storage access failed.
    Internal,
    /// Storage access did not complete in time. Safe to retry.
    Unavailable,
}

/// Errors that can occur in the Audioly core.
///
/// - No silent failures
/// - No operation is fatal to the process; an error affects only its caller
#[derive(Debug, Error)]
pub enum SocialError {
    /// The referenced user does not exist.
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    /// The referenced song does not exist or is not visible to the caller.
    #[error("Song not found: {0}")]
    SongNotFound(SongId),

    /// The two users are already friends.
    #[error("Already friends with {0}")]
    AlreadyFriends(UserId),

    /// A pending request already exists between the two users.
    #[error("A friend request with {0} is already pending")]
    RequestPending(UserId),

    /// The handle is owned by another account.
    #[error("Handle already taken: {0}")]
    HandleTaken(String),

    /// A profile record already exists for this identity.
    #[error("User already registered: {0}")]
    AlreadyRegistered(UserId),

    /// The operation targets the caller's own account.
    #[error("Operation cannot target your own account")]
    SelfReference,

    /// A required field is missing or malformed.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No verified identity was supplied.
    #[error("Unauthorized")]
    Unauthorized,

    /// The storage layer failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Storage access timed out.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl SocialError {
    /// Classify the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::UserNotFound(_) | Self::SongNotFound(_) => ErrorKind::NotFound,
            Self::AlreadyFriends(_)
            | Self::RequestPending(_)
            | Self::HandleTaken(_)
            | Self::AlreadyRegistered(_) => ErrorKind::Conflict,
            Self::SelfReference | Self::InvalidInput(_) => ErrorKind::InvalidOperation,
            Self::Unauthorized => ErrorKind::Unauthorized,
            Self::Storage(_) | Self::Serialization(_) => ErrorKind::Internal,
            Self::Unavailable(_) => ErrorKind::Unavailable,
        }
    }

    /// Whether a caller may retry an idempotent operation that failed this way.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Internal | ErrorKind::Unavailable)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_is_normalized_on_creation() {
        let user = User::new(UserId::new("u1"), "Jo", "  JoMusic ", false, Utc::now());
        assert_eq!(user.handle, "jomusic");
        assert!(user.friends.is_empty());
        assert!(user.friend_requests.is_empty());
    }

    #[test]
    fn connection_status_wire_names() {
        assert_eq!(ConnectionStatus::Myself.as_str(), "self");
        assert_eq!(ConnectionStatus::Received.as_str(), "received");
        assert_eq!(ConnectionStatus::None.to_string(), "none");
    }

    #[test]
    fn generated_song_ids_are_unique() {
        let a = SongId::generate();
        let b = SongId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 32);
    }

    #[test]
    fn error_kinds() {
        assert_eq!(
            SocialError::UserNotFound(UserId::new("x")).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(SocialError::SelfReference.kind(), ErrorKind::InvalidOperation);
        assert_eq!(
            SocialError::RequestPending(UserId::new("x")).kind(),
            ErrorKind::Conflict
        );
        assert!(SocialError::Storage("disk".into()).is_retryable());
        assert!(!SocialError::AlreadyFriends(UserId::new("x")).is_retryable());
    }

    #[test]
    fn user_record_survives_postcard() {
        let mut user = User::new(UserId::new("u1"), "Ana", "ana", true, Utc::now());
        user.friends.insert(UserId::new("u2"));
        user.friend_requests.insert(UserId::new("u3"));

        let bytes = postcard::to_allocvec(&user).expect("encode");
        let decoded: User = postcard::from_bytes(&bytes).expect("decode");
        assert_eq!(decoded, user);
    }
}
