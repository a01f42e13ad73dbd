//! # API Request/Response Types
//!
//! JSON structures for the HTTP API. Field names are camelCase on the wire.
//! Directory, profile and listing views are served straight from the core
//! types, which carry their own serde attributes.

use audioly_core::{MediaRef, SocialError, SocialMetrics, SongId, User, UserId};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// HEALTH / STATUS
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Store status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub persistent: bool,
    #[serde(flatten)]
    pub metrics: SocialMetrics,
}

/// Plain acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// =============================================================================
// ACCOUNT
// =============================================================================

/// Create the profile for the authenticated identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub username: String,
    #[serde(default)]
    pub is_private: bool,
}

/// `PATCH /users/me`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingsRequest {
    pub is_private: Option<bool>,
    pub name: Option<String>,
    pub username: Option<String>,
}

/// `PATCH /users/me/profile`. `avatar` is a base64 image payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub is_private: Option<bool>,
    pub avatar: Option<String>,
}

/// The caller's own record, edges included.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub id: UserId,
    pub name: String,
    pub username: String,
    pub is_private: bool,
    pub profile_image: Option<MediaRef>,
    pub friends: Vec<UserId>,
    pub friend_requests: Vec<UserId>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for MeResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            username: user.handle,
            is_private: user.is_private,
            profile_image: user.profile_image,
            friends: user.friends.into_iter().collect(),
            friend_requests: user.friend_requests.into_iter().collect(),
            created_at: user.created_at,
        }
    }
}

/// Result of deleting the caller's account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAccountResponse {
    pub message: String,
    pub removed_media: usize,
}

// =============================================================================
// DIRECTORY
// =============================================================================

/// `GET /users?q=`.
///
/// A `q` longer than 100 bytes after trimming is rejected with 400.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryQuery {
    pub q: Option<String>,
}

// =============================================================================
// SONGS
// =============================================================================

/// `POST /songs`. `audio` and `cover` are base64 payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSongRequest {
    pub title: String,
    pub category: Option<String>,
    pub is_public: Option<bool>,
    pub audio: String,
    pub cover: Option<String>,
}

/// `POST /songs/{id}/play`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayResponse {
    pub id: SongId,
    pub play_count: u64,
}

/// Decode a base64 payload, accepting an optional `data:...;base64,` prefix.
pub fn decode_payload(field: &str, encoded: &str) -> Result<Vec<u8>, SocialError> {
    let trimmed = encoded.trim();
    let body = match trimmed.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => trimmed,
    };
    if body.is_empty() {
        return Err(SocialError::InvalidInput(format!("{} is required", field)));
    }
    STANDARD
        .decode(body)
        .map_err(|e| SocialError::InvalidInput(format!("{} is not valid base64: {}", field, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_plain_and_data_url() {
        assert_eq!(decode_payload("audio", "aGVsbG8=").expect("plain"), b"hello");
        assert_eq!(
            decode_payload("audio", "data:audio/mpeg;base64,aGVsbG8=").expect("data url"),
            b"hello"
        );
        assert!(decode_payload("audio", "").is_err());
        assert!(decode_payload("audio", "***").is_err());
    }
}
