//! Wire format tests for the API and core view types.

#![allow(clippy::unwrap_used, clippy::panic)]

use audioly::api::{
    ErrorResponse, HealthResponse, MeResponse, PlayResponse, RegisterRequest, StatusResponse,
    UpdateSettingsRequest, UploadSongRequest, classify,
};
use audioly_core::{
    ConnectionStatus, ErrorKind, MediaRef, SocialMetrics, SongId, User, UserId, UserSummary,
};
use axum::http::StatusCode;
use chrono::{TimeZone, Utc};
use serde_json::{Value, json};

// =============================================================================
// HEALTH / STATUS
// =============================================================================

#[test]
fn test_health_response_default() {
    let health = HealthResponse::default();
    assert_eq!(health.status, "ok");
    assert!(!health.version.is_empty());
}

#[test]
fn test_status_response_flattens_metrics() {
    let status = StatusResponse {
        persistent: true,
        metrics: SocialMetrics {
            user_count: 3,
            friendship_count: 1,
            ..SocialMetrics::default()
        },
    };
    let value = serde_json::to_value(&status).unwrap();
    assert_eq!(value["persistent"], true);
    assert_eq!(value["userCount"], 3);
    assert_eq!(value["friendshipCount"], 1);
    assert!(value.get("metrics").is_none());
}

// =============================================================================
// REQUESTS
// =============================================================================

#[test]
fn test_register_request_defaults_to_public() {
    let request: RegisterRequest =
        serde_json::from_str(r#"{"name":"Ana","username":"ana"}"#).unwrap();
    assert!(!request.is_private);
}

#[test]
fn test_update_settings_request_is_partial() {
    let request: UpdateSettingsRequest = serde_json::from_str(r#"{"isPrivate":true}"#).unwrap();
    assert_eq!(request.is_private, Some(true));
    assert!(request.name.is_none());
    assert!(request.username.is_none());
}

#[test]
fn test_upload_request_requires_audio() {
    let missing: Result<UploadSongRequest, _> = serde_json::from_str(r#"{"title":"x"}"#);
    assert!(missing.is_err());

    let request: UploadSongRequest =
        serde_json::from_str(r#"{"title":"x","audio":"aGk=","isPublic":false}"#).unwrap();
    assert_eq!(request.is_public, Some(false));
    assert!(request.cover.is_none());
}

// =============================================================================
// RESPONSES
// =============================================================================

#[test]
fn test_me_response_uses_username_and_camel_case() {
    let created = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).single().unwrap();
    let mut user = User::new(UserId::new("ana"), "Ana", "ana", true, created);
    user.friends.insert(UserId::new("ben"));
    user.profile_image = Some(MediaRef::new("http://m/a", "audioly/avatars/a"));

    let value = serde_json::to_value(MeResponse::from(user)).unwrap();
    assert_eq!(value["username"], "ana");
    assert_eq!(value["isPrivate"], true);
    assert_eq!(value["friends"], json!(["ben"]));
    assert_eq!(value["friendRequests"], json!([]));
    assert_eq!(value["profileImage"]["storageId"], "audioly/avatars/a");
    assert_eq!(value["createdAt"], "2024-05-01T12:00:00Z");
}

#[test]
fn test_user_summary_wire_names() {
    let user = User::new(UserId::new("ben"), "Ben", "benny", false, Utc::now());
    let value = serde_json::to_value(UserSummary::from(&user)).unwrap();
    assert_eq!(value["username"], "benny");
    assert_eq!(value["isPrivate"], false);
    assert!(value.get("handle").is_none());
}

#[test]
fn test_connection_status_wire_names() {
    let names: Vec<Value> = [
        ConnectionStatus::Myself,
        ConnectionStatus::Friend,
        ConnectionStatus::Sent,
        ConnectionStatus::Received,
        ConnectionStatus::None,
    ]
    .iter()
    .map(|s| serde_json::to_value(s).unwrap())
    .collect();
    assert_eq!(names, vec![json!("self"), json!("friend"), json!("sent"), json!("received"), json!("none")]);
}

#[test]
fn test_play_response() {
    let value = serde_json::to_value(PlayResponse {
        id: SongId::new("s1"),
        play_count: 7,
    })
    .unwrap();
    assert_eq!(value, json!({ "id": "s1", "playCount": 7 }));
}

// =============================================================================
// ERRORS
// =============================================================================

#[test]
fn test_error_kinds_map_to_statuses() {
    assert_eq!(classify(ErrorKind::NotFound), (StatusCode::NOT_FOUND, "not_found"));
    assert_eq!(classify(ErrorKind::Conflict), (StatusCode::CONFLICT, "conflict"));
    assert_eq!(classify(ErrorKind::Unavailable).0, StatusCode::SERVICE_UNAVAILABLE);
}

#[test]
fn test_error_response_round_trip() {
    let body: ErrorResponse =
        serde_json::from_str(r#"{"error":"User not found: x","kind":"not_found"}"#).unwrap();
    assert_eq!(body.kind, "not_found");
}
