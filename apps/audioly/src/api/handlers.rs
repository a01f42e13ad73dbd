//! # API Endpoint Handlers
//!
//! Each handler takes the shared `AppState`, acquires the session lock with
//! the configured timeout, and calls exactly one session operation. Media
//! payloads are written to the object store before the lock is taken.

use super::{
    AppState,
    auth::{AuthUser, MaybeUser},
    error::ApiError,
    types::{
        DeleteAccountResponse, DirectoryQuery, HealthResponse, MeResponse, MessageResponse,
        PlayResponse, RegisterRequest, StatusResponse, UpdateProfileRequest,
        UpdateSettingsRequest, UploadSongRequest, decode_payload,
    },
};
use audioly_core::{
    DirectoryEntry, FriendsOverview, ListedSong, MediaRef, NewSong, ProfileView,
    SettingsUpdate, SocialError, SocialMetrics, Song, SongId, UserId,
    primitives::{AUDIO_FOLDER, AVATAR_FOLDER, COVER_FOLDER},
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

type ApiResult<T> = Result<(StatusCode, Json<T>), ApiError>;

fn ok<T>(body: T) -> ApiResult<T> {
    Ok((StatusCode::OK, Json(body)))
}

// =============================================================================
// MEDIA HELPERS
// =============================================================================

/// Decode and store a payload off the async executor.
async fn store_media(
    state: &AppState,
    field: &'static str,
    encoded: &str,
    folder: &'static str,
) -> Result<MediaRef, SocialError> {
    let payload = decode_payload(field, encoded)?;
    let media = state.media.clone();
    tokio::task::spawn_blocking(move || media.upload(&payload, folder))
        .await
        .map_err(|e| SocialError::Storage(format!("media task failed: {}", e)))?
}

/// Best-effort removal; failures are logged and otherwise ignored.
async fn discard_media(state: &AppState, objects: Vec<MediaRef>) {
    if objects.is_empty() {
        return;
    }
    let media = state.media.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        objects
            .iter()
            .filter_map(|object| media.delete(object).err().map(|e| (object.storage_id.clone(), e)))
            .collect::<Vec<_>>()
    })
    .await;

    match outcome {
        Ok(failures) => {
            for (storage_id, error) in failures {
                tracing::warn!(event = "media_cleanup_failed", storage_id = %storage_id, error = %error);
            }
        }
        Err(e) => tracing::warn!(event = "media_cleanup_failed", error = %e),
    }
}

// =============================================================================
// HEALTH / STATUS
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

/// Store metrics.
pub async fn status_handler(State(state): State<AppState>) -> ApiResult<StatusResponse> {
    let session = state.read().await?;
    let metrics = SocialMetrics::from_session(&session)?;
    ok(StatusResponse {
        persistent: session.is_persistent(),
        metrics,
    })
}

// =============================================================================
// ACCOUNT
// =============================================================================

/// Create the profile for the verified identity.
pub async fn register_handler(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<MeResponse> {
    let mut session = state.write().await?;
    let user = session.register(me, &request.name, &request.username, request.is_private)?;
    tracing::info!(event = "user_registered", user = %user.id, handle = %user.handle);
    Ok((StatusCode::CREATED, Json(MeResponse::from(user))))
}

/// The caller's own record.
pub async fn me_handler(State(state): State<AppState>, AuthUser(me): AuthUser) -> ApiResult<MeResponse> {
    let session = state.read().await?;
    let user = session.user(&me)?.ok_or(SocialError::UserNotFound(me))?;
    ok(MeResponse::from(user))
}

/// Update name, username and privacy.
pub async fn update_settings_handler(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
    Json(request): Json<UpdateSettingsRequest>,
) -> ApiResult<MeResponse> {
    let update = SettingsUpdate {
        name: request.name,
        handle: request.username,
        is_private: request.is_private,
    };
    let mut session = state.write().await?;
    let user = session.update_settings(&me, update)?;
    tracing::info!(event = "settings_updated", user = %user.id, is_private = user.is_private);
    ok(MeResponse::from(user))
}

/// Update the profile, optionally replacing the avatar.
pub async fn update_profile_handler(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
    Json(request): Json<UpdateProfileRequest>,
) -> ApiResult<MeResponse> {
    let avatar = match request.avatar.as_deref() {
        Some(encoded) => Some(store_media(&state, "avatar", encoded, AVATAR_FOLDER).await?),
        None => None,
    };

    let update = SettingsUpdate {
        name: request.name,
        handle: None,
        is_private: request.is_private,
    };
    let outcome = match state.write().await {
        Ok(mut session) => session.update_profile(&me, update, avatar.clone()),
        Err(e) => Err(e),
    };

    match outcome {
        Ok((user, replaced)) => {
            discard_media(&state, replaced.into_iter().collect()).await;
            tracing::info!(event = "profile_updated", user = %user.id);
            ok(MeResponse::from(user))
        }
        Err(e) => {
            discard_media(&state, avatar.into_iter().collect()).await;
            Err(e.into())
        }
    }
}

/// Delete the caller's account and their media.
pub async fn delete_account_handler(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
) -> ApiResult<DeleteAccountResponse> {
    let orphaned = {
        let mut session = state.write().await?;
        session.delete_account(&me)?
    };
    let removed_media = orphaned.len();
    discard_media(&state, orphaned).await;
    tracing::info!(event = "account_deleted", user = %me, removed_media);
    ok(DeleteAccountResponse {
        message: "Account deleted".to_string(),
        removed_media,
    })
}

// =============================================================================
// DIRECTORY
// =============================================================================

/// List users other than the caller.
pub async fn directory_handler(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Query(query): Query<DirectoryQuery>,
) -> ApiResult<Vec<DirectoryEntry>> {
    let session = state.read().await?;
    ok(session.search(viewer.id(), query.q.as_deref())?)
}

/// Friends and incoming requests of the caller.
pub async fn friends_handler(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
) -> ApiResult<FriendsOverview> {
    let session = state.read().await?;
    ok(session.friends_overview(&me)?)
}

/// A profile page as seen by the caller.
pub async fn profile_handler(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(target): Path<String>,
) -> ApiResult<ProfileView> {
    let session = state.read().await?;
    let view = session.profile(viewer.id(), &UserId::new(target))?;
    tracing::debug!(
        event = "profile_viewed",
        target = %view.id,
        connection_status = ?view.connection_status,
        can_see_uploads = view.can_see_uploads
    );
    ok(view)
}

// =============================================================================
// FRIEND REQUESTS
// =============================================================================

/// Send a friend request to `target`.
pub async fn send_request_handler(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
    Path(target): Path<String>,
) -> ApiResult<MessageResponse> {
    let target = UserId::new(target);
    let mut session = state.write().await?;
    session.send_request(&me, &target)?;
    tracing::info!(event = "friend_request_sent", requester = %me, target = %target);
    ok(MessageResponse::new("Friend request sent"))
}

/// Accept the request `requester` sent to the caller.
pub async fn accept_request_handler(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
    Path(requester): Path<String>,
) -> ApiResult<MessageResponse> {
    let requester = UserId::new(requester);
    let mut session = state.write().await?;
    session.accept_request(&me, &requester)?;
    tracing::info!(event = "friend_request_accepted", target = %me, requester = %requester);
    ok(MessageResponse::new("Friend request accepted"))
}

/// Decline an incoming request or cancel an outgoing one.
pub async fn decline_request_handler(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
    Path(other): Path<String>,
) -> ApiResult<MessageResponse> {
    let other = UserId::new(other);
    let mut session = state.write().await?;
    session.decline_or_cancel_request(&me, &other)?;
    tracing::info!(event = "friend_request_declined", user = %me, other = %other);
    ok(MessageResponse::new("Friend request declined"))
}

// =============================================================================
// SONGS
// =============================================================================

/// Store the payloads, then create the song record.
pub async fn upload_song_handler(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
    Json(request): Json<UploadSongRequest>,
) -> ApiResult<Song> {
    if request.title.trim().is_empty() {
        return Err(SocialError::InvalidInput("title is required".into()).into());
    }

    let media = store_media(&state, "audio", &request.audio, AUDIO_FOLDER).await?;
    let cover = match request.cover.as_deref() {
        Some(encoded) => match store_media(&state, "cover", encoded, COVER_FOLDER).await {
            Ok(cover) => Some(cover),
            Err(e) => {
                discard_media(&state, vec![media]).await;
                return Err(e.into());
            }
        },
        None => None,
    };

    let stored: Vec<MediaRef> = std::iter::once(media.clone()).chain(cover.clone()).collect();
    let new_song = NewSong {
        title: request.title,
        category: request.category,
        is_public: request.is_public,
        media,
        cover,
    };

    let outcome = match state.write().await {
        Ok(mut session) => session.upload(&me, new_song),
        Err(e) => Err(e),
    };

    match outcome {
        Ok(song) => {
            tracing::info!(event = "song_uploaded", owner = %me, song = %song.id, is_public = song.is_public);
            Ok((StatusCode::CREATED, Json(song)))
        }
        Err(e) => {
            discard_media(&state, stored).await;
            Err(e.into())
        }
    }
}

/// All of the caller's songs.
pub async fn my_songs_handler(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
) -> ApiResult<Vec<Song>> {
    let session = state.read().await?;
    ok(session.mine(&me)?)
}

/// Public songs the viewer may access.
pub async fn explore_handler(
    State(state): State<AppState>,
    viewer: MaybeUser,
) -> ApiResult<Vec<ListedSong>> {
    let session = state.read().await?;
    ok(session.explore(viewer.id())?)
}

/// The caller's songs and their friends' public songs.
pub async fn feed_handler(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
) -> ApiResult<Vec<ListedSong>> {
    let session = state.read().await?;
    ok(session.feed(&me)?)
}

/// A single song, if visible to the viewer.
pub async fn song_handler(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(id): Path<String>,
) -> ApiResult<Song> {
    let session = state.read().await?;
    ok(session.song(viewer.id(), &SongId::new(id))?)
}

/// Count one play of a visible song.
pub async fn play_handler(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Path(id): Path<String>,
) -> ApiResult<PlayResponse> {
    let id = SongId::new(id);
    let mut session = state.write().await?;
    let play_count = session.record_play(viewer.id(), &id)?;
    ok(PlayResponse { id, play_count })
}
