//! # Audioly HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /status` - Store metrics
//! - `POST /users/register` - Create the caller's profile
//! - `GET|PATCH|DELETE /users/me` - Own record, settings, account deletion
//! - `PATCH /users/me/profile` - Name, privacy and avatar
//! - `GET /users?q=` - User directory
//! - `GET /users/friends` - Friends and incoming requests
//! - `POST /users/request/{id}` - Send a friend request
//! - `POST /users/request/{id}/accept` - Accept a friend request
//! - `POST /users/request/{id}/decline` - Decline or cancel a friend request
//! - `GET /users/{id}/profile` - Profile as seen by the caller
//! - `POST /songs` - Upload a song
//! - `GET /songs/mine` - Own songs
//! - `GET /songs/explore` - Public songs
//! - `GET /songs/feed` - Own and friends' songs
//! - `GET /songs/{id}` - Single song
//! - `POST /songs/{id}/play` - Count a play
//! - `GET /media/...` - Stored objects (local object store only)
//!
//! Every endpoint except `/health`, `/status` and `/media` resolves the
//! caller through the `Authorization: Bearer <token>` header.

mod auth;
mod error;
mod handlers;
mod middleware;
mod types;

pub use auth::{AuthUser, MaybeUser};
pub use error::{ApiError, ErrorResponse, classify};
pub use middleware::create_rate_limiter;
pub use types::{
    DeleteAccountResponse, DirectoryQuery, HealthResponse, MeResponse, MessageResponse,
    PlayResponse, RegisterRequest, StatusResponse, UpdateProfileRequest, UpdateSettingsRequest,
    UploadSongRequest, decode_payload,
};

use crate::config::Config;
use crate::identity::IdentityVerifier;
use crate::media::ObjectStore;
use audioly_core::{Session, SocialError};
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, patch, post},
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Router-level settings taken from `Config`.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Requests per second; 0 disables rate limiting.
    pub rate_limit: u32,
    pub cors_origins: Option<String>,
    pub max_body_bytes: usize,
    /// How long a request may wait for the session lock.
    pub store_timeout: Duration,
    /// Served at `/media` when set.
    pub media_dir: Option<PathBuf>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ServerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            rate_limit: config.rate_limit,
            cors_origins: config.cors_origins.clone(),
            max_body_bytes: config.max_body_bytes,
            store_timeout: Duration::from_millis(config.store_timeout_ms),
            media_dir: Some(config.media_dir.clone()),
        }
    }
}

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    /// The session holding the social graph. One writer, many readers.
    pub session: Arc<RwLock<Session>>,
    pub identity: Arc<dyn IdentityVerifier>,
    pub media: Arc<dyn ObjectStore>,
    pub settings: ServerSettings,
}

impl AppState {
    #[must_use]
    pub fn new(
        session: Session,
        identity: Arc<dyn IdentityVerifier>,
        media: Arc<dyn ObjectStore>,
        settings: ServerSettings,
    ) -> Self {
        Self {
            session: Arc::new(RwLock::new(session)),
            identity,
            media,
            settings,
        }
    }

    /// Shared access to the session, bounded by the store timeout.
    pub async fn read(&self) -> Result<RwLockReadGuard<'_, Session>, SocialError> {
        tokio::time::timeout(self.settings.store_timeout, self.session.read())
            .await
            .map_err(|_| lock_timeout(self.settings.store_timeout))
    }

    /// Exclusive access to the session, bounded by the store timeout.
    pub async fn write(&self) -> Result<RwLockWriteGuard<'_, Session>, SocialError> {
        tokio::time::timeout(self.settings.store_timeout, self.session.write())
            .await
            .map_err(|_| lock_timeout(self.settings.store_timeout))
    }
}

fn lock_timeout(waited: Duration) -> SocialError {
    tracing::warn!(event = "store_timeout", waited_ms = waited.as_millis() as u64);
    SocialError::Unavailable(format!("store busy after {} ms", waited.as_millis()))
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

const ALLOWED_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PATCH,
    Method::DELETE,
    Method::OPTIONS,
];

/// Build the CORS layer from the configured origins.
///
/// - `"*"`: allows all origins
/// - unset or no valid entry: localhost only
/// - otherwise: the comma-separated list
fn build_cors_layer(origins: Option<&str>) -> CorsLayer {
    match origins.map(str::trim) {
        Some("*") => {
            tracing::warn!("CORS: Allowing ALL origins (cors_origins = \"*\")");
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .filter_map(|s| match s.parse::<HeaderValue>() {
                    Ok(hv) => {
                        tracing::info!("CORS: Allowing origin: {}", s);
                        Some(hv)
                    }
                    Err(e) => {
                        tracing::warn!("CORS: Invalid origin '{}': {}", s, e);
                        None
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!("CORS: No valid origins configured, defaulting to localhost only");
                build_localhost_cors()
            } else {
                CorsLayer::new()
                    .allow_origin(allowed_origins)
                    .allow_methods(ALLOWED_METHODS)
                    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            }
        }
        None => {
            tracing::info!("CORS: No origins configured, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

/// Only localhost origins.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:5173",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .into_iter()
    .filter_map(|o| o.parse::<HeaderValue>().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(ALLOWED_METHODS)
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. CORS - handles preflight requests
/// 3. Body limit
/// 4. Rate limiting (if enabled)
pub fn create_router(state: AppState) -> Router {
    let settings = state.settings.clone();

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/status", get(handlers::status_handler))
        // Users
        .route("/users", get(handlers::directory_handler))
        .route("/users/register", post(handlers::register_handler))
        .route(
            "/users/me",
            get(handlers::me_handler)
                .patch(handlers::update_settings_handler)
                .delete(handlers::delete_account_handler),
        )
        .route("/users/me/profile", patch(handlers::update_profile_handler))
        .route("/users/friends", get(handlers::friends_handler))
        .route("/users/request/{user_id}", post(handlers::send_request_handler))
        .route("/users/request/{user_id}/accept", post(handlers::accept_request_handler))
        .route("/users/request/{user_id}/decline", post(handlers::decline_request_handler))
        .route("/users/{user_id}/profile", get(handlers::profile_handler))
        // Songs
        .route("/songs", post(handlers::upload_song_handler))
        .route("/songs/mine", get(handlers::my_songs_handler))
        .route("/songs/explore", get(handlers::explore_handler))
        .route("/songs/feed", get(handlers::feed_handler))
        .route("/songs/{song_id}", get(handlers::song_handler))
        .route("/songs/{song_id}/play", post(handlers::play_handler));

    if let Some(dir) = &settings.media_dir {
        router = router.nest_service("/media", ServeDir::new(dir));
    }

    if settings.rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second", settings.rate_limit);
        router = router.layer(axum_middleware::from_fn_with_state(
            create_rate_limiter(settings.rate_limit),
            middleware::rate_limit_middleware,
        ));
    } else {
        tracing::info!("Rate limiting disabled");
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors_layer(settings.cors_origins.as_deref()))
                .layer(axum::extract::DefaultBodyLimit::max(settings.max_body_bytes)),
        )
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server and run until Ctrl-C.
pub async fn run_server(addr: &str, state: AppState) -> Result<(), SocialError> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| SocialError::Unavailable(format!("Bind failed: {}", e)))?;

    tracing::info!("Audioly HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| SocialError::Unavailable(format!("Server error: {}", e)))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
