//! # CLI Command Implementations
//!
//! Each command opens the configured store, runs one session operation and
//! prints the result as text or, with `--json-mode`, as JSON.

use crate::api::{self, AppState, ServerSettings};
use crate::config::{Backend, Config};
use crate::identity::TokenTable;
use crate::media::LocalObjectStore;
use audioly_core::{Session, SocialError, SocialMetrics, UserId};
use serde::Serialize;
use std::sync::Arc;

fn print_json<T: Serialize>(value: &T) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

fn user_id(raw: &str) -> Result<UserId, SocialError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(SocialError::InvalidInput("user id must not be empty".into()));
    }
    Ok(UserId::new(trimmed))
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(config: &Config) -> Result<(), SocialError> {
    let session = load_or_create_session(config)?;

    let identity = match &config.tokens_file {
        Some(path) => TokenTable::from_file(path)?,
        None => TokenTable::default(),
    };
    if identity.is_empty() {
        tracing::warn!(
            "No bearer tokens configured - only anonymous endpoints will succeed. \
             Set tokens_file or AUDIOLY_TOKENS_FILE."
        );
    } else {
        tracing::info!("Identity table loaded: {} tokens", identity.len());
    }

    let media = LocalObjectStore::new(&config.media_dir, config.media_url())?;

    println!("Audioly Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Address:  {}", config.bind_addr());
    println!("  Backend:  {}", config.backend);
    println!("  Database: {}", config.database.display());
    println!("  Media:    {} ({})", media.root().display(), config.media_url());
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let state = AppState::new(
        session,
        Arc::new(identity),
        Arc::new(media),
        ServerSettings::from_config(config),
    );
    api::run_server(&config.bind_addr(), state).await
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show store metrics.
pub fn cmd_status(config: &Config, json_mode: bool) -> Result<(), SocialError> {
    let session = load_or_create_session(config)?;
    let metrics = SocialMetrics::from_session(&session)?;

    if json_mode {
        let output = serde_json::json!({
            "database": config.database.to_string_lossy(),
            "backend": config.backend.to_string(),
            "metrics": metrics,
        });
        print_json(&output);
        return Ok(());
    }

    println!("Audioly Store Status");
    println!("====================");
    println!("Database: {}", config.database.display());
    println!("Backend:  {}", config.backend);
    println!();
    println!("Users:            {} ({} private)", metrics.user_count, metrics.private_user_count);
    println!("Songs:            {} ({} public)", metrics.song_count, metrics.public_song_count);
    println!("Friendships:      {}", metrics.friendship_count);
    println!("Pending requests: {}", metrics.pending_request_count);

    Ok(())
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Initialize new database.
pub fn cmd_init(config: &Config, force: bool) -> Result<(), SocialError> {
    if config.backend == Backend::Memory {
        return Err(SocialError::InvalidInput(
            "the memory backend has nothing to initialize".to_string(),
        ));
    }

    let path = &config.database;
    if path.exists() {
        if !force {
            return Err(SocialError::InvalidInput(
                "Database already exists. Use --force to overwrite.".to_string(),
            ));
        }
        std::fs::remove_file(path)
            .map_err(|e| SocialError::Storage(format!("cannot remove '{}': {}", path.display(), e)))?;
    }

    let _session = Session::with_redb(path)?;
    println!("Initialized new redb database at {}", path.display());
    Ok(())
}

// =============================================================================
// ACCOUNT AND RELATIONSHIP COMMANDS
// =============================================================================

/// Create a profile.
pub fn cmd_register(
    config: &Config,
    json_mode: bool,
    id: &str,
    name: &str,
    username: &str,
    private: bool,
) -> Result<(), SocialError> {
    let mut session = load_or_create_session(config)?;
    let user = session.register(user_id(id)?, name, username, private)?;

    if json_mode {
        print_json(&api::MeResponse::from(user));
    } else {
        let visibility = if user.is_private { "private" } else { "public" };
        println!("Registered {} (@{}, {})", user.id, user.handle, visibility);
    }
    Ok(())
}

/// Send a friend request.
pub fn cmd_request(config: &Config, json_mode: bool, from: &str, to: &str) -> Result<(), SocialError> {
    let (from, to) = (user_id(from)?, user_id(to)?);
    let mut session = load_or_create_session(config)?;
    session.send_request(&from, &to)?;
    report(json_mode, format!("Friend request sent from {} to {}", from, to));
    Ok(())
}

/// Accept a friend request.
pub fn cmd_accept(
    config: &Config,
    json_mode: bool,
    user: &str,
    requester: &str,
) -> Result<(), SocialError> {
    let (user, requester) = (user_id(user)?, user_id(requester)?);
    let mut session = load_or_create_session(config)?;
    session.accept_request(&user, &requester)?;
    report(json_mode, format!("{} and {} are now friends", user, requester));
    Ok(())
}

/// Decline or cancel a friend request.
pub fn cmd_decline(config: &Config, json_mode: bool, user: &str, other: &str) -> Result<(), SocialError> {
    let (user, other) = (user_id(user)?, user_id(other)?);
    let mut session = load_or_create_session(config)?;
    session.decline_or_cancel_request(&user, &other)?;
    report(json_mode, format!("Requests between {} and {} removed", user, other));
    Ok(())
}

fn report(json_mode: bool, message: String) {
    if json_mode {
        print_json(&api::MessageResponse::new(message));
    } else {
        println!("{}", message);
    }
}

// =============================================================================
// DIRECTORY COMMANDS
// =============================================================================

/// List the directory as seen by `caller`.
pub fn cmd_users(
    config: &Config,
    json_mode: bool,
    caller: Option<&str>,
    query: Option<&str>,
) -> Result<(), SocialError> {
    let caller = caller.map(user_id).transpose()?;
    let session = load_or_create_session(config)?;
    let entries = session.search(caller.as_ref(), query)?;

    if json_mode {
        print_json(&entries);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No users found");
        return Ok(());
    }
    for entry in &entries {
        let relation = if entry.is_friend {
            "friend"
        } else if entry.sent_request {
            "request sent"
        } else if entry.incoming_request {
            "request received"
        } else {
            "-"
        };
        let lock = if entry.is_private { " [private]" } else { "" };
        println!(
            "{:<24} @{:<20} songs: {:<4} {}{}",
            entry.name, entry.handle, entry.songs_count, relation, lock
        );
    }
    Ok(())
}

/// Show a profile as seen by `viewer`.
pub fn cmd_profile(
    config: &Config,
    json_mode: bool,
    target: &str,
    viewer: Option<&str>,
) -> Result<(), SocialError> {
    let target = user_id(target)?;
    let viewer = viewer.map(user_id).transpose()?;
    let session = load_or_create_session(config)?;
    let view = session.profile(viewer.as_ref(), &target)?;

    if json_mode {
        print_json(&view);
        return Ok(());
    }

    println!("{} (@{})", view.name, view.handle);
    println!("Private:    {}", view.is_private);
    println!("Friends:    {}", view.friends_count);
    println!("Connection: {}", view.connection_status);
    if !view.can_see_uploads {
        println!("Uploads:    hidden");
        return Ok(());
    }
    println!("Uploads:    {}", view.uploads_count);
    for song in &view.uploads {
        let scope = if song.is_public { "public" } else { "private" };
        println!("  - {} [{}] plays: {}", song.title, scope, song.play_count);
    }
    Ok(())
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Open the configured store.
pub fn load_or_create_session(config: &Config) -> Result<Session, SocialError> {
    match config.backend {
        Backend::Redb => Session::with_redb(&config.database),
        Backend::Memory => Ok(Session::new()),
    }
}
