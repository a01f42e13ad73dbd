//! # Visibility Engine
//!
//! Single source of truth for "who may see what".
//!
//! Every call site that decides visibility (profile, directory, feed,
//! explore, single-song access) goes through these functions. They are
//! pure: they read the snapshot the caller already obtained and take no
//! locks.
//!
//! ## Rules
//!
//! | Status    | Public account            | Private account |
//! |-----------|---------------------------|-----------------|
//! | self      | all own songs             | all own songs   |
//! | friend    | public songs              | public songs    |
//! | sent      | public songs              | nothing         |
//! | received  | public songs              | nothing         |
//! | none      | public songs              | nothing         |
//!
//! Privacy is account-level; the `is_public` flag is the only item-level
//! switch. There is no friends-only content class.

use crate::catalog::ContentFilter;
use crate::{ConnectionStatus, Song, User, UserId};

/// Classify the relationship of `viewer` to `target`.
///
/// The order of the checks matters: `self` and `friend` are decided before
/// any pending edge is looked at, so a stale request edge can never hide a
/// confirmed friendship.
#[must_use]
pub fn classify(viewer: Option<&User>, target: &User) -> ConnectionStatus {
    let Some(viewer) = viewer else {
        return ConnectionStatus::None;
    };

    if viewer.id == target.id {
        ConnectionStatus::Myself
    } else if target.friends.contains(&viewer.id) {
        ConnectionStatus::Friend
    } else if target.friend_requests.contains(&viewer.id) {
        ConnectionStatus::Sent
    } else if viewer.friend_requests.contains(&target.id) {
        ConnectionStatus::Received
    } else {
        ConnectionStatus::None
    }
}

/// Whether a viewer with `status` may see any of the target's uploads.
///
/// A public account's uploads are reachable by everyone; a private account's
/// only by the owner and confirmed friends.
#[must_use]
pub const fn can_access_uploads(status: ConnectionStatus, target_is_private: bool) -> bool {
    !target_is_private || matches!(status, ConnectionStatus::Myself | ConnectionStatus::Friend)
}

/// Catalog filter describing which of `owner`'s songs the viewer may see.
///
/// Returns `ContentFilter::Nothing` when uploads are not accessible, so the
/// caller never issues a catalog query in that case.
#[must_use]
pub fn select_visible_content(
    status: ConnectionStatus,
    target_is_private: bool,
    owner: &UserId,
) -> ContentFilter {
    if !can_access_uploads(status, target_is_private) {
        ContentFilter::Nothing
    } else if status == ConnectionStatus::Myself {
        ContentFilter::Owner(owner.clone())
    } else {
        ContentFilter::OwnerPublic(owner.clone())
    }
}

/// Whether `viewer` may see a single song owned by `owner`.
#[must_use]
pub fn can_view_song(viewer: Option<&User>, owner: &User, song: &Song) -> bool {
    let status = classify(viewer, owner);
    select_visible_content(status, owner.is_private, &owner.id).matches(song)
}

// =============================================================================
// TESTS
// =============================================================================
