//! # Directory
//!
//! User discovery and profile views, composed from the relationship edges,
//! the visibility engine and the content catalog.

use crate::catalog::{ContentFilter, load_viewer};
use crate::primitives::{DIRECTORY_WINDOW, MAX_QUERY_LENGTH};
use crate::store::SocialStore;
use crate::visibility::{can_access_uploads, classify, select_visible_content};
use crate::{ConnectionStatus, MediaRef, SocialError, Song, User, UserId, UserSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One row of the user directory, as seen by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    pub id: UserId,
    pub name: String,
    #[serde(rename = "username")]
    pub handle: String,
    pub profile_image: Option<MediaRef>,
    pub is_private: bool,
    pub is_friend: bool,
    /// The caller has a pending request to this user.
    pub sent_request: bool,
    /// This user has a pending request to the caller.
    pub incoming_request: bool,
    /// Public songs only, whatever the caller's relationship.
    pub songs_count: usize,
    pub created_at: DateTime<Utc>,
}

/// A profile page as seen by the viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub id: UserId,
    pub name: String,
    #[serde(rename = "username")]
    pub handle: String,
    pub is_private: bool,
    pub profile_image: Option<MediaRef>,
    pub friends_count: usize,
    /// Number of uploads the viewer can see, not the owner's total.
    pub uploads_count: usize,
    pub connection_status: ConnectionStatus,
    pub can_see_uploads: bool,
    pub uploads: Vec<Song>,
}

/// The caller's friends and incoming requests.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendsOverview {
    pub friends: Vec<UserSummary>,
    pub incoming_requests: Vec<UserSummary>,
}

/// Directory queries.
pub struct Directory;

impl Directory {
    /// List users other than the caller, newest accounts first.
    ///
    /// `query`, if non-blank, keeps only users whose name or handle contains
    /// it, ignoring case. A query longer than `MAX_QUERY_LENGTH` bytes is
    /// `InvalidInput`. At most `DIRECTORY_WINDOW` entries are returned.
    pub fn search<S: SocialStore + ?Sized>(
        store: &S,
        caller: Option<&UserId>,
        query: Option<&str>,
    ) -> Result<Vec<DirectoryEntry>, SocialError> {
        let needle = query.map(str::trim).filter(|q| !q.is_empty());
        if needle.is_some_and(|q| q.len() > MAX_QUERY_LENGTH) {
            return Err(SocialError::InvalidInput(format!(
                "query exceeds {} bytes",
                MAX_QUERY_LENGTH
            )));
        }
        let me = load_viewer(store, caller)?;
        let needle = needle.map(str::to_lowercase);

        let mut candidates: Vec<User> = store
            .users()?
            .into_iter()
            .filter(|u| caller != Some(&u.id))
            .filter(|u| match &needle {
                Some(n) => u.name.to_lowercase().contains(n) || u.handle.contains(n),
                None => true,
            })
            .collect();

        candidates.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        candidates.truncate(DIRECTORY_WINDOW);

        let mut entries = Vec::with_capacity(candidates.len());
        for user in candidates {
            let status = classify(me.as_ref(), &user);
            let songs_count = store.count_songs(&ContentFilter::OwnerPublic(user.id.clone()))?;
            entries.push(DirectoryEntry {
                is_friend: status == ConnectionStatus::Friend,
                sent_request: status == ConnectionStatus::Sent,
                incoming_request: status == ConnectionStatus::Received,
                songs_count,
                id: user.id,
                name: user.name,
                handle: user.handle,
                profile_image: user.profile_image,
                is_private: user.is_private,
                created_at: user.created_at,
            });
        }
        Ok(entries)
    }

    /// Build the profile of `target` as seen by `viewer`.
    ///
    /// When the uploads are not accessible no catalog query is issued and
    /// `uploads` is empty.
    pub fn profile<S: SocialStore + ?Sized>(
        store: &S,
        viewer: Option<&UserId>,
        target: &UserId,
    ) -> Result<ProfileView, SocialError> {
        let target = store
            .user(target)?
            .ok_or_else(|| SocialError::UserNotFound(target.clone()))?;
        let viewer = load_viewer(store, viewer)?;

        let status = classify(viewer.as_ref(), &target);
        let can_see_uploads = can_access_uploads(status, target.is_private);
        let uploads = store.songs(&select_visible_content(
            status,
            target.is_private,
            &target.id,
        ))?;

        Ok(ProfileView {
            friends_count: target.friends.len(),
            uploads_count: uploads.len(),
            connection_status: status,
            can_see_uploads,
            uploads,
            id: target.id,
            name: target.name,
            handle: target.handle,
            is_private: target.is_private,
            profile_image: target.profile_image,
        })
    }

    /// Summaries of the user's friends and of everyone with a pending request
    /// to them. Dangling ids are skipped.
    pub fn friends_overview<S: SocialStore + ?Sized>(
        store: &S,
        id: &UserId,
    ) -> Result<FriendsOverview, SocialError> {
        let me = store
            .user(id)?
            .ok_or_else(|| SocialError::UserNotFound(id.clone()))?;

        let summaries = |ids: &BTreeSet<UserId>| -> Result<Vec<UserSummary>, SocialError> {
            let mut out = Vec::with_capacity(ids.len());
            for other in ids {
                if let Some(user) = store.user(other)? {
                    out.push(UserSummary::from(&user));
                }
            }
            Ok(out)
        };

        Ok(FriendsOverview {
            friends: summaries(&me.friends)?,
            incoming_requests: summaries(&me.friend_requests)?,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
