//! # Content Catalog
//!
//! Per-owner song records and the listing queries over them.
//!
//! The catalog never decides visibility on its own: every listing that crosses
//! an ownership boundary asks the visibility engine for a `ContentFilter`
//! first and only then reads records.

use crate::primitives::{LISTING_WINDOW, MAX_CATEGORY_LENGTH, MAX_TITLE_LENGTH};
use crate::store::SocialStore;
use crate::visibility::{can_view_song, classify, select_visible_content};
use crate::{ListedSong, MediaRef, SocialError, Song, SongId, User, UserId, UserSummary};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

// =============================================================================
// CONTENT FILTER
// =============================================================================

/// Which songs a catalog query should return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentFilter {
    /// No songs at all. The store returns without reading.
    Nothing,
    /// Every song of the owner, public or not.
    Owner(UserId),
    /// Only the owner's public songs.
    OwnerPublic(UserId),
    /// Every public song in the catalog.
    Public,
}

impl ContentFilter {
    /// Check whether a song passes the filter.
    #[must_use]
    pub fn matches(&self, song: &Song) -> bool {
        match self {
            Self::Nothing => false,
            Self::Owner(owner) => &song.owner == owner,
            Self::OwnerPublic(owner) => &song.owner == owner && song.is_public,
            Self::Public => song.is_public,
        }
    }

    #[must_use]
    pub fn is_nothing(&self) -> bool {
        matches!(self, Self::Nothing)
    }
}

/// Sort songs newest first; ties broken by id so order is stable.
pub fn sort_newest_first(songs: &mut [Song]) {
    songs.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

// =============================================================================
// UPLOAD REQUEST
// =============================================================================

/// A song about to be created. Media has already been stored.
#[derive(Debug, Clone)]
pub struct NewSong {
    pub title: String,
    pub category: Option<String>,
    /// Requested visibility; `None` means public.
    pub is_public: Option<bool>,
    pub media: MediaRef,
    pub cover: Option<MediaRef>,
}

/// Load the viewer record. An unknown id is treated as anonymous.
pub(crate) fn load_viewer<S: SocialStore + ?Sized>(
    store: &S,
    viewer: Option<&UserId>,
) -> Result<Option<User>, SocialError> {
    match viewer {
        Some(id) => store.user(id),
        None => Ok(None),
    }
}

fn require_user<S: SocialStore + ?Sized>(store: &S, id: &UserId) -> Result<User, SocialError> {
    store
        .user(id)?
        .ok_or_else(|| SocialError::UserNotFound(id.clone()))
}

// =============================================================================
// CATALOG OPERATIONS
// =============================================================================

/// Song creation and listing.
pub struct Catalog;

impl Catalog {
    /// Create a song owned by `owner`.
    ///
    /// A private account's songs are always stored private, whatever the
    /// request says.
    pub fn upload<S: SocialStore + ?Sized>(
        store: &mut S,
        owner: &UserId,
        request: NewSong,
        now: DateTime<Utc>,
    ) -> Result<Song, SocialError> {
        let owner_record = require_user(store, owner)?;

        let title = request.title.trim();
        if title.is_empty() {
            return Err(SocialError::InvalidInput("title is required".into()));
        }
        if title.len() > MAX_TITLE_LENGTH {
            return Err(SocialError::InvalidInput(format!(
                "title exceeds {} bytes",
                MAX_TITLE_LENGTH
            )));
        }

        let category = match request.category.as_deref().map(str::trim) {
            Some(c) if c.len() > MAX_CATEGORY_LENGTH => {
                return Err(SocialError::InvalidInput(format!(
                    "category exceeds {} bytes",
                    MAX_CATEGORY_LENGTH
                )));
            }
            Some(c) if !c.is_empty() => Some(c.to_string()),
            _ => None,
        };

        let is_public = request.is_public.unwrap_or(true) && !owner_record.is_private;

        let song = Song {
            id: SongId::generate(),
            owner: owner.clone(),
            title: title.to_string(),
            category,
            media: request.media,
            cover: request.cover,
            is_public,
            play_count: 0,
            created_at: now,
        };
        store.insert_song(&song)?;
        Ok(song)
    }

    /// All of the owner's songs, newest first.
    pub fn mine<S: SocialStore + ?Sized>(
        store: &S,
        owner: &UserId,
    ) -> Result<Vec<Song>, SocialError> {
        require_user(store, owner)?;
        store.songs(&ContentFilter::Owner(owner.clone()))
    }

    /// Public songs the viewer may reach, newest first, capped.
    ///
    /// Public songs of private accounts are only listed for the owner and
    /// the owner's friends.
    pub fn explore<S: SocialStore + ?Sized>(
        store: &S,
        viewer: Option<&UserId>,
    ) -> Result<Vec<ListedSong>, SocialError> {
        let viewer = load_viewer(store, viewer)?;
        let mut owners: BTreeMap<UserId, Option<User>> = BTreeMap::new();
        let mut listed = Vec::new();

        for song in store.songs(&ContentFilter::Public)? {
            if listed.len() >= LISTING_WINDOW {
                break;
            }
            if !owners.contains_key(&song.owner) {
                let record = store.user(&song.owner)?;
                owners.insert(song.owner.clone(), record);
            }
            let Some(Some(owner)) = owners.get(&song.owner) else {
                continue;
            };
            if can_view_song(viewer.as_ref(), owner, &song) {
                listed.push(ListedSong {
                    owner_summary: UserSummary::from(owner),
                    song,
                });
            }
        }
        Ok(listed)
    }

    /// The viewer's own songs plus their friends' public songs, newest first,
    /// capped.
    pub fn feed<S: SocialStore + ?Sized>(
        store: &S,
        viewer: &UserId,
    ) -> Result<Vec<ListedSong>, SocialError> {
        let me = require_user(store, viewer)?;

        let mut listed = Vec::new();
        for song in store.songs(&ContentFilter::Owner(me.id.clone()))? {
            listed.push(ListedSong {
                owner_summary: UserSummary::from(&me),
                song,
            });
        }

        for friend_id in &me.friends {
            // Dangling edges are skipped rather than reported.
            let Some(friend) = store.user(friend_id)? else {
                continue;
            };
            let status = classify(Some(&me), &friend);
            let filter = select_visible_content(status, friend.is_private, &friend.id);
            let summary = UserSummary::from(&friend);
            for song in store.songs(&filter)? {
                listed.push(ListedSong {
                    owner_summary: summary.clone(),
                    song,
                });
            }
        }

        listed.sort_by(|a, b| {
            b.song
                .created_at
                .cmp(&a.song.created_at)
                .then_with(|| a.song.id.cmp(&b.song.id))
        });
        listed.truncate(LISTING_WINDOW);
        Ok(listed)
    }

    /// A single song, if the viewer may see it.
    ///
    /// An invisible song is reported exactly like a missing one.
    pub fn song<S: SocialStore + ?Sized>(
        store: &S,
        viewer: Option<&UserId>,
        id: &SongId,
    ) -> Result<Song, SocialError> {
        let not_found = || SocialError::SongNotFound(id.clone());

        let song = store.song(id)?.ok_or_else(not_found)?;
        let owner = store.user(&song.owner)?.ok_or_else(not_found)?;
        let viewer = load_viewer(store, viewer)?;

        if can_view_song(viewer.as_ref(), &owner, &song) {
            Ok(song)
        } else {
            Err(not_found())
        }
    }

    /// Count one play of a visible song. Returns the new play count.
    pub fn record_play<S: SocialStore + ?Sized>(
        store: &mut S,
        viewer: Option<&UserId>,
        id: &SongId,
    ) -> Result<u64, SocialError> {
        Self::song(store, viewer, id)?;
        store
            .increment_play_count(id)?
            .ok_or_else(|| SocialError::SongNotFound(id.clone()))
    }
}

// =============================================================================
// TESTS
// =============================================================================
