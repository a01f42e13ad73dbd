//! # Accounts
//!
//! Profile records for externally verified identities.
//!
//! The core never mints user ids: `register` attaches a profile to an id the
//! identity layer has already verified.

use crate::catalog::ContentFilter;
use crate::primitives::{validate_handle, validate_name};
use crate::store::SocialStore;
use crate::{MediaRef, SocialError, User, UserId};
use chrono::{DateTime, Utc};

/// Partial update of a user's settings. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct SettingsUpdate {
    pub name: Option<String>,
    pub handle: Option<String>,
    pub is_private: Option<bool>,
}

/// Account lifecycle operations.
pub struct Accounts;

impl Accounts {
    /// Create the profile record for a verified identity.
    pub fn register<S: SocialStore + ?Sized>(
        store: &mut S,
        id: UserId,
        name: &str,
        handle: &str,
        is_private: bool,
        now: DateTime<Utc>,
    ) -> Result<User, SocialError> {
        let name = validate_name(name)?;
        let handle = validate_handle(handle)?;

        let user = User::new(id, name, &handle, is_private, now);
        store.insert_user(&user)?;
        Ok(user)
    }

    /// Apply a settings update and return the new record.
    ///
    /// A blank name is ignored. A new handle is normalized and must not belong
    /// to another account. Switching to private does not touch existing songs.
    pub fn update_settings<S: SocialStore + ?Sized>(
        store: &mut S,
        id: &UserId,
        update: SettingsUpdate,
    ) -> Result<User, SocialError> {
        Self::update_profile(store, id, update, None).map(|(user, _)| user)
    }

    /// Replace the profile image. Returns the updated record and the image
    /// it replaced, if any.
    pub fn set_profile_image<S: SocialStore + ?Sized>(
        store: &mut S,
        id: &UserId,
        image: MediaRef,
    ) -> Result<(User, Option<MediaRef>), SocialError> {
        Self::update_profile(store, id, SettingsUpdate::default(), Some(image))
    }

    /// Apply a settings update and an optional new profile image in one
    /// write. Nothing is stored if any field is rejected.
    ///
    /// Returns the updated record and the image it replaced, if any.
    pub fn update_profile<S: SocialStore + ?Sized>(
        store: &mut S,
        id: &UserId,
        update: SettingsUpdate,
        image: Option<MediaRef>,
    ) -> Result<(User, Option<MediaRef>), SocialError> {
        let mut user = store
            .user(id)?
            .ok_or_else(|| SocialError::UserNotFound(id.clone()))?;

        let provided = |value: &&str| !value.trim().is_empty();
        if let Some(name) = update.name.as_deref().filter(provided) {
            user.name = validate_name(name)?.to_string();
        }
        if let Some(handle) = update.handle.as_deref().filter(provided) {
            user.handle = validate_handle(handle)?;
        }
        if let Some(is_private) = update.is_private {
            user.is_private = is_private;
        }
        let previous = match image {
            Some(image) => user.profile_image.replace(image),
            None => None,
        };

        store.put_users(std::slice::from_ref(&user))?;
        Ok((user, previous))
    }

    /// Delete an account, its songs and every edge pointing at it.
    ///
    /// Returns the media references that no longer have an owner, so the
    /// caller can remove them from the object store.
    pub fn delete_account<S: SocialStore + ?Sized>(
        store: &mut S,
        id: &UserId,
    ) -> Result<Vec<MediaRef>, SocialError> {
        let user = store
            .user(id)?
            .ok_or_else(|| SocialError::UserNotFound(id.clone()))?;

        let mut orphaned = Vec::new();
        for song in store.songs(&ContentFilter::Owner(id.clone()))? {
            orphaned.push(song.media);
            orphaned.extend(song.cover);
        }
        orphaned.extend(user.profile_image);

        let mut neighbors = Vec::new();
        for mut other in store.users()? {
            if &other.id == id {
                continue;
            }
            let was_friend = other.friends.remove(id);
            let had_request = other.friend_requests.remove(id);
            if was_friend || had_request {
                neighbors.push(other);
            }
        }

        store.remove_user(id, &neighbors)?;
        Ok(orphaned)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, NewSong};
    use crate::primitives::MAX_NAME_LENGTH;
    use crate::relationship::Relationships;
    use crate::store::MemoryStore;

    fn register(store: &mut MemoryStore, id: &str, handle: &str) -> UserId {
        Accounts::register(store, UserId::new(id), id, handle, false, Utc::now())
            .expect("register")
            .id
    }

    #[test]
    fn register_normalizes_handle() {
        let mut store = MemoryStore::new();
        let user = Accounts::register(
            &mut store,
            UserId::new("u1"),
            "  Jo  ",
            " JoBeats ",
            true,
            Utc::now(),
        )
        .expect("register");
        assert_eq!(user.name, "Jo");
        assert_eq!(user.handle, "jobeats");
        assert!(user.is_private);
        assert!(store.user_by_handle("jobeats").expect("read").is_some());
    }

    #[test]
    fn register_conflicts() {
        let mut store = MemoryStore::new();
        register(&mut store, "u1", "jo");

        let taken = Accounts::register(&mut store, UserId::new("u2"), "x", "JO", false, Utc::now());
        assert!(matches!(taken, Err(SocialError::HandleTaken(_))));

        let twice = Accounts::register(&mut store, UserId::new("u1"), "x", "other", false, Utc::now());
        assert!(matches!(twice, Err(SocialError::AlreadyRegistered(_))));

        let blank = Accounts::register(&mut store, UserId::new("u3"), " ", "h", false, Utc::now());
        assert!(matches!(blank, Err(SocialError::InvalidInput(_))));
    }

    #[test]
    fn update_settings_partial() {
        let mut store = MemoryStore::new();
        let id = register(&mut store, "u1", "one");
        register(&mut store, "u2", "two");

        let updated = Accounts::update_settings(
            &mut store,
            &id,
            SettingsUpdate {
                name: Some(String::new()),
                handle: Some(" NewOne ".into()),
                is_private: Some(true),
            },
        )
        .expect("update");
        assert_eq!(updated.name, "u1");
        assert_eq!(updated.handle, "newone");
        assert!(updated.is_private);
        assert!(store.user_by_handle("one").expect("read").is_none());

        let clash = Accounts::update_settings(
            &mut store,
            &id,
            SettingsUpdate {
                handle: Some("TWO".into()),
                ..SettingsUpdate::default()
            },
        );
        assert!(matches!(clash, Err(SocialError::HandleTaken(_))));

        // Keeping one's own handle is not a clash.
        Accounts::update_settings(
            &mut store,
            &id,
            SettingsUpdate {
                handle: Some("newone".into()),
                ..SettingsUpdate::default()
            },
        )
        .expect("same handle");
    }

    #[test]
    fn profile_image_replacement() {
        let mut store = MemoryStore::new();
        let id = register(&mut store, "u1", "one");

        let (_, previous) =
            Accounts::set_profile_image(&mut store, &id, MediaRef::new("a", "1")).expect("set");
        assert!(previous.is_none());
        let (user, previous) =
            Accounts::set_profile_image(&mut store, &id, MediaRef::new("b", "2")).expect("set");
        assert_eq!(previous, Some(MediaRef::new("a", "1")));
        assert_eq!(user.profile_image, Some(MediaRef::new("b", "2")));
    }

    #[test]
    fn update_profile_is_all_or_nothing() {
        let mut store = MemoryStore::new();
        let id = register(&mut store, "u1", "one");
        Accounts::set_profile_image(&mut store, &id, MediaRef::new("a", "1")).expect("set");

        let (user, previous) = Accounts::update_profile(
            &mut store,
            &id,
            SettingsUpdate {
                name: Some("Renamed".into()),
                is_private: Some(true),
                ..SettingsUpdate::default()
            },
            Some(MediaRef::new("b", "2")),
        )
        .expect("update");
        assert_eq!(user.name, "Renamed");
        assert!(user.is_private);
        assert_eq!(previous, Some(MediaRef::new("a", "1")));

        // A rejected name leaves privacy and image untouched.
        let too_long = "x".repeat(MAX_NAME_LENGTH + 1);
        let rejected = Accounts::update_profile(
            &mut store,
            &id,
            SettingsUpdate {
                name: Some(too_long),
                is_private: Some(false),
                ..SettingsUpdate::default()
            },
            Some(MediaRef::new("c", "3")),
        );
        assert!(matches!(rejected, Err(SocialError::InvalidInput(_))));

        let stored = store.user(&id).expect("read").expect("present");
        assert_eq!(stored.name, "Renamed");
        assert!(stored.is_private);
        assert_eq!(stored.profile_image, Some(MediaRef::new("b", "2")));

        // Without an image the current one is kept.
        let (user, previous) =
            Accounts::update_profile(&mut store, &id, SettingsUpdate::default(), None)
                .expect("noop");
        assert!(previous.is_none());
        assert_eq!(user.profile_image, Some(MediaRef::new("b", "2")));
    }

    #[test]
    fn delete_account_strips_edges_and_songs() {
        let mut store = MemoryStore::new();
        let gone = register(&mut store, "gone", "gone");
        let friend = register(&mut store, "friend", "friend");
        let target = register(&mut store, "target", "target");

        Relationships::accept_request(&mut store, &friend, &gone).expect("friends");
        Relationships::send_request(&mut store, &gone, &target).expect("request");
        let request = NewSong {
            title: "t".into(),
            category: None,
            is_public: None,
            media: MediaRef::new("song", "s1"),
            cover: Some(MediaRef::new("cover", "c1")),
        };
        Catalog::upload(&mut store, &gone, request, Utc::now()).expect("upload");

        let orphaned = Accounts::delete_account(&mut store, &gone).expect("delete");
        assert_eq!(orphaned.len(), 2);

        assert!(store.user(&gone).expect("read").is_none());
        assert_eq!(store.song_count().expect("count"), 0);
        assert!(Relationships::friends_of(&store, &friend).expect("q").is_empty());
        assert!(Relationships::pending_requests_of(&store, &target).expect("q").is_empty());
    }
}
