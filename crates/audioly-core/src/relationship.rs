//! # Relationship Store
//!
//! Friendship and pending-request edges between users.
//!
//! Edges live on the user records themselves:
//! - `friends` on both parties (symmetric)
//! - `friend_requests` on the *target* of a pending request
//!
//! For any unordered pair exactly one of {friends, A→B pending, B→A pending,
//! nothing} holds. `send_request` refuses to create a second edge and
//! `accept_request` clears both pending directions when it links the pair.
//! Every mutation that touches two records goes through a single
//! `put_users` call, so a failed write leaves both records untouched.

use crate::store::SocialStore;
use crate::{SocialError, User, UserId};

/// Graph mutations and queries over friendship edges.
pub struct Relationships;

impl Relationships {
    fn load<S: SocialStore + ?Sized>(store: &S, id: &UserId) -> Result<User, SocialError> {
        store
            .user(id)?
            .ok_or_else(|| SocialError::UserNotFound(id.clone()))
    }

    /// Load both parties of a pair operation, rejecting self-reference first.
    fn load_pair<S: SocialStore + ?Sized>(
        store: &S,
        a: &UserId,
        b: &UserId,
    ) -> Result<(User, User), SocialError> {
        if a == b {
            return Err(SocialError::SelfReference);
        }
        let first = Self::load(store, a)?;
        let second = Self::load(store, b)?;
        Ok((first, second))
    }

    // =========================================================================
    // MUTATIONS
    // =========================================================================

    /// Record a pending request from `requester` to `target`.
    ///
    /// # Errors
    ///
    /// - `SelfReference` if both ids are equal
    /// - `UserNotFound` if either party does not exist
    /// - `AlreadyFriends` if the pair is already linked
    /// - `RequestPending` if a request exists in either direction
    pub fn send_request<S: SocialStore + ?Sized>(
        store: &mut S,
        requester: &UserId,
        target: &UserId,
    ) -> Result<(), SocialError> {
        let (from, mut to) = Self::load_pair(store, requester, target)?;

        if to.is_friend_with(requester) || from.is_friend_with(target) {
            return Err(SocialError::AlreadyFriends(target.clone()));
        }
        if to.has_request_from(requester) || from.has_request_from(target) {
            return Err(SocialError::RequestPending(target.clone()));
        }

        to.friend_requests.insert(requester.clone());
        store.put_users(&[to])
    }

    /// Accept the pending request from `requester`, linking the pair.
    ///
    /// Succeeds when no request is pending, and a repeated call leaves the
    /// same state. Both records are written in one atomic step.
    pub fn accept_request<S: SocialStore + ?Sized>(
        store: &mut S,
        target: &UserId,
        requester: &UserId,
    ) -> Result<(), SocialError> {
        let (mut me, mut them) = Self::load_pair(store, target, requester)?;

        me.friend_requests.remove(requester);
        them.friend_requests.remove(target);
        me.friends.insert(requester.clone());
        them.friends.insert(target.clone());

        store.put_users(&[me, them])
    }

    /// Remove a pending edge between the pair, in whichever direction it
    /// exists.
    ///
    /// Serves both "decline an incoming request" and "cancel an outgoing
    /// one". No-op when nothing is pending; friendships are left alone.
    pub fn decline_or_cancel_request<S: SocialStore + ?Sized>(
        store: &mut S,
        a: &UserId,
        b: &UserId,
    ) -> Result<(), SocialError> {
        let (mut first, mut second) = Self::load_pair(store, a, b)?;

        let removed_incoming = first.friend_requests.remove(b);
        let removed_outgoing = second.friend_requests.remove(a);

        match (removed_incoming, removed_outgoing) {
            (false, false) => Ok(()),
            (true, false) => store.put_users(&[first]),
            (false, true) => store.put_users(&[second]),
            (true, true) => store.put_users(&[first, second]),
        }
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Check whether `a` and `b` are confirmed friends.
    pub fn is_friend<S: SocialStore + ?Sized>(
        store: &S,
        a: &UserId,
        b: &UserId,
    ) -> Result<bool, SocialError> {
        Ok(Self::load(store, a)?.is_friend_with(b))
    }

    /// Check whether `from` has a pending request to `to`.
    pub fn has_pending_request_from<S: SocialStore + ?Sized>(
        store: &S,
        from: &UserId,
        to: &UserId,
    ) -> Result<bool, SocialError> {
        Ok(Self::load(store, to)?.has_request_from(from))
    }

    /// Ids of the user's confirmed friends, in id order.
    pub fn friends_of<S: SocialStore + ?Sized>(
        store: &S,
        id: &UserId,
    ) -> Result<Vec<UserId>, SocialError> {
        Ok(Self::load(store, id)?.friends.into_iter().collect())
    }

    /// Ids of users with a pending request *to* this user, in id order.
    pub fn pending_requests_of<S: SocialStore + ?Sized>(
        store: &S,
        id: &UserId,
    ) -> Result<Vec<UserId>, SocialError> {
        Ok(Self::load(store, id)?.friend_requests.into_iter().collect())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::Utc;

    fn store_with(ids: &[&str]) -> MemoryStore {
        let mut store = MemoryStore::new();
        for id in ids {
            let user = User::new(UserId::new(*id), *id, id, false, Utc::now());
            store.insert_user(&user).expect("insert");
        }
        store
    }

    fn uid(id: &str) -> UserId {
        UserId::new(id)
    }

    #[test]
    fn send_creates_incoming_edge_on_target() {
        let mut store = store_with(&["a", "b"]);
        Relationships::send_request(&mut store, &uid("a"), &uid("b")).expect("send");

        assert!(Relationships::has_pending_request_from(&store, &uid("a"), &uid("b")).expect("q"));
        assert!(!Relationships::has_pending_request_from(&store, &uid("b"), &uid("a")).expect("q"));
        assert_eq!(
            Relationships::pending_requests_of(&store, &uid("b")).expect("q"),
            vec![uid("a")]
        );
    }

    #[test]
    fn send_to_self_is_invalid() {
        let mut store = store_with(&["a"]);
        let err = Relationships::send_request(&mut store, &uid("a"), &uid("a"))
            .expect_err("self request");
        assert!(matches!(err, SocialError::SelfReference));
    }

    #[test]
    fn send_to_missing_user() {
        let mut store = store_with(&["a"]);
        let err = Relationships::send_request(&mut store, &uid("a"), &uid("ghost"))
            .expect_err("missing");
        assert!(matches!(err, SocialError::UserNotFound(id) if id == uid("ghost")));
    }

    #[test]
    fn duplicate_and_reverse_sends_conflict() {
        let mut store = store_with(&["a", "b"]);
        Relationships::send_request(&mut store, &uid("a"), &uid("b")).expect("send");

        assert!(matches!(
            Relationships::send_request(&mut store, &uid("a"), &uid("b")),
            Err(SocialError::RequestPending(_))
        ));
        assert!(matches!(
            Relationships::send_request(&mut store, &uid("b"), &uid("a")),
            Err(SocialError::RequestPending(_))
        ));
    }

    #[test]
    fn accept_links_both_sides() {
        let mut store = store_with(&["a", "b"]);
        Relationships::send_request(&mut store, &uid("a"), &uid("b")).expect("send");
        Relationships::accept_request(&mut store, &uid("b"), &uid("a")).expect("accept");

        assert!(Relationships::is_friend(&store, &uid("a"), &uid("b")).expect("q"));
        assert!(Relationships::is_friend(&store, &uid("b"), &uid("a")).expect("q"));
        assert!(Relationships::pending_requests_of(&store, &uid("b")).expect("q").is_empty());
        assert!(matches!(
            Relationships::send_request(&mut store, &uid("a"), &uid("b")),
            Err(SocialError::AlreadyFriends(_))
        ));
    }

    #[test]
    fn accept_is_idempotent() {
        let mut store = store_with(&["a", "b"]);
        Relationships::send_request(&mut store, &uid("a"), &uid("b")).expect("send");
        Relationships::accept_request(&mut store, &uid("b"), &uid("a")).expect("accept");
        let snapshot = store.users().expect("users");

        Relationships::accept_request(&mut store, &uid("b"), &uid("a")).expect("accept again");
        assert_eq!(store.users().expect("users"), snapshot);
        assert_eq!(
            Relationships::friends_of(&store, &uid("a")).expect("q"),
            vec![uid("b")]
        );
    }

    #[test]
    fn accept_without_request_still_links() {
        let mut store = store_with(&["a", "b"]);
        Relationships::accept_request(&mut store, &uid("b"), &uid("a")).expect("accept");
        assert!(Relationships::is_friend(&store, &uid("a"), &uid("b")).expect("q"));
    }

    #[test]
    fn accept_self_is_invalid() {
        let mut store = store_with(&["a"]);
        assert!(matches!(
            Relationships::accept_request(&mut store, &uid("a"), &uid("a")),
            Err(SocialError::SelfReference)
        ));
    }

    #[test]
    fn decline_and_cancel() {
        let mut store = store_with(&["a", "b"]);

        // Decline an incoming request.
        Relationships::send_request(&mut store, &uid("a"), &uid("b")).expect("send");
        Relationships::decline_or_cancel_request(&mut store, &uid("b"), &uid("a"))
            .expect("decline");
        assert!(Relationships::pending_requests_of(&store, &uid("b")).expect("q").is_empty());

        // Cancel an outgoing one.
        Relationships::send_request(&mut store, &uid("a"), &uid("b")).expect("send");
        Relationships::decline_or_cancel_request(&mut store, &uid("a"), &uid("b"))
            .expect("cancel");
        assert!(Relationships::pending_requests_of(&store, &uid("b")).expect("q").is_empty());

        // Nothing pending: no-op.
        Relationships::decline_or_cancel_request(&mut store, &uid("a"), &uid("b"))
            .expect("no-op");
    }

    #[test]
    fn decline_leaves_friendship_alone() {
        let mut store = store_with(&["a", "b"]);
        Relationships::accept_request(&mut store, &uid("b"), &uid("a")).expect("accept");
        Relationships::decline_or_cancel_request(&mut store, &uid("a"), &uid("b"))
            .expect("no-op");
        assert!(Relationships::is_friend(&store, &uid("a"), &uid("b")).expect("q"));
    }

    #[test]
    fn decline_unknown_party() {
        let mut store = store_with(&["a"]);
        assert!(matches!(
            Relationships::decline_or_cancel_request(&mut store, &uid("a"), &uid("ghost")),
            Err(SocialError::UserNotFound(_))
        ));
    }
}
