//! # Social Metrics
//!
//! Counters derived from the current records. Informational only; nothing
//! gates on them.

use crate::catalog::ContentFilter;
use crate::store::SocialStore;
use crate::{Session, SocialError};
use serde::{Deserialize, Serialize};

/// Snapshot of store-wide counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialMetrics {
    /// Registered accounts.
    pub user_count: usize,
    /// Private accounts.
    pub private_user_count: usize,
    /// Songs of every visibility.
    pub song_count: usize,
    /// Songs flagged public.
    pub public_song_count: usize,
    /// Confirmed friendships, each pair counted once.
    pub friendship_count: usize,
    /// Pending requests.
    pub pending_request_count: usize,
}

impl SocialMetrics {
    /// Compute the metrics from any store.
    pub fn from_store<S: SocialStore + ?Sized>(store: &S) -> Result<Self, SocialError> {
        let users = store.users()?;

        let mut metrics = Self {
            user_count: users.len(),
            song_count: store.song_count()?,
            public_song_count: store.count_songs(&ContentFilter::Public)?,
            ..Self::default()
        };

        let mut friend_edges = 0usize;
        for user in &users {
            if user.is_private {
                metrics.private_user_count = metrics.private_user_count.saturating_add(1);
            }
            friend_edges = friend_edges.saturating_add(user.friends.len());
            metrics.pending_request_count = metrics
                .pending_request_count
                .saturating_add(user.friend_requests.len());
        }
        // Each friendship is stored on both records.
        metrics.friendship_count = friend_edges / 2;

        Ok(metrics)
    }

    /// Compute the metrics for a session's store.
    pub fn from_session(session: &Session) -> Result<Self, SocialError> {
        Self::from_store(session.store())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UserId;

    #[test]
    fn empty_session() {
        let metrics = SocialMetrics::from_session(&Session::new()).expect("metrics");
        assert_eq!(metrics, SocialMetrics::default());
    }

    #[test]
    fn counts_friendships_once() {
        let mut session = Session::new();
        for id in ["a", "b", "c"] {
            session
                .register(UserId::new(id), id, id, id == "c")
                .expect("register");
        }
        session
            .accept_request(&UserId::new("a"), &UserId::new("b"))
            .expect("accept");
        session
            .send_request(&UserId::new("c"), &UserId::new("a"))
            .expect("send");

        let metrics = SocialMetrics::from_session(&session).expect("metrics");
        assert_eq!(metrics.user_count, 3);
        assert_eq!(metrics.private_user_count, 1);
        assert_eq!(metrics.friendship_count, 1);
        assert_eq!(metrics.pending_request_count, 1);
    }
}
