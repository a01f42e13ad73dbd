//! # Property-Based Tests
//!
//! Graph invariants checked over random sequences of relationship operations.

use audioly_core::visibility::{can_access_uploads, select_visible_content};
use audioly_core::{
    Catalog, ConnectionStatus, MediaRef, NewSong, Session, SocialError, SocialStore, UserId,
};
use proptest::collection::vec;
use proptest::prelude::*;

const POPULATION: usize = 5;

fn uid(index: usize) -> UserId {
    UserId::new(format!("user{index}"))
}

fn populated_session() -> Session {
    let mut session = Session::new();
    for i in 0..POPULATION {
        session
            .register(uid(i), &format!("User {i}"), &format!("user{i}"), i % 2 == 0)
            .expect("register");
    }
    session
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Send(usize, usize),
    Accept(usize, usize),
    Decline(usize, usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    (0u8..3, 0..POPULATION, 0..POPULATION).prop_map(|(kind, a, b)| match kind {
        0 => Op::Send(a, b),
        1 => Op::Accept(a, b),
        _ => Op::Decline(a, b),
    })
}

/// Apply an op, ignoring domain errors; storage errors must never occur.
fn apply(session: &mut Session, op: Op) {
    let result = match op {
        Op::Send(a, b) => session.send_request(&uid(a), &uid(b)),
        Op::Accept(a, b) => session.accept_request(&uid(a), &uid(b)),
        Op::Decline(a, b) => session.decline_or_cancel_request(&uid(a), &uid(b)),
    };
    if let Err(e) = result {
        assert!(!e.is_retryable(), "unexpected storage failure: {e}");
    }
}

/// Number of relations that hold for the unordered pair (a, b).
fn relation_count(session: &Session, a: usize, b: usize) -> usize {
    let friends = session.is_friend(&uid(a), &uid(b)).expect("q");
    let a_to_b = session.has_pending_request_from(&uid(a), &uid(b)).expect("q");
    let b_to_a = session.has_pending_request_from(&uid(b), &uid(a)).expect("q");
    [friends, a_to_b, b_to_a].iter().filter(|held| **held).count()
}

proptest! {
    /// Friendship is symmetric after any sequence of operations.
    #[test]
    fn friendship_is_symmetric(ops in vec(op_strategy(), 0..60)) {
        let mut session = populated_session();
        for op in ops {
            apply(&mut session, op);
        }

        for a in 0..POPULATION {
            for b in 0..POPULATION {
                prop_assert_eq!(
                    session.is_friend(&uid(a), &uid(b)).expect("q"),
                    session.is_friend(&uid(b), &uid(a)).expect("q")
                );
            }
        }
    }

    /// At most one of {friends, a→b pending, b→a pending} holds for any pair.
    #[test]
    fn relations_are_mutually_exclusive(ops in vec(op_strategy(), 0..60)) {
        let mut session = populated_session();
        for op in ops {
            apply(&mut session, op);
            for a in 0..POPULATION {
                for b in (a + 1)..POPULATION {
                    prop_assert!(relation_count(&session, a, b) <= 1);
                }
            }
        }
    }

    /// No record ever holds an edge to itself.
    #[test]
    fn no_self_edges(ops in vec(op_strategy(), 0..60)) {
        let mut session = populated_session();
        for op in ops {
            apply(&mut session, op);
        }
        for user in session.store().users().expect("users") {
            prop_assert!(!user.friends.contains(&user.id));
            prop_assert!(!user.friend_requests.contains(&user.id));
        }
    }

    /// Accepting twice leaves the same records as accepting once.
    #[test]
    fn accept_is_idempotent(
        ops in vec(op_strategy(), 0..30),
        a in 0..POPULATION,
        b in 0..POPULATION,
    ) {
        prop_assume!(a != b);
        let mut session = populated_session();
        for op in ops {
            apply(&mut session, op);
        }

        session.accept_request(&uid(a), &uid(b)).expect("accept");
        let once = session.store().users().expect("users");
        session.accept_request(&uid(a), &uid(b)).expect("accept again");
        prop_assert_eq!(session.store().users().expect("users"), once);
        prop_assert!(session.is_friend(&uid(a), &uid(b)).expect("q"));
    }

    /// Self-targeted requests are always rejected as invalid.
    #[test]
    fn self_request_rejected(a in 0..POPULATION) {
        let mut session = populated_session();
        let result = session.send_request(&uid(a), &uid(a));
        prop_assert!(matches!(result, Err(SocialError::SelfReference)));
    }

    /// Becoming a friend never shrinks what a viewer can see.
    #[test]
    fn visibility_is_monotonic(is_private: bool, flags in vec(any::<bool>(), 0..10)) {
        let mut session = Session::new();
        let owner = session
            .register(UserId::new("owner"), "Owner", "owner", false)
            .expect("register")
            .id;
        for (i, is_public) in flags.iter().enumerate() {
            let request = NewSong {
                title: format!("song {i}"),
                category: None,
                is_public: Some(*is_public),
                media: MediaRef::new("u", "s"),
                cover: None,
            };
            session.upload(&owner, request).expect("upload");
        }

        let count = |status: ConnectionStatus| {
            let filter = select_visible_content(status, is_private, &owner);
            session.store().count_songs(&filter).expect("count")
        };

        for outsider in [ConnectionStatus::None, ConnectionStatus::Sent, ConnectionStatus::Received] {
            prop_assert!(count(outsider) <= count(ConnectionStatus::Friend));
            prop_assert!(
                can_access_uploads(outsider, is_private)
                    <= can_access_uploads(ConnectionStatus::Friend, is_private)
            );
        }
        prop_assert!(count(ConnectionStatus::Friend) <= count(ConnectionStatus::Myself));
        prop_assert_eq!(
            count(ConnectionStatus::Myself),
            Catalog::mine(session.store(), &owner).expect("mine").len()
        );
    }
}
