//! # audioly-core
//!
//! The social graph and privacy-aware visibility engine for Audioly.
//!
//! This crate answers three questions for every request:
//! - who is connected to whom (friendships and pending requests)
//! - how a viewer relates to a target (`ConnectionStatus`)
//! - which songs that viewer may see
//!
//! ## Architectural Constraints
//!
//! - Pure Rust: no async, no network dependencies
//! - Identities and media are opaque values supplied by outer layers
//! - One visibility engine shared by every listing
//! - Edge sets are ordered (`BTreeSet`), so listings are deterministic

// =============================================================================
// MODULES
// =============================================================================

pub mod accounts;
pub mod catalog;
pub mod directory;
pub mod primitives;
pub mod relationship;
pub mod session;
pub mod storage;
pub mod store;
pub mod system;
pub mod types;
pub mod visibility;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    ConnectionStatus, ErrorKind, ListedSong, MediaRef, SocialError, Song, SongId, User, UserId,
    UserSummary,
};

// =============================================================================
// RE-EXPORTS: Engines
// =============================================================================

pub use accounts::{Accounts, SettingsUpdate};
pub use catalog::{Catalog, ContentFilter, NewSong};
pub use directory::{Directory, DirectoryEntry, FriendsOverview, ProfileView};
pub use relationship::Relationships;
pub use session::{Session, StorageBackend};
pub use storage::RedbStore;
pub use store::{MemoryStore, SocialStore};

// =============================================================================
// RE-EXPORTS: System (from system module)
// =============================================================================

pub use system::SocialMetrics;
