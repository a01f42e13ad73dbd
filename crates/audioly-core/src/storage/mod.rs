//! # Storage Module
//!
//! Persistent storage backends for Audioly records.

pub mod redb_store;

pub use redb_store::RedbStore;
