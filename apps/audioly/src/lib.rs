//! # Audioly
//!
//! Server and command line front-end for the Audioly social graph.
//!
//! ```text
//!   CLI (clap) ──┐
//!                ├──► Session (audioly-core) ──► redb / memory
//!   HTTP (axum) ─┘        ▲
//!        │                │
//!        ├── identity ────┘  bearer token -> UserId
//!        └── media           audio, covers, avatars on disk
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod identity;
pub mod media;
