//! # System Module
//!
//! Store-wide counters for status reporting.

mod metrics;

pub use metrics::*;
