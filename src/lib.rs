//! Local directory snapshots: one full base revision plus a chain of
//! replayable deltas, restorable to any point.
//!
//! See the [`revision`] module for the top-level operations.

pub mod blob;
pub mod config;
pub mod delta;
pub mod error;
pub mod hashing;
pub mod restore;
pub mod revision;
pub mod tree;
mod wire;

// CLI stuff:
pub mod ui;

pub use error::{Error, Result};
