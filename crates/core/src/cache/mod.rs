//! SQLite-backed generational cache store.
//!
//! This module provides the persistent store the cache manager owns, with
//! async access via tokio-rusqlite. It supports:
//!
//! - Named generations, each holding response snapshots keyed by request
//! - Atomic manifest installs (all entries land in one transaction)
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod generations;
pub mod hash;
pub mod migrations;

pub use crate::Error;

pub use connection::GenerationStore;
pub use generations::GenerationInfo;
