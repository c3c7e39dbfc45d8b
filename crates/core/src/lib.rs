//! Core types and shared functionality for larder.
//!
//! This crate provides:
//! - Generational cache store with SQLite backend
//! - The pure install/activate lifecycle state machine
//! - Response snapshots and cacheability policy
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod manifest;
pub mod policy;
pub mod snapshot;

pub use cache::{GenerationInfo, GenerationStore};
pub use config::AppConfig;
pub use error::Error;
pub use lifecycle::{Effect, Event, LifecycleState, transition};
pub use manifest::Manifest;
pub use snapshot::Snapshot;
