//! Client code for larder.
//!
//! This crate provides the network side of the gateway: the `Fetcher`
//! abstraction the cache manager populates from, and its reqwest-based
//! implementation.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig, FetchedResponse, Fetcher};
