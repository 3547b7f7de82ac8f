//! Chain node integration module
//!
//! This module provides the client and wire types for reading chain head metadata and full
//! blocks from a node's HTTP chain API. All failures are reported as [`FetchError`] and are
//! recoverable by retrying on a later tick.

/// HTTP client for the node chain API
mod client;
/// Wire types for node responses
mod types;

pub use client::{ChainClient, HttpChainClient};
pub use types::*;
