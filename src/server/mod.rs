//! Read-only HTTP endpoint serving the synced state.

/// HTTP request handlers
mod handlers;

pub use handlers::{router, serve};
