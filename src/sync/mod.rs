//! Block Synchronization Module
//!
//! This module provides the logic that keeps the application state in step with the chain:
//!
//! - `sync_loop`: The tick function and the driver that repeats it until shutdown.
//! - `context`: The cursor, chain head cache and state owned by the loop, and the snapshot it publishes.
//! - `filter`: The allow-list that decides which chain actions reach the reducer.
//! - `events`: Events emitted by each tick and the dispatcher that delivers them to handlers.
//! - `progress_tracker`: Counters and periodic progress logging.

/// Sync context, cursor and published snapshot
pub mod context;
/// Event system for observing sync progress
pub mod events;
/// Allow-list filtering of chain actions
pub mod filter;
/// Tracks synchronization progress and statistics
pub mod progress_tracker;
/// The tick function and its driver
pub mod sync_loop;

pub use context::{SharedState, SyncContext, SyncSnapshot, SyncStatus};
pub use events::{EventDispatcher, EventSink, LoggingEventHandler, SyncEvent};
pub use filter::ActionFilter;
pub use sync_loop::SyncLoop;
