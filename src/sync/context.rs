//! Owned sync context and the snapshot published to readers.

use crate::state::ApplicationState;
use crate::sync::progress_tracker::SyncStats;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

/// The next block the loop intends to fetch. Only ever moves forward, one block at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncCursor {
	next_block: u64,
}

impl SyncCursor {
	pub fn new(start_block: u64) -> Self {
		Self {
			next_block: start_block,
		}
	}

	pub fn next_block(&self) -> u64 {
		self.next_block
	}

	/// Move past a block that has been fully applied.
	pub(crate) fn advance(&mut self) {
		self.next_block += 1;
	}
}

/// Last known chain head. May lag behind the node's actual head.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainHeadCache {
	pub head_block_num: u64,
	pub fetched_at: DateTime<Utc>,
}

/// Everything a tick reads and writes, passed by value from one tick to the next.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncContext {
	pub cursor: SyncCursor,
	pub head: Option<ChainHeadCache>,
	pub state: ApplicationState,
	/// Whether the cursor trails the known head; selects the fast polling cadence.
	pub syncing: bool,
}

impl SyncContext {
	/// A fresh context that starts syncing at `start_block` with empty state.
	pub fn new(start_block: u64) -> Self {
		Self {
			cursor: SyncCursor::new(start_block),
			head: None,
			state: ApplicationState::default(),
			syncing: true,
		}
	}

	/// Refresh the head when none is known or the cursor has caught up with it. While far
	/// behind, the cached head is good enough to keep fetching blocks.
	pub fn should_refresh_head(&self) -> bool {
		self.head
			.as_ref()
			.is_none_or(|head| self.cursor.next_block() >= head.head_block_num)
	}

	/// Whether the block at the cursor is known to exist.
	pub fn block_in_reach(&self) -> bool {
		self.head
			.as_ref()
			.is_some_and(|head| head.head_block_num >= self.cursor.next_block())
	}

	/// Lag evaluation: no known head, or the head is strictly ahead of the cursor.
	pub fn lagging(&self) -> bool {
		self.head
			.as_ref()
			.is_none_or(|head| head.head_block_num > self.cursor.next_block())
	}
}

/// Read-only sync diagnostics served next to the state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncStatus {
	pub next_block: u64,
	pub head_block_num: Option<u64>,
	pub head_fetched_at: Option<DateTime<Utc>>,
	pub syncing: bool,
	pub stats: SyncStats,
}

/// What readers see: the state and status as of the end of the last completed tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncSnapshot {
	pub state: ApplicationState,
	pub status: SyncStatus,
}

/// Snapshot shared between the sync loop (single writer) and the HTTP handlers.
pub type SharedState = Arc<RwLock<SyncSnapshot>>;

impl SyncSnapshot {
	pub fn from_context(ctx: &SyncContext, stats: SyncStats) -> Self {
		Self {
			state: ctx.state.clone(),
			status: SyncStatus {
				next_block: ctx.cursor.next_block(),
				head_block_num: ctx.head.as_ref().map(|head| head.head_block_num),
				head_fetched_at: ctx.head.as_ref().map(|head| head.fetched_at),
				syncing: ctx.syncing,
				stats,
			},
		}
	}

	/// Shared handle holding the snapshot of a fresh context.
	pub fn shared(ctx: &SyncContext) -> SharedState {
		Arc::new(RwLock::new(Self::from_context(ctx, SyncStats::default())))
	}
}
