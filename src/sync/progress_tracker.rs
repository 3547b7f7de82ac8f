//! Progress tracking for block synchronization.
//!
//! This module provides the `SyncProgressTracker`, which counts processed blocks, filtered and
//! dispatched actions, state transitions and absorbed fetch failures. The sync loop feeds it on
//! every tick and publishes its statistics alongside the state snapshot.

use serde::Serialize;
use tracing::info;

/// Number of processed blocks between two progress log lines.
const LOG_INTERVAL_BLOCKS: u64 = 1000;

/// Service for tracking synchronization progress
#[derive(Debug, Clone)]
pub struct SyncProgressTracker {
	/// Block the session started from
	start_block: u64,
	/// The highest block fully applied, if any
	highest_processed_block: Option<u64>,
	blocks_processed: u64,
	/// Actions seen in fetched blocks, before filtering
	actions_seen: u64,
	actions_dispatched: u64,
	state_transitions: u64,
	head_fetch_failures: u64,
	block_fetch_failures: u64,
	/// Block at which progress was last logged
	last_logged_block: u64,
}

impl SyncProgressTracker {
	/// Create a new progress tracker starting from the given block.
	pub fn new(start_block: u64) -> Self {
		Self {
			start_block,
			highest_processed_block: None,
			blocks_processed: 0,
			actions_seen: 0,
			actions_dispatched: 0,
			state_transitions: 0,
			head_fetch_failures: 0,
			block_fetch_failures: 0,
			last_logged_block: start_block,
		}
	}

	/// Record a fully applied block
	pub fn record_block(&mut self, block_num: u64, actions_seen: usize, actions_dispatched: usize) {
		self.highest_processed_block = Some(
			self.highest_processed_block
				.map_or(block_num, |highest| highest.max(block_num)),
		);
		self.blocks_processed += 1;
		self.actions_seen += actions_seen as u64;
		self.actions_dispatched += actions_dispatched as u64;
	}

	pub fn record_state_transition(&mut self) {
		self.state_transitions += 1;
	}

	pub fn record_head_failure(&mut self) {
		self.head_fetch_failures += 1;
	}

	pub fn record_block_failure(&mut self) {
		self.block_fetch_failures += 1;
	}

	/// Log progress at regular intervals or when forced
	pub fn log_progress(&mut self, force: bool) {
		let Some(highest) = self.highest_processed_block else {
			if force {
				info!("Sync progress: no blocks processed since block {}", self.start_block);
			}
			return;
		};

		let blocks_since_last_log = highest.saturating_sub(self.last_logged_block);
		if force || blocks_since_last_log >= LOG_INTERVAL_BLOCKS {
			info!("Sync progress: {}", self.get_stats().summary());
			self.last_logged_block = highest;
		}
	}

	/// Get sync statistics as a SyncStats struct
	pub fn get_stats(&self) -> SyncStats {
		SyncStats {
			start_block: self.start_block,
			highest_processed_block: self.highest_processed_block,
			blocks_processed: self.blocks_processed,
			actions_seen: self.actions_seen,
			actions_dispatched: self.actions_dispatched,
			state_transitions: self.state_transitions,
			head_fetch_failures: self.head_fetch_failures,
			block_fetch_failures: self.block_fetch_failures,
		}
	}
}

/// Statistics about the sync progress
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
	pub start_block: u64,
	pub highest_processed_block: Option<u64>,
	pub blocks_processed: u64,
	pub actions_seen: u64,
	pub actions_dispatched: u64,
	pub state_transitions: u64,
	pub head_fetch_failures: u64,
	pub block_fetch_failures: u64,
}

impl SyncStats {
	/// Get a human-readable summary of the sync statistics
	pub fn summary(&self) -> String {
		let failures = self.head_fetch_failures + self.block_fetch_failures;
		format!(
			"{} blocks from {} to {}: {} of {} actions dispatched, {} state updates{}",
			self.blocks_processed,
			self.start_block,
			self.highest_processed_block
				.map_or_else(|| "-".to_string(), |block| block.to_string()),
			self.actions_dispatched,
			self.actions_seen,
			self.state_transitions,
			if failures == 0 {
				String::new()
			} else {
				format!(" ({} fetch failures)", failures)
			}
		)
	}
}
