//! The block sync loop.
//!
//! [`SyncLoop::tick`] performs one iteration: refresh the chain head if the cursor has caught up
//! with it, fetch and apply the block at the cursor if it exists, then re-evaluate lag. The
//! context is passed in and returned by value, so a tick can be driven directly from tests.
//! [`SyncLoop::run`] repeats ticks until shutdown, yielding between ticks while behind the head
//! and waiting one block interval once caught up.
//!
//! Fetch failures never escape a tick: they are logged, counted, emitted as events, and the same
//! block is retried on the next tick.

use crate::chain::{BlockData, ChainClient, FetchError};
use crate::state::{ApplicationState, reduce};
use crate::sync::context::{ChainHeadCache, SharedState, SyncContext, SyncSnapshot};
use crate::sync::events::{EventSink, SyncEvent};
use crate::sync::filter::ActionFilter;
use crate::sync::progress_tracker::SyncProgressTracker;
use chrono::Utc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Outcome of asking the node for its head block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadRefresh {
	/// The node reported a head different from the cached one
	Updated(u64),
	/// The node answered with the head we already had
	Unchanged,
	/// The request failed; the cached head is kept
	Failed,
}

/// Drives the chain client, the action filter and the reducer.
pub struct SyncLoop<C: ChainClient> {
	client: C,
	filter: ActionFilter,
	/// Delay between ticks once caught up with the head
	block_interval: Duration,
	events: EventSink,
	shared: SharedState,
	progress: SyncProgressTracker,
}

impl<C: ChainClient> SyncLoop<C> {
	pub fn new(
		client: C,
		filter: ActionFilter,
		block_interval: Duration,
		events: EventSink,
		shared: SharedState,
		start_block: u64,
	) -> Self {
		Self {
			client,
			filter,
			block_interval,
			events,
			shared,
			progress: SyncProgressTracker::new(start_block),
		}
	}

	#[cfg(test)]
	pub fn progress(&self) -> &SyncProgressTracker {
		&self.progress
	}

	/// Run one iteration of the loop and return the resulting context.
	///
	/// The snapshot shared with readers is replaced once, after the whole tick has been applied.
	pub async fn tick(&mut self, mut ctx: SyncContext) -> SyncContext {
		if ctx.should_refresh_head() {
			match self.refresh_head(&mut ctx).await {
				HeadRefresh::Updated(head) => debug!(
					"Chain head moved to {}, next block {}",
					head,
					ctx.cursor.next_block()
				),
				HeadRefresh::Unchanged => {
					debug!("Chain head unchanged, waiting for block {}", ctx.cursor.next_block())
				}
				HeadRefresh::Failed => {}
			}
		}

		if ctx.block_in_reach() {
			let block_num = ctx.cursor.next_block();
			match self.fetch_block(block_num).await {
				Ok(block) => {
					ctx.state = self.apply_block(&ctx.state, &block);
					ctx.cursor.advance();
				}
				Err(e) => {
					warn!("Failed to sync block {}: {}", block_num, e);
					self.progress.record_block_failure();
					self.events.fetch_failed(Some(block_num), &e);
				}
			}
		}

		ctx.syncing = ctx.lagging();
		self.publish(&ctx).await;
		ctx
	}

	/// Tick until `shutdown` turns true or its sender is dropped.
	///
	/// Shutdown is only observed between ticks and while idle, so a block is either fully
	/// applied or not applied at all.
	pub async fn run(mut self, mut ctx: SyncContext, mut shutdown: watch::Receiver<bool>) -> SyncContext {
		info!("Starting block sync at block {}", ctx.cursor.next_block());

		while !shutdown_requested(&shutdown) {
			ctx = self.tick(ctx).await;

			if ctx.syncing {
				tokio::task::yield_now().await;
				continue;
			}

			tokio::select! {
				_ = tokio::time::sleep(self.block_interval) => {}
				changed = shutdown.changed() => {
					if changed.is_err() {
						break;
					}
				}
			}
		}

		self.progress.log_progress(true);
		info!(
			"Block sync stopped, next block would be {}",
			ctx.cursor.next_block()
		);
		ctx
	}

	/// Ask the node for its head, keeping the cached head when the request fails.
	pub async fn refresh_head(&mut self, ctx: &mut SyncContext) -> HeadRefresh {
		match self.client.get_chain_head().await {
			Ok(info) => {
				let previous = ctx.head.as_ref().map(|head| head.head_block_num);
				ctx.head = Some(ChainHeadCache {
					head_block_num: info.head_block_num,
					fetched_at: Utc::now(),
				});

				if previous == Some(info.head_block_num) {
					HeadRefresh::Unchanged
				} else {
					HeadRefresh::Updated(info.head_block_num)
				}
			}
			Err(e) => {
				warn!("Failed to get chain info: {}", e);
				self.progress.record_head_failure();
				self.events.fetch_failed(None, &e);
				HeadRefresh::Failed
			}
		}
	}

	async fn fetch_block(&self, block_num: u64) -> Result<BlockData, FetchError> {
		let block = self.client.get_block(block_num).await?;
		if block.block_num != block_num {
			return Err(FetchError::Malformed(format!(
				"requested block {} but node returned block {}",
				block_num, block.block_num
			)));
		}
		Ok(block)
	}

	/// Fold every accepted action of `block` into `state`, in transaction then action order.
	fn apply_block(&mut self, state: &ApplicationState, block: &BlockData) -> ApplicationState {
		let actions = block.actions();
		let mut state = state.clone();
		let mut dispatched = 0;

		for block_action in &actions {
			let Some(action) = self
				.filter
				.accept(&block_action.action, &block_action.tx_id, block.block_num)
			else {
				continue;
			};

			self.events.emit(SyncEvent::ActionAccepted {
				block_num: block.block_num,
				tx_id: block_action.tx_id.clone(),
				action: action.clone(),
			});
			dispatched += 1;

			let next = reduce(&state, &action);
			if next != state {
				self.progress.record_state_transition();
				self.events.emit(SyncEvent::StateChanged {
					block_num: block.block_num,
					state: next.clone(),
				});
				state = next;
			}
		}

		self.progress
			.record_block(block.block_num, actions.len(), dispatched);
		self.progress.log_progress(false);
		self.events.emit(SyncEvent::BlockProcessed {
			block_num: block.block_num,
			actions_dispatched: dispatched,
		});

		state
	}

	async fn publish(&self, ctx: &SyncContext) {
		let snapshot = SyncSnapshot::from_context(ctx, self.progress.get_stats());
		*self.shared.write().await = snapshot;
	}
}

/// True once shutdown was signalled or the sender is gone.
fn shutdown_requested(shutdown: &watch::Receiver<bool>) -> bool {
	*shutdown.borrow() || shutdown.has_changed().is_err()
}
