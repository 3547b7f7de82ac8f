//! Event system for block synchronization.
//!
//! The sync loop does not call observers directly. Each tick writes [`SyncEvent`]s into an
//! unbounded channel through an [`EventSink`]; a separate consumer task drains the channel and
//! hands every event to the handlers registered on an [`EventDispatcher`]. This keeps the tick
//! itself free of observer side effects, and lets tests read the emitted events back in order.

use crate::chain::FetchError;
use crate::state::{ApplicationState, IncomingAction};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Events that occur during block synchronization
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
	/// An action passed the allow-list and is about to be reduced
	ActionAccepted {
		block_num: u64,
		tx_id: String,
		action: IncomingAction,
	},
	/// Reducing an action produced a new state
	StateChanged {
		block_num: u64,
		state: ApplicationState,
	},
	/// A block was fully applied and the cursor moved past it
	BlockProcessed {
		block_num: u64,
		actions_dispatched: usize,
	},
	/// A fetch failed and will be retried on a later tick
	FetchFailed {
		/// The block being fetched, or `None` for a chain head request.
		block_num: Option<u64>,
		error: String,
	},
}

/// Error reported by an event handler
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct HandlerError(pub String);

/// Trait for handling sync events.
///
/// Implementors receive all sync events and can perform side effects.
#[async_trait::async_trait]
pub trait SyncEventHandler: Send + Sync {
	/// Handle a sync event.
	async fn handle(&mut self, event: &SyncEvent) -> Result<(), HandlerError>;

	/// Get the name of this handler for logging and diagnostics.
	fn name(&self) -> &'static str;
}

/// Event dispatcher that manages multiple event handlers.
pub struct EventDispatcher {
	handlers: Vec<Box<dyn SyncEventHandler>>,
}

impl Default for EventDispatcher {
	fn default() -> Self {
		Self::new()
	}
}

impl EventDispatcher {
	/// Create a new, empty event dispatcher.
	pub fn new() -> Self {
		Self {
			handlers: Vec::new(),
		}
	}

	/// Register a new event handler.
	///
	/// Handlers are called in the order they are registered.
	pub fn register_handler(&mut self, handler: Box<dyn SyncEventHandler>) {
		self.handlers.push(handler);
	}

	/// Dispatch an event to all registered handlers.
	///
	/// Errors from handlers are logged, but do not stop other handlers from running.
	pub async fn dispatch(&mut self, event: &SyncEvent) {
		for handler in &mut self.handlers {
			if let Err(e) = handler.handle(event).await {
				tracing::error!("Handler {} failed to process event: {}", handler.name(), e);
			}
		}
	}

	/// Drain `events` into the registered handlers until every sender is dropped.
	pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<SyncEvent>) {
		while let Some(event) = events.recv().await {
			self.dispatch(&event).await;
		}
		debug!("Event channel closed, dispatcher exiting");
	}
}

/// Write side of the event channel, owned by the sync loop.
#[derive(Debug, Clone)]
pub struct EventSink {
	sender: mpsc::UnboundedSender<SyncEvent>,
}

impl EventSink {
	/// Create a sink and the receiver its events are delivered to.
	pub fn channel() -> (Self, mpsc::UnboundedReceiver<SyncEvent>) {
		let (sender, receiver) = mpsc::unbounded_channel();
		(Self { sender }, receiver)
	}

	/// Emit an event. A closed channel drops the event; syncing carries on.
	pub fn emit(&self, event: SyncEvent) {
		let _ = self.sender.send(event);
	}

	pub fn fetch_failed(&self, block_num: Option<u64>, error: &FetchError) {
		self.emit(SyncEvent::FetchFailed {
			block_num,
			error: error.to_string(),
		});
	}
}

/// Handler that writes every event to the log.
pub struct LoggingEventHandler;

#[async_trait::async_trait]
impl SyncEventHandler for LoggingEventHandler {
	async fn handle(&mut self, event: &SyncEvent) -> Result<(), HandlerError> {
		match event {
			SyncEvent::ActionAccepted {
				block_num,
				tx_id,
				action,
			} => {
				info!(
					"Dispatching action from block {} trx {}: {:?}",
					block_num, tx_id, action
				);
			}
			SyncEvent::StateChanged { block_num, state } => {
				let state = serde_json::to_string(state).map_err(|e| HandlerError(e.to_string()))?;
				info!("Updated state at block {}: {}", block_num, state);
			}
			SyncEvent::BlockProcessed {
				block_num,
				actions_dispatched,
			} => {
				debug!(
					"Processed block {} ({} actions dispatched)",
					block_num, actions_dispatched
				);
			}
			// the sync loop already warns about the failure itself
			SyncEvent::FetchFailed { block_num, error } => match block_num {
				Some(block_num) => debug!("Fetch of block {} failed: {}", block_num, error),
				None => debug!("Fetch of chain info failed: {}", error),
			},
		}
		Ok(())
	}

	fn name(&self) -> &'static str {
		"LoggingEventHandler"
	}
}
