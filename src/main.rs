mod chain;
mod config;
mod server;
mod state;
mod sync;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::chain::HttpChainClient;
use crate::config::{LogConfig, LogFormat, load_config};
use crate::sync::{
	ActionFilter, EventDispatcher, EventSink, LoggingEventHandler, SyncContext, SyncLoop,
	SyncSnapshot,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let config_path = std::env::args()
		.nth(1)
		.or_else(|| std::env::var("TODO_SYNC_CONFIG").ok());
	let config = load_config(config_path.as_deref())?;

	init_tracing(&config.log);
	info!("Starting todo chain sync against {}", config.chain.api_url);

	let filter = ActionFilter::new(&config.sync.contracts).context("Invalid contract allow-list")?;
	let client = HttpChainClient::new(config.chain.api_url.clone(), config.chain.request_timeout())
		.context("Failed to create chain client")?;

	let ctx = SyncContext::new(config.sync.initial_block);
	let shared = SyncSnapshot::shared(&ctx);
	info!("Initial state: {}", serde_json::to_string(&ctx.state)?);

	let listener = TcpListener::bind((config.server.host.as_str(), config.server.port))
		.await
		.with_context(|| {
			format!(
				"Failed to bind {}:{}",
				config.server.host, config.server.port
			)
		})?;

	let (event_sink, events) = EventSink::channel();
	let mut dispatcher = EventDispatcher::new();
	dispatcher.register_handler(Box::new(LoggingEventHandler));
	let dispatcher_task = tokio::spawn(dispatcher.run(events));

	let (shutdown_tx, shutdown_rx) = watch::channel(false);

	let sync_loop = SyncLoop::new(
		client,
		filter,
		config.sync.block_interval(),
		event_sink,
		shared.clone(),
		config.sync.initial_block,
	);
	let sync_task = tokio::spawn(sync_loop.run(ctx, shutdown_rx.clone()));
	let mut server_task = tokio::spawn(server::serve(listener, shared, shutdown_rx));

	tokio::select! {
		signal = tokio::signal::ctrl_c() => {
			signal.context("Failed to listen for shutdown signal")?;
			info!("Shutdown signal received");
		}
		result = &mut server_task => {
			error!("State server exited unexpectedly: {:?}", result);
		}
	}

	let _ = shutdown_tx.send(true);

	let ctx = sync_task.await.context("Sync task panicked")?;
	if !server_task.is_finished() {
		server_task
			.await
			.context("State server task panicked")?
			.context("State server failed")?;
	}
	// the sync loop owned the last event sink, so the dispatcher drains and exits
	dispatcher_task.await.context("Event dispatcher panicked")?;

	info!(
		"Stopped at block {} with {} todos",
		ctx.cursor.next_block(),
		ctx.state.todos.len()
	);
	Ok(())
}

fn init_tracing(config: &LogConfig) {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
	let builder = tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_target(false)
		.with_thread_ids(false)
		.with_thread_names(false);

	match config.format {
		LogFormat::Json => builder.json().init(),
		LogFormat::Plain => builder.init(),
	}
}
