//! Service configuration.
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then environment
//! variables prefixed with `TODO_SYNC` (nested keys separated by `__`, e.g.
//! `TODO_SYNC__CHAIN__API_URL`).

use crate::state::{ActionKind, UnknownActionKind};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;

/// The top-level configuration for the sync service.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
	#[serde(default)]
	pub chain: ChainConfig,
	#[serde(default)]
	pub sync: SyncConfig,
	#[serde(default)]
	pub server: ServerConfig,
	#[serde(default)]
	pub log: LogConfig,
}

/// Connection settings for the chain node.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
	/// Base URL of the node's chain API.
	pub api_url: String,
	/// Timeout for a single request to the node.
	pub request_timeout_secs: u64,
}

/// Behavior of the block sync loop.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
	/// First block to process.
	pub initial_block: u64,
	/// Delay between ticks once caught up with the chain head, roughly one block period.
	pub block_interval_ms: u64,
	/// Contract accounts and the actions accepted from each.
	pub contracts: Vec<ContractActions>,
}

/// One allow-list entry: a contract account and the action names accepted from it.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ContractActions {
	pub account: String,
	pub actions: Vec<String>,
}

/// Settings for the state-serving HTTP endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
	pub host: String,
	pub port: u16,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
	/// Default level filter, e.g. "info", "debug". `RUST_LOG` takes precedence.
	pub level: String,
	pub format: LogFormat,
}

/// Defines the format for log messages.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
	Plain,
	Json,
}

impl Default for ChainConfig {
	fn default() -> Self {
		Self {
			api_url: "http://localhost:8888/v1".to_string(),
			request_timeout_secs: 30,
		}
	}
}

impl Default for SyncConfig {
	fn default() -> Self {
		Self {
			initial_block: 10,
			block_interval_ms: 500,
			contracts: vec![ContractActions {
				account: "todo".to_string(),
				actions: [ActionKind::Add, ActionKind::Edit, ActionKind::Toggle]
					.iter()
					.map(|kind| kind.action_name().to_string())
					.collect(),
			}],
		}
	}
}

impl Default for ServerConfig {
	fn default() -> Self {
		Self {
			host: "0.0.0.0".to_string(),
			port: 3000,
		}
	}
}

impl Default for LogConfig {
	fn default() -> Self {
		Self {
			level: "info".to_string(),
			format: LogFormat::Plain,
		}
	}
}

impl ChainConfig {
	pub fn request_timeout(&self) -> Duration {
		Duration::from_secs(self.request_timeout_secs)
	}
}

impl SyncConfig {
	pub fn block_interval(&self) -> Duration {
		Duration::from_millis(self.block_interval_ms)
	}
}

impl ContractActions {
	/// Parse the configured action names into their kinds.
	pub fn kinds(&self) -> Result<HashSet<ActionKind>, ConfigError> {
		self.actions
			.iter()
			.map(|name| {
				name.parse::<ActionKind>()
					.map_err(|UnknownActionKind(name)| ConfigError::UnknownAction {
						account: self.account.clone(),
						name,
					})
			})
			.collect()
	}
}

/// Configuration values that parse but cannot be used
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
	#[error("Unknown action '{name}' configured for account '{account}'")]
	UnknownAction { account: String, name: String },

	#[error("No contract actions configured")]
	EmptyAllowList,
}

/// Loads the service configuration.
///
/// When `path` is given the TOML file must exist. Environment overrides are applied last.
pub fn load_config(path: Option<&str>) -> Result<AppConfig> {
	let mut builder = config::Config::builder();
	if let Some(path) = path {
		builder = builder.add_source(config::File::with_name(path));
	}
	builder = builder.add_source(
		config::Environment::with_prefix("TODO_SYNC")
			.prefix_separator("__")
			.separator("__"),
	);

	let settings: AppConfig = builder
		.build()
		.context(format!(
			"Failed to build configuration from '{}'",
			path.unwrap_or("<environment>")
		))?
		.try_deserialize()
		.context("Failed to deserialize configuration")?;

	Ok(settings)
}
