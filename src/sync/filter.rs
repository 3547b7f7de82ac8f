//! Allow-list filtering of raw chain actions.
//!
//! The filter decides which chain actions the service acts on and maps accepted ones into the
//! reducer's input type. It never fails: anything outside the allow-list, or any accepted action
//! whose payload cannot be interpreted, is simply not returned.

use crate::chain::RawAction;
use crate::config::{ConfigError, ContractActions};
use crate::state::{ActionData, ActionKind, IncomingAction, PermissionLevel};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Screens raw chain actions against a static `(account, action)` allow-list.
#[derive(Debug, Clone)]
pub struct ActionFilter {
	allowed: HashMap<String, HashSet<ActionKind>>,
}

impl ActionFilter {
	/// Build a filter from the configured contract entries.
	///
	/// Entries naming the same account are merged. Unknown action names are rejected here so
	/// they never reach the sync loop.
	pub fn new(contracts: &[ContractActions]) -> Result<Self, ConfigError> {
		if contracts.is_empty() {
			return Err(ConfigError::EmptyAllowList);
		}

		let mut allowed: HashMap<String, HashSet<ActionKind>> = HashMap::new();
		for entry in contracts {
			allowed
				.entry(entry.account.clone())
				.or_default()
				.extend(entry.kinds()?);
		}

		Ok(Self { allowed })
	}

	/// Whether `(account, kind)` is on the allow-list.
	pub fn allows(&self, account: &str, kind: ActionKind) -> bool {
		self.allowed
			.get(account)
			.is_some_and(|kinds| kinds.contains(&kind))
	}

	/// Map a raw action to an [`IncomingAction`] if it is on the allow-list.
	///
	/// The payload is only inspected after the account and action name have matched.
	pub fn accept(&self, raw: &RawAction, tx_id: &str, block_num: u64) -> Option<IncomingAction> {
		let kind = raw.name.parse::<ActionKind>().ok()?;
		if !self.allows(&raw.account, kind) {
			return None;
		}

		let Some(authorization) = parse_authorization(&raw.authorization) else {
			debug!(
				"Dropping {}::{} in block {} trx {}: no acting author",
				raw.account, raw.name, block_num, tx_id
			);
			return None;
		};

		let Some(data) = parse_data(&raw.data) else {
			debug!(
				"Dropping {}::{} in block {} trx {}: payload has no id",
				raw.account, raw.name, block_num, tx_id
			);
			return None;
		};

		Some(IncomingAction {
			kind,
			account: raw.account.clone(),
			authorization,
			data,
		})
	}
}

fn parse_authorization(value: &Value) -> Option<Vec<PermissionLevel>> {
	let levels: Vec<PermissionLevel> = serde_json::from_value(value.clone()).ok()?;
	if levels.is_empty() {
		return None;
	}
	Some(levels)
}

/// The contract's ids are integers on chain; nodes may render them as numbers or strings.
fn parse_data(value: &Value) -> Option<ActionData> {
	let id = match value.get("id")? {
		Value::String(id) => id.clone(),
		Value::Number(id) => id.to_string(),
		_ => return None,
	};
	let text = value.get("text").and_then(Value::as_str).map(str::to_string);

	Some(ActionData { id, text })
}
