//! Wire types for the chain node HTTP API

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

/// Response of `chain/get_info`. Only the head block number is used.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChainInfo {
	pub head_block_num: u64,
}

/// Response of `chain/get_block`.
///
/// Transactions are kept as raw JSON and decoded lazily by [`BlockData::actions`] so that a
/// malformed transaction only drops its own actions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlockData {
	pub block_num: u64,
	#[serde(default)]
	pub id: Option<String>,
	#[serde(default, deserialize_with = "lenient_array")]
	pub transactions: Vec<Value>,
}

/// An action as it appears inside a block, before filtering.
///
/// `authorization` and `data` are left untyped: they are only interpreted once the action has
/// passed the allow-list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawAction {
	pub account: String,
	pub name: String,
	#[serde(default)]
	pub authorization: Value,
	#[serde(default)]
	pub data: Value,
}

/// A raw action together with the id of the transaction that carried it.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockAction {
	pub tx_id: String,
	pub action: RawAction,
}

impl BlockData {
	/// Flatten the block into its actions, in transaction order then action order.
	///
	/// Transactions without a full `trx` object (deferred transactions only carry an id) or
	/// without actions contribute nothing. Actions that cannot be decoded are skipped.
	pub fn actions(&self) -> Vec<BlockAction> {
		let mut actions = Vec::new();

		for receipt in &self.transactions {
			let Some(trx) = receipt.get("trx").and_then(Value::as_object) else {
				continue;
			};
			let tx_id = trx
				.get("id")
				.and_then(Value::as_str)
				.unwrap_or("unknown")
				.to_string();
			let Some(raw_actions) = trx
				.get("transaction")
				.and_then(|t| t.get("actions"))
				.and_then(Value::as_array)
			else {
				continue;
			};

			for raw in raw_actions {
				match serde_json::from_value::<RawAction>(raw.clone()) {
					Ok(action) => actions.push(BlockAction {
						tx_id: tx_id.clone(),
						action,
					}),
					Err(e) => {
						debug!(
							"Skipping undecodable action in block {} trx {}: {}",
							self.block_num, tx_id, e
						);
					}
				}
			}
		}

		actions
	}
}

/// Accept any JSON value and keep it only when it is an array.
fn lenient_array<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
	D: Deserializer<'de>,
{
	match Value::deserialize(deserializer)? {
		Value::Array(items) => Ok(items),
		_ => Ok(Vec::new()),
	}
}

/// Errors from talking to the chain node. All of them are retried by the sync loop.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
	#[error("HTTP error: {0}")]
	HttpError(#[from] reqwest::Error),

	#[error("Unexpected HTTP status: {0}")]
	HttpStatus(reqwest::StatusCode),

	#[error("Malformed response: {0}")]
	Malformed(String),
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn block(value: Value) -> BlockData {
		serde_json::from_value(value).expect("Failed to decode block")
	}

	#[test]
	fn test_actions_follow_block_order() {
		let data = block(json!({
			"block_num": 42,
			"transactions": [
				{ "trx": { "id": "tx-a", "transaction": { "actions": [
					{ "account": "todo", "name": "addtodo", "authorization": [{ "actor": "alice" }], "data": { "id": 1 } },
					{ "account": "todo", "name": "toggletodo", "authorization": [{ "actor": "alice" }], "data": { "id": 1 } }
				] } } },
				{ "trx": { "id": "tx-b", "transaction": { "actions": [
					{ "account": "eosio.token", "name": "transfer", "data": {} }
				] } } }
			]
		}));

		let order: Vec<(String, String)> = data
			.actions()
			.into_iter()
			.map(|a| (a.tx_id, a.action.name))
			.collect();
		assert_eq!(
			order,
			vec![
				("tx-a".to_string(), "addtodo".to_string()),
				("tx-a".to_string(), "toggletodo".to_string()),
				("tx-b".to_string(), "transfer".to_string()),
			]
		);
	}

	#[test]
	fn test_missing_transactions_means_no_actions() {
		assert!(block(json!({ "block_num": 7 })).actions().is_empty());
		assert!(
			block(json!({ "block_num": 7, "transactions": null }))
				.actions()
				.is_empty()
		);
		assert!(
			block(json!({ "block_num": 7, "transactions": [] }))
				.actions()
				.is_empty()
		);
	}

	#[test]
	fn test_malformed_transactions_are_tolerated() {
		let data = block(json!({
			"block_num": 9,
			"transactions": [
				{ "status": "executed", "trx": "deferred-id" },
				{ "trx": { "id": "tx-1" } },
				{ "trx": { "id": "tx-2", "transaction": { "actions": "nope" } } },
				{ "trx": { "id": "tx-3", "transaction": { "actions": [
					{ "name": "missing-account" },
					{ "account": "todo", "name": "addtodo" }
				] } } }
			]
		}));

		let actions = data.actions();
		assert_eq!(actions.len(), 1);
		assert_eq!(actions[0].tx_id, "tx-3");
		assert_eq!(actions[0].action.data, Value::Null);
	}

	#[test]
	fn test_block_without_number_is_rejected() {
		assert!(serde_json::from_value::<BlockData>(json!({ "transactions": [] })).is_err());
	}
}
