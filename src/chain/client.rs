//!
//! HTTP client for the chain node API.
//!
//! This module provides the [`ChainClient`] trait the sync loop depends on, and an async
//! reqwest-backed implementation that talks to a node's `chain/get_info` and `chain/get_block`
//! endpoints. Every failure (transport, status, decoding) surfaces as a [`FetchError`].

use super::types::*;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// Read-only view of a chain node used by the sync loop.
#[async_trait::async_trait]
pub trait ChainClient: Send + Sync {
	/// Fetch the node's current head block metadata.
	async fn get_chain_head(&self) -> Result<ChainInfo, FetchError>;

	/// Fetch the full contents of a block.
	///
	/// Fails when the block has not been produced yet, as well as on transport errors.
	async fn get_block(&self, block_num: u64) -> Result<BlockData, FetchError>;
}

/// Chain API client over HTTP
#[derive(Clone)]
pub struct HttpChainClient {
	/// The underlying HTTP client.
	http_client: Client,
	/// Base URL of the chain API, e.g. `http://localhost:8888/v1`.
	api_url: String,
}

impl HttpChainClient {
	/// Create a new chain client.
	///
	/// # Arguments
	/// * `api_url` - The base URL of the node's chain API.
	/// * `timeout` - Upper bound for a single request, so a fetch never hangs a tick.
	pub fn new(api_url: String, timeout: Duration) -> Result<Self, FetchError> {
		let http_client = Client::builder().timeout(timeout).build()?;

		Ok(Self {
			http_client,
			api_url: api_url.trim_end_matches('/').to_string(),
		})
	}

	fn endpoint(&self, path: &str) -> String {
		format!("{}/chain/{}", self.api_url, path)
	}

	/// Check the status and decode a JSON response body.
	async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, FetchError> {
		if !response.status().is_success() {
			return Err(FetchError::HttpStatus(response.status()));
		}

		let body: serde_json::Value = response.json().await?;
		serde_json::from_value(body).map_err(|e| FetchError::Malformed(e.to_string()))
	}
}

#[async_trait::async_trait]
impl ChainClient for HttpChainClient {
	async fn get_chain_head(&self) -> Result<ChainInfo, FetchError> {
		let response = self.http_client.get(self.endpoint("get_info")).send().await?;
		let info: ChainInfo = Self::decode(response).await?;

		debug!("Chain head is at block {}", info.head_block_num);
		Ok(info)
	}

	async fn get_block(&self, block_num: u64) -> Result<BlockData, FetchError> {
		let request_body = json!({
			"block_num_or_id": block_num
		});

		let response = self
			.http_client
			.post(self.endpoint("get_block"))
			.header("Content-Type", "application/json")
			.json(&request_body)
			.send()
			.await?;

		let block: BlockData = Self::decode(response).await?;
		debug!(
			"Fetched block {} with {} transactions",
			block.block_num,
			block.transactions.len()
		);
		Ok(block)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::{Json, Router, http::StatusCode, routing::get, routing::post};
	use serde_json::Value;

	/// Serve a minimal fake node on an ephemeral port and return its API base URL.
	async fn spawn_node(app: Router) -> String {
		let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
			.await
			.expect("Failed to bind test listener");
		let addr = listener.local_addr().expect("Failed to read local addr");
		tokio::spawn(async move {
			axum::serve(listener, app).await.ok();
		});
		format!("http://{}/v1/", addr)
	}

	fn client(url: String) -> HttpChainClient {
		HttpChainClient::new(url, Duration::from_secs(5)).expect("Failed to build client")
	}

	#[test]
	fn test_endpoint_trims_trailing_slash() {
		let client = client("http://localhost:8888/v1/".to_string());
		assert_eq!(
			client.endpoint("get_info"),
			"http://localhost:8888/v1/chain/get_info"
		);
	}

	#[tokio::test]
	async fn test_get_chain_head_and_block() {
		let app = Router::new()
			.route(
				"/v1/chain/get_info",
				get(|| async { Json(json!({ "head_block_num": 120, "chain_id": "abc" })) }),
			)
			.route(
				"/v1/chain/get_block",
				post(|Json(body): Json<Value>| async move {
					let block_num = body["block_num_or_id"].clone();
					Json(json!({
						"block_num": block_num,
						"transactions": []
					}))
				}),
			);
		let client = client(spawn_node(app).await);

		let head = client.get_chain_head().await.expect("get_info should succeed");
		assert_eq!(head.head_block_num, 120);

		let block = client.get_block(77).await.expect("get_block should succeed");
		assert_eq!(block.block_num, 77);
		assert!(block.actions().is_empty());
	}

	#[tokio::test]
	async fn test_error_status_is_fetch_error() {
		let app = Router::new().route(
			"/v1/chain/get_block",
			post(|| async {
				(
					StatusCode::INTERNAL_SERVER_ERROR,
					Json(json!({ "code": 500, "message": "Unknown block" })),
				)
			}),
		);
		let client = client(spawn_node(app).await);

		let err = client.get_block(5).await.expect_err("get_block should fail");
		assert!(matches!(err, FetchError::HttpStatus(status) if status.as_u16() == 500));
	}

	#[tokio::test]
	async fn test_malformed_head_is_fetch_error() {
		let app = Router::new().route(
			"/v1/chain/get_info",
			get(|| async { Json(json!({ "server_version": "x" })) }),
		);
		let client = client(spawn_node(app).await);

		let err = client.get_chain_head().await.expect_err("get_info should fail");
		assert!(matches!(err, FetchError::Malformed(_)));
	}

	#[tokio::test]
	async fn test_mistyped_block_is_malformed() {
		let app = Router::new().route(
			"/v1/chain/get_block",
			post(|| async { Json(json!({ "block_num": "seven", "transactions": [] })) }),
		);
		let client = client(spawn_node(app).await);

		let err = client.get_block(7).await.expect_err("get_block should fail");
		assert!(matches!(err, FetchError::Malformed(_)), "got {:?}", err);
	}

	#[tokio::test]
	async fn test_unreachable_node_is_fetch_error() {
		let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
		let addr = listener.local_addr().expect("Failed to read local addr");
		drop(listener);

		let client = client(format!("http://{}/v1", addr));
		assert!(client.get_chain_head().await.is_err());
	}
}
