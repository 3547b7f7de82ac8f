//! HTTP request handlers for the state endpoint.

use crate::sync::SharedState;
use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

/// Handler for `GET /` - the current application state.
///
/// Always answers with the last published snapshot, also while the chain node is unreachable.
pub async fn state_handler(State(shared): State<SharedState>) -> impl IntoResponse {
	let state = shared.read().await.state.clone();
	Json(state)
}

/// Handler for `GET /status` - cursor, chain head and sync statistics.
pub async fn status_handler(State(shared): State<SharedState>) -> impl IntoResponse {
	let status = shared.read().await.status.clone();
	Json(status)
}

/// Build the read-only router over the shared snapshot.
pub fn router(shared: SharedState) -> Router {
	Router::new()
		.route("/", get(state_handler))
		.route("/status", get(status_handler))
		.with_state(shared)
}

/// Serve the router on `listener` until `shutdown` turns true or its sender is dropped.
pub async fn serve(
	listener: TcpListener,
	shared: SharedState,
	mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
	if let Ok(addr) = listener.local_addr() {
		info!("Serving state on http://{}", addr);
	}

	axum::serve(listener, router(shared))
		.with_graceful_shutdown(async move {
			let _ = shutdown.wait_for(|stop| *stop).await;
		})
		.await
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::state::{ApplicationState, Todo};
	use crate::sync::{SyncContext, SyncSnapshot};
	use axum::{
		body::Body,
		http::{Method, Request, StatusCode},
	};
	use serde_json::{Value, json};
	use tower::ServiceExt;

	fn shared_with_todo() -> SharedState {
		let mut ctx = SyncContext::new(10);
		ctx.state = ApplicationState {
			todos: vec![Todo {
				id: "t1".to_string(),
				text: "buy milk".to_string(),
				author: "alice".to_string(),
				completed: false,
			}],
		};
		SyncSnapshot::shared(&ctx)
	}

	async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
		let response = app
			.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
			.await
			.unwrap();
		let status = response.status();
		let body = axum::body::to_bytes(response.into_body(), usize::MAX)
			.await
			.unwrap();
		(status, serde_json::from_slice(&body).unwrap())
	}

	#[tokio::test]
	async fn test_state_handler() {
		let (status, body) = get_json(router(shared_with_todo()), "/").await;

		assert_eq!(status, StatusCode::OK);
		assert_eq!(
			body,
			json!({
				"todos": [
					{ "id": "t1", "text": "buy milk", "author": "alice", "completed": false }
				]
			})
		);
	}

	#[tokio::test]
	async fn test_state_handler_sees_published_updates() {
		let shared = SyncSnapshot::shared(&SyncContext::new(1));
		let app = router(shared.clone());

		let (_, before) = get_json(app.clone(), "/").await;
		assert_eq!(before, json!({ "todos": [] }));

		let updated = shared_with_todo().read().await.clone();
		*shared.write().await = updated;
		let (_, after) = get_json(app, "/").await;
		assert_eq!(after["todos"][0]["id"], "t1");
	}

	#[tokio::test]
	async fn test_status_handler() {
		let (status, body) = get_json(router(shared_with_todo()), "/status").await;

		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["next_block"], 10);
		assert_eq!(body["head_block_num"], Value::Null);
		assert_eq!(body["syncing"], true);
		assert_eq!(body["stats"]["blocks_processed"], 0);
	}

	#[tokio::test]
	async fn test_no_mutation_routes() {
		let response = router(shared_with_todo())
			.oneshot(
				Request::builder()
					.method(Method::POST)
					.uri("/")
					.body(Body::empty())
					.unwrap(),
			)
			.await
			.unwrap();

		assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
	}

	#[tokio::test]
	async fn test_serve_stops_on_shutdown() {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let (shutdown_tx, shutdown_rx) = watch::channel(false);
		let handle = tokio::spawn(serve(listener, shared_with_todo(), shutdown_rx));

		shutdown_tx.send(true).unwrap();

		tokio::time::timeout(std::time::Duration::from_secs(5), handle)
			.await
			.expect("server should stop")
			.expect("server task should not panic")
			.expect("server should exit cleanly");
	}
}
