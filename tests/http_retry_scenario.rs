// -------------------------------------------------------------------------------------------------
//  Copyright (C) 2024-2026 BIST Trading Platform Contributors. All rights reserved.
//
//  Licensed under the GNU Lesser General Public License Version 3.0 (the "License");
//  You may not use this file except in compliance with the License.
//  You may obtain a copy of the License at https://www.gnu.org/licenses/lgpl-3.0.en.html
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.
// -------------------------------------------------------------------------------------------------

//! End-to-end coverage for the request client's internal retry of
//! `Transient` failures, using a mock `axum` server the way the teacher's
//! own adapter HTTP integration tests do.

use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use algolab_broker::{
    common::credential::Credentials,
    http::client::{RequestClient, RequestClientConfig, RequestKind},
};
use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::post};
use serde::Deserialize;
use serde_json::json;

#[derive(Clone, Default)]
struct ServerState {
    positions_requests: Arc<AtomicUsize>,
    order_requests: Arc<AtomicUsize>,
}

async fn handle_positions(State(state): State<ServerState>) -> impl IntoResponse {
    let count = state.positions_requests.fetch_add(1, Ordering::SeqCst) + 1;
    if count < 3 {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"success": false, "message": "unavailable", "content": null})),
        )
            .into_response();
    }
    Json(json!({"success": true, "message": "", "content": {"symbol": "AKBNK"}})).into_response()
}

async fn handle_send_order(State(state): State<ServerState>) -> impl IntoResponse {
    state.order_requests.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({"success": false, "message": "unavailable", "content": null})),
    )
}

fn router(state: ServerState) -> Router {
    Router::new()
        .route("/api/InstantPosition", post(handle_positions))
        .route("/api/SendOrder", post(handle_send_order))
        .with_state(state)
}

async fn start_server(state: ServerState) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn test_client(base_url: String) -> RequestClient {
    RequestClient::new(
        RequestClientConfig {
            base_url,
            request_timeout: Duration::from_secs(5),
            max_retries: 3,
            retry_delay_initial: Duration::from_millis(5),
        },
        Credentials::new("AK", "u1", "p1", "h"),
    )
    .unwrap()
}

#[derive(Deserialize)]
struct Position {
    symbol: String,
}

#[tokio::test]
async fn transient_failures_are_retried_until_success() {
    let state = ServerState::default();
    let addr = start_server(state.clone()).await;
    let client = test_client(format!("http://{addr}"));

    let started = std::time::Instant::now();
    let result: Position = client
        .call("/api/InstantPosition", Some("session-hash"), &json!({}), RequestKind::Read)
        .await
        .expect("call should eventually succeed after two transient failures");
    let elapsed = started.elapsed();

    assert_eq!(result.symbol, "AKBNK");
    assert_eq!(state.positions_requests.load(Ordering::SeqCst), 3);
    // Two retries at ~5ms/~10ms base plus jitter: bounded well under a
    // second so a hung or unbounded retry loop would fail this test.
    assert!(elapsed < Duration::from_secs(1), "retry loop took unexpectedly long: {elapsed:?}");
}

#[tokio::test]
async fn non_idempotent_mutation_does_not_retry_transient_failures() {
    let state = ServerState::default();
    let addr = start_server(state.clone()).await;
    let client = test_client(format!("http://{addr}"));

    let result: Result<Position, _> = client
        .call(
            "/api/SendOrder",
            Some("session-hash"),
            &json!({"clientOrderId": "o1"}),
            RequestKind::Mutation { idempotent: false },
        )
        .await;

    assert!(result.is_err(), "a single 503 must surface immediately for a non-idempotent mutation");
    assert_eq!(state.order_requests.load(Ordering::SeqCst), 1, "no internal retry for a non-idempotent mutation");
}
