//! HTTP transport for the agent protocol.
//!
//! Three routes under `/mcp`: POST carries JSON-RPC requests (initialize
//! assigns the session id, echoed by the `Mcp-Session-Id` header), GET
//! opens the server-to-client stream for the session, DELETE closes the
//! session. The semantic handling lives in `pgcrud_mcp::McpService`.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, KeepAliveStream, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::stream::Stream;
use serde_json::{json, Value};
use tracing::info;

use pgcrud_mcp::proto::{methods, JsonRpcRequest};

use crate::auth::extract_claims;
use crate::router::AppState;

/// Header carrying the session id after initialize.
pub const SESSION_HEADER: &str = "Mcp-Session-Id";

fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

fn bad_request(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "bad_request", "message": message })),
    )
        .into_response()
}

/// POST: initialize or a subsequent JSON-RPC call.
pub async fn post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let request: JsonRpcRequest = match serde_json::from_value(body) {
        Ok(request) => request,
        Err(err) => return bad_request(&format!("invalid JSON-RPC request: {err}")),
    };

    if request.method == methods::INITIALIZE {
        // Authentication headers on the initializing call bind to the
        // session for its whole lifetime.
        let claims = match extract_claims(state.gateway.config(), &headers) {
            Ok(claims) => claims,
            Err(err) => {
                return (
                    StatusCode::UNAUTHORIZED,
                    Json(err.body(state.gateway.config().expose_db_errors)),
                )
                    .into_response()
            }
        };
        let (session, response) = state.mcp.initialize(claims, request);
        return ([(SESSION_HEADER, session.id.clone())], Json(response)).into_response();
    }

    let Some(id) = session_id(&headers) else {
        return bad_request("missing session header");
    };
    let Some(session) = state.mcp.sessions().get(&id) else {
        return bad_request("unknown session");
    };

    let response = state.mcp.handle(&session, request).await;
    if response.is_empty() {
        // Notification: acknowledged without a body.
        return StatusCode::ACCEPTED.into_response();
    }
    Json(response).into_response()
}

/// GET: the server-to-client stream for an existing session.
///
/// Server-initiated messages are not produced; the stream carries
/// keep-alives until either side closes.
pub async fn get(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(id) = session_id(&headers) else {
        return bad_request("missing session header");
    };
    if state.mcp.sessions().get(&id).is_none() {
        return bad_request("unknown session");
    }

    let stream: futures::stream::Pending<std::result::Result<Event, Infallible>> =
        futures::stream::pending();
    sse(stream).into_response()
}

fn sse<S>(stream: S) -> Sse<KeepAliveStream<S>>
where
    S: Stream<Item = std::result::Result<Event, Infallible>> + Send + 'static,
{
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// DELETE: close the session and release its resources.
pub async fn delete(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let Some(id) = session_id(&headers) else {
        return bad_request("missing session header");
    };
    if !state.mcp.sessions().remove(&id) {
        return bad_request("unknown session");
    }
    info!(session = %id, "agent session closed");
    StatusCode::NO_CONTENT.into_response()
}
