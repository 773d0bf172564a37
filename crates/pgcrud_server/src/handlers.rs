//! REST handlers.
//!
//! Each handler extracts the claims, hands the request to the dispatch
//! core, and maps the outcome onto the response envelope. The single
//! error-to-status mapping lives in [`ApiError`].

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use pgcrud_core::{health, GatewayError};

use crate::auth::{extract_claims, has_valid_claims};
use crate::router::AppState;

/// Transport-level wrapper carrying the gateway error and the expose flag.
pub struct ApiError {
    error: GatewayError,
    expose_db_errors: bool,
}

impl ApiError {
    fn new(state: &AppState, error: GatewayError) -> Self {
        Self {
            error,
            expose_db_errors: state.gateway.config().expose_db_errors,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.error.status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.error.body(self.expose_db_errors))).into_response()
    }
}

type ApiResult = Result<Json<Value>, ApiError>;

fn ok(value: impl serde::Serialize, state: &AppState) -> ApiResult {
    serde_json::to_value(value)
        .map(Json)
        .map_err(|err| ApiError::new(state, GatewayError::Internal(err.to_string())))
}

// =============================================================================
// Entity routes
// =============================================================================

pub async fn list(
    State(state): State<AppState>,
    Path(segment): Path<String>,
    Query(pairs): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> ApiResult {
    let claims =
        extract_claims(state.gateway.config(), &headers).map_err(|e| ApiError::new(&state, e))?;
    let response = state
        .gateway
        .list(&claims, &segment, &pairs)
        .await
        .map_err(|e| ApiError::new(&state, e))?;
    ok(response, &state)
}

pub async fn read(
    State(state): State<AppState>,
    Path((segment, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> ApiResult {
    let claims =
        extract_claims(state.gateway.config(), &headers).map_err(|e| ApiError::new(&state, e))?;
    let row = state
        .gateway
        .read(&claims, &segment, &id)
        .await
        .map_err(|e| ApiError::new(&state, e))?;
    Ok(Json(row))
}

pub async fn create(
    State(state): State<AppState>,
    Path(segment): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let claims =
        extract_claims(state.gateway.config(), &headers).map_err(|e| ApiError::new(&state, e))?;
    let response = state
        .gateway
        .create(&claims, &segment, body)
        .await
        .map_err(|e| ApiError::new(&state, e))?;
    let body = serde_json::to_value(response)
        .map_err(|err| ApiError::new(&state, GatewayError::Internal(err.to_string())))?;
    Ok((StatusCode::CREATED, Json(body)))
}

pub async fn update(
    State(state): State<AppState>,
    Path((segment, id)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> ApiResult {
    let claims =
        extract_claims(state.gateway.config(), &headers).map_err(|e| ApiError::new(&state, e))?;
    let row = state
        .gateway
        .update(&claims, &segment, &id, body)
        .await
        .map_err(|e| ApiError::new(&state, e))?;
    Ok(Json(row))
}

pub async fn delete(
    State(state): State<AppState>,
    Path((segment, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> ApiResult {
    let claims =
        extract_claims(state.gateway.config(), &headers).map_err(|e| ApiError::new(&state, e))?;
    let response = state
        .gateway
        .delete(&claims, &segment, &id)
        .await
        .map_err(|e| ApiError::new(&state, e))?;
    ok(response, &state)
}

// =============================================================================
// Meta routes
// =============================================================================

/// Public health baseline; database details only for valid credentials or
/// with auth off.
pub async fn health(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let include_details = has_valid_claims(state.gateway.config(), &headers);
    let (healthy, report) = health::check(&state.gateway, include_details).await;
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report)).into_response()
}

pub async fn meta_tables(State(state): State<AppState>, headers: HeaderMap) -> ApiResult {
    let claims =
        extract_claims(state.gateway.config(), &headers).map_err(|e| ApiError::new(&state, e))?;
    let tables = state.gateway.list_tables(&claims);
    ok(json!({ "tables": tables, "count": tables.len() }), &state)
}

pub async fn meta_table(
    State(state): State<AppState>,
    Path(segment): Path<String>,
    headers: HeaderMap,
) -> ApiResult {
    let claims =
        extract_claims(state.gateway.config(), &headers).map_err(|e| ApiError::new(&state, e))?;
    let descriptor = state
        .gateway
        .describe_table(&claims, &segment)
        .map_err(|e| ApiError::new(&state, e))?;
    ok(descriptor, &state)
}

/// The machine-readable self-description: accessible tables plus the API
/// capabilities envelope.
pub async fn schema(State(state): State<AppState>, headers: HeaderMap) -> ApiResult {
    let claims =
        extract_claims(state.gateway.config(), &headers).map_err(|e| ApiError::new(&state, e))?;
    ok(
        json!({
            "tables": state.gateway.list_tables(&claims),
            "capabilities": state.gateway.capabilities(),
        }),
        &state,
    )
}

pub async fn schema_table(
    State(state): State<AppState>,
    Path(segment): Path<String>,
    headers: HeaderMap,
) -> ApiResult {
    meta_table(State(state), Path(segment), headers).await
}
