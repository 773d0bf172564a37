//! Route table.
//!
//! The routes are a pure function of the configuration; entity routes
//! dispatch dynamically through the schema model, so no per-table
//! registration happens here.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use pgcrud_core::{CorsPolicy, Gateway};
use pgcrud_mcp::McpService;

use crate::{handlers, mcp_transport};

/// Shared application state: the dispatch core and the agent service.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Gateway,
    pub mcp: Arc<McpService>,
}

/// Build the full router over a connected gateway.
pub fn router(gateway: Gateway) -> Router {
    let config = gateway.config().clone();
    let state = AppState {
        mcp: Arc::new(McpService::new(gateway.clone())),
        gateway,
    };

    let api = Router::new()
        .route("/_health", get(handlers::health))
        .route("/_meta/tables", get(handlers::meta_tables))
        .route("/_meta/tables/{segment}", get(handlers::meta_table))
        .route("/_schema", get(handlers::schema))
        .route("/_schema/{segment}", get(handlers::schema_table))
        .route(
            "/{segment}",
            get(handlers::list).post(handlers::create),
        )
        .route(
            "/{segment}/{id}",
            get(handlers::read)
                .put(handlers::update)
                .patch(handlers::update)
                .delete(handlers::delete),
        );

    let mcp = Router::new().route(
        "/",
        axum::routing::post(mcp_transport::post)
            .get(mcp_transport::get)
            .delete(mcp_transport::delete),
    );

    let mut app = Router::new()
        .nest("/api", api)
        .nest("/mcp", mcp)
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .with_state(state);

    if let Some(cors) = cors_layer(&config.cors) {
        app = app.layer(cors);
    }
    app
}

fn cors_layer(policy: &CorsPolicy) -> Option<CorsLayer> {
    match policy {
        CorsPolicy::Disabled => None,
        CorsPolicy::AllowAny => Some(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        ),
        CorsPolicy::Origins(origins) => {
            let origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| HeaderValue::from_str(origin).ok())
                .collect();
            Some(
                CorsLayer::new()
                    .allow_origin(origins)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
        }
    }
}
