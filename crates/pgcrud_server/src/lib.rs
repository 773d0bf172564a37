//! HTTP surface of the pgcrud gateway.
//!
//! A thin axum adapter over `pgcrud_core`: REST routes per entity, the meta
//! and schema routes, the health probe, and the `/mcp` agent transport.
//! Route handling here is marshalling only; every decision happens in the
//! dispatch core.

mod auth;
mod handlers;
mod mcp_transport;
mod router;
mod serve;

pub use router::{router, AppState};
pub use serve::serve;
