//! Agent tool surface for the pgcrud gateway.
//!
//! Re-exposes the CRUD operations as named MCP tools with typed argument
//! schemas, plus two resources (the accessible model dump and a per-table
//! view) and two prompts (database overview, per-table CRUD guide). All of
//! it runs through the same dispatch core as the REST surface; only the
//! marshalling differs.
//!
//! Wire framing stays out of this crate: the HTTP transport parses JSON-RPC
//! envelopes and hands them to [`McpService::handle`].

pub mod proto;
pub mod prompts;
pub mod resources;
pub mod service;
pub mod session;
pub mod tools;

pub use service::McpService;
pub use session::{Session, SessionTable};
