//! Dispatch core of the pgcrud gateway.
//!
//! Ties the schema model, the query builder and the credential engine into
//! one request pipeline: permit, validate, build, execute, then shape or
//! classify. Both surfaces (REST and the agent tools) call into
//! [`dispatch::Gateway`]; they differ only in argument marshalling and
//! response envelopes.

pub mod bind;
pub mod classify;
pub mod config;
pub mod describe;
pub mod dispatch;
pub mod error;
pub mod health;
pub mod pool;
pub mod row;
pub mod validate;

pub use config::{ConfigError, CorsPolicy, GatewayConfig};
pub use dispatch::{CreateResponse, DeleteResponse, Gateway, ListResponse, Pagination};
pub use error::{DbViolation, GatewayError};

/// Core operation result type.
pub type Result<T> = std::result::Result<T, GatewayError>;
