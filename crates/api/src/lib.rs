//! HTTP API layer for guildpolls.
//!
//! This crate provides the read-only REST API:
//!
//! - **Endpoints**: polls, votes, tags and guild info
//! - **Extractors**: caller identity, validated query and path parameters
//! - **Middleware**: identity extraction from the auth gateway's headers
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
pub use middleware::{AppState, identity_middleware};
