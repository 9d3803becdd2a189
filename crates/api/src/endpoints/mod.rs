//! API endpoints.

mod guilds;
mod polls;
mod tags;

use axum::Router;

use crate::middleware::AppState;

pub use polls::ListPollsQuery;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/polls", polls::router())
        .nest("/tags", tags::router())
        .nest("/guilds", guilds::router())
}
