//! API middleware.

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use guildpolls_core::{GuildService, Identity, PollQueryService, TagService};
use tracing::debug;
use url::Url;

/// Header carrying the caller's Discord user id, set by the auth gateway.
pub const USER_ID_HEADER: &str = "X-Discord-User-Id";

/// Application state.
#[derive(Clone)]
pub struct AppState {
    /// Poll listing and lookup.
    pub poll_service: PollQueryService,
    /// Tag listing and lookup.
    pub tag_service: TagService,
    /// Guild info and membership check.
    pub guild_service: GuildService,
    /// Public URL used to build absolute page links.
    pub base_url: Url,
}

/// Identity middleware.
///
/// The auth gateway in front of this service forwards the caller's Discord
/// access token as a bearer token and the user id in [`USER_ID_HEADER`].
/// When both are present and well formed, an [`Identity`] is stored in the
/// request extensions. Anything else leaves the request anonymous.
pub async fn identity_middleware(mut req: Request<Body>, next: Next) -> Response {
    if let Some(identity) = identity_from_headers(&req) {
        debug!(user_id = identity.user_id, "Request carries an identity");
        req.extensions_mut().insert(identity);
    }

    next.run(req).await
}

fn identity_from_headers(req: &Request<Body>) -> Option<Identity> {
    let headers = req.headers();
    let credential = headers
        .get("Authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")?
        .trim();
    if credential.is_empty() {
        return None;
    }

    let user_id = headers
        .get(USER_ID_HEADER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()?;

    Some(Identity {
        user_id,
        credential: credential.to_string(),
    })
}
