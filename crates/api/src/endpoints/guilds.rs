//! Guild endpoints.

use axum::{Router, extract::State, routing::get};
use guildpolls_common::AppResult;
use guildpolls_core::{GuildView, MembershipView};

use crate::{
    extractors::{ApiPath, MaybeIdentity},
    middleware::AppState,
    response::ApiResponse,
};

/// Guild configuration.
async fn get_guild(
    State(state): State<AppState>,
    ApiPath(guild_id): ApiPath<u64>,
) -> AppResult<ApiResponse<GuildView>> {
    let guild = state.guild_service.get_guild(guild_id).await?;
    Ok(ApiResponse::ok(guild))
}

/// Whether the caller is in the guild and manages it.
async fn membership(
    MaybeIdentity(caller): MaybeIdentity,
    State(state): State<AppState>,
    ApiPath(guild_id): ApiPath<u64>,
) -> AppResult<ApiResponse<MembershipView>> {
    let view = state
        .guild_service
        .membership(guild_id, caller.as_ref())
        .await?;
    Ok(ApiResponse::ok(view))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{guild_id}", get(get_guild))
        .route("/{guild_id}/membership", get(membership))
}
