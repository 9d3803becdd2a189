//! Tag endpoints.

use axum::{Router, extract::State, routing::get};
use guildpolls_common::AppResult;
use guildpolls_core::TagView;
use serde::Deserialize;
use validator::Validate;

use crate::{
    extractors::{ApiPath, MaybeIdentity, ValidatedQuery},
    middleware::AppState,
    response::ApiResponse,
};

/// Query parameters of `GET /tags`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ListTagsQuery {
    pub guild_id: u64,
}

/// List the tags of a guild, most recently used first.
async fn list_tags(
    MaybeIdentity(caller): MaybeIdentity,
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<ListTagsQuery>,
) -> AppResult<ApiResponse<Vec<TagView>>> {
    let tags = state
        .tag_service
        .list_tags(query.guild_id, caller.as_ref())
        .await?;
    Ok(ApiResponse::ok(tags))
}

async fn get_tag(
    State(state): State<AppState>,
    ApiPath(tag): ApiPath<i32>,
) -> AppResult<ApiResponse<TagView>> {
    let tag = state.tag_service.get_tag(tag).await?;
    Ok(ApiResponse::ok(tag))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tags))
        .route("/{tag}", get(get_tag))
}
