//! Poll endpoints.

use axum::{
    Json, Router,
    extract::{OriginalUri, State},
    http::Uri,
    routing::get,
};
use guildpolls_common::AppResult;
use guildpolls_core::{
    ListPollsInput, OrderInput, OrderType, PollFilterInput, PollPage, PollView, VoteView,
};
use guildpolls_db::{ChoiceCount, SortDir};
use serde::Deserialize;
use url::{Url, form_urlencoded};
use validator::Validate;

use crate::{
    extractors::{ApiPath, MaybeIdentity, ValidatedQuery},
    middleware::AppState,
    response::ApiResponse,
};

/// Query parameters of `GET /polls`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ListPollsQuery {
    /// Guild to list.
    pub guild_id: u64,
    /// Published flag.
    pub published: Option<bool>,
    /// Tag key.
    pub tag: Option<i32>,
    /// Voter to filter by.
    pub user_id: Option<u64>,
    /// Invert the voter filter.
    pub not_voted: Option<bool>,
    /// Free-text search.
    pub search: Option<String>,
    /// 1-based page.
    #[validate(range(min = 1))]
    pub page: Option<u64>,
    /// Page size.
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<u64>,
    /// Ordering strategy.
    pub order: Option<OrderType>,
    /// Ordering direction.
    pub order_dir: Option<SortDir>,
    /// Seed for random ordering.
    pub seed: Option<i64>,
}

impl From<ListPollsQuery> for ListPollsInput {
    fn from(query: ListPollsQuery) -> Self {
        Self {
            filter: PollFilterInput {
                guild_id: query.guild_id,
                published: query.published,
                tag: query.tag,
                user_id: query.user_id,
                not_voted: query.not_voted,
                search: query.search,
                page: query.page,
                limit: query.limit,
            },
            order: OrderInput {
                order: query.order,
                order_dir: query.order_dir,
                seed: query.seed,
            },
        }
    }
}

/// List polls.
async fn list_polls(
    MaybeIdentity(caller): MaybeIdentity,
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    ValidatedQuery(query): ValidatedQuery<ListPollsQuery>,
) -> AppResult<Json<PollPage>> {
    let input = ListPollsInput::from(query);
    let mut page = state
        .poll_service
        .list_polls(&input, caller.as_ref())
        .await?;

    let seed = page.meta.random_seed;
    page.meta.next_page_url = page
        .meta
        .next_page
        .and_then(|p| page_url(&state.base_url, &uri, p, seed));
    page.meta.prev_page_url = page
        .meta
        .prev_page
        .and_then(|p| page_url(&state.base_url, &uri, p, seed));

    Ok(Json(page))
}

/// Get a poll.
async fn get_poll(
    MaybeIdentity(caller): MaybeIdentity,
    State(state): State<AppState>,
    ApiPath(poll_id): ApiPath<i32>,
) -> AppResult<ApiResponse<PollView>> {
    let poll = state.poll_service.get_poll(poll_id, caller.as_ref()).await?;
    Ok(ApiResponse::ok(poll))
}

/// Vote counts of a poll.
async fn poll_votes(
    MaybeIdentity(caller): MaybeIdentity,
    State(state): State<AppState>,
    ApiPath(poll_id): ApiPath<i32>,
) -> AppResult<ApiResponse<Vec<ChoiceCount>>> {
    let counts = state
        .poll_service
        .votes_by_poll(poll_id, caller.as_ref())
        .await?;
    Ok(ApiResponse::ok(counts))
}

/// A user's vote on a poll.
async fn get_vote(
    MaybeIdentity(caller): MaybeIdentity,
    State(state): State<AppState>,
    ApiPath((poll_id, user_id)): ApiPath<(i32, u64)>,
) -> AppResult<ApiResponse<VoteView>> {
    let vote = state
        .poll_service
        .get_vote(poll_id, user_id, caller.as_ref())
        .await?;
    Ok(ApiResponse::ok(vote))
}

/// Every visible vote of a user.
async fn user_votes(
    MaybeIdentity(caller): MaybeIdentity,
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<u64>,
) -> AppResult<ApiResponse<Vec<VoteView>>> {
    let votes = state
        .poll_service
        .votes_by_user(user_id, caller.as_ref())
        .await?;
    Ok(ApiResponse::ok(votes))
}

/// Absolute URL of the same listing at `page`.
///
/// Keeps every other query parameter in its original order. A random
/// listing also pins its seed so that following the link continues the
/// same shuffle.
fn page_url(base: &Url, uri: &Uri, page: u64, seed: Option<i64>) -> Option<String> {
    let mut url = base.join(uri.path()).ok()?;

    let kept: Vec<(String, String)> =
        form_urlencoded::parse(uri.query().unwrap_or_default().as_bytes())
            .into_owned()
            .filter(|(key, _)| key != "page" && !(seed.is_some() && key == "seed"))
            .collect();

    {
        let mut pairs = url.query_pairs_mut();
        pairs
            .clear()
            .extend_pairs(kept)
            .append_pair("page", &page.to_string());
        if let Some(seed) = seed {
            pairs.append_pair("seed", &seed.to_string());
        }
    }

    Some(url.into())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_polls))
        .route("/votes/{user_id}", get(user_votes))
        .route("/{poll_id}", get(get_poll))
        .route("/{poll_id}/votes", get(poll_votes))
        .route("/{poll_id}/votes/{user_id}", get(get_vote))
}
