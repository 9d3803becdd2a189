//! API integration tests.
//!
//! These tests drive the router end to end against the in-memory store and
//! a fake identity provider.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::redundant_clone)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use guildpolls_api::{AppState, identity_middleware, router as api_router};
use guildpolls_common::AppResult;
use guildpolls_core::{
    GuildMember, GuildService, IdentityProvider, MembershipCache, PermissionService,
    PollQueryService, TagService,
};
use guildpolls_db::entities::{guild_info, poll, poll_tag, poll_vote};
use guildpolls_db::test_utils::InMemoryStore;
use serde_json::Value;
use tower::ServiceExt;
use url::Url;

const GUILD: u64 = 42;
const MANAGER_ROLE: u64 = 500;
const MANAGER_TOKEN: &str = "manager-token";
const MEMBER_TOKEN: &str = "member-token";

/// Identity provider keyed by access token.
struct FakeProvider {
    calls: AtomicUsize,
}

impl FakeProvider {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    async fn guild_member(
        &self,
        _guild_id: u64,
        credential: &str,
    ) -> AppResult<Option<GuildMember>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(match credential {
            MANAGER_TOKEN => Some(GuildMember {
                roles: vec![1, MANAGER_ROLE],
            }),
            MEMBER_TOKEN => Some(GuildMember { roles: vec![1] }),
            _ => None,
        })
    }
}

fn create_test_poll(id: i32, published: bool, show_voting: bool) -> poll::Model {
    poll::Model {
        id,
        guild_id: GUILD as i64,
        question: format!("Question {id}"),
        description: None,
        choices: vec!["Yes".into(), "No".into()],
        published,
        active: false,
        show_question: true,
        show_options: true,
        show_voting,
        tag: None,
        time: None,
        num: Some(id),
        image: None,
        thread_question: None,
        fallback: false,
    }
}

async fn add_votes(store: &InMemoryStore, poll_id: i32, tally: [i16; 2]) {
    let mut user_id = i64::from(poll_id) * 1000;
    for (choice, count) in tally.iter().enumerate() {
        for _ in 0..*count {
            user_id += 1;
            store
                .insert_vote(poll_vote::Model {
                    poll_id,
                    user_id,
                    choice: choice as i16,
                })
                .await;
        }
    }
}

/// Three published polls tallied `[3,1]`, `[0,0]` and `[5,5]`.
async fn create_test_store() -> InMemoryStore {
    let store = InMemoryStore::new();
    store
        .insert_guild(guild_info::Model {
            guild_id: GUILD as i64,
            default_channel_id: 10,
            manager_role_id: vec![MANAGER_ROLE as i64],
            default_colour: Some(0x00ff_00),
        })
        .await;
    for (id, tally) in [(1, [3, 1]), (2, [0, 0]), (3, [5, 5])] {
        store.insert_poll(create_test_poll(id, true, true)).await;
        add_votes(&store, id, tally).await;
    }
    store
}

fn create_test_app(store: &InMemoryStore, provider: Arc<FakeProvider>) -> Router {
    let timeout = Duration::from_secs(1);
    let permissions = PermissionService::new(
        Arc::new(store.clone()),
        provider,
        MembershipCache::new(Duration::from_secs(120)),
        GUILD,
        Duration::from_millis(100),
        timeout,
    );

    let state = AppState {
        poll_service: PollQueryService::new(Arc::new(store.clone()), permissions.clone(), timeout),
        tag_service: TagService::new(Arc::new(store.clone()), permissions.clone(), timeout),
        guild_service: GuildService::new(Arc::new(store.clone()), permissions, timeout),
        base_url: Url::parse("https://polls.example.com").unwrap(),
    };

    Router::new()
        .nest("/api/v1", api_router())
        .layer(axum::middleware::from_fn(identity_middleware))
        .with_state(state)
}

async fn get(app: &Router, uri: &str, token: Option<&str>, user_id: u64) -> (StatusCode, Value) {
    let mut request = Request::builder().uri(uri);
    if let Some(token) = token {
        request = request
            .header("Authorization", format!("Bearer {token}"))
            .header("X-Discord-User-Id", user_id.to_string());
    }

    let response = app
        .clone()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn ids(body: &Value) -> Vec<i64> {
    body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn test_list_polls_ordered_by_votes() {
    let store = create_test_store().await;
    let app = create_test_app(&store, FakeProvider::new());

    let (status, body) = get(
        &app,
        "/api/v1/polls?guildId=42&order=votes&orderDir=desc&limit=2&page=1",
        None,
        0,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec![3, 1]);
    assert_eq!(body["data"][0]["votes"], serde_json::json!([5, 5]));
    assert_eq!(body["data"][0]["totalVotes"], 10);
    assert_eq!(body["data"][1]["totalVotes"], 4);

    let meta = &body["meta"];
    assert_eq!(meta["total"], 3);
    assert_eq!(meta["totalPages"], 2);
    assert_eq!(meta["nextPage"], 2);
    assert!(meta["prevPage"].is_null());
    assert_eq!(
        meta["nextPageUrl"],
        "https://polls.example.com/api/v1/polls?guildId=42&order=votes&orderDir=desc&limit=2&page=2"
    );
    assert!(meta.get("prevPageUrl").is_none());
    assert!(meta.get("randomSeed").is_none());
}

#[tokio::test]
async fn test_single_page_has_no_neighbours() {
    let store = create_test_store().await;
    let app = create_test_app(&store, FakeProvider::new());

    let (status, body) = get(&app, "/api/v1/polls?guildId=42", None, 0).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
    assert_eq!(body["meta"]["totalPages"], 1);
    assert!(body["meta"]["nextPage"].is_null());
    assert!(body["meta"]["prevPage"].is_null());
}

#[tokio::test]
async fn test_hidden_votes_are_null_unless_manager() {
    let store = create_test_store().await;
    store.insert_poll(create_test_poll(4, true, false)).await;
    add_votes(&store, 4, [2, 0]).await;
    let app = create_test_app(&store, FakeProvider::new());

    let (_, anonymous) = get(&app, "/api/v1/polls/4", None, 0).await;
    assert!(anonymous["data"]["votes"].is_null());
    assert_eq!(anonymous["data"]["totalVotes"], 2);

    let (_, member) = get(&app, "/api/v1/polls/4", Some(MEMBER_TOKEN), 7).await;
    assert!(member["data"]["votes"].is_null());

    let (_, manager) = get(&app, "/api/v1/polls/4", Some(MANAGER_TOKEN), 8).await;
    assert_eq!(manager["data"]["votes"], serde_json::json!([2, 0]));
}

#[tokio::test]
async fn test_unpublished_listing_requires_manager() {
    let store = create_test_store().await;
    store.insert_poll(create_test_poll(5, false, true)).await;
    let provider = FakeProvider::new();
    let app = create_test_app(&store, provider.clone());

    let (status, body) = get(&app, "/api/v1/polls?guildId=42&published=false", None, 0).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let (status, _) = get(
        &app,
        "/api/v1/polls?guildId=42&published=false",
        Some(MEMBER_TOKEN),
        7,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = get(
        &app,
        "/api/v1/polls?guildId=42&published=false",
        Some(MANAGER_TOKEN),
        8,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&body), vec![5]);

    // Second manager request is served from the membership cache.
    let calls = provider.calls();
    let (status, _) = get(
        &app,
        "/api/v1/polls?guildId=42&published=false",
        Some(MANAGER_TOKEN),
        8,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(provider.calls(), calls);
}

#[tokio::test]
async fn test_unpublished_poll_reads_as_missing() {
    let store = create_test_store().await;
    store.insert_poll(create_test_poll(5, false, true)).await;
    let app = create_test_app(&store, FakeProvider::new());

    let (status, body) = get(&app, "/api/v1/polls/5", None, 0).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "POLL_NOT_FOUND");

    let (status, _) = get(&app, "/api/v1/polls/5", Some(MANAGER_TOKEN), 8).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = get(&app, "/api/v1/polls/99", None, 0).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_parameters_are_bad_requests() {
    let store = create_test_store().await;
    let app = create_test_app(&store, FakeProvider::new());

    for uri in [
        "/api/v1/polls?guildId=42&notVoted=true",
        "/api/v1/polls?guildId=42&orderDir=asc",
        "/api/v1/polls?guildId=42&order=time&seed=5",
        "/api/v1/polls?guildId=42&order=random&orderDir=asc",
        "/api/v1/polls?guildId=42&order=sideways",
        "/api/v1/polls?guildId=42&page=0",
        "/api/v1/polls?guildId=abc",
        "/api/v1/polls",
        "/api/v1/polls/abc",
    ] {
        let (status, body) = get(&app, uri, None, 0).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(body["error"]["code"].is_string(), "{uri}");
    }

    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn test_out_of_range_page_and_limit_are_bad_requests() {
    let store = create_test_store().await;
    let app = create_test_app(&store, FakeProvider::new());

    for uri in [
        "/api/v1/polls?guildId=42&page=18446744073709551615",
        "/api/v1/polls?guildId=42&page=18446744073709551615&limit=100",
        "/api/v1/polls?guildId=42&page=9223372036854775807&limit=2",
        "/api/v1/polls?guildId=42&limit=101",
        "/api/v1/polls?guildId=42&limit=18446744073709551615",
        "/api/v1/polls?guildId=42&page=18446744073709551616",
    ] {
        let (status, body) = get(&app, uri, None, 0).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(body["error"]["code"].is_string(), "{uri}");
    }
    assert_eq!(store.calls(), 0);

    // A far page that still fits is simply empty.
    let (status, body) = get(
        &app,
        "/api/v1/polls?guildId=42&page=1000000&limit=100",
        None,
        0,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());
    assert_eq!(body["meta"]["total"], 3);
    assert_eq!(body["meta"]["prevPage"], 999_999);
}

#[tokio::test]
async fn test_other_guild_is_forbidden() {
    let store = create_test_store().await;
    let app = create_test_app(&store, FakeProvider::new());

    let (status, _) = get(&app, "/api/v1/polls?guildId=43", None, 0).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = get(&app, "/api/v1/tags?guildId=43", None, 0).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_random_order_is_reproducible() {
    let store = create_test_store().await;
    for id in 10..30 {
        store.insert_poll(create_test_poll(id, true, true)).await;
    }
    let app = create_test_app(&store, FakeProvider::new());

    let uri = "/api/v1/polls?guildId=42&order=random&seed=12345&limit=5";
    let (status, first) = get(&app, uri, None, 0).await;
    let (_, second) = get(&app, uri, None, 0).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids(&first), ids(&second));
    assert_eq!(first["meta"]["randomSeed"], 12345);
    assert_eq!(
        first["meta"]["nextPageUrl"],
        "https://polls.example.com/api/v1/polls?guildId=42&order=random&limit=5&page=2&seed=12345"
    );

    // A server-drawn seed is echoed and pinned into the page links.
    let (_, drawn) = get(&app, "/api/v1/polls?guildId=42&order=random&limit=5", None, 0).await;
    let seed = drawn["meta"]["randomSeed"].as_i64().unwrap();
    assert!(
        drawn["meta"]["nextPageUrl"]
            .as_str()
            .unwrap()
            .ends_with(&format!("&seed={seed}"))
    );
}

#[tokio::test]
async fn test_not_voted_filter() {
    let store = create_test_store().await;
    let app = create_test_app(&store, FakeProvider::new());

    // User 1001 voted on poll 1 only.
    let (_, voted) = get(&app, "/api/v1/polls?guildId=42&userId=1001", None, 0).await;
    assert_eq!(ids(&voted), vec![1]);

    let (_, not_voted) = get(
        &app,
        "/api/v1/polls?guildId=42&userId=1001&notVoted=true&order=votes&orderDir=asc",
        None,
        0,
    )
    .await;
    assert_eq!(ids(&not_voted), vec![2, 3]);

    // A user without votes is excluded from nothing.
    let (_, nobody) = get(&app, "/api/v1/polls?guildId=42&userId=5&notVoted=true", None, 0).await;
    assert_eq!(nobody["meta"]["total"], 3);
}

#[tokio::test]
async fn test_vote_endpoints() {
    let store = create_test_store().await;
    store.insert_poll(create_test_poll(4, true, false)).await;
    add_votes(&store, 4, [1, 0]).await;
    let app = create_test_app(&store, FakeProvider::new());

    let (status, counts) = get(&app, "/api/v1/polls/1/votes", None, 0).await;
    assert_eq!(status, StatusCode::OK);
    let total: i64 = counts["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["votes"].as_i64().unwrap())
        .sum();
    assert_eq!(total, 4);

    let (status, vote) = get(&app, "/api/v1/polls/1/votes/1001", None, 0).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(vote["data"]["userId"], "1001");
    assert_eq!(vote["data"]["choice"], 0);

    let (status, body) = get(&app, "/api/v1/polls/1/votes/5", None, 0).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "VOTE_NOT_FOUND");

    // Poll 4 hides its votes.
    let (status, _) = get(&app, "/api/v1/polls/4/votes", None, 0).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = get(&app, "/api/v1/polls/4/votes/4001", None, 0).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = get(&app, "/api/v1/polls/4/votes", Some(MANAGER_TOKEN), 8).await;
    assert_eq!(status, StatusCode::OK);

    let (status, votes) = get(&app, "/api/v1/polls/votes/4001", None, 0).await;
    assert_eq!(status, StatusCode::OK);
    assert!(votes["data"].as_array().unwrap().is_empty());

    let (_, votes) = get(&app, "/api/v1/polls/votes/4001", Some(MANAGER_TOKEN), 8).await;
    assert_eq!(votes["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_tags() {
    let store = create_test_store().await;
    for (tag, name) in [(1, "Food"), (2, "Games")] {
        store
            .insert_tag(poll_tag::Model {
                tag,
                guild_id: GUILD as i64,
                name: name.into(),
                channel_id: 10,
                colour: None,
                persistent: false,
            })
            .await;
    }
    let mut tagged = create_test_poll(6, true, true);
    tagged.tag = Some(2);
    tagged.time = Some(chrono::Utc::now().fixed_offset());
    store.insert_poll(tagged).await;
    let app = create_test_app(&store, FakeProvider::new());

    let (status, tags) = get(&app, "/api/v1/tags?guildId=42", None, 0).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tags["data"][0]["name"], "Games");
    assert_eq!(tags["data"][1]["name"], "Food");
    assert_eq!(tags["data"][0]["guildId"], "42");

    let (status, tag) = get(&app, "/api/v1/tags/1", None, 0).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tag["data"]["name"], "Food");

    let (status, body) = get(&app, "/api/v1/tags/9", None, 0).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "TAG_NOT_FOUND");
}

#[tokio::test]
async fn test_guild_info_and_membership() {
    let store = create_test_store().await;
    let app = create_test_app(&store, FakeProvider::new());

    let (status, guild) = get(&app, "/api/v1/guilds/42", None, 0).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(guild["data"]["guildId"], "42");
    assert_eq!(guild["data"]["managerRoleIds"], serde_json::json!(["500"]));

    let (status, _) = get(&app, "/api/v1/guilds/43", None, 0).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(&app, "/api/v1/guilds/42/membership", None, 0).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, member) = get(&app, "/api/v1/guilds/42/membership", Some(MEMBER_TOKEN), 7).await;
    assert_eq!(member["data"], serde_json::json!({"inGuild": true, "manager": false}));

    let (_, manager) = get(&app, "/api/v1/guilds/42/membership", Some(MANAGER_TOKEN), 8).await;
    assert_eq!(manager["data"], serde_json::json!({"inGuild": true, "manager": true}));

    let (_, stranger) = get(&app, "/api/v1/guilds/42/membership", Some("other"), 9).await;
    assert_eq!(stranger["data"], serde_json::json!({"inGuild": false, "manager": false}));
}
