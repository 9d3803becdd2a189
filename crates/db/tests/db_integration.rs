//! Database integration tests.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test --test db_integration -- --ignored`
//!
//! Environment variables:
//!   `TEST_DB_HOST` (default: localhost)
//!   `TEST_DB_PORT` (default: 5433)
//!   `TEST_DB_USER` (default: `guildpolls_test`)
//!   `TEST_DB_PASSWORD` (default: `guildpolls_test`)
//!   `TEST_DB_NAME` (default: `guildpolls_test`)
//!
//! Each test seeds the same rows into `PostgreSQL` and into the in-memory
//! store and checks that both answer identically.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use guildpolls_db::entities::{poll, poll_vote};
use guildpolls_db::repositories::PollRepository;
use guildpolls_db::test_utils::{InMemoryStore, TestDatabase};
use guildpolls_db::{PollClause, PollPredicate, PollStore, RankBy, SortDir};
use sea_orm::{ActiveModelTrait, IntoActiveModel};

const GUILD: u64 = 42;

fn create_test_poll(id: i32, question: &str, choices: &[&str]) -> poll::Model {
    poll::Model {
        id,
        guild_id: 42,
        question: question.to_string(),
        description: None,
        choices: choices.iter().map(ToString::to_string).collect(),
        published: true,
        active: false,
        show_question: true,
        show_options: true,
        show_voting: true,
        tag: None,
        time: None,
        num: Some(id),
        image: None,
        thread_question: None,
        fallback: false,
    }
}

async fn seed(db: &TestDatabase, memory: &InMemoryStore) {
    let polls = [
        create_test_poll(1, "Best pizza topping?", &["Pineapple", "Ham"]),
        create_test_poll(2, "Tabs or spaces?", &["Tabs", "Spaces"]),
        create_test_poll(3, "Is 100% enough?", &["Yes", "No"]),
        create_test_poll(4, "Favourite season?", &["Summer", "Winter"]),
    ];
    for row in polls {
        row.clone().into_active_model().reset_all().insert(&db.conn).await.unwrap();
        memory.insert_poll(row).await;
    }
    let votes = [(2, 10, 0), (2, 11, 1), (3, 10, 1), (4, 12, 0), (4, 13, 0), (4, 14, 1)];
    for (poll_id, user_id, choice) in votes {
        let row = poll_vote::Model { poll_id, user_id, choice };
        row.clone().into_active_model().reset_all().insert(&db.conn).await.unwrap();
        memory.insert_vote(row).await;
    }
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_random_order_matches_in_memory() {
    let db = TestDatabase::new().await.expect("Failed to connect");
    db.cleanup().await.unwrap();
    let memory = InMemoryStore::new();
    seed(&db, &memory).await;

    let repo = PollRepository::new(Arc::new(db.conn));
    let predicate = PollPredicate::for_guild(GUILD);
    for seed in [0, 1, 12345, 9_007_199_254_740_991] {
        let sql = repo.rank_ids(&predicate, RankBy::RandomKey(seed), 10, 0).await.unwrap();
        let mem = memory.rank_ids(&predicate, RankBy::RandomKey(seed), 10, 0).await.unwrap();
        assert_eq!(sql, mem, "seed {seed}");
    }
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_vote_order_matches_in_memory() {
    let db = TestDatabase::new().await.expect("Failed to connect");
    db.cleanup().await.unwrap();
    let memory = InMemoryStore::new();
    seed(&db, &memory).await;

    let repo = PollRepository::new(Arc::new(db.conn));
    let predicate = PollPredicate::for_guild(GUILD);
    for dir in [SortDir::Asc, SortDir::Desc] {
        let sql = repo.rank_ids(&predicate, RankBy::VoteCount(dir), 10, 0).await.unwrap();
        let mem = memory.rank_ids(&predicate, RankBy::VoteCount(dir), 10, 0).await.unwrap();
        assert_eq!(sql, mem);
    }
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_search_matches_in_memory() {
    let db = TestDatabase::new().await.expect("Failed to connect");
    db.cleanup().await.unwrap();
    let memory = InMemoryStore::new();
    seed(&db, &memory).await;

    let repo = PollRepository::new(Arc::new(db.conn));
    for needle in ["pizza", "spaces", "100\\%", "winter"] {
        let predicate = PollPredicate::for_guild(GUILD).and(PollClause::Search(needle.into()));
        let sql = repo.count(&predicate).await.unwrap();
        let mem = memory.count(&predicate).await.unwrap();
        assert_eq!(sql, mem, "needle {needle}");
        assert_eq!(sql, 1);
    }
}
