//! Test utilities for database operations.
//!
//! [`InMemoryStore`] implements every storage trait over plain vectors and
//! is what the service and API tests run against. [`TestDatabase`] connects
//! to a real `PostgreSQL` instance for the ignored integration tests.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::time::Duration;

use async_trait::async_trait;
use guildpolls_common::AppResult;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, DbErr, Statement};
use tokio::sync::RwLock;
use tracing::info;

use crate::entities::{guild_info, poll, poll_tag, poll_vote};
use crate::query::{
    ChoiceCount, PollPredicate, RankBy, SortDir, VoteRow, random_sort_key, snowflake_to_db,
};
use crate::store::{GuildStore, PollStore, TagStore};

#[derive(Default)]
struct Tables {
    polls: Vec<poll::Model>,
    votes: Vec<poll_vote::Model>,
    tags: Vec<poll_tag::Model>,
    guilds: Vec<guild_info::Model>,
}

/// In-memory implementation of the storage traits.
///
/// Clones share the same tables. Every trait call bumps [`Self::calls`]
/// and sleeps for the configured delay first, which lets tests assert that
/// a request never reached storage or that it timed out.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
    calls: Arc<AtomicUsize>,
    delay: Option<Duration>,
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every storage call by `delay`.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of storage calls made so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(AtomicOrdering::SeqCst)
    }

    /// Insert a poll row.
    pub async fn insert_poll(&self, row: poll::Model) {
        self.tables.write().await.polls.push(row);
    }

    /// Insert a vote row, replacing the user's previous vote on that poll.
    pub async fn insert_vote(&self, row: poll_vote::Model) {
        let mut tables = self.tables.write().await;
        tables
            .votes
            .retain(|v| !(v.poll_id == row.poll_id && v.user_id == row.user_id));
        tables.votes.push(row);
    }

    /// Insert a tag row.
    pub async fn insert_tag(&self, row: poll_tag::Model) {
        self.tables.write().await.tags.push(row);
    }

    /// Insert a guild configuration row.
    pub async fn insert_guild(&self, row: guild_info::Model) {
        self.tables.write().await.guilds.push(row);
    }

    async fn enter(&self) {
        self.calls.fetch_add(1, AtomicOrdering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    async fn matching(&self, predicate: &PollPredicate) -> Vec<poll::Model> {
        self.tables
            .read()
            .await
            .polls
            .iter()
            .filter(|p| predicate.matches(p))
            .cloned()
            .collect()
    }
}

fn page<T>(rows: Vec<T>, limit: u64, offset: u64) -> Vec<T> {
    rows.into_iter()
        .skip(usize::try_from(offset).unwrap_or(usize::MAX))
        .take(usize::try_from(limit).unwrap_or(usize::MAX))
        .collect()
}

/// `PostgreSQL` sorts NULL as larger than every value in both directions.
fn cmp_time(a: Option<DateTimeWithTimeZone>, b: Option<DateTimeWithTimeZone>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

fn directed(ordering: Ordering, dir: SortDir) -> Ordering {
    match dir {
        SortDir::Asc => ordering,
        SortDir::Desc => ordering.reverse(),
    }
}

#[async_trait]
impl PollStore for InMemoryStore {
    async fn count(&self, predicate: &PollPredicate) -> AppResult<u64> {
        self.enter().await;
        Ok(self.matching(predicate).await.len() as u64)
    }

    async fn page_by_time(
        &self,
        predicate: &PollPredicate,
        dir: SortDir,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<poll::Model>> {
        self.enter().await;
        let mut rows = self.matching(predicate).await;
        rows.sort_by(|a, b| directed(cmp_time(a.time, b.time), dir).then(a.id.cmp(&b.id)));
        Ok(page(rows, limit, offset))
    }

    async fn rank_ids(
        &self,
        predicate: &PollPredicate,
        rank: RankBy,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<i32>> {
        self.enter().await;
        let rows = self.matching(predicate).await;
        let mut ids: Vec<i32> = rows.iter().map(|p| p.id).collect();
        match rank {
            RankBy::VoteCount(dir) => {
                let choice_counts: HashMap<i32, usize> =
                    rows.iter().map(|p| (p.id, p.choices.len())).collect();
                let tables = self.tables.read().await;
                let mut counts: HashMap<i32, usize> = HashMap::new();
                for vote in &tables.votes {
                    let current = choice_counts.get(&vote.poll_id).is_some_and(|len| {
                        usize::try_from(vote.choice).is_ok_and(|choice| choice < *len)
                    });
                    if current {
                        *counts.entry(vote.poll_id).or_default() += 1;
                    }
                }
                let count = |id: &i32| counts.get(id).copied().unwrap_or(0);
                ids.sort_by(|a, b| directed(count(a).cmp(&count(b)), dir).then(a.cmp(b)));
            }
            RankBy::RandomKey(seed) => {
                ids.sort_by(|a, b| {
                    random_sort_key(*a, seed)
                        .cmp(&random_sort_key(*b, seed))
                        .then(a.cmp(b))
                });
            }
        }
        Ok(page(ids, limit, offset))
    }

    async fn find_by_ids(&self, ids: &[i32]) -> AppResult<Vec<poll::Model>> {
        self.enter().await;
        Ok(self
            .tables
            .read()
            .await
            .polls
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn find_poll(&self, id: i32) -> AppResult<Option<poll::Model>> {
        self.enter().await;
        Ok(self
            .tables
            .read()
            .await
            .polls
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn vote_rows(&self, poll_ids: &[i32]) -> AppResult<Vec<VoteRow>> {
        self.enter().await;
        Ok(self
            .tables
            .read()
            .await
            .votes
            .iter()
            .filter(|v| poll_ids.contains(&v.poll_id))
            .map(|v| VoteRow {
                poll_id: v.poll_id,
                choice: v.choice,
            })
            .collect())
    }

    async fn group_count(&self, poll_id: i32) -> AppResult<Vec<ChoiceCount>> {
        self.enter().await;
        let tables = self.tables.read().await;
        let mut counts: Vec<ChoiceCount> = Vec::new();
        for vote in tables.votes.iter().filter(|v| v.poll_id == poll_id) {
            match counts.iter_mut().find(|c| c.choice == vote.choice) {
                Some(entry) => entry.votes += 1,
                None => counts.push(ChoiceCount {
                    choice: vote.choice,
                    votes: 1,
                }),
            }
        }
        counts.sort_by_key(|c| c.choice);
        Ok(counts)
    }

    async fn voted_poll_ids(&self, user_id: u64) -> AppResult<Vec<i32>> {
        self.enter().await;
        let user_id = snowflake_to_db(user_id);
        Ok(self
            .tables
            .read()
            .await
            .votes
            .iter()
            .filter(|v| v.user_id == user_id)
            .map(|v| v.poll_id)
            .collect())
    }

    async fn find_vote(&self, poll_id: i32, user_id: u64) -> AppResult<Option<poll_vote::Model>> {
        self.enter().await;
        let user_id = snowflake_to_db(user_id);
        Ok(self
            .tables
            .read()
            .await
            .votes
            .iter()
            .find(|v| v.poll_id == poll_id && v.user_id == user_id)
            .cloned())
    }

    async fn votes_by_user(&self, user_id: u64) -> AppResult<Vec<poll_vote::Model>> {
        self.enter().await;
        let user_id = snowflake_to_db(user_id);
        let mut votes: Vec<poll_vote::Model> = self
            .tables
            .read()
            .await
            .votes
            .iter()
            .filter(|v| v.user_id == user_id)
            .cloned()
            .collect();
        votes.sort_by_key(|v| v.poll_id);
        Ok(votes)
    }
}

#[async_trait]
impl GuildStore for InMemoryStore {
    async fn find_guild(&self, guild_id: u64) -> AppResult<Option<guild_info::Model>> {
        self.enter().await;
        let guild_id = snowflake_to_db(guild_id);
        Ok(self
            .tables
            .read()
            .await
            .guilds
            .iter()
            .find(|g| g.guild_id == guild_id)
            .cloned())
    }
}

#[async_trait]
impl TagStore for InMemoryStore {
    async fn find_tag(&self, tag: i32) -> AppResult<Option<poll_tag::Model>> {
        self.enter().await;
        Ok(self
            .tables
            .read()
            .await
            .tags
            .iter()
            .find(|t| t.tag == tag)
            .cloned())
    }

    async fn tags_for_guild(&self, guild_id: u64) -> AppResult<Vec<poll_tag::Model>> {
        self.enter().await;
        let guild_id = snowflake_to_db(guild_id);
        let mut tags: Vec<poll_tag::Model> = self
            .tables
            .read()
            .await
            .tags
            .iter()
            .filter(|t| t.guild_id == guild_id)
            .cloned()
            .collect();
        tags.sort_by_key(|t| t.tag);
        Ok(tags)
    }

    async fn latest_poll_times(
        &self,
        guild_id: u64,
        published_only: bool,
    ) -> AppResult<Vec<(i32, Option<DateTimeWithTimeZone>)>> {
        self.enter().await;
        let guild_id = snowflake_to_db(guild_id);
        let tables = self.tables.read().await;
        let mut latest: HashMap<i32, Option<DateTimeWithTimeZone>> = HashMap::new();
        for row in tables
            .polls
            .iter()
            .filter(|p| p.guild_id == guild_id && (!published_only || p.published))
        {
            if let Some(tag) = row.tag {
                let entry = latest.entry(tag).or_insert(None);
                // max() ignores NULL
                if row.time > *entry {
                    *entry = row.time;
                }
            }
        }
        Ok(latest.into_iter().collect())
    }
}

/// Test database configuration.
#[derive(Debug, Clone)]
pub struct TestDbConfig {
    /// Database host.
    pub host: String,
    /// Database port.
    pub port: u16,
    /// Database username.
    pub username: String,
    /// Database password.
    pub password: String,
    /// Database name.
    pub database: String,
}

impl Default for TestDbConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("TEST_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("TEST_DB_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5433),
            username: std::env::var("TEST_DB_USER")
                .unwrap_or_else(|_| "guildpolls_test".to_string()),
            password: std::env::var("TEST_DB_PASSWORD")
                .unwrap_or_else(|_| "guildpolls_test".to_string()),
            database: std::env::var("TEST_DB_NAME")
                .unwrap_or_else(|_| "guildpolls_test".to_string()),
        }
    }
}

impl TestDbConfig {
    /// Get the database URL.
    #[must_use]
    pub fn database_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database
        )
    }
}

/// A migrated test database.
pub struct TestDatabase {
    /// Database connection.
    pub conn: DatabaseConnection,
}

impl TestDatabase {
    /// Connect with the environment-derived configuration and migrate.
    pub async fn new() -> Result<Self, DbErr> {
        Self::with_config(TestDbConfig::default()).await
    }

    /// Connect with a custom configuration and migrate.
    pub async fn with_config(config: TestDbConfig) -> Result<Self, DbErr> {
        use sea_orm_migration::MigratorTrait;

        let conn = Database::connect(&config.database_url()).await?;
        crate::migrations::Migrator::up(&conn, None).await?;

        info!(database = %config.database, "Connected to test database");

        Ok(Self { conn })
    }

    /// Truncate every poll table.
    pub async fn cleanup(&self) -> Result<(), DbErr> {
        self.conn
            .execute(Statement::from_string(
                DatabaseBackend::Postgres,
                "TRUNCATE TABLE poll_vote, poll, poll_tag, guild_info RESTART IDENTITY CASCADE"
                    .to_string(),
            ))
            .await?;

        info!("Cleaned up test database");
        Ok(())
    }
}
