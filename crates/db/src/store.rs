//! Storage executor traits.
//!
//! These are the only storage primitives the query engine needs. The
//! sea-orm repositories implement them for Postgres; the in-memory store in
//! [`crate::test_utils`] implements them for tests.

use async_trait::async_trait;
use guildpolls_common::AppResult;
use sea_orm::prelude::DateTimeWithTimeZone;

use crate::entities::{guild_info, poll, poll_tag, poll_vote};
use crate::query::{ChoiceCount, PollPredicate, RankBy, SortDir, VoteRow};

/// Poll and vote queries.
#[async_trait]
pub trait PollStore: Send + Sync {
    /// Number of polls matching the predicate.
    async fn count(&self, predicate: &PollPredicate) -> AppResult<u64>;

    /// One page of full poll rows ordered by `time`, ties by id ascending.
    async fn page_by_time(
        &self,
        predicate: &PollPredicate,
        dir: SortDir,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<poll::Model>>;

    /// One page of poll ids ranked at the aggregate level.
    async fn rank_ids(
        &self,
        predicate: &PollPredicate,
        rank: RankBy,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<i32>>;

    /// Full rows for the given ids, in no particular order.
    async fn find_by_ids(&self, ids: &[i32]) -> AppResult<Vec<poll::Model>>;

    /// A single poll.
    async fn find_poll(&self, id: i32) -> AppResult<Option<poll::Model>>;

    /// Vote rows for the given polls.
    async fn vote_rows(&self, poll_ids: &[i32]) -> AppResult<Vec<VoteRow>>;

    /// Votes of one poll grouped by choice.
    async fn group_count(&self, poll_id: i32) -> AppResult<Vec<ChoiceCount>>;

    /// Ids of every poll the user has voted on.
    async fn voted_poll_ids(&self, user_id: u64) -> AppResult<Vec<i32>>;

    /// A user's vote on one poll.
    async fn find_vote(&self, poll_id: i32, user_id: u64) -> AppResult<Option<poll_vote::Model>>;

    /// Every vote a user has cast.
    async fn votes_by_user(&self, user_id: u64) -> AppResult<Vec<poll_vote::Model>>;
}

/// Guild configuration lookups.
#[async_trait]
pub trait GuildStore: Send + Sync {
    /// Configuration of a guild, including its manager roles.
    async fn find_guild(&self, guild_id: u64) -> AppResult<Option<guild_info::Model>>;
}

/// Tag lookups.
#[async_trait]
pub trait TagStore: Send + Sync {
    /// A single tag.
    async fn find_tag(&self, tag: i32) -> AppResult<Option<poll_tag::Model>>;

    /// Every tag of a guild.
    async fn tags_for_guild(&self, guild_id: u64) -> AppResult<Vec<poll_tag::Model>>;

    /// Latest poll `time` per tag, optionally over published polls only.
    ///
    /// Tags without a matching poll are absent.
    async fn latest_poll_times(
        &self,
        guild_id: u64,
        published_only: bool,
    ) -> AppResult<Vec<(i32, Option<DateTimeWithTimeZone>)>>;
}
