//! Poll repository.

use std::sync::Arc;

use async_trait::async_trait;
use guildpolls_common::{AppError, AppResult};
use sea_orm::sea_query::{Alias, Expr, extension::postgres::PgExpr};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, JoinType, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, RelationTrait, Select,
};

use crate::entities::{Poll, PollVote, poll, poll_vote};
use crate::query::{
    ChoiceCount, PollClause, PollPredicate, RankBy, SortDir, VoteRow, snowflake_to_db,
};
use crate::store::PollStore;

/// Poll repository for database operations.
#[derive(Clone)]
pub struct PollRepository {
    db: Arc<DatabaseConnection>,
}

impl PollRepository {
    /// Create a new poll repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

const fn order(dir: SortDir) -> Order {
    match dir {
        SortDir::Asc => Order::Asc,
        SortDir::Desc => Order::Desc,
    }
}

/// Translate a predicate into a sea-orm condition over the `poll` table.
pub(crate) fn to_condition(predicate: &PollPredicate) -> Condition {
    predicate
        .clauses()
        .iter()
        .fold(Condition::all(), |cond, clause| cond.add(clause_condition(clause)))
}

fn clause_condition(clause: &PollClause) -> Condition {
    match clause {
        PollClause::Guild(guild_id) => {
            Condition::all().add(poll::Column::GuildId.eq(snowflake_to_db(*guild_id)))
        }
        PollClause::Published(published) => {
            Condition::all().add(poll::Column::Published.eq(*published))
        }
        PollClause::Tag(tag) => Condition::all().add(poll::Column::Tag.eq(*tag)),
        PollClause::IdIn(ids) => Condition::all().add(poll::Column::Id.is_in(ids.clone())),
        PollClause::IdNotIn(ids) => {
            Condition::all().add(poll::Column::Id.is_not_in(ids.clone()))
        }
        PollClause::Search(escaped) => {
            let pattern = format!("%{escaped}%");
            Condition::any()
                .add(Expr::col((Poll, poll::Column::Question)).ilike(pattern.clone()))
                .add(Expr::col((Poll, poll::Column::Description)).ilike(pattern.clone()))
                .add(Expr::cust_with_values(
                    r#"EXISTS (SELECT 1 FROM unnest("poll"."choices") AS ch WHERE ch ILIKE $1)"#,
                    [pattern],
                ))
        }
        PollClause::MatchNothing => Condition::all().add(Expr::cust("FALSE")),
    }
}

#[async_trait]
impl PollStore for PollRepository {
    async fn count(&self, predicate: &PollPredicate) -> AppResult<u64> {
        Poll::find()
            .filter(to_condition(predicate))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn page_by_time(
        &self,
        predicate: &PollPredicate,
        dir: SortDir,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<poll::Model>> {
        Poll::find()
            .filter(to_condition(predicate))
            .order_by(poll::Column::Time, order(dir))
            .order_by_asc(poll::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn rank_ids(
        &self,
        predicate: &PollPredicate,
        rank: RankBy,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<i32>> {
        match rank {
            RankBy::VoteCount(dir) => {
                let rows = ranked_by_votes(predicate, dir)
                    .limit(limit)
                    .offset(offset)
                    .into_tuple::<(i32, i64)>()
                    .all(self.db.as_ref())
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                Ok(rows.into_iter().map(|(id, _)| id).collect())
            }
            RankBy::RandomKey(seed) => {
                // Same key as `query::random_sort_key`.
                let key = Expr::cust(format!(
                    r#"md5(concat("poll"."id"::text, '-', '{seed}'))"#
                ));
                Poll::find()
                    .select_only()
                    .column(poll::Column::Id)
                    .filter(to_condition(predicate))
                    .order_by(key, Order::Asc)
                    .order_by_asc(poll::Column::Id)
                    .limit(limit)
                    .offset(offset)
                    .into_tuple::<i32>()
                    .all(self.db.as_ref())
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))
            }
        }
    }

    async fn find_by_ids(&self, ids: &[i32]) -> AppResult<Vec<poll::Model>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Poll::find()
            .filter(poll::Column::Id.is_in(ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn find_poll(&self, id: i32) -> AppResult<Option<poll::Model>> {
        Poll::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn vote_rows(&self, poll_ids: &[i32]) -> AppResult<Vec<VoteRow>> {
        if poll_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = PollVote::find()
            .select_only()
            .column(poll_vote::Column::PollId)
            .column(poll_vote::Column::Choice)
            .filter(poll_vote::Column::PollId.is_in(poll_ids.to_vec()))
            .into_tuple::<(i32, i16)>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(rows
            .into_iter()
            .map(|(poll_id, choice)| VoteRow { poll_id, choice })
            .collect())
    }

    async fn group_count(&self, poll_id: i32) -> AppResult<Vec<ChoiceCount>> {
        let rows = PollVote::find()
            .select_only()
            .column(poll_vote::Column::Choice)
            .column_as(Expr::col(poll_vote::Column::UserId).count(), "votes")
            .filter(poll_vote::Column::PollId.eq(poll_id))
            .group_by(poll_vote::Column::Choice)
            .order_by_asc(poll_vote::Column::Choice)
            .into_tuple::<(i16, i64)>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(rows
            .into_iter()
            .map(|(choice, votes)| ChoiceCount { choice, votes })
            .collect())
    }

    async fn voted_poll_ids(&self, user_id: u64) -> AppResult<Vec<i32>> {
        PollVote::find()
            .select_only()
            .column(poll_vote::Column::PollId)
            .filter(poll_vote::Column::UserId.eq(snowflake_to_db(user_id)))
            .into_tuple::<i32>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn find_vote(&self, poll_id: i32, user_id: u64) -> AppResult<Option<poll_vote::Model>> {
        PollVote::find_by_id((poll_id, snowflake_to_db(user_id)))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn votes_by_user(&self, user_id: u64) -> AppResult<Vec<poll_vote::Model>> {
        PollVote::find()
            .filter(poll_vote::Column::UserId.eq(snowflake_to_db(user_id)))
            .order_by_asc(poll_vote::Column::PollId)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

/// Poll ids of `predicate` ordered by vote count.
///
/// Only votes for one of the poll's current choices are counted, matching
/// what the tally shows.
fn ranked_by_votes(predicate: &PollPredicate, dir: SortDir) -> Select<Poll> {
    Poll::find()
        .select_only()
        .column(poll::Column::Id)
        .column_as(
            Expr::col((PollVote, poll_vote::Column::UserId)).count(),
            "vote_count",
        )
        .join(
            JoinType::LeftJoin,
            poll::Relation::Votes.def().on_condition(|_, vote| {
                Condition::all().add(
                    Expr::col((vote, poll_vote::Column::Choice))
                        .lt(Expr::cust(r#"cardinality("poll"."choices")"#)),
                )
            }),
        )
        .filter(to_condition(predicate))
        .group_by(poll::Column::Id)
        .order_by(Expr::col(Alias::new("vote_count")), order(dir))
        .order_by_asc(poll::Column::Id)
}
