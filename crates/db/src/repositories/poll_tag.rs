//! Poll tag repository.

use std::sync::Arc;

use async_trait::async_trait;
use guildpolls_common::{AppError, AppResult};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};

use crate::entities::{Poll, PollTag, poll, poll_tag};
use crate::query::snowflake_to_db;
use crate::store::TagStore;

/// Poll tag repository.
#[derive(Clone)]
pub struct PollTagRepository {
    db: Arc<DatabaseConnection>,
}

impl PollTagRepository {
    /// Create a new poll tag repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TagStore for PollTagRepository {
    async fn find_tag(&self, tag: i32) -> AppResult<Option<poll_tag::Model>> {
        PollTag::find_by_id(tag)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn tags_for_guild(&self, guild_id: u64) -> AppResult<Vec<poll_tag::Model>> {
        PollTag::find()
            .filter(poll_tag::Column::GuildId.eq(snowflake_to_db(guild_id)))
            .order_by_asc(poll_tag::Column::Tag)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn latest_poll_times(
        &self,
        guild_id: u64,
        published_only: bool,
    ) -> AppResult<Vec<(i32, Option<DateTimeWithTimeZone>)>> {
        let mut query = Poll::find()
            .select_only()
            .column(poll::Column::Tag)
            .column_as(Expr::col(poll::Column::Time).max(), "latest")
            .filter(poll::Column::GuildId.eq(snowflake_to_db(guild_id)))
            .filter(poll::Column::Tag.is_not_null());
        if published_only {
            query = query.filter(poll::Column::Published.eq(true));
        }
        query
            .group_by(poll::Column::Tag)
            .into_tuple::<(i32, Option<DateTimeWithTimeZone>)>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_tag(tag: i32, name: &str) -> poll_tag::Model {
        poll_tag::Model {
            tag,
            guild_id: 42,
            name: name.to_string(),
            channel_id: 7,
            colour: None,
            persistent: false,
        }
    }

    #[tokio::test]
    async fn test_find_tag() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_tag(1, "Daily")]])
                .into_connection(),
        );

        let repo = PollTagRepository::new(db);
        let tag = repo.find_tag(1).await.unwrap().unwrap();

        assert_eq!(tag.name, "Daily");
    }

    #[tokio::test]
    async fn test_tags_for_guild() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_tag(1, "Daily"), create_test_tag(2, "Weekly")]])
                .into_connection(),
        );

        let repo = PollTagRepository::new(db);
        let tags = repo.tags_for_guild(42).await.unwrap();

        assert_eq!(tags.len(), 2);
    }
}
