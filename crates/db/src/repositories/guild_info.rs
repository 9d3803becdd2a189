//! Guild configuration repository.

use std::sync::Arc;

use async_trait::async_trait;
use guildpolls_common::{AppError, AppResult};
use sea_orm::{DatabaseConnection, EntityTrait};

use crate::entities::{GuildInfo, guild_info};
use crate::query::snowflake_to_db;
use crate::store::GuildStore;

/// Guild configuration repository.
#[derive(Clone)]
pub struct GuildInfoRepository {
    db: Arc<DatabaseConnection>,
}

impl GuildInfoRepository {
    /// Create a new guild configuration repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl GuildStore for GuildInfoRepository {
    async fn find_guild(&self, guild_id: u64) -> AppResult<Option<guild_info::Model>> {
        GuildInfo::find_by_id(snowflake_to_db(guild_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_find_guild_with_manager_roles() {
        let guild = guild_info::Model {
            guild_id: 281_648_235_557_421_056,
            default_channel_id: 10,
            manager_role_id: vec![111, 222],
            default_colour: None,
        };
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[guild.clone()]])
                .into_connection(),
        );

        let repo = GuildInfoRepository::new(db);
        let found = repo.find_guild(281_648_235_557_421_056).await.unwrap();

        assert_eq!(found, Some(guild));
    }

    #[tokio::test]
    async fn test_find_guild_missing() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<guild_info::Model>::new()])
                .into_connection(),
        );

        let repo = GuildInfoRepository::new(db);
        assert!(repo.find_guild(1).await.unwrap().is_none());
    }
}
