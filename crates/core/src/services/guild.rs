//! Guild service.

use std::sync::Arc;
use std::time::Duration;

use guildpolls_common::{AppError, AppResult};
use guildpolls_db::GuildStore;
use guildpolls_db::entities::guild_info;
use guildpolls_db::query::snowflake_from_db;
use serde::Serialize;

use super::deadline::bounded;
use super::permission::{Identity, PermissionService};

/// Guild configuration as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuildView {
    /// Guild snowflake, as a string.
    pub guild_id: String,
    /// Channel polls are posted to by default.
    pub default_channel_id: String,
    /// Roles granting management.
    pub manager_role_ids: Vec<String>,
    /// Default embed colour.
    pub default_colour: Option<i32>,
}

impl From<guild_info::Model> for GuildView {
    fn from(guild: guild_info::Model) -> Self {
        Self {
            guild_id: snowflake_from_db(guild.guild_id).to_string(),
            default_channel_id: snowflake_from_db(guild.default_channel_id).to_string(),
            manager_role_ids: guild
                .manager_role_id
                .into_iter()
                .map(|r| snowflake_from_db(r).to_string())
                .collect(),
            default_colour: guild.default_colour,
        }
    }
}

/// The caller's standing in a guild.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipView {
    /// Caller is a member.
    pub in_guild: bool,
    /// Caller holds a manager role.
    pub manager: bool,
}

/// Guild service.
#[derive(Clone)]
pub struct GuildService {
    store: Arc<dyn GuildStore>,
    permissions: PermissionService,
    timeout: Duration,
}

impl GuildService {
    /// Create a new guild service.
    #[must_use]
    pub fn new(store: Arc<dyn GuildStore>, permissions: PermissionService, timeout: Duration) -> Self {
        Self {
            store,
            permissions,
            timeout,
        }
    }

    /// Configuration of a guild.
    pub async fn get_guild(&self, guild_id: u64) -> AppResult<GuildView> {
        bounded(self.timeout, "find_guild", self.store.find_guild(guild_id))
            .await?
            .map(GuildView::from)
            .ok_or(AppError::GuildNotFound(guild_id))
    }

    /// Membership and management standing of the caller.
    pub async fn membership(
        &self,
        guild_id: u64,
        caller: Option<&Identity>,
    ) -> AppResult<MembershipView> {
        if guild_id != self.permissions.guild_id() {
            return Err(AppError::Forbidden(
                "Cannot check membership of other guilds".to_string(),
            ));
        }
        let caller = caller.ok_or(AppError::Unauthorized)?;

        let in_guild = self.permissions.is_in_guild(caller, guild_id).await;
        let manager = in_guild && self.permissions.has_management_perms(caller, guild_id).await?;
        Ok(MembershipView { in_guild, manager })
    }
}
