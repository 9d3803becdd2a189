//! Permission service.
//!
//! Answers whether an identity is in the configured guild and whether it
//! holds one of the guild's manager roles. Positive answers from the
//! identity provider are cached; negative answers and provider failures are
//! not, and both read as "no".

use std::sync::Arc;
use std::time::Duration;

use guildpolls_common::AppResult;
use guildpolls_db::GuildStore;
use guildpolls_db::query::snowflake_from_db;
use tracing::{debug, warn};

use super::deadline::bounded;
use super::identity::IdentityService;
use super::membership::MembershipCache;

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Discord user id.
    pub user_id: u64,
    /// Access token presented to the identity provider.
    pub credential: String,
}

/// Guild membership and management checks.
#[derive(Clone)]
pub struct PermissionService {
    guild_store: Arc<dyn GuildStore>,
    identity: IdentityService,
    cache: MembershipCache,
    guild_id: u64,
    provider_timeout: Duration,
    query_timeout: Duration,
}

impl PermissionService {
    /// Create a permission service for the configured guild.
    #[must_use]
    pub fn new(
        guild_store: Arc<dyn GuildStore>,
        identity: IdentityService,
        cache: MembershipCache,
        guild_id: u64,
        provider_timeout: Duration,
        query_timeout: Duration,
    ) -> Self {
        Self {
            guild_store,
            identity,
            cache,
            guild_id,
            provider_timeout,
            query_timeout,
        }
    }

    /// The guild this deployment serves.
    #[must_use]
    pub const fn guild_id(&self) -> u64 {
        self.guild_id
    }

    /// The shared membership cache.
    #[must_use]
    pub const fn cache(&self) -> &MembershipCache {
        &self.cache
    }

    /// Roles of `who` in the configured guild, from cache or provider.
    ///
    /// `None` when the identity is not a member or the provider failed.
    async fn roles(&self, who: &Identity) -> Option<Vec<u64>> {
        if let Some(roles) = self.cache.get(who.user_id).await {
            return Some(roles);
        }

        let lookup = tokio::time::timeout(
            self.provider_timeout,
            self.identity.guild_member(self.guild_id, &who.credential),
        )
        .await;

        match lookup {
            Ok(Ok(Some(member))) => {
                debug!(user_id = who.user_id, roles = member.roles.len(), "Fetched guild member");
                self.cache.insert(who.user_id, member.roles.clone()).await;
                Some(member.roles)
            }
            Ok(Ok(None)) => {
                debug!(user_id = who.user_id, "Identity is not a guild member");
                None
            }
            Ok(Err(e)) => {
                warn!(user_id = who.user_id, error = %e, "Identity provider lookup failed");
                None
            }
            Err(_) => {
                warn!(
                    user_id = who.user_id,
                    timeout_ms = self.provider_timeout.as_millis(),
                    "Identity provider lookup timed out"
                );
                None
            }
        }
    }

    /// Whether `who` is a member of `guild_id`.
    pub async fn is_in_guild(&self, who: &Identity, guild_id: u64) -> bool {
        if guild_id != self.guild_id {
            return false;
        }
        self.roles(who).await.is_some()
    }

    /// Whether `who` holds a manager role of `guild_id`.
    ///
    /// Unknown guilds and guilds other than the configured one grant
    /// nothing. Only storage errors are returned as errors.
    pub async fn has_management_perms(&self, who: &Identity, guild_id: u64) -> AppResult<bool> {
        if guild_id != self.guild_id {
            return Ok(false);
        }

        let Some(guild) = bounded(
            self.query_timeout,
            "find_guild",
            self.guild_store.find_guild(guild_id),
        )
        .await?
        else {
            return Ok(false);
        };

        let Some(roles) = self.roles(who).await else {
            return Ok(false);
        };

        Ok(guild
            .manager_role_id
            .iter()
            .any(|role| roles.contains(&snowflake_from_db(*role))))
    }

    /// [`Self::has_management_perms`] for an optional caller.
    pub async fn management_override(&self, who: Option<&Identity>, guild_id: u64) -> AppResult<bool> {
        match who {
            Some(who) => self.has_management_perms(who, guild_id).await,
            None => Ok(false),
        }
    }
}
