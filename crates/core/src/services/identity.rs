//! Identity provider client.
//!
//! The identity provider is the only source of guild role membership. The
//! permission service consults it through the membership cache.

use std::sync::Arc;

use async_trait::async_trait;
use guildpolls_common::{AppError, AppResult};
use reqwest::StatusCode;
use serde::Deserialize;

/// A guild member as reported by the identity provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuildMember {
    /// Role ids held in the guild.
    pub roles: Vec<u64>,
}

/// Source of guild membership.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Membership of the credential's owner in `guild_id`.
    ///
    /// `Ok(None)` means the identity is not a member.
    async fn guild_member(&self, guild_id: u64, credential: &str)
    -> AppResult<Option<GuildMember>>;
}

/// Shared identity provider handle.
pub type IdentityService = Arc<dyn IdentityProvider>;

/// Discord REST implementation of [`IdentityProvider`].
#[derive(Clone)]
pub struct DiscordIdentityProvider {
    http_client: reqwest::Client,
    api_base: String,
}

#[derive(Deserialize)]
struct DiscordMember {
    #[serde(default)]
    roles: Vec<String>,
}

impl DiscordIdentityProvider {
    /// Create a client for the Discord API rooted at `api_base`.
    #[must_use]
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    fn member_url(&self, guild_id: u64) -> String {
        format!("{}/users/@me/guilds/{guild_id}/member", self.api_base)
    }
}

#[async_trait]
impl IdentityProvider for DiscordIdentityProvider {
    async fn guild_member(
        &self,
        guild_id: u64,
        credential: &str,
    ) -> AppResult<Option<GuildMember>> {
        let response = self
            .http_client
            .get(self.member_url(guild_id))
            .bearer_auth(credential)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Discord request failed: {e}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalService(format!(
                "Discord API error: {status} - {body}"
            )));
        }

        let member: DiscordMember = response
            .json()
            .await
            .map_err(|e| AppError::ExternalService(format!("Invalid Discord member: {e}")))?;

        // Snowflakes arrive as strings
        let roles = member
            .roles
            .iter()
            .filter_map(|r| r.parse::<u64>().ok())
            .collect();
        Ok(Some(GuildMember { roles }))
    }
}
