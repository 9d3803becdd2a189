//! Tag service.

use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use guildpolls_common::{AppError, AppResult};
use guildpolls_db::TagStore;
use guildpolls_db::entities::poll_tag;
use guildpolls_db::query::snowflake_from_db;
use serde::Serialize;

use super::deadline::bounded;
use super::permission::{Identity, PermissionService};

/// A tag as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagView {
    /// Tag key.
    pub tag: i32,
    /// Guild snowflake, as a string.
    pub guild_id: String,
    /// Display name.
    pub name: String,
    /// Channel snowflake, as a string.
    pub channel_id: String,
    /// Embed colour.
    pub colour: Option<i32>,
    /// Whether the tag survives cleanup.
    pub persistent: bool,
}

impl From<poll_tag::Model> for TagView {
    fn from(tag: poll_tag::Model) -> Self {
        Self {
            tag: tag.tag,
            guild_id: snowflake_from_db(tag.guild_id).to_string(),
            name: tag.name,
            channel_id: snowflake_from_db(tag.channel_id).to_string(),
            colour: tag.colour,
            persistent: tag.persistent,
        }
    }
}

/// Tag service.
#[derive(Clone)]
pub struct TagService {
    store: Arc<dyn TagStore>,
    permissions: PermissionService,
    timeout: Duration,
}

impl TagService {
    /// Create a new tag service.
    #[must_use]
    pub fn new(store: Arc<dyn TagStore>, permissions: PermissionService, timeout: Duration) -> Self {
        Self {
            store,
            permissions,
            timeout,
        }
    }

    /// Tags of a guild, most recently used first.
    ///
    /// Recency counts published polls only, unless the caller manages the
    /// guild. Tags without any such poll come last.
    pub async fn list_tags(&self, guild_id: u64, caller: Option<&Identity>) -> AppResult<Vec<TagView>> {
        if guild_id != self.permissions.guild_id() {
            return Err(AppError::Forbidden(
                "Cannot view tags of other guilds".to_string(),
            ));
        }

        let management_override = self.permissions.management_override(caller, guild_id).await?;

        let mut tags = bounded(self.timeout, "tags_for_guild", self.store.tags_for_guild(guild_id)).await?;
        let latest: HashMap<i32, _> = bounded(
            self.timeout,
            "latest_poll_times",
            self.store.latest_poll_times(guild_id, !management_override),
        )
        .await?
        .into_iter()
        .collect();

        tags.sort_by_key(|t| (Reverse(latest.get(&t.tag).copied().flatten()), t.tag));
        Ok(tags.into_iter().map(TagView::from).collect())
    }

    /// A single tag.
    pub async fn get_tag(&self, tag: i32) -> AppResult<TagView> {
        bounded(self.timeout, "find_tag", self.store.find_tag(tag))
            .await?
            .map(TagView::from)
            .ok_or(AppError::TagNotFound(tag))
    }
}
