//! Poll query service.
//!
//! Runs a listing request through the pipeline: filter compilation,
//! permission lookup, ordering, tallying, redaction and page metadata.

use std::sync::Arc;
use std::time::Duration;

use guildpolls_common::{AppError, AppResult};
use guildpolls_db::entities::{poll, poll_vote};
use guildpolls_db::query::snowflake_from_db;
use guildpolls_db::{ChoiceCount, PollStore};
use serde::Serialize;
use tracing::debug;

use super::deadline::bounded;
use super::filter::{PollFilterInput, compile_filter};
use super::ordering::{OrderInput, fetch_page};
use super::pagination::PageMeta;
use super::permission::{Identity, PermissionService};
use super::redaction::{PollView, poll_visible, redact, votes_visible};
use super::tally::{group_by_poll, tally};

/// A poll listing request.
#[derive(Debug, Clone, Default)]
pub struct ListPollsInput {
    /// Filter fields.
    pub filter: PollFilterInput,
    /// Ordering fields.
    pub order: OrderInput,
}

/// One page of polls.
#[derive(Debug, Clone, Serialize)]
pub struct PollPage {
    /// Polls on this page.
    pub data: Vec<PollView>,
    /// Page metadata.
    pub meta: PageMeta,
}

/// A single vote as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteView {
    /// Poll voted on.
    pub poll_id: i32,
    /// Voter snowflake, as a string.
    pub user_id: String,
    /// Chosen index.
    pub choice: i16,
}

impl From<poll_vote::Model> for VoteView {
    fn from(vote: poll_vote::Model) -> Self {
        Self {
            poll_id: vote.poll_id,
            user_id: snowflake_from_db(vote.user_id).to_string(),
            choice: vote.choice,
        }
    }
}

/// Poll query service.
#[derive(Clone)]
pub struct PollQueryService {
    store: Arc<dyn PollStore>,
    permissions: PermissionService,
    timeout: Duration,
}

impl PollQueryService {
    /// Create a new poll query service.
    ///
    /// `timeout` bounds every storage call.
    #[must_use]
    pub fn new(store: Arc<dyn PollStore>, permissions: PermissionService, timeout: Duration) -> Self {
        Self {
            store,
            permissions,
            timeout,
        }
    }

    /// List polls of a guild.
    pub async fn list_polls(
        &self,
        input: &ListPollsInput,
        caller: Option<&Identity>,
    ) -> AppResult<PollPage> {
        let filter = &input.filter;
        filter.check()?;
        let order = input.order.resolve()?;

        if filter.guild_id != self.permissions.guild_id() {
            return Err(AppError::Forbidden(
                "Cannot view polls of other guilds".to_string(),
            ));
        }

        let management_override = self
            .permissions
            .management_override(caller, filter.guild_id)
            .await?;
        if !filter.published() && !management_override {
            return Err(AppError::Forbidden(
                "You cannot view unpublished polls".to_string(),
            ));
        }

        let compiled = compile_filter(filter, self.store.as_ref(), self.timeout).await?;

        let total = if compiled.predicate.matches_nothing() {
            0
        } else {
            bounded(self.timeout, "count", self.store.count(&compiled.predicate)).await?
        };

        let rows = fetch_page(self.store.as_ref(), &compiled, order, self.timeout).await?;
        debug!(
            guild_id = filter.guild_id,
            ?order,
            total,
            returned = rows.len(),
            "Listed polls"
        );

        let data = self.tally_and_redact(rows, management_override).await?;
        let meta = PageMeta::new(total, compiled.page, compiled.limit, order.random_seed());

        Ok(PollPage { data, meta })
    }

    /// A single poll.
    ///
    /// Unpublished polls are reported as missing unless the caller manages
    /// the poll's guild.
    pub async fn get_poll(&self, poll_id: i32, caller: Option<&Identity>) -> AppResult<PollView> {
        let (poll, management_override) = self.visible_poll(poll_id, caller).await?;
        let mut views = self.tally_and_redact(vec![poll], management_override).await?;
        views.pop().ok_or(AppError::PollNotFound(poll_id))
    }

    /// Vote counts of a poll, grouped by choice.
    pub async fn votes_by_poll(
        &self,
        poll_id: i32,
        caller: Option<&Identity>,
    ) -> AppResult<Vec<ChoiceCount>> {
        let (poll, management_override) = self.visible_poll(poll_id, caller).await?;
        if !votes_visible(poll.show_voting, management_override) {
            return Err(AppError::Forbidden(
                "Votes are not visible for this poll".to_string(),
            ));
        }
        bounded(self.timeout, "group_count", self.store.group_count(poll_id)).await
    }

    /// One user's vote on a poll.
    pub async fn get_vote(
        &self,
        poll_id: i32,
        user_id: u64,
        caller: Option<&Identity>,
    ) -> AppResult<VoteView> {
        let (poll, management_override) = self.visible_poll(poll_id, caller).await?;
        if !votes_visible(poll.show_voting, management_override) {
            return Err(AppError::Forbidden(
                "Votes are not visible for this poll".to_string(),
            ));
        }
        bounded(self.timeout, "find_vote", self.store.find_vote(poll_id, user_id))
            .await?
            .map(VoteView::from)
            .ok_or_else(|| AppError::VoteNotFound(format!("Vote not found for user {user_id}")))
    }

    /// Every vote of a user on polls whose votes the caller may see.
    pub async fn votes_by_user(
        &self,
        user_id: u64,
        caller: Option<&Identity>,
    ) -> AppResult<Vec<VoteView>> {
        let votes = bounded(self.timeout, "votes_by_user", self.store.votes_by_user(user_id)).await?;
        if votes.is_empty() {
            return Ok(Vec::new());
        }

        let poll_ids: Vec<i32> = votes.iter().map(|v| v.poll_id).collect();
        let polls = bounded(self.timeout, "find_by_ids", self.store.find_by_ids(&poll_ids)).await?;

        let guild_id = self.permissions.guild_id();
        let management_override = self
            .permissions
            .management_override(caller, guild_id)
            .await?;

        let visible = |poll: &poll::Model| {
            let manages = management_override && snowflake_from_db(poll.guild_id) == guild_id;
            poll_visible(poll.published, manages) && votes_visible(poll.show_voting, manages)
        };

        Ok(votes
            .into_iter()
            .filter(|vote| polls.iter().any(|p| p.id == vote.poll_id && visible(p)))
            .map(VoteView::from)
            .collect())
    }

    async fn visible_poll(
        &self,
        poll_id: i32,
        caller: Option<&Identity>,
    ) -> AppResult<(poll::Model, bool)> {
        let poll = bounded(self.timeout, "find_poll", self.store.find_poll(poll_id))
            .await?
            .ok_or(AppError::PollNotFound(poll_id))?;

        let management_override = self
            .permissions
            .management_override(caller, snowflake_from_db(poll.guild_id))
            .await?;
        if !poll_visible(poll.published, management_override) {
            return Err(AppError::PollNotFound(poll_id));
        }
        Ok((poll, management_override))
    }

    async fn tally_and_redact(
        &self,
        polls: Vec<poll::Model>,
        management_override: bool,
    ) -> AppResult<Vec<PollView>> {
        if polls.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i32> = polls.iter().map(|p| p.id).collect();
        let rows = bounded(self.timeout, "vote_rows", self.store.vote_rows(&ids)).await?;
        let mut grouped = group_by_poll(&rows);

        Ok(polls
            .into_iter()
            .map(|poll| {
                let choices = grouped.remove(&poll.id).unwrap_or_default();
                let counted = tally(poll.choices.len(), choices);
                redact(poll, counted, management_override)
            })
            .collect())
    }
}
