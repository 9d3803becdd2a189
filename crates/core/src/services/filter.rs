//! Filter compiler.
//!
//! Turns the filter fields of a poll listing request into a
//! [`PollPredicate`] plus a normalized page window.

use std::time::Duration;

use guildpolls_common::{AppError, AppResult};
use guildpolls_db::{PollClause, PollPredicate, PollStore};

use super::deadline::bounded;

/// Page used when the caller gives none.
pub const DEFAULT_PAGE: u64 = 1;

/// Page size used when the caller gives none.
pub const DEFAULT_LIMIT: u64 = 10;

/// Largest page size a caller may ask for.
pub const MAX_LIMIT: u64 = 100;

/// Largest row offset storage accepts (`BIGINT`).
const MAX_OFFSET: u64 = i64::MAX.unsigned_abs();

/// Characters escaped by [`sanitize_search`].
const SEARCH_SPECIAL: &[char] = &['\\', '&', '|', '!', '(', ')', '"', '\'', '`', '%', '_'];

/// Filter fields of a poll listing request.
#[derive(Debug, Clone, Default)]
pub struct PollFilterInput {
    /// Guild the polls belong to.
    pub guild_id: u64,
    /// Published flag; `None` means published polls.
    pub published: Option<bool>,
    /// Tag the polls carry.
    pub tag: Option<i32>,
    /// Restrict to polls this user voted on (or did not, with `not_voted`).
    pub user_id: Option<u64>,
    /// Invert the `user_id` restriction.
    pub not_voted: Option<bool>,
    /// Free-text search.
    pub search: Option<String>,
    /// 1-based page number.
    pub page: Option<u64>,
    /// Page size.
    pub limit: Option<u64>,
}

impl PollFilterInput {
    /// Published flag after defaulting.
    #[must_use]
    pub fn published(&self) -> bool {
        self.published.unwrap_or(true)
    }

    /// Reject inconsistent fields. Runs before any storage call.
    pub fn check(&self) -> AppResult<()> {
        if self.not_voted == Some(true) && self.user_id.is_none() {
            return Err(AppError::BadRequest(
                "notVoted requires userId".to_string(),
            ));
        }
        if self.page == Some(0) {
            return Err(AppError::BadRequest("page must be at least 1".to_string()));
        }
        if self.limit == Some(0) {
            return Err(AppError::BadRequest("limit must be at least 1".to_string()));
        }
        if self.limit.is_some_and(|limit| limit > MAX_LIMIT) {
            return Err(AppError::BadRequest(format!(
                "limit must be at most {MAX_LIMIT}"
            )));
        }

        let page = self.page.unwrap_or(DEFAULT_PAGE);
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT);
        if page_offset(page, limit).is_none() {
            return Err(AppError::BadRequest(format!("page {page} is out of range")));
        }
        Ok(())
    }
}

/// Rows before `page`, or `None` when the offset does not fit storage.
fn page_offset(page: u64, limit: u64) -> Option<u64> {
    page.checked_sub(1)?
        .checked_mul(limit)
        .filter(|offset| *offset <= MAX_OFFSET)
}

/// Result of compiling a [`PollFilterInput`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledFilter {
    /// Storage predicate.
    pub predicate: PollPredicate,
    /// 1-based page number.
    pub page: u64,
    /// Page size.
    pub limit: u64,
}

impl CompiledFilter {
    /// Rows to skip before the page starts.
    ///
    /// [`compile_filter`] only produces windows whose offset fits; anything
    /// else saturates rather than wrapping.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

/// Normalize free-text search input.
///
/// Lower-cases, escapes query operators and LIKE metacharacters with a
/// backslash, and collapses whitespace. Returns `None` when nothing is left.
#[must_use]
pub fn sanitize_search(input: &str) -> Option<String> {
    let escaped: Vec<String> = input
        .split_whitespace()
        .map(|token| {
            let mut out = String::with_capacity(token.len());
            for c in token.to_lowercase().chars() {
                if SEARCH_SPECIAL.contains(&c) {
                    out.push('\\');
                }
                out.push(c);
            }
            out
        })
        .collect();

    if escaped.is_empty() {
        None
    } else {
        Some(escaped.join(" "))
    }
}

/// Compile a listing request into a predicate.
///
/// A user filter costs one extra storage call to resolve the user's voted
/// poll ids. Excluding an empty set is no restriction; including an empty
/// set matches nothing.
pub async fn compile_filter(
    input: &PollFilterInput,
    store: &dyn PollStore,
    timeout: Duration,
) -> AppResult<CompiledFilter> {
    input.check()?;

    let mut predicate = PollPredicate::for_guild(input.guild_id)
        .and(PollClause::Published(input.published()));

    if let Some(tag) = input.tag {
        predicate = predicate.and(PollClause::Tag(tag));
    }

    if let Some(user_id) = input.user_id {
        let voted = bounded(timeout, "voted_poll_ids", store.voted_poll_ids(user_id)).await?;
        if input.not_voted == Some(true) {
            if !voted.is_empty() {
                predicate = predicate.and(PollClause::IdNotIn(voted));
            }
        } else if voted.is_empty() {
            predicate = predicate.and(PollClause::MatchNothing);
        } else {
            predicate = predicate.and(PollClause::IdIn(voted));
        }
    }

    if let Some(search) = input.search.as_deref().and_then(sanitize_search) {
        predicate = predicate.and(PollClause::Search(search));
    }

    Ok(CompiledFilter {
        predicate,
        page: input.page.unwrap_or(DEFAULT_PAGE),
        limit: input.limit.unwrap_or(DEFAULT_LIMIT),
    })
}
