//! Engine-neutral poll predicates and orderings.
//!
//! The filter compiler in `guildpolls-core` produces a [`PollPredicate`]
//! made of [`PollClause`]s. Storage adapters translate it: the sea-orm
//! repositories into a `Condition`, the in-memory store into
//! [`PollPredicate::matches`]. Both must agree on every clause.

use crate::entities::poll;
use serde::{Deserialize, Serialize};

/// One conjunct of a poll predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollClause {
    /// Poll belongs to this guild.
    Guild(u64),
    /// Poll has this `published` flag.
    Published(bool),
    /// Poll carries this tag.
    Tag(i32),
    /// Poll id is one of these.
    IdIn(Vec<i32>),
    /// Poll id is none of these.
    IdNotIn(Vec<i32>),
    /// Case-insensitive substring over question, description and choices.
    ///
    /// Holds sanitized text: lower-cased, with LIKE metacharacters and
    /// query operators escaped by a backslash.
    Search(String),
    /// Matches no poll at all.
    MatchNothing,
}

/// Conjunction of [`PollClause`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollPredicate {
    clauses: Vec<PollClause>,
}

impl PollPredicate {
    /// Predicate selecting every poll of a guild.
    #[must_use]
    pub fn for_guild(guild_id: u64) -> Self {
        Self {
            clauses: vec![PollClause::Guild(guild_id)],
        }
    }

    /// Add a clause.
    #[must_use]
    pub fn and(mut self, clause: PollClause) -> Self {
        self.clauses.push(clause);
        self
    }

    /// Clauses in insertion order.
    #[must_use]
    pub fn clauses(&self) -> &[PollClause] {
        &self.clauses
    }

    /// Whether the predicate is statically known to select nothing.
    #[must_use]
    pub fn matches_nothing(&self) -> bool {
        self.clauses.iter().any(|c| match c {
            PollClause::MatchNothing => true,
            PollClause::IdIn(ids) => ids.is_empty(),
            _ => false,
        })
    }

    /// Evaluate the predicate against a loaded row.
    #[must_use]
    pub fn matches(&self, row: &poll::Model) -> bool {
        self.clauses.iter().all(|clause| match clause {
            PollClause::Guild(guild_id) => row.guild_id == snowflake_to_db(*guild_id),
            PollClause::Published(published) => row.published == *published,
            PollClause::Tag(tag) => row.tag == Some(*tag),
            PollClause::IdIn(ids) => ids.contains(&row.id),
            PollClause::IdNotIn(ids) => !ids.contains(&row.id),
            PollClause::Search(escaped) => {
                let needle = unescape_search(escaped);
                let hit = |text: &str| text.to_lowercase().contains(&needle);
                hit(&row.question)
                    || row.description.as_deref().is_some_and(hit)
                    || row.choices.iter().any(|c| hit(c))
            }
            PollClause::MatchNothing => false,
        })
    }
}

/// Sort direction for time and vote-count ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
    /// Ascending.
    Asc,
    /// Descending.
    #[default]
    Desc,
}

/// Orderings that rank poll ids without loading full rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankBy {
    /// By number of vote rows, ties by id ascending.
    VoteCount(SortDir),
    /// By [`random_sort_key`] for this seed, ties by id ascending.
    RandomKey(i64),
}

/// A vote row reduced to what tallying needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteRow {
    /// Poll the vote belongs to.
    pub poll_id: i32,
    /// Chosen index.
    pub choice: i16,
}

/// Grouped count of votes for one choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceCount {
    /// Choice index.
    pub choice: i16,
    /// Number of votes for it.
    pub votes: i64,
}

/// Deterministic per-row sort key for seeded-random ordering.
///
/// Lower-case hex MD5 of `"{poll_id}-{seed}"`. Postgres computes the same
/// value with `md5(concat(id::text, '-', seed))`, so ordering by it is
/// identical in SQL and in memory.
#[must_use]
pub fn random_sort_key(poll_id: i32, seed: i64) -> String {
    format!("{:x}", md5::compute(format!("{poll_id}-{seed}")))
}

/// Snowflakes are unsigned in the domain and stored as `BIGINT`.
#[must_use]
pub const fn snowflake_to_db(id: u64) -> i64 {
    id as i64
}

/// Inverse of [`snowflake_to_db`].
#[must_use]
pub const fn snowflake_from_db(id: i64) -> u64 {
    id as u64
}

fn unescape_search(escaped: &str) -> String {
    let mut out = String::with_capacity(escaped.len());
    let mut chars = escaped.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}
