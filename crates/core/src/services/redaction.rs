//! Visibility rules for polls and their tallies.

use chrono::{DateTime, FixedOffset};
use guildpolls_db::entities::poll;
use guildpolls_db::query::snowflake_from_db;
use serde::Serialize;

use super::tally::Tally;

/// A poll as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollView {
    /// Poll id.
    pub id: i32,
    /// Guild snowflake, as a string.
    pub guild_id: String,
    /// Question text.
    pub question: String,
    /// Longer description.
    pub description: Option<String>,
    /// Choice labels.
    pub choices: Vec<String>,
    /// Per-choice tallies, `null` when hidden from the caller.
    pub votes: Option<Vec<u64>>,
    /// Number of counted votes. Always present.
    pub total_votes: u64,
    /// Whether the poll has been published.
    pub published: bool,
    /// Whether the poll is accepting votes.
    pub active: bool,
    /// Display flag for the question.
    pub show_question: bool,
    /// Display flag for the choices.
    pub show_options: bool,
    /// Whether tallies are public.
    pub show_voting: bool,
    /// Tag key.
    pub tag: Option<i32>,
    /// Scheduled or posted time.
    pub time: Option<DateTime<FixedOffset>>,
    /// Running number within the guild.
    pub num: Option<i32>,
    /// Image URL.
    pub image: Option<String>,
    /// Question posted into the discussion thread.
    pub thread_question: Option<String>,
    /// Fallback flag.
    pub fallback: bool,
}

/// Whether a caller may see the poll at all.
///
/// Unpublished polls need the management override.
#[must_use]
pub const fn poll_visible(published: bool, management_override: bool) -> bool {
    published || management_override
}

/// Whether a caller may see per-choice tallies.
#[must_use]
pub const fn votes_visible(show_voting: bool, management_override: bool) -> bool {
    show_voting || management_override
}

/// Attach a tally to a poll, hiding it when the caller may not see it.
#[must_use]
pub fn redact(poll: poll::Model, tally: Tally, management_override: bool) -> PollView {
    let votes = votes_visible(poll.show_voting, management_override).then_some(tally.votes);
    PollView {
        id: poll.id,
        guild_id: snowflake_from_db(poll.guild_id).to_string(),
        question: poll.question,
        description: poll.description,
        choices: poll.choices,
        votes,
        total_votes: tally.total,
        published: poll.published,
        active: poll.active,
        show_question: poll.show_question,
        show_options: poll.show_options,
        show_voting: poll.show_voting,
        tag: poll.tag,
        time: poll.time,
        num: poll.num,
        image: poll.image,
        thread_question: poll.thread_question,
        fallback: poll.fallback,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::tally::tally;

    fn create_test_poll(show_voting: bool) -> poll::Model {
        poll::Model {
            id: 1,
            guild_id: 42,
            question: "Cats or dogs?".into(),
            description: None,
            choices: vec!["Cats".into(), "Dogs".into()],
            published: true,
            active: true,
            show_question: true,
            show_options: true,
            show_voting,
            tag: None,
            time: None,
            num: None,
            image: None,
            thread_question: None,
            fallback: false,
        }
    }

    #[test]
    fn test_votes_visible_truth_table() {
        for show_voting in [false, true] {
            for management_override in [false, true] {
                let view = redact(
                    create_test_poll(show_voting),
                    tally(2, [0, 1, 1]),
                    management_override,
                );
                assert_eq!(view.votes.is_some(), show_voting || management_override);
                assert_eq!(view.total_votes, 3);
            }
        }
    }

    #[test]
    fn test_hidden_differs_from_zero_votes() {
        let hidden = redact(create_test_poll(false), tally(2, []), false);
        let empty = redact(create_test_poll(true), tally(2, []), false);

        let hidden = serde_json::to_value(hidden).unwrap();
        let empty = serde_json::to_value(empty).unwrap();
        assert!(hidden["votes"].is_null());
        assert_eq!(empty["votes"], serde_json::json!([0, 0]));
        assert_eq!(hidden["totalVotes"], 0);
    }

    #[test]
    fn test_poll_visible() {
        assert!(poll_visible(true, false));
        assert!(poll_visible(false, true));
        assert!(!poll_visible(false, false));
    }

    #[test]
    fn test_guild_id_serialized_as_string() {
        let mut poll = create_test_poll(true);
        poll.guild_id = guildpolls_db::query::snowflake_to_db(u64::MAX);
        let view = redact(poll, Tally::default(), false);
        assert_eq!(view.guild_id, u64::MAX.to_string());
    }
}
