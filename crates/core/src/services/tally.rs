//! Vote tally aggregation.

use std::collections::HashMap;

use guildpolls_db::VoteRow;

use super::validation::choice_index;

/// Per-choice vote counts of one poll.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tally {
    /// One slot per choice.
    pub votes: Vec<u64>,
    /// Sum of `votes`.
    pub total: u64,
}

/// Count `choices` into `choice_count` slots.
///
/// Indices rejected by [`choice_index`] are skipped, not errors.
#[must_use]
pub fn tally(choice_count: usize, choices: impl IntoIterator<Item = i16>) -> Tally {
    let mut votes = vec![0_u64; choice_count];
    for choice in choices {
        if let Some(slot) = choice_index(choice, choice_count).and_then(|i| votes.get_mut(i)) {
            *slot += 1;
        }
    }
    let total = votes.iter().sum();
    Tally { votes, total }
}

/// Split the vote rows of a page by poll.
#[must_use]
pub fn group_by_poll(rows: &[VoteRow]) -> HashMap<i32, Vec<i16>> {
    let mut grouped: HashMap<i32, Vec<i16>> = HashMap::new();
    for row in rows {
        grouped.entry(row.poll_id).or_default().push(row.choice);
    }
    grouped
}
