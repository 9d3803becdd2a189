//! Poll and vote validation.
//!
//! [`choice_index`] is shared with the read path, where [`tally`] uses it to
//! drop stale vote rows. [`validate_poll`], [`validate_published_update`] and
//! [`validate_choice`] are the checks for the poll and vote mutation
//! workflows. Mutations are handled outside this read service, so none of
//! its HTTP operations call them.
//!
//! [`tally`]: crate::services::tally::tally

use chrono::{DateTime, FixedOffset};
use guildpolls_common::{AppError, AppResult};
use guildpolls_db::entities::poll;
use serde::Deserialize;
use validator::Validate;

/// Most choices a poll may have. Vote rows store the index in `0..=7`.
pub const MAX_CHOICES: usize = 8;

/// A poll as submitted for creation or update.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PollDraft {
    /// Question text.
    pub question: String,
    /// Choice labels.
    #[validate(length(min = 1, max = 8))]
    pub choices: Vec<String>,
    /// Guild the poll belongs to.
    pub guild_id: u64,
    /// Tag key.
    #[validate(range(min = 0))]
    pub tag: Option<i32>,
    /// Scheduled time.
    pub time: Option<DateTime<FixedOffset>>,
}

/// Check a draft: non-empty question, 1 to 8 non-empty choices.
pub fn validate_poll(draft: &PollDraft) -> AppResult<()> {
    if draft.question.trim().is_empty() {
        return Err(AppError::Validation(
            "Poll question must be a non-empty string".to_string(),
        ));
    }

    draft
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    if draft.choices.iter().any(|c| c.trim().is_empty()) {
        return Err(AppError::Validation(
            "All poll choices must be non-empty strings".to_string(),
        ));
    }
    Ok(())
}

/// Check an update against the stored poll.
///
/// Once published, the number of choices and the time are fixed.
pub fn validate_published_update(draft: &PollDraft, existing: &poll::Model) -> AppResult<()> {
    if !existing.published {
        return Ok(());
    }
    if draft.choices.len() != existing.choices.len() {
        return Err(AppError::Validation(
            "Cannot change the number of choices for a published poll".to_string(),
        ));
    }
    if draft.time != existing.time {
        return Err(AppError::Validation(
            "Cannot change the time of a published poll".to_string(),
        ));
    }
    Ok(())
}

/// Slot of `choice` in a poll with `choice_count` choices.
#[must_use]
pub fn choice_index(choice: i16, choice_count: usize) -> Option<usize> {
    usize::try_from(choice)
        .ok()
        .filter(|index| *index < MAX_CHOICES && *index < choice_count)
}

/// Check a vote's choice index against a poll with `choice_count` choices.
pub fn validate_choice(choice: i16, choice_count: usize) -> AppResult<()> {
    choice_index(choice, choice_count)
        .map(|_| ())
        .ok_or_else(|| AppError::BadRequest(format!("{choice} is not a valid choice")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn draft(question: &str, choices: &[&str]) -> PollDraft {
        PollDraft {
            question: question.to_string(),
            choices: choices.iter().map(ToString::to_string).collect(),
            guild_id: 42,
            tag: None,
            time: None,
        }
    }

    fn existing(published: bool) -> poll::Model {
        poll::Model {
            id: 1,
            guild_id: 42,
            question: "q".into(),
            description: None,
            choices: vec!["a".into(), "b".into()],
            published,
            active: false,
            show_question: true,
            show_options: true,
            show_voting: true,
            tag: None,
            time: None,
            num: None,
            image: None,
            thread_question: None,
            fallback: false,
        }
    }

    #[test]
    fn test_validate_poll_accepts_one_to_eight_choices() {
        assert!(validate_poll(&draft("q", &["a"])).is_ok());
        assert!(validate_poll(&draft("q", &["a"; 8])).is_ok());
    }

    #[test]
    fn test_validate_poll_rejects_bad_drafts() {
        assert!(validate_poll(&draft("q", &[])).is_err());
        assert!(validate_poll(&draft("q", &["a"; 9])).is_err());
        assert!(validate_poll(&draft("  ", &["a"])).is_err());
        assert!(validate_poll(&draft("q", &["a", " "])).is_err());

        let mut negative_tag = draft("q", &["a"]);
        negative_tag.tag = Some(-1);
        assert!(matches!(
            validate_poll(&negative_tag),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_published_poll_keeps_choice_count_and_time() {
        assert!(validate_published_update(&draft("new", &["x", "y"]), &existing(true)).is_ok());
        assert!(validate_published_update(&draft("q", &["a"]), &existing(true)).is_err());
        assert!(validate_published_update(&draft("q", &["a"]), &existing(false)).is_ok());

        let mut moved = draft("q", &["a", "b"]);
        moved.time = Some(chrono::Utc::now().fixed_offset());
        assert!(validate_published_update(&moved, &existing(true)).is_err());
    }

    #[test]
    fn test_validate_choice() {
        assert!(validate_choice(0, 2).is_ok());
        assert!(validate_choice(1, 2).is_ok());
        assert!(validate_choice(2, 2).is_err());
        assert!(validate_choice(-1, 2).is_err());
        assert!(validate_choice(8, 10).is_err());
        assert!(validate_choice(7, 8).is_ok());
    }

    #[test]
    fn test_choice_index_agrees_with_validate_choice() {
        for choice_count in 0..=10_usize {
            for choice in -2..12_i16 {
                assert_eq!(
                    choice_index(choice, choice_count).is_some(),
                    validate_choice(choice, choice_count).is_ok(),
                    "{choice} of {choice_count}"
                );
            }
        }
        assert_eq!(choice_index(3, 4), Some(3));
    }
}
