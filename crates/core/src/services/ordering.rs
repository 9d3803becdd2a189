//! Ordering strategies for poll listings.
//!
//! `time` pages straight out of storage. `votes` and `random` rank ids at
//! the aggregate level first and then load exactly the page's rows, so the
//! re-fetch has to restore the ranked order itself.

use std::collections::HashMap;
use std::time::Duration;

use guildpolls_common::{AppError, AppResult};
use guildpolls_db::entities::poll;
use guildpolls_db::{PollStore, RankBy, SortDir};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::deadline::bounded;
use super::filter::CompiledFilter;

/// Largest seed a caller may pass or the server may generate (2^53 - 1).
pub const MAX_SEED: i64 = 9_007_199_254_740_991;

/// The `order` request field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    /// By poll time.
    #[default]
    Time,
    /// By number of votes.
    Votes,
    /// Seeded shuffle.
    Random,
}

/// Ordering fields of a listing request, as given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrderInput {
    /// Strategy.
    pub order: Option<OrderType>,
    /// Direction, for `time` and `votes` only.
    pub order_dir: Option<SortDir>,
    /// Seed, for `random` only.
    pub seed: Option<i64>,
}

/// A resolved ordering strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOrder {
    /// Chronological.
    Time(SortDir),
    /// By vote count.
    Votes(SortDir),
    /// By the per-row hash of `(id, seed)`.
    Random(i64),
}

impl PollOrder {
    /// Seed to echo back in the page metadata.
    #[must_use]
    pub const fn random_seed(self) -> Option<i64> {
        match self {
            Self::Random(seed) => Some(seed),
            _ => None,
        }
    }
}

impl OrderInput {
    /// Validate the combination and pick a strategy.
    ///
    /// A missing seed for `random` is drawn fresh from `[0, MAX_SEED]`.
    pub fn resolve(&self) -> AppResult<PollOrder> {
        let Some(order) = self.order else {
            if self.order_dir.is_some() || self.seed.is_some() {
                return Err(AppError::BadRequest(
                    "orderDir and seed require order".to_string(),
                ));
            }
            return Ok(PollOrder::Time(SortDir::Desc));
        };

        match order {
            OrderType::Time | OrderType::Votes => {
                if self.seed.is_some() {
                    return Err(AppError::BadRequest(
                        "seed is only valid with order=random".to_string(),
                    ));
                }
                let dir = self.order_dir.unwrap_or_default();
                Ok(if order == OrderType::Time {
                    PollOrder::Time(dir)
                } else {
                    PollOrder::Votes(dir)
                })
            }
            OrderType::Random => {
                if self.order_dir.is_some() {
                    return Err(AppError::BadRequest(
                        "orderDir is not valid with order=random".to_string(),
                    ));
                }
                let seed = match self.seed {
                    Some(seed) if (0..=MAX_SEED).contains(&seed) => seed,
                    Some(_) => {
                        return Err(AppError::BadRequest(format!(
                            "seed must be between 0 and {MAX_SEED}"
                        )));
                    }
                    None => rand::thread_rng().gen_range(0..=MAX_SEED),
                };
                Ok(PollOrder::Random(seed))
            }
        }
    }
}

/// Load one ordered page of polls.
pub async fn fetch_page(
    store: &dyn PollStore,
    filter: &CompiledFilter,
    order: PollOrder,
    timeout: Duration,
) -> AppResult<Vec<poll::Model>> {
    if filter.predicate.matches_nothing() {
        return Ok(Vec::new());
    }

    let rank = match order {
        PollOrder::Time(dir) => {
            return bounded(
                timeout,
                "page_by_time",
                store.page_by_time(&filter.predicate, dir, filter.limit, filter.offset()),
            )
            .await;
        }
        PollOrder::Votes(dir) => RankBy::VoteCount(dir),
        PollOrder::Random(seed) => RankBy::RandomKey(seed),
    };

    let ids = bounded(
        timeout,
        "rank_ids",
        store.rank_ids(&filter.predicate, rank, filter.limit, filter.offset()),
    )
    .await?;
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let rows = bounded(timeout, "find_by_ids", store.find_by_ids(&ids)).await?;
    Ok(restore_order(&ids, rows))
}

/// Arrange `rows` in the order of `ids`, dropping rows deleted in between.
fn restore_order(ids: &[i32], rows: Vec<poll::Model>) -> Vec<poll::Model> {
    let mut by_id: HashMap<i32, poll::Model> = rows.into_iter().map(|p| (p.id, p)).collect();
    ids.iter().filter_map(|id| by_id.remove(id)).collect()
}
