//! Business logic services.

pub mod deadline;
pub mod filter;
pub mod guild;
pub mod identity;
pub mod membership;
pub mod ordering;
pub mod pagination;
pub mod permission;
pub mod poll;
pub mod redaction;
pub mod tag;
pub mod tally;
pub mod validation;

pub use filter::{CompiledFilter, PollFilterInput, compile_filter, sanitize_search};
pub use guild::{GuildService, GuildView, MembershipView};
pub use identity::{DiscordIdentityProvider, GuildMember, IdentityProvider, IdentityService};
pub use membership::{CachedMembership, Clock, ManualClock, MembershipCache, SystemClock};
pub use ordering::{MAX_SEED, OrderInput, OrderType, PollOrder};
pub use pagination::PageMeta;
pub use permission::{Identity, PermissionService};
pub use poll::{ListPollsInput, PollPage, PollQueryService, VoteView};
pub use redaction::PollView;
pub use tag::{TagService, TagView};
pub use tally::{Tally, tally};
pub use validation::{PollDraft, validate_choice, validate_poll, validate_published_update};
