//! Database entities.

pub mod guild_info;
pub mod poll;
pub mod poll_tag;
pub mod poll_vote;

pub use guild_info::Entity as GuildInfo;
pub use poll::Entity as Poll;
pub use poll_tag::Entity as PollTag;
pub use poll_vote::Entity as PollVote;
