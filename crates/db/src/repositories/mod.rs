//! Repositories implementing the storage executor traits.

mod guild_info;
mod poll;
mod poll_tag;

pub use guild_info::GuildInfoRepository;
pub use poll::PollRepository;
pub use poll_tag::PollTagRepository;
