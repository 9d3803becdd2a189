//! Core business logic for guildpolls.
//!
//! The poll query engine (filter compiler, ordering strategies, tally,
//! redaction, page metadata) and the membership cache that feeds its
//! permission decisions.

pub mod services;

pub use services::*;
