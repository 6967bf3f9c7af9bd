//! Local cache of ledger state for the poll contract.
//!
//! - [`PollCache`] holds the poll list and per-poll tallies, fetched lazily
//!   from the ledger and invalidated explicitly after confirmed writes.
//! - [`VoteMembership`] records which voters have a confirmed vote per poll.
//!
//! Both live in one [`PollCache`] instance so a confirmed vote can update
//! membership and drop the stale tally in a single atomic step.

pub mod error;
pub mod membership;
pub mod poll_cache;

pub use error::CacheError;
pub use membership::VoteMembership;
pub use poll_cache::{CacheSnapshot, CacheStats, PollCache};
