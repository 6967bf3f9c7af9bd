//! Per-poll voter membership used to filter duplicate votes before submission.

use pollchain_types::{PollIndex, VoterId};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Which voters have a confirmed vote in which poll.
///
/// A poll with no entry has an implicitly empty voter set; the set is created
/// on the first recorded vote. Entries are never removed. This is a
/// pre-submission filter only: the contract remains the authority on who may
/// vote.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VoteMembership {
    voters: HashMap<PollIndex, HashSet<VoterId>>,
}

impl VoteMembership {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pure lookup; `false` for polls nobody has voted in yet.
    pub fn has_voted(&self, poll_index: PollIndex, voter: &VoterId) -> bool {
        self.voters
            .get(&poll_index)
            .is_some_and(|set| set.contains(voter))
    }

    /// Record a confirmed vote. Returns `false` if it was already recorded.
    pub fn record_vote(&mut self, poll_index: PollIndex, voter: VoterId) -> bool {
        self.voters.entry(poll_index).or_default().insert(voter)
    }

    /// Number of recorded voters in a poll.
    pub fn voter_count(&self, poll_index: PollIndex) -> usize {
        self.voters.get(&poll_index).map_or(0, HashSet::len)
    }

    /// Ordered copy, for comparisons and diagnostics.
    pub fn to_sorted(&self) -> BTreeMap<PollIndex, BTreeSet<VoterId>> {
        self.voters
            .iter()
            .map(|(poll, set)| (*poll, set.iter().cloned().collect()))
            .collect()
    }
}
