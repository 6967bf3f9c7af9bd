//! Poll definitions and vote tallies as read back from the ledger.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::TypesError;

/// Position of a poll in the ledger-returned arrays. Not a stable identifier
/// beyond the fact that polls are only ever appended.
pub type PollIndex = u64;

/// Position of an option within a poll.
pub type OptionIndex = u64;

/// Caller-supplied voter identifier (an email address in practice).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoterId(String);

impl VoterId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for VoterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The full list of polls, fetched from the ledger as one `(titles, options)`
/// pair. Construction guarantees both halves have the same length.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PollSet {
    titles: Vec<String>,
    options: Vec<Vec<String>>,
}

impl PollSet {
    pub fn new(titles: Vec<String>, options: Vec<Vec<String>>) -> Result<Self, TypesError> {
        if titles.len() != options.len() {
            return Err(TypesError::MalformedPollSet {
                titles: titles.len(),
                options: options.len(),
            });
        }
        Ok(Self { titles, options })
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }

    pub fn titles(&self) -> &[String] {
        &self.titles
    }

    pub fn options(&self) -> &[Vec<String>] {
        &self.options
    }

    /// Options of the poll at `index`, if it exists.
    pub fn options_of(&self, index: PollIndex) -> Option<&[String]> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.options.get(i))
            .map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (PollIndex, &str, &[String])> + '_ {
        self.titles
            .iter()
            .zip(self.options.iter())
            .enumerate()
            .map(|(i, (title, options))| (i as PollIndex, title.as_str(), options.as_slice()))
    }
}

/// Vote tally for one poll: `counts[i]` is the number of votes for `options[i]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResultsEntry {
    options: Vec<String>,
    counts: Vec<u64>,
}

impl ResultsEntry {
    pub fn new(options: Vec<String>, counts: Vec<u64>) -> Result<Self, TypesError> {
        if options.len() != counts.len() {
            return Err(TypesError::MalformedResults {
                options: options.len(),
                counts: counts.len(),
            });
        }
        Ok(Self { options, counts })
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn total_votes(&self) -> u64 {
        self.counts.iter().sum()
    }
}
