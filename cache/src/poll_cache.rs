//! Poll list and tally cache with single-flight fills.

use parking_lot::RwLock;
use pollchain_gateway::{LedgerGateway, ReadCall, ReadOutput};
use pollchain_types::{PollIndex, PollSet, ResultsEntry, VoterId};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::{CacheError, VoteMembership};

#[derive(Default)]
struct CacheState {
    polls: Option<Arc<PollSet>>,
    results: HashMap<PollIndex, Arc<ResultsEntry>>,
    membership: VoteMembership,
    /// Bumped by `invalidate_all`. A fill stores its result only if the
    /// generations it started under are still current.
    generation: u64,
    /// Per-poll tally generation, bumped when one tally is dropped.
    results_generation: HashMap<PollIndex, u64>,
}

impl CacheState {
    fn results_epoch(&self, poll_index: PollIndex) -> (u64, u64) {
        let scoped = self.results_generation.get(&poll_index).copied().unwrap_or(0);
        (self.generation, scoped)
    }

    fn drop_results(&mut self, poll_index: PollIndex) {
        self.results.remove(&poll_index);
        *self.results_generation.entry(poll_index).or_default() += 1;
    }
}

/// Lookup and fetch counters.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    ledger_reads: AtomicU64,
    ledger_failures: AtomicU64,
    invalidations: AtomicU64,
}

impl CacheStats {
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Read-only ledger calls issued by the cache.
    pub fn ledger_reads(&self) -> u64 {
        self.ledger_reads.load(Ordering::Relaxed)
    }

    pub fn ledger_failures(&self) -> u64 {
        self.ledger_failures.load(Ordering::Relaxed)
    }

    pub fn invalidations(&self) -> u64 {
        self.invalidations.load(Ordering::Relaxed)
    }

    fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }
}

/// Comparable copy of the whole cache.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheSnapshot {
    pub polls: Option<PollSet>,
    pub results: BTreeMap<PollIndex, ResultsEntry>,
    pub voters: BTreeMap<PollIndex, BTreeSet<VoterId>>,
}

/// Process-wide cache of ledger state.
///
/// Reads take the `RwLock` briefly and never across an `.await`. Misses go
/// through the `fill` mutex, so concurrent misses issue one ledger call and
/// the rest observe its result. Every mutation is a single write section.
pub struct PollCache {
    gateway: Arc<dyn LedgerGateway>,
    state: RwLock<CacheState>,
    fill: Mutex<()>,
    stats: CacheStats,
}

impl PollCache {
    pub fn new(gateway: Arc<dyn LedgerGateway>) -> Self {
        Self {
            gateway,
            state: RwLock::new(CacheState::default()),
            fill: Mutex::new(()),
            stats: CacheStats::default(),
        }
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// The cached poll list, fetching it with `getAllPolls` if absent.
    pub async fn get_polls(&self) -> Result<Arc<PollSet>, CacheError> {
        let cached = self.state.read().polls.clone();
        if let Some(polls) = cached {
            self.stats.hit();
            return Ok(polls);
        }
        let _fill = self.fill.lock().await;
        self.load_polls().await
    }

    /// The cached tally of one poll, fetching it with `getResults` if absent.
    pub async fn get_results(&self, poll_index: PollIndex) -> Result<Arc<ResultsEntry>, CacheError> {
        let cached = self.state.read().results.get(&poll_index).cloned();
        if let Some(entry) = cached {
            self.stats.hit();
            return Ok(entry);
        }
        let _fill = self.fill.lock().await;
        self.load_results(poll_index).await
    }

    /// Title and tally of every poll, in index order.
    pub async fn get_all_results(&self) -> Result<Vec<(String, Arc<ResultsEntry>)>, CacheError> {
        let polls = self.get_polls().await?;
        let mut all = Vec::with_capacity(polls.len());
        for (index, title, _) in polls.iter() {
            all.push((title.to_string(), self.get_results(index).await?));
        }
        Ok(all)
    }

    /// Drop the poll list and every tally. Membership is kept.
    pub fn invalidate_all(&self) {
        let mut state = self.state.write();
        state.polls = None;
        state.results.clear();
        state.results_generation.clear();
        state.generation += 1;
        self.stats.invalidations.fetch_add(1, Ordering::Relaxed);
        debug!(generation = state.generation, "poll cache invalidated");
    }

    /// Drop the tally of one poll.
    pub fn invalidate_results(&self, poll_index: PollIndex) {
        self.state.write().drop_results(poll_index);
        self.stats.invalidations.fetch_add(1, Ordering::Relaxed);
        debug!(poll_index, "results invalidated");
    }

    pub fn has_voted(&self, poll_index: PollIndex, voter: &VoterId) -> bool {
        self.state.read().membership.has_voted(poll_index, voter)
    }

    /// Record a confirmed vote without touching tallies.
    pub fn record_vote(&self, poll_index: PollIndex, voter: VoterId) -> bool {
        self.state.write().membership.record_vote(poll_index, voter)
    }

    /// Apply a confirmed vote: record the voter and drop the poll's tally in
    /// one write section, so no reader sees one without the other.
    pub fn confirm_vote(&self, poll_index: PollIndex, voter: VoterId) {
        let mut state = self.state.write();
        state.membership.record_vote(poll_index, voter);
        state.drop_results(poll_index);
        self.stats.invalidations.fetch_add(1, Ordering::Relaxed);
        debug!(
            poll_index,
            voters = state.membership.voter_count(poll_index),
            "vote applied to cache"
        );
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        let state = self.state.read();
        CacheSnapshot {
            polls: state.polls.as_deref().cloned(),
            results: state
                .results
                .iter()
                .map(|(index, entry)| (*index, ResultsEntry::clone(entry)))
                .collect(),
            voters: state.membership.to_sorted(),
        }
    }

    /// Caller holds the fill lock.
    async fn load_polls(&self) -> Result<Arc<PollSet>, CacheError> {
        let generation = {
            let state = self.state.read();
            if let Some(polls) = &state.polls {
                self.stats.hit();
                return Ok(Arc::clone(polls));
            }
            state.generation
        };
        self.stats.miss();

        let (titles, options) = match self.read(ReadCall::GetAllPolls).await? {
            ReadOutput::Polls { titles, options } => (titles, options),
            other => return Err(inconsistent(format!("getAllPolls returned {other:?}"))),
        };
        let polls = Arc::new(PollSet::new(titles, options).map_err(|e| inconsistent(e.to_string()))?);

        let mut state = self.state.write();
        if state.generation == generation {
            state.polls = Some(Arc::clone(&polls));
            debug!(polls = polls.len(), "poll list cached");
        } else {
            debug!("poll list fetched across an invalidation, not cached");
        }
        Ok(polls)
    }

    /// Caller holds the fill lock.
    async fn load_results(&self, poll_index: PollIndex) -> Result<Arc<ResultsEntry>, CacheError> {
        let epoch = self.state.read().results_epoch(poll_index);
        let polls = self.load_polls().await?;
        {
            let state = self.state.read();
            if let Some(entry) = state.results.get(&poll_index) {
                self.stats.hit();
                return Ok(Arc::clone(entry));
            }
        }
        let options = polls
            .options_of(poll_index)
            .ok_or(CacheError::UnknownPoll(poll_index))?
            .to_vec();
        self.stats.miss();

        let counts = match self.read(ReadCall::GetResults { poll_index }).await? {
            ReadOutput::Results(counts) => counts,
            other => return Err(inconsistent(format!("getResults returned {other:?}"))),
        };
        let entry = Arc::new(ResultsEntry::new(options, counts).map_err(|e| {
            inconsistent(format!("poll {poll_index}: {e}"))
        })?);

        let mut state = self.state.write();
        if state.results_epoch(poll_index) == epoch {
            state.results.insert(poll_index, Arc::clone(&entry));
            debug!(poll_index, votes = entry.total_votes(), "results cached");
        } else {
            debug!(poll_index, "results fetched across an invalidation, not cached");
        }
        Ok(entry)
    }

    async fn read(&self, call: ReadCall) -> Result<ReadOutput, CacheError> {
        self.stats.ledger_reads.fetch_add(1, Ordering::Relaxed);
        self.gateway.call_read_only(&call).await.map_err(|e| {
            self.stats.ledger_failures.fetch_add(1, Ordering::Relaxed);
            debug!(method = call.method(), error = %e, "ledger read failed");
            CacheError::LedgerUnavailable(e)
        })
    }
}

fn inconsistent(message: String) -> CacheError {
    error!(%message, "ledger data rejected by cache");
    CacheError::Inconsistent(message)
}
