use futures_util::future::join_all;
use pollchain_cache::PollCache;
use pollchain_nullables::NullLedger;
use pollchain_types::VoterId;
use std::sync::Arc;
use std::time::Duration;

fn slow_ledger() -> Arc<NullLedger> {
    let ledger = Arc::new(NullLedger::new().with_read_delay(Duration::from_millis(50)));
    ledger.seed_poll("Pet?", &["Cat", "Dog"]);
    ledger.seed_poll("Lunch?", &["Soup", "Salad", "Both"]);
    ledger
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_poll_misses_share_one_read() {
    let ledger = slow_ledger();
    let cache = Arc::new(PollCache::new(ledger.clone()));

    let calls = (0..16).map(|_| {
        let cache = cache.clone();
        tokio::spawn(async move { cache.get_polls().await })
    });
    let polls: Vec<_> = join_all(calls)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    assert_eq!(ledger.poll_reads(), 1);
    assert!(polls.iter().all(|p| p.len() == 2));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_result_misses_share_one_read() {
    let ledger = slow_ledger();
    let cache = Arc::new(PollCache::new(ledger.clone()));

    let calls = (0..8).map(|_| {
        let cache = cache.clone();
        tokio::spawn(async move { cache.get_results(1).await })
    });
    for joined in join_all(calls).await {
        assert_eq!(joined.unwrap().unwrap().counts(), [0, 0, 0]);
    }

    assert_eq!(ledger.poll_reads(), 1);
    assert_eq!(ledger.result_reads(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn fetch_racing_an_invalidation_is_not_stored() {
    let ledger = slow_ledger();
    let cache = Arc::new(PollCache::new(ledger.clone()));

    let fetch = {
        let cache = cache.clone();
        tokio::spawn(async move { cache.get_polls().await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    cache.invalidate_all();

    let polls = fetch.await.unwrap().unwrap();
    assert_eq!(polls.len(), 2);
    assert!(cache.snapshot().polls.is_none());

    cache.get_polls().await.unwrap();
    assert_eq!(ledger.poll_reads(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn vote_during_poll_fetch_keeps_single_flight() {
    let ledger = slow_ledger();
    let cache = Arc::new(PollCache::new(ledger.clone()));

    let calls: Vec<_> = (0..8)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get_polls().await })
        })
        .collect();
    tokio::time::sleep(Duration::from_millis(10)).await;
    cache.confirm_vote(1, VoterId::new("a@x.com"));

    for joined in join_all(calls).await {
        assert_eq!(joined.unwrap().unwrap().len(), 2);
    }
    assert_eq!(ledger.poll_reads(), 1);
    assert!(cache.snapshot().polls.is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn vote_only_discards_a_racing_fetch_of_its_own_tally() {
    for (voted_poll, kept) in [(1, true), (0, false)] {
        let ledger = slow_ledger();
        let cache = Arc::new(PollCache::new(ledger.clone()));

        let fetch = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get_results(0).await })
        };
        // Past the poll list read, inside the tally read.
        tokio::time::sleep(Duration::from_millis(75)).await;
        cache.confirm_vote(voted_poll, VoterId::new("a@x.com"));

        assert_eq!(fetch.await.unwrap().unwrap().counts(), [0, 0]);
        assert_eq!(cache.snapshot().results.contains_key(&0), kept);
        assert_eq!(ledger.result_reads(), 1);
    }
}
