//! Single-flight guard tests
//!
//! Timed tests run on a paused clock, so the long sleeps complete instantly.

use lotus_exporter::flight::SingleFlight;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

async fn slow_count(runs: &AtomicUsize, delay: Duration) -> usize {
    tokio::time::sleep(delay).await;
    runs.fetch_add(1, Ordering::SeqCst) + 1
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_callers_share_one_run() {
    // Given: A guard and a slow computation
    let flight = SingleFlight::new();
    let runs = AtomicUsize::new(0);
    let delay = Duration::from_millis(50);

    // When: Four callers arrive while it runs
    let results = tokio::join!(
        flight.run(|| slow_count(&runs, delay)),
        flight.run(|| slow_count(&runs, delay)),
        flight.run(|| slow_count(&runs, delay)),
        flight.run(|| slow_count(&runs, delay)),
    );

    // Then: It ran once and everyone saw that run's result
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(results, (1, 1, 1, 1));
    assert!(!flight.in_flight());
}

#[tokio::test]
async fn test_sequential_callers_each_run() {
    let flight = SingleFlight::new();
    let runs = AtomicUsize::new(0);

    let first = flight.run(|| slow_count(&runs, Duration::ZERO)).await;
    let second = flight.run(|| slow_count(&runs, Duration::ZERO)).await;

    assert_eq!(first, 1);
    assert_eq!(second, 2);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_leader_frees_the_slot() {
    // Given: A leader dropped before it finishes
    let flight = SingleFlight::<usize>::new();
    let runs = AtomicUsize::new(0);
    let abandoned = tokio::time::timeout(
        Duration::from_millis(10),
        flight.run(|| slow_count(&runs, Duration::from_secs(5))),
    )
    .await;
    assert!(abandoned.is_err());

    // When: The next caller arrives
    let value = flight.run(|| async { 42 }).await;

    // Then: It becomes leader instead of waiting forever
    assert_eq!(value, 42);
    assert!(!flight.in_flight());
}

#[tokio::test(start_paused = true)]
async fn test_follower_takes_over_when_leader_is_cancelled() {
    // Given: A leader that will be aborted and a follower waiting on it
    let flight = Arc::new(SingleFlight::<&'static str>::new());

    let leader_flight = flight.clone();
    let leader = tokio::spawn(async move {
        leader_flight
            .run(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "leader"
            })
            .await
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(flight.in_flight());

    let follower_flight = flight.clone();
    let follower = tokio::spawn(async move {
        follower_flight.run(|| async { "follower" }).await
    });
    tokio::time::sleep(Duration::from_millis(10)).await;

    // When: The leader is aborted
    leader.abort();

    // Then: The follower runs its own computation
    let value = tokio::time::timeout(Duration::from_secs(1), follower)
        .await
        .expect("follower must not hang")
        .expect("follower task panicked");
    assert_eq!(value, "follower");
}
