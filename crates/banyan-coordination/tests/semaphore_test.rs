//! End-to-end semaphore scenarios across three backends.

use std::sync::Arc;
use std::time::Duration;

use banyan_coordination::RetryConfig;
use banyan_coordination::Semaphore;
use banyan_core::DeterministicBackend;

fn retry() -> RetryConfig {
    RetryConfig {
        retry_count: 2,
        retry_delay: Duration::from_millis(20),
    }
}

#[tokio::test]
async fn two_slots_admit_exactly_two_of_three_holders() {
    let backends: Vec<Arc<DeterministicBackend>> = (0..3).map(|_| DeterministicBackend::new()).collect();

    let mut handles = Vec::new();
    for stagger_ms in [0u64, 15, 30] {
        let backends = backends.clone();
        handles.push(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(stagger_ms)).await;
            let semaphore = Semaphore::new(backends, 2, retry()).unwrap();
            semaphore.lock("s").await.unwrap()
        }));
    }

    let mut admitted = 0;
    for handle in handles {
        if handle.await.unwrap() {
            admitted += 1;
        }
    }
    assert_eq!(admitted, 2, "exactly the slot count may hold at once");
}

#[tokio::test]
async fn released_slot_admits_the_next_holder() {
    let backends: Vec<Arc<DeterministicBackend>> = (0..3).map(|_| DeterministicBackend::new()).collect();

    let first = Semaphore::new(backends.clone(), 1, retry()).unwrap();
    let second = Semaphore::new(backends.clone(), 1, retry()).unwrap();

    assert!(first.lock("s").await.unwrap());
    assert!(!second.lock("s").await.unwrap());

    first.unlock("s").await;
    assert!(second.lock("s").await.unwrap());
}

#[tokio::test]
async fn expired_holder_is_reclaimed_across_backends() {
    let backends: Vec<Arc<DeterministicBackend>> = (0..3).map(|_| DeterministicBackend::new()).collect();

    let dead = Semaphore::new(backends.clone(), 1, retry()).unwrap();
    assert!(dead.lock_with_ttl("s", Duration::from_millis(40)).await.unwrap());

    tokio::time::sleep(Duration::from_millis(80)).await;

    let live = Semaphore::new(backends, 1, retry()).unwrap();
    assert!(live.lock("s").await.unwrap());
}
