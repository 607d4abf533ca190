//! Quorum-matrix and clock-drift scenarios for the quorum lock, driven by
//! scripted backends with call counters.

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use banyan_coordination::RedLock;
use banyan_coordination::RetryConfig;
use banyan_core::DeterministicBackend;
use banyan_core::test_support::ScriptedLockBackend;
use banyan_core::test_support::ScriptedReply;

fn scripted(grants: [bool; 3]) -> Vec<Arc<ScriptedLockBackend>> {
    grants
        .into_iter()
        .map(|grant| ScriptedLockBackend::new(if grant { ScriptedReply::Grant } else { ScriptedReply::Deny }))
        .collect()
}

#[tokio::test]
async fn all_grants_acquire_with_one_round_trip() {
    // Scenario: three healthy backends answering within 20ms.
    let backends: Vec<Arc<ScriptedLockBackend>> = (0..3)
        .map(|_| ScriptedLockBackend::with_latency(ScriptedReply::Grant, Duration::from_millis(10)))
        .collect();
    let lock = RedLock::new(backends.clone(), RetryConfig::default()).unwrap();

    assert!(lock.lock_with_ttl("k", Duration::from_secs(5)).await.unwrap());

    for backend in &backends {
        assert_eq!(backend.set_lock_calls(), 1);
        assert_eq!(backend.remove_lock_calls(), 0);
    }
}

#[tokio::test]
async fn single_grant_exhausts_retries_and_compensates() {
    // Scenario: B1 nil, B2 OK, B3 nil with retry_count = 3.
    let backends = scripted([false, true, false]);
    let retry = RetryConfig {
        retry_count: 3,
        retry_delay: Duration::from_millis(20),
    };
    let lock = RedLock::new(backends.clone(), retry).unwrap();

    assert!(!lock.lock_with_ttl("k", Duration::from_secs(5)).await.unwrap());

    // Every attempt issues one set_lock and one compensating remove_lock
    // on every backend, including the ones that denied.
    for backend in &backends {
        assert_eq!(backend.set_lock_calls(), 3);
        assert_eq!(backend.remove_lock_calls(), 3);
    }
}

#[tokio::test]
async fn quorum_matrix_over_grant_subsets() {
    let cases: [([bool; 3], bool); 8] = [
        ([true, true, true], true),
        ([true, true, false], true),
        ([true, false, true], true),
        ([false, true, true], true),
        ([true, false, false], false),
        ([false, true, false], false),
        ([false, false, true], false),
        ([false, false, false], false),
    ];

    for (grants, expected) in cases {
        let backends = scripted(grants);
        let retry = RetryConfig {
            retry_count: 2,
            retry_delay: Duration::from_millis(5),
        };
        let lock = RedLock::new(backends, retry).unwrap();
        let acquired = lock.lock_with_ttl("k", Duration::from_secs(5)).await.unwrap();
        assert_eq!(acquired, expected, "grants {grants:?}");
    }
}

#[tokio::test]
async fn grants_slower_than_the_drift_allowance_are_void() {
    // ttl 200ms gives a drift allowance of ceil(200 * 0.01) + 3 = 5ms, so a
    // 198ms response lands outside the usable lease window.
    let backends: Vec<Arc<ScriptedLockBackend>> = (0..3)
        .map(|_| ScriptedLockBackend::with_latency(ScriptedReply::Grant, Duration::from_millis(198)))
        .collect();
    let retry = RetryConfig {
        retry_count: 1,
        retry_delay: Duration::from_millis(5),
    };
    let lock = RedLock::new(backends.clone(), retry).unwrap();

    assert!(!lock.lock_with_ttl("k", Duration::from_millis(200)).await.unwrap());
    for backend in &backends {
        assert_eq!(backend.remove_lock_calls(), 1, "void grants must be compensated");
    }
}

#[tokio::test]
async fn fast_grants_inside_the_window_hold() {
    let backends: Vec<Arc<ScriptedLockBackend>> = (0..3)
        .map(|_| ScriptedLockBackend::with_latency(ScriptedReply::Grant, Duration::from_millis(20)))
        .collect();
    let lock = RedLock::new(backends, RetryConfig::default()).unwrap();

    assert!(lock.lock_with_ttl("k", Duration::from_millis(200)).await.unwrap());
}

#[tokio::test]
async fn concurrent_acquirers_exclude_each_other() {
    let backends: Vec<Arc<DeterministicBackend>> = (0..3).map(|_| DeterministicBackend::new()).collect();
    let inside = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..4 {
        let backends = backends.clone();
        let inside = Arc::clone(&inside);
        handles.push(tokio::spawn(async move {
            let retry = RetryConfig {
                retry_count: 2,
                retry_delay: Duration::from_millis(10),
            };
            let lock = RedLock::new(backends, retry).unwrap();
            let mut critical_entries = 0;
            for _ in 0..5 {
                if lock.lock_with_ttl("shared", Duration::from_secs(5)).await.unwrap() {
                    assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0, "two holders inside");
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    inside.fetch_sub(1, Ordering::SeqCst);
                    lock.unlock("shared").await;
                    critical_entries += 1;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            critical_entries
        }));
    }

    let mut total = 0;
    for handle in handles {
        total += handle.await.unwrap();
    }
    assert!(total >= 1, "at least one acquisition must succeed");
}
