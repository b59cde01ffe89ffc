use std::{
    collections::BTreeMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use crate::{
    AdmissionController,
    tests::common::{manual_controller, options_with_poll},
};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_try_acquire_grants_exactly_capacity() {
    let admission = Arc::new(manual_controller(10));
    let granted = Arc::new(AtomicU64::new(0));
    let barrier = Arc::new(tokio::sync::Barrier::new(64));

    let handles: Vec<_> = (0..64)
        .map(|_| {
            let admission = admission.clone();
            let granted = granted.clone();
            let barrier = barrier.clone();
            tokio::spawn(async move {
                barrier.wait().await;
                if let Some(slot) = admission.try_acquire() {
                    granted.fetch_add(1, Ordering::SeqCst);
                    slot.release();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(granted.load(Ordering::SeqCst), 10);

    let stats = admission.stats();
    assert_eq!(stats.available, 0);
    assert_eq!(stats.in_flight, 0);
    assert_eq!(stats.granted_total, 10);
    assert_eq!(stats.released_total, 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callers_within_capacity_do_not_wait() {
    let admission = Arc::new(manual_controller(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let admission = admission.clone();
            tokio::spawn(async move {
                admission
                    .acquire_timeout(Duration::from_millis(50))
                    .await
                    .map(|slot| slot.epoch())
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap(), Ok(0));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn no_window_grants_more_than_capacity() {
    let admission = Arc::new(
        AdmissionController::new(options_with_poll(
            Duration::from_millis(250),
            5,
            Duration::from_millis(5),
        ))
        .unwrap(),
    );

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let admission = admission.clone();
            tokio::spawn(async move {
                let slot = admission.acquire().await.unwrap();
                let epoch = slot.epoch();
                drop(slot);
                epoch
            })
        })
        .collect();

    let mut per_window: BTreeMap<u64, u64> = BTreeMap::new();
    for handle in handles {
        *per_window.entry(handle.await.unwrap()).or_default() += 1;
    }

    assert_eq!(per_window.values().sum::<u64>(), 20);
    assert_eq!(per_window.get(&0), Some(&5));
    for (epoch, granted) in &per_window {
        assert!(*granted <= 5, "window {epoch} granted {granted}");
    }

    let stats = admission.stats();
    assert_eq!(stats.in_flight, 0);
    assert_eq!(stats.released_total, 20);
    assert!(stats.available <= 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn mass_cancellation_leaks_nothing() {
    let admission = Arc::new(manual_controller(1));
    let _held = admission.try_acquire().unwrap();

    let handles: Vec<_> = (0..32)
        .map(|_| {
            let admission = admission.clone();
            tokio::spawn(async move { admission.acquire_timeout(Duration::from_millis(20)).await.is_err() })
        })
        .collect();

    for handle in handles {
        assert!(handle.await.unwrap());
    }

    let stats = admission.stats();
    assert_eq!(stats.waiting, 0);
    assert_eq!(stats.available, 0);
    assert_eq!(stats.in_flight, 1);
    assert_eq!(stats.granted_total, 1);
}
