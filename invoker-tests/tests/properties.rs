//! Generative tests for the pool-state invariants of spec.md §8 (P1-P3)
//! driven against a real `PoolSupervisor`. The pure per-call properties
//! (P4-P7 schedule/evict decisions) are covered directly on `policy` in
//! `invoker-runtime`; the six concrete scenarios of §8 live in
//! `scenarios.rs`. This file exercises the invariants that only emerge
//! across many interleaved `Run`s.

use std::collections::HashSet;
use std::time::Duration;

use invoker_runtime::SupervisorMessage;
use invoker_tests::harness::{action, activation, config, spawn_pool, wait_for};
use pool_model::Run;
use proptest::prelude::*;

/// Fires `tenants.len()` `Run`s (all for the same action, tenant chosen
/// from a small alphabet so warm reuse and mismatches both occur) at a
/// pool with the given `max_active_containers` and no prewarm population,
/// then asserts P1 (pairwise disjointness) and P2 (capacity bound) on the
/// settled snapshot.
fn run_and_check(max_active: u32, tenants: Vec<u8>) -> bool {
    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(async move {
        let pool = spawn_pool(&config(max_active, vec![]));
        let act = action("A", 1, "nodejs:6", 256);

        for (i, t) in tenants.iter().enumerate() {
            let tenant = format!("tenant{}", t % 3);
            let _ = pool.handle.send(SupervisorMessage::Run(Run::new(
                act.clone(),
                activation(&tenant, &format!("a{i}")),
            )));
        }

        let snap = wait_for(&pool.handle, Duration::from_secs(5), |s| {
            (s.busy.len() + s.free.len()) as u32 <= max_active
        })
        .await;

        let free_keys: HashSet<_> = snap.free.keys().copied().collect();
        let busy_keys: HashSet<_> = snap.busy.keys().copied().collect();
        let prewarmed_keys: HashSet<_> = snap.prewarmed.keys().copied().collect();

        let p1_disjoint = free_keys.is_disjoint(&busy_keys)
            && free_keys.is_disjoint(&prewarmed_keys)
            && busy_keys.is_disjoint(&prewarmed_keys);
        let p2_capacity = (snap.busy.len() + snap.free.len()) as u32 <= max_active;
        // No prewarm configured in this harness, so P3 holds trivially
        // (prewarmed is always empty); kept as an explicit assertion so a
        // future change that starts seeding prewarm here would have to
        // reconsider this check rather than silently pass.
        let p3_prewarm_untouched = snap.prewarmed.is_empty();

        pool.shutdown().await;
        p1_disjoint && p2_capacity && p3_prewarm_untouched
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn pool_state_stays_disjoint_and_within_capacity(
        max_active in 1u32..4,
        tenants in proptest::collection::vec(0u8..4, 1..10),
    ) {
        prop_assert!(run_and_check(max_active, tenants));
    }
}

/// P3 with a real prewarm population: admitting `Run`s that never match
/// the configured `(kind, memory)` must never shrink `prewarmed`.
#[tokio::test]
async fn admitting_unrelated_runs_never_evicts_prewarmed() {
    let cfg = config(
        1,
        vec![invoker_tests::harness::prewarm_entry("python:3", 128, 2)],
    );
    let pool = spawn_pool(&cfg);
    wait_for(&pool.handle, Duration::from_secs(2), |s| s.prewarmed.len() == 2).await;

    let act = action("A", 1, "nodejs:6", 256);
    for i in 0..4 {
        pool.handle
            .send(SupervisorMessage::Run(Run::new(
                act.clone(),
                activation("X", &format!("a{i}")),
            )))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let snap = pool.handle.inspect().await.unwrap();
    assert_eq!(
        snap.prewarmed.len(),
        2,
        "a (kind, memory) mismatch must never consume or evict an unrelated prewarm population"
    );

    pool.shutdown().await;
}
