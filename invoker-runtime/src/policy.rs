//! Pure scheduling functions (§4.4). No I/O, no mutation — callers own
//! the `free` map and apply whatever the chosen worker implies.

use std::collections::HashMap;

use pool_model::{ActionDescriptor, ContainerData, WorkerId};

/// Finds a worker in `free` whose `WarmedData` matches `action` (name +
/// revision) and `tenant`. Any match is acceptable; ties are broken by
/// map iteration order, which is unspecified but deterministic per-run.
pub fn schedule(
    action: &ActionDescriptor,
    tenant: &str,
    free: &HashMap<WorkerId, ContainerData>,
) -> Option<WorkerId> {
    free.iter()
        .find(|(_, data)| data.matches_warm(action, tenant))
        .map(|(id, _)| *id)
}

/// Finds a worker in `free` whose `PreWarmedData` matches `(kind, memory)`.
pub fn schedule_prewarmed(
    kind: &pool_model::ExecKind,
    memory_mb: u32,
    prewarmed: &HashMap<WorkerId, ContainerData>,
) -> Option<WorkerId> {
    prewarmed
        .iter()
        .find(|(_, data)| data.matches_prewarm(kind, memory_mb))
        .map(|(id, _)| *id)
}

/// Picks an eviction victim (§4.4 `remove`): the `WarmedData` member of
/// `free` with the minimum `last_used` instant. Workers in `NoData` or
/// `PreWarmedData` are never evicted — evicting a prewarm container would
/// defeat its purpose (§4.4 rationale).
pub fn remove(free: &HashMap<WorkerId, ContainerData>) -> Option<WorkerId> {
    free.iter()
        .filter_map(|(id, data)| data.last_used().map(|last_used| (*id, last_used)))
        .min_by_key(|(_, last_used)| *last_used)
        .map(|(id, _)| id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pool_model::ExecKind;
    use std::time::{Duration, Instant};

    fn action(name: &str, rev: u64) -> ActionDescriptor {
        ActionDescriptor::new(name, rev, ExecKind::new("nodejs:6"), 256, 60_000)
    }

    fn warmed(action: ActionDescriptor, tenant: &str, last_used: Instant) -> ContainerData {
        ContainerData::WarmedData {
            kind: ExecKind::new("nodejs:6"),
            memory_mb: 256,
            tenant: tenant.to_string(),
            action,
            last_used,
        }
    }

    #[test]
    fn schedule_requires_exact_action_and_tenant_match() {
        let now = Instant::now();
        let mut free = HashMap::new();
        free.insert(WorkerId(1), warmed(action("echo", 1), "tenantX", now));

        assert_eq!(
            schedule(&action("echo", 1), "tenantX", &free),
            Some(WorkerId(1))
        );
        assert_eq!(schedule(&action("echo", 1), "tenantY", &free), None);
        assert_eq!(schedule(&action("echo", 2), "tenantX", &free), None);
    }

    #[test]
    fn remove_picks_oldest_last_used_among_warmed_only() {
        let t0 = Instant::now();
        let mut free = HashMap::new();
        free.insert(
            WorkerId(1),
            warmed(action("a", 1), "x", t0 + Duration::from_secs(100)),
        );
        free.insert(
            WorkerId(2),
            warmed(action("b", 1), "y", t0 + Duration::from_secs(50)),
        );
        free.insert(
            WorkerId(3),
            ContainerData::PreWarmedData {
                kind: ExecKind::new("nodejs:6"),
                memory_mb: 256,
            },
        );

        assert_eq!(remove(&free), Some(WorkerId(2)));
    }

    #[test]
    fn remove_returns_none_when_no_warmed_worker_present() {
        let mut free = HashMap::new();
        free.insert(WorkerId(1), ContainerData::NoData);
        free.insert(
            WorkerId(2),
            ContainerData::PreWarmedData {
                kind: ExecKind::new("nodejs:6"),
                memory_mb: 256,
            },
        );
        assert_eq!(remove(&free), None);
    }

    #[test]
    fn schedule_prewarmed_matches_kind_and_memory() {
        let mut prewarmed = HashMap::new();
        prewarmed.insert(
            WorkerId(7),
            ContainerData::PreWarmedData {
                kind: ExecKind::new("nodejs:6"),
                memory_mb: 256,
            },
        );
        assert_eq!(
            schedule_prewarmed(&ExecKind::new("nodejs:6"), 256, &prewarmed),
            Some(WorkerId(7))
        );
        assert_eq!(
            schedule_prewarmed(&ExecKind::new("python:3"), 256, &prewarmed),
            None
        );
    }
}
