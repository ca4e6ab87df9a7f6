use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::action::{ActionDescriptor, ExecKind};

/// Opaque identity of a Container Proxy / worker. Proxies are created with
/// a fresh id; it never changes for the life of the proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkerId(pub u64);

/// A worker's container data. Advances monotonically
/// `NoData -> PreWarmedData -> WarmedData`; a worker never regresses —
/// replacement is always destroy-and-recreate, never a transition back.
#[derive(Debug, Clone, PartialEq)]
pub enum ContainerData {
    NoData,
    PreWarmedData { kind: ExecKind, memory_mb: u32 },
    WarmedData {
        kind: ExecKind,
        memory_mb: u32,
        tenant: String,
        action: ActionDescriptor,
        last_used: Instant,
    },
    Removed,
}

impl ContainerData {
    pub fn is_warmed(&self) -> bool {
        matches!(self, ContainerData::WarmedData { .. })
    }

    pub fn is_prewarmed(&self) -> bool {
        matches!(self, ContainerData::PreWarmedData { .. })
    }

    /// Structural match used by the reuse policy: same action (name +
    /// revision) and same tenant namespace.
    pub fn matches_warm(&self, action: &ActionDescriptor, tenant: &str) -> bool {
        match self {
            ContainerData::WarmedData {
                action: a, tenant: t, ..
            } => a == action && t == tenant,
            _ => false,
        }
    }

    /// Structural match used by prewarm promotion: same `(kind, memory)`.
    pub fn matches_prewarm(&self, kind: &ExecKind, memory_mb: u32) -> bool {
        match self {
            ContainerData::PreWarmedData { kind: k, memory_mb: m } => k == kind && *m == memory_mb,
            _ => false,
        }
    }

    pub fn last_used(&self) -> Option<Instant> {
        match self {
            ContainerData::WarmedData { last_used, .. } => Some(*last_used),
            _ => None,
        }
    }
}

/// Observability tag attached to a `containerStart` mark — which path the
/// scheduler took to satisfy a `Run`. `Recreated` is kept even when the
/// eviction falls through to a cold `createContainer()` with no prewarm
/// consumed, for compatibility with existing dashboards built on this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContainerStateTag {
    Warm,
    Prewarmed,
    Cold,
    Recreated,
}

impl std::fmt::Display for ContainerStateTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ContainerStateTag::Warm => "warm",
            ContainerStateTag::Prewarmed => "prewarmed",
            ContainerStateTag::Cold => "cold",
            ContainerStateTag::Recreated => "recreated",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(name: &str, rev: u64) -> ActionDescriptor {
        ActionDescriptor::new(name, rev, ExecKind::new("nodejs:6"), 256, 60_000)
    }

    #[test]
    fn warm_match_requires_action_and_tenant() {
        let data = ContainerData::WarmedData {
            kind: ExecKind::new("nodejs:6"),
            memory_mb: 256,
            tenant: "tenantX".into(),
            action: action("echo", 1),
            last_used: Instant::now(),
        };
        assert!(data.matches_warm(&action("echo", 1), "tenantX"));
        assert!(!data.matches_warm(&action("echo", 1), "tenantY"));
        assert!(!data.matches_warm(&action("echo", 2), "tenantX"));
    }

    #[test]
    fn prewarm_never_matches_warm() {
        let data = ContainerData::PreWarmedData {
            kind: ExecKind::new("nodejs:6"),
            memory_mb: 256,
        };
        assert!(!data.matches_warm(&action("echo", 1), "tenantX"));
        assert!(data.matches_prewarm(&ExecKind::new("nodejs:6"), 256));
    }
}
