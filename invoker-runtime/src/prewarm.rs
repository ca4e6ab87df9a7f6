//! Prewarm Manager (§4.3). Logically embedded in the Pool Supervisor; the
//! pure part — computing the target population to fill at startup — lives
//! here so it can be unit-tested without a running supervisor.

use pool_model::ExecKind;

/// One `(count, exec-kind, memory)` entry of the prewarm configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrewarmTarget {
    pub kind: ExecKind,
    pub memory_mb: u32,
    pub count: u32,
}

/// Expands the configured targets into one `(kind, memory)` pair per
/// container the initial-fill pass must `Start`.
pub fn initial_population(targets: &[PrewarmTarget]) -> Vec<(ExecKind, u32)> {
    targets
        .iter()
        .flat_map(|t| std::iter::repeat((t.kind.clone(), t.memory_mb)).take(t.count as usize))
        .collect()
}
