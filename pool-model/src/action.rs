use serde::{Deserialize, Serialize};

/// Runtime family and version, e.g. `nodejs:6`. Matching on this (plus
/// memory) is how a prewarmed container is chosen for a cold action.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecKind(pub String);

impl ExecKind {
    pub fn new(kind: impl Into<String>) -> Self {
        Self(kind.into())
    }
}

impl std::fmt::Display for ExecKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies executable code by fully-qualified name and revision, plus
/// its execution kind, memory limit and timeout.
///
/// Equality compares `name` and `revision`; two revisions of the same
/// action name are different actions for scheduling purposes. Fields
/// beyond `name`/`revision` never affect equality so that reuse matching
/// stays deterministic and ignores ephemeral metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionDescriptor {
    pub name: String,
    pub revision: u64,
    pub exec_kind: ExecKind,
    pub memory_mb: u32,
    pub timeout_ms: u64,
}

impl ActionDescriptor {
    pub fn new(
        name: impl Into<String>,
        revision: u64,
        exec_kind: ExecKind,
        memory_mb: u32,
        timeout_ms: u64,
    ) -> Self {
        Self {
            name: name.into(),
            revision,
            exec_kind,
            memory_mb,
            timeout_ms,
        }
    }

    /// `(exec_kind, memory_mb)` is all a prewarm replacement is allowed to
    /// see — the code field must never leak into a replacement container.
    pub fn prewarm_key(&self) -> (ExecKind, u32) {
        (self.exec_kind.clone(), self.memory_mb)
    }
}

impl PartialEq for ActionDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.revision == other.revision
    }
}

impl Eq for ActionDescriptor {}
