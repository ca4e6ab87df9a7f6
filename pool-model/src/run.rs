use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::action::ActionDescriptor;

/// Tenant identity, activation/transaction ids and invocation arguments.
/// Opaque to the pool beyond the `tenant` field used for warm-reuse
/// matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationMessage {
    pub activation_id: String,
    pub transaction_id: String,
    pub tenant: String,
    pub args: serde_json::Value,
    #[serde(default = "chrono::Utc::now")]
    pub submitted_at: chrono::DateTime<chrono::Utc>,
}

/// An invocation request delivered by the Feed Adapter. `retry_log_deadline`
/// rate-limits "pool full" log spam across repeated reschedules of the same
/// logical request; it is not a cancellation deadline.
#[derive(Debug, Clone)]
pub struct Run {
    pub action: ActionDescriptor,
    pub msg: ActivationMessage,
    pub retry_log_deadline: Option<Instant>,
}

impl Run {
    pub fn new(action: ActionDescriptor, msg: ActivationMessage) -> Self {
        Self {
            action,
            msg,
            retry_log_deadline: None,
        }
    }

    pub fn rescheduled(&self, new_deadline: Instant) -> Self {
        Self {
            action: self.action.clone(),
            msg: self.msg.clone(),
            retry_log_deadline: Some(new_deadline),
        }
    }
}
