use std::fmt;

use serde::{Deserialize, Serialize};

/// Action recorded against a guarded call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GateAction {
    Allowed,
    Blocked,
    Warned,
}

impl fmt::Display for GateAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateAction::Allowed => f.write_str("ALLOWED"),
            GateAction::Blocked => f.write_str("BLOCKED"),
            GateAction::Warned => f.write_str("WARNED"),
        }
    }
}

/// Transient outcome of comparing an overall score to a minimum threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtectionDecision {
    pub decision: GateAction,
    pub reason: String,
}

impl ProtectionDecision {
    pub fn new(decision: GateAction, reason: impl Into<String>) -> Self {
        Self {
            decision,
            reason: reason.into(),
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.decision == GateAction::Blocked
    }
}
