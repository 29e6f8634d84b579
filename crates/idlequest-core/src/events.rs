//! Events emitted by the simulation for logs and notifications.
//!
//! Events are transient: the host drains them after each command or tick
//! and decides how to present them. They are never persisted.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Everything a single completion granted, keyed by resource or skill id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RewardSummary {
    /// Amounts actually credited (after clamping)
    pub resources: BTreeMap<String, f64>,
    /// Cap changes applied
    pub capacity: BTreeMap<String, f64>,
    /// Experience forwarded to the skill collaborator
    pub skills: BTreeMap<String, f64>,
}

impl RewardSummary {
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty() && self.capacity.is_empty() && self.skills.is_empty()
    }

    pub(crate) fn add_resource(&mut self, id: &str, amount: f64) {
        *self.resources.entry(id.to_string()).or_insert(0.0) += amount;
    }

    pub(crate) fn add_capacity(&mut self, id: &str, amount: f64) {
        *self.capacity.entry(id.to_string()).or_insert(0.0) += amount;
    }

    pub(crate) fn add_skill(&mut self, id: &str, amount: f64) {
        *self.skills.entry(id.to_string()).or_insert(0.0) += amount;
    }

    /// One-line rendering such as `+2 gold, +5 max stamina, +1 begging xp`.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        for (id, amount) in &self.resources {
            parts.push(format!("{} {}", signed(*amount), id));
        }
        for (id, amount) in &self.capacity {
            parts.push(format!("{} max {}", signed(*amount), id));
        }
        for (id, amount) in &self.skills {
            parts.push(format!("{} {} xp", signed(*amount), id));
        }
        if parts.is_empty() {
            "nothing".to_string()
        } else {
            parts.join(", ")
        }
    }
}

fn signed(amount: f64) -> String {
    let rounded = (amount * 100.0).round() / 100.0;
    if rounded >= 0.0 {
        format!("+{}", rounded)
    } else {
        format!("{}", rounded)
    }
}

/// Result of one completed action cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionEvent {
    pub action_id: String,
    pub rewards: RewardSummary,
    pub timestamp_ms: u64,
}

/// Notifications raised by the ledger, the action engine and the rest policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    ActionStarted {
        action_id: String,
        resumed: bool,
    },
    ActionStopped {
        action_id: String,
    },
    ActionCompleted(CompletionEvent),
    ActionUnlocked {
        action_id: String,
    },
    ResourceChanged {
        resource_id: String,
        old: f64,
        new: f64,
    },
    ResourceDepleted {
        resource_id: String,
    },
    ResourceFull {
        resource_id: String,
    },
    ResourceUnlocked {
        resource_id: String,
    },
    /// The active action ran dry and the rest action took over
    RestSwitchEngaged {
        from: String,
        rest: String,
    },
    /// A forced rest ended; `resumed` is the action picked back up, if any
    RestSwitchResolved {
        resumed: Option<String>,
    },
    OfflineProgress {
        elapsed_ms: u64,
        completions: u64,
    },
    StateRepaired {
        notes: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_summary() {
        let mut summary = RewardSummary::default();
        assert_eq!(summary.describe(), "nothing");

        summary.add_resource("gold", 2.0);
        summary.add_resource("gold", 1.0);
        summary.add_capacity("stamina", 5.0);
        summary.add_skill("begging", 0.5);
        assert_eq!(summary.describe(), "+3 gold, +5 max stamina, +0.5 begging xp");
    }

    #[test]
    fn test_event_json_tag() {
        let event = GameEvent::ResourceFull {
            resource_id: "stamina".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"type":"resource_full","resource_id":"stamina"}"#);
    }
}
