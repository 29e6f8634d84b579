//! Actions: timed, player-selectable activities with costs and rewards.

use serde::{Deserialize, Serialize};

/// A resource amount paid when a cycle of an action begins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cost {
    pub resource: String,
    pub amount: f64,
}

impl Cost {
    pub fn new(resource: impl Into<String>, amount: f64) -> Self {
        Self {
            resource: resource.into(),
            amount,
        }
    }
}

/// One entry of an action's reward table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Reward {
    /// Credit a rolled amount in `min..=max` to a resource
    Resource { resource: String, min: f64, max: f64 },
    /// Permanently move a resource's cap
    Capacity { resource: String, max_change: f64 },
    /// Experience handed to the skill collaborator
    Skill { skill: String, min: f64, max: f64 },
}

impl Reward {
    pub fn resource(resource: impl Into<String>, min: f64, max: f64) -> Self {
        Reward::Resource {
            resource: resource.into(),
            min,
            max,
        }
    }

    pub fn capacity(resource: impl Into<String>, max_change: f64) -> Self {
        Reward::Capacity {
            resource: resource.into(),
            max_change,
        }
    }

    pub fn skill(skill: impl Into<String>, min: f64, max: f64) -> Self {
        Reward::Skill {
            skill: skill.into(),
            min,
            max,
        }
    }

    /// Roll this entry's amount from a uniform sample in `[0, 1)`.
    ///
    /// `floor(sample * (max - min + 1)) + min`, capped at `max` so that a
    /// sample of exactly 1.0 cannot overshoot. Capacity entries return their
    /// fixed change.
    pub fn roll(&self, sample: f64) -> f64 {
        match self {
            Reward::Resource { min, max, .. } | Reward::Skill { min, max, .. } => {
                roll_range(*min, *max, sample)
            }
            Reward::Capacity { max_change, .. } => *max_change,
        }
    }

    /// Expected value of one roll, used for bulk replay.
    pub fn average(&self) -> f64 {
        match self {
            Reward::Resource { min, max, .. } | Reward::Skill { min, max, .. } => {
                (min + max) / 2.0
            }
            Reward::Capacity { max_change, .. } => *max_change,
        }
    }
}

fn roll_range(min: f64, max: f64, sample: f64) -> f64 {
    if max <= min {
        return min;
    }
    let sample = if sample.is_finite() {
        sample.clamp(0.0, 1.0)
    } else {
        0.0
    };
    ((sample * (max - min + 1.0)).floor() + min).min(max)
}

/// Static definition of an action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub costs: Vec<Cost>,
    #[serde(default)]
    pub rewards: Vec<Reward>,
    /// Seconds for one full cycle (always > 0 after validation)
    pub duration_secs: f64,
    #[serde(default)]
    pub is_rest: bool,
    #[serde(default = "default_true")]
    pub unlocked: bool,
    #[serde(default = "default_true")]
    pub auto_repeat: bool,
}

fn default_true() -> bool {
    true
}

impl Action {
    pub fn new(id: impl Into<String>, name: impl Into<String>, duration_secs: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            costs: Vec::new(),
            rewards: Vec::new(),
            duration_secs,
            is_rest: false,
            unlocked: true,
            auto_repeat: true,
        }
    }

    pub fn with_cost(mut self, resource: impl Into<String>, amount: f64) -> Self {
        self.costs.push(Cost::new(resource, amount));
        self
    }

    pub fn with_reward(mut self, reward: Reward) -> Self {
        self.rewards.push(reward);
        self
    }

    pub fn rest(mut self) -> Self {
        self.is_rest = true;
        self
    }

    pub fn locked(mut self) -> Self {
        self.unlocked = false;
        self
    }

    pub fn once(mut self) -> Self {
        self.auto_repeat = false;
        self
    }

    /// Seconds left in the current cycle at the given progress.
    pub fn remaining_secs(&self, progress: f64) -> f64 {
        self.duration_secs * (1.0 - progress.clamp(0.0, 1.0))
    }
}

/// Mutable per-action instance data, owned by the action engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionRuntime {
    /// Fraction of the current cycle completed (0-1)
    pub progress: f64,
    pub completion_count: u64,
    /// Engine clock (ms) when the current cycle began
    pub last_start_ms: Option<u64>,
    /// The current cycle's costs are already paid. Cleared on completion.
    #[serde(default)]
    pub paid: bool,
}

impl ActionRuntime {
    /// A fresh cycle has not been paid for yet.
    pub fn is_fresh(&self) -> bool {
        !self.paid
    }
}
