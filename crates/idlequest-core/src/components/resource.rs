//! Resources: bounded numeric pools such as health, stamina and gold.

use serde::{Deserialize, Serialize};

/// Distinguishes stat pools (restored by resting) from currencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Health, stamina and similar pools the rest policy watches
    Stat,
    /// Gold, scrolls and anything else that is only spent or earned
    #[default]
    Currency,
}

/// A bounded quantity with `0 <= current <= max`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub kind: ResourceKind,
    pub current: f64,
    pub max: f64,
    #[serde(default = "default_unlocked")]
    pub unlocked: bool,
    /// Units of `generates` produced per second per unit of `current`
    #[serde(default)]
    pub generation_rate: f64,
    #[serde(default)]
    pub generates: Option<String>,
}

fn default_unlocked() -> bool {
    true
}

impl Resource {
    pub fn new(id: impl Into<String>, name: impl Into<String>, current: f64, max: f64) -> Self {
        let max = sanitize(max).max(0.0);
        Self {
            id: id.into(),
            name: name.into(),
            kind: ResourceKind::Currency,
            current: sanitize(current).clamp(0.0, max),
            max,
            unlocked: true,
            generation_rate: 0.0,
            generates: None,
        }
    }

    pub fn stat(id: impl Into<String>, name: impl Into<String>, max: f64) -> Self {
        Self::new(id, name, max, max).with_kind(ResourceKind::Stat)
    }

    pub fn with_kind(mut self, kind: ResourceKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn locked(mut self) -> Self {
        self.unlocked = false;
        self
    }

    pub fn generating(mut self, target: impl Into<String>, rate: f64) -> Self {
        self.generates = Some(target.into());
        self.generation_rate = rate;
        self
    }

    pub fn is_stat(&self) -> bool {
        self.kind == ResourceKind::Stat
    }

    pub fn is_full(&self) -> bool {
        self.current >= self.max
    }

    pub fn is_empty(&self) -> bool {
        self.current <= 0.0
    }

    /// Fill level as a fraction (0-1)
    pub fn level(&self) -> f64 {
        if self.max > 0.0 {
            (self.current / self.max).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// Effective passive generation rate; misconfigured rates count as zero.
    pub fn effective_rate(&self) -> f64 {
        if self.generation_rate.is_finite() && self.generation_rate > 0.0 {
            self.generation_rate
        } else {
            0.0
        }
    }
}

/// Replace NaN and infinities with zero.
pub(crate) fn sanitize(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
