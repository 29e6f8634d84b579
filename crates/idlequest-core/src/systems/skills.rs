//! Skill collaborator boundary.
//!
//! The engine never interprets skill experience. It hands `(skill, amount)`
//! pairs to whatever progression system the host plugs in.

use std::collections::BTreeMap;

pub trait SkillSink {
    fn grant(&mut self, skill_id: &str, amount: f64);
}

/// Discards all experience.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSkills;

impl SkillSink for NoSkills {
    fn grant(&mut self, _skill_id: &str, _amount: f64) {}
}

/// Running experience totals per skill.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XpTally {
    totals: BTreeMap<String, f64>,
}

impl XpTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn xp(&self, skill_id: &str) -> f64 {
        self.totals.get(skill_id).copied().unwrap_or(0.0)
    }

    pub fn totals(&self) -> &BTreeMap<String, f64> {
        &self.totals
    }
}

impl SkillSink for XpTally {
    fn grant(&mut self, skill_id: &str, amount: f64) {
        if amount.is_finite() && amount > 0.0 {
            *self.totals.entry(skill_id.to_string()).or_insert(0.0) += amount;
        }
    }
}
