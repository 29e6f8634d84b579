//! Rest policy - decides when to fall back on the rest action and when to
//! pick the interrupted action back up.
//!
//! The policy only answers questions; the action engine applies the answer.

use std::collections::BTreeMap;

use crate::components::{Action, Resource};
use crate::systems::ledger::all_stats_full;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestPolicy {
    rest_action: Option<String>,
}

impl RestPolicy {
    pub fn new(rest_action: Option<String>) -> Self {
        Self { rest_action }
    }

    pub fn rest_action(&self) -> Option<&str> {
        self.rest_action.as_deref()
    }

    /// Before a new cycle of `action`: if it cannot pay and is not itself a
    /// rest action, returns the rest action to switch to.
    pub fn before_cycle(&self, action: &Action, affordable: bool) -> Option<&str> {
        if affordable || action.is_rest {
            return None;
        }
        self.rest_action
            .as_deref()
            .filter(|rest| *rest != action.id)
    }

    /// After `action` completes: if it was a rest action and every stat
    /// resource is full, returns the interrupted action to resume.
    ///
    /// A single stat below its cap blocks resumption.
    pub fn after_completion<'p>(
        &self,
        action: &Action,
        resources: &BTreeMap<String, Resource>,
        previous: Option<&'p str>,
    ) -> Option<&'p str> {
        if !action.is_rest {
            return None;
        }
        let previous = previous?;
        all_stats_full(resources).then_some(previous)
    }
}
