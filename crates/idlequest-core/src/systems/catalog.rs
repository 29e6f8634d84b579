//! Action catalog - lookup table of action definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::components::Action;

/// Which actions [`ActionCatalog::list`] returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionFilter {
    All,
    Unlocked,
    Rest,
}

/// Action definitions keyed by id. Only unlock flags change during a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionCatalog {
    actions: BTreeMap<String, Action>,
    /// Default action to fall back on when resources run dry
    rest_action: Option<String>,
}

impl ActionCatalog {
    pub fn new(actions: impl IntoIterator<Item = Action>, rest_action: Option<String>) -> Self {
        Self {
            actions: actions.into_iter().map(|a| (a.id.clone(), a)).collect(),
            rest_action,
        }
    }

    pub fn get(&self, id: &str) -> Option<&Action> {
        self.actions.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.actions.contains_key(id)
    }

    pub fn is_unlocked(&self, id: &str) -> bool {
        self.actions.get(id).is_some_and(|a| a.unlocked)
    }

    pub fn list(&self, filter: ActionFilter) -> Vec<&Action> {
        self.actions
            .values()
            .filter(|a| match filter {
                ActionFilter::All => true,
                ActionFilter::Unlocked => a.unlocked,
                ActionFilter::Rest => a.is_rest,
            })
            .collect()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }

    /// The configured default rest action, if it exists in the table.
    pub fn rest_action(&self) -> Option<&Action> {
        self.rest_action.as_deref().and_then(|id| self.actions.get(id))
    }

    pub fn rest_action_id(&self) -> Option<&str> {
        self.rest_action().map(|a| a.id.as_str())
    }

    /// Flip an action's unlock flag on. Returns false if unknown or already unlocked.
    pub fn unlock(&mut self, id: &str) -> bool {
        match self.actions.get_mut(id) {
            Some(action) if !action.unlocked => {
                action.unlocked = true;
                true
            }
            Some(_) => false,
            None => {
                log::warn!("unlock of unknown action '{}' ignored", id);
                false
            }
        }
    }
}
