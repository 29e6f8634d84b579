//! Game configuration - content tables and engine tunables.
//!
//! Content is data-driven: resources and actions are declared in a table
//! (usually JSON) rather than in code. [`GameConfig::validate`] rejects
//! tables the engine cannot run safely.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::components::{Action, Resource, Reward};
use crate::systems::ActionCatalog;

const HOUR_MS: u64 = 60 * 60 * 1000;

/// Tunables for the live engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Scheduler cadence the host is expected to tick at
    pub tick_interval_ms: u64,
    /// Persisted log length
    pub log_capacity: usize,
    /// Completions one tick may resolve before the rest of `dt` is dropped
    pub max_completions_per_tick: u32,
    /// Wall-clock gaps at or above this go through offline catch-up
    pub catchup_threshold_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            log_capacity: 50,
            max_completions_per_tick: 1000,
            catchup_threshold_ms: 60_000,
        }
    }
}

/// Tunables for offline catch-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OfflineConfig {
    /// Longest absence that is replayed; anything beyond is forfeited
    pub max_catchup_ms: u64,
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            max_catchup_ms: 8 * HOUR_MS,
        }
    }
}

/// Complete content + tunables for one game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    pub resources: Vec<Resource>,
    pub actions: Vec<Action>,
    #[serde(default)]
    pub rest_action: Option<String>,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub offline: OfflineConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("content JSON is malformed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("resource '{0}' is declared more than once")]
    DuplicateResource(String),
    #[error("action '{0}' is declared more than once")]
    DuplicateAction(String),
    #[error("resource '{id}' is invalid: {reason}")]
    InvalidResource { id: String, reason: String },
    #[error("action '{id}' has non-positive duration {duration}")]
    InvalidDuration { id: String, duration: f64 },
    #[error("action '{action}' references unknown resource '{resource}'")]
    UnknownResource { action: String, resource: String },
    #[error("action '{action}' has a reward with min {min} above max {max}")]
    InvalidRewardRange { action: String, min: f64, max: f64 },
    #[error("action '{action}' has a negative cost for '{resource}'")]
    NegativeCost { action: String, resource: String },
    #[error("rest action '{0}' is not declared")]
    MissingRestAction(String),
    #[error("rest action '{0}' is not flagged is_rest")]
    NotRestAction(String),
}

impl GameConfig {
    /// Parse and validate a JSON content table.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn catalog(&self) -> ActionCatalog {
        ActionCatalog::new(self.actions.iter().cloned(), self.rest_action.clone())
    }

    pub fn resource(&self, id: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.id == id)
    }

    pub fn action(&self, id: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.id == id)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut resource_ids = BTreeSet::new();
        for resource in &self.resources {
            if !resource_ids.insert(resource.id.as_str()) {
                return Err(ConfigError::DuplicateResource(resource.id.clone()));
            }
            if !resource.max.is_finite() || resource.max < 0.0 {
                return Err(ConfigError::InvalidResource {
                    id: resource.id.clone(),
                    reason: format!("max {} must be finite and >= 0", resource.max),
                });
            }
            if !resource.current.is_finite() || resource.current < 0.0 || resource.current > resource.max {
                return Err(ConfigError::InvalidResource {
                    id: resource.id.clone(),
                    reason: format!("current {} outside 0..={}", resource.current, resource.max),
                });
            }
        }
        for resource in &self.resources {
            if let Some(target) = &resource.generates {
                if !resource_ids.contains(target.as_str()) {
                    return Err(ConfigError::InvalidResource {
                        id: resource.id.clone(),
                        reason: format!("generates unknown resource '{}'", target),
                    });
                }
            }
        }

        let mut action_ids = BTreeSet::new();
        for action in &self.actions {
            if !action_ids.insert(action.id.as_str()) {
                return Err(ConfigError::DuplicateAction(action.id.clone()));
            }
            if !(action.duration_secs.is_finite() && action.duration_secs > 0.0) {
                return Err(ConfigError::InvalidDuration {
                    id: action.id.clone(),
                    duration: action.duration_secs,
                });
            }
            for cost in &action.costs {
                if !resource_ids.contains(cost.resource.as_str()) {
                    return Err(ConfigError::UnknownResource {
                        action: action.id.clone(),
                        resource: cost.resource.clone(),
                    });
                }
                if cost.amount < 0.0 {
                    return Err(ConfigError::NegativeCost {
                        action: action.id.clone(),
                        resource: cost.resource.clone(),
                    });
                }
            }
            for reward in &action.rewards {
                match reward {
                    Reward::Resource { resource, min, max } => {
                        if !resource_ids.contains(resource.as_str()) {
                            return Err(ConfigError::UnknownResource {
                                action: action.id.clone(),
                                resource: resource.clone(),
                            });
                        }
                        check_range(&action.id, *min, *max)?;
                    }
                    Reward::Capacity { resource, .. } => {
                        if !resource_ids.contains(resource.as_str()) {
                            return Err(ConfigError::UnknownResource {
                                action: action.id.clone(),
                                resource: resource.clone(),
                            });
                        }
                    }
                    Reward::Skill { min, max, .. } => check_range(&action.id, *min, *max)?,
                }
            }
        }

        if let Some(rest) = &self.rest_action {
            match self.action(rest) {
                None => return Err(ConfigError::MissingRestAction(rest.clone())),
                Some(action) if !action.is_rest => {
                    return Err(ConfigError::NotRestAction(rest.clone()))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// Built-in content: a beggar's start with begging, pickpocketing,
    /// training and resting. `data/starter_content.json` mirrors it.
    pub fn starter() -> Self {
        Self {
            resources: vec![
                Resource::stat("health", "Health", 20.0),
                Resource::stat("stamina", "Stamina", 10.0),
                Resource::new("gold", "Gold", 0.0, 50.0),
                Resource::new("scrolls", "Scrolls", 0.0, 10.0).locked(),
                Resource::new("followers", "Followers", 0.0, 5.0)
                    .generating("gold", 0.05)
                    .locked(),
            ],
            actions: vec![
                Action::new("beg", "Beg for Coins", 2.0)
                    .with_cost("stamina", 1.0)
                    .with_reward(Reward::resource("gold", 0.0, 2.0))
                    .with_reward(Reward::skill("begging", 1.0, 1.0)),
                Action::new("pickpocket", "Pick Pockets", 4.0)
                    .with_cost("stamina", 2.0)
                    .with_reward(Reward::resource("gold", 1.0, 4.0))
                    .with_reward(Reward::skill("thievery", 1.0, 2.0)),
                Action::new("train", "Train Endurance", 30.0)
                    .with_cost("stamina", 5.0)
                    .with_cost("gold", 10.0)
                    .with_reward(Reward::capacity("stamina", 1.0))
                    .with_reward(Reward::skill("fitness", 2.0, 3.0)),
                Action::new("read_scroll", "Read a Scroll", 15.0)
                    .with_cost("scrolls", 1.0)
                    .with_reward(Reward::skill("lore", 5.0, 10.0))
                    .locked(),
                Action::new("rest", "Rest", 10.0)
                    .rest()
                    .with_reward(Reward::resource("stamina", 5.0, 5.0))
                    .with_reward(Reward::resource("health", 5.0, 5.0)),
            ],
            rest_action: Some("rest".to_string()),
            engine: EngineConfig::default(),
            offline: OfflineConfig::default(),
        }
    }
}

fn check_range(action: &str, min: f64, max: f64) -> Result<(), ConfigError> {
    if min.is_finite() && max.is_finite() && min <= max {
        Ok(())
    } else {
        Err(ConfigError::InvalidRewardRange {
            action: action.to_string(),
            min,
            max,
        })
    }
}
