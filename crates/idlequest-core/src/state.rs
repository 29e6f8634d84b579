//! Engine state - the single aggregate that is saved and restored.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::components::{Action, ActionRuntime, Resource};
use crate::config::GameConfig;
use crate::systems::ActionCatalog;

/// Category of a persisted log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    Info,
    Completion,
    Rest,
    Offline,
    Repair,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp_ms: u64,
    pub kind: LogKind,
    pub message: String,
}

/// Bounded player-facing history. Oldest entries fall off first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameLog {
    capacity: usize,
    entries: VecDeque<LogEntry>,
}

impl GameLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::new(),
        }
    }

    pub fn push(&mut self, timestamp_ms: u64, kind: LogKind, message: impl Into<String>) {
        self.push_entry(LogEntry {
            timestamp_ms,
            kind,
            message: message.into(),
        });
    }

    pub fn push_entry(&mut self, entry: LogEntry) {
        let capacity = self.capacity.max(1);
        while self.entries.len() >= capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }
}

/// Everything the engine owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineState {
    pub current_action: Option<String>,
    /// Action interrupted by a forced rest, resumed once stats are full
    pub previous_action: Option<String>,
    /// Engine clock in milliseconds, advanced by ticks and catch-up
    pub clock_ms: u64,
    pub resources: BTreeMap<String, Resource>,
    pub catalog: ActionCatalog,
    pub runtime: BTreeMap<String, ActionRuntime>,
    pub log: GameLog,
}

impl EngineState {
    /// Fresh new-game state from content definitions.
    pub fn new_game(config: &GameConfig, now_ms: u64) -> Self {
        let catalog = config.catalog();
        let runtime = catalog
            .ids()
            .map(|id| (id.to_string(), ActionRuntime::default()))
            .collect();
        Self {
            current_action: None,
            previous_action: None,
            clock_ms: now_ms,
            resources: config
                .resources
                .iter()
                .map(|r| (r.id.clone(), r.clone()))
                .collect(),
            catalog,
            runtime,
            log: GameLog::new(config.engine.log_capacity),
        }
    }

    pub fn current(&self) -> Option<&Action> {
        self.current_action
            .as_deref()
            .and_then(|id| self.catalog.get(id))
    }

    pub fn resource(&self, id: &str) -> Option<&Resource> {
        self.resources.get(id)
    }

    pub fn runtime(&self, id: &str) -> ActionRuntime {
        self.runtime.get(id).cloned().unwrap_or_default()
    }

    pub fn runtime_mut(&mut self, id: &str) -> &mut ActionRuntime {
        self.runtime.entry(id.to_string()).or_default()
    }

    pub fn progress(&self, id: &str) -> f64 {
        self.runtime.get(id).map(|r| r.progress).unwrap_or(0.0)
    }

    pub fn completion_count(&self, id: &str) -> u64 {
        self.runtime.get(id).map(|r| r.completion_count).unwrap_or(0)
    }

    pub fn is_idle(&self) -> bool {
        self.current_action.is_none()
    }
}

/// Persisted form of the engine state plus the wall-clock save time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Reserved for migrations; every version is currently accepted
    pub version: u32,
    /// Wall-clock time of the save, used to compute offline time
    pub timestamp_ms: u64,
    pub state: EngineState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_drops_oldest() {
        let mut log = GameLog::new(3);
        for i in 0..5 {
            log.push(i, LogKind::Info, format!("entry {}", i));
        }
        assert_eq!(log.len(), 3);
        let first = log.entries().next().unwrap();
        assert_eq!(first.message, "entry 2");
        assert_eq!(log.last().unwrap().timestamp_ms, 4);
    }

    #[test]
    fn test_zero_capacity_log_keeps_latest() {
        let mut log = GameLog::new(0);
        log.push(1, LogKind::Info, "a");
        log.push(2, LogKind::Info, "b");
        assert_eq!(log.len(), 1);
        assert_eq!(log.last().unwrap().message, "b");
    }

    #[test]
    fn test_new_game_state() {
        let config = GameConfig::starter();
        let state = EngineState::new_game(&config, 1_000);

        assert!(state.is_idle());
        assert_eq!(state.clock_ms, 1_000);
        assert_eq!(state.resources.len(), config.resources.len());
        for id in state.catalog.ids() {
            assert_eq!(state.progress(id), 0.0);
            assert_eq!(state.completion_count(id), 0);
        }
    }
}
