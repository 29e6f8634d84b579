//! Game engine - main entry point for running a game
//!
//! [`IdleEngine`] owns the state, the event queue, the RNG and the skill
//! sink. Systems are built as short-lived borrowed views for each command.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::components::Action;
use crate::config::GameConfig;
use crate::events::GameEvent;
use crate::persistence::{BlobStore, SaveSlot, SAVE_VERSION};
use crate::state::{EngineState, GameLog, LogKind, Snapshot};
use crate::systems::*;

/// Result of [`IdleEngine::advance`].
#[derive(Debug, Clone, PartialEq)]
pub enum Advanced {
    Ticked(TickOutcome),
    CaughtUp(CatchupReport),
}

/// Main game engine
pub struct IdleEngine<R: Rng = StdRng, S: SkillSink = XpTally> {
    config: GameConfig,
    state: EngineState,
    events: Vec<GameEvent>,
    rng: R,
    skills: S,
}

impl IdleEngine {
    /// New game seeded from OS entropy.
    pub fn new(config: GameConfig, now_ms: u64) -> Self {
        Self::with_rng(config, now_ms, StdRng::from_entropy())
    }

    pub fn seeded(config: GameConfig, now_ms: u64, seed: u64) -> Self {
        Self::with_rng(config, now_ms, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> IdleEngine<R, XpTally> {
    pub fn with_rng(config: GameConfig, now_ms: u64, rng: R) -> Self {
        let mut state = EngineState::new_game(&config, now_ms);
        state.log.push(now_ms, LogKind::Info, "A new adventure begins");
        Self {
            config,
            state,
            events: Vec::new(),
            rng,
            skills: XpTally::new(),
        }
    }
}

impl<R: Rng, S: SkillSink> IdleEngine<R, S> {
    /// Swap in a different skill collaborator.
    pub fn with_skills<T: SkillSink>(self, skills: T) -> IdleEngine<R, T> {
        IdleEngine {
            config: self.config,
            state: self.state,
            events: self.events,
            rng: self.rng,
            skills,
        }
    }

    fn actions(&mut self) -> ActionEngine<'_, R> {
        ActionEngine::new(
            &mut self.state,
            &mut self.events,
            &mut self.rng,
            &mut self.skills,
            &self.config.engine,
        )
    }

    /// Start or resume `id` at the player's request.
    ///
    /// If the action cannot be afforded the rest action takes over and `id`
    /// is resumed once every stat is full; the error is still returned.
    pub fn start(&mut self, id: &str) -> Result<Started, StartError> {
        let result = self.actions().start(id);
        match &result {
            Ok(_) => self.state.previous_action = None,
            Err(StartError::CantAfford(_)) => {
                if !self.actions().force_rest(id) {
                    log::info!("cannot afford '{}' and no rest to fall back on", id);
                }
            }
            Err(_) => {}
        }
        result
    }

    /// Pause the current action. Any pending rest resumption is dropped.
    pub fn stop(&mut self) -> Option<String> {
        let stopped = self.actions().stop();
        self.state.previous_action = None;
        stopped
    }

    pub fn can_afford(&self, id: &str) -> bool {
        let Some(action) = self.state.catalog.get(id) else {
            return false;
        };
        !self.state.runtime(id).is_fresh() || can_afford(&self.state.resources, &action.costs)
    }

    /// Advance by `dt_secs` of live time.
    pub fn tick(&mut self, dt_secs: f64) -> TickOutcome {
        self.actions().tick(dt_secs)
    }

    /// Advance by wall-clock time reported by the host scheduler. Short gaps
    /// are ticked, long ones (a suspended tab, a sleeping laptop) are caught
    /// up in bulk.
    pub fn advance(&mut self, elapsed_ms: u64) -> Advanced {
        if elapsed_ms >= self.config.engine.catchup_threshold_ms {
            Advanced::CaughtUp(self.catch_up(elapsed_ms))
        } else {
            Advanced::Ticked(self.tick(elapsed_ms as f64 / 1000.0))
        }
    }

    /// Replay `elapsed_ms` of absence in closed form.
    pub fn catch_up(&mut self, elapsed_ms: u64) -> CatchupReport {
        let snapshot = self.snapshot(self.state.clock_ms);
        let (next, report) = OfflineCatchup::new(self.config.offline.clone()).run(&snapshot, elapsed_ms);
        self.state = next.state;

        for (skill, xp) in &report.rewards.skills {
            self.skills.grant(skill, *xp);
        }
        if let Some(from) = &report.rested_from {
            if let Some(rest) = self.state.catalog.rest_action_id() {
                self.events.push(GameEvent::RestSwitchEngaged {
                    from: from.clone(),
                    rest: rest.to_string(),
                });
            }
        }
        self.events.push(GameEvent::OfflineProgress {
            elapsed_ms,
            completions: report.total_completions(),
        });
        log::info!(
            "caught up {} ms: {} completion(s)",
            report.replayed_ms,
            report.total_completions()
        );
        report
    }

    /// Replace the running game with `snapshot`, replaying the time since it
    /// was taken.
    pub fn restore(&mut self, snapshot: Snapshot, now_ms: u64) -> CatchupReport {
        let elapsed_ms = now_ms.saturating_sub(snapshot.timestamp_ms);
        self.state = snapshot.state;
        self.state.log.set_capacity(self.config.engine.log_capacity);
        self.catch_up(elapsed_ms)
    }

    /// Load from `slot`, applying offline progress before returning.
    ///
    /// Returns `None` and keeps the current game if the slot is empty.
    pub fn load<B: BlobStore>(&mut self, slot: &SaveSlot<B>, now_ms: u64) -> Option<CatchupReport> {
        let (snapshot, notes) = slot.load_with_notes(&self.config)?;
        if !notes.is_empty() {
            self.events.push(GameEvent::StateRepaired { notes });
        }
        Some(self.restore(snapshot, now_ms))
    }

    pub fn save<B: BlobStore>(&self, slot: &mut SaveSlot<B>, now_ms: u64) -> bool {
        slot.save(&self.snapshot(now_ms))
    }

    pub fn snapshot(&self, now_ms: u64) -> Snapshot {
        Snapshot {
            version: SAVE_VERSION,
            timestamp_ms: now_ms,
            state: self.state.clone(),
        }
    }

    /// Make a locked action startable. Returns false if unknown or already unlocked.
    pub fn unlock_action(&mut self, id: &str) -> bool {
        if !self.state.catalog.unlock(id) {
            return false;
        }
        self.events.push(GameEvent::ActionUnlocked {
            action_id: id.to_string(),
        });
        let name = self
            .state
            .catalog
            .get(id)
            .map(|a| a.name.clone())
            .unwrap_or_else(|| id.to_string());
        let now = self.state.clock_ms;
        self.state.log.push(now, LogKind::Info, format!("New action available: {}", name));
        true
    }

    pub fn unlock_resource(&mut self, id: &str) -> bool {
        ResourceLedger::new(&mut self.state.resources, &mut self.events).unlock(id)
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn log(&self) -> &GameLog {
        &self.state.log
    }

    pub fn skills(&self) -> &S {
        &self.skills
    }

    pub fn list_actions(&self, filter: ActionFilter) -> Vec<&Action> {
        self.state.catalog.list(filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{MemoryStore, SaveFormat};
    use rand::rngs::mock::StepRng;

    fn engine() -> IdleEngine<StepRng> {
        // Every roll lands on the minimum
        IdleEngine::with_rng(GameConfig::starter(), 0, StepRng::new(0, 0))
    }

    #[test]
    fn test_engine_creation() {
        let engine = engine();
        assert!(engine.state().is_idle());
        assert_eq!(engine.state().resources["stamina"].current, 10.0);
        assert_eq!(engine.log().len(), 1);
    }

    #[test]
    fn test_unaffordable_start_engages_rest() {
        let mut engine = engine();
        engine.state.resources.get_mut("stamina").unwrap().current = 0.0;

        let err = engine.start("beg").unwrap_err();
        assert_eq!(err, StartError::CantAfford("beg".into()));
        assert_eq!(engine.state().current_action.as_deref(), Some("rest"));
        assert_eq!(engine.state().previous_action.as_deref(), Some("beg"));
        assert!(engine
            .drain_events()
            .iter()
            .any(|e| matches!(e, GameEvent::RestSwitchEngaged { from, .. } if from == "beg")));
    }

    #[test]
    fn test_rest_resumes_requested_action() {
        let mut engine = engine();
        engine.state.resources.get_mut("stamina").unwrap().current = 0.0;
        let _ = engine.start("beg");

        // Two rests refill 10 stamina
        engine.tick(10.0);
        assert_eq!(engine.state().current_action.as_deref(), Some("rest"));
        engine.tick(10.0);
        assert_eq!(engine.state().current_action.as_deref(), Some("beg"));
        assert!(engine.state().previous_action.is_none());
        assert_eq!(engine.state().resources["stamina"].current, 9.0);
    }

    #[test]
    fn test_manual_stop_cancels_resumption() {
        let mut engine = engine();
        engine.state.resources.get_mut("stamina").unwrap().current = 0.0;
        let _ = engine.start("beg");
        assert_eq!(engine.stop().as_deref(), Some("rest"));
        assert!(engine.state().previous_action.is_none());

        engine.start("rest").unwrap();
        engine.tick(20.0);
        assert_eq!(engine.state().current_action.as_deref(), Some("rest"));
    }

    #[test]
    fn test_skills_reach_sink() {
        let mut engine = engine();
        engine.start("pickpocket").unwrap();
        engine.tick(4.0);
        assert_eq!(engine.skills().xp("thievery"), 1.0);
    }

    #[test]
    fn test_advance_switches_to_catch_up() {
        let mut engine = engine();
        engine.start("rest").unwrap();

        assert!(matches!(engine.advance(100), Advanced::Ticked(_)));
        match engine.advance(120_000) {
            Advanced::CaughtUp(report) => assert_eq!(report.completions["rest"], 12),
            other => panic!("expected catch-up, got {:?}", other),
        }
        assert_eq!(engine.state().clock_ms, 120_100);
        assert!(engine
            .drain_events()
            .iter()
            .any(|e| matches!(e, GameEvent::OfflineProgress { completions: 12, .. })));
    }

    #[test]
    fn test_save_and_load_applies_offline_progress() {
        let mut engine = engine();
        engine.start("beg").unwrap();
        engine.tick(1.0);
        let mut slot = SaveSlot::new(MemoryStore::new(), SaveFormat::Json);
        assert!(engine.save(&mut slot, 1_000));

        let mut restored = IdleEngine::with_rng(GameConfig::starter(), 50_000, StepRng::new(0, 0));
        let report = restored.load(&slot, 4_000).unwrap();

        // 1s left on the saved beg, then one more full cycle; a third is paid for and just starting
        assert_eq!(report.completions["beg"], 2);
        assert_eq!(restored.state().completion_count("beg"), 2);
        assert_eq!(restored.state().current_action.as_deref(), Some("beg"));
        assert_eq!(restored.state().resources["stamina"].current, 7.0);
        assert_eq!(restored.skills().xp("begging"), 2.0);
    }

    #[test]
    fn test_load_of_empty_slot_keeps_game() {
        let mut engine = engine();
        let slot = SaveSlot::new(MemoryStore::new(), SaveFormat::Binary);
        assert!(engine.load(&slot, 10).is_none());
        assert_eq!(engine.log().len(), 1);
    }

    #[test]
    fn test_load_of_damaged_save_reports_repair() {
        let mut engine = engine();
        let slot = SaveSlot::new(MemoryStore::with_bytes(&b"{ nope"[..]), SaveFormat::Json);
        assert!(engine.load(&slot, 10).is_some());
        let events = engine.drain_events();
        assert!(events
            .iter()
            .any(|e| matches!(e, GameEvent::StateRepaired { notes } if notes.len() == 1)));
    }

    #[test]
    fn test_unlocks() {
        let mut engine = engine();
        assert!(matches!(engine.start("read_scroll"), Err(StartError::Locked(_))));
        assert!(engine.unlock_action("read_scroll"));
        assert!(!engine.unlock_action("read_scroll"));
        assert!(engine.unlock_resource("scrolls"));
        assert!(!engine.unlock_resource("scrolls"));

        let events = engine.drain_events();
        assert!(events.contains(&GameEvent::ActionUnlocked {
            action_id: "read_scroll".into()
        }));
        assert!(events.contains(&GameEvent::ResourceUnlocked {
            resource_id: "scrolls".into()
        }));
        assert!(engine.drain_events().is_empty());
    }
}
