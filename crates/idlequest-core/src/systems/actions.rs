//! Action engine - the progress state machine for the single current action.
//!
//! Lifecycle of the current slot:
//!
//! ```text
//! Idle --start--> Running --progress >= 1--> Completing --+--> Running (auto-repeat, cost paid)
//!   ^                |                                     +--> Running (rest / resumed action)
//!   +------stop------+                                     +--> Idle
//! ```
//!
//! Costs are paid once per cycle, either by `start` or by auto-repeat at the
//! previous completion. Stopping pauses: progress and the paid cycle are kept,
//! and a later start resumes without paying again.

use rand::Rng;
use thiserror::Error;

use crate::components::{sanitize, Action, Reward};
use crate::config::EngineConfig;
use crate::events::{CompletionEvent, GameEvent, RewardSummary};
use crate::state::{EngineState, LogKind};
use crate::systems::ledger::{self, ResourceLedger};
use crate::systems::rest::RestPolicy;
use crate::systems::skills::SkillSink;

/// Tolerance for deciding a cycle is finished despite float drift.
const PROGRESS_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StartError {
    #[error("unknown action '{0}'")]
    UnknownAction(String),
    #[error("action '{0}' is locked")]
    Locked(String),
    #[error("'{running}' is already running")]
    Busy { running: String },
    #[error("cannot afford to start '{0}'")]
    CantAfford(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Started {
    /// True when the action picked up existing progress instead of paying anew
    pub resumed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Nothing is running
    Idle,
    /// The current action advanced without finishing
    Progressed { action_id: String, progress: f64 },
    /// At least one cycle finished during this tick
    Completed(Vec<CompletionEvent>),
}

impl TickOutcome {
    pub fn completions(&self) -> &[CompletionEvent] {
        match self {
            TickOutcome::Completed(events) => events,
            _ => &[],
        }
    }
}

/// Borrowed view that drives the current action.
pub struct ActionEngine<'a, R: Rng> {
    state: &'a mut EngineState,
    events: &'a mut Vec<GameEvent>,
    rng: &'a mut R,
    skills: &'a mut dyn SkillSink,
    config: &'a EngineConfig,
    policy: RestPolicy,
}

impl<'a, R: Rng> ActionEngine<'a, R> {
    pub fn new(
        state: &'a mut EngineState,
        events: &'a mut Vec<GameEvent>,
        rng: &'a mut R,
        skills: &'a mut dyn SkillSink,
        config: &'a EngineConfig,
    ) -> Self {
        let policy = RestPolicy::new(state.catalog.rest_action_id().map(str::to_string));
        Self {
            state,
            events,
            rng,
            skills,
            config,
            policy,
        }
    }

    fn ledger(&mut self) -> ResourceLedger<'_> {
        ResourceLedger::new(&mut self.state.resources, self.events)
    }

    /// Whether starting `id` now would not fail for lack of resources.
    pub fn can_afford(&self, id: &str) -> bool {
        let Some(action) = self.state.catalog.get(id) else {
            return false;
        };
        !self.state.runtime(id).is_fresh() || ledger::can_afford(&self.state.resources, &action.costs)
    }

    /// Begin or resume `id`.
    ///
    /// A different running action is not stopped implicitly. On any error
    /// nothing is mutated.
    pub fn start(&mut self, id: &str) -> Result<Started, StartError> {
        let action = self
            .state
            .catalog
            .get(id)
            .ok_or_else(|| StartError::UnknownAction(id.to_string()))?;
        if !action.unlocked {
            return Err(StartError::Locked(id.to_string()));
        }
        let costs = action.costs.clone();

        match self.state.current_action.as_deref() {
            Some(running) if running == id => return Ok(Started { resumed: true }),
            Some(running) => {
                return Err(StartError::Busy {
                    running: running.to_string(),
                })
            }
            None => {}
        }

        let resumed = !self.state.runtime(id).is_fresh();
        if !resumed && !self.ledger().pay(&costs) {
            return Err(StartError::CantAfford(id.to_string()));
        }

        let now = self.state.clock_ms;
        self.state.current_action = Some(id.to_string());
        let runtime = self.state.runtime_mut(id);
        runtime.paid = true;
        runtime.last_start_ms = Some(now);
        self.events.push(GameEvent::ActionStarted {
            action_id: id.to_string(),
            resumed,
        });
        log::debug!("started '{}' (resumed: {})", id, resumed);
        Ok(Started { resumed })
    }

    /// Pause the current action, remembering it as the previous action.
    pub fn stop(&mut self) -> Option<String> {
        let id = self.state.current_action.take()?;
        self.state.previous_action = Some(id.clone());
        self.events.push(GameEvent::ActionStopped {
            action_id: id.clone(),
        });
        Some(id)
    }

    /// Advance the simulation by `dt_secs`.
    ///
    /// Passive generation always runs. Time left over after a completion
    /// carries into whatever action is current afterwards.
    pub fn tick(&mut self, dt_secs: f64) -> TickOutcome {
        let dt_secs = sanitize(dt_secs).max(0.0);
        let start_ms = self.state.clock_ms;
        self.ledger().generate(dt_secs);

        let mut consumed = 0.0;
        let mut completions = Vec::new();
        while let Some(id) = self.state.current_action.clone() {
            let Some(action) = self.state.catalog.get(&id).cloned() else {
                log::warn!("current action '{}' is not in the catalog; going idle", id);
                self.go_idle();
                break;
            };
            if !(action.duration_secs > 0.0) {
                log::warn!("action '{}' has no positive duration; going idle", id);
                self.go_idle();
                break;
            }

            let remaining = dt_secs - consumed;
            let progress = self.state.progress(&id);
            let to_finish = action.remaining_secs(progress);
            if remaining + PROGRESS_EPSILON < to_finish {
                let runtime = self.state.runtime_mut(&id);
                runtime.progress = (progress + remaining / action.duration_secs).min(1.0);
                break;
            }
            if completions.len() >= self.config.max_completions_per_tick as usize {
                log::warn!(
                    "tick hit {} completions; dropping {:.1}s of '{}'",
                    completions.len(),
                    remaining,
                    id
                );
                break;
            }

            consumed += to_finish.min(remaining);
            self.state.clock_ms = start_ms.saturating_add(secs_to_ms(consumed));
            completions.push(self.complete(&id));
        }
        self.state.clock_ms = start_ms.saturating_add(secs_to_ms(dt_secs));

        if !completions.is_empty() {
            return TickOutcome::Completed(completions);
        }
        match &self.state.current_action {
            Some(id) => TickOutcome::Progressed {
                action_id: id.clone(),
                progress: self.state.progress(id),
            },
            None => TickOutcome::Idle,
        }
    }

    /// Finish one cycle of `id`: roll rewards, bump the count, reset progress,
    /// then let the rest policy and auto-repeat decide what runs next.
    pub fn complete(&mut self, id: &str) -> CompletionEvent {
        let action = self.state.catalog.get(id).cloned();
        let rewards = match &action {
            Some(action) => self.resolve_rewards(action),
            None => {
                log::warn!("completed unknown action '{}'", id);
                RewardSummary::default()
            }
        };

        let now = self.state.clock_ms;
        let runtime = self.state.runtime_mut(id);
        runtime.completion_count += 1;
        runtime.progress = 0.0;
        runtime.paid = false;
        runtime.last_start_ms = Some(now);

        let event = CompletionEvent {
            action_id: id.to_string(),
            rewards,
            timestamp_ms: now,
        };
        self.events.push(GameEvent::ActionCompleted(event.clone()));
        let name = action.as_ref().map(|a| a.name.as_str()).unwrap_or(id);
        let message = format!("{}: {}", name, event.rewards.describe());
        self.state.log.push(now, LogKind::Completion, message);

        if let Some(action) = action {
            self.after_completion(&action);
        }
        event
    }

    /// Switch to the rest action on behalf of `interrupted`, which will be
    /// resumed once every stat is full. Returns false if no switch happened.
    pub fn force_rest(&mut self, interrupted: &str) -> bool {
        let Some(action) = self.state.catalog.get(interrupted) else {
            return false;
        };
        let Some(rest_id) = self.policy.before_cycle(action, false).map(str::to_string) else {
            return false;
        };

        let paused = self.state.current_action.take();
        let previous = self.state.previous_action.replace(interrupted.to_string());
        match self.start(&rest_id) {
            Ok(_) => {
                if let Some(paused) = paused {
                    self.events.push(GameEvent::ActionStopped { action_id: paused });
                }
                self.events.push(GameEvent::RestSwitchEngaged {
                    from: interrupted.to_string(),
                    rest: rest_id.clone(),
                });
                let now = self.state.clock_ms;
                self.state.log.push(
                    now,
                    LogKind::Rest,
                    format!("Too exhausted to continue {}; resting", interrupted),
                );
                log::info!("rest engaged: '{}' -> '{}'", interrupted, rest_id);
                true
            }
            Err(err) => {
                log::warn!("could not start rest action '{}': {}", rest_id, err);
                self.state.current_action = paused;
                self.state.previous_action = previous;
                false
            }
        }
    }

    fn after_completion(&mut self, action: &Action) {
        if self.state.current_action.as_deref() != Some(action.id.as_str()) {
            return;
        }

        let resume = self
            .policy
            .after_completion(
                action,
                &self.state.resources,
                self.state.previous_action.as_deref(),
            )
            .map(str::to_string);
        if let Some(previous) = resume {
            self.resume_from_rest(action, previous);
            return;
        }

        if !action.auto_repeat {
            self.go_idle();
            return;
        }
        if self.ledger().pay(&action.costs) {
            self.state.runtime_mut(&action.id).paid = true;
            return;
        }
        if !self.force_rest(&action.id) {
            log::info!("'{}' cannot afford another cycle; going idle", action.id);
            self.go_idle();
        }
    }

    fn resume_from_rest(&mut self, rest: &Action, previous: String) {
        // Cleared before anything else so a failed resume cannot retry later
        self.state.previous_action = None;
        self.state.current_action = None;
        self.events.push(GameEvent::ActionStopped {
            action_id: rest.id.clone(),
        });

        let now = self.state.clock_ms;
        match self.start(&previous) {
            Ok(_) => {
                self.events.push(GameEvent::RestSwitchResolved {
                    resumed: Some(previous.clone()),
                });
                self.state
                    .log
                    .push(now, LogKind::Rest, format!("Fully rested; back to {}", previous));
                log::info!("rest resolved: resuming '{}'", previous);
            }
            Err(err) => {
                log::warn!("could not resume '{}' after rest: {}", previous, err);
                self.events
                    .push(GameEvent::RestSwitchResolved { resumed: None });
                self.state.log.push(
                    now,
                    LogKind::Rest,
                    format!("Fully rested, but cannot return to {}", previous),
                );
                if self.start(&rest.id).is_err() {
                    self.state.current_action = None;
                }
            }
        }
    }

    fn go_idle(&mut self) {
        if let Some(id) = self.state.current_action.take() {
            self.events.push(GameEvent::ActionStopped { action_id: id });
        }
    }

    fn resolve_rewards(&mut self, action: &Action) -> RewardSummary {
        let mut summary = RewardSummary::default();
        for reward in &action.rewards {
            match reward {
                Reward::Resource { resource, .. } => {
                    let amount = reward.roll(self.rng.gen::<f64>());
                    if self.state.resources.contains_key(resource) {
                        let applied = self.ledger().credit(resource, amount);
                        summary.add_resource(resource, applied);
                    } else {
                        log::warn!("'{}' rewards unknown resource '{}'", action.id, resource);
                    }
                }
                Reward::Capacity {
                    resource,
                    max_change,
                } => {
                    if self.state.resources.contains_key(resource) {
                        let applied = self.ledger().adjust_max(resource, *max_change);
                        summary.add_capacity(resource, applied);
                    } else {
                        log::warn!("'{}' raises unknown resource '{}'", action.id, resource);
                    }
                }
                Reward::Skill { skill, .. } => {
                    let amount = reward.roll(self.rng.gen::<f64>());
                    self.skills.grant(skill, amount);
                    summary.add_skill(skill, amount);
                }
            }
        }
        summary
    }
}

fn secs_to_ms(secs: f64) -> u64 {
    (secs * 1000.0).round().max(0.0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Resource;
    use crate::config::GameConfig;
    use crate::systems::skills::XpTally;
    use crate::systems::ActionCatalog;
    use rand::rngs::mock::StepRng;

    /// Gold 0/10, stamina 10/10, health 20/20, beg, rest.
    fn config() -> GameConfig {
        GameConfig {
            resources: vec![
                Resource::new("gold", "Gold", 0.0, 10.0),
                Resource::stat("stamina", "Stamina", 10.0),
                Resource::stat("health", "Health", 20.0),
            ],
            actions: vec![
                Action::new("beg", "Beg", 2.0)
                    .with_cost("stamina", 1.0)
                    .with_reward(Reward::resource("gold", 0.0, 2.0))
                    .with_reward(Reward::skill("begging", 1.0, 1.0)),
                Action::new("rest", "Rest", 10.0)
                    .rest()
                    .with_reward(Reward::resource("stamina", 5.0, 5.0))
                    .with_reward(Reward::resource("health", 5.0, 5.0)),
                Action::new("study", "Study", 5.0).locked(),
                Action::new("errand", "Errand", 1.0).once(),
            ],
            rest_action: Some("rest".into()),
            ..GameConfig::starter()
        }
    }

    struct Harness {
        state: EngineState,
        events: Vec<GameEvent>,
        rng: StepRng,
        skills: XpTally,
        config: GameConfig,
    }

    impl Harness {
        fn new() -> Self {
            let config = config();
            Self {
                state: EngineState::new_game(&config, 0),
                events: Vec::new(),
                rng: StepRng::new(0, 0),
                skills: XpTally::new(),
                config,
            }
        }

        fn engine(&mut self) -> ActionEngine<'_, StepRng> {
            ActionEngine::new(
                &mut self.state,
                &mut self.events,
                &mut self.rng,
                &mut self.skills,
                &self.config.engine,
            )
        }

        fn current(&self, id: &str) -> f64 {
            self.state.resources[id].current
        }

        fn set(&mut self, id: &str, value: f64) {
            self.state.resources.get_mut(id).unwrap().current = value;
        }
    }

    #[test]
    fn test_start_pays_cost_up_front() {
        let mut h = Harness::new();
        let started = h.engine().start("beg").unwrap();
        assert!(!started.resumed);
        assert_eq!(h.current("stamina"), 9.0);
        assert_eq!(h.state.current_action.as_deref(), Some("beg"));
        assert_eq!(h.state.runtime("beg").last_start_ms, Some(0));
    }

    #[test]
    fn test_start_errors_do_not_mutate() {
        let mut h = Harness::new();
        h.set("stamina", 0.0);
        let before = h.state.clone();

        assert_eq!(
            h.engine().start("beg"),
            Err(StartError::CantAfford("beg".into()))
        );
        assert_eq!(
            h.engine().start("study"),
            Err(StartError::Locked("study".into()))
        );
        assert_eq!(
            h.engine().start("fish"),
            Err(StartError::UnknownAction("fish".into()))
        );
        assert_eq!(h.state, before);
    }

    #[test]
    fn test_busy_does_not_stop_running_action() {
        let mut h = Harness::new();
        h.engine().start("beg").unwrap();
        assert_eq!(
            h.engine().start("rest"),
            Err(StartError::Busy {
                running: "beg".into()
            })
        );
        assert_eq!(h.state.current_action.as_deref(), Some("beg"));
        // Restarting the running action is a no-op
        assert_eq!(h.engine().start("beg"), Ok(Started { resumed: true }));
        assert_eq!(h.current("stamina"), 9.0);
    }

    #[test]
    fn test_stop_pauses_and_resume_is_free() {
        let mut h = Harness::new();
        h.engine().start("beg").unwrap();
        h.engine().tick(0.5);
        let progress = h.state.progress("beg");
        assert!((progress - 0.25).abs() < 1e-9);

        assert_eq!(h.engine().stop(), Some("beg".into()));
        assert_eq!(h.state.previous_action.as_deref(), Some("beg"));
        assert_eq!(h.state.progress("beg"), progress);
        assert_eq!(h.engine().stop(), None);

        let started = h.engine().start("beg").unwrap();
        assert!(started.resumed);
        assert_eq!(h.current("stamina"), 9.0);
        assert_eq!(h.state.progress("beg"), progress);
    }

    #[test]
    fn test_immediate_stop_then_start_pays_once() {
        let mut h = Harness::new();
        h.engine().start("beg").unwrap();
        assert_eq!(h.engine().stop(), Some("beg".into()));
        assert_eq!(h.state.progress("beg"), 0.0);

        let started = h.engine().start("beg").unwrap();
        assert!(started.resumed);
        assert_eq!(h.current("stamina"), 9.0);
        assert!(h.engine().can_afford("beg"));

        // The resumed cycle is the one already paid for
        h.engine().tick(2.0);
        assert_eq!(h.state.completion_count("beg"), 1);
        assert_eq!(h.current("stamina"), 8.0);
    }

    #[test]
    fn test_stop_at_cycle_boundary_keeps_auto_repeat_payment() {
        let mut h = Harness::new();
        h.engine().start("beg").unwrap();
        h.engine().tick(2.0);
        // Auto-repeat already paid for cycle two at progress 0
        assert_eq!(h.current("stamina"), 8.0);
        assert!(h.state.runtime("beg").paid);

        h.engine().stop();
        let started = h.engine().start("beg").unwrap();
        assert!(started.resumed);
        assert_eq!(h.current("stamina"), 8.0);

        h.engine().tick(2.0);
        assert_eq!(h.state.completion_count("beg"), 2);
        assert_eq!(h.current("stamina"), 7.0);
    }

    #[test]
    fn test_paused_paid_cycle_resumes_when_broke() {
        let mut h = Harness::new();
        h.engine().start("beg").unwrap();
        h.engine().stop();
        h.set("stamina", 0.0);
        assert!(h.engine().can_afford("beg"));
        assert_eq!(h.engine().start("beg"), Ok(Started { resumed: true }));
        assert_eq!(h.current("stamina"), 0.0);
    }

    #[test]
    fn test_huge_tick_saturates_clock() {
        let mut h = Harness::new();
        h.engine().tick(1.0);
        h.engine().tick(1e17);
        assert_eq!(h.state.clock_ms, u64::MAX);
    }

    #[test]
    fn test_idle_tick_still_generates() {
        let mut h = Harness::new();
        h.state.resources.insert(
            "beggars".into(),
            Resource::new("beggars", "Beggars", 1.0, 1.0).generating("gold", 1.0),
        );
        assert_eq!(h.engine().tick(2.0), TickOutcome::Idle);
        assert_eq!(h.current("gold"), 2.0);
        assert_eq!(h.state.clock_ms, 2_000);
    }

    #[test]
    fn test_beg_scenario() {
        let mut h = Harness::new();
        h.engine().start("beg").unwrap();
        let outcome = h.engine().tick(2.0);

        let completions = outcome.completions();
        assert_eq!(completions.len(), 1);
        assert_eq!(completions[0].action_id, "beg");
        assert_eq!(completions[0].timestamp_ms, 2_000);
        assert_eq!(h.state.completion_count("beg"), 1);
        assert_eq!(h.state.progress("beg"), 0.0);
        let gold = h.current("gold");
        assert!((0.0..=2.0).contains(&gold));
        assert_eq!(h.skills.xp("begging"), 1.0);
        // Auto-repeat paid for the next cycle
        assert_eq!(h.current("stamina"), 8.0);
        assert_eq!(h.state.current_action.as_deref(), Some("beg"));
    }

    #[test]
    fn test_small_ticks_accumulate_to_completion() {
        let mut h = Harness::new();
        h.engine().start("beg").unwrap();
        let mut completed = 0;
        for _ in 0..20 {
            completed += h.engine().tick(0.1).completions().len();
        }
        assert_eq!(completed, 1);
        assert_eq!(h.state.completion_count("beg"), 1);
    }

    #[test]
    fn test_leftover_time_carries_over() {
        let mut h = Harness::new();
        h.engine().start("beg").unwrap();
        let outcome = h.engine().tick(5.0);
        assert_eq!(outcome.completions().len(), 2);
        assert!((h.state.progress("beg") - 0.5).abs() < 1e-9);
        assert_eq!(h.current("stamina"), 7.0);
    }

    #[test]
    fn test_complete_counts_exactly_once() {
        let mut h = Harness::new();
        h.engine().start("beg").unwrap();
        h.engine().tick(1.0);
        let event = h.engine().complete("beg");
        assert_eq!(event.action_id, "beg");
        assert_eq!(h.state.completion_count("beg"), 1);
        assert_eq!(h.state.progress("beg"), 0.0);
    }

    #[test]
    fn test_min_roll_with_zero_rng() {
        let mut h = Harness::new();
        h.engine().start("beg").unwrap();
        h.engine().tick(2.0);
        assert_eq!(h.current("gold"), 0.0);
    }

    #[test]
    fn test_max_roll_with_saturated_rng() {
        let mut h = Harness::new();
        h.rng = StepRng::new(u64::MAX, 0);
        h.engine().start("beg").unwrap();
        h.engine().tick(2.0);
        assert_eq!(h.current("gold"), 2.0);
    }

    #[test]
    fn test_non_repeating_action_goes_idle() {
        let mut h = Harness::new();
        h.engine().start("errand").unwrap();
        h.engine().tick(3.0);
        assert_eq!(h.state.completion_count("errand"), 1);
        assert!(h.state.is_idle());
        assert_eq!(h.state.previous_action, None);
    }

    #[test]
    fn test_exhaustion_forces_rest_then_resumes() {
        let mut h = Harness::new();
        h.set("stamina", 1.0);
        h.engine().start("beg").unwrap();

        // Completes, cannot pay for another cycle, switches to rest
        h.engine().tick(2.0);
        assert_eq!(h.state.current_action.as_deref(), Some("rest"));
        assert_eq!(h.state.previous_action.as_deref(), Some("beg"));
        assert!(h.events.iter().any(|e| matches!(
            e,
            GameEvent::RestSwitchEngaged { from, rest } if from == "beg" && rest == "rest"
        )));

        // One rest cycle brings stamina 0 -> 5: not full, keep resting
        h.engine().tick(10.0);
        assert_eq!(h.state.current_action.as_deref(), Some("rest"));
        assert_eq!(h.state.previous_action.as_deref(), Some("beg"));

        // Second cycle fills stamina: beg resumes and pays its cost
        h.engine().tick(10.0);
        assert_eq!(h.state.current_action.as_deref(), Some("beg"));
        assert_eq!(h.state.previous_action, None);
        assert_eq!(h.current("stamina"), 9.0);
        assert!(h.events.contains(&GameEvent::RestSwitchResolved {
            resumed: Some("beg".into())
        }));
    }

    #[test]
    fn test_rest_resume_blocked_by_one_stat() {
        let mut h = Harness::new();
        h.set("health", 10.0);
        h.state.previous_action = Some("beg".into());
        h.state.current_action = Some("rest".into());

        h.engine().tick(10.0);
        // Stamina is full but health is at 15/20
        assert_eq!(h.state.current_action.as_deref(), Some("rest"));
        assert_eq!(h.state.previous_action.as_deref(), Some("beg"));

        h.engine().tick(10.0);
        assert_eq!(h.state.current_action.as_deref(), Some("beg"));
        assert_eq!(h.state.previous_action, None);
    }

    #[test]
    fn test_failed_resume_clears_previous_and_keeps_resting() {
        let mut h = Harness::new();
        h.state.previous_action = Some("study".into());
        h.state.current_action = Some("rest".into());

        h.engine().tick(10.0);
        assert_eq!(h.state.previous_action, None);
        assert_eq!(h.state.current_action.as_deref(), Some("rest"));
        assert!(h
            .events
            .contains(&GameEvent::RestSwitchResolved { resumed: None }));
    }

    #[test]
    fn test_force_rest_from_start_failure() {
        let mut h = Harness::new();
        h.set("stamina", 0.0);
        assert!(h.engine().force_rest("beg"));
        assert_eq!(h.state.current_action.as_deref(), Some("rest"));
        assert_eq!(h.state.previous_action.as_deref(), Some("beg"));

        // The rest action never forces itself
        h.engine().stop();
        assert!(!h.engine().force_rest("rest"));
    }

    #[test]
    fn test_without_rest_action_exhaustion_goes_idle() {
        let mut h = Harness::new();
        h.state.catalog = ActionCatalog::new(h.config.actions.iter().cloned(), None);
        h.set("stamina", 1.0);
        h.engine().start("beg").unwrap();
        h.engine().tick(2.0);
        assert!(h.state.is_idle());
        assert_eq!(h.state.previous_action, None);
    }

    #[test]
    fn test_capacity_reward_applies_once_per_completion() {
        let mut h = Harness::new();
        h.state.catalog = ActionCatalog::new(
            vec![Action::new("train", "Train", 1.0).with_reward(Reward::capacity("stamina", 2.0))],
            None,
        );
        h.engine().start("train").unwrap();
        let outcome = h.engine().tick(3.0);
        assert_eq!(outcome.completions().len(), 3);
        assert_eq!(h.state.resources["stamina"].max, 16.0);
        assert_eq!(outcome.completions()[0].rewards.capacity["stamina"], 2.0);
    }

    #[test]
    fn test_unknown_reward_entry_is_skipped() {
        let mut h = Harness::new();
        h.state.catalog = ActionCatalog::new(
            vec![Action::new("odd", "Odd Job", 1.0)
                .with_reward(Reward::resource("mana", 1.0, 1.0))
                .with_reward(Reward::resource("gold", 3.0, 3.0))],
            None,
        );
        h.engine().start("odd").unwrap();
        let outcome = h.engine().tick(1.0);
        let rewards = &outcome.completions()[0].rewards;
        assert_eq!(rewards.resources.get("gold"), Some(&3.0));
        assert!(!rewards.resources.contains_key("mana"));
    }

    #[test]
    fn test_completion_cap_per_tick() {
        let mut h = Harness::new();
        h.config.engine.max_completions_per_tick = 3;
        h.state.catalog =
            ActionCatalog::new(vec![Action::new("tap", "Tap", 1.0)], None);
        h.engine().start("tap").unwrap();
        let outcome = h.engine().tick(100.0);
        assert_eq!(outcome.completions().len(), 3);
        assert_eq!(h.state.clock_ms, 100_000);
    }

    #[test]
    fn test_resources_stay_bounded_over_long_run() {
        let mut h = Harness::new();
        h.rng = StepRng::new(0, 0x9E37_79B9_7F4A_7C15);
        h.engine().start("beg").unwrap();
        for _ in 0..2_000 {
            h.engine().tick(0.7);
            for r in h.state.resources.values() {
                assert!(r.current >= 0.0 && r.current <= r.max, "{} out of bounds", r.id);
            }
        }
        assert!(h.state.completion_count("rest") > 0);
    }
}
