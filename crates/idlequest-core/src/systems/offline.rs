//! Offline catch-up - replays time spent away in bulk.
//!
//! Instead of ticking through the gap, each phase is solved in closed form:
//! passive generation is linear in time, and a running action completes
//! `floor(time / duration)` times with rewards taken at their average. No
//! randomness is consumed, so the same snapshot and gap always produce the
//! same result.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::components::{sanitize, Cost, Resource, Reward};
use crate::config::OfflineConfig;
use crate::events::{GameEvent, RewardSummary};
use crate::state::{EngineState, LogKind, Snapshot};
use crate::systems::ledger::ResourceLedger;

const PROGRESS_EPSILON: f64 = 1e-9;

/// What a catch-up granted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatchupReport {
    /// Time the player was away
    pub elapsed_ms: u64,
    /// Portion of `elapsed_ms` actually replayed after clamping
    pub replayed_ms: u64,
    pub completions: BTreeMap<String, u64>,
    pub rewards: RewardSummary,
    /// Amounts produced by passive generation
    pub generated: BTreeMap<String, f64>,
    /// Set when the running action ran dry and the rest action took over
    pub rested_from: Option<String>,
}

impl CatchupReport {
    pub fn total_completions(&self) -> u64 {
        self.completions.values().sum()
    }

    /// One-line summary for the game log.
    pub fn describe(&self) -> String {
        let mut text = format!("While you were away ({})", format_duration(self.elapsed_ms));
        if self.replayed_ms < self.elapsed_ms {
            text.push_str(&format!(", {} counted", format_duration(self.replayed_ms)));
        }
        if self.completions.is_empty() && self.generated.is_empty() {
            text.push_str(": nothing happened");
            return text;
        }
        let done: Vec<String> = self
            .completions
            .iter()
            .map(|(id, count)| format!("{} x{}", id, count))
            .collect();
        if !done.is_empty() {
            text.push_str(&format!(": {}", done.join(", ")));
        }
        if !self.rewards.is_empty() {
            text.push_str(&format!(" ({})", self.rewards.describe()));
        }
        if !self.generated.is_empty() {
            let produced: Vec<String> = self
                .generated
                .iter()
                .map(|(id, amount)| format!("{:.1} {}", amount, id))
                .collect();
            text.push_str(&format!("; produced {}", produced.join(", ")));
        }
        text
    }
}

#[derive(Debug, Clone, Default)]
pub struct OfflineCatchup {
    config: OfflineConfig,
}

impl OfflineCatchup {
    pub fn new(config: OfflineConfig) -> Self {
        Self { config }
    }

    /// The snapshot as it would look after `elapsed_ms` of absence.
    pub fn apply(&self, snapshot: &Snapshot, elapsed_ms: u64) -> Snapshot {
        self.run(snapshot, elapsed_ms).0
    }

    /// Like [`apply`](Self::apply), also returning what was granted.
    pub fn run(&self, snapshot: &Snapshot, elapsed_ms: u64) -> (Snapshot, CatchupReport) {
        let mut next = snapshot.clone();
        let replayed_ms = elapsed_ms.min(self.config.max_catchup_ms);
        let mut report = CatchupReport {
            elapsed_ms,
            replayed_ms,
            ..Default::default()
        };

        let mut replay = Replay {
            state: &mut next.state,
            report: &mut report,
            origin_ms: snapshot.state.clock_ms,
            elapsed_secs: 0.0,
        };
        let secs = replayed_ms as f64 / 1000.0;
        replay.generate(secs);
        replay.run_current(secs);

        next.timestamp_ms = snapshot.timestamp_ms.saturating_add(elapsed_ms);
        next.state.clock_ms = snapshot.state.clock_ms.saturating_add(elapsed_ms);
        next.state
            .log
            .push(next.state.clock_ms, LogKind::Offline, report.describe());
        (next, report)
    }
}

/// Mutable working set for one catch-up.
struct Replay<'a> {
    state: &'a mut EngineState,
    report: &'a mut CatchupReport,
    origin_ms: u64,
    /// Seconds of the window already accounted for
    elapsed_secs: f64,
}

impl Replay<'_> {
    fn ledger<'s>(state: &'s mut EngineState, sink: &'s mut Vec<GameEvent>) -> ResourceLedger<'s> {
        ResourceLedger::new(&mut state.resources, sink)
    }

    fn generate(&mut self, secs: f64) {
        let before: BTreeMap<String, f64> = self
            .state
            .resources
            .iter()
            .map(|(id, r)| (id.clone(), r.current))
            .collect();
        let mut sink = Vec::new();
        Self::ledger(self.state, &mut sink).generate(secs);
        for (id, resource) in &self.state.resources {
            let gained = resource.current - before.get(id).copied().unwrap_or(0.0);
            if gained > 0.0 {
                self.report.generated.insert(id.clone(), gained);
            }
        }
    }

    fn run_current(&mut self, secs: f64) {
        let Some(id) = self.state.current_action.clone() else {
            return;
        };
        let Some(leftover) = self.replay_action(&id, secs) else {
            return;
        };

        // Ran dry with time to spare: fall back on the rest action once
        let Some(rest) = self.state.catalog.rest_action().cloned() else {
            self.state.current_action = None;
            return;
        };
        if rest.id == id {
            self.state.current_action = None;
            return;
        }
        let mut sink = Vec::new();
        if !Self::ledger(self.state, &mut sink).pay(&rest.costs) {
            self.state.current_action = None;
            return;
        }
        self.state.previous_action = Some(id.clone());
        self.state.current_action = Some(rest.id.clone());
        let runtime = self.state.runtime_mut(&rest.id);
        runtime.progress = 0.0;
        runtime.paid = true;
        runtime.last_start_ms = Some(self.origin_ms + secs_to_ms(self.elapsed_secs));
        self.report.rested_from = Some(id);

        if self.replay_action(&rest.id, leftover).is_some() {
            self.state.current_action = None;
        }
    }

    /// Replay `secs` of the current cycle of `id`, paying for it first if the
    /// saved state had not.
    ///
    /// Returns the unused seconds if the action could not pay for a further
    /// cycle before time ran out. The action is left unpaid at progress 0 in
    /// that case.
    fn replay_action(&mut self, id: &str, secs: f64) -> Option<f64> {
        let Some(action) = self.state.catalog.get(id).cloned() else {
            log::warn!("offline replay: unknown action '{}'", id);
            self.state.current_action = None;
            return None;
        };
        if !action.duration_secs.is_finite() || action.duration_secs <= 0.0 {
            self.state.current_action = None;
            return None;
        }
        let duration = action.duration_secs;

        if self.state.runtime(id).is_fresh() {
            if cycles_affordable(&self.state.resources, &action.costs) == 0 {
                return Some(secs);
            }
            self.pay_cycles(&action.costs, 1);
            self.state.runtime_mut(id).paid = true;
        }

        let progress = self.state.progress(id);
        let to_finish = action.remaining_secs(progress);
        if secs + PROGRESS_EPSILON < to_finish {
            self.state.runtime_mut(id).progress = (progress + secs / duration).min(1.0);
            self.elapsed_secs += secs;
            return None;
        }

        let mut left = (secs - to_finish).max(0.0);
        let mut completions = 1u64;
        let mut starved = None;
        let final_progress;

        if action.auto_repeat {
            let full = ((left + PROGRESS_EPSILON) / duration).floor() as u64;
            // Each completion beyond the first, plus the cycle running at the end, pays up front
            let wanted = full.saturating_add(1);
            let paid = wanted.min(cycles_affordable(&self.state.resources, &action.costs));
            self.pay_cycles(&action.costs, paid);

            if paid == wanted {
                completions += full;
                left = (left - full as f64 * duration).max(0.0);
                final_progress = (left / duration).clamp(0.0, 1.0);
            } else {
                completions += paid;
                left = (left - paid as f64 * duration).max(0.0);
                final_progress = 0.0;
                starved = Some(left);
            }
        } else {
            final_progress = 0.0;
            self.state.current_action = None;
        }

        let cycle_secs = (to_finish + (completions - 1) as f64 * duration).max(0.0);
        self.elapsed_secs += cycle_secs;
        self.grant(&action.id, &action.rewards, completions);

        let stamp = self.origin_ms + secs_to_ms(self.elapsed_secs);
        let runtime = self.state.runtime_mut(id);
        runtime.completion_count += completions;
        runtime.progress = final_progress;
        runtime.paid = starved.is_none() && action.auto_repeat;
        runtime.last_start_ms = Some(stamp);
        if starved.is_none() && action.auto_repeat {
            self.elapsed_secs += left;
        }
        *self.report.completions.entry(id.to_string()).or_insert(0) += completions;
        starved
    }

    fn pay_cycles(&mut self, costs: &[Cost], cycles: u64) {
        if cycles == 0 {
            return;
        }
        let mut sink = Vec::new();
        let mut ledger = Self::ledger(self.state, &mut sink);
        for (id, amount) in summed(costs) {
            let _ = ledger.debit(&id, amount * cycles as f64);
        }
    }

    fn grant(&mut self, action_id: &str, rewards: &[Reward], completions: u64) {
        let n = completions as f64;
        let mut sink = Vec::new();
        let mut ledger = Self::ledger(self.state, &mut sink);
        for reward in rewards {
            match reward {
                Reward::Resource { resource, .. } => {
                    if ledger.get(resource).is_none() {
                        log::warn!("'{}' rewards unknown resource '{}'", action_id, resource);
                        continue;
                    }
                    let applied = ledger.credit(resource, reward.average() * n);
                    self.report.rewards.add_resource(resource, applied);
                }
                Reward::Capacity {
                    resource,
                    max_change,
                } => {
                    if ledger.get(resource).is_none() {
                        log::warn!("'{}' raises unknown resource '{}'", action_id, resource);
                        continue;
                    }
                    let applied = ledger.adjust_max(resource, max_change * n);
                    self.report.rewards.add_capacity(resource, applied);
                }
                Reward::Skill { skill, .. } => {
                    self.report.rewards.add_skill(skill, reward.average() * n);
                }
            }
        }
    }
}

/// How many whole cycles the current balances can pay for.
///
/// A cost on a locked or unknown resource blocks every cycle, even at zero,
/// the same as a live start.
fn cycles_affordable(resources: &BTreeMap<String, Resource>, costs: &[Cost]) -> u64 {
    summed(costs)
        .into_iter()
        .map(|(id, amount)| match resources.get(&id) {
            Some(r) if !r.unlocked => 0,
            Some(_) if amount <= 0.0 => u64::MAX,
            Some(r) => (r.current / amount).floor() as u64,
            None => 0,
        })
        .min()
        .unwrap_or(u64::MAX)
}

fn summed(costs: &[Cost]) -> BTreeMap<String, f64> {
    let mut totals = BTreeMap::new();
    for cost in costs {
        *totals.entry(cost.resource.clone()).or_insert(0.0) += sanitize(cost.amount).max(0.0);
    }
    totals
}

fn secs_to_ms(secs: f64) -> u64 {
    (secs * 1000.0).round().max(0.0) as u64
}

fn format_duration(ms: u64) -> String {
    let minutes = ms / 60_000;
    let (hours, minutes) = (minutes / 60, minutes % 60);
    if hours > 0 {
        format!("{}h {:02}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m", minutes)
    } else {
        format!("{}s", ms / 1000)
    }
}
