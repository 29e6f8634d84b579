//! Resource ledger - the only place resource values change.
//!
//! The ledger is a borrowed view over the engine's resource table plus the
//! event buffer. Every operation keeps `0 <= current <= max` and refuses to
//! touch locked resources.

use std::collections::BTreeMap;

use crate::components::{sanitize, Cost, Resource};
use crate::events::GameEvent;

/// Outcome of a debit. `ok == false` means nothing was changed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Debit {
    pub ok: bool,
    pub applied: f64,
}

impl Debit {
    const REFUSED: Debit = Debit {
        ok: false,
        applied: 0.0,
    };
}

pub struct ResourceLedger<'a> {
    resources: &'a mut BTreeMap<String, Resource>,
    events: &'a mut Vec<GameEvent>,
}

impl<'a> ResourceLedger<'a> {
    pub fn new(
        resources: &'a mut BTreeMap<String, Resource>,
        events: &'a mut Vec<GameEvent>,
    ) -> Self {
        Self { resources, events }
    }

    pub fn get(&self, id: &str) -> Option<&Resource> {
        self.resources.get(id)
    }

    pub fn resources(&self) -> &BTreeMap<String, Resource> {
        self.resources
    }

    /// Add up to `amount`, clamped at `max`. Returns the delta actually applied.
    pub fn credit(&mut self, id: &str, amount: f64) -> f64 {
        let amount = sanitize(amount).max(0.0);
        let Some(resource) = self.resources.get_mut(id) else {
            log::warn!("credit to unknown resource '{}' ignored", id);
            return 0.0;
        };
        if !resource.unlocked {
            log::warn!("credit to locked resource '{}' ignored", id);
            return 0.0;
        }

        let old = resource.current;
        resource.current = (old + amount).min(resource.max).max(0.0);
        let applied = resource.current - old;
        let (new, max) = (resource.current, resource.max);
        self.record_change(id, old, new, max);
        applied
    }

    /// Remove exactly `amount`, or nothing at all if the balance is short.
    pub fn debit(&mut self, id: &str, amount: f64) -> Debit {
        let amount = sanitize(amount).max(0.0);
        let Some(resource) = self.resources.get_mut(id) else {
            log::warn!("debit from unknown resource '{}' refused", id);
            return Debit::REFUSED;
        };
        if !resource.unlocked || resource.current < amount {
            return Debit::REFUSED;
        }

        let old = resource.current;
        resource.current = (old - amount).max(0.0);
        let (new, max) = (resource.current, resource.max);
        self.record_change(id, old, new, max);
        Debit {
            ok: true,
            applied: old - new,
        }
    }

    /// Whether the whole cost list can be paid right now.
    ///
    /// Entries naming the same resource are summed. Unknown or locked
    /// resources make the list unaffordable.
    pub fn can_afford(&self, costs: &[Cost]) -> bool {
        can_afford(self.resources, costs)
    }

    /// Pay a cost list atomically: either every entry is debited or none is.
    pub fn pay(&mut self, costs: &[Cost]) -> bool {
        if !self.can_afford(costs) {
            return false;
        }
        for cost in costs {
            // can_afford already covered the summed totals
            let _ = self.debit(&cost.resource, cost.amount);
        }
        true
    }

    /// Move a resource's cap. `fill_current` tops the pool up to the new cap;
    /// otherwise `current` is only lowered if it would exceed it.
    pub fn set_max(&mut self, id: &str, new_max: f64, fill_current: bool) {
        let new_max = sanitize(new_max).max(0.0);
        let Some(resource) = self.resources.get_mut(id) else {
            log::warn!("set_max on unknown resource '{}' ignored", id);
            return;
        };
        if !resource.unlocked {
            log::warn!("set_max on locked resource '{}' ignored", id);
            return;
        }

        let old = resource.current;
        resource.max = new_max;
        resource.current = if fill_current {
            new_max
        } else {
            old.min(new_max)
        };
        let (new, max) = (resource.current, resource.max);
        self.record_change(id, old, new, max);
    }

    /// Relative form of [`set_max`](Self::set_max). Returns the cap change applied.
    pub fn adjust_max(&mut self, id: &str, delta: f64) -> f64 {
        let Some(resource) = self.resources.get(id) else {
            log::warn!("capacity change on unknown resource '{}' ignored", id);
            return 0.0;
        };
        if !resource.unlocked {
            log::warn!("capacity change on locked resource '{}' ignored", id);
            return 0.0;
        }
        let old_max = resource.max;
        self.set_max(id, old_max + sanitize(delta), false);
        self.resources.get(id).map(|r| r.max - old_max).unwrap_or(0.0)
    }

    /// Unlock a resource. Unlocking is one-way; returns false if already unlocked.
    pub fn unlock(&mut self, id: &str) -> bool {
        let Some(resource) = self.resources.get_mut(id) else {
            log::warn!("unlock of unknown resource '{}' ignored", id);
            return false;
        };
        if resource.unlocked {
            return false;
        }
        resource.unlocked = true;
        self.events.push(GameEvent::ResourceUnlocked {
            resource_id: id.to_string(),
        });
        true
    }

    /// Passive generation for `dt_secs` seconds.
    ///
    /// All source amounts are read before any credit lands, so a chain of
    /// generators advances from the same starting point regardless of order.
    pub fn generate(&mut self, dt_secs: f64) {
        let dt_secs = sanitize(dt_secs).max(0.0);
        if dt_secs == 0.0 {
            return;
        }

        let grants: Vec<(String, f64)> = self
            .resources
            .values()
            .filter(|r| r.unlocked)
            .filter_map(|r| {
                let target = r.generates.as_ref()?;
                if r.generation_rate < 0.0 {
                    log::warn!(
                        "negative generation rate on '{}' treated as zero",
                        r.id
                    );
                }
                let amount = r.effective_rate() * r.current * dt_secs;
                (amount > 0.0).then(|| (target.clone(), amount))
            })
            .collect();

        for (target, amount) in grants {
            if self.resources.get(&target).is_some_and(|r| r.unlocked) {
                self.credit(&target, amount);
            }
        }
    }

    /// True when every unlocked stat resource is at its cap.
    pub fn all_stats_full(&self) -> bool {
        all_stats_full(self.resources)
    }

    fn record_change(&mut self, id: &str, old: f64, new: f64, max: f64) {
        if old == new {
            return;
        }
        self.events.push(GameEvent::ResourceChanged {
            resource_id: id.to_string(),
            old,
            new,
        });
        if new >= max && old < max {
            self.events.push(GameEvent::ResourceFull {
                resource_id: id.to_string(),
            });
        }
        if new <= 0.0 && old > 0.0 {
            self.events.push(GameEvent::ResourceDepleted {
                resource_id: id.to_string(),
            });
        }
    }
}

/// Read-only affordability check shared with the offline replay.
pub fn can_afford(resources: &BTreeMap<String, Resource>, costs: &[Cost]) -> bool {
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for cost in costs {
        *totals.entry(cost.resource.as_str()).or_insert(0.0) += sanitize(cost.amount).max(0.0);
    }
    totals.into_iter().all(|(id, amount)| match resources.get(id) {
        Some(r) if r.unlocked => r.current >= amount,
        Some(_) => false,
        None => {
            log::warn!("cost references unknown resource '{}'", id);
            false
        }
    })
}

pub fn all_stats_full(resources: &BTreeMap<String, Resource>) -> bool {
    resources
        .values()
        .filter(|r| r.unlocked && r.is_stat())
        .all(Resource::is_full)
}
