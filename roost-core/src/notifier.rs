//! "Recently updated" indicator with tick-based decay

use std::collections::BTreeMap;
use std::time::Duration;

/// Result of one tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tick {
    /// Checkouts whose indicator ran out on this tick
    pub cleared: Vec<String>,
    /// Whether another tick should be scheduled
    pub reschedule: bool,
}

/// Per-checkout countdown of remaining indicator cycles
///
/// The owner drives [`UpdateNotifier::tick`] on a fixed period and stops
/// scheduling ticks once one reports `reschedule == false`.
#[derive(Debug, Clone)]
pub struct UpdateNotifier {
    active: BTreeMap<String, u32>,
    period: Duration,
}

impl Default for UpdateNotifier {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

impl UpdateNotifier {
    pub fn new(period: Duration) -> Self {
        Self {
            active: BTreeMap::new(),
            period,
        }
    }

    /// Tick period
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Mark `checkout` as updated for `cycles` ticks
    ///
    /// Returns true when the active set was empty before, i.e. the tick loop
    /// needs to be started. A trigger with zero cycles clears the checkout.
    pub fn trigger(&mut self, checkout: &str, cycles: u32) -> bool {
        let was_idle = self.active.is_empty();
        if cycles == 0 {
            self.active.remove(checkout);
            return false;
        }
        self.active.insert(checkout.to_string(), cycles);
        was_idle
    }

    /// Decrement every active counter, dropping those that reach zero
    pub fn tick(&mut self) -> Tick {
        let mut cleared = Vec::new();
        self.active.retain(|name, remaining| {
            *remaining = remaining.saturating_sub(1);
            if *remaining == 0 {
                cleared.push(name.clone());
                false
            } else {
                true
            }
        });

        Tick {
            cleared,
            reschedule: !self.active.is_empty(),
        }
    }

    pub fn is_active(&self, checkout: &str) -> bool {
        self.active.contains_key(checkout)
    }

    /// Remaining cycles, zero when inactive
    pub fn remaining(&self, checkout: &str) -> u32 {
        self.active.get(checkout).copied().unwrap_or(0)
    }

    pub fn is_idle(&self) -> bool {
        self.active.is_empty()
    }

    /// Forget a checkout, e.g. after it was removed
    pub fn forget(&mut self, checkout: &str) {
        self.active.remove(checkout);
    }
}
