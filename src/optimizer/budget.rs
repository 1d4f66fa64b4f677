//! Search budget and clocks
//!
//! The budget is checked after every candidate, so both limits fire with
//! candidate granularity. Time comes from a [`Clock`] handed in by the caller,
//! which lets tests drive time by hand.

use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Source of elapsed time since the search started
pub trait Clock {
    fn elapsed(&self) -> Duration;
}

/// Wall clock measured from construction
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Manually advanced clock; clones share the same time
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn set(&self, to: Duration) {
        self.now.set(to);
    }
}

impl Clock for ManualClock {
    fn elapsed(&self) -> Duration {
        self.now.get()
    }
}

/// Which limit ended the budgeted phase
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BudgetExhaustion {
    Evaluations { limit: usize },
    Time { budget_secs: f64, elapsed_secs: f64 },
}

/// Evaluation-count and wall-clock limits of one search
pub struct SearchBudget<'a> {
    max_evaluations: usize,
    time_budget: Option<Duration>,
    evaluations: usize,
    clock: &'a dyn Clock,
    exhausted: Option<BudgetExhaustion>,
}

impl<'a> SearchBudget<'a> {
    pub fn new(max_evaluations: usize, time_budget: Option<Duration>, clock: &'a dyn Clock) -> Self {
        Self {
            max_evaluations,
            time_budget,
            evaluations: 0,
            clock,
            exhausted: None,
        }
    }

    /// Count one candidate and report whether the budget is now spent.
    ///
    /// The count limit fires once `max_evaluations` candidates were issued.
    pub fn record_evaluation(&mut self) -> bool {
        self.evaluations += 1;
        if self.exhausted.is_some() {
            return true;
        }

        if self.evaluations >= self.max_evaluations {
            self.exhausted = Some(BudgetExhaustion::Evaluations {
                limit: self.max_evaluations,
            });
        } else if let Some(budget) = self.time_budget {
            let elapsed = self.clock.elapsed();
            if elapsed >= budget {
                self.exhausted = Some(BudgetExhaustion::Time {
                    budget_secs: budget.as_secs_f64(),
                    elapsed_secs: elapsed.as_secs_f64(),
                });
            }
        }
        self.exhausted.is_some()
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted.is_some()
    }

    pub fn exhaustion(&self) -> Option<BudgetExhaustion> {
        self.exhausted
    }

    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    pub fn elapsed(&self) -> Duration {
        self.clock.elapsed()
    }
}
