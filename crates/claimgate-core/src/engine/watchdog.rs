//! Watchdog: run-scoped silence timer.

use std::time::Duration;

use tokio::time::Instant;

/// Tracks the deadline for the next retry-or-fail decision.
///
/// Reset on progress (at least one newly completed response) or when a retry
/// pass starts. Sending claims alone does not reset it, so a fully silent
/// authority is detected after exactly one budget.
#[derive(Debug)]
pub struct Watchdog {
    budget: Duration,
    deadline: Instant,
}

impl Watchdog {
    pub fn new(budget: Duration) -> Self {
        Self {
            budget,
            deadline: Instant::now() + budget,
        }
    }

    pub fn reset(&mut self) {
        self.deadline = Instant::now() + self.budget;
    }

    /// Resolves once the silence budget is spent.
    pub async fn expired(&self) {
        tokio::time::sleep_until(self.deadline).await;
    }
}
