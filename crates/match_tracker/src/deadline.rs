use std::time::Duration;
use tokio::time::Instant;

/// Soft wall-clock bound for one poll cycle.
#[derive(Debug, Clone, Copy)]
pub struct CycleDeadline {
    at: Instant,
}

impl CycleDeadline {
    pub fn starting_now(budget: Duration) -> Self {
        Self { at: Instant::now() + budget }
    }

    pub fn at(&self) -> Instant {
        self.at
    }

    pub fn expired(&self) -> bool {
        Instant::now() >= self.at
    }

    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }
}
