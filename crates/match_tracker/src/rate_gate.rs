//! Process-wide request gate: at most one upstream lookup per period.

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};

pub struct RateGate {
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    period:  Duration,
}

impl RateGate {
    /// Burst of one, so consecutive admissions are spaced by `period`.
    pub fn new(period: Duration) -> Self {
        let quota = Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::MAX))
            .allow_burst(NonZeroU32::MIN);
        Self { limiter: RateLimiter::direct(quota), period }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }

    /// `false` when `deadline` passes before admission.
    pub async fn acquire_before(&self, deadline: Instant) -> bool {
        timeout_at(deadline, self.acquire()).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn admissions_are_spaced_by_period() {
        let period = Duration::from_millis(25);
        let gate = RateGate::new(period);
        let started = std::time::Instant::now();
        for _ in 0..5 {
            gate.acquire().await;
        }
        // governor keeps its own clock; allow for sub-millisecond skew
        let floor = period * 4 - Duration::from_millis(2);
        assert!(started.elapsed() >= floor, "elapsed {:?}", started.elapsed());
    }

    #[tokio::test]
    async fn expired_deadline_refuses_admission() {
        let gate = RateGate::new(Duration::from_secs(5));
        gate.acquire().await;
        let deadline = Instant::now() + Duration::from_millis(20);
        assert!(!gate.acquire_before(deadline).await);
    }
}
