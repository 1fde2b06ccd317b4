use std::sync::Arc;
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};
use tokio::time::{timeout_at, Instant};

/// Caps how many target units run their upstream work at once.
#[derive(Clone)]
pub struct ConcurrencyLimiter {
    slots:    Arc<Semaphore>,
    capacity: usize,
}

/// Slot held for the lifetime of the value; released on drop.
pub struct SlotPermit {
    _permit: OwnedSemaphorePermit,
}

impl ConcurrencyLimiter {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { slots: Arc::new(Semaphore::new(capacity)), capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn in_use(&self) -> usize {
        self.capacity - self.slots.available_permits()
    }

    pub async fn acquire(&self) -> Result<SlotPermit, AcquireError> {
        let permit = Arc::clone(&self.slots).acquire_owned().await?;
        Ok(SlotPermit { _permit: permit })
    }

    /// `None` when the deadline passes first.
    pub async fn acquire_before(&self, deadline: Instant) -> Option<SlotPermit> {
        match timeout_at(deadline, self.acquire()).await {
            Ok(Ok(permit)) => Some(permit),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::task::JoinSet;

    #[tokio::test]
    async fn never_exceeds_capacity() {
        let limiter = ConcurrencyLimiter::new(3);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut set = JoinSet::new();
        for _ in 0..20 {
            let limiter = limiter.clone();
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            set.spawn(async move {
                let _slot = limiter.acquire().await.unwrap();
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                running.fetch_sub(1, Ordering::SeqCst);
            });
        }
        while set.join_next().await.is_some() {}

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(limiter.in_use(), 0);
    }

    #[tokio::test]
    async fn full_limiter_gives_up_at_deadline() {
        let limiter = ConcurrencyLimiter::new(1);
        let _held = limiter.acquire().await.unwrap();
        let deadline = Instant::now() + Duration::from_millis(20);
        assert!(limiter.acquire_before(deadline).await.is_none());
        assert_eq!(limiter.in_use(), 1);
    }
}
