use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// Token bucket: `capacity` tokens, one refilled every `interval / capacity`.
pub struct RateLimiter {
    bucket: Mutex<Bucket>,
}

#[derive(Debug)]
struct Bucket {
    capacity: u32,
    tokens: u32,
    refill_every: Duration,
    last_refill: Instant,
}

impl Bucket {
    fn new(capacity: u32, interval: Duration, now: Instant) -> Self {
        let capacity = capacity.max(1);
        Self { capacity, tokens: capacity, refill_every: interval / capacity, last_refill: now }
    }

    /// Take a token, or report how long until the next one.
    fn try_take(&mut self, now: Instant) -> Result<(), Duration> {
        if self.refill_every.is_zero() {
            return Ok(());
        }
        let elapsed = now.saturating_duration_since(self.last_refill);
        let refills = (elapsed.as_nanos() / self.refill_every.as_nanos()).min(u32::MAX as u128) as u32;
        if refills > 0 {
            self.tokens = self.tokens.saturating_add(refills).min(self.capacity);
            self.last_refill += self.refill_every * refills;
        }
        if self.tokens == self.capacity {
            self.last_refill = now;
        }
        if self.tokens > 0 {
            self.tokens -= 1;
            Ok(())
        } else {
            Err(self.refill_every.saturating_sub(now.saturating_duration_since(self.last_refill)))
        }
    }
}

impl RateLimiter {
    pub fn new(capacity: u32, interval: Duration) -> Self {
        Self { bucket: Mutex::new(Bucket::new(capacity, interval, Instant::now())) }
    }

    /// Alpha Vantage free tier: 5 calls per minute.
    pub fn alpha_vantage() -> Self { Self::new(5, Duration::from_secs(60)) }

    /// FMP: at most one call every two seconds.
    pub fn fmp() -> Self { Self::new(1, Duration::from_secs(2)) }

    pub fn unlimited() -> Self { Self::new(1, Duration::ZERO) }

    pub async fn acquire(&self) {
        loop {
            let wait = match self.bucket.lock().await.try_take(Instant::now()) {
                Ok(()) => return,
                Err(wait) => wait,
            };
            tokio::time::sleep(wait.max(Duration::from_millis(1))).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_then_wait_for_refill() {
        let t0 = Instant::now();
        let mut b = Bucket::new(5, Duration::from_secs(60), t0);
        for _ in 0..5 { assert!(b.try_take(t0).is_ok()); }
        let wait = b.try_take(t0).unwrap_err();
        assert_eq!(wait, Duration::from_secs(12));

        let later = t0 + Duration::from_secs(12);
        assert!(b.try_take(later).is_ok());
        assert!(b.try_take(later).is_err());
    }

    #[test]
    fn refills_never_exceed_capacity() {
        let t0 = Instant::now();
        let mut b = Bucket::new(2, Duration::from_secs(2), t0);
        assert!(b.try_take(t0).is_ok());
        let much_later = t0 + Duration::from_secs(3600);
        assert!(b.try_take(much_later).is_ok());
        assert!(b.try_take(much_later).is_ok());
        assert!(b.try_take(much_later).is_err());
    }

    #[test]
    fn single_slot_spacing() {
        let t0 = Instant::now();
        let mut b = Bucket::new(1, Duration::from_secs(2), t0);
        assert!(b.try_take(t0).is_ok());
        let wait = b.try_take(t0 + Duration::from_millis(500)).unwrap_err();
        assert_eq!(wait, Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn unlimited_never_waits() {
        let rl = RateLimiter::unlimited();
        for _ in 0..100 { rl.acquire().await; }
    }
}
