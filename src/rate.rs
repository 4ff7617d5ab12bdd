use log::info;
use rand::Rng;
use std::time::{Duration, Instant};

const MIN_COOLDOWN_SECS: f64 = 2.0;

/// Daily application budget plus human-like pacing between actions.
///
/// The counter is seeded from the persistence layer at the start of a run
/// and incremented only on a confirmed submission, never speculatively.
pub struct RateLimiter {
    daily_limit: u32,
    used_today: u32,
    search_delay_secs: (f64, f64),
    apply_delay_secs: (f64, f64),
    min_cooldown: Duration,
    last_action: Option<Instant>,
}

impl RateLimiter {
    pub fn new(
        daily_limit: u32,
        used_today: u32,
        search_delay_secs: (f64, f64),
        apply_delay_secs: (f64, f64),
    ) -> Self {
        RateLimiter {
            daily_limit,
            used_today,
            search_delay_secs,
            apply_delay_secs,
            min_cooldown: Duration::from_secs_f64(MIN_COOLDOWN_SECS),
            last_action: None,
        }
    }

    /// No cooldown or jitter; for tests.
    #[cfg(test)]
    pub fn immediate(daily_limit: u32, used_today: u32) -> Self {
        RateLimiter {
            daily_limit,
            used_today,
            search_delay_secs: (0.0, 0.0),
            apply_delay_secs: (0.0, 0.0),
            min_cooldown: Duration::ZERO,
            last_action: None,
        }
    }

    pub fn limit_reached(&self) -> bool {
        self.used_today >= self.daily_limit
    }

    pub fn remaining(&self) -> u32 {
        self.daily_limit.saturating_sub(self.used_today)
    }

    /// Called exactly once per confirmed `Submitted` transition.
    pub fn record_submission(&mut self) {
        self.used_today += 1;
        info!(
            "Applications today: {}/{}",
            self.used_today, self.daily_limit
        );
    }

    /// Pause before moving to the next record.
    pub async fn between_jobs(&mut self) {
        self.pause(self.search_delay_secs).await;
    }

    /// Pause before opening an application session.
    pub async fn before_apply(&mut self) {
        self.pause(self.apply_delay_secs).await;
    }

    async fn pause(&mut self, range: (f64, f64)) {
        if let Some(last) = self.last_action {
            let elapsed = last.elapsed();
            if elapsed < self.min_cooldown {
                tokio::time::sleep(self.min_cooldown - elapsed).await;
            }
        }
        let delay = jitter(range);
        if delay > 0.0 {
            tokio::time::sleep(Duration::from_secs_f64(delay)).await;
        }
        self.last_action = Some(Instant::now());
    }
}

fn jitter(range: (f64, f64)) -> f64 {
    let (min, max) = range;
    if max <= min {
        return min.max(0.0);
    }
    rand::thread_rng().gen_range(min..max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_accounting() {
        let mut limiter = RateLimiter::immediate(3, 1);
        assert!(!limiter.limit_reached());
        assert_eq!(limiter.remaining(), 2);

        limiter.record_submission();
        limiter.record_submission();
        assert!(limiter.limit_reached());
        assert_eq!(limiter.remaining(), 0);
    }

    #[test]
    fn test_seeded_at_limit() {
        let limiter = RateLimiter::immediate(5, 5);
        assert!(limiter.limit_reached());
    }

    #[test]
    fn test_jitter_within_range() {
        for _ in 0..100 {
            let d = jitter((5.0, 15.0));
            assert!((5.0..15.0).contains(&d));
        }
        assert_eq!(jitter((0.0, 0.0)), 0.0);
        // Degenerate range falls back to the minimum.
        assert_eq!(jitter((3.0, 3.0)), 3.0);
    }

    #[tokio::test]
    async fn test_cooldown_enforced_between_actions() {
        let mut limiter = RateLimiter::immediate(5, 0);
        limiter.min_cooldown = Duration::from_millis(50);

        // First pause records the action; the second must wait out the
        // cooldown even with zero jitter. The threshold sits just under the
        // cooldown to absorb timer granularity.
        limiter.between_jobs().await;
        let start = Instant::now();
        limiter.between_jobs().await;

        assert!(
            start.elapsed() >= Duration::from_millis(45),
            "cooldown not enforced: {:?}",
            start.elapsed()
        );
    }

    #[tokio::test]
    async fn test_immediate_pause_does_not_block() {
        let mut limiter = RateLimiter::immediate(1, 0);
        limiter.between_jobs().await;
        limiter.before_apply().await;
    }
}
