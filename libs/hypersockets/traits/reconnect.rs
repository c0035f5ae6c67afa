use std::time::Duration;

/// Trait for defining reconnection strategies
///
/// Strategies are stateless: the client owns the attempt counter (see
/// [`ReconnectSchedule`]) and asks the strategy for the delay that belongs to
/// a given attempt number.
pub trait ReconnectionStrategy: Send + Sync {
    /// Get the delay before the next reconnection attempt
    ///
    /// # Arguments
    /// * `attempt` - Consecutive failed attempts so far (0-indexed)
    ///
    /// # Returns
    /// * `Some(duration)` - Wait this long before reconnecting
    /// * `None` - Stop reconnecting
    fn next_delay(&self, attempt: usize) -> Option<Duration>;

    /// Check if we should continue reconnecting
    fn should_reconnect(&self, attempt: usize) -> bool;
}

/// Exponential backoff reconnection strategy
///
/// `delay(n) = min(initial_delay * 2^n, max_delay)`
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial_delay: Duration,
    max_delay: Duration,
    max_attempts: Option<usize>,
}

impl ExponentialBackoff {
    /// Create a new exponential backoff strategy
    ///
    /// # Arguments
    /// * `initial_delay` - The delay before the first reconnect
    /// * `max_delay` - Upper bound for any delay
    /// * `max_attempts` - Maximum number of attempts (None = unlimited)
    pub fn new(initial_delay: Duration, max_delay: Duration, max_attempts: Option<usize>) -> Self {
        Self {
            initial_delay,
            max_delay,
            max_attempts,
        }
    }

    /// Unlimited retries between `initial_delay` and `max_delay`
    pub fn unlimited(initial_delay: Duration, max_delay: Duration) -> Self {
        Self::new(initial_delay, max_delay, None)
    }
}

impl ReconnectionStrategy for ExponentialBackoff {
    fn next_delay(&self, attempt: usize) -> Option<Duration> {
        if !self.should_reconnect(attempt) {
            return None;
        }

        let exponent = u32::try_from(attempt).unwrap_or(u32::MAX);
        let delay = 2u32
            .checked_pow(exponent)
            .and_then(|factor| self.initial_delay.checked_mul(factor))
            .unwrap_or(self.max_delay);
        Some(delay.min(self.max_delay))
    }

    fn should_reconnect(&self, attempt: usize) -> bool {
        self.max_attempts.map_or(true, |max| attempt < max)
    }
}

/// Fixed delay reconnection strategy
#[derive(Debug, Clone)]
pub struct FixedDelay {
    delay: Duration,
    max_attempts: Option<usize>,
}

impl FixedDelay {
    pub fn new(delay: Duration, max_attempts: Option<usize>) -> Self {
        Self { delay, max_attempts }
    }
}

impl ReconnectionStrategy for FixedDelay {
    fn next_delay(&self, attempt: usize) -> Option<Duration> {
        if !self.should_reconnect(attempt) {
            return None;
        }
        Some(self.delay)
    }

    fn should_reconnect(&self, attempt: usize) -> bool {
        self.max_attempts.map_or(true, |max| attempt < max)
    }
}

/// Never reconnect strategy
#[derive(Debug, Clone)]
pub struct NeverReconnect;

impl ReconnectionStrategy for NeverReconnect {
    fn next_delay(&self, _attempt: usize) -> Option<Duration> {
        None
    }

    fn should_reconnect(&self, _attempt: usize) -> bool {
        false
    }
}

/// Attempt bookkeeping around a [`ReconnectionStrategy`].
///
/// `on_close` yields the delay for the current attempt count and then
/// increments it; `on_open` resets the count so the first retry after any
/// successful connection waits the base delay again.
pub struct ReconnectSchedule {
    strategy: Box<dyn ReconnectionStrategy>,
    attempts: usize,
}

impl ReconnectSchedule {
    pub fn new(strategy: Box<dyn ReconnectionStrategy>) -> Self {
        Self {
            strategy,
            attempts: 0,
        }
    }

    /// Consecutive closes since the last successful open
    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// Record a successful open
    pub fn on_open(&mut self) {
        self.attempts = 0;
    }

    /// Record a close and get the delay before the next attempt.
    ///
    /// `None` means the strategy gave up; the counter is left untouched.
    pub fn on_close(&mut self) -> Option<Duration> {
        let delay = self.strategy.next_delay(self.attempts)?;
        self.attempts += 1;
        Some(delay)
    }
}

impl std::fmt::Debug for ReconnectSchedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconnectSchedule")
            .field("attempts", &self.attempts)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_backoff() -> ExponentialBackoff {
        ExponentialBackoff::unlimited(Duration::from_secs(1), Duration::from_secs(30))
    }

    #[test]
    fn test_backoff_is_monotonic_and_capped() {
        let strategy = feed_backoff();
        let mut previous = Duration::ZERO;
        for attempt in 0..200 {
            let delay = strategy.next_delay(attempt).unwrap();
            assert!(delay >= previous, "attempt {attempt} went backwards");
            assert!(delay <= Duration::from_secs(30));
            previous = delay;
        }
        assert_eq!(previous, Duration::from_secs(30));
    }

    #[test]
    fn test_schedule_after_three_failures() {
        let mut schedule = ReconnectSchedule::new(Box::new(feed_backoff()));
        for _ in 0..3 {
            schedule.on_close();
        }
        assert_eq!(schedule.attempts(), 3);

        // base * 2^3
        assert_eq!(schedule.on_close(), Some(Duration::from_secs(8)));
        assert_eq!(schedule.attempts(), 4);

        schedule.on_open();
        assert_eq!(schedule.attempts(), 0);
    }

    #[test]
    fn test_schedule_reset_restarts_at_base_delay() {
        let mut schedule = ReconnectSchedule::new(Box::new(feed_backoff()));
        for _ in 0..10 {
            schedule.on_close();
        }
        assert_eq!(schedule.on_close(), Some(Duration::from_secs(30)));

        schedule.on_open();
        assert_eq!(schedule.on_close(), Some(Duration::from_secs(1)));
        assert_eq!(schedule.on_close(), Some(Duration::from_secs(2)));
    }

    #[test]
    fn test_schedule_exhausted_strategy() {
        let mut schedule = ReconnectSchedule::new(Box::new(FixedDelay::new(
            Duration::from_millis(10),
            Some(1),
        )));
        assert_eq!(schedule.on_close(), Some(Duration::from_millis(10)));
        assert_eq!(schedule.on_close(), None);
        assert_eq!(schedule.attempts(), 1);
    }
}
