//! Timer primitives for the grid: debounce, throttle and a hold flag.
//!
//! Nothing here spawns threads or timers. Callers feed in `Instant`s (the
//! `*_at` methods) from their event loop tick, which keeps the behaviour
//! deterministic in tests.

use std::time::{Duration, Instant};

/// Identifies one scheduled debounce. A newer trigger makes older tokens stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceToken(u64);

/// A debouncer that fires once after a period of inactivity.
///
/// Every trigger replaces the pending deadline, cancelling the previous one.
#[derive(Debug, Clone)]
pub struct Debouncer {
    /// The duration to wait after the last event before triggering
    delay: Duration,
    /// When the pending action becomes due
    deadline: Option<Instant>,
    generation: u64,
}

impl Debouncer {
    /// Create a new debouncer with the specified delay in milliseconds
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            deadline: None,
            generation: 0,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Register that an event occurred
    pub fn trigger(&mut self) -> DebounceToken {
        self.trigger_at(Instant::now())
    }

    pub fn trigger_at(&mut self, now: Instant) -> DebounceToken {
        self.generation += 1;
        self.deadline = Some(now + self.delay);
        DebounceToken(self.generation)
    }

    /// Whether `token` is still the pending invocation
    pub fn is_current(&self, token: DebounceToken) -> bool {
        self.deadline.is_some() && token.0 == self.generation
    }

    /// Check if enough time has passed to execute the debounced action.
    /// Returns true once per trigger burst.
    pub fn should_execute(&mut self) -> bool {
        self.should_execute_at(Instant::now())
    }

    pub fn should_execute_at(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Get the time remaining before the action will trigger
    pub fn time_remaining_at(&self, now: Instant) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// Cancel any pending action
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Check if there's a pending action
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }
}

/// A debounced value: the latest pushed value is delivered once the input
/// has been quiet for the delay.
#[derive(Debug, Clone)]
pub struct DebouncedValue<T> {
    debouncer: Debouncer,
    pending: Option<T>,
}

impl<T> DebouncedValue<T> {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            debouncer: Debouncer::new(delay_ms),
            pending: None,
        }
    }

    /// Replace the pending value and restart the delay
    pub fn push_at(&mut self, value: T, now: Instant) -> DebounceToken {
        self.pending = Some(value);
        self.debouncer.trigger_at(now)
    }

    /// Take the value if its delay has elapsed
    pub fn take_ready_at(&mut self, now: Instant) -> Option<T> {
        if self.debouncer.should_execute_at(now) {
            self.pending.take()
        } else {
            None
        }
    }

    pub fn pending(&self) -> Option<&T> {
        self.pending.as_ref()
    }

    pub fn pending_mut(&mut self) -> Option<&mut T> {
        self.pending.as_mut()
    }

    pub fn cancel(&mut self) {
        self.debouncer.cancel();
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

/// Rate limiter with a trailing call: the first event fires immediately,
/// events inside the interval are coalesced into one trailing fire.
#[derive(Debug, Clone)]
pub struct Throttle {
    interval: Duration,
    last_fired: Option<Instant>,
    trailing: bool,
}

impl Throttle {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval: Duration::from_millis(interval_ms),
            last_fired: None,
            trailing: false,
        }
    }

    /// Returns true when the event should be delivered now
    pub fn try_fire_at(&mut self, now: Instant) -> bool {
        let ready = self
            .last_fired
            .map_or(true, |last| now.duration_since(last) >= self.interval);
        if ready {
            self.last_fired = Some(now);
            self.trailing = false;
        } else {
            self.trailing = true;
        }
        ready
    }

    /// Deliver a coalesced trailing event once the interval has passed
    pub fn flush_at(&mut self, now: Instant) -> bool {
        if !self.trailing {
            return false;
        }
        let ready = self
            .last_fired
            .map_or(true, |last| now.duration_since(last) >= self.interval);
        if ready {
            self.trailing = false;
            self.last_fired = Some(now);
        }
        ready
    }

    pub fn has_trailing(&self) -> bool {
        self.trailing
    }

    pub fn cancel(&mut self) {
        self.trailing = false;
    }
}

/// A flag that stays raised for `hold` after the last `raise`
#[derive(Debug, Clone)]
pub struct HoldFlag {
    hold: Duration,
    until: Option<Instant>,
}

impl HoldFlag {
    pub fn new(hold_ms: u64) -> Self {
        Self {
            hold: Duration::from_millis(hold_ms),
            until: None,
        }
    }

    pub fn raise_at(&mut self, now: Instant) {
        self.until = Some(now + self.hold);
    }

    pub fn is_raised_at(&self, now: Instant) -> bool {
        self.until.is_some_and(|until| now < until)
    }

    pub fn clear(&mut self) {
        self.until = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_debouncer_fires_after_quiet_period() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(200);
        debouncer.trigger_at(start);
        assert!(!debouncer.should_execute_at(start + ms(100)));

        // New trigger restarts the delay
        debouncer.trigger_at(start + ms(150));
        assert!(!debouncer.should_execute_at(start + ms(250)));
        assert!(debouncer.should_execute_at(start + ms(350)));
        assert!(!debouncer.should_execute_at(start + ms(400)));
    }

    #[test]
    fn test_debounce_token_replaced() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(10);
        let first = debouncer.trigger_at(start);
        let second = debouncer.trigger_at(start);
        assert!(!debouncer.is_current(first));
        assert!(debouncer.is_current(second));
        debouncer.cancel();
        assert!(!debouncer.is_current(second));
        assert!(!debouncer.should_execute_at(start + ms(20)));
    }

    #[test]
    fn test_debounced_value_keeps_latest() {
        let start = Instant::now();
        let mut value = DebouncedValue::new(200);
        value.push_at(1, start);
        value.push_at(2, start + ms(50));
        assert_eq!(value.take_ready_at(start + ms(200)), None);
        assert_eq!(value.take_ready_at(start + ms(250)), Some(2));
        assert!(!value.is_pending());
    }

    #[test]
    fn test_throttle_leading_and_trailing() {
        let start = Instant::now();
        let mut throttle = Throttle::new(200);
        assert!(throttle.try_fire_at(start));
        assert!(!throttle.try_fire_at(start + ms(50)));
        assert!(!throttle.try_fire_at(start + ms(100)));
        assert!(throttle.has_trailing());
        assert!(!throttle.flush_at(start + ms(150)));
        assert!(throttle.flush_at(start + ms(200)));
        assert!(!throttle.flush_at(start + ms(500)));
    }

    #[test]
    fn test_hold_flag() {
        let start = Instant::now();
        let mut flag = HoldFlag::new(200);
        assert!(!flag.is_raised_at(start));
        flag.raise_at(start);
        assert!(flag.is_raised_at(start + ms(199)));
        assert!(!flag.is_raised_at(start + ms(200)));
    }
}
