//! Clocks and debounce timers.
//!
//! Nothing in this module sleeps or spawns. A [`DebounceTimer`] only records
//! deadlines against a [`Clock`]; the owner asks it whether the window has
//! elapsed whenever its own event loop gets a chance to run.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// A source of monotonic time.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> Instant;
}

/// The real monotonic clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
///
/// Useful for driving debounce windows deterministically.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    /// Create a manual clock starting at the current instant.
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

/// A trailing-edge debounce timer.
///
/// Every [`trigger`](Self::trigger) pushes the deadline out to `now + delay`.
/// When a `max_wait` is configured, the deadline never moves past
/// `first trigger + max_wait`, so a steady stream of triggers cannot starve
/// the owner.
pub struct DebounceTimer {
    clock: Arc<dyn Clock>,
    delay: Duration,
    max_wait: Option<Duration>,
    /// When the current window was opened.
    first_trigger: Option<Instant>,
    /// When the current window closes.
    deadline: Option<Instant>,
}

impl DebounceTimer {
    /// Create a debounce timer reading time from `clock`.
    pub fn new(clock: Arc<dyn Clock>, delay: Duration) -> Self {
        Self {
            clock,
            delay,
            max_wait: None,
            first_trigger: None,
            deadline: None,
        }
    }

    /// Cap how long a window may be extended by repeated triggers.
    pub fn with_max_wait(mut self, max_wait: Option<Duration>) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// The debounce delay.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// The clock this timer reads.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Open the window, or extend it if already open.
    pub fn trigger(&mut self) {
        let now = self.clock.now();
        let first = *self.first_trigger.get_or_insert(now);
        let mut deadline = now + self.delay;
        if let Some(max_wait) = self.max_wait {
            deadline = deadline.min(first + max_wait);
        }
        tracing::trace!(target: "horizon_grid_core::timer", delay = ?self.delay, "debounce triggered");
        self.deadline = Some(deadline);
    }

    /// Whether a window is open.
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Whether the open window has elapsed.
    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| self.clock.now() >= d)
    }

    /// Time left in the open window, or `None` when idle.
    pub fn time_until_fire(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(self.clock.now()))
    }

    /// Close the window without firing.
    pub fn cancel(&mut self) {
        self.first_trigger = None;
        self.deadline = None;
    }

    /// Close the window if it has elapsed.
    ///
    /// Returns `true` exactly once per elapsed window.
    pub fn fire_if_expired(&mut self) -> bool {
        if self.is_expired() {
            self.cancel();
            true
        } else {
            false
        }
    }
}

impl fmt::Debug for DebounceTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebounceTimer")
            .field("delay", &self.delay)
            .field("max_wait", &self.max_wait)
            .field("deadline", &self.deadline)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timer(delay_ms: u64) -> (Arc<ManualClock>, DebounceTimer) {
        let clock = Arc::new(ManualClock::new());
        let timer = DebounceTimer::new(clock.clone(), Duration::from_millis(delay_ms));
        (clock, timer)
    }

    #[test]
    fn test_idle_timer_never_fires() {
        let (clock, mut timer) = timer(10);
        clock.advance(Duration::from_secs(1));
        assert!(!timer.is_pending());
        assert!(!timer.fire_if_expired());
        assert_eq!(timer.time_until_fire(), None);
    }

    #[test]
    fn test_fires_once_after_delay() {
        let (clock, mut timer) = timer(10);
        timer.trigger();
        clock.advance(Duration::from_millis(9));
        assert!(!timer.fire_if_expired());
        clock.advance(Duration::from_millis(1));
        assert!(timer.fire_if_expired());
        assert!(!timer.fire_if_expired());
    }

    #[test]
    fn test_trigger_extends_window() {
        let (clock, mut timer) = timer(10);
        timer.trigger();
        clock.advance(Duration::from_millis(8));
        timer.trigger();
        clock.advance(Duration::from_millis(8));
        assert!(!timer.is_expired());
        assert_eq!(timer.time_until_fire(), Some(Duration::from_millis(2)));
        clock.advance(Duration::from_millis(2));
        assert!(timer.fire_if_expired());
    }

    #[test]
    fn test_max_wait_caps_extension() {
        let (clock, timer) = timer(10);
        let mut timer = timer.with_max_wait(Some(Duration::from_millis(15)));
        timer.trigger();
        clock.advance(Duration::from_millis(8));
        timer.trigger();
        clock.advance(Duration::from_millis(7));
        assert!(timer.fire_if_expired());
    }

    #[test]
    fn test_zero_delay_is_immediately_expired() {
        let (_clock, mut timer) = timer(0);
        timer.trigger();
        assert!(timer.fire_if_expired());
    }
}
