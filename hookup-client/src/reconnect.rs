//! Reconnection schedules
//!
//! When the connection drops without the user asking for it, the client
//! walks a schedule of delays: wait the first delay, try to reconnect, wait
//! the second delay if that failed, and so on. A finite schedule that runs
//! out ends automatic reconnection and leaves the client disconnected.
//!
//! # Schedule Shapes
//!
//! - **Delays**: an explicit list, e.g. `[1s, 1s, 5s]`
//! - **Range**: an inclusive range of whole seconds, `1..=5` waits 1s, 2s, 3s, 4s, 5s
//! - **Custom**: any [`ReconnectionStrategy`], including closures and the
//!   bundled [`ExponentialBackoff`], [`FixedDelay`] and [`NoReconnect`]
//!
//! An empty schedule (`ReconnectSchedule::never()`) exhausts immediately:
//! the client gives up on the first unexpected disconnect.
//!
//! # Walking a Schedule
//!
//! [`ReconnectSchedule`] is the immutable configuration; [`RetrySchedule`]
//! is one walk over it. The client resets the walk after every successful
//! reconnection, so two unrelated outages both start from the first delay.
//!
//! ```rust
//! use hookup_client::{ReconnectSchedule, ScheduleExhausted};
//! use std::time::Duration;
//!
//! let schedule = ReconnectSchedule::from(1..=3);
//! let mut walk = schedule.start();
//!
//! assert_eq!(walk.next_delay(), Ok(Duration::from_secs(1)));
//! assert_eq!(walk.next_delay(), Ok(Duration::from_secs(2)));
//! assert_eq!(walk.next_delay(), Ok(Duration::from_secs(3)));
//! assert_eq!(walk.next_delay(), Err(ScheduleExhausted { attempts: 3 }));
//!
//! walk.reset();
//! assert_eq!(walk.next_delay(), Ok(Duration::from_secs(1)));
//! ```

use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// The built-in reconnect schedule, used when none is configured
///
/// Fibonacci-spaced retries covering roughly two and a half minutes.
pub const RECONNECT_SCHEDULE: [Duration; 10] = [
    Duration::from_secs(1),
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(3),
    Duration::from_secs(5),
    Duration::from_secs(8),
    Duration::from_secs(13),
    Duration::from_secs(21),
    Duration::from_secs(34),
    Duration::from_secs(55),
];

/// Signal that a finite schedule has no delays left
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("reconnect schedule exhausted after {attempts} attempts")]
pub struct ScheduleExhausted {
    /// Number of delays handed out before running out
    pub attempts: u32,
}

/// Policy for computing reconnection delays
///
/// Implementations map a 0-indexed attempt number to the delay to wait
/// before that attempt, or `None` to give up. They hold no walk state;
/// [`RetrySchedule`] tracks the attempt counter.
///
/// Any `Fn(u32) -> Option<Duration>` closure is a strategy:
///
/// ```rust
/// use hookup_client::{ReconnectSchedule, ReconnectionStrategy};
/// use std::time::Duration;
///
/// let linear = |attempt: u32| (attempt < 3).then(|| Duration::from_millis(250 * (attempt as u64 + 1)));
/// assert_eq!(linear.next_delay(2), Some(Duration::from_millis(750)));
///
/// let schedule = ReconnectSchedule::custom(linear);
/// assert_eq!(schedule.start().count(), 3);
/// ```
pub trait ReconnectionStrategy: Send + Sync {
    /// Delay before attempt number `attempt`, or `None` to stop retrying
    fn next_delay(&self, attempt: u32) -> Option<Duration>;
}

impl<F> ReconnectionStrategy for F
where
    F: Fn(u32) -> Option<Duration> + Send + Sync,
{
    fn next_delay(&self, attempt: u32) -> Option<Duration> {
        self(attempt)
    }
}

/// Exponential backoff with optional jitter
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    min_delay: Duration,
    max_delay: Duration,
    max_attempts: Option<u32>,
    jitter: bool,
}

impl ExponentialBackoff {
    /// Create a backoff doubling from `min_delay` up to `max_delay`, unbounded attempts
    pub fn new(min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            min_delay,
            max_delay,
            max_attempts: None,
            jitter: false,
        }
    }

    /// Give up after `max_attempts` attempts
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Add up to 25% random jitter to each delay
    pub fn with_jitter(mut self) -> Self {
        self.jitter = true;
        self
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(100), Duration::from_secs(30))
            .with_max_attempts(10)
            .with_jitter()
    }
}

impl ReconnectionStrategy for ExponentialBackoff {
    fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if let Some(max) = self.max_attempts {
            if attempt >= max {
                return None;
            }
        }

        // min_delay * 2^attempt, saturating before the cap
        let min_ms = self.min_delay.as_millis() as u64;
        let max_ms = self.max_delay.as_millis() as u64;
        let base_ms = 2u64
            .checked_pow(attempt)
            .and_then(|factor| min_ms.checked_mul(factor))
            .unwrap_or(u64::MAX);
        let delay_ms = base_ms.min(max_ms);

        if self.jitter {
            use rand::Rng;
            let jitter_ms = rand::thread_rng().gen_range(0..=(delay_ms / 4));
            return Some(Duration::from_millis(delay_ms + jitter_ms));
        }

        Some(Duration::from_millis(delay_ms))
    }
}

/// Constant delay between attempts
#[derive(Debug, Clone)]
pub struct FixedDelay {
    delay: Duration,
    max_attempts: Option<u32>,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            max_attempts: None,
        }
    }

    /// Give up after `max_attempts` attempts
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }
}

impl ReconnectionStrategy for FixedDelay {
    fn next_delay(&self, attempt: u32) -> Option<Duration> {
        match self.max_attempts {
            Some(max) if attempt >= max => None,
            _ => Some(self.delay),
        }
    }
}

/// Strategy that never reconnects
#[derive(Debug, Clone, Copy)]
pub struct NoReconnect;

impl ReconnectionStrategy for NoReconnect {
    fn next_delay(&self, _attempt: u32) -> Option<Duration> {
        None
    }
}

/// Configured reconnect schedule
#[derive(Clone)]
pub enum ReconnectSchedule {
    /// Explicit, finite list of delays
    Delays(Vec<Duration>),
    /// Inclusive range of whole seconds, one step per attempt
    Range(RangeInclusive<u64>),
    /// Delays computed by a strategy, possibly unbounded
    Custom(Arc<dyn ReconnectionStrategy>),
}

impl ReconnectSchedule {
    /// Schedule from an explicit list of delays
    pub fn delays(delays: impl IntoIterator<Item = Duration>) -> Self {
        ReconnectSchedule::Delays(delays.into_iter().collect())
    }

    /// Schedule from a list of whole-second delays
    pub fn seconds(seconds: impl IntoIterator<Item = u64>) -> Self {
        Self::delays(seconds.into_iter().map(Duration::from_secs))
    }

    /// Schedule waiting `low`, `low + 1`, ..., `high` seconds
    pub fn range(low: u64, high: u64) -> Self {
        ReconnectSchedule::Range(low..=high)
    }

    /// Schedule driven by a custom strategy
    pub fn custom(strategy: impl ReconnectionStrategy + 'static) -> Self {
        ReconnectSchedule::Custom(Arc::new(strategy))
    }

    /// Empty schedule: never reconnect automatically
    pub fn never() -> Self {
        ReconnectSchedule::Delays(Vec::new())
    }

    /// Delay before attempt `attempt` (0-indexed), `None` past the end
    pub fn delay_at(&self, attempt: u32) -> Option<Duration> {
        match self {
            ReconnectSchedule::Delays(delays) => delays.get(attempt as usize).copied(),
            ReconnectSchedule::Range(range) => range
                .start()
                .checked_add(u64::from(attempt))
                .filter(|secs| secs <= range.end())
                .map(Duration::from_secs),
            ReconnectSchedule::Custom(strategy) => strategy.next_delay(attempt),
        }
    }

    /// Number of delays, or `None` when a custom strategy decides
    pub fn len(&self) -> Option<usize> {
        match self {
            ReconnectSchedule::Delays(delays) => Some(delays.len()),
            ReconnectSchedule::Range(range) => Some(
                range
                    .end()
                    .checked_sub(*range.start())
                    .map_or(0, |span| span.saturating_add(1) as usize),
            ),
            ReconnectSchedule::Custom(_) => None,
        }
    }

    /// Whether the schedule is known to hold no delays at all
    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    /// Begin a fresh walk over this schedule
    pub fn start(&self) -> RetrySchedule {
        RetrySchedule::new(self.clone())
    }
}

impl Default for ReconnectSchedule {
    fn default() -> Self {
        ReconnectSchedule::Delays(RECONNECT_SCHEDULE.to_vec())
    }
}

impl PartialEq for ReconnectSchedule {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ReconnectSchedule::Delays(a), ReconnectSchedule::Delays(b)) => a == b,
            (ReconnectSchedule::Range(a), ReconnectSchedule::Range(b)) => a == b,
            (ReconnectSchedule::Custom(a), ReconnectSchedule::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for ReconnectSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconnectSchedule::Delays(delays) => f.debug_tuple("Delays").field(delays).finish(),
            ReconnectSchedule::Range(range) => f.debug_tuple("Range").field(range).finish(),
            ReconnectSchedule::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl From<Vec<Duration>> for ReconnectSchedule {
    fn from(delays: Vec<Duration>) -> Self {
        ReconnectSchedule::Delays(delays)
    }
}

impl From<RangeInclusive<u64>> for ReconnectSchedule {
    fn from(range: RangeInclusive<u64>) -> Self {
        ReconnectSchedule::Range(range)
    }
}

impl From<ExponentialBackoff> for ReconnectSchedule {
    fn from(strategy: ExponentialBackoff) -> Self {
        ReconnectSchedule::custom(strategy)
    }
}

impl From<FixedDelay> for ReconnectSchedule {
    fn from(strategy: FixedDelay) -> Self {
        ReconnectSchedule::custom(strategy)
    }
}

impl From<NoReconnect> for ReconnectSchedule {
    fn from(_: NoReconnect) -> Self {
        ReconnectSchedule::never()
    }
}

/// One walk over a [`ReconnectSchedule`]
#[derive(Debug, Clone)]
pub struct RetrySchedule {
    schedule: ReconnectSchedule,
    attempt: u32,
}

impl RetrySchedule {
    pub fn new(schedule: ReconnectSchedule) -> Self {
        Self {
            schedule,
            attempt: 0,
        }
    }

    /// Next delay to wait, or `ScheduleExhausted` once the schedule ran out
    ///
    /// Exhaustion is sticky: later calls keep failing until [`reset`](Self::reset).
    pub fn next_delay(&mut self) -> Result<Duration, ScheduleExhausted> {
        match self.schedule.delay_at(self.attempt) {
            Some(delay) => {
                self.attempt += 1;
                Ok(delay)
            }
            None => Err(ScheduleExhausted {
                attempts: self.attempt,
            }),
        }
    }

    /// Number of delays handed out since the last reset
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Restart from the first delay
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

impl Iterator for RetrySchedule {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        self.next_delay().ok()
    }
}
