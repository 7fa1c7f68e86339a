//! Mapping between virtual time and wall-clock instants.
//!
//! [`RealtimeClock`] is a pure transform: a fixed wall-clock origin
//! (captured when a run starts) and a rate in virtual seconds per wall
//! second. Keeping it separate from the event queue lets the scheduler
//! use an ordinary discrete-event queue and add real-time discipline on
//! top.

use std::time::{Duration, Instant};

use cadence_core::SimTime;

/// Offset used when a deadline does not fit in an `Instant`.
/// Roughly a century; far enough that nothing waits for it in practice.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 3600);

/// Fixed mapping between virtual time and wall-clock time.
///
/// For virtual time `t` the target wall instant is `origin + t / rate`.
/// The clock is never rewound; both fields are fixed at construction.
#[derive(Clone, Copy, Debug)]
pub struct RealtimeClock {
    origin: Instant,
    rate: f64,
}

impl RealtimeClock {
    /// Start a clock now. `rate` is virtual seconds per wall second
    /// (1.0 = real time) and must be finite and positive; the scheduler
    /// config validates it before a clock is ever built.
    pub fn start(rate: f64) -> Self {
        Self::with_origin(Instant::now(), rate)
    }

    /// Build a clock with an explicit origin.
    pub fn with_origin(origin: Instant, rate: f64) -> Self {
        debug_assert!(rate.is_finite() && rate > 0.0, "invalid clock rate {rate}");
        Self { origin, rate }
    }

    /// The wall instant that corresponds to virtual time zero.
    pub fn origin(&self) -> Instant {
        self.origin
    }

    /// Virtual seconds per wall second.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// The wall-clock instant at which an event at virtual time `t` is due.
    pub fn wall_deadline_for(&self, t: SimTime) -> Instant {
        let offset = Duration::try_from_secs_f64(t.as_secs() / self.rate).unwrap_or(FAR_FUTURE);
        self.origin
            .checked_add(offset)
            .or_else(|| self.origin.checked_add(FAR_FUTURE))
            .unwrap_or(self.origin)
    }

    /// The virtual time corresponding to the wall instant `at`.
    /// Instants before the origin map to zero.
    pub fn virtual_at(&self, at: Instant) -> SimTime {
        let elapsed = at.saturating_duration_since(self.origin);
        SimTime::saturating(elapsed.as_secs_f64() * self.rate)
    }

    /// The virtual time corresponding to the current wall-clock instant.
    ///
    /// Ahead of the event being dispatched when the scheduler has fallen
    /// behind; the dispatch loop logs it next to each missed deadline.
    pub fn now_virtual(&self) -> SimTime {
        self.virtual_at(Instant::now())
    }

    /// How far `now` is past the deadline for `t`, or `None` if the
    /// deadline has not passed yet.
    pub fn lateness(&self, t: SimTime, now: Instant) -> Option<Duration> {
        now.checked_duration_since(self.wall_deadline_for(t))
            .filter(|late| !late.is_zero())
    }
}
