//! Summary of a completed scheduler run.
//!
//! [`RunReport`] is filled in by the dispatch loop as it goes and
//! returned from [`Scheduler::run`](crate::Scheduler::run).

use std::time::{Duration, Instant};

use cadence_core::SimTime;

/// Why a run ended.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StopReason {
    /// The stop time was reached.
    #[default]
    StopTime,
    /// `stop()` was requested by a handler or another thread.
    Requested,
}

/// Counters and timings for one call to `run()`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunReport {
    /// Handlers that ran to completion.
    pub dispatched: u64,
    /// Events discarded without running when the run drained.
    pub discarded: u64,
    /// Dispatches whose wall-clock deadline had already passed.
    pub missed_deadlines: u64,
    /// Largest observed lateness across missed deadlines.
    pub max_lateness: Duration,
    /// Virtual time when the run ended.
    pub final_time: SimTime,
    /// Wall instant that virtual time zero was mapped to. `None` until a
    /// run has started.
    pub wall_origin: Option<Instant>,
    /// Wall-clock time from the start of the run to the end of draining.
    pub wall_elapsed: Duration,
    /// Why the run ended.
    pub stop_reason: StopReason,
}

impl RunReport {
    /// Record a dispatch that fired `late` after its deadline.
    pub(crate) fn record_late(&mut self, late: Duration) {
        self.missed_deadlines += 1;
        self.max_lateness = self.max_lateness.max(late);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_report_is_zero() {
        let r = RunReport::default();
        assert_eq!(r.dispatched, 0);
        assert_eq!(r.discarded, 0);
        assert_eq!(r.missed_deadlines, 0);
        assert_eq!(r.max_lateness, Duration::ZERO);
        assert_eq!(r.final_time, SimTime::ZERO);
        assert_eq!(r.wall_origin, None);
        assert_eq!(r.stop_reason, StopReason::StopTime);
    }

    #[test]
    fn record_late_keeps_maximum() {
        let mut r = RunReport::default();
        r.record_late(Duration::from_millis(5));
        r.record_late(Duration::from_millis(40));
        r.record_late(Duration::from_millis(1));
        assert_eq!(r.missed_deadlines, 3);
        assert_eq!(r.max_lateness, Duration::from_millis(40));
    }
}
