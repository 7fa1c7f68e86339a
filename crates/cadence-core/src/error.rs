//! Error types for the Cadence scheduler.
//!
//! Organized by subsystem: virtual time construction, the event queue,
//! scheduling requests, handler failures, and the dispatch loop.
//! Telemetry I/O errors live in `cadence-telemetry`; they never cross
//! into the scheduler.

use std::error::Error;
use std::fmt;

use crate::id::EventSeq;
use crate::time::SimTime;

/// A value could not be turned into a [`SimTime`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TimeError {
    /// The value was below zero.
    Negative {
        /// The rejected value.
        value: f64,
    },
    /// The value was NaN or infinite.
    NotFinite {
        /// The rejected value.
        value: f64,
    },
}

impl fmt::Display for TimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Negative { value } => write!(f, "virtual time {value} is negative"),
            Self::NotFinite { value } => write!(f, "virtual time {value} is not finite"),
        }
    }
}

impl Error for TimeError {}

/// Errors from event queue access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueueError {
    /// `pop_min` or `peek_min_time` on a queue with no events.
    Empty,
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "event queue is empty"),
        }
    }
}

impl Error for QueueError {}

/// Errors from a request to schedule an event.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScheduleError {
    /// The requested time is before the scheduler's current time.
    /// Nothing was enqueued.
    InvalidTime {
        /// The time that was requested.
        requested: SimTime,
        /// The scheduler's virtual time when the request was checked.
        now: SimTime,
    },
    /// The requested time could not be represented.
    Time(TimeError),
    /// The cross-thread injection channel is full (back-pressure).
    ChannelFull,
    /// The scheduler has stopped and accepts no more events.
    Shutdown,
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTime { requested, now } => {
                write!(f, "cannot schedule at {requested}: current time is {now}")
            }
            Self::Time(e) => write!(f, "invalid time: {e}"),
            Self::ChannelFull => write!(f, "injection channel full"),
            Self::Shutdown => write!(f, "scheduler has shut down"),
        }
    }
}

impl Error for ScheduleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Time(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TimeError> for ScheduleError {
    fn from(e: TimeError) -> Self {
        Self::Time(e)
    }
}

/// Failure reported by an event handler.
///
/// Any handler error is fatal to the run: the dispatch loop has no safe
/// way to resume a handler that gave up halfway.
#[derive(Clone, Debug, PartialEq)]
pub enum HandlerError {
    /// The handler's own logic failed.
    Failed {
        /// Human-readable description of the failure.
        reason: String,
    },
    /// A follow-up schedule request made by the handler was rejected.
    Schedule(ScheduleError),
}

impl HandlerError {
    /// Shorthand for [`HandlerError::Failed`].
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { reason } => write!(f, "handler failed: {reason}"),
            Self::Schedule(e) => write!(f, "handler schedule request rejected: {e}"),
        }
    }
}

impl Error for HandlerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Schedule(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ScheduleError> for HandlerError {
    fn from(e: ScheduleError) -> Self {
        Self::Schedule(e)
    }
}

/// Errors returned by the scheduler's `run()` loop.
#[derive(Clone, Debug, PartialEq)]
pub enum RunError {
    /// `run()` was called on a scheduler that is not idle.
    NotIdle,
    /// A handler failed; the run was aborted and remaining events discarded.
    Handler {
        /// Virtual time of the failing event.
        time: SimTime,
        /// Sequence number of the failing event.
        seq: EventSeq,
        /// The handler's error.
        source: HandlerError,
    },
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotIdle => write!(f, "scheduler is not idle"),
            Self::Handler { time, seq, source } => {
                write!(f, "event {seq} at {time} aborted the run: {source}")
            }
        }
    }
}

impl Error for RunError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Handler { source, .. } => Some(source),
            _ => None,
        }
    }
}
