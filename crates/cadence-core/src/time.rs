//! Virtual simulation time.

use std::cmp::Ordering;
use std::fmt;
use std::time::Duration;

use crate::error::TimeError;

/// A point on the virtual timeline, in seconds since the start of a run.
///
/// Always finite and non-negative, which makes the `f64::total_cmp`
/// ordering agree with numeric ordering and lets `SimTime` be `Ord`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SimTime(f64);

impl SimTime {
    /// The start of every run.
    pub const ZERO: SimTime = SimTime(0.0);

    /// Create a time from a number of virtual seconds.
    pub fn new(secs: f64) -> Result<Self, TimeError> {
        if !secs.is_finite() {
            return Err(TimeError::NotFinite { value: secs });
        }
        if secs < 0.0 {
            return Err(TimeError::Negative { value: secs });
        }
        // Normalise -0.0 so it displays and orders as zero.
        Ok(Self(secs + 0.0))
    }

    /// Create a time, clamping NaN and negative values to zero and
    /// infinity to the largest finite time.
    pub fn saturating(secs: f64) -> Self {
        if secs.is_nan() || secs <= 0.0 {
            Self::ZERO
        } else if secs.is_infinite() {
            Self(f64::MAX)
        } else {
            Self(secs)
        }
    }

    /// Create a time from a [`Duration`] since the start of the run.
    pub fn from_duration(d: Duration) -> Self {
        Self(d.as_secs_f64())
    }

    /// Virtual seconds since the start of the run.
    pub fn as_secs(self) -> f64 {
        self.0
    }

    /// `self + delay`, failing if the result is not a valid time.
    pub fn checked_add(self, delay: Duration) -> Result<Self, TimeError> {
        Self::new(self.0 + delay.as_secs_f64())
    }
}

impl PartialEq for SimTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SimTime {}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl TryFrom<f64> for SimTime {
    type Error = TimeError;

    fn try_from(secs: f64) -> Result<Self, Self::Error> {
        Self::new(secs)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}s", self.0)
    }
}
