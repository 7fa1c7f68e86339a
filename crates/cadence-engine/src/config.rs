//! Scheduler configuration, validation, and error types.

use std::error::Error;
use std::fmt;
use std::time::Duration;

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`SchedulerConfig::validate()`].
#[derive(Debug, PartialEq)]
pub enum ConfigError {
    /// `rate` is NaN, infinite, zero, or negative, or its reciprocal
    /// is not finite.
    InvalidRate {
        /// The invalid value.
        value: f64,
    },
    /// The injection channel capacity is zero.
    InjectionCapacityZero,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRate { value } => {
                write!(f, "rate must be finite and positive, got {value}")
            }
            Self::InjectionCapacityZero => {
                write!(f, "injection_capacity must be at least 1")
            }
        }
    }
}

impl Error for ConfigError {}

// ── SchedulerConfig ───────────────────────────────────────────────

/// Configuration for a [`Scheduler`](crate::Scheduler).
#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    /// Virtual seconds per wall-clock second. 1.0 is real time; larger
    /// values run faster than real time. Default: 1.0.
    pub rate: f64,
    /// Capacity of the bounded channel that carries events scheduled
    /// from other threads. Default: 64.
    pub injection_capacity: usize,
    /// Scheduling jitter allowance. A dispatch that starts no more than
    /// this long after its wall-clock deadline counts as on time; later
    /// ones are counted as missed deadlines and logged at `warn`.
    /// Default: 1 ms.
    pub late_tolerance: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            rate: 1.0,
            injection_capacity: 64,
            late_tolerance: Duration::from_millis(1),
        }
    }
}

impl SchedulerConfig {
    /// Configuration with the given rate and defaults otherwise.
    pub fn with_rate(rate: f64) -> Self {
        Self {
            rate,
            ..Self::default()
        }
    }

    /// Validate all invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // The reciprocal check rejects subnormal rates, where t / rate
        // overflows to infinity.
        if !self.rate.is_finite() || self.rate <= 0.0 || !(1.0 / self.rate).is_finite() {
            return Err(ConfigError::InvalidRate { value: self.rate });
        }
        if self.injection_capacity == 0 {
            return Err(ConfigError::InjectionCapacityZero);
        }
        Ok(())
    }
}
