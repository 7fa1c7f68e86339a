//! Synthetic producers for the live demo.
//!
//! Two small models stand in for a radio network: an [`EnergySource`]
//! per node that drains a battery and reports the remaining joules, and
//! an [`OnOffSource`] that sends fixed-size packets in bursts and reports
//! each arrival at the receiving node. Both are self-rescheduling
//! handlers: each firing does its work and schedules the next one,
//! carrying the model state along.

use std::error::Error;
use std::fmt;
use std::time::Duration;

use cadence_core::{EventSeq, HandlerError, ScheduleError, SignalKind, SimTime, SubjectId};
use cadence_engine::{Scheduler, SimContext};

// ── ModelError ─────────────────────────────────────────────────────

/// Invalid model parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ModelError {
    /// On and off durations are both zero.
    ZeroPeriod,
    /// A rate, power, or energy is negative or not finite, or a data
    /// rate is zero.
    InvalidParameter {
        /// Which parameter.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroPeriod => write!(f, "on/off period must be non-zero"),
            Self::InvalidParameter { name, value } => {
                write!(f, "invalid {name}: {value}")
            }
        }
    }
}

impl Error for ModelError {}

fn check(name: &'static str, value: f64, allow_zero: bool) -> Result<f64, ModelError> {
    let ok = value.is_finite() && (value > 0.0 || (allow_zero && value == 0.0));
    if ok {
        Ok(value)
    } else {
        Err(ModelError::InvalidParameter { name, value })
    }
}

// ── OnOffPattern ───────────────────────────────────────────────────

/// Alternating active/idle windows starting at a fixed time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OnOffPattern {
    start: f64,
    on: f64,
    period: f64,
}

impl OnOffPattern {
    /// Active for `on`, idle for `off`, repeating from `start`.
    pub fn new(start: Duration, on: Duration, off: Duration) -> Result<Self, ModelError> {
        let period = (on + off).as_secs_f64();
        if period == 0.0 {
            return Err(ModelError::ZeroPeriod);
        }
        Ok(Self {
            start: start.as_secs_f64(),
            on: on.as_secs_f64(),
            period,
        })
    }

    /// Whether `t` falls inside an active window.
    pub fn is_on(&self, t: SimTime) -> bool {
        self.next_active(t) == t
    }

    /// `t` itself if it is inside an active window, otherwise the start
    /// of the next one.
    pub fn next_active(&self, t: SimTime) -> SimTime {
        let t = t.as_secs();
        if t < self.start {
            return SimTime::saturating(self.start);
        }
        let cycle_start = self.start + ((t - self.start) / self.period).floor() * self.period;
        if t - cycle_start < self.on {
            SimTime::saturating(t)
        } else {
            SimTime::saturating(cycle_start + self.period)
        }
    }
}

// ── EnergySource ───────────────────────────────────────────────────

/// A battery drained at a constant power, higher while its node is
/// transmitting.
///
/// Remaining energy is recomputed every `update_interval` and published
/// as an [`SignalKind::Energy`] signal whenever it changes. Once
/// depleted, the source stops updating.
#[derive(Clone, Debug)]
pub struct EnergySource {
    subject: SubjectId,
    remaining_j: f64,
    idle_power_w: f64,
    active_power_w: f64,
    activity: Option<OnOffPattern>,
    update_interval: Duration,
    last_update: SimTime,
    reported: Option<f64>,
}

impl EnergySource {
    /// Default battery capacity in joules.
    pub const INITIAL_ENERGY_J: f64 = 10.0;
    /// Radio supply voltage.
    pub const SUPPLY_VOLTAGE_V: f64 = 3.0;
    /// Idle radio current draw.
    pub const IDLE_CURRENT_A: f64 = 0.273;
    /// Transmitting radio current draw.
    pub const TX_CURRENT_A: f64 = 0.38;

    /// A full battery for `subject` with the default radio draw.
    pub fn new(subject: SubjectId) -> Self {
        Self {
            subject,
            remaining_j: Self::INITIAL_ENERGY_J,
            idle_power_w: Self::IDLE_CURRENT_A * Self::SUPPLY_VOLTAGE_V,
            active_power_w: Self::TX_CURRENT_A * Self::SUPPLY_VOLTAGE_V,
            activity: None,
            update_interval: Duration::from_secs(1),
            last_update: SimTime::ZERO,
            reported: None,
        }
    }

    /// Override the initial energy.
    pub fn with_energy(mut self, joules: f64) -> Result<Self, ModelError> {
        self.remaining_j = check("initial energy", joules, true)?;
        Ok(self)
    }

    /// Override idle and active power draw.
    pub fn with_power(mut self, idle_w: f64, active_w: f64) -> Result<Self, ModelError> {
        self.idle_power_w = check("idle power", idle_w, true)?;
        self.active_power_w = check("active power", active_w, true)?;
        Ok(self)
    }

    /// Draw active power during the windows of `pattern`.
    pub fn with_activity(mut self, pattern: OnOffPattern) -> Self {
        self.activity = Some(pattern);
        self
    }

    /// Override how often remaining energy is recomputed.
    pub fn with_update_interval(mut self, interval: Duration) -> Result<Self, ModelError> {
        check("update interval", interval.as_secs_f64(), false)?;
        self.update_interval = interval;
        Ok(self)
    }

    /// Schedule the first update at time zero.
    pub fn install(self, scheduler: &mut Scheduler) -> Result<EventSeq, ScheduleError> {
        scheduler.schedule(SimTime::ZERO, move |ctx| self.update(ctx))
    }

    fn power_at(&self, t: SimTime) -> f64 {
        match self.activity {
            Some(p) if p.is_on(t) => self.active_power_w,
            _ => self.idle_power_w,
        }
    }

    /// Charge the energy used since the last update, report a change,
    /// and schedule the next update unless depleted.
    fn update(mut self, ctx: &mut SimContext<'_>) -> Result<(), HandlerError> {
        let now = ctx.now();
        let elapsed = now.as_secs() - self.last_update.as_secs();
        let used = self.power_at(self.last_update) * elapsed;
        self.remaining_j = (self.remaining_j - used).max(0.0);
        self.last_update = now;

        if self.reported != Some(self.remaining_j) {
            ctx.emit(SignalKind::Energy, self.subject, self.remaining_j);
            self.reported = Some(self.remaining_j);
        }
        if self.remaining_j > 0.0 {
            let interval = self.update_interval;
            ctx.schedule_in(interval, move |ctx| self.update(ctx))?;
        }
        Ok(())
    }
}

// ── OnOffSource ────────────────────────────────────────────────────

/// Constant-bit-rate traffic during the active windows of a pattern.
///
/// Each packet is reported as a [`SignalKind::Packet`] signal on the
/// receiving node, `link_delay` after it was sent, with the packet size
/// in bytes as the value.
#[derive(Clone, Debug)]
pub struct OnOffSource {
    receiver: SubjectId,
    pattern: OnOffPattern,
    packet_size: u32,
    interval: Duration,
    link_delay: Duration,
}

impl OnOffSource {
    /// Default packet size in bytes.
    pub const PACKET_SIZE: u32 = 1024;
    /// Default data rate in bits per second.
    pub const DATA_RATE_BPS: f64 = 1_000_000.0;

    /// 1024-byte packets at 1 Mb/s to `receiver` during `pattern`.
    pub fn new(receiver: SubjectId, pattern: OnOffPattern) -> Self {
        let interval =
            Duration::from_secs_f64(Self::PACKET_SIZE as f64 * 8.0 / Self::DATA_RATE_BPS);
        Self {
            receiver,
            pattern,
            packet_size: Self::PACKET_SIZE,
            interval,
            link_delay: Duration::from_micros(200),
        }
    }

    /// Override packet size and data rate.
    pub fn with_rate(mut self, packet_size: u32, data_rate_bps: f64) -> Result<Self, ModelError> {
        check("packet size", packet_size as f64, false)?;
        let rate = check("data rate", data_rate_bps, false)?;
        let interval = packet_size as f64 * 8.0 / rate;
        self.interval = Duration::try_from_secs_f64(interval).map_err(|_| {
            ModelError::InvalidParameter {
                name: "data rate",
                value: data_rate_bps,
            }
        })?;
        if self.interval.is_zero() {
            return Err(ModelError::InvalidParameter {
                name: "data rate",
                value: data_rate_bps,
            });
        }
        self.packet_size = packet_size;
        Ok(self)
    }

    /// Override the send-to-receive delay.
    pub fn with_link_delay(mut self, delay: Duration) -> Self {
        self.link_delay = delay;
        self
    }

    /// Schedule the first send at the start of the first active window.
    pub fn install(self, scheduler: &mut Scheduler) -> Result<EventSeq, ScheduleError> {
        let first = self.pattern.next_active(scheduler.now());
        scheduler.schedule(first, move |ctx| self.send(ctx))
    }

    fn send(self, ctx: &mut SimContext<'_>) -> Result<(), HandlerError> {
        let receiver = self.receiver;
        let size = self.packet_size as f64;
        ctx.schedule_in(self.link_delay, move |ctx| {
            ctx.emit(SignalKind::Packet, receiver, size);
            Ok(())
        })?;

        let after = ctx
            .now()
            .checked_add(self.interval)
            .map_err(ScheduleError::from)?;
        let next = self.pattern.next_active(after);
        ctx.schedule(next, move |ctx| self.send(ctx))?;
        Ok(())
    }
}

// ── Demo wiring ────────────────────────────────────────────────────

/// The receiving node.
pub const SINK: SubjectId = SubjectId(0);
/// The transmitting node.
pub const SENDER: SubjectId = SubjectId(1);

/// Two nodes with 10 J batteries; node 1 sends 1024-byte packets at
/// 1 Mb/s to node 0, on for 2 s and off for 1 s starting at 1 s.
pub fn install_demo(scheduler: &mut Scheduler) -> Result<(), Box<dyn Error + Send + Sync>> {
    let traffic = OnOffPattern::new(
        Duration::from_secs(1),
        Duration::from_secs(2),
        Duration::from_secs(1),
    )?;
    EnergySource::new(SINK).install(scheduler)?;
    EnergySource::new(SENDER)
        .with_activity(traffic)
        .install(scheduler)?;
    OnOffSource::new(SINK, traffic).install(scheduler)?;
    Ok(())
}
