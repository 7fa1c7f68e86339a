//! Process-level wiring: scheduler, trace bus, telemetry bridge, and the
//! reconnect thread, run for a fixed virtual duration.

use std::error::Error;
use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use cadence_core::{RunError, SimTime};
use cadence_engine::{RunReport, Scheduler, SchedulerConfig, SchedulerHandle};
use cadence_telemetry::{
    BridgeStats, OutboundChannel, Reconnector, TelemetryBridge, TelemetryConfig,
};

// ── SimError ───────────────────────────────────────────────────────

/// Errors from setting up or running a [`Simulation`].
#[derive(Debug)]
pub enum SimError {
    /// Invalid scheduler configuration.
    Scheduler(cadence_engine::ConfigError),
    /// Invalid telemetry configuration.
    Telemetry(cadence_telemetry::ConfigError),
    /// The reconnect thread could not be started.
    Spawn(io::Error),
    /// The run aborted.
    Run(RunError),
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scheduler(e) => write!(f, "scheduler config: {e}"),
            Self::Telemetry(e) => write!(f, "telemetry config: {e}"),
            Self::Spawn(e) => write!(f, "failed to start reconnect thread: {e}"),
            Self::Run(e) => write!(f, "simulation run failed: {e}"),
        }
    }
}

impl Error for SimError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Scheduler(e) => Some(e),
            Self::Telemetry(e) => Some(e),
            Self::Spawn(e) => Some(e),
            Self::Run(e) => Some(e),
        }
    }
}

impl From<cadence_engine::ConfigError> for SimError {
    fn from(e: cadence_engine::ConfigError) -> Self {
        Self::Scheduler(e)
    }
}

impl From<cadence_telemetry::ConfigError> for SimError {
    fn from(e: cadence_telemetry::ConfigError) -> Self {
        Self::Telemetry(e)
    }
}

impl From<RunError> for SimError {
    fn from(e: RunError) -> Self {
        Self::Run(e)
    }
}

// ── SimConfig ──────────────────────────────────────────────────────

/// Everything needed to build a [`Simulation`].
#[derive(Clone, Debug)]
pub struct SimConfig {
    /// Virtual time to run for. Default: 20 s.
    pub duration: Duration,
    /// Pacing and injection settings.
    pub scheduler: SchedulerConfig,
    /// Telemetry consumer and reconnect settings.
    pub telemetry: TelemetryConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(20),
            scheduler: SchedulerConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

/// Outcome of [`Simulation::run`].
#[derive(Clone, Debug, PartialEq)]
pub struct SimReport {
    /// Scheduler counters and timings.
    pub run: RunReport,
    /// Telemetry delivery counters.
    pub telemetry: BridgeStats,
}

// ── Simulation ─────────────────────────────────────────────────────

/// A scheduler whose trace bus streams to a live telemetry consumer.
///
/// Build it, install producers through
/// [`scheduler_mut`](Self::scheduler_mut), then [`run`](Self::run). The
/// consumer is optional: if it is not listening the run proceeds and
/// every signal is dropped until it appears.
#[derive(Debug)]
pub struct Simulation {
    scheduler: Scheduler,
    channel: Arc<OutboundChannel>,
    bridge: TelemetryBridge,
    config: SimConfig,
}

impl Simulation {
    /// Validate `config` and wire the bridge onto the trace bus.
    /// No connection is attempted until [`run`](Self::run).
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        config.telemetry.validate()?;
        let mut scheduler = Scheduler::new(config.scheduler.clone())?;
        let channel = Arc::new(OutboundChannel::new(config.telemetry.addr));
        let bridge = TelemetryBridge::new(Arc::clone(&channel));
        bridge.attach(scheduler.bus_mut());
        Ok(Self {
            scheduler,
            channel,
            bridge,
            config,
        })
    }

    /// The scheduler, for installing producers and extra listeners.
    pub fn scheduler_mut(&mut self) -> &mut Scheduler {
        &mut self.scheduler
    }

    /// A handle for scheduling or stopping from other threads.
    pub fn handle(&self) -> SchedulerHandle {
        self.scheduler.handle()
    }

    /// The outbound telemetry channel.
    pub fn channel(&self) -> &Arc<OutboundChannel> {
        &self.channel
    }

    /// Telemetry counters so far.
    pub fn telemetry_stats(&self) -> BridgeStats {
        self.bridge.stats()
    }

    /// Connect to the consumer if it is listening, run for the configured
    /// duration, then close the connection and stop the reconnect thread.
    ///
    /// The connection is released even when the run fails.
    pub fn run(&mut self) -> Result<SimReport, SimError> {
        let telemetry = &self.config.telemetry;
        if let Err(e) = self.channel.connect_once(telemetry.connect_timeout) {
            warn!(error = %e, "telemetry consumer unavailable; will keep retrying");
        }
        let mut reconnector =
            Reconnector::spawn(Arc::clone(&self.channel), telemetry).map_err(SimError::Spawn)?;

        let stop_time = SimTime::from_duration(self.config.duration);
        let outcome = self.scheduler.run(stop_time);

        self.channel.close();
        reconnector.shutdown();

        let report = SimReport {
            run: outcome?,
            telemetry: self.bridge.stats(),
        };
        info!(
            dispatched = report.run.dispatched,
            missed_deadlines = report.run.missed_deadlines,
            sent = report.telemetry.sent,
            dropped = report.telemetry.dropped,
            "simulation finished"
        );
        Ok(report)
    }
}
