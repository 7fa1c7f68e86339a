//! Real-time discrete-event scheduler and its dispatch loop.
//!
//! # Loop
//!
//! ```text
//! Other threads                 Dispatch thread (run)
//!     |                               |
//!     |--handle.schedule()----------->| drain injections into queue
//!     |   [inject: bounded(64)]       | stop requested? -> Draining
//!     |                               | peek head (or stop_time)
//!     |--handle.stop()--------------->| recv_deadline(wall deadline)
//!     |   [flag + Wake]               |   woken early -> re-examine head
//!     |                               | pop head, run handler
//!     |                               |   handler -> SimContext
//!     |                               |     schedule / emit / stop
//! ```
//!
//! The wall-clock wait is the only place the loop suspends. Handlers run
//! synchronously on the dispatch thread, so the queue and trace bus are
//! never shared and need no locks. The one lock is the gate around the
//! virtual clock, held only for the short check-and-send on the handle
//! side and the drain-and-advance on the loop side.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tracing::{debug, error, info, warn};

use cadence_core::{EventSeq, HandlerError, RunError, ScheduleError, SimTime};

use crate::bus::TraceBus;
use crate::clock::RealtimeClock;
use crate::config::{ConfigError, SchedulerConfig};
use crate::context::{enqueue, SimContext};
use crate::handle::{Injection, SchedulerHandle, SharedState};
use crate::metrics::{RunReport, StopReason};
use crate::queue::{Event, EventQueue};

/// A one-shot event handler.
///
/// Recurring behaviour is a handler that schedules its successor through
/// the [`SimContext`] it receives.
pub type Handler = Box<dyn FnOnce(&mut SimContext<'_>) -> Result<(), HandlerError> + Send>;

/// Lifecycle of a [`Scheduler`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulerState {
    /// Constructed; events may be scheduled; `run()` not yet called.
    Idle,
    /// Inside `run()`, dispatching events.
    Running,
    /// Stop time reached or stop requested; discarding what is left.
    Draining,
    /// The run has finished. Terminal.
    Stopped,
}

/// Outcome of a wall-clock wait.
#[derive(Debug, PartialEq, Eq)]
enum Wait {
    /// The deadline arrived.
    Reached,
    /// A message arrived first; the head of the queue may have changed.
    Interrupted,
}

/// Real-time discrete-event scheduler.
///
/// Owns the event queue and the trace bus. [`run`](Self::run) pops
/// events in `(time, seq)` order and fires each one no earlier than its
/// wall-clock deadline under a [`RealtimeClock`] started at the
/// beginning of the run.
pub struct Scheduler {
    queue: EventQueue<Handler>,
    bus: TraceBus,
    config: SchedulerConfig,
    state: SchedulerState,
    now: SimTime,
    shared: Arc<SharedState>,
    inject_tx: Sender<Injection>,
    inject_rx: Receiver<Injection>,
    report: RunReport,
}

impl Scheduler {
    /// Create an idle scheduler at virtual time zero.
    pub fn new(config: SchedulerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let (inject_tx, inject_rx) = crossbeam_channel::bounded(config.injection_capacity);
        Ok(Self {
            queue: EventQueue::new(),
            bus: TraceBus::new(),
            config,
            state: SchedulerState::Idle,
            now: SimTime::ZERO,
            shared: Arc::new(SharedState::new()),
            inject_tx,
            inject_rx,
            report: RunReport::default(),
        })
    }

    /// Schedule `handler` at absolute virtual time `time`.
    ///
    /// Fails with `InvalidTime` (and enqueues nothing) if `time` is
    /// before [`now`](Self::now), and with `Shutdown` after the run
    /// has finished.
    pub fn schedule<F>(&mut self, time: SimTime, handler: F) -> Result<EventSeq, ScheduleError>
    where
        F: FnOnce(&mut SimContext<'_>) -> Result<(), HandlerError> + Send + 'static,
    {
        if self.state == SchedulerState::Stopped {
            return Err(ScheduleError::Shutdown);
        }
        enqueue(&mut self.queue, self.now, time, Box::new(handler))
    }

    /// Schedule `handler` `delay` after the current virtual time.
    pub fn schedule_in<F>(&mut self, delay: Duration, handler: F) -> Result<EventSeq, ScheduleError>
    where
        F: FnOnce(&mut SimContext<'_>) -> Result<(), HandlerError> + Send + 'static,
    {
        let time = self.now.checked_add(delay)?;
        self.schedule(time, handler)
    }

    /// A handle for scheduling and stopping from other threads.
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle::new(self.inject_tx.clone(), Arc::clone(&self.shared))
    }

    /// Request a cooperative stop. Idempotent.
    pub fn stop(&self) {
        self.shared.request_stop();
    }

    /// Current virtual time.
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Number of queued events.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// The trace bus, for inspection.
    pub fn bus(&self) -> &TraceBus {
        &self.bus
    }

    /// The trace bus, for subscribing listeners before the run.
    pub fn bus_mut(&mut self) -> &mut TraceBus {
        &mut self.bus
    }

    /// The validated configuration.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Dispatch events until `stop_time` is reached or a stop is
    /// requested, pacing each one against the wall clock.
    ///
    /// Events due at exactly `stop_time` still fire. Events beyond it,
    /// and everything left after a stop request, are discarded without
    /// running. With nothing left to fire the loop waits (interruptibly)
    /// until `stop_time`'s wall deadline, so events injected from other
    /// threads can still arrive.
    ///
    /// A handler error aborts the run: remaining events are discarded,
    /// the scheduler stops, and the error is returned.
    pub fn run(&mut self, stop_time: SimTime) -> Result<RunReport, RunError> {
        if self.state != SchedulerState::Idle {
            return Err(RunError::NotIdle);
        }
        self.state = SchedulerState::Running;
        self.report = RunReport::default();

        let clock = RealtimeClock::start(self.config.rate);
        info!(
            %stop_time,
            rate = clock.rate(),
            pending = self.queue.len(),
            "scheduler running"
        );

        let outcome = self.dispatch_loop(&clock, stop_time);

        self.state = SchedulerState::Draining;
        {
            // Close the gate first so no handle can slip an event in
            // after the final drain.
            let shared = Arc::clone(&self.shared);
            let mut gate = shared.lock();
            gate.stopped = true;
            self.drain();
        }
        self.state = SchedulerState::Stopped;

        self.report.final_time = self.now;
        self.report.wall_origin = Some(clock.origin());
        self.report.wall_elapsed = clock.origin().elapsed();
        let report = std::mem::take(&mut self.report);
        info!(
            final_time = %report.final_time,
            dispatched = report.dispatched,
            discarded = report.discarded,
            missed_deadlines = report.missed_deadlines,
            max_lateness_us = report.max_lateness.as_micros() as u64,
            "scheduler stopped"
        );
        outcome.map(|()| report)
    }

    fn dispatch_loop(&mut self, clock: &RealtimeClock, stop_time: SimTime) -> Result<(), RunError> {
        loop {
            self.drain_injections();

            if self.shared.stop_requested() {
                debug!(now = %self.now, "stop requested");
                self.report.stop_reason = StopReason::Requested;
                return Ok(());
            }

            let target = self
                .queue
                .peek_min_time()
                .ok()
                .filter(|t| *t <= stop_time)
                .unwrap_or(stop_time);
            let due = clock.lateness(target, Instant::now()).is_some();
            if !due && self.wait_until(clock.wall_deadline_for(target)) == Wait::Interrupted {
                continue;
            }

            let Some(event) = self.commit_next(stop_time) else {
                self.report.stop_reason = StopReason::StopTime;
                return Ok(());
            };

            let late = clock.lateness(event.time, Instant::now());
            if let Some(late) = late.filter(|l| *l > self.config.late_tolerance) {
                self.report.record_late(late);
                warn!(
                    event_time = %event.time,
                    wall_time = %clock.now_virtual(),
                    late_us = late.as_micros() as u64,
                    "real-time deadline missed; firing immediately"
                );
            }

            self.dispatch(event)?;
        }
    }

    /// Pick the next event and move the clock to it.
    ///
    /// Runs under the gate: anything injected since the last drain is
    /// queued first, since it may now be the head. Returns `None`, with
    /// the clock at `stop_time`, when nothing is due by then.
    fn commit_next(&mut self, stop_time: SimTime) -> Option<Event<Handler>> {
        let shared = Arc::clone(&self.shared);
        let mut gate = shared.lock();
        self.drain_injections();

        let due = self.queue.peek_min_time().is_ok_and(|t| t <= stop_time);
        let event = if due { self.queue.pop_min().ok() } else { None };
        let t = event.as_ref().map_or(stop_time, |e| e.time);
        if t > self.now {
            self.now = t;
            gate.now = t;
        }
        event
    }

    /// Run one handler. The gate is not held.
    fn dispatch(&mut self, event: Event<Handler>) -> Result<(), RunError> {
        let mut ctx = SimContext::new(
            event.time,
            event.seq,
            &mut self.queue,
            &mut self.bus,
            &self.shared,
        );
        (event.payload)(&mut ctx).map_err(|source| {
            error!(
                event_time = %event.time,
                seq = %event.seq,
                error = %source,
                "handler failed; aborting run"
            );
            RunError::Handler {
                time: event.time,
                seq: event.seq,
                source,
            }
        })?;
        self.report.dispatched += 1;
        Ok(())
    }

    /// Block until `deadline`, or until another thread sends a message.
    fn wait_until(&mut self, deadline: Instant) -> Wait {
        match self.inject_rx.recv_deadline(deadline) {
            Ok(msg) => {
                self.accept(msg);
                Wait::Interrupted
            }
            Err(RecvTimeoutError::Timeout) => Wait::Reached,
            Err(RecvTimeoutError::Disconnected) => {
                // Unreachable while we hold `inject_tx`; sleep rather than spin.
                std::thread::sleep(deadline.saturating_duration_since(Instant::now()));
                Wait::Reached
            }
        }
    }

    fn drain_injections(&mut self) {
        while let Ok(msg) = self.inject_rx.try_recv() {
            self.accept(msg);
        }
    }

    fn accept(&mut self, msg: Injection) {
        if let Injection::Schedule { time, handler } = msg {
            self.queue.insert(time, handler);
        }
    }

    /// Discard everything still queued or in flight.
    fn drain(&mut self) {
        let mut discarded = self.queue.clear();
        while let Ok(msg) = self.inject_rx.try_recv() {
            if matches!(msg, Injection::Schedule { .. }) {
                discarded += 1;
            }
        }
        if discarded > 0 {
            debug!(discarded, "discarded events beyond the end of the run");
        }
        self.report.discarded += discarded as u64;
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("state", &self.state)
            .field("now", &self.now)
            .field("pending", &self.queue.len())
            .field("config", &self.config)
            .finish()
    }
}
