//! Cross-thread access to a running scheduler.
//!
//! The dispatch loop owns its queue exclusively. Other threads reach it
//! through a [`SchedulerHandle`], which sends events over a bounded
//! crossbeam channel and flips an atomic stop flag. The loop's wall-clock
//! wait is a `recv_deadline` on that same channel, so a message wakes it
//! immediately.
//!
//! The virtual clock sits behind a small mutex. A handle holds it across
//! the time check and the send, and the loop holds it across draining the
//! channel and advancing the clock, so an accepted event can never end up
//! behind the clock before it is queued.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crossbeam_channel::{Sender, TrySendError};

use cadence_core::{HandlerError, ScheduleError, SimTime};

use crate::context::SimContext;
use crate::scheduler::Handler;

/// A message from another thread to the dispatch loop.
pub(crate) enum Injection {
    /// Enqueue an event. Its time was checked against the clock under the
    /// gate, so the loop can queue it without re-checking.
    Schedule { time: SimTime, handler: Handler },
    /// Interrupt the wait so the loop re-reads the stop flag.
    Wake,
}

/// Clock state guarded by the gate.
#[derive(Debug)]
pub(crate) struct Gate {
    pub(crate) now: SimTime,
    pub(crate) stopped: bool,
}

/// State shared between the scheduler and its handles.
#[derive(Debug)]
pub(crate) struct SharedState {
    gate: Mutex<Gate>,
    stop_requested: AtomicBool,
}

impl SharedState {
    pub(crate) fn new() -> Self {
        Self {
            gate: Mutex::new(Gate {
                now: SimTime::ZERO,
                stopped: false,
            }),
            stop_requested: AtomicBool::new(false),
        }
    }

    /// Hold the gate. Never held while a handler runs.
    pub(crate) fn lock(&self) -> MutexGuard<'_, Gate> {
        // Gate is two plain fields; a panic cannot leave it half-written.
        self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn now(&self) -> SimTime {
        self.lock().now
    }

    pub(crate) fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
    }

    pub(crate) fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.lock().stopped
    }
}

/// Cloneable, thread-safe handle for scheduling events and requesting a
/// stop from outside the dispatch loop.
#[derive(Clone)]
pub struct SchedulerHandle {
    tx: Sender<Injection>,
    shared: Arc<SharedState>,
}

impl SchedulerHandle {
    pub(crate) fn new(tx: Sender<Injection>, shared: Arc<SharedState>) -> Self {
        Self { tx, shared }
    }

    /// Schedule `handler` to run at virtual time `time`.
    ///
    /// Non-blocking. Fails with `InvalidTime` if `time` is already behind
    /// the scheduler's clock, `ChannelFull` under back-pressure, and
    /// `Shutdown` once the scheduler has stopped. An `Ok` event fires in
    /// `(time, seq)` order unless the run ends first, in which case it is
    /// counted as discarded.
    pub fn schedule<F>(&self, time: SimTime, handler: F) -> Result<(), ScheduleError>
    where
        F: FnOnce(&mut SimContext<'_>) -> Result<(), HandlerError> + Send + 'static,
    {
        let gate = self.shared.lock();
        if gate.stopped {
            return Err(ScheduleError::Shutdown);
        }
        if time < gate.now {
            return Err(ScheduleError::InvalidTime {
                requested: time,
                now: gate.now,
            });
        }
        let sent = self.tx.try_send(Injection::Schedule {
            time,
            handler: Box::new(handler),
        });
        drop(gate);
        sent.map_err(|e| match e {
            TrySendError::Full(_) => ScheduleError::ChannelFull,
            TrySendError::Disconnected(_) => ScheduleError::Shutdown,
        })
    }

    /// Request a cooperative stop. Idempotent.
    ///
    /// Takes effect between dispatches: a running handler finishes, then
    /// nothing else fires in the current run.
    pub fn stop(&self) {
        self.shared.request_stop();
        // A full channel already has a message that will wake the loop.
        let _ = self.tx.try_send(Injection::Wake);
    }

    /// The scheduler's current virtual time, as last published by the loop.
    pub fn now(&self) -> SimTime {
        self.shared.now()
    }

    /// Whether the scheduler has finished its run.
    pub fn is_stopped(&self) -> bool {
        self.shared.is_stopped()
    }
}

impl std::fmt::Debug for SchedulerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let gate = self.shared.lock();
        f.debug_struct("SchedulerHandle")
            .field("now", &gate.now)
            .field("stopped", &gate.stopped)
            .finish()
    }
}
