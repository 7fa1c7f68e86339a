//! Execution context handed to event handlers.

use std::time::Duration;

use cadence_core::{
    EventSeq, HandlerError, ScheduleError, SignalKind, SimTime, SubjectId, TraceSignal,
};

use crate::bus::TraceBus;
use crate::handle::SharedState;
use crate::queue::EventQueue;
use crate::scheduler::Handler;

/// What a handler can see and do while it runs.
///
/// Borrows the scheduler's queue and trace bus for the duration of one
/// dispatch. Everything here runs on the dispatch thread, so none of it
/// needs a lock.
pub struct SimContext<'a> {
    now: SimTime,
    seq: EventSeq,
    queue: &'a mut EventQueue<Handler>,
    bus: &'a mut TraceBus,
    shared: &'a SharedState,
}

impl<'a> SimContext<'a> {
    pub(crate) fn new(
        now: SimTime,
        seq: EventSeq,
        queue: &'a mut EventQueue<Handler>,
        bus: &'a mut TraceBus,
        shared: &'a SharedState,
    ) -> Self {
        Self {
            now,
            seq,
            queue,
            bus,
            shared,
        }
    }

    /// Virtual time of the event being dispatched.
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Sequence number of the event being dispatched.
    pub fn seq(&self) -> EventSeq {
        self.seq
    }

    /// Schedule a follow-up event at absolute virtual time `time`.
    ///
    /// `time` may equal [`now`](Self::now); such an event fires after
    /// every event already queued for this instant.
    pub fn schedule<F>(&mut self, time: SimTime, handler: F) -> Result<EventSeq, ScheduleError>
    where
        F: FnOnce(&mut SimContext<'_>) -> Result<(), HandlerError> + Send + 'static,
    {
        enqueue(self.queue, self.now, time, Box::new(handler))
    }

    /// Schedule a follow-up event `delay` after the current time.
    pub fn schedule_in<F>(&mut self, delay: Duration, handler: F) -> Result<EventSeq, ScheduleError>
    where
        F: FnOnce(&mut SimContext<'_>) -> Result<(), HandlerError> + Send + 'static,
    {
        let time = self.now.checked_add(delay)?;
        self.schedule(time, handler)
    }

    /// Publish a signal to the trace bus.
    ///
    /// The signal's `time` is overwritten with the dispatching event's
    /// time. Returns the number of listeners notified.
    pub fn publish(&mut self, mut signal: TraceSignal) -> usize {
        signal.time = self.now;
        self.bus.publish(&signal)
    }

    /// Build and publish a signal stamped with the current time.
    pub fn emit(&mut self, kind: SignalKind, subject: SubjectId, value: f64) -> usize {
        self.publish(TraceSignal::new(kind, subject, value, self.now))
    }

    /// Request that the run stop once this handler returns.
    pub fn stop(&mut self) {
        self.shared.request_stop();
    }

    /// Number of events still queued, excluding the one running.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

/// Insert `handler` unless `time` is behind `now`.
pub(crate) fn enqueue(
    queue: &mut EventQueue<Handler>,
    now: SimTime,
    time: SimTime,
    handler: Handler,
) -> Result<EventSeq, ScheduleError> {
    if time < now {
        return Err(ScheduleError::InvalidTime {
            requested: time,
            now,
        });
    }
    Ok(queue.insert(time, handler))
}
