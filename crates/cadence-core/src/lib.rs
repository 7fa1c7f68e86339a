//! Core types for the Cadence real-time simulation scheduler.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by the engine and the telemetry bridge:
//! virtual time, identifiers, trace signals, and error types.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;
pub mod signal;
pub mod time;

pub use error::{HandlerError, QueueError, RunError, ScheduleError, TimeError};
pub use id::{EventSeq, SubjectId, SubscriptionId};
pub use signal::{SignalKind, TraceSignal, UnknownKind};
pub use time::SimTime;
