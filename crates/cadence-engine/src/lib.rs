//! Real-time discrete-event scheduler.
//!
//! Provides the [`Scheduler`] that orders timestamped events in an
//! [`EventQueue`] and fires them against a wall-clock-paced
//! [`RealtimeClock`], plus the synchronous [`TraceBus`] through which
//! handlers report state changes to observers.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod bus;
pub mod clock;
pub mod config;
pub mod context;
pub mod handle;
pub mod metrics;
pub mod queue;
pub mod scheduler;

pub use bus::{Listener, TraceBus};
pub use clock::RealtimeClock;
pub use config::{ConfigError, SchedulerConfig};
pub use context::SimContext;
pub use handle::SchedulerHandle;
pub use metrics::{RunReport, StopReason};
pub use queue::{Event, EventKey, EventQueue};
pub use scheduler::{Handler, Scheduler, SchedulerState};
