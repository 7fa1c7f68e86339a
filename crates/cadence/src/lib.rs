//! Cadence: real-time discrete-event simulation with live telemetry.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Cadence sub-crates, plus the [`Simulation`] lifecycle that ties the
//! scheduler to a telemetry consumer.
//!
//! # Quick start
//!
//! ```rust
//! use cadence::prelude::*;
//!
//! let mut scheduler = Scheduler::new(SchedulerConfig::with_rate(1000.0)).unwrap();
//! scheduler
//!     .schedule(SimTime::new(1.0).unwrap(), |ctx| {
//!         ctx.emit(SignalKind::Energy, SubjectId(0), 9.5);
//!         Ok(())
//!     })
//!     .unwrap();
//! let report = scheduler.run(SimTime::new(2.0).unwrap()).unwrap();
//! assert_eq!(report.dispatched, 1);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `cadence-core` | Virtual time, IDs, trace signals, errors |
//! | [`engine`] | `cadence-engine` | Event queue, real-time clock, scheduler, trace bus |
//! | [`telemetry`] | `cadence-telemetry` | Wire codec, outbound channel, bridge, reconnector |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod models;
pub mod simulation;

pub use simulation::{SimConfig, SimError, SimReport, Simulation};

/// Core types and errors (`cadence-core`).
pub use cadence_core as types;

/// Scheduler, clock, event queue, and trace bus (`cadence-engine`).
///
/// [`engine::Scheduler`] is the entry point; handlers receive an
/// [`engine::SimContext`].
pub use cadence_engine as engine;

/// Live telemetry over TCP (`cadence-telemetry`).
pub use cadence_telemetry as telemetry;

/// Common imports for typical Cadence usage.
pub mod prelude {
    // Core types
    pub use cadence_core::{EventSeq, SignalKind, SimTime, SubjectId, TraceSignal};

    // Errors
    pub use cadence_core::{HandlerError, RunError, ScheduleError};

    // Engine
    pub use cadence_engine::{
        RunReport, Scheduler, SchedulerConfig, SchedulerHandle, SimContext, TraceBus,
    };

    // Telemetry
    pub use cadence_telemetry::{TelemetryBridge, TelemetryConfig};

    // Lifecycle
    pub use crate::simulation::{SimConfig, Simulation};
}
