//! Live telemetry for Cadence simulations.
//!
//! A [`TelemetryBridge`] subscribes to the engine's trace bus and writes
//! one text line per signal to an [`OutboundChannel`], a single TCP
//! connection to an external consumer. Delivery is at-most-once: a
//! message that cannot be written immediately is dropped and counted,
//! never queued. A background [`Reconnector`] re-establishes the
//! connection after a failure without ever blocking the dispatch thread.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod bridge;
pub mod channel;
pub mod config;
pub mod error;
pub mod reconnect;
pub mod wire;

pub use bridge::{BridgeStats, Delivery, TelemetryBridge};
pub use channel::{ChannelState, OutboundChannel};
pub use config::{ConfigError, TelemetryConfig, DEFAULT_PORT};
pub use error::{TelemetryError, WireError, WriteOutcome};
pub use reconnect::Reconnector;
pub use wire::{decode_line, encode_line, LineDecoder};
