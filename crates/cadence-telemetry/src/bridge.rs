//! Trace bus subscriber that forwards signals to the outbound channel.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::debug;

use cadence_core::{SignalKind, SubscriptionId, TraceSignal};
use cadence_engine::TraceBus;

use crate::channel::OutboundChannel;
use crate::error::WriteOutcome;
use crate::wire::encode_line;

/// Longest expected record, so the line buffer never reallocates.
const LINE_CAPACITY: usize = 96;

/// Delivery counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BridgeStats {
    /// Messages handed to the socket in full.
    pub sent: u64,
    /// Messages dropped for any reason.
    pub dropped: u64,
    /// Bytes handed to the socket.
    pub bytes_sent: u64,
}

/// What became of one signal handed to the bridge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// The whole line, this many bytes, went to the socket.
    Sent(usize),
    /// Nothing was sent, for the given reason. Counted, never retried.
    Dropped(WriteOutcome),
}

impl Delivery {
    /// Whether the line reached the socket.
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent(_))
    }
}

#[derive(Debug, Default)]
struct Counters {
    sent: AtomicU64,
    dropped: AtomicU64,
    bytes_sent: AtomicU64,
}

/// Serialises trace signals onto an [`OutboundChannel`], dropping any
/// that cannot be written immediately.
///
/// Cheap to clone; clones share the channel and the counters. Each bus
/// subscription created by [`attach`](Self::attach) owns its own line
/// buffer.
#[derive(Clone, Debug)]
pub struct TelemetryBridge {
    channel: Arc<OutboundChannel>,
    counters: Arc<Counters>,
}

impl TelemetryBridge {
    /// Bridge onto `channel`.
    pub fn new(channel: Arc<OutboundChannel>) -> Self {
        Self {
            channel,
            counters: Arc::new(Counters::default()),
        }
    }

    /// The channel this bridge writes to.
    pub fn channel(&self) -> &Arc<OutboundChannel> {
        &self.channel
    }

    /// Encode and send one signal. Never blocks, never retries, and never
    /// fails: a message that cannot be written right now is dropped and
    /// counted.
    pub fn on_signal(&self, signal: &TraceSignal) -> Delivery {
        let mut line = String::with_capacity(LINE_CAPACITY);
        self.forward(signal, &mut line)
    }

    /// A bus listener that forwards every signal it receives.
    pub fn listener(&self) -> impl FnMut(&TraceSignal) + Send + 'static {
        let bridge = self.clone();
        let mut line = String::with_capacity(LINE_CAPACITY);
        move |signal| {
            bridge.forward(signal, &mut line);
        }
    }

    /// Subscribe to every signal kind on `bus`.
    pub fn attach(&self, bus: &mut TraceBus) -> Vec<SubscriptionId> {
        SignalKind::ALL
            .into_iter()
            .map(|kind| bus.subscribe(kind, self.listener()))
            .collect()
    }

    /// Snapshot of the delivery counters.
    pub fn stats(&self) -> BridgeStats {
        BridgeStats {
            sent: self.counters.sent.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            bytes_sent: self.counters.bytes_sent.load(Ordering::Relaxed),
        }
    }

    fn forward(&self, signal: &TraceSignal, line: &mut String) -> Delivery {
        line.clear();
        encode_line(signal, line);
        match self.channel.try_write(line.as_bytes()) {
            Ok(n) => {
                self.counters.sent.fetch_add(1, Ordering::Relaxed);
                self.counters.bytes_sent.fetch_add(n as u64, Ordering::Relaxed);
                Delivery::Sent(n)
            }
            Err(reason) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                debug!(
                    kind = %signal.kind,
                    subject = %signal.subject,
                    time = %signal.time,
                    %reason,
                    "telemetry message dropped"
                );
                Delivery::Dropped(reason)
            }
        }
    }
}
