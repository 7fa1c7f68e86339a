//! Background thread that restores a lost telemetry connection.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use tracing::debug;

use crate::channel::{ChannelState, OutboundChannel};
use crate::config::TelemetryConfig;

/// Polls an [`OutboundChannel`] and reconnects it whenever it is
/// `Disconnected`.
///
/// Runs until [`shutdown`](Self::shutdown), drop, or the channel being
/// closed. Shutdown wakes the thread immediately unless it is inside a
/// connect attempt, which is bounded by `connect_timeout`.
pub struct Reconnector {
    shutdown_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl Reconnector {
    /// Start the reconnect thread for `channel`.
    pub fn spawn(channel: Arc<OutboundChannel>, config: &TelemetryConfig) -> io::Result<Self> {
        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
        let interval = config.reconnect_interval;
        let timeout = config.connect_timeout;

        let thread = thread::Builder::new()
            .name("cadence-reconnect".into())
            .spawn(move || loop {
                match shutdown_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {}
                    // Explicit shutdown or the owner was dropped.
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
                if !poll_once(&channel, timeout) {
                    break;
                }
            })?;

        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
            thread: Some(thread),
        })
    }

    /// Stop the thread and wait for it to exit. Idempotent.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.try_send(());
        }
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }

    /// Whether the background thread is still running.
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Reconnector {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Reconnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconnector")
            .field("running", &self.is_running())
            .finish()
    }
}

/// One reconnect check. Returns `false` once the channel is closed.
fn poll_once(channel: &OutboundChannel, timeout: Duration) -> bool {
    match channel.state() {
        ChannelState::Closed => false,
        ChannelState::Disconnected => {
            debug!(addr = %channel.addr(), "attempting telemetry reconnect");
            // Failures are logged by connect_once; try again next tick.
            let _ = channel.connect_once(timeout);
            true
        }
        ChannelState::Connecting | ChannelState::Connected => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_test_utils::MockConsumer;
    use std::time::Instant;

    fn fast_config(addr: std::net::SocketAddr) -> TelemetryConfig {
        TelemetryConfig {
            reconnect_interval: Duration::from_millis(10),
            connect_timeout: Duration::from_millis(200),
            ..TelemetryConfig::with_addr(addr)
        }
    }

    #[test]
    fn connects_a_disconnected_channel() {
        let consumer = MockConsumer::bind().unwrap();
        let channel = Arc::new(OutboundChannel::new(consumer.addr()));
        let _r = Reconnector::spawn(Arc::clone(&channel), &fast_config(consumer.addr())).unwrap();

        assert!(consumer.wait_for_connections(1, Duration::from_secs(2)));
        let deadline = Instant::now() + Duration::from_secs(2);
        while channel.state() != ChannelState::Connected && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(channel.state(), ChannelState::Connected);
    }

    #[test]
    fn shutdown_is_prompt_and_idempotent() {
        let consumer = MockConsumer::bind().unwrap();
        let channel = Arc::new(OutboundChannel::new(consumer.addr()));
        let config = TelemetryConfig {
            reconnect_interval: Duration::from_secs(3600),
            ..TelemetryConfig::with_addr(consumer.addr())
        };
        let mut r = Reconnector::spawn(channel, &config).unwrap();
        assert!(r.is_running());

        let started = Instant::now();
        r.shutdown();
        r.shutdown();
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(!r.is_running());
    }

    #[test]
    fn exits_when_channel_closes() {
        let consumer = MockConsumer::bind().unwrap();
        let channel = Arc::new(OutboundChannel::new(consumer.addr()));
        let r = Reconnector::spawn(Arc::clone(&channel), &fast_config(consumer.addr())).unwrap();
        channel.close();

        let deadline = Instant::now() + Duration::from_secs(2);
        while r.is_running() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(!r.is_running());
    }
}
