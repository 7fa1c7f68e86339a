//! The single outbound TCP connection to the telemetry consumer.
//!
//! [`OutboundChannel`] is shared between the dispatch thread, which only
//! ever writes through [`try_write`](OutboundChannel::try_write), and the
//! reconnector thread, which calls
//! [`connect_once`](OutboundChannel::connect_once). The write path never
//! waits: it takes the lock with `try_lock` and the socket is
//! non-blocking. The connect path never holds the lock across the
//! blocking `connect`.

use std::io::{self, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::{Mutex, MutexGuard, PoisonError, TryLockError};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{TelemetryError, WriteOutcome};

/// Connection lifecycle.
///
/// `Disconnected -> Connecting -> Connected`, back to `Disconnected` on
/// a failed connect or write, and `Closed` from any state. `Closed` is
/// terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelState {
    /// No connection; the reconnector will try again.
    Disconnected,
    /// A connect attempt is in flight on another thread.
    Connecting,
    /// Writes go to the consumer.
    Connected,
    /// Shut down for good.
    Closed,
}

#[derive(Debug)]
struct Link {
    state: ChannelState,
    stream: Option<TcpStream>,
}

impl Link {
    /// Drop the socket and fall back to `Disconnected`, unless closed.
    fn tear_down(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        if self.state != ChannelState::Closed {
            self.state = ChannelState::Disconnected;
        }
    }
}

/// Best-effort connection to one consumer address.
#[derive(Debug)]
pub struct OutboundChannel {
    addr: SocketAddr,
    link: Mutex<Link>,
}

impl OutboundChannel {
    /// A disconnected channel for `addr`. Nothing is opened until
    /// [`connect_once`](Self::connect_once).
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            link: Mutex::new(Link {
                state: ChannelState::Disconnected,
                stream: None,
            }),
        }
    }

    /// The consumer address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ChannelState {
        self.lock().state
    }

    /// Make one connection attempt, bounded by `timeout`.
    ///
    /// Does nothing if already connected or if another thread is
    /// connecting. Fails with [`TelemetryError::Closed`] after
    /// [`close`](Self::close), and with [`TelemetryError::Connect`] when
    /// the consumer cannot be reached (the channel is left
    /// `Disconnected`).
    pub fn connect_once(&self, timeout: Duration) -> Result<(), TelemetryError> {
        {
            let mut link = self.lock();
            match link.state {
                ChannelState::Closed => return Err(TelemetryError::Closed),
                ChannelState::Connected | ChannelState::Connecting => return Ok(()),
                ChannelState::Disconnected => link.state = ChannelState::Connecting,
            }
        }

        // Lock released: the dispatch thread sees `Connecting` and drops.
        let attempt = TcpStream::connect_timeout(&self.addr, timeout)
            .map_err(|source| TelemetryError::Connect {
                addr: self.addr,
                source,
            })
            .and_then(|stream| {
                configure(&stream).map_err(TelemetryError::Io)?;
                Ok(stream)
            });

        let mut link = self.lock();
        match attempt {
            Ok(stream) if link.state == ChannelState::Connecting => {
                link.stream = Some(stream);
                link.state = ChannelState::Connected;
                info!(addr = %self.addr, "connected to telemetry consumer");
                Ok(())
            }
            Ok(stream) => {
                // Closed while we were connecting.
                let _ = stream.shutdown(Shutdown::Both);
                Err(TelemetryError::Closed)
            }
            Err(e) => {
                if link.state == ChannelState::Connecting {
                    link.state = ChannelState::Disconnected;
                }
                debug!(addr = %self.addr, error = %e, "telemetry connect attempt failed");
                Err(e)
            }
        }
    }

    /// Write `bytes` without blocking.
    ///
    /// Either the whole buffer is handed to the socket and its length is
    /// returned, or nothing is sent and the reason comes back as a
    /// [`WriteOutcome`]. A partial write or a socket error tears the
    /// connection down, since the stream may now hold a truncated line.
    pub fn try_write(&self, bytes: &[u8]) -> Result<usize, WriteOutcome> {
        let mut link = match self.link.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return Err(WriteOutcome::Contended),
            Err(TryLockError::Poisoned(p)) => p.into_inner(),
        };
        if link.state != ChannelState::Connected {
            return Err(WriteOutcome::NotConnected);
        }
        let Some(stream) = link.stream.as_mut() else {
            return Err(WriteOutcome::NotConnected);
        };

        match stream.write(bytes) {
            Ok(n) if n == bytes.len() => Ok(n),
            Ok(n) => {
                warn!(
                    addr = %self.addr,
                    written = n,
                    len = bytes.len(),
                    "partial telemetry write; dropping connection"
                );
                link.tear_down();
                Err(WriteOutcome::Failed)
            }
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) =>
            {
                Err(WriteOutcome::WouldBlock)
            }
            Err(e) => {
                warn!(addr = %self.addr, error = %e, "telemetry write failed; dropping connection");
                link.tear_down();
                Err(WriteOutcome::Failed)
            }
        }
    }

    /// Shut the connection down for good. Idempotent.
    pub fn close(&self) {
        let mut link = self.lock();
        if link.state == ChannelState::Closed {
            return;
        }
        let was_connected = link.state == ChannelState::Connected;
        link.state = ChannelState::Closed;
        link.tear_down();
        if was_connected {
            info!(addr = %self.addr, "telemetry connection closed");
        }
    }

    fn lock(&self) -> MutexGuard<'_, Link> {
        // Link holds no invariant a panicking writer could break.
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn configure(stream: &TcpStream) -> io::Result<()> {
    stream.set_nodelay(true)?;
    stream.set_nonblocking(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_test_utils::{free_local_addr, MockConsumer};
    use std::time::Instant;

    const TIMEOUT: Duration = Duration::from_secs(2);

    #[test]
    fn starts_disconnected_and_drops_writes() {
        let ch = OutboundChannel::new(free_local_addr());
        assert_eq!(ch.state(), ChannelState::Disconnected);
        assert_eq!(ch.try_write(b"x\n"), Err(WriteOutcome::NotConnected));
    }

    #[test]
    fn failed_connect_leaves_channel_disconnected() {
        let ch = OutboundChannel::new(free_local_addr());
        let err = ch.connect_once(Duration::from_millis(200)).unwrap_err();
        assert!(matches!(err, TelemetryError::Connect { .. }));
        assert_eq!(ch.state(), ChannelState::Disconnected);
    }

    #[test]
    fn connected_writes_reach_consumer() {
        let consumer = MockConsumer::bind().unwrap();
        let ch = OutboundChannel::new(consumer.addr());
        ch.connect_once(TIMEOUT).unwrap();
        assert_eq!(ch.state(), ChannelState::Connected);

        let line = b"PKT,0,1024.000000,1.000000\n";
        assert_eq!(ch.try_write(line), Ok(line.len()));
        assert_eq!(
            consumer.wait_for_lines(1, TIMEOUT),
            vec!["PKT,0,1024.000000,1.000000"]
        );
    }

    #[test]
    fn contended_lock_drops_instead_of_waiting() {
        let consumer = MockConsumer::bind().unwrap();
        let ch = OutboundChannel::new(consumer.addr());
        ch.connect_once(TIMEOUT).unwrap();

        let _held = ch.link.lock().unwrap();
        let started = Instant::now();
        assert_eq!(ch.try_write(b"x\n"), Err(WriteOutcome::Contended));
        assert!(started.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn peer_reset_tears_down_to_disconnected() {
        let consumer = MockConsumer::bind().unwrap();
        let ch = OutboundChannel::new(consumer.addr());
        ch.connect_once(TIMEOUT).unwrap();
        assert!(consumer.wait_for_connections(1, TIMEOUT));
        consumer.disconnect_current();

        // The first writes after the peer goes away may still be
        // accepted by the kernel; keep writing until the failure shows.
        let deadline = Instant::now() + TIMEOUT;
        while ch.state() == ChannelState::Connected && Instant::now() < deadline {
            let _ = ch.try_write(b"ENERGY,0,1.000000,0.000000\n");
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(ch.state(), ChannelState::Disconnected);
    }

    #[test]
    fn close_is_terminal() {
        let consumer = MockConsumer::bind().unwrap();
        let ch = OutboundChannel::new(consumer.addr());
        ch.connect_once(TIMEOUT).unwrap();
        ch.close();
        ch.close();
        assert_eq!(ch.state(), ChannelState::Closed);
        assert_eq!(ch.try_write(b"x\n"), Err(WriteOutcome::NotConnected));
        assert!(matches!(
            ch.connect_once(TIMEOUT),
            Err(TelemetryError::Closed)
        ));
    }
}
