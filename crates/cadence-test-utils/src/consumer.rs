//! Loopback stand-in for the live telemetry consumer.
//!
//! [`MockConsumer`] listens on an ephemeral `127.0.0.1` port, accepts
//! connections one after another (so reconnects can be exercised), and
//! collects every newline-terminated line it receives.

use std::io::{self, BufRead, BufReader};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const POLL: Duration = Duration::from_millis(5);

#[derive(Default)]
struct Inner {
    lines: Mutex<Vec<String>>,
    current: Mutex<Option<TcpStream>>,
    connections: AtomicUsize,
    shutdown: AtomicBool,
}

/// A TCP listener that records received lines.
pub struct MockConsumer {
    addr: SocketAddr,
    inner: Arc<Inner>,
    acceptor: Option<JoinHandle<()>>,
}

impl MockConsumer {
    /// Bind to an ephemeral loopback port and start accepting.
    pub fn bind() -> io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?;
        let inner = Arc::new(Inner::default());

        let acc_inner = Arc::clone(&inner);
        let acceptor = thread::Builder::new()
            .name("mock-consumer".into())
            .spawn(move || accept_loop(listener, acc_inner))?;

        Ok(Self {
            addr,
            inner,
            acceptor: Some(acceptor),
        })
    }

    /// Address to point the telemetry channel at.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Lines received so far, without their trailing newline.
    pub fn lines(&self) -> Vec<String> {
        self.inner.lines.lock().unwrap().clone()
    }

    /// Number of connections accepted so far.
    pub fn connections(&self) -> usize {
        self.inner.connections.load(Ordering::Acquire)
    }

    /// Wait until at least `n` lines have arrived or `timeout` elapses.
    /// Returns whatever has arrived.
    pub fn wait_for_lines(&self, n: usize, timeout: Duration) -> Vec<String> {
        let deadline = Instant::now() + timeout;
        loop {
            let lines = self.lines();
            if lines.len() >= n || Instant::now() >= deadline {
                return lines;
            }
            thread::sleep(POLL);
        }
    }

    /// Wait until at least `n` connections have been accepted.
    pub fn wait_for_connections(&self, n: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.connections() < n {
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(POLL);
        }
        true
    }

    /// Close the most recent connection from the consumer side.
    pub fn disconnect_current(&self) {
        if let Some(stream) = self.inner.current.lock().unwrap().take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }
}

impl Drop for MockConsumer {
    fn drop(&mut self) {
        self.inner.shutdown.store(true, Ordering::Release);
        self.disconnect_current();
        if let Some(h) = self.acceptor.take() {
            let _ = h.join();
        }
    }
}

fn accept_loop(listener: TcpListener, inner: Arc<Inner>) {
    while !inner.shutdown.load(Ordering::Acquire) {
        match listener.accept() {
            Ok((stream, _)) => {
                let _ = stream.set_nonblocking(false);
                if let Ok(clone) = stream.try_clone() {
                    *inner.current.lock().unwrap() = Some(clone);
                }
                inner.connections.fetch_add(1, Ordering::AcqRel);
                let reader_inner = Arc::clone(&inner);
                let _ = thread::Builder::new()
                    .name("mock-consumer-reader".into())
                    .spawn(move || read_lines(stream, reader_inner));
            }
            // WouldBlock: nobody waiting yet.
            Err(_) => thread::sleep(POLL),
        }
    }
}

fn read_lines(stream: TcpStream, inner: Arc<Inner>) {
    for line in BufReader::new(stream).lines() {
        match line {
            Ok(line) => inner.lines.lock().unwrap().push(line),
            Err(_) => break,
        }
    }
}

/// A loopback address that nothing is listening on.
///
/// Binds an ephemeral port and releases it immediately; connecting to
/// it is refused.
pub fn free_local_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    listener.local_addr().expect("local addr")
}
