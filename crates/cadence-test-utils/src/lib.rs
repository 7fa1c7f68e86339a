//! Test utilities for Cadence development.
//!
//! Provides a thread-safe [`Recorder`] for capturing dispatch order and
//! observed signals, and a loopback [`MockConsumer`] that plays the part
//! of the live telemetry consumer.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod consumer;

pub use consumer::{free_local_addr, MockConsumer};

use std::sync::{Arc, Mutex};

use cadence_core::TraceSignal;

/// Shared, append-only log for assertions across threads and closures.
///
/// Cloning shares the underlying buffer.
#[derive(Debug)]
pub struct Recorder<T> {
    items: Arc<Mutex<Vec<T>>>,
}

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
        }
    }
}

impl<T> Default for Recorder<T> {
    fn default() -> Self {
        Self {
            items: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<T: Clone> Recorder<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, item: T) {
        self.items.lock().unwrap().push(item);
    }

    /// Copy of everything recorded so far.
    pub fn snapshot(&self) -> Vec<T> {
        self.items.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Recorder<TraceSignal> {
    /// A trace-bus listener that records every signal it sees.
    pub fn listener(&self) -> impl FnMut(&TraceSignal) + Send + 'static {
        let rec = self.clone();
        move |s| rec.push(*s)
    }
}
