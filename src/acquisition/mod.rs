//! Acquisition: transport → parser → buffer, on a dedicated thread
//!
//! # Architecture
//!
//! The acquisition thread and the consumer (display) thread share nothing but
//! the [`SharedChannelBuffer`] and a pair of channels:
//!
//! - a stop channel, consumer → worker ([`StopHandle`])
//! - an event channel, worker → consumer ([`AcquisitionEvent`])
//!
//! # Components
//!
//! - [`parser`] - record parsing into sample vectors
//! - [`AcquisitionWorker`] - the producer loop
//! - [`Acquisition`] - owner handle: starts the worker, exposes snapshots and `stop()`
//!
//! # Example
//!
//! ```ignore
//! use scope_rs::acquisition::Acquisition;
//! use scope_rs::config::ScopeConfig;
//!
//! let config = ScopeConfig::load("scope.json")?;
//! let acquisition = Acquisition::start(&config)?;
//!
//! // Render loop
//! let channel0 = acquisition.snapshot(0)?;
//!
//! // Window closed
//! let stats = acquisition.shutdown()?;
//! ```

pub mod parser;
pub mod worker;

pub use parser::{RecordParser, DEFAULT_PATTERN, FIELD_DELIMITER};
pub use worker::{AcquisitionWorker, RunControl, STATS_INTERVAL};

use crate::buffer::SharedChannelBuffer;
use crate::config::ScopeConfig;
use crate::error::{Result, ResultExt, ScopeError};
use crate::transport::{self, Transport};
use crate::types::{AcquisitionStats, RunState, StopReason};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Capacity of the worker → consumer event queue
const EVENT_QUEUE_CAPACITY: usize = 64;

/// Message sent from the acquisition thread to the consumer
#[derive(Debug, Clone)]
pub enum AcquisitionEvent {
    /// Periodic statistics update
    Stats(AcquisitionStats),
    /// The loop has stopped and the transport is closed
    Stopped {
        reason: StopReason,
        stats: AcquisitionStats,
    },
}

/// Run state shared between the worker and its observers
#[derive(Debug, Clone)]
pub struct RunStateCell(Arc<AtomicBool>);

impl RunStateCell {
    /// New cell in the `Running` state
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    /// Current state
    pub fn get(&self) -> RunState {
        if self.0.load(Ordering::Acquire) {
            RunState::Running
        } else {
            RunState::Stopped
        }
    }

    /// Only `Running → Stopped` has an effect
    pub fn set(&self, state: RunState) {
        if state == RunState::Stopped {
            self.0.store(false, Ordering::Release);
        }
    }
}

impl Default for RunStateCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable handle that can request a stop from any thread
#[derive(Debug, Clone)]
pub struct StopHandle {
    stop_tx: Sender<()>,
    state: RunStateCell,
}

impl StopHandle {
    /// Request the acquisition loop to stop. Returns immediately.
    ///
    /// The loop notices within one read timeout. Repeated calls are harmless.
    pub fn stop(&self) {
        // A full channel means a stop is already pending
        let _ = self.stop_tx.try_send(());
    }

    /// Current run state
    pub fn state(&self) -> RunState {
        self.state.get()
    }
}

/// Owner handle for a running acquisition
///
/// Dropping the handle stops the loop and waits for the thread.
pub struct Acquisition {
    buffer: SharedChannelBuffer,
    stop: StopHandle,
    events: Receiver<AcquisitionEvent>,
    thread: Option<JoinHandle<AcquisitionStats>>,
    transport_name: String,
}

impl Acquisition {
    /// Validate the config, open its transport, and start acquiring.
    ///
    /// Every configuration or transport-open error is reported here, before
    /// any thread is spawned.
    pub fn start(config: &ScopeConfig) -> Result<Self> {
        config.validate()?;
        let parser = RecordParser::new(&config.source.regex, config.dimension())?;
        let transport = transport::open(&config.source).with_context(|| {
            format!("Opening {} source", config.source.transport.kind())
        })?;
        Self::spawn(transport, parser, config.depth())
    }

    /// Start acquiring from an already open transport
    pub fn spawn(
        transport: Box<dyn Transport>,
        parser: RecordParser,
        depth: usize,
    ) -> Result<Self> {
        let buffer = SharedChannelBuffer::new(depth, parser.dimension())?;
        let (stop_tx, stop_rx) = bounded(1);
        let (event_tx, event_rx) = bounded(EVENT_QUEUE_CAPACITY);
        let state = RunStateCell::new();
        let transport_name = transport.describe();

        let control = RunControl {
            stop_rx,
            event_tx,
            state: state.clone(),
        };
        let worker = AcquisitionWorker::new(transport, parser, buffer.clone(), control);

        let thread = std::thread::Builder::new()
            .name("acquisition".to_string())
            .spawn(move || worker.run())
            .map_err(|e| ScopeError::Thread(format!("failed to spawn: {}", e)))?;

        Ok(Self {
            buffer,
            stop: StopHandle { stop_tx, state },
            events: event_rx,
            thread: Some(thread),
            transport_name,
        })
    }

    /// Shared buffer, for consumers that take their own snapshots
    pub fn buffer(&self) -> SharedChannelBuffer {
        self.buffer.clone()
    }

    /// Copy one channel's window, oldest first
    pub fn snapshot(&self, channel: usize) -> Result<Vec<f64>> {
        self.buffer.snapshot(channel)
    }

    /// Request a stop without waiting
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Handle for stopping from another thread
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Current run state
    pub fn state(&self) -> RunState {
        self.stop.state()
    }

    /// Whether the loop is still running
    pub fn is_running(&self) -> bool {
        self.state() == RunState::Running
    }

    /// Description of the transport being read
    pub fn transport_name(&self) -> &str {
        &self.transport_name
    }

    /// Receive one pending event without blocking
    pub fn try_event(&self) -> Option<AcquisitionEvent> {
        self.events.try_recv().ok()
    }

    /// Receive all pending events
    pub fn drain_events(&self) -> Vec<AcquisitionEvent> {
        self.events.try_iter().collect()
    }

    /// Wait for the loop to finish on its own (transport failure or an earlier stop)
    pub fn join(mut self) -> Result<AcquisitionStats> {
        self.join_thread()
    }

    /// Stop and wait for the loop to finish
    pub fn shutdown(mut self) -> Result<AcquisitionStats> {
        self.stop.stop();
        self.join_thread()
    }

    fn join_thread(&mut self) -> Result<AcquisitionStats> {
        let thread = self
            .thread
            .take()
            .ok_or_else(|| ScopeError::Thread("already joined".to_string()))?;
        thread
            .join()
            .map_err(|_| ScopeError::Thread("acquisition thread panicked".to_string()))
    }
}

impl Drop for Acquisition {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.stop.stop();
            if let Err(e) = self.join_thread() {
                tracing::error!("{}", e);
            }
        }
    }
}
