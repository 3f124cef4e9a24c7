//! Acquisition worker
//!
//! The worker is the producer side of the scope. It owns the transport and
//! runs on its own thread:
//!
//! 1. Check the stop channel
//! 2. Read one record (bounded by the transport's read timeout)
//! 3. Parse it; on failure log, count, and go back to 1
//! 4. Append the sample to the shared buffer
//!
//! The buffer lock is only taken in step 4. Reading and parsing happen
//! without it, so a slow transport never delays a snapshot.
//!
//! A transport error ends the loop. Either way the transport is closed
//! exactly once, a final [`AcquisitionEvent::Stopped`] is queued for the
//! consumer, and then the run state flips to [`RunState::Stopped`].

use crate::acquisition::parser::RecordParser;
use crate::acquisition::{AcquisitionEvent, RunStateCell};
use crate::buffer::SharedChannelBuffer;
use crate::transport::Transport;
use crate::types::{AcquisitionStats, RunState, StopReason};
use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};
use std::time::{Duration, Instant};

/// How often statistics are pushed to the consumer
pub const STATS_INTERVAL: Duration = Duration::from_millis(500);

/// Everything the loop needs besides the transport, handed over at spawn time
pub struct RunControl {
    /// Stop requests; a disconnected channel also means stop
    pub stop_rx: Receiver<()>,
    /// Events for the consumer
    pub event_tx: Sender<AcquisitionEvent>,
    /// Shared run state
    pub state: RunStateCell,
}

/// The acquisition loop
pub struct AcquisitionWorker {
    transport: Box<dyn Transport>,
    parser: RecordParser,
    buffer: SharedChannelBuffer,
    control: RunControl,
    stats: AcquisitionStats,
    last_stats_time: Instant,
    stop_seen: bool,
}

impl AcquisitionWorker {
    /// Create a worker; the transport must already be open
    pub fn new(
        transport: Box<dyn Transport>,
        parser: RecordParser,
        buffer: SharedChannelBuffer,
        control: RunControl,
    ) -> Self {
        Self {
            transport,
            parser,
            buffer,
            control,
            stats: AcquisitionStats::default(),
            last_stats_time: Instant::now(),
            stop_seen: false,
        }
    }

    /// Run until stopped or the transport fails. Returns the final statistics.
    pub fn run(mut self) -> AcquisitionStats {
        let transport_name = self.transport.describe();
        tracing::info!("Acquisition started on {}", transport_name);

        let reason = loop {
            if self.stop_requested() {
                break StopReason::Requested;
            }

            match self.transport.read_record() {
                Ok(Some(record)) => {
                    // A stop that arrived during the read wins over the record
                    if self.stop_requested() {
                        break StopReason::Requested;
                    }
                    self.handle_record(&record);
                }
                Ok(None) => self.stats.read_timeouts += 1,
                Err(e) => {
                    tracing::error!("Transport error on {}: {}", transport_name, e);
                    break StopReason::TransportFailed(e.to_string());
                }
            }

            if self.last_stats_time.elapsed() >= STATS_INTERVAL {
                self.send_stats();
                self.last_stats_time = Instant::now();
            }
        };

        self.transport.close();
        self.stats.update_rate();

        tracing::info!(
            "Acquisition stopped ({}): {} samples, {} dropped records",
            reason,
            self.stats.samples_appended,
            self.stats.dropped_records()
        );

        // Queue the event first so a consumer that sees the state change can drain it
        let stats = self.stats.clone();
        self.send_event(AcquisitionEvent::Stopped {
            reason,
            stats: stats.clone(),
        });
        self.control.state.set(RunState::Stopped);
        stats
    }

    fn stop_requested(&mut self) -> bool {
        if !self.stop_seen {
            self.stop_seen = match self.control.stop_rx.try_recv() {
                Ok(()) => true,
                Err(TryRecvError::Empty) => false,
                Err(TryRecvError::Disconnected) => true,
            };
        }
        self.stop_seen
    }

    fn handle_record(&mut self, record: &str) {
        self.stats.records_received += 1;

        let sample = match self.parser.parse(record) {
            Ok(sample) => sample,
            Err(e) => {
                self.stats.record_parse_error(&e);
                tracing::warn!(kind = e.kind(), "Dropped record {:?}: {}", record, e);
                return;
            }
        };

        match self.buffer.append(&sample) {
            Ok(()) => {
                self.stats.samples_appended += 1;
                tracing::trace!("Appended {:?}", sample.values());
            }
            // The parser and buffer share a dimension, so this is a wiring bug
            Err(e) => tracing::error!("Failed to append sample: {}", e),
        }
    }

    fn send_stats(&mut self) {
        self.stats.update_rate();
        self.send_event(AcquisitionEvent::Stats(self.stats.clone()));
    }

    /// Events never block the loop; if the consumer is behind they are dropped
    fn send_event(&self, event: AcquisitionEvent) {
        match self.control.event_tx.try_send(event) {
            Ok(()) | Err(TrySendError::Disconnected(_)) => {}
            Err(TrySendError::Full(_)) => {
                tracing::debug!("Event queue full, dropping event");
            }
        }
    }
}
