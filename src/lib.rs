//! # scope-rs: live multi-channel oscilloscope
//!
//! Reads a stream of text records from UDP, a serial line or a child process,
//! parses each record into one value per channel, and keeps a rolling window
//! of the most recent samples for display.
//!
//! ## Architecture
//!
//! - **Transport**: pluggable record sources with bounded read timeouts
//! - **Acquisition**: a worker thread reading, parsing and appending records
//! - **Buffer**: fixed-depth ring buffer guarded by a single mutex
//! - **Frontend**: snapshot reader with hold mode, plus a text renderer
//! - **Communication**: crossbeam channels for stop requests and events
//!
//! The acquisition thread and the display thread only meet at the buffer.
//! Both hold its lock for a memory copy at most.
//!
//! ## Example
//!
//! ```ignore
//! use scope_rs::{Acquisition, ScopeConfig, ScopeView};
//!
//! let config = ScopeConfig::load("scope.json")?;
//! let acquisition = Acquisition::start(&config)?;
//! let mut view = ScopeView::from_config(acquisition.buffer(), &config);
//!
//! while acquisition.is_running() {
//!     let frame = view.refresh()?;
//!     // draw frame.traces ...
//! }
//!
//! acquisition.shutdown()?;
//! ```

pub mod acquisition;
pub mod buffer;
pub mod config;
pub mod error;
pub mod frontend;
pub mod transport;
pub mod types;

// Re-export commonly used types
pub use acquisition::{Acquisition, AcquisitionEvent, RecordParser, StopHandle};
pub use buffer::{ChannelBuffer, ChannelSnapshot, SharedChannelBuffer};
pub use config::{ScopeConfig, SourceConfig, TransportConfig};
pub use error::{ParseError, Result, ScopeError, TransportError};
pub use frontend::{ConsoleRenderer, ScopeView};
pub use transport::Transport;
pub use types::{AcquisitionStats, RunState, SampleVector, StopReason};
