//! Record transports
//!
//! A [`Transport`] yields raw text records, one per call, from one of three
//! sources:
//!
//! - [`UdpTransport`] - one record per datagram
//! - [`SerialTransport`] - one record per newline-terminated line
//! - [`ProcessTransport`] - one record per line of a child process's stdout
//!
//! Every read is bounded by a timeout. A read that times out returns
//! `Ok(None)` so the acquisition loop can check for a stop request between
//! records. Any `Err` is terminal.

pub mod process;
pub mod serial;
pub mod udp;

pub use process::ProcessTransport;
pub use serial::{LineBuffer, SerialTransport};
pub use udp::UdpTransport;

use crate::config::{SourceConfig, TransportConfig};
use crate::error::TransportError;

/// Unified interface for record sources
///
/// Implementations must be `Send` so the acquisition thread can own them.
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send {
    /// Read the next record.
    ///
    /// Blocks for at most the configured read timeout. Returns `Ok(None)` if
    /// no complete record arrived in that time.
    fn read_record(&mut self) -> Result<Option<String>, TransportError>;

    /// Release the underlying resource.
    ///
    /// Only the first call has an effect; reads after close fail with
    /// [`TransportError::Closed`].
    fn close(&mut self);

    /// Short human-readable description, for logs
    fn describe(&self) -> String;
}

/// Open the transport described by a source configuration
pub fn open(source: &SourceConfig) -> Result<Box<dyn Transport>, TransportError> {
    let timeout = source.read_timeout();
    let transport: Box<dyn Transport> = match &source.transport {
        TransportConfig::Udp {
            port,
            bind_address,
            max_datagram,
        } => Box::new(UdpTransport::bind(
            bind_address,
            *port,
            *max_datagram,
            timeout,
        )?),
        TransportConfig::Serial { port, baudrate } => {
            Box::new(SerialTransport::open(port, *baudrate, timeout)?)
        }
        TransportConfig::ProgramOutput { command, args } => {
            Box::new(ProcessTransport::spawn(command, args, timeout)?)
        }
    };

    tracing::info!("Opened {}", transport.describe());
    Ok(transport)
}

/// Strip a trailing `\n` or `\r\n`
pub(crate) fn trim_line_ending(line: &mut String) {
    if line.ends_with('\n') {
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
    }
}
