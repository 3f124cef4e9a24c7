//! Serial transport: one record per newline-terminated line
//!
//! Bytes are read in chunks with the port's timeout and assembled into lines
//! by a [`LineBuffer`], so a line split across reads is returned whole.

use super::{trim_line_ending, Transport};
use crate::error::TransportError;
use std::io::{ErrorKind, Read};
use std::time::Duration;

/// Longest line kept while waiting for its terminator
pub const MAX_LINE_LEN: usize = 64 * 1024;

const READ_CHUNK: usize = 256;

/// Accumulates bytes and hands out complete lines
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Create an empty line buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw bytes.
    ///
    /// If the unterminated tail grows past [`MAX_LINE_LEN`] it is discarded.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
        if self.pending.len() > MAX_LINE_LEN && !self.pending.contains(&b'\n') {
            tracing::warn!(
                "Discarding {} bytes without a line terminator",
                self.pending.len()
            );
            self.pending.clear();
        }
    }

    /// Take the next complete line, without its terminator
    pub fn next_line(&mut self) -> Option<String> {
        let end = self.pending.iter().position(|&b| b == b'\n')?;
        let raw: Vec<u8> = self.pending.drain(..=end).collect();
        let mut line = String::from_utf8_lossy(&raw).into_owned();
        trim_line_ending(&mut line);
        Some(line)
    }

    /// Bytes waiting for a terminator
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Serial device opened at a fixed baud rate
pub struct SerialTransport {
    port: Option<Box<dyn serialport::SerialPort>>,
    path: String,
    baudrate: u32,
    lines: LineBuffer,
}

impl SerialTransport {
    /// Open `path` at `baudrate`; reads wait at most `read_timeout`
    pub fn open(path: &str, baudrate: u32, read_timeout: Duration) -> Result<Self, TransportError> {
        let port = serialport::new(path, baudrate)
            .timeout(read_timeout)
            .open()
            .map_err(|e| TransportError::Unavailable(format!("cannot open {}: {}", path, e)))?;

        tracing::info!("Serial port {} opened at {} baud", path, baudrate);
        Ok(Self::from_port(port, path))
    }

    /// Wrap a port that is already open and configured
    pub fn from_port(port: Box<dyn serialport::SerialPort>, path: &str) -> Self {
        let baudrate = port.baud_rate().unwrap_or_default();
        Self {
            port: Some(port),
            path: path.to_string(),
            baudrate,
            lines: LineBuffer::new(),
        }
    }
}

impl Transport for SerialTransport {
    fn read_record(&mut self) -> Result<Option<String>, TransportError> {
        if let Some(line) = self.lines.next_line() {
            return Ok(Some(line));
        }

        let port = self.port.as_mut().ok_or(TransportError::Closed)?;
        let mut chunk = [0u8; READ_CHUNK];
        match port.read(&mut chunk) {
            Ok(0) => Err(TransportError::Disconnected(format!(
                "{} reached end of stream",
                self.path
            ))),
            Ok(n) => {
                self.lines.extend(&chunk[..n]);
                Ok(self.lines.next_line())
            }
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => Ok(None),
            Err(e) if e.kind() == ErrorKind::Interrupted => Ok(None),
            Err(e) => Err(TransportError::Io(e)),
        }
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            tracing::info!("Serial port {} closed", self.path);
        }
    }

    fn describe(&self) -> String {
        format!("serial port {} @ {} baud", self.path, self.baudrate)
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        self.close();
    }
}
