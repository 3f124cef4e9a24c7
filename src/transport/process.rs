//! Process-output transport: one record per stdout line of a child process
//!
//! A pipe read can't time out, so a helper thread reads stdout line by line and
//! forwards the lines over a bounded crossbeam channel. The transport waits on
//! that channel with the read timeout. When the channel buffer is full the
//! helper stops reading and the child blocks on its own stdout.
//!
//! Closing is a hard kill (`SIGKILL` on Unix), not a polite `SIGTERM`. Only the
//! direct child is killed: a grandchild that inherited stdout (say `sleep`
//! under `sh -c`) keeps the pipe open, and with it the reader thread, until it
//! exits on its own.

use super::{trim_line_ending, Transport};
use crate::error::TransportError;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use std::io::{BufRead, BufReader};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::time::Duration;

/// Lines buffered between the reader thread and the acquisition loop
const LINE_QUEUE_CAPACITY: usize = 1024;

/// Child process whose stdout is the record stream
pub struct ProcessTransport {
    child: Option<Child>,
    lines: Receiver<std::io::Result<String>>,
    command: String,
    read_timeout: Duration,
}

impl ProcessTransport {
    /// Spawn `command` with `args`, capturing stdout
    pub fn spawn(
        command: &str,
        args: &[String],
        read_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let mut child = Command::new(command)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|e| TransportError::Unavailable(format!("cannot start {}: {}", command, e)))?;

        let Some(stdout) = child.stdout.take() else {
            kill_and_reap(&mut child, command);
            return Err(TransportError::Unavailable(format!(
                "{} has no stdout pipe",
                command
            )));
        };

        let (tx, rx) = bounded(LINE_QUEUE_CAPACITY);
        let reader = std::thread::Builder::new()
            .name(format!("stdout:{}", command))
            .spawn(move || forward_lines(stdout, tx));
        if let Err(e) = reader {
            kill_and_reap(&mut child, command);
            return Err(TransportError::Io(e));
        }

        tracing::info!("Started program {} (pid {})", command, child.id());

        Ok(Self {
            child: Some(child),
            lines: rx,
            command: command.to_string(),
            read_timeout,
        })
    }

    /// OS process id of the child, while it is owned by the transport
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    fn exit_description(&mut self) -> String {
        match self.child.as_mut().map(Child::try_wait) {
            Some(Ok(Some(status))) => format!("{} exited with {}", self.command, status),
            _ => format!("{} closed its stdout", self.command),
        }
    }
}

/// Kill `child` and wait for it, so no orphan is left behind
fn kill_and_reap(child: &mut Child, command: &str) {
    if let Err(e) = child.kill() {
        tracing::warn!("Failed to terminate {}: {}", command, e);
    }
    match child.wait() {
        Ok(status) => tracing::info!("Process {} terminated ({})", command, status),
        Err(e) => tracing::warn!("Failed to reap {}: {}", command, e),
    }
}

/// Reader thread body. Ends at EOF, on a read error, or once the receiver is gone.
fn forward_lines(stdout: ChildStdout, tx: crossbeam_channel::Sender<std::io::Result<String>>) {
    let mut reader = BufReader::new(stdout);
    let mut raw = Vec::new();
    loop {
        raw.clear();
        match reader.read_until(b'\n', &mut raw) {
            Ok(0) => break,
            Ok(_) => {
                let mut line = String::from_utf8_lossy(&raw).into_owned();
                trim_line_ending(&mut line);
                if tx.send(Ok(line)).is_err() {
                    break;
                }
            }
            Err(e) => {
                let _ = tx.send(Err(e));
                break;
            }
        }
    }
}

impl Transport for ProcessTransport {
    fn read_record(&mut self) -> Result<Option<String>, TransportError> {
        if self.child.is_none() {
            return Err(TransportError::Closed);
        }

        match self.lines.recv_timeout(self.read_timeout) {
            Ok(Ok(line)) => Ok(Some(line)),
            Ok(Err(e)) => Err(TransportError::Io(e)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                Err(TransportError::Disconnected(self.exit_description()))
            }
        }
    }

    /// Kills the child outright and reaps it. Safe to call more than once.
    fn close(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };

        match child.try_wait() {
            Ok(Some(status)) => {
                tracing::info!("Program {} already exited ({})", self.command, status);
            }
            _ => kill_and_reap(&mut child, &self.command),
        }
    }

    fn describe(&self) -> String {
        format!("program output of {}", self.command)
    }
}

impl Drop for ProcessTransport {
    fn drop(&mut self) {
        self.close();
    }
}
