//! UDP transport: one record per datagram

use super::Transport;
use crate::error::TransportError;
use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

/// Datagram socket bound to a local port
pub struct UdpTransport {
    socket: Option<UdpSocket>,
    local_addr: SocketAddr,
    buf: Vec<u8>,
}

impl UdpTransport {
    /// Bind to `bind_address:port`. Port 0 picks a free port; see [`Self::local_addr`].
    pub fn bind(
        bind_address: &str,
        port: u16,
        max_datagram: usize,
        read_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind((bind_address, port)).map_err(|e| {
            TransportError::Unavailable(format!(
                "cannot bind UDP {}:{}: {}",
                bind_address, port, e
            ))
        })?;
        socket.set_read_timeout(Some(read_timeout))?;
        let local_addr = socket.local_addr()?;

        tracing::info!("Socket bound on {}", local_addr);

        Ok(Self {
            socket: Some(socket),
            local_addr,
            buf: vec![0u8; max_datagram.max(1)],
        })
    }

    /// Address the socket is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl Transport for UdpTransport {
    fn read_record(&mut self) -> Result<Option<String>, TransportError> {
        let socket = self.socket.as_ref().ok_or(TransportError::Closed)?;

        match socket.recv(&mut self.buf) {
            // Invalid UTF-8 is replaced rather than rejected; the parser drops
            // the record if it no longer reads as numbers.
            Ok(n) => Ok(Some(String::from_utf8_lossy(&self.buf[..n]).into_owned())),
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                ) =>
            {
                Ok(None)
            }
            Err(e) => Err(TransportError::Io(e)),
        }
    }

    fn close(&mut self) {
        if self.socket.take().is_some() {
            tracing::info!("Socket on {} closed", self.local_addr);
        }
    }

    fn describe(&self) -> String {
        format!("UDP socket {}", self.local_addr)
    }
}

impl Drop for UdpTransport {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bind_local() -> UdpTransport {
        UdpTransport::bind("127.0.0.1", 0, 1024, Duration::from_millis(50)).unwrap()
    }

    #[test]
    fn test_receives_datagram_as_record() {
        let mut transport = bind_local();
        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        sender
            .send_to(b"1.5;2.5", transport.local_addr())
            .unwrap();

        let mut record = None;
        for _ in 0..20 {
            record = transport.read_record().unwrap();
            if record.is_some() {
                break;
            }
        }
        assert_eq!(record.as_deref(), Some("1.5;2.5"));
    }

    #[test]
    fn test_timeout_returns_none() {
        let mut transport = bind_local();
        assert_eq!(transport.read_record().unwrap(), None);
    }

    #[test]
    fn test_oversized_datagram_is_truncated() {
        let mut transport =
            UdpTransport::bind("127.0.0.1", 0, 4, Duration::from_millis(50)).unwrap();
        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        sender.send_to(b"123456", transport.local_addr()).unwrap();

        let mut record = None;
        for _ in 0..20 {
            // Some platforms report truncation as an error instead
            match transport.read_record() {
                Ok(Some(r)) => {
                    record = Some(r);
                    break;
                }
                Ok(None) => continue,
                Err(_) => return,
            }
        }
        assert_eq!(record.as_deref(), Some("1234"));
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut transport = bind_local();
        transport.close();
        transport.close();
        assert!(matches!(
            transport.read_record(),
            Err(TransportError::Closed)
        ));
    }
}
