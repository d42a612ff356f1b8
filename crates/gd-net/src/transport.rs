//! Transport contracts and default TCP implementation.

use gd_core::DpiError;
use gd_core::DpiResult;
use gd_core::ErrorKind;
use std::io;
use std::io::Read;
use std::io::Write;
use std::net::SocketAddr;
use std::net::TcpStream;
use std::time::Duration;

/// Trait-object-safe stream carried by a response body.
pub trait IoStream: Read + Write {}
impl<T> IoStream for T where T: Read + Write {}

pub type BoxedIoStream = Box<dyn IoStream>;

/// Low-level transport abstraction for opening TCP connections.
pub trait Transport {
    fn connect(&self, address: SocketAddr, timeout: Duration) -> DpiResult<TcpStream>;
}

/// Standard library TCP transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpTransport;

impl Transport for TcpTransport {
    fn connect(&self, address: SocketAddr, timeout: Duration) -> DpiResult<TcpStream> {
        let stream = TcpStream::connect_timeout(&address, timeout).map_err(|error| {
            io_error(&error, &format!("failed to connect to `{address}`"))
        })?;

        stream
            .set_read_timeout(Some(timeout))
            .map_err(|error| io_error(&error, &format!("failed to set read timeout for `{address}`")))?;

        stream
            .set_write_timeout(Some(timeout))
            .map_err(|error| io_error(&error, &format!("failed to set write timeout for `{address}`")))?;

        Ok(stream)
    }
}

/// Tries each resolved address in order and returns the first connection.
pub fn connect_first_available<T: Transport>(
    transport: &T,
    addresses: &[SocketAddr],
    timeout: Duration,
) -> DpiResult<TcpStream> {
    let mut last_error: Option<DpiError> = None;

    for address in addresses {
        match transport.connect(*address, timeout) {
            Ok(stream) => return Ok(stream),
            Err(error) => {
                tracing::debug!(%address, %error, "connection attempt failed");
                last_error = Some(error);
            }
        }
    }

    match last_error {
        Some(error) => Err(error),
        None => Err(DpiError::new(
            ErrorKind::Connection,
            "no addresses available to open a connection",
        )),
    }
}

/// Maps an I/O failure, keeping timeouts distinguishable.
pub fn io_error(error: &io::Error, context: &str) -> DpiError {
    let kind = match error.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => ErrorKind::Timeout,
        _ => ErrorKind::Connection,
    };
    DpiError::new(kind, format!("{context}: {error}"))
}
