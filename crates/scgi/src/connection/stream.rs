//! Dialing the SCGI server.

use std::io::{self, Read, Write};
use std::net::TcpStream;
#[cfg(unix)]
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::Duration;

use tracing::debug;

use crate::protocol::{ConnectionTarget, ScgiError};

/// A connected stream to an SCGI server, over TCP or a Unix socket.
///
/// Closing happens on drop.
#[derive(Debug)]
pub enum ScgiStream {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl ScgiStream {
    /// Sets the read timeout of the underlying socket.
    ///
    /// # Errors
    ///
    /// See [`TcpStream::set_read_timeout`].
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        match self {
            ScgiStream::Tcp(stream) => stream.set_read_timeout(timeout),
            #[cfg(unix)]
            ScgiStream::Unix(stream) => stream.set_read_timeout(timeout),
        }
    }

    /// Sets the write timeout of the underlying socket.
    ///
    /// # Errors
    ///
    /// See [`TcpStream::set_write_timeout`].
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        match self {
            ScgiStream::Tcp(stream) => stream.set_write_timeout(timeout),
            #[cfg(unix)]
            ScgiStream::Unix(stream) => stream.set_write_timeout(timeout),
        }
    }
}

impl Read for ScgiStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            ScgiStream::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            ScgiStream::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for ScgiStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            ScgiStream::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            ScgiStream::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            ScgiStream::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            ScgiStream::Unix(stream) => stream.flush(),
        }
    }
}

/// Opens a stream to `target`: a Unix-domain socket for a path, TCP for a
/// host and port. There is no retry.
///
/// # Errors
///
/// Returns [`ScgiError::Connect`] wrapping the socket error.
pub fn dial(target: &ConnectionTarget) -> Result<ScgiStream, ScgiError> {
    debug!(addr = %target, "dialing scgi server");

    let stream = match target {
        ConnectionTarget::UnixPath(path) => dial_unix(path),
        ConnectionTarget::HostPort { host, port } => TcpStream::connect((host.as_str(), *port)).map(ScgiStream::Tcp),
    };

    stream.map_err(|e| ScgiError::connect(target, e))
}

#[cfg(unix)]
fn dial_unix(path: &Path) -> io::Result<ScgiStream> {
    UnixStream::connect(path).map(ScgiStream::Unix)
}

#[cfg(not(unix))]
fn dial_unix(_path: &Path) -> io::Result<ScgiStream> {
    Err(io::Error::new(io::ErrorKind::Unsupported, "unix sockets are not supported on this platform"))
}
