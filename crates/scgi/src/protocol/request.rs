//! Request bodies accepted by the SCGI client.
//!
//! SCGI announces `CONTENT_LENGTH` before the body, so every body is read
//! fully into memory before anything is written to the socket. Callers must
//! bound body size themselves; nothing here enforces a limit.

use std::io::{self, Read};

use bytes::Bytes;
use http::Version;

/// A request body that can be buffered into a single contiguous [`Bytes`].
pub trait RequestBody {
    /// Reads the whole body into memory.
    ///
    /// # Errors
    ///
    /// Only bodies backed by a reader can fail, with the reader's error.
    fn into_bytes(self) -> io::Result<Bytes>;
}

impl RequestBody for () {
    fn into_bytes(self) -> io::Result<Bytes> {
        Ok(Bytes::new())
    }
}

impl<B: RequestBody> RequestBody for Option<B> {
    fn into_bytes(self) -> io::Result<Bytes> {
        self.map_or_else(|| Ok(Bytes::new()), RequestBody::into_bytes)
    }
}

impl RequestBody for Bytes {
    fn into_bytes(self) -> io::Result<Bytes> {
        Ok(self)
    }
}

impl RequestBody for Vec<u8> {
    fn into_bytes(self) -> io::Result<Bytes> {
        Ok(Bytes::from(self))
    }
}

impl RequestBody for String {
    fn into_bytes(self) -> io::Result<Bytes> {
        Ok(Bytes::from(self))
    }
}

impl RequestBody for &'static [u8] {
    fn into_bytes(self) -> io::Result<Bytes> {
        Ok(Bytes::from_static(self))
    }
}

impl RequestBody for &'static str {
    fn into_bytes(self) -> io::Result<Bytes> {
        Ok(Bytes::from_static(self.as_bytes()))
    }
}

/// Wraps any [`Read`] so a streaming source can be used as a request body.
#[derive(Debug)]
pub struct ReaderBody<R> {
    reader: R,
}

impl<R: Read> ReaderBody<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: Read> RequestBody for ReaderBody<R> {
    fn into_bytes(mut self) -> io::Result<Bytes> {
        let mut buf = Vec::new();
        self.reader.read_to_end(&mut buf)?;
        Ok(Bytes::from(buf))
    }
}

/// The protocol string of `version`, as sent in `SERVER_PROTOCOL` and in
/// the synthesized status line.
pub fn protocol_version(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_2 => "HTTP/2.0",
        Version::HTTP_3 => "HTTP/3.0",
        // HTTP_11, and the default of `http::Version`
        _ => "HTTP/1.1",
    }
}
