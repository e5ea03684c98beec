//! Reshapes a CGI response into an HTTP response.
//!
//! An SCGI server answers like a CGI script: the first line is a `Status`
//! header, not an HTTP status line. Replacing that one line is enough for a
//! standard HTTP response parser to read the rest, so the adapter reads the
//! first line, rewrites it as `<protocol> <code> <reason>\r\n` and chains it
//! in front of the unread remainder of the stream.

use std::io::{self, BufRead, Chain, Cursor, Read};

use bytes::{BufMut, Bytes, BytesMut};
use http::Version;
use tracing::trace;

use crate::ensure;
use crate::protocol::{ScgiError, protocol_version};

/// Longest first line accepted before the response is rejected.
const MAX_STATUS_LINE_BYTES: usize = 8 * 1024;

const STATUS_HEADER: &[u8] = b"Status";
const HEADER_SEPARATOR: &[u8] = b": ";

/// The synthesized status line followed by the rest of the server's stream.
pub type AdaptedStream<R> = Chain<Cursor<Bytes>, R>;

/// Reads the `Status` line from `reader` and returns the HTTP status line
/// that replaces it.
///
/// Only the first line is consumed.
///
/// # Errors
///
/// - [`ScgiError::Io`] if the stream fails or ends before the first line
///   terminator
/// - [`ScgiError::Format`] with `invalid status response format` if the
///   line has no `": "` separator
/// - [`ScgiError::Format`] with `invalid status header` if the header name
///   is not exactly `Status`
pub fn adapt_status_line<R: BufRead>(reader: &mut R, version: Version) -> Result<Bytes, ScgiError> {
    let mut line = Vec::new();
    reader.by_ref().take(MAX_STATUS_LINE_BYTES as u64).read_until(b'\n', &mut line)?;

    if line.pop() != Some(b'\n') {
        ensure!(line.len() + 1 < MAX_STATUS_LINE_BYTES, ScgiError::format("status line too long"));
        return Err(ScgiError::io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "connection closed before the status line was complete",
        )));
    }
    if line.last() == Some(&b'\r') {
        line.pop();
    }

    let Some(separator) = line.windows(HEADER_SEPARATOR.len()).position(|window| window == HEADER_SEPARATOR) else {
        return Err(ScgiError::format("invalid status response format"));
    };
    let (name, status) = (&line[..separator], &line[separator + HEADER_SEPARATOR.len()..]);
    ensure!(name == STATUS_HEADER, ScgiError::format("invalid status header"));

    let protocol = protocol_version(version).as_bytes();
    let mut status_line = BytesMut::with_capacity(protocol.len() + 1 + status.len() + 2);
    status_line.put_slice(protocol);
    status_line.put_u8(b' ');
    status_line.put_slice(status);
    status_line.put_slice(b"\r\n");

    trace!(status = %String::from_utf8_lossy(status), "adapted scgi status line");
    Ok(status_line.freeze())
}

/// Adapts a whole response stream: the `Status` line is replaced and the
/// remainder is left unread behind it.
///
/// # Errors
///
/// See [`adapt_status_line`].
pub fn adapt_response<R: BufRead>(mut reader: R, version: Version) -> Result<AdaptedStream<R>, ScgiError> {
    let status_line = adapt_status_line(&mut reader, version)?;
    Ok(Cursor::new(status_line).chain(reader))
}
