//! Parsing the adapted stream into an `http::Response`.
//!
//! [`ResponseParser`] is the seam between the SCGI adapter and generic HTTP
//! response parsing: given a reader positioned at an HTTP status line, it
//! returns the parsed head with a body that keeps reading from the same
//! reader. [`HttpResponseParser`] is the `httparse`-backed implementation.

use std::cmp;
use std::io::{self, Read};

use bytes::{Buf, Bytes, BytesMut};
use http::{Method, Response};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::codec::body::PayloadDecoder;
use crate::codec::response_decoder::ResponseDecoder;
use crate::protocol::{ParseError, PayloadItem, PayloadSize};

/// Bytes requested from the reader per read call
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Turns a stream shaped as status line, headers, blank line and body into a
/// structured response.
pub trait ResponseParser {
    /// Parses the response head from `reader`.
    ///
    /// `request_method` decides whether a body may follow at all.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the head is malformed or the reader fails
    /// before the head is complete.
    fn parse<R: Read>(&self, reader: R, request_method: &Method) -> Result<Response<ResponseBody<R>>, ParseError>;
}

/// The default [`ResponseParser`], built on `httparse`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpResponseParser;

impl ResponseParser for HttpResponseParser {
    fn parse<R: Read>(&self, mut reader: R, request_method: &Method) -> Result<Response<ResponseBody<R>>, ParseError> {
        let mut decoder = ResponseDecoder::new(request_method.clone());
        let mut buf = BytesMut::with_capacity(READ_CHUNK_SIZE);

        loop {
            if let Some((head, payload_size)) = decoder.decode(&mut buf)? {
                return Ok(head.map(|()| ResponseBody::new(reader, buf, payload_size)));
            }

            if read_buf(&mut reader, &mut buf)? == 0 {
                return Err(ParseError::io(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed before the response head was complete",
                )));
            }
        }
    }
}

/// The body of a parsed response.
///
/// It owns the reader the head was parsed from, so for an SCGI exchange the
/// connection stays open while the body is alive and is closed when the
/// body is dropped, whether or not it was read to the end.
#[derive(Debug)]
pub struct ResponseBody<R> {
    reader: R,
    /// Bytes read past the head, not yet handed to the decoder
    buf: BytesMut,
    decoder: PayloadDecoder,
    payload_size: PayloadSize,
    /// Decoded bytes not yet copied out
    pending: Bytes,
    reader_eof: bool,
    finished: bool,
}

impl<R: Read> ResponseBody<R> {
    fn new(reader: R, buf: BytesMut, payload_size: PayloadSize) -> Self {
        Self {
            reader,
            buf,
            decoder: PayloadDecoder::from(payload_size),
            payload_size,
            pending: Bytes::new(),
            reader_eof: false,
            finished: false,
        }
    }

    /// How the body is delimited.
    pub fn payload_size(&self) -> PayloadSize {
        self.payload_size
    }

    /// Returns true once the end of the body has been read.
    pub fn is_finished(&self) -> bool {
        self.finished && self.pending.is_empty()
    }

    /// Reads the rest of the body into memory.
    ///
    /// # Errors
    ///
    /// Fails like [`Read::read`].
    pub fn collect(&mut self) -> io::Result<Bytes> {
        let mut body = Vec::new();
        self.read_to_end(&mut body)?;
        Ok(Bytes::from(body))
    }
}

impl<R: Read> Read for ResponseBody<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        loop {
            if !self.pending.is_empty() || out.is_empty() {
                let len = cmp::min(out.len(), self.pending.len());
                out[..len].copy_from_slice(&self.pending[..len]);
                self.pending.advance(len);
                return Ok(len);
            }

            if self.finished {
                return Ok(0);
            }

            let decoded = if self.reader_eof {
                self.decoder.decode_eof(&mut self.buf)
            } else {
                self.decoder.decode(&mut self.buf)
            };

            match decoded.map_err(into_io_error)? {
                Some(PayloadItem::Chunk(bytes)) => self.pending = bytes,
                Some(PayloadItem::Eof) => {
                    trace!(payload_size = ?self.payload_size, "finished reading response body");
                    self.finished = true;
                }
                None if self.reader_eof => self.finished = true,
                None => self.reader_eof = read_buf(&mut self.reader, &mut self.buf)? == 0,
            }
        }
    }
}

/// Reads once from `reader` and appends the bytes to `buf`, retrying on
/// interruption. Returns the number of bytes appended, 0 at end of stream.
fn read_buf<R: Read>(reader: &mut R, buf: &mut BytesMut) -> io::Result<usize> {
    let mut chunk = [0u8; READ_CHUNK_SIZE];
    loop {
        match reader.read(&mut chunk) {
            Ok(read) => {
                buf.extend_from_slice(&chunk[..read]);
                return Ok(read);
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
}

fn into_io_error(e: ParseError) -> io::Error {
    match e {
        ParseError::Io { source } => source,
        e => io::Error::new(io::ErrorKind::InvalidData, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use indoc::indoc;

    /// Hands out its data a few bytes per read, like a slow socket.
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let len = cmp::min(cmp::min(self.step, buf.len()), self.data.len());
            buf[..len].copy_from_slice(&self.data[..len]);
            self.data = &self.data[len..];
            Ok(len)
        }
    }

    fn parse<'a>(input: &'a [u8], method: &Method) -> Result<Response<ResponseBody<&'a [u8]>>, ParseError> {
        HttpResponseParser.parse(input, method)
    }

    #[test]
    fn body_until_close() {
        let mut response = parse(b"HTTP/1.1 200 OK\r\nX: y\r\n\r\nbody", &Method::GET).unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body().payload_size(), PayloadSize::UntilClose);
        assert_eq!(response.body_mut().collect().unwrap(), &b"body"[..]);
        assert!(response.body().is_finished());
    }

    #[test]
    fn body_bounded_by_content_length() {
        let mut response = parse(b"HTTP/1.1 200 OK\r\nContent-Length: 4\r\n\r\nbodytrailing", &Method::GET).unwrap();
        assert_eq!(response.body_mut().collect().unwrap(), &b"body"[..]);
    }

    #[test]
    fn truncated_body_is_an_error() {
        let mut response = parse(b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nbody", &Method::GET).unwrap();
        let err = response.body_mut().collect().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn head_request_has_no_body() {
        let mut response = parse(b"HTTP/1.1 200 OK\r\nContent-Length: 4\r\n\r\n", &Method::HEAD).unwrap();
        assert!(response.body_mut().collect().unwrap().is_empty());
    }

    #[test]
    fn slow_reader() {
        let input = indoc! {b"
            HTTP/1.1 201 Created
            Content-Type: application/json
            Content-Length: 11

            {\"id\": 42}
"};
        let reader = Trickle { data: input, step: 3 };
        let mut response = HttpResponseParser.parse(reader, &Method::POST).unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let mut body = String::new();
        response.body_mut().read_to_string(&mut body).unwrap();
        assert_eq!(body, "{\"id\": 42}\n");
    }

    #[test]
    fn small_reads_from_body() {
        let mut response = parse(b"HTTP/1.1 200 OK\r\n\r\nabcdef", &Method::GET).unwrap();
        let mut out = [0u8; 4];

        assert_eq!(response.body_mut().read(&mut out).unwrap(), 4);
        assert_eq!(&out, b"abcd");
        assert_eq!(response.body_mut().read(&mut out).unwrap(), 2);
        assert_eq!(&out[..2], b"ef");
        assert_eq!(response.body_mut().read(&mut out).unwrap(), 0);
    }

    #[test]
    fn incomplete_head_is_an_io_error() {
        let err = parse(b"HTTP/1.1 200 OK\r\nX: y\r\n", &Method::GET).unwrap_err();
        assert!(matches!(err, ParseError::Io { .. }));
    }

    #[test]
    fn malformed_head() {
        let err = parse(b"HTTP/1.1 2000 OK\r\n\r\n", &Method::GET).unwrap_err();
        assert!(!matches!(err, ParseError::Io { .. }));
    }
}
