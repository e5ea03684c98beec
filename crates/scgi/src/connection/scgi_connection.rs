use std::io::{BufReader, BufWriter, Read, Write};

use http::request::Parts;
use http::{Method, Response, Version};
use tracing::trace;

use crate::codec::{AdaptedStream, HttpResponseParser, ResponseBody, ResponseParser, adapt_response, build_header_block, write_netstring};
use crate::connection::stream::{ScgiStream, dial};
use crate::protocol::{ConnectionTarget, ScgiError};

/// The response of one exchange, reading its body from the connection.
pub type ScgiResponse<S = ScgiStream> = Response<ResponseBody<AdaptedStream<BufReader<S>>>>;

/// One SCGI exchange over a stream.
///
/// SCGI allows a single request per connection, so [`read_response`]
/// consumes the connection and hands the stream to the response body.
///
/// [`read_response`]: ScgiConnection::read_response
#[derive(Debug)]
pub struct ScgiConnection<S = ScgiStream> {
    stream: S,
}

impl ScgiConnection<ScgiStream> {
    /// Dials `target`.
    ///
    /// # Errors
    ///
    /// Returns [`ScgiError::Connect`] if the server can't be reached.
    pub fn connect(target: &ConnectionTarget) -> Result<Self, ScgiError> {
        dial(target).map(Self::new)
    }
}

impl<S: Read + Write> ScgiConnection<S> {
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Writes the request: the netstring-framed header block, then the body,
    /// in that order.
    ///
    /// `body` must be the complete request body; its length is announced as
    /// `CONTENT_LENGTH`.
    ///
    /// # Errors
    ///
    /// Returns [`ScgiError::Validation`] if the header block can't be
    /// encoded, or [`ScgiError::Io`] if a write fails. The connection is
    /// unusable afterwards.
    pub fn send(&mut self, parts: &Parts, body: &[u8]) -> Result<(), ScgiError> {
        let header_block = build_header_block(parts, body.len())?;

        let mut writer = BufWriter::new(&mut self.stream);
        write_netstring(&mut writer, &header_block)?;
        writer.write_all(body)?;
        writer.flush()?;

        trace!(header_block_size = header_block.len(), body_size = body.len(), "sent scgi request");
        Ok(())
    }

    /// Reads the response with the default [`HttpResponseParser`].
    ///
    /// # Errors
    ///
    /// See [`ScgiConnection::read_response_with`].
    pub fn read_response(self, version: Version, request_method: &Method) -> Result<ScgiResponse<S>, ScgiError> {
        self.read_response_with(&HttpResponseParser, version, request_method)
    }

    /// Reads the response: the `Status` line is rewritten into an HTTP
    /// status line for `version` and the whole stream is handed to `parser`.
    ///
    /// # Errors
    ///
    /// - [`ScgiError::Format`] if the first line is not a `Status` header
    /// - [`ScgiError::Io`] if the stream fails or ends early
    /// - [`ScgiError::Protocol`] if `parser` rejects the adapted response
    pub fn read_response_with<P: ResponseParser>(
        self,
        parser: &P,
        version: Version,
        request_method: &Method,
    ) -> Result<ScgiResponse<S>, ScgiError> {
        let adapted = adapt_response(BufReader::new(self.stream), version)?;
        Ok(parser.parse(adapted, request_method)?)
    }
}
