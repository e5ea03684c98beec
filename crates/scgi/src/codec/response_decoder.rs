//! HTTP response head decoder.
//!
//! Parses the adapted response, a synthesized status line followed by the
//! CGI headers of the server, into an `http::Response<()>` and decides how
//! its body is delimited.
//!
//! # Limits
//!
//! - Maximum number of headers: 64
//! - Maximum head size: 16KB
//! - Only HTTP/1.0 and HTTP/1.1 status lines
//!
//! Like the request header decoder of an HTTP server, it records the byte
//! ranges of names and values while `httparse` borrows the buffer, then
//! slices them out of the frozen head without copying.

use bytes::{Bytes, BytesMut};
use http::{HeaderName, HeaderValue, Method, StatusCode, header};
use httparse::{Error, Status};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;
use crate::protocol::{ParseError, PayloadSize, ReasonPhrase, ResponseHead};

/// Maximum number of headers allowed in a response
pub const MAX_HEADER_NUM: usize = 64;

/// Maximum size in bytes allowed for the status line and headers
pub const MAX_HEADER_BYTES: usize = 16 * 1024;

/// Decoder for HTTP response heads implementing the [`Decoder`] trait.
///
/// The method of the request is needed to frame the body: a response to
/// `HEAD` never has one.
#[derive(Debug, Clone)]
pub struct ResponseDecoder {
    request_method: Method,
}

impl ResponseDecoder {
    pub fn new(request_method: Method) -> Self {
        Self { request_method }
    }
}

impl Decoder for ResponseDecoder {
    type Item = (ResponseHead, PayloadSize);
    type Error = ParseError;

    /// Attempts to decode a response head from `src`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some((head, payload_size)))` once the head is complete; the head
    ///   bytes are removed from `src` and the body prefix is left in it
    /// - `Ok(None)` if more data is needed
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the head exceeds the limits, is not valid
    /// HTTP/1.x, or frames its body in a way a CGI response can't.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADER_NUM];
        let mut res = httparse::Response::new(&mut headers);

        let parsed_result = res.parse(src).map_err(|e| match e {
            Error::TooManyHeaders => ParseError::too_many_headers(MAX_HEADER_NUM),
            e => ParseError::invalid_header(e.to_string()),
        });

        match parsed_result? {
            Status::Complete(body_offset) => {
                trace!(head_size = body_offset, "parsed response head");
                ensure!(body_offset <= MAX_HEADER_BYTES, ParseError::too_large_header(body_offset, MAX_HEADER_BYTES));

                let version = match res.version {
                    Some(0) => http::Version::HTTP_10,
                    Some(1) => http::Version::HTTP_11,
                    v => return Err(ParseError::InvalidVersion(v)),
                };
                let status = res
                    .code
                    .and_then(|code| StatusCode::from_u16(code).ok())
                    .ok_or(ParseError::InvalidStatus(res.code))?;

                let header_count = res.headers.len();
                let mut header_index: [HeaderIndex; MAX_HEADER_NUM] = EMPTY_HEADER_INDEX_ARRAY;
                HeaderIndex::record(src, res.headers, &mut header_index);
                // a missing or obs-text reason comes back as a static "" outside of src
                let reason =
                    res.reason.filter(|reason| !reason.is_empty()).map(|reason| Bytes::copy_from_slice(reason.as_bytes()));

                let head_bytes = src.split_to(body_offset).freeze();

                let mut head = ResponseHead::new(());
                *head.status_mut() = status;
                *head.version_mut() = version;

                let headers = head.headers_mut();
                headers.reserve(header_count);
                for index in &header_index[..header_count] {
                    let name =
                        HeaderName::from_bytes(&head_bytes[index.name.0..index.name.1]).map_err(ParseError::invalid_header)?;
                    let value = HeaderValue::from_maybe_shared(head_bytes.slice(index.value.0..index.value.1))
                        .map_err(ParseError::invalid_header)?;
                    headers.append(name, value);
                }

                if let Some(reason) = reason {
                    head.extensions_mut().insert(ReasonPhrase::new(reason));
                }

                let payload_size = parse_payload(&head, &self.request_method)?;
                trace!(status = head.status().as_u16(), header_count, ?payload_size, "decoded response head");
                Ok(Some((head, payload_size)))
            }
            Status::Partial => {
                ensure!(src.len() <= MAX_HEADER_BYTES, ParseError::too_large_header(src.len(), MAX_HEADER_BYTES));
                Ok(None)
            }
        }
    }
}

/// Start and end byte positions of a header's name and value within the
/// buffer the head was parsed from.
#[derive(Clone, Copy)]
struct HeaderIndex {
    name: (usize, usize),
    value: (usize, usize),
}

const EMPTY_HEADER_INDEX: HeaderIndex = HeaderIndex { name: (0, 0), value: (0, 0) };

const EMPTY_HEADER_INDEX_ARRAY: [HeaderIndex; MAX_HEADER_NUM] = [EMPTY_HEADER_INDEX; MAX_HEADER_NUM];

impl HeaderIndex {
    fn record(bytes: &[u8], headers: &[httparse::Header<'_>], indices: &mut [HeaderIndex]) {
        for (header, index) in headers.iter().zip(indices.iter_mut()) {
            index.name = byte_range(bytes, header.name.as_bytes());
            index.value = byte_range(bytes, header.value);
        }
    }
}

/// Position of `part`, a subslice handed out by `httparse`, within `bytes`.
fn byte_range(bytes: &[u8], part: &[u8]) -> (usize, usize) {
    let start = part.as_ptr() as usize - bytes.as_ptr() as usize;
    (start, start + part.len())
}

/// Determines how the body of a response is delimited.
///
/// Refer: <https://www.rfc-editor.org/rfc/rfc9112.html#name-message-body-length>
///
/// - no body for `HEAD` requests and 1xx, 204 and 304 responses
/// - a bounded body if `Content-Length` is present
/// - otherwise the body runs until the server closes the connection
///
/// # Errors
///
/// Returns `ParseError` if `Transfer-Encoding` is present, since a CGI
/// response is never transfer-coded, or if `Content-Length` is invalid or
/// repeated with different values.
fn parse_payload(head: &ResponseHead, request_method: &Method) -> Result<PayloadSize, ParseError> {
    let status = head.status();
    if *request_method == Method::HEAD
        || status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED
    {
        return Ok(PayloadSize::new_empty());
    }

    ensure!(
        !head.headers().contains_key(header::TRANSFER_ENCODING),
        ParseError::invalid_body("transfer-encoding is not allowed in a cgi response")
    );

    let mut length = None;
    for value in head.headers().get_all(header::CONTENT_LENGTH) {
        let cl_str = value.to_str().map_err(|_| ParseError::invalid_content_length("value can't to_str"))?;
        let parsed =
            cl_str.trim().parse::<u64>().map_err(|_| ParseError::invalid_content_length(format!("value {cl_str} is not u64")))?;
        ensure!(
            length.is_none_or(|length| length == parsed),
            ParseError::invalid_content_length("conflicting content-length values")
        );
        length = Some(parsed);
    }

    Ok(length.map_or_else(PayloadSize::new_until_close, PayloadSize::new_length))
}
