//! SCGI header block encoder.
//!
//! The block is a run of NUL-terminated tokens read as alternating keys and
//! values. Servers rely on its positional contract: the first pair is always
//! `CONTENT_LENGTH`, then `SCGI` = `1`. The request method and protocol
//! follow, then every request header with its name upper-cased and its
//! values joined with `,`.
//!
//! Request headers are how CGI variables such as `REMOTE_ADDR` or
//! `QUERY_STRING` reach the server; they are forwarded as given.
//!
//! The encoder produces the raw block only; the netstring envelope is added
//! by the caller.

use bytes::{BufMut, BytesMut};
use http::request::Parts;
use tokio_util::codec::Encoder;
use tracing::trace;

use crate::ensure;
use crate::protocol::{ScgiError, protocol_version};

/// Initial buffer size allocated for the header block
const INIT_HEADER_BLOCK_SIZE: usize = 1024;

pub const CONTENT_LENGTH: &[u8] = b"CONTENT_LENGTH";
pub const SCGI: &[u8] = b"SCGI";
pub const SCGI_VERSION: &[u8] = b"1";
pub const REQUEST_METHOD: &[u8] = b"REQUEST_METHOD";
pub const SERVER_PROTOCOL: &[u8] = b"SERVER_PROTOCOL";

const TOKEN_TERMINATOR: u8 = 0;
const VALUE_SEPARATOR: u8 = b',';

/// Encoder for the SCGI header block implementing the [`Encoder`] trait.
///
/// The item is the request head together with the exact byte length of the
/// buffered body.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderBlockEncoder;

impl<'a> Encoder<(&'a Parts, usize)> for HeaderBlockEncoder {
    type Error = ScgiError;

    /// Encodes the header block of a request into `dst`.
    ///
    /// # Errors
    ///
    /// Returns [`ScgiError::Validation`] if a header value contains a NUL
    /// byte, which would shift every following key and value. `dst` may hold
    /// a partial block afterwards and must be discarded.
    fn encode(&mut self, item: (&'a Parts, usize), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (parts, content_length) = item;
        dst.reserve(INIT_HEADER_BLOCK_SIZE);

        put_token(dst, CONTENT_LENGTH);
        put_token(dst, content_length.to_string().as_bytes());
        put_token(dst, SCGI);
        put_token(dst, SCGI_VERSION);
        put_token(dst, REQUEST_METHOD);
        put_token(dst, parts.method.as_str().as_bytes());
        put_token(dst, SERVER_PROTOCOL);
        put_token(dst, protocol_version(parts.version).as_bytes());

        for name in parts.headers.keys() {
            put_token(dst, name.as_str().to_ascii_uppercase().as_bytes());

            for (index, value) in parts.headers.get_all(name).iter().enumerate() {
                ensure!(
                    !value.as_bytes().contains(&TOKEN_TERMINATOR),
                    ScgiError::validation(format!("value of header {name} contains a NUL byte"))
                );
                if index > 0 {
                    dst.put_u8(VALUE_SEPARATOR);
                }
                dst.put_slice(value.as_bytes());
            }
            dst.put_u8(TOKEN_TERMINATOR);
        }

        trace!(header_count = parts.headers.keys_len(), block_size = dst.len(), "encoded scgi header block");
        Ok(())
    }
}

/// Builds the header block of a request into a fresh buffer.
///
/// # Errors
///
/// See [`HeaderBlockEncoder::encode`].
pub fn build_header_block(parts: &Parts, content_length: usize) -> Result<BytesMut, ScgiError> {
    let mut dst = BytesMut::new();
    HeaderBlockEncoder.encode((parts, content_length), &mut dst)?;
    Ok(dst)
}

/// Writes a token that can't contain NUL: a fixed name, a number, a method,
/// a protocol string, or a header name.
#[inline]
fn put_token(dst: &mut BytesMut, token: &[u8]) {
    dst.put_slice(token);
    dst.put_u8(TOKEN_TERMINATOR);
}
