//! SCGI codec module: everything that turns requests into bytes and bytes
//! into responses.
//!
//! # Request side
//!
//! - [`netstring`]: the `<length>:<bytes>,` framing of the header block
//! - [`header_block`]: the NUL-separated CGI header block
//!
//! # Response side
//!
//! - [`status_line`]: rewrites the leading `Status:` header into an HTTP
//!   status line
//! - [`ResponseDecoder`]: parses the adapted head with `httparse`
//! - [`ResponseParser`] and [`ResponseBody`]: head parsing over a reader and
//!   body framing on top of it
//!
//! # Example
//!
//! ```
//! use micro_scgi::codec::NetstringCodec;
//! use tokio_util::codec::{Decoder, Encoder};
//! use bytes::BytesMut;
//!
//! let mut codec = NetstringCodec::new();
//! let mut buffer = BytesMut::new();
//! codec.encode(&b"hello"[..], &mut buffer).unwrap();
//! assert_eq!(&buffer[..], b"5:hello,");
//!
//! let frame = codec.decode(&mut buffer).unwrap();
//! assert_eq!(frame.as_deref(), Some(&b"hello"[..]));
//! ```

mod body;
pub mod header_block;
pub mod netstring;
mod response_decoder;
mod response_parser;
pub mod status_line;

pub use body::PayloadDecoder;
pub use header_block::{HeaderBlockEncoder, build_header_block};
pub use netstring::{NetstringCodec, read_netstring, write_netstring};
pub use response_decoder::{MAX_HEADER_BYTES, MAX_HEADER_NUM, ResponseDecoder};
pub use response_parser::{HttpResponseParser, ResponseBody, ResponseParser};
pub use status_line::{AdaptedStream, adapt_response, adapt_status_line};
