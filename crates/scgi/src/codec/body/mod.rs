//! Response body framing.
//!
//! - [`PayloadDecoder`]: picks the strategy from the [`PayloadSize`] of a
//!   response head
//! - `LengthDecoder`: bodies bounded by `Content-Length`
//!
//! [`PayloadSize`]: crate::protocol::PayloadSize

mod length_decoder;
mod payload_decoder;

pub use payload_decoder::PayloadDecoder;
