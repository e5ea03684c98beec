//! Core types of the SCGI client.
//!
//! - `target`: connection strings and the sockets they resolve to
//! - `request`: request bodies, buffered before sending
//! - `response`: response head and reason phrase
//! - `message`: payload items and body framing
//! - `error`: the error kinds of an exchange

mod error;
mod message;
mod request;
mod response;
mod target;

pub use error::{ParseError, ScgiError};
pub use message::{PayloadItem, PayloadSize};
pub use request::{ReaderBody, RequestBody, protocol_version};
pub use response::{ReasonPhrase, ResponseHead};
pub use target::{ConnectionTarget, ScgiTarget, resolve};
