//! Response head types.
//!
//! The head of a parsed response is an `http::Response<()>`; the body is
//! attached afterwards with [`http::Response::map`].

use std::fmt;

use bytes::Bytes;
use http::Response;

/// Type alias for HTTP response headers before a body is attached.
pub type ResponseHead = Response<()>;

/// The reason phrase of the status line, as sent by the server.
///
/// `http::Response` only keeps the status code, so the parser stores the
/// phrase in the response extensions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReasonPhrase(Bytes);

impl ReasonPhrase {
    pub fn new(bytes: Bytes) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The phrase as text, or `None` if the server sent obs-text.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }
}

impl fmt::Display for ReasonPhrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}
