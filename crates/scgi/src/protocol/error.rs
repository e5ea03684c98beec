use std::io;
use thiserror::Error;

/// Every way a single SCGI exchange can fail.
///
/// Nothing is retried and nothing is swallowed: the first failure ends the
/// exchange and is handed back to the caller of [`crate::client::Transport::execute`].
#[derive(Debug, Error)]
pub enum ScgiError {
    /// The target or the request metadata can't be sent as SCGI.
    #[error("invalid scgi request: {reason}")]
    Validation { reason: String },

    /// Dialing the SCGI server failed.
    #[error("connect to {target} failed: {source}")]
    Connect {
        target: String,
        #[source]
        source: io::Error,
    },

    /// Reading from or writing to the socket failed, including a stream that
    /// ended early.
    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// Malformed netstring framing or a malformed status line.
    #[error("invalid format: {reason}")]
    Format { reason: String },

    /// The adapted response could not be parsed as HTTP.
    #[error("invalid response: {source}")]
    Protocol {
        #[source]
        source: ParseError,
    },
}

impl ScgiError {
    pub fn validation<S: ToString>(str: S) -> Self {
        Self::Validation { reason: str.to_string() }
    }

    pub fn connect<T: ToString>(target: T, source: io::Error) -> Self {
        Self::Connect { target: target.to_string(), source }
    }

    pub fn format<S: ToString>(str: S) -> Self {
        Self::Format { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ScgiError::Validation { .. })
    }

    pub fn is_connect(&self) -> bool {
        matches!(self, ScgiError::Connect { .. })
    }

    pub fn is_io(&self) -> bool {
        matches!(self, ScgiError::Io { .. })
    }

    pub fn is_format(&self) -> bool {
        matches!(self, ScgiError::Format { .. })
    }

    pub fn is_protocol(&self) -> bool {
        matches!(self, ScgiError::Protocol { .. })
    }
}

/// Socket failures seen by the parser stay I/O errors; everything else the
/// parser rejects is a protocol error.
impl From<ParseError> for ScgiError {
    fn from(e: ParseError) -> Self {
        match e {
            ParseError::Io { source } => ScgiError::Io { source },
            e => ScgiError::Protocol { source: e },
        }
    }
}

/// Errors raised while parsing the adapted HTTP response.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("header size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("header number exceed the limit {max_num}")]
    TooManyHeaders { max_num: usize },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid http version: {0:?}")]
    InvalidVersion(Option<u8>),

    #[error("invalid status code: {0:?}")]
    InvalidStatus(Option<u16>),

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn too_many_headers(max_num: usize) -> Self {
        Self::TooManyHeaders { max_num }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}
