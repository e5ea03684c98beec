//! SCGI connection strings and the socket they point at.
//!
//! Three forms are accepted, distinguished by which URI component is set:
//!
//! - `scgi:///relative/path.sock`: relative Unix socket path
//! - `scgi:////absolute/path.sock`: absolute Unix socket path
//! - `scgi://host:port`: TCP, the port defaults to `80`
//!
//! Exactly one of authority and path must be non-empty.

use std::fmt;
use std::path::PathBuf;

use percent_encoding::percent_decode_str;
use url::{Host, Url};

use crate::ensure;
use crate::protocol::ScgiError;

const DEFAULT_PORT: u16 = 80;

/// The raw connection string of an SCGI request.
///
/// It travels as an extension on the [`http::Request`] because `http::Uri`
/// can't express the empty-authority forms used for Unix sockets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScgiTarget(String);

impl ScgiTarget {
    pub fn new<S: Into<String>>(target: S) -> Self {
        Self(target.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn resolve(&self) -> Result<ConnectionTarget, ScgiError> {
        resolve(&self.0)
    }
}

impl From<&str> for ScgiTarget {
    fn from(target: &str) -> Self {
        Self::new(target)
    }
}

impl From<String> for ScgiTarget {
    fn from(target: String) -> Self {
        Self::new(target)
    }
}

impl fmt::Display for ScgiTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where the stream to the SCGI server is opened.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConnectionTarget {
    UnixPath(PathBuf),
    HostPort { host: String, port: u16 },
}

impl ConnectionTarget {
    pub fn is_unix(&self) -> bool {
        matches!(self, ConnectionTarget::UnixPath(_))
    }
}

impl fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionTarget::UnixPath(path) => write!(f, "unix:{}", path.display()),
            ConnectionTarget::HostPort { host, port } if host.contains(':') => write!(f, "[{host}]:{port}"),
            ConnectionTarget::HostPort { host, port } => write!(f, "{host}:{port}"),
        }
    }
}

/// Resolves a connection string into the socket it names.
///
/// The string is parsed as a URL; an empty host counts as no host, and the
/// path is percent-decoded before one leading `/` is stripped from it.
///
/// # Errors
///
/// Returns [`ScgiError::Validation`] when the string is not an absolute
/// `scheme://` URL, when both or neither of host and path are present, when
/// the port is not a valid `u16`, or when the socket path is empty or not
/// UTF-8 after decoding.
pub fn resolve(target: &str) -> Result<ConnectionTarget, ScgiError> {
    let url = Url::parse(target).map_err(|e| ScgiError::validation(format!("{target:?} is not a scgi url: {e}")))?;
    ensure!(!url.cannot_be_a_base(), ScgiError::validation(format!("{target:?} has no authority")));

    let host = match url.host() {
        Some(Host::Domain(domain)) if !domain.is_empty() => Some(domain.to_string()),
        Some(Host::Ipv4(addr)) => Some(addr.to_string()),
        Some(Host::Ipv6(addr)) => Some(addr.to_string()),
        _ => None,
    };
    let path = url.path();

    match (host, path.is_empty()) {
        (None, false) => {
            let path = percent_decode_str(path)
                .decode_utf8()
                .map_err(|e| ScgiError::validation(format!("{target:?} has a non utf-8 socket path: {e}")))?;
            // one leading separator belongs to the URL syntax, the rest to the path
            let path = path.strip_prefix('/').unwrap_or(&path);
            ensure!(!path.is_empty(), ScgiError::validation(format!("{target:?} has an empty socket path")));
            Ok(ConnectionTarget::UnixPath(PathBuf::from(path)))
        }
        (Some(host), true) => Ok(ConnectionTarget::HostPort { host, port: url.port().unwrap_or(DEFAULT_PORT) }),
        _ => Err(ScgiError::validation(format!("{target:?} must have exactly one of host or path"))),
    }
}
