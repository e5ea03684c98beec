//! A blocking micro SCGI client
//!
//! This crate implements the client side of SCGI, the Simple Common Gateway
//! Interface: it turns an [`http::Request`] into an SCGI request, sends it
//! over a Unix-domain or TCP socket to an application server, and turns the
//! CGI-style answer back into an [`http::Response`].
//!
//! # Example
//!
//! ```no_run
//! use std::io::Read;
//! use http::Request;
//! use micro_scgi::client::{ScgiClient, Transport};
//! use micro_scgi::protocol::ScgiTarget;
//! use tracing::{info, Level};
//! use tracing_subscriber::FmtSubscriber;
//!
//! // Initialize logging
//! let subscriber = FmtSubscriber::builder()
//!     .with_max_level(Level::INFO)
//!     .finish();
//! tracing::subscriber::set_global_default(subscriber)
//!     .expect("setting default subscriber failed");
//!
//! let request = Request::post("/form")
//!     .header("REMOTE_ADDR", "127.0.0.1")
//!     .header("QUERY_STRING", "debug=1")
//!     .extension(ScgiTarget::new("scgi://127.0.0.1:4000"))
//!     .body("name=value")
//!     .unwrap();
//!
//! let mut response = ScgiClient::new().execute(request).unwrap();
//! let mut body = String::new();
//! response.body_mut().read_to_string(&mut body).unwrap();
//! info!(status = %response.status(), body, "received response");
//! ```
//!
//! # Architecture
//!
//! - [`protocol`]: connection strings, request bodies, response types and errors
//! - [`codec`]: netstring framing, the SCGI header block, and response adaptation
//! - [`connection`]: dialing and the single exchange of a connection
//! - [`client`]: the [`client::Transport`] capability and [`client::ScgiClient`]
//!
//! # Wire format
//!
//! A request is a netstring holding NUL-terminated key/value tokens,
//! starting with `CONTENT_LENGTH`, `<n>`, `SCGI`, `1`, followed by exactly
//! `n` body bytes:
//!
//! ```text
//! <len>:CONTENT_LENGTH\x0010\x00SCGI\x001\x00REQUEST_METHOD\x00POST\x00...,name=value
//! ```
//!
//! The server answers with a CGI response whose first line is a `Status`
//! header. That line is rewritten into `HTTP/1.1 200 OK` (using the
//! request's protocol) and the result is parsed as a regular HTTP response.
//!
//! # Connection strings
//!
//! - `scgi:///relative/path.sock`
//! - `scgi:////absolute/path.sock`
//! - `scgi://host:port`, the port defaults to 80
//!
//! # Limitations
//!
//! - One request per connection, no pooling, no TLS
//! - Request bodies are buffered in memory before sending
//! - No timeouts; set them on the [`connection::ScgiStream`] when driving a
//!   [`connection::ScgiConnection`] directly
//! - HTTP/1.0 and HTTP/1.1 requests only
//! - Maximum response head size: 16KB
//! - Maximum number of response headers: 64

pub mod client;
pub mod codec;
pub mod connection;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
