//! The SCGI transport.
//!
//! [`Transport`] is the capability a generic HTTP client needs from a
//! pluggable transport: run one request and return its response.
//! [`ScgiClient`] implements it by running the request against an SCGI
//! server.

use http::{Request, Response, Version};
use tracing::{debug, warn};

use crate::codec::{AdaptedStream, ResponseBody};
use crate::connection::{ScgiConnection, ScgiResponse, ScgiStream};
use crate::ensure;
use crate::protocol::{RequestBody, ScgiError, ScgiTarget};

use std::io::BufReader;

/// A single request/response exchange.
pub trait Transport<B> {
    type ResponseBody;

    /// Runs `request` and returns the response once its head is available.
    ///
    /// # Errors
    ///
    /// Any failure ends the exchange; nothing is retried.
    fn execute(&self, request: Request<B>) -> Result<Response<Self::ResponseBody>, ScgiError>;
}

impl<B, T: Transport<B> + ?Sized> Transport<B> for &T {
    type ResponseBody = T::ResponseBody;

    fn execute(&self, request: Request<B>) -> Result<Response<Self::ResponseBody>, ScgiError> {
        (**self).execute(request)
    }
}

/// A stateless SCGI client.
///
/// It holds no configuration and no connections: every call to
/// [`execute`](Transport::execute) dials its own connection, so one value
/// can be shared freely across threads or created per call.
///
/// The request names its server with a [`ScgiTarget`] extension. Request
/// headers are forwarded into the SCGI header block with upper-cased names,
/// which is how CGI variables like `REMOTE_ADDR` or `QUERY_STRING` are
/// passed.
///
/// # Example
///
/// ```no_run
/// use std::io::Read;
/// use http::Request;
/// use micro_scgi::client::{ScgiClient, Transport};
/// use micro_scgi::protocol::ScgiTarget;
///
/// let request = Request::get("/")
///     .header("REMOTE_ADDR", "127.0.0.1")
///     .header("REQUEST_URI", "/")
///     .extension(ScgiTarget::new("scgi:////run/app.sock"))
///     .body(())
///     .unwrap();
///
/// let mut response = ScgiClient::new().execute(request).unwrap();
/// let mut body = String::new();
/// response.body_mut().read_to_string(&mut body).unwrap();
/// println!("{} {body}", response.status());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ScgiClient;

impl ScgiClient {
    pub const fn new() -> Self {
        Self
    }

    fn exchange<B: RequestBody>(request: Request<B>) -> Result<ScgiResponse, ScgiError> {
        let (parts, body) = request.into_parts();

        let target = parts
            .extensions
            .get::<ScgiTarget>()
            .ok_or_else(|| ScgiError::validation("request has no scgi target"))?;
        let connection_target = target.resolve()?;

        // the response is re-parsed under the request's protocol, which must be HTTP/1.x
        ensure!(
            matches!(parts.version, Version::HTTP_10 | Version::HTTP_11),
            ScgiError::validation(format!("unsupported protocol version {:?}", parts.version))
        );

        let body = body.into_bytes()?;

        debug!(addr = %connection_target, method = %parts.method, content_length = body.len(), "starting scgi exchange");
        let mut connection = ScgiConnection::connect(&connection_target)?;
        connection.send(&parts, &body)?;
        let response = connection.read_response(parts.version, &parts.method)?;

        debug!(addr = %connection_target, status = response.status().as_u16(), "received scgi response head");
        Ok(response)
    }
}

impl<B: RequestBody> Transport<B> for ScgiClient {
    type ResponseBody = ResponseBody<AdaptedStream<BufReader<ScgiStream>>>;

    fn execute(&self, request: Request<B>) -> Result<Response<Self::ResponseBody>, ScgiError> {
        Self::exchange(request).inspect_err(|e| warn!(cause = %e, "scgi exchange failed"))
    }
}
