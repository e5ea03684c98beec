//! Connections to SCGI servers.
//!
//! [`dial`] opens the socket a [`ConnectionTarget`] names;
//! [`ScgiConnection`] runs the single exchange SCGI allows on it.
//!
//! [`ConnectionTarget`]: crate::protocol::ConnectionTarget

mod scgi_connection;
mod stream;

pub use scgi_connection::{ScgiConnection, ScgiResponse};
pub use stream::{ScgiStream, dial};
