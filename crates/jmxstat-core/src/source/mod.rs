//! Attribute sources.
//!
//! A [`Connector`] knows how to reach an endpoint; the [`Connection`] it opens
//! reads attributes of managed resources. The sampler holds at most one
//! connection, opens it through a single path and closes it exactly once.
//!
//! Implementations:
//! - [`jolokia::JolokiaConnector`]: Jolokia agent over HTTP/JSON (`jolokia` feature)
//! - [`mock::MockSource`]: scripted in-memory source for tests

#[cfg(feature = "jolokia")]
pub mod jolokia;
pub mod mock;

pub use mock::MockSource;

use std::fmt;

use crate::resource::ResourceId;
use crate::value::AttributeValue;

/// Username and password for endpoints that require authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Credentials are only used when both parts are present and non-empty.
    pub fn from_parts(username: Option<String>, password: Option<String>) -> Option<Self> {
        match (username, password) {
            (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => Some(Self::new(u, p)),
            _ => None,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Failure to open a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// Endpoint could not be reached.
    Unreachable(String),
    /// Endpoint rejected the credentials.
    AuthenticationRejected(String),
    /// Endpoint answered, but not as expected.
    Protocol(String),
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::Unreachable(msg) => write!(f, "endpoint unreachable: {}", msg),
            ConnectionError::AuthenticationRejected(msg) => {
                write!(f, "authentication rejected: {}", msg)
            }
            ConnectionError::Protocol(msg) => write!(f, "protocol error: {}", msg),
        }
    }
}

impl std::error::Error for ConnectionError {}

/// Failure to read one attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Request did not complete (I/O, timeout).
    Transport(String),
    /// Endpoint reported an error for this read.
    Remote {
        status: u16,
        error_type: Option<String>,
        message: String,
    },
    /// Response could not be decoded.
    Decode(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Transport(msg) => write!(f, "transport error: {}", msg),
            FetchError::Remote {
                status,
                error_type: Some(kind),
                message,
            } => write!(f, "remote error {} ({}): {}", status, kind, message),
            FetchError::Remote {
                status, message, ..
            } => write!(f, "remote error {}: {}", status, message),
            FetchError::Decode(msg) => write!(f, "undecodable response: {}", msg),
        }
    }
}

impl std::error::Error for FetchError {}

/// Opens connections to one endpoint.
pub trait Connector {
    type Connection: Connection;

    fn connect(&self) -> Result<Self::Connection, ConnectionError>;

    /// Human-readable endpoint address, for logs.
    fn endpoint(&self) -> String;
}

/// An open connection.
pub trait Connection {
    fn fetch(&mut self, resource: &ResourceId, attribute: &str)
    -> Result<AttributeValue, FetchError>;

    /// Releases the connection.
    fn close(self) -> Result<(), ConnectionError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_need_both_parts() {
        assert!(Credentials::from_parts(Some("u".into()), Some("p".into())).is_some());
        assert!(Credentials::from_parts(Some("u".into()), None).is_none());
        assert!(Credentials::from_parts(None, Some("p".into())).is_none());
        assert!(Credentials::from_parts(Some(String::new()), Some("p".into())).is_none());
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials::new("monitor", "s3cret");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("monitor"));
        assert!(!debug.contains("s3cret"));
    }

    #[test]
    fn test_fetch_error_display() {
        let err = FetchError::Remote {
            status: 404,
            error_type: Some("javax.management.InstanceNotFoundException".into()),
            message: "java.lang:type=Nope".into(),
        };
        assert_eq!(
            err.to_string(),
            "remote error 404 (javax.management.InstanceNotFoundException): java.lang:type=Nope"
        );
    }
}
